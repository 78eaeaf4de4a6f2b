//! The minimal campaign surface the order workflow is exercised against.
//!
//! Campaign management proper (activation, pausing, metrics) lives in a
//! different component; these routes only create and read the records the
//! budget ledger operates on.

use std::sync::Arc;

use axum::{extract::Query, Extension, Json};
use slog::error;
use tokio_postgres::error::SqlState;

use primitives::{
    marketplace::{
        campaign_list::{CampaignListQuery, CampaignListResponse},
        CampaignResponse, CreateCampaign, Pagination,
    },
    Campaign,
};

use crate::{
    auth::Authenticator,
    db::{
        campaign::{campaign_spent, count_campaigns, list_campaigns},
        insert_campaign, PoolError,
    },
    Application, Auth, ResponseError,
};

pub async fn create_campaign<A: Authenticator + 'static>(
    Extension(app): Extension<Arc<Application<A>>>,
    Extension(auth): Extension<Auth>,
    Json(create_campaign): Json<CreateCampaign>,
) -> Result<Json<Campaign>, ResponseError> {
    if create_campaign.title.trim().is_empty() || create_campaign.title.chars().count() > 100 {
        return Err(ResponseError::FailedValidation(
            "Title must be between 1 and 100 characters".to_string(),
        ));
    }

    let campaign = create_campaign.into_campaign(auth.uid);

    match insert_campaign(&app.pool, &campaign).await {
        Err(error) => {
            error!(&app.logger, "{}", &error; "module" => "create_campaign");
            match error {
                PoolError::Backend(error) if error.code() == Some(&SqlState::UNIQUE_VIOLATION) => {
                    Err(ResponseError::Conflict(
                        "Campaign already exists".to_string(),
                    ))
                }
                _ => Err(ResponseError::BadRequest(
                    "err occurred; please try again later".to_string(),
                )),
            }
        }
        Ok(false) => Err(ResponseError::BadRequest(
            "Encountered error while creating Campaign; please try again".to_string(),
        )),
        Ok(true) => Ok(()),
    }?;

    Ok(Json(campaign))
}

pub async fn get_campaign<A: Authenticator + 'static>(
    Extension(app): Extension<Arc<Application<A>>>,
    Extension(auth): Extension<Auth>,
    Extension(campaign): Extension<Campaign>,
) -> Result<Json<CampaignResponse>, ResponseError> {
    // an advertiser only sees their own campaigns
    if campaign.advertiser != auth.uid {
        return Err(ResponseError::NotFound);
    }

    let spent = campaign_spent(&app.pool, &campaign.id).await?;

    Ok(Json(CampaignResponse { campaign, spent }))
}

pub async fn campaign_list<A: Authenticator + 'static>(
    Extension(app): Extension<Arc<Application<A>>>,
    Extension(auth): Extension<Auth>,
    Query(query): Query<CampaignListQuery>,
) -> Result<Json<CampaignListResponse>, ResponseError> {
    let (campaigns, total_items) = futures::try_join!(
        list_campaigns(&app.pool, &auth.uid, query.skip(), query.limit()),
        count_campaigns(&app.pool, &auth.uid),
    )?;

    let pagination = Pagination::new(query.page(), query.limit(), total_items);

    Ok(Json(CampaignListResponse {
        campaigns,
        pagination,
    }))
}
