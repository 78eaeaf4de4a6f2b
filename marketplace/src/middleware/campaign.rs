use std::sync::Arc;

use axum::{
    extract::{Path, RequestParts},
    middleware::Next,
};
use serde::Deserialize;

use primitives::CampaignId;

use crate::{auth::Authenticator, db::fetch_campaign, response::ResponseError, Application};

/// This struct is required because of routes that have more parameters
/// apart from the `CampaignId`
#[derive(Debug, Deserialize)]
struct CampaignParam {
    pub id: CampaignId,
}

/// Loads the campaign from the `:id` path parameter and inserts it as a
/// request extension, or responds with `404` when it does not exist.
pub async fn campaign_load<A: Authenticator + 'static, B>(
    request: axum::http::Request<B>,
    next: Next<B>,
) -> Result<axum::response::Response, ResponseError>
where
    B: Send,
{
    let pool = request
        .extensions()
        .get::<Arc<Application<A>>>()
        .expect("Application should always be present")
        .pool
        .clone();

    // running extractors requires a `RequestParts`
    let mut request_parts = RequestParts::new(request);

    let campaign_id = request_parts
        .extract::<Path<CampaignParam>>()
        .await
        .map_err(|_| ResponseError::BadRequest("Bad Campaign Id".to_string()))?
        .id;

    let campaign = fetch_campaign(pool, &campaign_id)
        .await?
        .ok_or(ResponseError::NotFound)?;

    request_parts.extensions_mut().insert(campaign);

    let request = request_parts.try_into_request().expect("Body extracted");

    Ok(next.run(request).await)
}
