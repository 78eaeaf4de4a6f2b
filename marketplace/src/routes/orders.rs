//! Order routes and the order workflow itself.
//!
//! The workflow lives in the [`create`] and [`lifecycle`] submodules. Every
//! mutation runs inside a single `SERIALIZABLE` Postgres transaction with a
//! row lock on the record it mutates, so concurrent requests against the
//! same campaign or order behave as if they were executed one after the
//! other; on any error the whole transaction rolls back and nothing - not
//! an order row, not a budget movement - survives.

use std::sync::Arc;

use axum::{
    extract::{Path, Query},
    Extension, Json,
};
use chrono::Utc;
use slog::{error, Logger};
use thiserror::Error;

use primitives::{
    marketplace::{
        order_list::{OrderListQuery, OrderListResponse},
        CreateOrder, Pagination, RejectOrder, SubmitOrder,
    },
    order_validator::Validator,
    Order, OrderId, Role, UserId,
};

use crate::{
    auth::Authenticator,
    db::{budget, order::ListParty, DbPool, PoolError},
    Application, Auth, ResponseError,
};

#[derive(Debug, Error)]
pub enum Error {
    /// The campaign does not exist or does not belong to the caller.
    #[error("Campaign not found")]
    CampaignNotFound,
    #[error("Order not found")]
    NotFound,
    /// `price` exceeds `budget.total - budget.allocated` of the campaign.
    #[error("Not enough budget left in the campaign")]
    InsufficientBudget,
    #[error(transparent)]
    Order(#[from] primitives::order::Error),
    /// The bookkeeping contradicted itself mid-transaction. Always aborts.
    #[error("Budget bookkeeping violated: {0}")]
    Invariant(String),
    #[error(transparent)]
    Budget(#[from] budget::Error),
    #[error("Postgres error: {0}")]
    Postgres(#[from] tokio_postgres::Error),
    #[error("DB Pool error: {0}")]
    Pool(#[from] PoolError),
}

impl Error {
    /// Maps the workflow error onto the client-visible response.
    ///
    /// Ledger and storage failures are logged here and reach the client
    /// only as generic faults - an invariant violation is a bug of ours,
    /// never a business error of theirs.
    fn into_response_error(self, logger: &Logger, module: &str) -> ResponseError {
        use primitives::order::Error as OrderError;

        match self {
            Error::CampaignNotFound | Error::NotFound => ResponseError::NotFound,
            // the attempted amount stays out of the response on purpose
            Error::InsufficientBudget => {
                ResponseError::BadRequest("Not enough budget left in the campaign".to_string())
            }
            // a wrong participant is indistinguishable from a missing order
            Error::Order(OrderError::NotOwner) => ResponseError::NotFound,
            Error::Order(OrderError::Transition(invalid)) => {
                ResponseError::BadRequest(invalid.to_string())
            }
            Error::Order(error @ OrderError::NoContentUrls) => {
                ResponseError::FailedValidation(error.to_string())
            }
            Error::Invariant(detail) => {
                error!(logger, "{}", &detail; "module" => module);
                ResponseError::Internal
            }
            Error::Budget(budget::Error::Postgres(error)) => {
                postgres_response(logger, module, error)
            }
            Error::Budget(error) => {
                error!(logger, "{}", &error; "module" => module);
                ResponseError::Internal
            }
            Error::Postgres(error) => postgres_response(logger, module, error),
            Error::Pool(PoolError::Backend(error)) => postgres_response(logger, module, error),
            Error::Pool(error) => {
                error!(logger, "{}", &error; "module" => module);
                ResponseError::BadRequest("err occurred; please try again later".to_string())
            }
        }
    }
}

/// Backend errors either ask the client to retry (a `SERIALIZABLE`
/// transaction lost against a concurrent one) or are logged as faults.
fn postgres_response(
    logger: &Logger,
    module: &str,
    error: tokio_postgres::Error,
) -> ResponseError {
    use tokio_postgres::error::SqlState;

    if error.code() == Some(&SqlState::T_R_SERIALIZATION_FAILURE) {
        ResponseError::Conflict("concurrent update, please try again".to_string())
    } else {
        error!(logger, "{}", &error; "module" => module);
        ResponseError::BadRequest("err occurred; please try again later".to_string())
    }
}

pub async fn create_order<A: Authenticator + 'static>(
    Extension(app): Extension<Arc<Application<A>>>,
    Extension(auth): Extension<Auth>,
    Json(create_order): Json<CreateOrder>,
) -> Result<Json<Order>, ResponseError> {
    create_order
        .validate(Utc::now())
        .map_err(|validation| ResponseError::FailedValidation(validation.to_string()))?;

    let order = create::create_order(&app.pool, auth.uid, create_order)
        .await
        .map_err(|error| error.into_response_error(&app.logger, "create_order"))?;

    Ok(Json(order))
}

pub async fn get_order<A: Authenticator + 'static>(
    Extension(app): Extension<Arc<Application<A>>>,
    Extension(auth): Extension<Auth>,
    Path(order_id): Path<OrderId>,
) -> Result<Json<Order>, ResponseError> {
    let order = crate::db::fetch_order(app.pool.clone(), &order_id)
        .await?
        .ok_or(ResponseError::NotFound)?;

    if !order.is_participant(auth.uid) && auth.role != Role::Admin {
        return Err(ResponseError::Forbidden(
            "the caller is not a party to this order".to_string(),
        ));
    }

    Ok(Json(order))
}

pub async fn blogger_orders<A: Authenticator + 'static>(
    Extension(app): Extension<Arc<Application<A>>>,
    Extension(auth): Extension<Auth>,
    Query(query): Query<OrderListQuery>,
) -> Result<Json<OrderListResponse>, ResponseError> {
    list_orders(&app, ListParty::Blogger(auth.uid), query).await
}

pub async fn advertiser_orders<A: Authenticator + 'static>(
    Extension(app): Extension<Arc<Application<A>>>,
    Extension(auth): Extension<Auth>,
    Query(query): Query<OrderListQuery>,
) -> Result<Json<OrderListResponse>, ResponseError> {
    list_orders(&app, ListParty::Advertiser(auth.uid), query).await
}

async fn list_orders<A: Authenticator + 'static>(
    app: &Application<A>,
    party: ListParty,
    query: OrderListQuery,
) -> Result<Json<OrderListResponse>, ResponseError> {
    let (data, total_items) = futures::try_join!(
        crate::db::order::list_orders(&app.pool, party, query.status, query.skip(), query.limit()),
        crate::db::order::count_orders(&app.pool, party, query.status),
    )?;

    let pagination = Pagination::new(query.page(), query.limit(), total_items);

    Ok(Json(OrderListResponse { data, pagination }))
}

pub async fn accept_order<A: Authenticator + 'static>(
    Extension(app): Extension<Arc<Application<A>>>,
    Extension(auth): Extension<Auth>,
    Path(order_id): Path<OrderId>,
) -> Result<Json<Order>, ResponseError> {
    lifecycle::accept_order(&app.pool, auth.uid, &order_id)
        .await
        .map(Json)
        .map_err(|error| error.into_response_error(&app.logger, "accept_order"))
}

pub async fn reject_order<A: Authenticator + 'static>(
    Extension(app): Extension<Arc<Application<A>>>,
    Extension(auth): Extension<Auth>,
    Path(order_id): Path<OrderId>,
    reject: Option<Json<RejectOrder>>,
) -> Result<Json<Order>, ResponseError> {
    // the body is optional, a rejection does not need a reason
    let reject = reject.map(|Json(reject)| reject).unwrap_or_default();

    reject
        .validate(Utc::now())
        .map_err(|validation| ResponseError::FailedValidation(validation.to_string()))?;

    lifecycle::reject_order(&app.pool, auth.uid, &order_id, reject.reason)
        .await
        .map(Json)
        .map_err(|error| error.into_response_error(&app.logger, "reject_order"))
}

pub async fn submit_order<A: Authenticator + 'static>(
    Extension(app): Extension<Arc<Application<A>>>,
    Extension(auth): Extension<Auth>,
    Path(order_id): Path<OrderId>,
    Json(submit): Json<SubmitOrder>,
) -> Result<Json<Order>, ResponseError> {
    submit
        .validate(Utc::now())
        .map_err(|validation| ResponseError::FailedValidation(validation.to_string()))?;

    lifecycle::submit_order(&app.pool, auth.uid, &order_id, submit)
        .await
        .map(Json)
        .map_err(|error| error.into_response_error(&app.logger, "submit_order"))
}

pub async fn approve_order<A: Authenticator + 'static>(
    Extension(app): Extension<Arc<Application<A>>>,
    Extension(auth): Extension<Auth>,
    Path(order_id): Path<OrderId>,
) -> Result<Json<Order>, ResponseError> {
    lifecycle::approve_order(&app.pool, auth.uid, &order_id)
        .await
        .map(Json)
        .map_err(|error| error.into_response_error(&app.logger, "approve_order"))
}

pub mod create {
    use tokio_postgres::IsolationLevel;

    use crate::db::{campaign::fetch_campaign_for_update, order::insert_order};

    use super::*;

    /// Creates the order and reserves its price on the campaign budget, as
    /// one atomic unit:
    ///
    /// 1. loads the campaign with a row lock - a missing campaign and a
    ///    campaign of another advertiser both fail as not found;
    /// 2. checks `price` against `total - allocated` as read under the lock;
    /// 3. inserts the `pending` order;
    /// 4. reserves the price on the [`budget`] ledger, which re-verifies the
    ///    invariant on the post-increment row;
    /// 5. commits - any error before that rolls the whole unit back.
    pub async fn create_order(
        pool: &DbPool,
        advertiser: UserId,
        create_order: CreateOrder,
    ) -> Result<Order, Error> {
        let mut client = pool.get().await?;

        // The reads and writes in this transaction must commit as one atomic
        // unit with respect to all other transactions touching this campaign.
        let transaction = client
            .build_transaction()
            .isolation_level(IsolationLevel::Serializable)
            .start()
            .await?;

        let campaign = fetch_campaign_for_update(&transaction, &create_order.campaign_id)
            .await?
            .ok_or(Error::CampaignNotFound)?;

        // a foreign campaign is indistinguishable from a missing one
        if campaign.advertiser != advertiser {
            return Err(Error::CampaignNotFound);
        }

        if create_order.price > campaign.budget.available() {
            return Err(Error::InsufficientBudget);
        }

        let order = create_order.into_order(advertiser);
        if !insert_order(&transaction, &order).await? {
            return Err(Error::Invariant(format!(
                "order {} was not inserted",
                order.id
            )));
        }

        budget::reserve(&transaction, &order.campaign_id, order.price).await?;

        transaction.commit().await?;

        Ok(order)
    }
}

pub mod lifecycle {
    use tokio_postgres::IsolationLevel;

    use crate::db::order::{fetch_order_for_update, update_order};

    use super::*;

    /// The guarded read-modify-write every lifecycle operation runs:
    /// load the order under a row lock, apply the entity mutation (which
    /// checks the caller and the current status), persist guarded by the
    /// status that was read, commit.
    async fn transition<F>(pool: &DbPool, order_id: &OrderId, apply: F) -> Result<Order, Error>
    where
        F: FnOnce(&mut Order) -> Result<(), primitives::order::Error>,
    {
        let mut client = pool.get().await?;
        let transaction = client
            .build_transaction()
            .isolation_level(IsolationLevel::Serializable)
            .start()
            .await?;

        let mut order = fetch_order_for_update(&transaction, order_id)
            .await?
            .ok_or(Error::NotFound)?;
        let read_status = order.status;

        apply(&mut order)?;

        if !update_order(&transaction, &order, read_status).await? {
            return Err(Error::Invariant(format!(
                "order {} changed underneath its row lock",
                order.id
            )));
        }

        transaction.commit().await?;

        Ok(order)
    }

    pub async fn accept_order(
        pool: &DbPool,
        caller: UserId,
        order_id: &OrderId,
    ) -> Result<Order, Error> {
        transition(pool, order_id, |order| order.accept(caller)).await
    }

    /// Cancels a pending order and returns its reservation to the campaign.
    ///
    /// The status change and the budget release are one atomic unit: if
    /// either fails, neither is visible.
    pub async fn reject_order(
        pool: &DbPool,
        caller: UserId,
        order_id: &OrderId,
        reason: Option<String>,
    ) -> Result<Order, Error> {
        let mut client = pool.get().await?;
        let transaction = client
            .build_transaction()
            .isolation_level(IsolationLevel::Serializable)
            .start()
            .await?;

        let mut order = fetch_order_for_update(&transaction, order_id)
            .await?
            .ok_or(Error::NotFound)?;
        let read_status = order.status;

        order.reject(caller, reason)?;

        if !update_order(&transaction, &order, read_status).await? {
            return Err(Error::Invariant(format!(
                "order {} changed underneath its row lock",
                order.id
            )));
        }

        budget::release(&transaction, &order.campaign_id, order.price).await?;

        transaction.commit().await?;

        Ok(order)
    }

    pub async fn submit_order(
        pool: &DbPool,
        caller: UserId,
        order_id: &OrderId,
        submit: SubmitOrder,
    ) -> Result<Order, Error> {
        transition(pool, order_id, |order| {
            order.submit(caller, submit.content_urls, submit.platform_urls)
        })
        .await
    }

    pub async fn approve_order(
        pool: &DbPool,
        caller: UserId,
        order_id: &OrderId,
    ) -> Result<Order, Error> {
        transition(pool, order_id, |order| order.approve(caller, Utc::now())).await
    }
}
