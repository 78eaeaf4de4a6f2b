//! The marketplace REST API routers.
//!
//! Routes are grouped by the role that may call them; each group carries
//! its own role guard and the top-level router layers the authentication
//! middleware and the shared [`Application`] extension around everything.

use std::sync::Arc;

use axum::{
    middleware,
    routing::{get, post},
    Extension, Router,
};
use tower::ServiceBuilder;
use tower_http::cors::CorsLayer;

use crate::{
    auth::Authenticator,
    middleware::{
        auth::{
            authenticate, authenticate_as_advertiser, authenticate_as_blogger,
            authentication_required,
        },
        campaign::campaign_load,
    },
    routes::{campaigns, orders},
    Application,
};

pub fn router<A: Authenticator + 'static>(app: Arc<Application<A>>) -> Router {
    Router::new()
        .nest("/v1/campaign", campaigns_router::<A>())
        .nest("/v1/order", orders_router::<A>())
        .layer(
            ServiceBuilder::new()
                .layer(CorsLayer::permissive())
                .layer(Extension(app))
                .layer(middleware::from_fn(authenticate::<A, _>)),
        )
}

/// `POST /v1/order` (advertiser) - place an order against a campaign
///
/// `GET /v1/order/advertiser` (advertiser) - the advertiser's orders
///
/// `GET /v1/order/blogger` (blogger) - the blogger's orders
///
/// `GET /v1/order/:id` (participant or admin) - a single order
///
/// `POST /v1/order/:id/accept` (blogger) - start working on the order
///
/// `POST /v1/order/:id/reject` (blogger) - turn the order down
///
/// `POST /v1/order/:id/submit` (blogger) - hand in the deliverables
///
/// `POST /v1/order/:id/approve` (advertiser) - accept the submitted work
fn orders_router<A: Authenticator + 'static>() -> Router {
    let for_advertisers = Router::new()
        .route("/", post(orders::create_order::<A>))
        .route("/advertiser", get(orders::advertiser_orders::<A>))
        .route("/:id/approve", post(orders::approve_order::<A>))
        .route_layer(middleware::from_fn(authenticate_as_advertiser));

    let for_bloggers = Router::new()
        .route("/blogger", get(orders::blogger_orders::<A>))
        .route("/:id/accept", post(orders::accept_order::<A>))
        .route("/:id/reject", post(orders::reject_order::<A>))
        .route("/:id/submit", post(orders::submit_order::<A>))
        .route_layer(middleware::from_fn(authenticate_as_blogger));

    let for_participants = Router::new()
        .route("/:id", get(orders::get_order::<A>))
        .route_layer(middleware::from_fn(authentication_required));

    Router::new()
        .merge(for_advertisers)
        .merge(for_bloggers)
        .merge(for_participants)
}

/// `POST /v1/campaign` - create a campaign
///
/// `GET /v1/campaign/list` - the advertiser's campaigns
///
/// `GET /v1/campaign/:id` - a single campaign with its derived spending
fn campaigns_router<A: Authenticator + 'static>() -> Router {
    let by_id = Router::new()
        .route("/:id", get(campaigns::get_campaign::<A>))
        .route_layer(middleware::from_fn(campaign_load::<A, _>));

    Router::new()
        .route("/", post(campaigns::create_campaign::<A>))
        .route("/list", get(campaigns::campaign_list::<A>))
        .merge(by_id)
        .route_layer(middleware::from_fn(authenticate_as_advertiser))
}
