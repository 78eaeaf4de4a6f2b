#![deny(clippy::all)]
#![deny(rust_2018_idioms)]

use slog::Logger;

use primitives::{Role, UserId};

use crate::{application::Config, auth::Authenticator, db::DbPool};

pub mod application;
pub mod auth;
pub mod db;
pub mod middleware;
pub mod response;
pub mod routes {
    pub mod campaigns;
    pub mod orders;
    pub mod routers;
}

pub use response::ResponseError;

/// The struct that holds the state of the whole application.
///
/// It is cheap to clone and a clone is shared with every request through an
/// axum `Extension`.
#[derive(Clone)]
pub struct Application<A: Authenticator> {
    /// Resolves Bearer tokens into caller identities; credential issuance
    /// itself lives outside of this application.
    pub authenticator: A,
    pub logger: Logger,
    pub pool: DbPool,
    pub config: Config,
}

impl<A: Authenticator + 'static> Application<A> {
    pub fn new(authenticator: A, config: Config, logger: Logger, pool: DbPool) -> Self {
        Self {
            authenticator,
            logger,
            pool,
            config,
        }
    }
}

/// The authenticated caller of the current request.
///
/// Inserted as a request extension by [`middleware::auth::authenticate`]
/// when a valid Bearer token is provided.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Auth {
    pub uid: UserId,
    pub role: Role,
}
