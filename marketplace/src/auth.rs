//! Resolving Bearer tokens into caller identities.
//!
//! Credential issuance is not part of this application - callers arrive
//! with a token minted elsewhere and an [`Authenticator`] only maps it to
//! the session it represents.

use std::{collections::HashMap, sync::Arc};

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use primitives::{Role, UserId};

/// The identity a valid token resolves to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Session {
    pub uid: UserId,
    pub role: Role,
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum Error {
    #[error("invalid authorization token")]
    InvalidToken,
}

#[async_trait]
pub trait Authenticator: Clone + Send + Sync {
    async fn session_from_token(&self, token: &str) -> Result<Session, Error>;
}

/// An [`Authenticator`] backed by a static token map.
///
/// Used for local runs and tests; the map is loaded from a JSON file of
/// `token -> {uid, role}` entries (see the `--auth` CLI argument).
#[derive(Debug, Clone, Default)]
pub struct Dummy {
    tokens: Arc<HashMap<String, Session>>,
}

impl Dummy {
    pub fn new(tokens: HashMap<String, Session>) -> Self {
        Self {
            tokens: Arc::new(tokens),
        }
    }
}

#[async_trait]
impl Authenticator for Dummy {
    async fn session_from_token(&self, token: &str) -> Result<Session, Error> {
        self.tokens.get(token).copied().ok_or(Error::InvalidToken)
    }
}
