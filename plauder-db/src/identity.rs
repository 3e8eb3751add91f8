//! Per-request identity resolution.
//!
//! A request carries an identity claim; a resolver turns it into the id of an
//! existing user or fails closed. The only resolver today trusts the claim as
//! a username that was authenticated out of band. It does not check a
//! password or session on each request. Stronger schemes can implement
//! [`IdentityResolver`] without touching the repositories.

use crate::client::{DbClient, DbError};
use async_trait::async_trait;
use plauder_common::model::{
    Id,
    user::{UserMarker, Username},
};
use std::sync::Arc;
use thiserror::Error;
use tracing::debug;

#[derive(Debug, Error)]
pub enum IdentityError {
    #[error("The identity claim does not match any user")]
    Unauthenticated,
    #[error(transparent)]
    Database(#[from] DbError),
}

#[async_trait]
pub trait IdentityResolver: Send + Sync {
    async fn resolve(&self, claim: &str) -> Result<Id<UserMarker>, IdentityError>;
}

/// Resolves a claim by exact, case-sensitive username match.
#[derive(Clone, Debug)]
pub struct UsernameIdentityResolver {
    db: Arc<DbClient>,
}

impl UsernameIdentityResolver {
    #[must_use]
    pub fn new(db: Arc<DbClient>) -> Self {
        Self { db }
    }
}

#[async_trait]
impl IdentityResolver for UsernameIdentityResolver {
    async fn resolve(&self, claim: &str) -> Result<Id<UserMarker>, IdentityError> {
        let Ok(username) = Username::new(claim.to_owned()) else {
            debug!("Identity claim is not a valid username");
            return Err(IdentityError::Unauthenticated);
        };

        let mut conn = self.db.acquire().await?;
        let user = conn
            .users()
            .fetch_by_username(&username)
            .await?
            .ok_or(IdentityError::Unauthenticated)?;

        Ok(user.id)
    }
}
