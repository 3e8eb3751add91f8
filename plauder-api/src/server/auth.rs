use crate::server::ServerError;
use axum::{
    extract::{FromRef, FromRequestParts},
    http::request::Parts,
};
use axum_extra::TypedHeader;
use headers::{Header, HeaderName, HeaderValue};
use plauder_common::model::{Id, user::UserMarker};
use plauder_db::identity::IdentityResolver;
use std::{hash::Hash, sync::Arc};

static IDENTITY_CLAIM_HEADER: HeaderName = HeaderName::from_static("username");

/// The `username` request header, carrying the caller's identity claim.
#[derive(Clone, Eq, PartialEq, Debug, Hash)]
pub struct IdentityClaim(String);

impl IdentityClaim {
    #[must_use]
    pub fn get(&self) -> &str {
        &self.0
    }
}

impl Header for IdentityClaim {
    fn name() -> &'static HeaderName {
        &IDENTITY_CLAIM_HEADER
    }

    fn decode<'i, I>(values: &mut I) -> Result<Self, headers::Error>
    where
        I: Iterator<Item = &'i HeaderValue>,
    {
        let value = values.next().ok_or_else(headers::Error::invalid)?;
        if values.next().is_some() {
            return Err(headers::Error::invalid());
        }

        // Usernames are not limited to ASCII, so the raw bytes are read as UTF-8.
        let claim = std::str::from_utf8(value.as_bytes()).map_err(|_| headers::Error::invalid())?;
        Ok(Self(claim.to_owned()))
    }

    fn encode<E: Extend<HeaderValue>>(&self, values: &mut E) {
        if let Ok(value) = HeaderValue::from_bytes(self.0.as_bytes()) {
            values.extend(std::iter::once(value));
        }
    }
}

/// A request whose identity claim resolved to an existing user.
///
/// Handlers that take this extractor never run for unresolvable claims.
#[derive(Copy, Clone, Eq, PartialEq, Ord, PartialOrd, Debug, Default, Hash)]
pub struct AuthenticatedUser {
    id: Id<UserMarker>,
}

impl AuthenticatedUser {
    #[must_use]
    pub fn user_id(self) -> Id<UserMarker> {
        self.id
    }
}

impl<S> FromRequestParts<S> for AuthenticatedUser
where
    Arc<dyn IdentityResolver>: FromRef<S>,
    S: Send + Sync,
{
    type Rejection = ServerError;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        let TypedHeader(claim) = TypedHeader::<IdentityClaim>::from_request_parts(parts, state)
            .await
            .map_err(ServerError::InvalidIdentityHeader)?;

        let resolver = Arc::<dyn IdentityResolver>::from_ref(state);
        let id = resolver.resolve(claim.get()).await?;

        Ok(Self { id })
    }
}
