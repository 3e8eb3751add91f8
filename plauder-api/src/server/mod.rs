use axum::{
    Router,
    extract::{
        FromRef, Request,
        rejection::{JsonRejection, PathRejection, QueryRejection},
    },
    http::{StatusCode, Uri},
    response::{IntoResponse, Response},
};
use axum_extra::typed_header::TypedHeaderRejection;
use extract::Json;
use plauder_common::{
    credential::{CredentialHashError, CredentialVerifier},
    model::{
        Id,
        post::PostMarker,
        user::{UserMarker, Username},
    },
};
use plauder_db::{
    client::{DbClient, DbError},
    identity::{IdentityError, IdentityResolver, UsernameIdentityResolver},
};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use thiserror::Error;
use tracing::error;

mod auth;
mod extract;
mod routes;

pub type ServerRouter = Router<ServerState>;

#[derive(Clone, FromRef)]
pub struct ServerState {
    pub db_client: Arc<DbClient>,
    pub identity_resolver: Arc<dyn IdentityResolver>,
    pub credential_verifier: Arc<CredentialVerifier>,
}

impl ServerState {
    #[must_use]
    pub fn new(db_client: Arc<DbClient>, credential_verifier: CredentialVerifier) -> Self {
        let identity_resolver = Arc::new(UsernameIdentityResolver::new(Arc::clone(&db_client)));

        Self {
            db_client,
            identity_resolver,
            credential_verifier: Arc::new(credential_verifier),
        }
    }
}

pub fn routes() -> ServerRouter {
    routes::routes().fallback(fallback)
}

pub async fn fallback(request: Request) -> ServerError {
    ServerError::UnknownRoute(request.into_parts().0.uri)
}

pub type Result<T, E = ServerError> = std::result::Result<T, E>;

#[derive(Debug, Error)]
pub enum ServerError {
    #[error("Unknown route requested: {0}")]
    UnknownRoute(Uri),
    #[error("Path rejected: {0}")]
    PathRejection(#[from] PathRejection),
    #[error("Query string rejected: {0}")]
    QueryRejection(#[from] QueryRejection),
    #[error("Incoming JSON rejected: {0}")]
    JsonRejection(#[from] JsonRejection),
    #[error("JSON response could not be serialized: {0}")]
    JsonResponse(#[from] serde_json::Error),
    #[error("Identity header was missing or invalid: {0}")]
    InvalidIdentityHeader(TypedHeaderRejection),
    #[error("The identity claim did not resolve to a user")]
    Unauthenticated,
    #[error("Username or password did not match")]
    InvalidCredentials,
    #[error("User {user} is not the author of post {post}")]
    NotPostAuthor {
        user: Id<UserMarker>,
        post: Id<PostMarker>,
    },
    #[error(transparent)]
    CredentialHash(#[from] CredentialHashError),
    #[error(transparent)]
    Database(#[from] DbError),
    #[error("Post with id {0} was not found.")]
    PostByIdNotFound(Id<PostMarker>),
    #[error("User with id {0} was not found.")]
    UserByIdNotFound(Id<UserMarker>),
    #[error("User with name {0} was not found.")]
    UserByUsernameNotFound(Username),
}

impl From<IdentityError> for ServerError {
    fn from(value: IdentityError) -> Self {
        match value {
            IdentityError::Unauthenticated => ServerError::Unauthenticated,
            IdentityError::Database(err) => ServerError::Database(err),
        }
    }
}

impl ServerError {
    pub fn status(&self) -> StatusCode {
        match self {
            ServerError::UnknownRoute(_)
            | ServerError::PathRejection(_)
            | ServerError::PostByIdNotFound(_)
            | ServerError::UserByIdNotFound(_)
            | ServerError::UserByUsernameNotFound(_) => StatusCode::NOT_FOUND,
            ServerError::InvalidIdentityHeader(rejection) if rejection.is_missing() => {
                StatusCode::UNAUTHORIZED
            }
            ServerError::Unauthenticated | ServerError::InvalidCredentials => {
                StatusCode::UNAUTHORIZED
            }
            ServerError::NotPostAuthor { .. } => StatusCode::FORBIDDEN,
            ServerError::Database(DbError::UsernameTaken(_)) => StatusCode::CONFLICT,
            ServerError::QueryRejection(_)
            | ServerError::JsonRejection(_)
            | ServerError::InvalidIdentityHeader(_) => StatusCode::BAD_REQUEST,
            ServerError::JsonResponse(_)
            | ServerError::Database(_)
            | ServerError::CredentialHash(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

#[derive(Copy, Clone, Eq, PartialEq, Ord, PartialOrd, Hash, Serialize, Deserialize)]
struct ErrorResponse {
    status: u16,
}

impl IntoResponse for ServerError {
    fn into_response(self) -> Response {
        let status = self.status();

        error!(error = %self, %status, "Replying with error");

        let error_response = ErrorResponse {
            status: status.as_u16(),
        };
        (status, Json(error_response)).into_response()
    }
}
