use crate::server::{
    Result, ServerError, ServerRouter,
    auth::AuthenticatedUser,
    extract::{Created, Json},
};
use axum::{extract::State, http::StatusCode};
use axum_extra::routing::{RouterExt, TypedPath};
use plauder_common::{
    credential::CredentialVerifier,
    model::{
        feed::Feed,
        user::{
            Credentials, IdentityConfirmation, NewUser, UpdatePassword, UpdateProfile, User,
            Username,
        },
    },
};
use plauder_db::client::DbClient;
use serde::Deserialize;
use std::sync::Arc;
use tracing::{info, warn};

pub fn routes() -> ServerRouter {
    ServerRouter::new()
        .typed_post(signup)
        .typed_post(login)
        .typed_post(logout)
        .typed_get(get_me)
        .typed_put(update_me)
        .typed_delete(delete_me)
        .typed_put(update_password)
        .typed_get(get_user)
        .typed_get(get_user_posts)
}

#[derive(TypedPath, Deserialize)]
#[typed_path("/users/signup", rejection(ServerError))]
struct SignupPath();

#[derive(TypedPath, Deserialize)]
#[typed_path("/users/login", rejection(ServerError))]
struct LoginPath();

#[derive(TypedPath, Deserialize)]
#[typed_path("/users/logout", rejection(ServerError))]
struct LogoutPath();

#[derive(TypedPath, Deserialize)]
#[typed_path("/users/me", rejection(ServerError))]
struct MePath();

#[derive(TypedPath, Deserialize)]
#[typed_path("/users/me/password", rejection(ServerError))]
struct MePasswordPath();

#[derive(TypedPath, Deserialize)]
#[typed_path("/users/{username}", rejection(ServerError))]
struct UserPath {
    username: Username,
}

#[derive(TypedPath, Deserialize)]
#[typed_path("/users/{username}/posts", rejection(ServerError))]
struct UserPostsPath {
    username: Username,
}

async fn signup(
    SignupPath(): SignupPath,
    State(db): State<Arc<DbClient>>,
    State(verifier): State<Arc<CredentialVerifier>>,
    Json(credentials): Json<Credentials>,
) -> Result<Created<IdentityConfirmation>> {
    let credential = verifier.hash(&credentials.password)?;
    let new_user = NewUser::new(credentials.username, credential);

    let id = db.acquire().await?.users().create(&new_user).await?;
    info!(%id, username = %new_user.username, "User signed up");

    Ok(Created(IdentityConfirmation {
        username: new_user.username,
    }))
}

async fn login(
    LoginPath(): LoginPath,
    State(db): State<Arc<DbClient>>,
    State(verifier): State<Arc<CredentialVerifier>>,
    Json(credentials): Json<Credentials>,
) -> Result<Json<IdentityConfirmation>> {
    let stored = db
        .acquire()
        .await?
        .users()
        .fetch_credential(&credentials.username)
        .await?;

    let verified =
        stored.is_some_and(|stored| verifier.verify(&credentials.password, &stored));
    if !verified {
        warn!(username = %credentials.username, "Rejected login");
        return Err(ServerError::InvalidCredentials);
    }

    info!(username = %credentials.username, "User logged in");
    Ok(Json(IdentityConfirmation {
        username: credentials.username,
    }))
}

/// There is no server-side session to end, so this only confirms the caller
/// is known.
#[allow(clippy::unused_async)]
async fn logout(LogoutPath(): LogoutPath, _user: AuthenticatedUser) -> StatusCode {
    StatusCode::NO_CONTENT
}

async fn get_me(
    MePath(): MePath,
    State(db): State<Arc<DbClient>>,
    user: AuthenticatedUser,
) -> Result<Json<User>> {
    let id = user.user_id();
    let user = db
        .acquire()
        .await?
        .users()
        .fetch(id)
        .await?
        .ok_or(ServerError::UserByIdNotFound(id))?;

    Ok(Json(user))
}

async fn update_me(
    MePath(): MePath,
    State(db): State<Arc<DbClient>>,
    user: AuthenticatedUser,
    Json(profile): Json<UpdateProfile>,
) -> Result<Json<User>> {
    let id = user.user_id();
    let user = db
        .acquire()
        .await?
        .users()
        .update(id, &profile)
        .await?
        .ok_or(ServerError::UserByIdNotFound(id))?;

    Ok(Json(user))
}

async fn update_password(
    MePasswordPath(): MePasswordPath,
    State(db): State<Arc<DbClient>>,
    State(verifier): State<Arc<CredentialVerifier>>,
    user: AuthenticatedUser,
    Json(update): Json<UpdatePassword>,
) -> Result<StatusCode> {
    let id = user.user_id();
    let credential = verifier.hash(&update.password)?;

    let updated = db
        .acquire()
        .await?
        .users()
        .update_credential(id, &credential)
        .await?;
    if !updated {
        return Err(ServerError::UserByIdNotFound(id));
    }

    Ok(StatusCode::NO_CONTENT)
}

async fn delete_me(
    MePath(): MePath,
    State(db): State<Arc<DbClient>>,
    user: AuthenticatedUser,
) -> Result<StatusCode> {
    let id = user.user_id();
    if !db.acquire().await?.users().delete(id).await? {
        return Err(ServerError::UserByIdNotFound(id));
    }

    info!(%id, "User deleted their account");
    Ok(StatusCode::NO_CONTENT)
}

async fn get_user(
    UserPath { username }: UserPath,
    State(db): State<Arc<DbClient>>,
    _user: AuthenticatedUser,
) -> Result<Json<User>> {
    let user = db
        .acquire()
        .await?
        .users()
        .fetch_by_username(&username)
        .await?
        .ok_or(ServerError::UserByUsernameNotFound(username))?;

    Ok(Json(user))
}

async fn get_user_posts(
    UserPostsPath { username }: UserPostsPath,
    State(db): State<Arc<DbClient>>,
    _user: AuthenticatedUser,
) -> Result<Json<Feed>> {
    let mut conn = db.acquire().await?;

    if conn.users().fetch_by_username(&username).await?.is_none() {
        return Err(ServerError::UserByUsernameNotFound(username));
    }
    let posts = conn.posts().fetch_by_username(&username).await?;

    Ok(Json(posts.into_iter().collect()))
}
