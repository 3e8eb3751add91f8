use crate::server::{
    Result, ServerError, ServerRouter,
    auth::AuthenticatedUser,
    extract::{Created, Json, Query},
};
use axum::{extract::State, http::StatusCode};
use axum_extra::routing::{RouterExt, TypedPath};
use plauder_common::model::{
    Id,
    feed::{Feed, FeedPost},
    post::{CreatePost, DEFAULT_TIMELINE_LIMIT, MAX_TIMELINE_LIMIT, Post, PostMarker, UpdatePost},
};
use plauder_db::client::{DbClient, DbConnection};
use serde::Deserialize;
use std::sync::Arc;
use tracing::info;

pub fn routes() -> ServerRouter {
    ServerRouter::new()
        .typed_get(get_timeline)
        .typed_post(create_post)
        .typed_get(get_post)
        .typed_put(update_post)
        .typed_delete(delete_post)
        .typed_get(get_post_replies)
}

#[derive(TypedPath, Deserialize)]
#[typed_path("/posts", rejection(ServerError))]
struct PostsPath();

#[derive(TypedPath, Deserialize)]
#[typed_path("/posts/{id}", rejection(ServerError))]
struct PostPath {
    id: Id<PostMarker>,
}

#[derive(TypedPath, Deserialize)]
#[typed_path("/posts/{id}/replies", rejection(ServerError))]
struct PostRepliesPath {
    id: Id<PostMarker>,
}

#[derive(Copy, Clone, Eq, PartialEq, Debug, Default, Hash, Deserialize)]
struct TimelineQuery {
    limit: Option<u32>,
}

impl TimelineQuery {
    fn limit(self) -> u32 {
        self.limit
            .unwrap_or(DEFAULT_TIMELINE_LIMIT)
            .min(MAX_TIMELINE_LIMIT)
    }
}

async fn fetch_existing(conn: &mut DbConnection, id: Id<PostMarker>) -> Result<Post> {
    let post = conn
        .posts()
        .fetch(id)
        .await?
        .ok_or(ServerError::PostByIdNotFound(id))?;

    Ok(post)
}

/// Loads a post the acting user is about to change, rejecting everyone but
/// its author.
async fn fetch_own(
    conn: &mut DbConnection,
    id: Id<PostMarker>,
    user: AuthenticatedUser,
) -> Result<Post> {
    let post = fetch_existing(conn, id).await?;

    if post.author.id != user.user_id() {
        return Err(ServerError::NotPostAuthor {
            user: user.user_id(),
            post: id,
        });
    }

    Ok(post)
}

async fn get_timeline(
    PostsPath(): PostsPath,
    State(db): State<Arc<DbClient>>,
    _user: AuthenticatedUser,
    Query(query): Query<TimelineQuery>,
) -> Result<Json<Feed>> {
    let posts = db.acquire().await?.posts().fetch_timeline(query.limit()).await?;

    Ok(Json(posts.into_iter().collect()))
}

async fn create_post(
    PostsPath(): PostsPath,
    State(db): State<Arc<DbClient>>,
    user: AuthenticatedUser,
    Json(post): Json<CreatePost>,
) -> Result<Created<FeedPost>> {
    let mut conn = db.acquire().await?;

    let id = conn.posts().create(&post, user.user_id()).await?;
    info!(%id, author = %user.user_id(), "Post created");

    let post = fetch_existing(&mut conn, id).await?;
    Ok(Created(post.into()))
}

async fn get_post(
    PostPath { id }: PostPath,
    State(db): State<Arc<DbClient>>,
    _user: AuthenticatedUser,
) -> Result<Json<FeedPost>> {
    let post = fetch_existing(&mut db.acquire().await?, id).await?;

    Ok(Json(post.into()))
}

async fn get_post_replies(
    PostRepliesPath { id }: PostRepliesPath,
    State(db): State<Arc<DbClient>>,
    _user: AuthenticatedUser,
) -> Result<Json<Feed>> {
    let mut conn = db.acquire().await?;

    fetch_existing(&mut conn, id).await?;
    let replies = conn.posts().fetch_replies(id).await?;

    Ok(Json(replies.into_iter().collect()))
}

async fn update_post(
    PostPath { id }: PostPath,
    State(db): State<Arc<DbClient>>,
    user: AuthenticatedUser,
    Json(update): Json<UpdatePost>,
) -> Result<Json<FeedPost>> {
    let mut conn = db.acquire().await?;

    fetch_own(&mut conn, id, user).await?;
    if !conn.posts().update(id, &update.content).await? {
        return Err(ServerError::PostByIdNotFound(id));
    }

    let post = fetch_existing(&mut conn, id).await?;
    Ok(Json(post.into()))
}

async fn delete_post(
    PostPath { id }: PostPath,
    State(db): State<Arc<DbClient>>,
    user: AuthenticatedUser,
) -> Result<StatusCode> {
    let mut conn = db.acquire().await?;

    fetch_own(&mut conn, id, user).await?;
    if !conn.posts().delete(id).await? {
        return Err(ServerError::PostByIdNotFound(id));
    }

    info!(%id, "Post deleted");
    Ok(StatusCode::NO_CONTENT)
}
