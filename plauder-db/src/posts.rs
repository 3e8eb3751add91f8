use crate::{client::Result, record::PostRecord};
use plauder_common::model::{
    Id,
    post::{CreatePost, Post, PostContent, PostMarker},
    user::{UserMarker, Username},
};
use sqlx::{SqliteConnection, query, query_as};
use tracing::debug;

// Every read goes through this projection. Reply and repost counts are
// computed per row from the indexed reference columns; the repost source is
// left-joined so a deleted source yields NULL content instead of dropping
// the row. Posts whose author no longer exists are invisible everywhere,
// including the counts and the repost source.
const SELECT_POSTS: &str = "
    SELECT
        p.id AS post_id,
        u.id AS user_id,
        u.username,
        u.avatar,
        p.content,
        p.reply_to_id,
        p.repost_of_id,
        rp.content AS repost_of_content,
        (
            SELECT COUNT(*) FROM posts r JOIN users ru ON r.user_id = ru.id
            WHERE r.reply_to_id = p.id
        ) AS reply_count,
        (
            SELECT COUNT(*) FROM posts r JOIN users ru ON r.user_id = ru.id
            WHERE r.repost_of_id = p.id
        ) AS repost_count,
        p.created_at
    FROM
        posts p
        JOIN users u ON p.user_id = u.id
        LEFT JOIN (
            SELECT posts.id, posts.content
            FROM posts JOIN users ON posts.user_id = users.id
        ) rp ON p.repost_of_id = rp.id
";

const NEWEST_FIRST: &str = "ORDER BY p.created_at DESC, p.id DESC";

/// Persistence for the `posts` table and its aggregated read projection.
///
/// This is pure data access. Whether the acting user may touch a post is
/// decided by the caller before any of these methods run.
pub struct PostRepository<'c> {
    conn: &'c mut SqliteConnection,
}

impl<'c> PostRepository<'c> {
    pub(crate) fn new(conn: &'c mut SqliteConnection) -> Self {
        Self { conn }
    }

    /// Inserts a post. `reply_to_id` and `repost_of_id` are stored as given;
    /// nothing checks that they point at an existing post.
    pub async fn create(
        &mut self,
        post: &CreatePost,
        author: Id<UserMarker>,
    ) -> Result<Id<PostMarker>> {
        let result = query(
            "
            INSERT INTO posts (user_id, content, reply_to_id, repost_of_id)
            VALUES (?, ?, ?, ?)
            ",
        )
        .bind(author.get())
        .bind(post.content.get())
        .bind(post.reply_to_id.map(Id::get))
        .bind(post.repost_of_id.map(Id::get))
        .execute(&mut *self.conn)
        .await?;

        let id = result.last_insert_rowid();
        debug!(
            %id,
            %author,
            reply_to = ?post.reply_to_id,
            repost_of = ?post.repost_of_id,
            "Created post"
        );

        Ok(id.into())
    }

    pub async fn fetch(&mut self, post_id: Id<PostMarker>) -> Result<Option<Post>> {
        let record = query_as::<_, PostRecord>(&format!("{SELECT_POSTS} WHERE p.id = ?"))
            .bind(post_id.get())
            .fetch_optional(&mut *self.conn)
            .await?;

        let post = record.map(Post::try_from).transpose()?;
        Ok(post)
    }

    /// The global timeline, newest first, at most `limit` posts.
    pub async fn fetch_timeline(&mut self, limit: u32) -> Result<Vec<Post>> {
        let records = query_as::<_, PostRecord>(&format!("{SELECT_POSTS} {NEWEST_FIRST} LIMIT ?"))
            .bind(limit)
            .fetch_all(&mut *self.conn)
            .await?;

        collect_posts(records)
    }

    pub async fn fetch_by_username(&mut self, username: &Username) -> Result<Vec<Post>> {
        let records = query_as::<_, PostRecord>(&format!(
            "{SELECT_POSTS} WHERE u.username = ? {NEWEST_FIRST}"
        ))
        .bind(username.get())
        .fetch_all(&mut *self.conn)
        .await?;

        collect_posts(records)
    }

    /// Direct replies to `post_id`, newest first.
    ///
    /// An unknown `post_id` simply has no replies; callers that need a 404
    /// must check the post exists first.
    pub async fn fetch_replies(&mut self, post_id: Id<PostMarker>) -> Result<Vec<Post>> {
        let records = query_as::<_, PostRecord>(&format!(
            "{SELECT_POSTS} WHERE p.reply_to_id = ? {NEWEST_FIRST}"
        ))
        .bind(post_id.get())
        .fetch_all(&mut *self.conn)
        .await?;

        collect_posts(records)
    }

    /// Replaces the content of a post. Returns `false` if there is no such post.
    pub async fn update(&mut self, post_id: Id<PostMarker>, content: &PostContent) -> Result<bool> {
        let result = query("UPDATE posts SET content = ? WHERE id = ?")
            .bind(content.get())
            .bind(post_id.get())
            .execute(&mut *self.conn)
            .await?;

        debug!(id = %post_id, updated = result.rows_affected(), "Updated post");
        Ok(result.rows_affected() > 0)
    }

    /// Hard delete. Replies and reposts of the post keep their reference.
    pub async fn delete(&mut self, post_id: Id<PostMarker>) -> Result<bool> {
        let result = query("DELETE FROM posts WHERE id = ?")
            .bind(post_id.get())
            .execute(&mut *self.conn)
            .await?;

        debug!(id = %post_id, deleted = result.rows_affected(), "Deleted post");
        Ok(result.rows_affected() > 0)
    }
}

fn collect_posts(records: Vec<PostRecord>) -> Result<Vec<Post>> {
    let posts = records
        .into_iter()
        .map(Post::try_from)
        .collect::<Result<_, _>>()?;
    Ok(posts)
}
