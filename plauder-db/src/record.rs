use plauder_common::model::{
    ModelValidationError,
    post::{Post, PostAuthor, PostContent},
    user::{User, Username},
};
use sqlx::FromRow;
use time::PrimitiveDateTime;

#[derive(Clone, Eq, PartialEq, Debug, Hash, FromRow)]
pub(crate) struct UserRecord {
    pub id: i64,
    pub username: String,
    pub biography: String,
    pub avatar: String,
    pub created_at: PrimitiveDateTime,
}

/// One row of the aggregated post projection.
#[derive(Clone, Eq, PartialEq, Debug, Hash, FromRow)]
pub(crate) struct PostRecord {
    pub post_id: i64,
    pub user_id: i64,
    pub username: String,
    pub avatar: String,
    pub content: String,
    pub reply_to_id: Option<i64>,
    pub repost_of_id: Option<i64>,
    pub repost_of_content: Option<String>,
    pub reply_count: i64,
    pub repost_count: i64,
    pub created_at: PrimitiveDateTime,
}

impl TryFrom<UserRecord> for User {
    type Error = ModelValidationError;

    fn try_from(value: UserRecord) -> Result<Self, Self::Error> {
        Ok(Self {
            id: value.id.into(),
            username: Username::new(value.username)?,
            biography: value.biography,
            avatar: value.avatar,
            created_at: value.created_at.assume_utc(),
        })
    }
}

impl TryFrom<PostRecord> for Post {
    type Error = ModelValidationError;

    fn try_from(value: PostRecord) -> Result<Self, Self::Error> {
        Ok(Self {
            id: value.post_id.into(),
            author: PostAuthor {
                id: value.user_id.into(),
                username: Username::new(value.username)?,
                avatar: value.avatar,
            },
            content: PostContent::new(value.content)?,
            reply_to: value.reply_to_id.map(Into::into),
            repost_of: value.repost_of_id.map(Into::into),
            repost_of_content: value.repost_of_content,
            reply_count: value.reply_count.cast_unsigned(),
            repost_count: value.repost_count.cast_unsigned(),
            created_at: value.created_at.assume_utc(),
        })
    }
}
