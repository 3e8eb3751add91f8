use crate::model::{
    Id,
    user::{UserMarker, Username},
};
use serde::{
    Deserialize, Deserializer, Serialize,
    de::{Error, Unexpected},
};
use thiserror::Error;
use time::OffsetDateTime;

/// Number of posts a timeline returns when the client does not ask for a
/// specific count.
pub const DEFAULT_TIMELINE_LIMIT: u32 = 50;
pub const MAX_TIMELINE_LIMIT: u32 = 100;

#[derive(Copy, Clone, Eq, PartialEq, Ord, PartialOrd, Debug, Default, Hash)]
pub struct PostMarker;

/// A post together with everything derived from other rows at read time.
#[derive(Clone, Eq, PartialEq, Debug, Hash)]
pub struct Post {
    pub id: Id<PostMarker>,
    pub author: PostAuthor,
    pub content: PostContent,
    pub reply_to: Option<Id<PostMarker>>,
    pub repost_of: Option<Id<PostMarker>>,
    /// `None` both for plain posts and for reposts whose source was deleted.
    pub repost_of_content: Option<String>,
    pub reply_count: u64,
    pub repost_count: u64,
    pub created_at: OffsetDateTime,
}

#[derive(Clone, Eq, PartialEq, Debug, Hash)]
pub struct PostAuthor {
    pub id: Id<UserMarker>,
    pub username: Username,
    pub avatar: String,
}

/// Body of a create-post request. Both references are stored as given.
#[derive(Clone, Eq, PartialEq, Debug, Hash, Deserialize, Serialize)]
pub struct CreatePost {
    pub content: PostContent,
    #[serde(default)]
    pub reply_to_id: Option<Id<PostMarker>>,
    #[serde(default)]
    pub repost_of_id: Option<Id<PostMarker>>,
}

impl CreatePost {
    #[must_use]
    pub fn new(content: PostContent) -> Self {
        Self {
            content,
            reply_to_id: None,
            repost_of_id: None,
        }
    }

    #[must_use]
    pub fn reply_to(mut self, post: Id<PostMarker>) -> Self {
        self.reply_to_id = Some(post);
        self
    }

    #[must_use]
    pub fn repost_of(mut self, post: Id<PostMarker>) -> Self {
        self.repost_of_id = Some(post);
        self
    }
}

#[derive(Clone, Eq, PartialEq, Debug, Hash, Deserialize, Serialize)]
pub struct UpdatePost {
    pub content: PostContent,
}

#[derive(Clone, Eq, PartialEq, Ord, PartialOrd, Debug, Default, Hash, Serialize)]
#[serde(transparent)]
pub struct PostContent(String);

#[derive(Copy, Clone, Eq, PartialEq, Ord, PartialOrd, Debug, Default, Hash, Error)]
#[error("Post content must not be empty")]
pub struct EmptyPostContentError;

impl PostContent {
    pub fn new(content: String) -> Result<Self, EmptyPostContentError> {
        if content.trim().is_empty() {
            Err(EmptyPostContentError)
        } else {
            Ok(Self(content))
        }
    }

    #[must_use]
    pub fn get(&self) -> &str {
        &self.0
    }

    #[must_use]
    pub fn into_inner(self) -> String {
        self.0
    }
}

impl<'de> Deserialize<'de> for PostContent {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        let inner = String::deserialize(deserializer)?;
        PostContent::new(inner)
            .map_err(|_| Error::invalid_value(Unexpected::Str(""), &"non-empty post content"))
    }
}
