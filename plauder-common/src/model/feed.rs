//! Response shapes for post reads.
//!
//! The follow graph and likes are not implemented. Their fields are still
//! part of the response so clients can rely on them, and they always carry
//! the literal defaults set in [`FeedPost::from`].

use crate::model::{
    Id,
    post::{Post, PostMarker},
    user::{UserMarker, Username},
};
use serde::Serialize;
use time::OffsetDateTime;

#[derive(Clone, Eq, PartialEq, Debug, Hash, Serialize)]
pub struct FeedPost {
    pub post_id: Id<PostMarker>,
    pub user_id: Id<UserMarker>,
    pub username: Username,
    pub content: String,
    #[serde(rename = "avatar_img")]
    pub avatar: String,
    pub is_following: bool,
    #[serde(with = "time::serde::rfc3339")]
    pub created_at: OffsetDateTime,
    pub repost_count: u64,
    pub like_count: u64,
    pub reply_count: u64,
    pub is_liked: bool,
    pub reply_to_id: Option<Id<PostMarker>>,
    pub repost_of_id: Option<Id<PostMarker>>,
    pub repost_of_content: Option<String>,
}

impl From<Post> for FeedPost {
    fn from(post: Post) -> Self {
        Self {
            post_id: post.id,
            user_id: post.author.id,
            username: post.author.username,
            content: post.content.into_inner(),
            avatar: post.author.avatar,
            is_following: false,
            created_at: post.created_at,
            repost_count: post.repost_count,
            like_count: 0,
            reply_count: post.reply_count,
            is_liked: false,
            reply_to_id: post.reply_to,
            repost_of_id: post.repost_of,
            repost_of_content: post.repost_of_content,
        }
    }
}

#[derive(Clone, Eq, PartialEq, Debug, Hash, Serialize)]
pub struct Feed {
    pub posts: Vec<FeedPost>,
    pub total_posts: usize,
}

impl FromIterator<Post> for Feed {
    fn from_iter<I: IntoIterator<Item = Post>>(iter: I) -> Self {
        let posts: Vec<FeedPost> = iter.into_iter().map(FeedPost::from).collect();
        let total_posts = posts.len();

        Self { posts, total_posts }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::post::{PostAuthor, PostContent};

    fn post(id: i64, reply_count: u64, repost_count: u64) -> Post {
        Post {
            id: Id::new(id),
            author: PostAuthor {
                id: Id::new(7),
                username: Username::new("alice".to_owned()).unwrap(),
                avatar: "alice.png".to_owned(),
            },
            content: PostContent::new(format!("post {id}")).unwrap(),
            reply_to: None,
            repost_of: Some(Id::new(1)),
            repost_of_content: None,
            reply_count,
            repost_count,
            created_at: OffsetDateTime::UNIX_EPOCH,
        }
    }

    #[test]
    fn placeholders_keep_their_defaults() {
        // Heavily replied and reposted, still never liked or followed.
        let feed_post = FeedPost::from(post(3, 12, 9));

        assert!(!feed_post.is_following);
        assert!(!feed_post.is_liked);
        assert_eq!(feed_post.like_count, 0);
        assert_eq!(feed_post.reply_count, 12);
        assert_eq!(feed_post.repost_count, 9);
    }

    #[test]
    fn author_and_references_are_carried_over() {
        let feed_post = FeedPost::from(post(3, 0, 0));

        assert_eq!(feed_post.post_id, Id::new(3));
        assert_eq!(feed_post.user_id, Id::new(7));
        assert_eq!(feed_post.username.get(), "alice");
        assert_eq!(feed_post.avatar, "alice.png");
        assert_eq!(feed_post.content, "post 3");
        assert_eq!(feed_post.reply_to_id, None);
        assert_eq!(feed_post.repost_of_id, Some(Id::new(1)));
        assert_eq!(feed_post.repost_of_content, None);
    }

    #[test]
    fn feed_counts_its_posts_in_order() {
        let feed: Feed = vec![post(2, 0, 0), post(1, 0, 0)].into_iter().collect();

        assert_eq!(feed.total_posts, 2);
        let ids: Vec<i64> = feed.posts.iter().map(|p| p.post_id.get()).collect();
        assert_eq!(ids, [2, 1]);
    }

    #[test]
    fn missing_repost_source_serializes_as_null() {
        let json = serde_json::to_value(FeedPost::from(post(3, 0, 0))).unwrap();

        assert!(json["repost_of_content"].is_null());
        assert_eq!(json["repost_of_id"], 1);
        assert_eq!(json["created_at"], "1970-01-01T00:00:00Z");
        assert_eq!(json["avatar_img"], "alice.png");
    }
}
