use serde::{Deserialize, Serialize};

use super::{new_id, now_millis};

/// Post entity - an entry in the feed.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Post {
    pub id: String,
    /// Id of the authoring user.
    pub author: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub text: Option<String>,
    /// Download URL of the attached image, if any.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub img_src: Option<String>,
    pub posted_at: i64,
    /// Ids of the users who liked the post.
    #[serde(default)]
    pub likes: Vec<String>,
    /// Denormalized count of comments referencing this post.
    #[serde(default)]
    pub total_comments: i64,
}

impl Post {
    /// Create a new post with a generated id and no likes or comments.
    pub fn new(author: impl Into<String>, text: impl Into<String>) -> Self {
        Self {
            id: new_id(),
            author: author.into(),
            text: Some(text.into()),
            img_src: None,
            posted_at: now_millis(),
            likes: Vec::new(),
            total_comments: 0,
        }
    }

    pub fn with_image(mut self, img_src: impl Into<String>) -> Self {
        self.img_src = Some(img_src.into());
        self
    }
}
