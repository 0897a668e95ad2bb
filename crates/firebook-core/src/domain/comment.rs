use serde::{Deserialize, Serialize};

use super::{new_id, now_millis};

/// Comment entity - a reply attached to a post through `post_id`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Comment {
    pub id: String,
    pub post_id: String,
    pub author: String,
    pub text: String,
    pub posted_at: i64,
}

impl Comment {
    pub fn new(
        post_id: impl Into<String>,
        author: impl Into<String>,
        text: impl Into<String>,
    ) -> Self {
        Self {
            id: new_id(),
            post_id: post_id.into(),
            author: author.into(),
            text: text.into(),
            posted_at: now_millis(),
        }
    }
}
