//! Domain entities - the records served by the mock API.

mod comment;
mod post;
mod record;
mod user;

pub use comment::Comment;
pub use post::Post;
pub use record::{ID_FIELD, Record, RecordExt, id_key, new_id, to_record};
pub use user::{InsecureAuthInfo, User};

/// Milliseconds since the Unix epoch, the timestamp format used on the wire.
pub fn now_millis() -> i64 {
    chrono::Utc::now().timestamp_millis()
}
