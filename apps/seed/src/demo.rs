//! Demo database contents.

use serde_json::{Map, Value};

use firebook_core::domain::{Comment, InsecureAuthInfo, Post, User, to_record};

/// Two users with login entries, three posts (one with a picture) and
/// their comments.
///
/// Every post's `totalComments` matches the comments that reference it.
pub fn demo_database() -> Result<Value, serde_json::Error> {
    let alice = User::new("Alice");
    let bob = User::new("Bob");

    let auth = vec![
        InsecureAuthInfo::new(&alice, "alice@example.com", "password"),
        InsecureAuthInfo::new(&bob, "bob@example.com", "password"),
    ];

    let mut posts = vec![
        Post::new(&alice.id, "Hello, Firebook!"),
        Post::new(&bob.id, "Trying out the mock API.")
            .with_image("https://picsum.photos/seed/firebook/600/400"),
        Post::new(&alice.id, "Nobody has commented on this one yet."),
    ];

    let comments = vec![
        Comment::new(&posts[0].id, &bob.id, "Welcome!"),
        Comment::new(&posts[0].id, &alice.id, "Thanks, Bob."),
        Comment::new(&posts[1].id, &alice.id, "Looks good."),
    ];

    for post in &mut posts {
        post.total_comments = comments.iter().filter(|c| c.post_id == post.id).count() as i64;
    }

    let mut db = Map::new();
    db.insert("users".to_string(), records(&[alice, bob])?);
    db.insert("insecureAuthInfo".to_string(), records(&auth)?);
    db.insert("posts".to_string(), records(&posts)?);
    db.insert("comments".to_string(), records(&comments)?);
    Ok(Value::Object(db))
}

fn records<T: serde::Serialize>(entities: &[T]) -> Result<Value, serde_json::Error> {
    entities
        .iter()
        .map(|entity| to_record(entity).map(Value::Object))
        .collect::<Result<Vec<_>, _>>()
        .map(Value::Array)
}
