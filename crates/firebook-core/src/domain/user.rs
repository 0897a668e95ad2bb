use serde::{Deserialize, Serialize};

use super::new_id;

/// User profile.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct User {
    pub id: String,
    pub display_name: String,
    #[serde(
        rename = "photoURL",
        default,
        skip_serializing_if = "Option::is_none"
    )]
    pub photo_url: Option<String>,
}

impl User {
    pub fn new(display_name: impl Into<String>) -> Self {
        Self {
            id: new_id(),
            display_name: display_name.into(),
            photo_url: None,
        }
    }
}

/// Sign-in record for the client's mocked authentication.
///
/// The password is kept in plain text. This is demo data, never real
/// credentials.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct InsecureAuthInfo {
    pub id: String,
    pub email: String,
    pub insecure_plain_password: String,
    /// Id of the matching [`User`].
    pub uid: String,
}

impl InsecureAuthInfo {
    pub fn new(user: &User, email: impl Into<String>, password: impl Into<String>) -> Self {
        Self {
            id: new_id(),
            email: email.into(),
            insecure_plain_password: password.into(),
            uid: user.id.clone(),
        }
    }
}
