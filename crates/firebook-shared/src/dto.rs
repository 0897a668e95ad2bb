//! Data Transfer Objects - request/response types for the API.

use serde::{Deserialize, Serialize};

/// Response to a successful file upload.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UploadResponse {
    /// Absolute URL the uploaded file can be downloaded (and deleted) from.
    #[serde(rename = "downloadURL")]
    pub download_url: String,
}

/// Service status.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HealthResponse {
    pub status: String,
    pub version: String,
    pub timestamp: String,
    /// Collections currently held by the document store.
    pub collections: Vec<String>,
}
