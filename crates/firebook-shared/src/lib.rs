//! # Firebook Shared
//!
//! Wire types shared between the mock API and its clients.

pub mod dto;
pub mod response;

pub use dto::{HealthResponse, UploadResponse};
pub use response::ErrorResponse;
