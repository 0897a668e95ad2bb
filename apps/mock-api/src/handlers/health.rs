//! Health check endpoint.

use actix_web::{HttpResponse, web};
use firebook_shared::HealthResponse;

use crate::state::AppState;

/// Health check endpoint - returns server status.
///
/// GET /_health
pub async fn health_check(state: web::Data<AppState>) -> HttpResponse {
    let response = HealthResponse {
        status: "ok".to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
        timestamp: chrono::Utc::now().to_rfc3339(),
        collections: state.store.collections().await,
    };

    HttpResponse::Ok().json(response)
}
