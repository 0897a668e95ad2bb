//! HTTP handlers and route configuration.

mod health;
mod resources;

use actix_web::web;

use crate::middleware::error::AppError;

/// Largest JSON body accepted by the resource handlers.
pub const JSON_LIMIT: usize = 2 * 1024 * 1024;

/// Configure all application routes.
///
/// Collections are not declared up front: any `/{collection}` path is a
/// resource collection, json-server style.
pub fn configure_routes(cfg: &mut web::ServiceConfig) {
    cfg.app_data(
        web::JsonConfig::default()
            .limit(JSON_LIMIT)
            .error_handler(|err, _req| AppError::BadRequest(err.to_string()).into()),
    )
    .route("/_health", web::get().to(health::health_check))
    .service(
        web::resource("/{collection}")
            .route(web::get().to(resources::list))
            .route(web::post().to(resources::create)),
    )
    .service(
        web::resource("/{collection}/{id}")
            .route(web::get().to(resources::get))
            .route(web::put().to(resources::replace))
            .route(web::patch().to(resources::patch))
            .route(web::delete().to(resources::delete)),
    );
}
