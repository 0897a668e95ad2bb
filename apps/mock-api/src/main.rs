//! # Firebook Mock API
//!
//! json-server style REST API with simulated latency, relation counters and
//! a file storage endpoint.

use std::sync::Arc;
use std::time::Duration;

use actix_web::{App, HttpServer, middleware::Condition, web};
use tracing_actix_web::TracingLogger;

mod config;
mod handlers;
mod middleware;
mod state;
mod telemetry;

use config::AppConfig;
use firebook_infra::DiskStorage;
use middleware::{FileStorage, Latency, RelationCounter, StorageConfig, cors};
use state::AppState;
use telemetry::TelemetryConfig;

#[actix_web::main]
async fn main() -> anyhow::Result<()> {
    // Load .env file if present
    dotenvy::dotenv().ok();

    telemetry::init_telemetry(&TelemetryConfig::from_env());

    let config = AppConfig::from_env()?;

    tracing::info!(
        "Starting Firebook mock API on {}:{}",
        config.host,
        config.port
    );

    let state = AppState::from_config(&config).await?;
    let storage = Arc::new(DiskStorage::new(&config.storage.dir).await?);
    tracing::info!(
        url_path = %config.storage.url_path,
        dir = %config.storage.dir.display(),
        accepted = ?config.storage.mime_types.entries().collect::<Vec<_>>(),
        "File storage ready"
    );
    let storage_config = StorageConfig {
        url_path: config.storage.url_path.clone(),
        mime_types: config.storage.mime_types.clone(),
    };

    let latency = match config.latency {
        Some(settings) => {
            tracing::info!(
                min_ms = settings.min.as_millis() as u64,
                max_ms = settings.max.as_millis() as u64,
                "Simulated latency enabled"
            );
            Some(Latency::from(settings))
        }
        None => None,
    };

    for relation in &config.relations {
        tracing::info!(relation = %relation, "Tracking relation counter");
    }

    let relations = config.relations.clone();

    HttpServer::new(move || {
        App::new()
            .app_data(web::Data::new(state.clone()))
            .wrap(FileStorage::new(storage.clone(), storage_config.clone()))
            .wrap(RelationCounter::new(state.store.clone(), relations.clone()))
            .wrap(Condition::new(
                latency.is_some(),
                latency.unwrap_or_else(|| Latency::new(Duration::ZERO, Duration::ZERO)),
            ))
            .wrap(cors())
            .wrap(TracingLogger::default())
            .configure(handlers::configure_routes)
    })
    .bind((config.host.as_str(), config.port))?
    .run()
    .await?;

    Ok(())
}
