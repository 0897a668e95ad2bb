//! Application configuration loaded from environment variables.

use std::env;
use std::path::PathBuf;
use std::time::Duration;

use firebook_core::relation::{RelationConfig, RelationParseError};
use firebook_core::storage::{MimeTable, MimeTableParseError};

/// Application configuration.
#[derive(Debug, Clone)]
pub struct AppConfig {
    pub host: String,
    pub port: u16,
    /// `db.json` location; the store is in-memory when unset.
    pub db_path: Option<PathBuf>,
    pub storage: StorageSettings,
    /// Simulated latency; disabled when `None`.
    pub latency: Option<LatencySettings>,
    pub relations: Vec<RelationConfig>,
    pub reconcile_on_start: bool,
}

/// File storage endpoint settings.
#[derive(Debug, Clone)]
pub struct StorageSettings {
    /// URL prefix, always with a leading and without a trailing slash.
    pub url_path: String,
    pub dir: PathBuf,
    pub mime_types: MimeTable,
}

/// Bounds of the simulated latency.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct LatencySettings {
    pub min: Duration,
    pub max: Duration,
}

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("RELATIONS: {0}")]
    Relations(#[from] RelationParseError),

    #[error("STORAGE_MIME_TYPES: {0}")]
    MimeTypes(#[from] MimeTableParseError),
}

impl AppConfig {
    /// Load configuration from environment variables.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Load configuration from any key lookup.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let parsed = |key: &str| lookup(key).and_then(|v| v.trim().parse::<u64>().ok());

        let latency = parsed("LATENCY_MAX_MS").map(|max| {
            let min = parsed("LATENCY_MIN_MS").unwrap_or(0);
            LatencySettings {
                min: Duration::from_millis(min.min(max)),
                max: Duration::from_millis(max),
            }
        });

        let relations = match lookup("RELATIONS") {
            Some(value) => RelationConfig::parse_list(&value)?,
            None => vec![RelationConfig::post_comments()],
        };

        let mime_types = match lookup("STORAGE_MIME_TYPES") {
            Some(value) => value.parse()?,
            None => MimeTable::default(),
        };

        Ok(Self {
            host: lookup("HOST").unwrap_or_else(|| "127.0.0.1".to_string()),
            port: lookup("PORT")
                .and_then(|p| p.parse().ok())
                .unwrap_or(5000),
            db_path: lookup("DB_PATH")
                .filter(|p| !p.trim().is_empty())
                .map(PathBuf::from),
            storage: StorageSettings {
                url_path: normalize_url_path(
                    &lookup("STORAGE_URL_PATH").unwrap_or_else(|| "/_storage".to_string()),
                ),
                dir: lookup("STORAGE_DIR")
                    .map(PathBuf::from)
                    .unwrap_or_else(|| PathBuf::from("./_storage")),
                mime_types,
            },
            latency,
            relations,
            reconcile_on_start: lookup("RECONCILE_ON_START")
                .map(|v| v == "true" || v == "1")
                .unwrap_or(false),
        })
    }
}

fn normalize_url_path(raw: &str) -> String {
    let trimmed = raw.trim().trim_matches('/');
    format!("/{trimmed}")
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;

    use super::*;

    fn config(vars: &[(&str, &str)]) -> Result<AppConfig, ConfigError> {
        let vars: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        AppConfig::from_lookup(|key| vars.get(key).cloned())
    }

    #[test]
    fn test_defaults() {
        let config = config(&[]).unwrap();
        assert_eq!(config.port, 5000);
        assert_eq!(config.db_path, None);
        assert_eq!(config.storage.url_path, "/_storage");
        assert_eq!(config.storage.mime_types, MimeTable::default());
        assert_eq!(config.latency, None);
        assert_eq!(config.relations, vec![RelationConfig::post_comments()]);
        assert!(!config.reconcile_on_start);
    }

    #[test]
    fn test_latency_min_is_clamped_to_max() {
        let config = config(&[("LATENCY_MIN_MS", "500"), ("LATENCY_MAX_MS", "100")]).unwrap();
        let latency = config.latency.unwrap();
        assert_eq!(latency.min, Duration::from_millis(100));
        assert_eq!(latency.max, Duration::from_millis(100));
    }

    #[test]
    fn test_url_path_is_normalized() {
        let config = config(&[("STORAGE_URL_PATH", "files/")]).unwrap();
        assert_eq!(config.storage.url_path, "/files");
    }

    #[test]
    fn test_invalid_relations_are_rejected() {
        assert!(matches!(
            config(&[("RELATIONS", "comments:postId")]),
            Err(ConfigError::Relations(_))
        ));
        assert!(matches!(
            config(&[("STORAGE_MIME_TYPES", "png")]),
            Err(ConfigError::MimeTypes(_))
        ));
    }
}
