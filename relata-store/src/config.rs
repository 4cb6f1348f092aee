use config::{Config, File};
use serde::Deserialize;
use std::path::PathBuf;

use crate::error::StoreResult;

#[derive(Debug, Clone, Deserialize)]
pub struct Database {
    /// File path, or ":memory:" for a private in-memory store
    pub path: String,
    pub pool_size: u32,
}

#[derive(Debug, Clone, Deserialize)]
pub struct Logging {
    pub filter: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct Settings {
    pub database: Database,
    pub logging: Logging,
}

impl Settings {
    pub fn new() -> StoreResult<Self> {
        // Pick up DATABASE_PATH and friends from a local .env
        dotenv::dotenv().ok();

        let mut builder = Config::builder()
            .set_default("database.path", "relata.db")?
            .set_default("database.pool_size", 4)?
            .set_default("logging.filter", "relata_store=info")?;

        let config_file = PathBuf::from("settings.toml");
        if config_file.exists() {
            builder = builder.add_source(File::from(config_file).required(false));
        }

        // Environment variables win over the file
        if let Ok(path) = std::env::var("DATABASE_PATH") {
            builder = builder.set_override("database.path", path)?;
        }
        if let Ok(size) = std::env::var("DATABASE_POOL_SIZE") {
            builder = builder.set_override("database.pool_size", size)?;
        }
        if let Ok(filter) = std::env::var("RUST_LOG") {
            builder = builder.set_override("logging.filter", filter)?;
        }

        Ok(builder.build()?.try_deserialize()?)
    }

    /// Settings for a throwaway in-memory store
    pub fn in_memory() -> Self {
        Self {
            database: Database {
                path: ":memory:".to_string(),
                pool_size: 1,
            },
            logging: Logging {
                filter: "relata_store=debug".to_string(),
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_load_without_file() {
        let settings = Settings::new().expect("Failed to load settings");
        assert!(!settings.database.path.is_empty());
        assert!(settings.database.pool_size >= 1);
    }

    #[test]
    fn test_in_memory_settings() {
        let settings = Settings::in_memory();
        assert_eq!(settings.database.path, ":memory:");
        assert_eq!(settings.database.pool_size, 1);
    }
}
