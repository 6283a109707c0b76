//! Chooses the storage backend from the configuration.

use std::sync::Arc;

use tracing::{info, warn};

use super::{MemoryStorage, StorageError};
use crate::config::Config;
use crate::traits::Storage;

/// Creates the storage backend for `config`.
///
/// The first enabled SQL database is used when the `postgres` feature is
/// compiled in. If it cannot be reached and its `fallback` flag is set, the
/// in-memory backend is used instead. Without an enabled SQL database (or
/// without the feature) the in-memory backend is returned.
///
/// # Errors
///
/// Returns the connection error when the SQL database is unreachable and
/// fallback is disabled.
pub async fn create_storage(config: &Config) -> Result<Arc<dyn Storage>, StorageError> {
    let Some((name, sql)) = config.database.as_ref().and_then(|db| db.enabled_sql()) else {
        info!("no SQL database enabled, using in-memory storage");
        return Ok(Arc::new(MemoryStorage::new()));
    };

    #[cfg(feature = "postgres")]
    {
        match super::SqlStorage::connect(sql).await {
            Ok(storage) => {
                info!(database = name, driver = %sql.driver, "using SQL storage");
                Ok(Arc::new(storage))
            }
            Err(err) if sql.fallback => {
                warn!(database = name, error = %err, "SQL storage unavailable, falling back to in-memory storage");
                Ok(Arc::new(MemoryStorage::new()))
            }
            Err(err) => Err(err),
        }
    }

    #[cfg(not(feature = "postgres"))]
    {
        warn!(
            database = name,
            driver = %sql.driver,
            "SQL support not compiled in (enable the `postgres` feature), using in-memory storage"
        );
        Ok(Arc::new(MemoryStorage::new()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{DatabaseConfig, ServiceConfig, SqlDatabaseConfig};

    #[tokio::test]
    async fn defaults_to_memory() {
        let config = Config::with_service(ServiceConfig::default());
        let storage = create_storage(&config).await.unwrap();
        assert_eq!(storage.datasource_name(), "memory");
    }

    #[tokio::test]
    async fn disabled_sql_is_ignored() {
        let mut config = Config::with_service(ServiceConfig::default());
        let mut database = DatabaseConfig::default();
        database.sql.insert(
            "primary".to_string(),
            SqlDatabaseConfig {
                enabled: false,
                driver: "pgx".to_string(),
                url: "postgres://unused".to_string(),
                conn_max_lifetime_secs: None,
                max_idle_conns: None,
                max_open_conns: None,
                fallback: false,
            },
        );
        config.database = Some(database);

        let storage = create_storage(&config).await.unwrap();
        assert_eq!(storage.datasource_name(), "memory");
    }

    #[cfg(feature = "postgres")]
    #[tokio::test]
    async fn unreachable_sql_falls_back_when_allowed() {
        let mut config = Config::with_service(ServiceConfig::default());
        let mut database = DatabaseConfig::default();
        database.sql.insert(
            "primary".to_string(),
            SqlDatabaseConfig {
                enabled: true,
                driver: "sqlite".to_string(),
                url: "sqlite::memory:".to_string(),
                conn_max_lifetime_secs: None,
                max_idle_conns: None,
                max_open_conns: None,
                fallback: true,
            },
        );
        config.database = Some(database);

        let storage = create_storage(&config).await.unwrap();
        assert_eq!(storage.datasource_name(), "memory");
    }
}
