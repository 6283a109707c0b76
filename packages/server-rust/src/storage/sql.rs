//! `PostgreSQL` [`Storage`] via `sqlx`.
//!
//! Each entity is stored as a JSON text document next to the columns used
//! for lookup and filtering. `seq` preserves insertion order for listings.

use std::time::Duration;

use async_trait::async_trait;
use evalhub_core::{
    BenchmarkStatus, CollectionResource, EvaluationJobResource, EvaluationJobState,
};
use serde::de::DeserializeOwned;
use serde::Serialize;
use sqlx::postgres::{PgPool, PgPoolOptions};
use sqlx::Row;
use tracing::info;

use super::{JobQuery, Listing, StorageError, COLLECTION_KIND, JOB_KIND};
use crate::config::SqlDatabaseConfig;
use crate::traits::Storage;

/// Driver names accepted for `PostgreSQL`.
pub const POSTGRES_DRIVERS: &[&str] = &["pgx", "postgres", "postgresql"];

const SCHEMA: &[&str] = &[
    "CREATE TABLE IF NOT EXISTS evaluation_jobs (
        seq    BIGSERIAL PRIMARY KEY,
        id     TEXT NOT NULL UNIQUE,
        state  TEXT NOT NULL,
        entity TEXT NOT NULL
    )",
    "CREATE TABLE IF NOT EXISTS collections (
        seq    BIGSERIAL PRIMARY KEY,
        id     TEXT NOT NULL UNIQUE,
        entity TEXT NOT NULL
    )",
];

const PING_TIMEOUT: Duration = Duration::from_secs(1);

impl From<sqlx::Error> for StorageError {
    fn from(err: sqlx::Error) -> Self {
        match err {
            sqlx::Error::PoolTimedOut | sqlx::Error::PoolClosed | sqlx::Error::Io(_) => {
                Self::Unavailable(err.to_string())
            }
            other => Self::Backend(other.into()),
        }
    }
}

#[derive(Debug)]
pub struct SqlStorage {
    driver: String,
    pool: PgPool,
}

impl SqlStorage {
    /// Connects, pings and creates the tables if needed.
    ///
    /// # Errors
    ///
    /// Fails on an unsupported driver, an unreachable database or a schema
    /// statement error.
    pub async fn connect(config: &SqlDatabaseConfig) -> Result<Self, StorageError> {
        if !POSTGRES_DRIVERS.contains(&config.driver.as_str()) {
            return Err(StorageError::Unavailable(format!(
                "unsupported SQL driver {:?}",
                config.driver
            )));
        }

        info!(driver = %config.driver, "creating SQL storage");
        let mut options = PgPoolOptions::new();
        if let Some(max) = config.max_open_conns {
            options = options.max_connections(max);
        }
        if let Some(idle) = config.max_idle_conns {
            options = options.min_connections(idle.min(config.max_open_conns.unwrap_or(idle)));
        }
        if let Some(secs) = config.conn_max_lifetime_secs {
            options = options.max_lifetime(Duration::from_secs(secs));
        }
        let pool = options
            .acquire_timeout(PING_TIMEOUT)
            .connect(&config.url)
            .await?;

        let storage = Self {
            driver: config.driver.clone(),
            pool,
        };
        info!(driver = %storage.driver, "pinging SQL storage");
        storage.ping(PING_TIMEOUT).await?;
        for statement in SCHEMA {
            sqlx::query(statement).execute(&storage.pool).await?;
        }
        Ok(storage)
    }

    async fn load<T: DeserializeOwned>(
        &self,
        sql: &str,
        id: &str,
    ) -> Result<Option<T>, StorageError> {
        let row = sqlx::query(sql).bind(id).fetch_optional(&self.pool).await?;
        row.map(|row| decode(&row.try_get::<String, _>("entity")?))
            .transpose()
    }

    async fn load_job(&self, id: &str) -> Result<EvaluationJobResource, StorageError> {
        self.load("SELECT entity FROM evaluation_jobs WHERE id = $1", id)
            .await?
            .ok_or_else(|| StorageError::job_not_found(id))
    }

    async fn save_job(&self, job: &EvaluationJobResource) -> Result<(), StorageError> {
        let done = sqlx::query("UPDATE evaluation_jobs SET state = $2, entity = $3 WHERE id = $1")
            .bind(&job.resource.id)
            .bind(job.status.state.as_str())
            .bind(encode(job)?)
            .execute(&self.pool)
            .await?;
        if done.rows_affected() == 0 {
            return Err(StorageError::job_not_found(&job.resource.id));
        }
        Ok(())
    }
}

fn encode<T: Serialize>(value: &T) -> Result<String, StorageError> {
    serde_json::to_string(value).map_err(|e| StorageError::Backend(e.into()))
}

fn decode<T: DeserializeOwned>(entity: &str) -> Result<T, StorageError> {
    serde_json::from_str(entity).map_err(|e| StorageError::Backend(e.into()))
}

fn is_unique_violation(err: &sqlx::Error) -> bool {
    matches!(err, sqlx::Error::Database(db) if db.is_unique_violation())
}

fn page_bounds(limit: usize, offset: usize) -> (i64, i64) {
    (
        i64::try_from(limit).unwrap_or(i64::MAX),
        i64::try_from(offset).unwrap_or(i64::MAX),
    )
}

fn count(row: &sqlx::postgres::PgRow) -> Result<usize, StorageError> {
    let total: i64 = row.try_get(0)?;
    Ok(usize::try_from(total).unwrap_or_default())
}

#[async_trait]
impl Storage for SqlStorage {
    fn datasource_name(&self) -> &str {
        &self.driver
    }

    async fn ping(&self, timeout: Duration) -> Result<(), StorageError> {
        tokio::time::timeout(timeout, sqlx::query("SELECT 1").execute(&self.pool))
            .await
            .map_err(|_| StorageError::Unavailable("ping timed out".to_string()))??;
        Ok(())
    }

    async fn create_evaluation_job(&self, job: &EvaluationJobResource) -> Result<(), StorageError> {
        sqlx::query("INSERT INTO evaluation_jobs (id, state, entity) VALUES ($1, $2, $3)")
            .bind(&job.resource.id)
            .bind(job.status.state.as_str())
            .bind(encode(job)?)
            .execute(&self.pool)
            .await
            .map_err(|err| {
                if is_unique_violation(&err) {
                    StorageError::AlreadyExists {
                        kind: JOB_KIND,
                        id: job.resource.id.clone(),
                    }
                } else {
                    err.into()
                }
            })?;
        Ok(())
    }

    async fn get_evaluation_job(&self, id: &str) -> Result<EvaluationJobResource, StorageError> {
        self.load_job(id).await
    }

    async fn get_evaluation_jobs(
        &self,
        query: &JobQuery,
    ) -> Result<Listing<EvaluationJobResource>, StorageError> {
        let state = query.status.map(EvaluationJobState::as_str);
        let (limit, offset) = page_bounds(query.limit, query.offset);

        let total = sqlx::query(
            "SELECT COUNT(*) FROM evaluation_jobs WHERE ($1::TEXT IS NULL OR state = $1)",
        )
        .bind(state)
        .fetch_one(&self.pool)
        .await?;

        let rows = sqlx::query(
            "SELECT entity FROM evaluation_jobs WHERE ($1::TEXT IS NULL OR state = $1)
             ORDER BY seq LIMIT $2 OFFSET $3",
        )
        .bind(state)
        .bind(limit)
        .bind(offset)
        .fetch_all(&self.pool)
        .await?;

        let items = rows
            .iter()
            .map(|row| {
                let job: EvaluationJobResource = decode(&row.try_get::<String, _>("entity")?)?;
                Ok(if query.summary { job.summary() } else { job })
            })
            .collect::<Result<Vec<_>, StorageError>>()?;

        Ok(Listing {
            items,
            total_count: count(&total)?,
        })
    }

    async fn delete_evaluation_job(&self, id: &str, hard_delete: bool) -> Result<(), StorageError> {
        if hard_delete {
            let done = sqlx::query("DELETE FROM evaluation_jobs WHERE id = $1")
                .bind(id)
                .execute(&self.pool)
                .await?;
            if done.rows_affected() == 0 {
                return Err(StorageError::job_not_found(id));
            }
            return Ok(());
        }

        let mut job = self.load_job(id).await?;
        if !job.status.state.is_terminal() {
            job.status.state = EvaluationJobState::Cancelled;
            job.resource.touch();
            self.save_job(&job).await?;
        }
        Ok(())
    }

    async fn update_benchmark_status_for_job(
        &self,
        id: &str,
        status: BenchmarkStatus,
    ) -> Result<(), StorageError> {
        let mut job = self.load_job(id).await?;
        job.set_benchmark_status(status);
        self.save_job(&job).await
    }

    async fn update_evaluation_job_status(
        &self,
        id: &str,
        state: EvaluationJobState,
    ) -> Result<(), StorageError> {
        let mut job = self.load_job(id).await?;
        job.status.state = state;
        job.resource.touch();
        self.save_job(&job).await
    }

    async fn create_collection(&self, collection: &CollectionResource) -> Result<(), StorageError> {
        sqlx::query("INSERT INTO collections (id, entity) VALUES ($1, $2)")
            .bind(&collection.resource.id)
            .bind(encode(collection)?)
            .execute(&self.pool)
            .await
            .map_err(|err| {
                if is_unique_violation(&err) {
                    StorageError::AlreadyExists {
                        kind: COLLECTION_KIND,
                        id: collection.resource.id.clone(),
                    }
                } else {
                    err.into()
                }
            })?;
        Ok(())
    }

    async fn get_collection(
        &self,
        id: &str,
        summary: bool,
    ) -> Result<CollectionResource, StorageError> {
        let collection: CollectionResource = self
            .load("SELECT entity FROM collections WHERE id = $1", id)
            .await?
            .ok_or_else(|| StorageError::collection_not_found(id))?;
        Ok(if summary {
            collection.summary()
        } else {
            collection
        })
    }

    async fn get_collections(
        &self,
        limit: usize,
        offset: usize,
    ) -> Result<Listing<CollectionResource>, StorageError> {
        let (limit, offset) = page_bounds(limit, offset);
        let total = sqlx::query("SELECT COUNT(*) FROM collections")
            .fetch_one(&self.pool)
            .await?;
        let rows = sqlx::query("SELECT entity FROM collections ORDER BY seq LIMIT $1 OFFSET $2")
            .bind(limit)
            .bind(offset)
            .fetch_all(&self.pool)
            .await?;
        let items = rows
            .iter()
            .map(|row| decode(&row.try_get::<String, _>("entity")?))
            .collect::<Result<Vec<_>, StorageError>>()?;
        Ok(Listing {
            items,
            total_count: count(&total)?,
        })
    }

    async fn update_collection(&self, collection: &CollectionResource) -> Result<(), StorageError> {
        let done = sqlx::query("UPDATE collections SET entity = $2 WHERE id = $1")
            .bind(&collection.resource.id)
            .bind(encode(collection)?)
            .execute(&self.pool)
            .await?;
        if done.rows_affected() == 0 {
            return Err(StorageError::collection_not_found(&collection.resource.id));
        }
        Ok(())
    }

    async fn delete_collection(&self, id: &str) -> Result<(), StorageError> {
        let done = sqlx::query("DELETE FROM collections WHERE id = $1")
            .bind(id)
            .execute(&self.pool)
            .await?;
        if done.rows_affected() == 0 {
            return Err(StorageError::collection_not_found(id));
        }
        Ok(())
    }

    async fn close(&self) -> Result<(), StorageError> {
        self.pool.close().await;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn config(driver: &str) -> SqlDatabaseConfig {
        SqlDatabaseConfig {
            enabled: true,
            driver: driver.to_string(),
            url: "postgres://localhost:1/none".to_string(),
            conn_max_lifetime_secs: None,
            max_idle_conns: None,
            max_open_conns: None,
            fallback: false,
        }
    }

    #[tokio::test]
    async fn unsupported_driver_is_rejected_before_connecting() {
        let err = SqlStorage::connect(&config("sqlite")).await.unwrap_err();
        assert!(matches!(err, StorageError::Unavailable(msg) if msg.contains("sqlite")));
    }

    #[test]
    fn page_bounds_saturate() {
        assert_eq!(page_bounds(10, 20), (10, 20));
        assert_eq!(page_bounds(usize::MAX, 0).0, i64::MAX);
    }

    #[test]
    fn entity_documents_decode() {
        let err = decode::<CollectionResource>("{not json").unwrap_err();
        assert!(matches!(err, StorageError::Backend(_)));
    }
}
