use std::time::Duration;

use async_trait::async_trait;
use evalhub_core::{
    BenchmarkStatus, CollectionResource, EvaluationJobResource, EvaluationJobState,
};

use crate::storage::{JobQuery, Listing, StorageError};

/// Pluggable persistence backend for evaluation jobs and collections.
/// Implementations: memory (default, tests), `PostgreSQL` (feature `postgres`).
#[async_trait]
pub trait Storage: Send + Sync {
    /// Identifies the backend in logs and error messages.
    fn datasource_name(&self) -> &str;

    /// Verifies the backend is reachable within `timeout`.
    async fn ping(&self, timeout: Duration) -> Result<(), StorageError>;

    /// Stores a new job. Fails if the id is already taken.
    async fn create_evaluation_job(&self, job: &EvaluationJobResource) -> Result<(), StorageError>;

    async fn get_evaluation_job(&self, id: &str) -> Result<EvaluationJobResource, StorageError>;

    /// Lists jobs oldest first, optionally filtered by state.
    async fn get_evaluation_jobs(
        &self,
        query: &JobQuery,
    ) -> Result<Listing<EvaluationJobResource>, StorageError>;

    /// Cancels a job, or removes it entirely when `hard_delete` is set.
    async fn delete_evaluation_job(&self, id: &str, hard_delete: bool) -> Result<(), StorageError>;

    async fn update_benchmark_status_for_job(
        &self,
        id: &str,
        status: BenchmarkStatus,
    ) -> Result<(), StorageError>;

    async fn update_evaluation_job_status(
        &self,
        id: &str,
        state: EvaluationJobState,
    ) -> Result<(), StorageError>;

    async fn create_collection(&self, collection: &CollectionResource) -> Result<(), StorageError>;

    async fn get_collection(
        &self,
        id: &str,
        summary: bool,
    ) -> Result<CollectionResource, StorageError>;

    async fn get_collections(
        &self,
        limit: usize,
        offset: usize,
    ) -> Result<Listing<CollectionResource>, StorageError>;

    /// Replaces a stored collection. Fails if it does not exist.
    async fn update_collection(&self, collection: &CollectionResource) -> Result<(), StorageError>;

    async fn delete_collection(&self, id: &str) -> Result<(), StorageError>;

    /// Release resources and close connections.
    async fn close(&self) -> Result<(), StorageError>;
}
