//! Persistence for evaluation jobs and collections.
//!
//! The [`Storage`](crate::traits::Storage) contract lives in
//! [`crate::traits`]; this module holds the shared query/result types and
//! the backends:
//!
//! - [`MemoryStorage`]: `DashMap`-backed, the default
//! - `SqlStorage`: `PostgreSQL` via `sqlx`, behind the `postgres` feature
//!
//! [`factory::create_storage`] picks one from the configuration.

pub mod factory;
pub mod memory;
#[cfg(feature = "postgres")]
pub mod sql;

use evalhub_core::{EvaluationJobState, DEFAULT_PAGE_LIMIT};

pub use factory::create_storage;
pub use memory::MemoryStorage;
#[cfg(feature = "postgres")]
pub use sql::SqlStorage;

/// Entity kinds, for error messages.
pub const JOB_KIND: &str = "evaluation job";
pub const COLLECTION_KIND: &str = "collection";

/// Errors surfaced by storage backends.
#[derive(Debug, thiserror::Error)]
pub enum StorageError {
    #[error("{kind} {id} not found")]
    NotFound { kind: &'static str, id: String },
    #[error("{kind} {id} already exists")]
    AlreadyExists { kind: &'static str, id: String },
    #[error("storage unavailable: {0}")]
    Unavailable(String),
    #[error(transparent)]
    Backend(#[from] anyhow::Error),
}

impl StorageError {
    pub(crate) fn job_not_found(id: &str) -> Self {
        Self::NotFound {
            kind: JOB_KIND,
            id: id.to_string(),
        }
    }

    pub(crate) fn collection_not_found(id: &str) -> Self {
        Self::NotFound {
            kind: COLLECTION_KIND,
            id: id.to_string(),
        }
    }
}

/// Parameters for listing evaluation jobs.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct JobQuery {
    /// Drop per-benchmark detail from each item.
    pub summary: bool,
    pub limit: usize,
    pub offset: usize,
    pub status: Option<EvaluationJobState>,
}

impl Default for JobQuery {
    fn default() -> Self {
        Self {
            summary: false,
            limit: DEFAULT_PAGE_LIMIT,
            offset: 0,
            status: None,
        }
    }
}

/// One page of results plus the total number of matches.
#[derive(Debug, Clone, PartialEq)]
pub struct Listing<T> {
    pub items: Vec<T>,
    pub total_count: usize,
}

impl<T> Listing<T> {
    /// Slices `all` (already filtered and ordered) into one page.
    #[must_use]
    pub fn paginate(all: Vec<T>, limit: usize, offset: usize) -> Self {
        let total_count = all.len();
        let items = all.into_iter().skip(offset).take(limit).collect();
        Self { items, total_count }
    }
}
