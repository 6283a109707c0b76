//! In-memory [`Storage`] backed by [`DashMap`].
//!
//! Suitable for development, tests and single-replica deployments where
//! losing state on restart is acceptable.

use std::time::Duration;

use async_trait::async_trait;
use dashmap::mapref::entry::Entry;
use dashmap::DashMap;
use evalhub_core::{
    BenchmarkStatus, CollectionResource, EvaluationJobResource, EvaluationJobState, Resource,
};

use super::{JobQuery, Listing, StorageError, COLLECTION_KIND, JOB_KIND};
use crate::traits::Storage;

const DATASOURCE_NAME: &str = "memory";

#[derive(Debug, Default)]
pub struct MemoryStorage {
    jobs: DashMap<String, EvaluationJobResource>,
    collections: DashMap<String, CollectionResource>,
}

impl MemoryStorage {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }
}

/// Oldest first, ties broken by id so listings are stable.
fn sort_by_creation<T>(items: &mut [T], resource: impl Fn(&T) -> &Resource) {
    items.sort_by(|a, b| {
        let (a, b) = (resource(a), resource(b));
        a.created_at.cmp(&b.created_at).then_with(|| a.id.cmp(&b.id))
    });
}

#[async_trait]
impl Storage for MemoryStorage {
    fn datasource_name(&self) -> &str {
        DATASOURCE_NAME
    }

    async fn ping(&self, _timeout: Duration) -> Result<(), StorageError> {
        Ok(())
    }

    async fn create_evaluation_job(&self, job: &EvaluationJobResource) -> Result<(), StorageError> {
        match self.jobs.entry(job.resource.id.clone()) {
            Entry::Occupied(_) => Err(StorageError::AlreadyExists {
                kind: JOB_KIND,
                id: job.resource.id.clone(),
            }),
            Entry::Vacant(slot) => {
                slot.insert(job.clone());
                Ok(())
            }
        }
    }

    async fn get_evaluation_job(&self, id: &str) -> Result<EvaluationJobResource, StorageError> {
        self.jobs
            .get(id)
            .map(|job| job.value().clone())
            .ok_or_else(|| StorageError::job_not_found(id))
    }

    async fn get_evaluation_jobs(
        &self,
        query: &JobQuery,
    ) -> Result<Listing<EvaluationJobResource>, StorageError> {
        let mut jobs: Vec<EvaluationJobResource> = self
            .jobs
            .iter()
            .filter(|job| query.status.map_or(true, |s| job.status.state == s))
            .map(|job| {
                if query.summary {
                    job.summary()
                } else {
                    job.value().clone()
                }
            })
            .collect();
        sort_by_creation(&mut jobs, |job| &job.resource);
        Ok(Listing::paginate(jobs, query.limit, query.offset))
    }

    async fn delete_evaluation_job(&self, id: &str, hard_delete: bool) -> Result<(), StorageError> {
        if hard_delete {
            return self
                .jobs
                .remove(id)
                .map(|_| ())
                .ok_or_else(|| StorageError::job_not_found(id));
        }

        let mut job = self
            .jobs
            .get_mut(id)
            .ok_or_else(|| StorageError::job_not_found(id))?;
        if !job.status.state.is_terminal() {
            job.status.state = EvaluationJobState::Cancelled;
            job.resource.touch();
        }
        Ok(())
    }

    async fn update_benchmark_status_for_job(
        &self,
        id: &str,
        status: BenchmarkStatus,
    ) -> Result<(), StorageError> {
        self.jobs
            .get_mut(id)
            .ok_or_else(|| StorageError::job_not_found(id))?
            .set_benchmark_status(status);
        Ok(())
    }

    async fn update_evaluation_job_status(
        &self,
        id: &str,
        state: EvaluationJobState,
    ) -> Result<(), StorageError> {
        let mut job = self
            .jobs
            .get_mut(id)
            .ok_or_else(|| StorageError::job_not_found(id))?;
        job.status.state = state;
        job.resource.touch();
        Ok(())
    }

    async fn create_collection(&self, collection: &CollectionResource) -> Result<(), StorageError> {
        match self.collections.entry(collection.resource.id.clone()) {
            Entry::Occupied(_) => Err(StorageError::AlreadyExists {
                kind: COLLECTION_KIND,
                id: collection.resource.id.clone(),
            }),
            Entry::Vacant(slot) => {
                slot.insert(collection.clone());
                Ok(())
            }
        }
    }

    async fn get_collection(
        &self,
        id: &str,
        summary: bool,
    ) -> Result<CollectionResource, StorageError> {
        let collection = self
            .collections
            .get(id)
            .ok_or_else(|| StorageError::collection_not_found(id))?;
        Ok(if summary {
            collection.summary()
        } else {
            collection.value().clone()
        })
    }

    async fn get_collections(
        &self,
        limit: usize,
        offset: usize,
    ) -> Result<Listing<CollectionResource>, StorageError> {
        let mut collections: Vec<CollectionResource> =
            self.collections.iter().map(|c| c.value().clone()).collect();
        sort_by_creation(&mut collections, |c| &c.resource);
        Ok(Listing::paginate(collections, limit, offset))
    }

    async fn update_collection(&self, collection: &CollectionResource) -> Result<(), StorageError> {
        let id = &collection.resource.id;
        let mut stored = self
            .collections
            .get_mut(id)
            .ok_or_else(|| StorageError::collection_not_found(id))?;
        *stored = collection.clone();
        Ok(())
    }

    async fn delete_collection(&self, id: &str) -> Result<(), StorageError> {
        self.collections
            .remove(id)
            .map(|_| ())
            .ok_or_else(|| StorageError::collection_not_found(id))
    }

    async fn close(&self) -> Result<(), StorageError> {
        Ok(())
    }
}
