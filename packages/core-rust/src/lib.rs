//! Evaluation hub core: API resources, pagination and JSON patch.

pub mod catalog;
pub mod collections;
pub mod health;
pub mod jobs;
pub mod page;
pub mod patch;
pub mod resource;

pub use catalog::{
    BenchmarkFilter, BenchmarkResource, BenchmarksList, Provider, ProviderList, SupportedBenchmark,
};
pub use collections::{CollectionConfig, CollectionResource, CollectionResourceList};
pub use health::HealthResponse;
pub use jobs::{
    BenchmarkConfig, BenchmarkStatus, EvaluationJobConfig, EvaluationJobResource,
    EvaluationJobResourceList, EvaluationJobState, EvaluationJobStatus, ModelRef,
};
pub use page::{clamp_limit, Page, DEFAULT_PAGE_LIMIT, MAX_PAGE_LIMIT};
pub use patch::{apply_patch, Patch, PatchError, PatchOp, PatchOperation};
pub use resource::{ErrorBody, HRef, Ref, Resource, Tenant};
