//! Evaluation hub server -- request-scoped execution contexts, structured
//! request logging, layered configuration, storage and the HTTP API.

pub mod config;
pub mod context;
pub mod http_metrics;
pub mod logging;
pub mod network;
pub mod storage;
pub mod traits;

pub use context::ExecutionContext;
pub use logging::Logger;
pub use traits::Storage;
