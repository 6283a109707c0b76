//! Request-scoped execution context.
//!
//! Three stages run once per inbound request, leaves first:
//!
//! 1. **Identity** (`request_id`): resolve a correlation id from
//!    `X-Global-Transaction-Id` or generate a UUID v4.
//! 2. **Enrichment** (`enrich`): derive a child [`Logger`](crate::logging::Logger)
//!    carrying the request's structured fields.
//! 3. **Assembly** (`execution`): bundle the logger, configuration, request
//!    metadata and execution defaults into an [`ExecutionContext`].

pub mod enrich;
pub mod execution;
pub mod request_id;

pub use enrich::{logger_with_request, request_fields};
pub use execution::{
    ConnectionSecurity, ExecutionContext, DEFAULT_RETRY_ATTEMPTS, DEFAULT_TIMEOUT_MINUTES,
};
pub use request_id::{resolve_request_id, TRANSACTION_ID_HEADER};
