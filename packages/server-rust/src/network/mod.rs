//! HTTP serving: listener configuration, middleware, routing, handlers and
//! the service lifecycle.

pub mod config;
pub mod handlers;
pub mod lifecycle;
pub mod middleware;
pub mod module;

pub use config::{NetworkConfig, TlsConfig};
pub use handlers::AppState;
pub use lifecycle::{ServiceLifecycle, ServiceState};
pub use module::{build_router, NetworkModule};
