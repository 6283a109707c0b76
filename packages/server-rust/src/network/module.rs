//! Network module with deferred startup lifecycle.
//!
//! Implements the deferred startup pattern: `new()` takes the shared
//! application state, `start()` binds the TCP listener, and `serve()`
//! starts accepting connections. The binary writes the ready file between
//! `start()` and `serve()`.

use std::future::{Future, IntoFuture};
use std::net::SocketAddr;
use std::pin::pin;
use std::sync::Arc;
use std::time::Duration;

use axum::routing::get;
use axum::{Extension, Router};
use tokio::net::TcpListener;
use tracing::{info, warn};

use super::config::{NetworkConfig, TlsConfig};
use super::handlers::{
    cancel_evaluation, create_collection, create_evaluation, delete_collection, get_collection,
    get_evaluation, get_evaluation_summary, get_provider, health_handler, list_benchmarks,
    list_collections, list_evaluations, list_providers, not_found_handler, patch_collection,
    prometheus_handler, status_handler, system_metrics_handler, update_collection, AppState,
};
use super::lifecycle::ServiceLifecycle;
use super::middleware::build_http_layers;
use crate::context::ConnectionSecurity;

/// Assembles the axum router with all routes and middleware.
///
/// Every domain handler extracts an [`ExecutionContext`](crate::context::ExecutionContext),
/// so each matched request gets its own request id, enriched logger and
/// metadata map. Unknown paths get a JSON 404; known paths with an
/// unsupported method get 405.
pub fn build_router(state: AppState, config: &NetworkConfig) -> Router {
    Router::new()
        .route("/api/v1/health", get(health_handler))
        .route("/api/v1/status", get(status_handler))
        .route(
            "/api/v1/evaluations/jobs",
            get(list_evaluations).post(create_evaluation),
        )
        .route(
            "/api/v1/evaluations/jobs/{id}",
            get(get_evaluation).delete(cancel_evaluation),
        )
        .route(
            "/api/v1/evaluations/jobs/{id}/summary",
            get(get_evaluation_summary),
        )
        .route("/api/v1/evaluations/benchmarks", get(list_benchmarks))
        .route(
            "/api/v1/evaluations/collections",
            get(list_collections).post(create_collection),
        )
        .route(
            "/api/v1/evaluations/collections/{id}",
            get(get_collection)
                .put(update_collection)
                .patch(patch_collection)
                .delete(delete_collection),
        )
        .route("/api/v1/evaluations/providers", get(list_providers))
        .route("/api/v1/evaluations/providers/{id}", get(get_provider))
        .route("/api/v1/metrics/system", get(system_metrics_handler))
        .route("/metrics", get(prometheus_handler))
        .fallback(not_found_handler)
        .layer(build_http_layers(config))
        .with_state(state)
}

/// Manages the HTTP server lifecycle.
///
/// Follows the deferred startup pattern:
/// 1. `new()` -- takes the application state
/// 2. `start()` -- binds TCP listener to the configured address
/// 3. `serve()` -- begins accepting connections until shutdown is signalled
pub struct NetworkModule {
    config: NetworkConfig,
    state: AppState,
    listener: Option<TcpListener>,
}

impl NetworkModule {
    /// Creates a new network module without binding any port.
    #[must_use]
    pub fn new(config: NetworkConfig, state: AppState) -> Self {
        Self {
            config,
            state,
            listener: None,
        }
    }

    /// Returns a shared reference to the service lifecycle.
    #[must_use]
    pub fn lifecycle(&self) -> Arc<ServiceLifecycle> {
        Arc::clone(&self.state.lifecycle)
    }

    /// Binds the TCP listener to the configured host and port.
    ///
    /// Returns the actual bound port, which may differ from the configured
    /// port when port 0 is used (OS-assigned ephemeral port).
    ///
    /// # Errors
    ///
    /// Returns an error if the address cannot be bound (e.g., port in use).
    pub async fn start(&mut self) -> anyhow::Result<u16> {
        let addr = format!("{}:{}", self.config.host, self.config.port);
        let listener = TcpListener::bind(&addr).await?;
        let port = listener.local_addr()?.port();

        info!(host = %self.config.host, port, "TCP listener bound");

        self.listener = Some(listener);
        Ok(port)
    }

    /// Serves connections until `shutdown` resolves.
    ///
    /// After the shutdown signal the lifecycle moves to `Draining`,
    /// in-flight requests get up to the configured shutdown timeout to
    /// finish, and the lifecycle ends in `Stopped`.
    ///
    /// # Errors
    ///
    /// Returns an error if `start()` was not called, TLS material cannot be
    /// loaded, or the server hits a fatal I/O error.
    pub async fn serve(
        self,
        shutdown: impl Future<Output = ()> + Send + 'static,
    ) -> anyhow::Result<()> {
        let Some(listener) = self.listener else {
            anyhow::bail!("start() must be called before serve()");
        };
        let lifecycle = Arc::clone(&self.state.lifecycle);
        let router = build_router(self.state, &self.config);

        {
            let lifecycle = Arc::clone(&lifecycle);
            tokio::spawn(async move {
                shutdown.await;
                info!("shutdown signal received");
                lifecycle.trigger_shutdown();
            });
        }

        lifecycle.set_ready();

        let result = match &self.config.tls {
            Some(tls) => {
                serve_tls(
                    listener,
                    router,
                    tls,
                    &lifecycle,
                    self.config.shutdown_timeout,
                )
                .await
            }
            None => serve_plain(listener, router, &lifecycle, self.config.shutdown_timeout).await,
        };

        lifecycle.mark_stopped();
        info!("server stopped");
        result
    }
}

/// Serves plain HTTP using axum's built-in server.
async fn serve_plain(
    listener: TcpListener,
    router: Router,
    lifecycle: &Arc<ServiceLifecycle>,
    shutdown_timeout: Duration,
) -> anyhow::Result<()> {
    info!(addr = %listener.local_addr()?, "serving plain HTTP");

    let signal = {
        let lifecycle = Arc::clone(lifecycle);
        async move { lifecycle.wait_for_shutdown().await }
    };
    let mut server = pin!(axum::serve(
        listener,
        router.into_make_service_with_connect_info::<SocketAddr>(),
    )
    .with_graceful_shutdown(signal)
    .into_future());

    tokio::select! {
        result = &mut server => result?,
        () = lifecycle.wait_for_shutdown() => {
            match tokio::time::timeout(shutdown_timeout, &mut server).await {
                Ok(result) => result?,
                Err(_) => warn!(
                    timeout_secs = shutdown_timeout.as_secs(),
                    "graceful shutdown timed out with requests still in flight"
                ),
            }
        }
    }
    Ok(())
}

/// Serves TLS connections using `axum-server` with rustls.
///
/// Reuses the pre-bound TCP listener and marks every request with
/// [`ConnectionSecurity::Tls`] so execution contexts build `https` URLs.
async fn serve_tls(
    listener: TcpListener,
    router: Router,
    tls_config: &TlsConfig,
    lifecycle: &Arc<ServiceLifecycle>,
    shutdown_timeout: Duration,
) -> anyhow::Result<()> {
    use axum_server::tls_rustls::RustlsConfig;

    let rustls_config = RustlsConfig::from_pem_file(&tls_config.cert_path, &tls_config.key_path)
        .await
        .map_err(|e| anyhow::anyhow!("failed to load TLS certificates: {e}"))?;

    let addr = listener.local_addr()?;
    let std_listener = listener.into_std()?;
    let handle = axum_server::Handle::new();

    {
        let handle = handle.clone();
        let lifecycle = Arc::clone(lifecycle);
        tokio::spawn(async move {
            lifecycle.wait_for_shutdown().await;
            handle.graceful_shutdown(Some(shutdown_timeout));
        });
    }

    info!(%addr, "serving TLS");

    let router = router.layer(Extension(ConnectionSecurity::Tls));
    axum_server::from_tcp_rustls(std_listener, rustls_config)
        .handle(handle)
        .serve(router.into_make_service_with_connect_info::<SocketAddr>())
        .await?;
    Ok(())
}
