//! Prometheus request metrics.
//!
//! [`HttpMetricsLayer`] records a request counter and a latency histogram
//! through the `metrics` facade, labelled by method, matched route and
//! status. [`install_recorder`] installs the Prometheus recorder whose
//! handle renders `GET /metrics`.

use std::future::Future;
use std::pin::Pin;
use std::task::{Context, Poll};
use std::time::{Duration, Instant};

use axum::extract::MatchedPath;
use http::{Request, Response};
use metrics_exporter_prometheus::{Matcher, PrometheusBuilder, PrometheusHandle};
use tower::{Layer, Service};

pub const REQUESTS_TOTAL: &str = "http_requests_total";
pub const REQUEST_DURATION_SECONDS: &str = "http_request_duration_seconds";

/// Path label for requests that matched no route.
pub const UNMATCHED_PATH: &str = "unmatched";

const DURATION_BUCKETS: &[f64] = &[
    0.005, 0.01, 0.025, 0.05, 0.1, 0.25, 0.5, 1.0, 2.5, 5.0, 10.0,
];

/// Installs the global Prometheus recorder.
///
/// # Errors
///
/// Fails if a global recorder is already installed.
pub fn install_recorder() -> anyhow::Result<PrometheusHandle> {
    let handle = prometheus_builder()?.install_recorder()?;
    Ok(handle)
}

fn prometheus_builder() -> anyhow::Result<PrometheusBuilder> {
    Ok(PrometheusBuilder::new().set_buckets_for_metric(
        Matcher::Full(REQUEST_DURATION_SECONDS.to_string()),
        DURATION_BUCKETS,
    )?)
}

/// Records one finished request.
pub fn record_request(method: &str, path: &str, status: u16, elapsed: Duration) {
    let (method, path, status) = (method.to_string(), path.to_string(), status.to_string());
    metrics::counter!(
        REQUESTS_TOTAL,
        "method" => method.clone(),
        "path" => path.clone(),
        "status" => status.clone()
    )
    .increment(1);
    metrics::histogram!(
        REQUEST_DURATION_SECONDS,
        "method" => method,
        "path" => path,
        "status" => status
    )
    .record(elapsed.as_secs_f64());
}

// ---------------------------------------------------------------------------
// HttpMetricsLayer
// ---------------------------------------------------------------------------

/// Tower layer recording request count and latency.
///
/// Add it with `Router::layer` so the matched route is visible.
#[derive(Debug, Clone, Copy, Default)]
pub struct HttpMetricsLayer;

impl<S> Layer<S> for HttpMetricsLayer {
    type Service = HttpMetricsService<S>;

    fn layer(&self, inner: S) -> Self::Service {
        HttpMetricsService { inner }
    }
}

// ---------------------------------------------------------------------------
// HttpMetricsService
// ---------------------------------------------------------------------------

#[derive(Debug, Clone)]
pub struct HttpMetricsService<S> {
    inner: S,
}

impl<S, ReqBody, ResBody> Service<Request<ReqBody>> for HttpMetricsService<S>
where
    S: Service<Request<ReqBody>, Response = Response<ResBody>> + Send,
    S::Future: Send + 'static,
{
    type Response = Response<ResBody>;
    type Error = S::Error;
    type Future = Pin<Box<dyn Future<Output = Result<Self::Response, Self::Error>> + Send>>;

    fn poll_ready(&mut self, cx: &mut Context<'_>) -> Poll<Result<(), Self::Error>> {
        self.inner.poll_ready(cx)
    }

    fn call(&mut self, req: Request<ReqBody>) -> Self::Future {
        let method = req.method().to_string();
        let path = req
            .extensions()
            .get::<MatchedPath>()
            .map_or_else(|| UNMATCHED_PATH.to_string(), |p| p.as_str().to_string());

        let fut = self.inner.call(req);

        Box::pin(async move {
            let start = Instant::now();
            let result = fut.await;
            if let Ok(response) = &result {
                record_request(&method, &path, response.status().as_u16(), start.elapsed());
            }
            result
        })
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
