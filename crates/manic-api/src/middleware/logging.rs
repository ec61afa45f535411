//! Per-request access log.

use std::time::Instant;

use axum::extract::{MatchedPath, Request};
use axum::middleware::Next;
use axum::response::Response;
use tracing::{info, warn};

/// Logs one event per request once the response is ready.
///
/// Records the route template as well as the concrete path, so blob
/// downloads group under `/api/input/{name}` regardless of file name.
/// Client errors are logged at `warn`; server errors are already logged
/// by the error mapping.
pub async fn request_logging(request: Request, next: Next) -> Response {
    let method = request.method().clone();
    let path = request.uri().path().to_owned();
    let route = request
        .extensions()
        .get::<MatchedPath>()
        .map(|m| m.as_str().to_owned())
        .unwrap_or_else(|| path.clone());
    let started = Instant::now();

    let response = next.run(request).await;

    let status = response.status().as_u16();
    let elapsed_ms = u64::try_from(started.elapsed().as_millis()).unwrap_or(u64::MAX);
    if response.status().is_client_error() {
        warn!(%method, %path, %route, status, elapsed_ms, "HTTP request rejected");
    } else {
        info!(%method, %path, %route, status, elapsed_ms, "HTTP request");
    }

    response
}
