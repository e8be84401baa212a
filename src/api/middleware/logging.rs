use axum::{extract::Request, middleware::Next, response::Response};
use tokio::time::Instant;

use super::SessionId;

/// One log line per request, tagged with the caller's session. Server errors
/// are logged at `warn`.
pub async fn request_logger(request: Request, next: Next) -> Response {
    let method = request.method().clone();
    let path = request.uri().path().to_owned();
    let session = request.extensions().get::<SessionId>().map(|id| id.0);
    let started = Instant::now();

    let response = next.run(request).await;

    let status = response.status().as_u16();
    let latency_ms = started.elapsed().as_millis() as u64;
    let session = session.map(|id| id.to_string()).unwrap_or_else(|| "-".into());

    if response.status().is_server_error() {
        tracing::warn!(%method, %path, status, latency_ms, %session, "request failed");
    } else {
        tracing::info!(%method, %path, status, latency_ms, %session, "request served");
    }

    response
}
