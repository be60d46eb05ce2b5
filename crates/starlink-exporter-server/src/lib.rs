//! HTTP metrics endpoint.
//!
//! Serves the Prometheus text exposition of a registry holding the
//! telemetry collector. Every `GET /metrics` is one scrape: it drains the
//! sample queue, so records are exported once.

use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use axum::{
    Router,
    extract::State,
    http::{StatusCode, header},
    response::{IntoResponse, Json, Response},
    routing::get,
};
use prometheus::{Encoder, Registry, TextEncoder};
use serde::Serialize;
use tokio::net::TcpListener;

use starlink_exporter_core::{SampleQueue, TelemetryCollector};

/// How often [`wait_for_drain`] looks at the queue.
const DRAIN_CHECK: Duration = Duration::from_millis(50);

/// Shared server state: the registry and a handle on the collector it holds.
pub struct Exporter {
    registry: Registry,
    collector: TelemetryCollector,
}

impl Exporter {
    /// Register `collector` in a fresh registry.
    pub fn new(collector: TelemetryCollector) -> starlink_exporter_core::Result<Self> {
        let registry = Registry::new();
        registry.register(Box::new(collector.clone()))?;
        Ok(Self {
            registry,
            collector,
        })
    }

    /// Encode one scrape in the text exposition format.
    pub fn scrape(&self) -> prometheus::Result<String> {
        let families = self.registry.gather();
        let mut buf = Vec::new();
        TextEncoder::new().encode(&families, &mut buf)?;
        String::from_utf8(buf).map_err(|e| prometheus::Error::Msg(e.to_string()))
    }
}

#[derive(Serialize)]
struct HealthResponse {
    status: String,
    queued: usize,
    device_id: String,
}

async fn handle_metrics(State(state): State<Arc<Exporter>>) -> Response {
    match state.scrape() {
        Ok(body) => (
            StatusCode::OK,
            [(header::CONTENT_TYPE, prometheus::TEXT_FORMAT)],
            body,
        )
            .into_response(),
        Err(e) => {
            log::error!("scrape failed: {e}");
            (StatusCode::INTERNAL_SERVER_ERROR, format!("scrape failed: {e}\n")).into_response()
        }
    }
}

async fn handle_health(State(state): State<Arc<Exporter>>) -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok".to_string(),
        queued: state.collector.queue().len(),
        device_id: state.collector.last_device_id(),
    })
}

async fn handle_index() -> Json<serde_json::Value> {
    Json(serde_json::json!({
        "name": "Starlink Exporter",
        "version": starlink_exporter_core::VERSION,
        "endpoints": {
            "/": "This API index",
            "/metrics": "Prometheus text exposition; drains queued samples",
            "/health": "Queue depth and last seen device id",
        },
    }))
}

/// Build the axum router.
pub fn build_router(exporter: Arc<Exporter>) -> Router {
    Router::new()
        .route("/", get(handle_index))
        .route("/metrics", get(handle_metrics))
        .route("/health", get(handle_health))
        .with_state(exporter)
}

/// Bind the listen address.
pub async fn bind(host: &str, port: u16) -> std::io::Result<TcpListener> {
    let listener = TcpListener::bind((host, port)).await?;
    log::info!("listening on http://{}", listener.local_addr()?);
    Ok(listener)
}

/// Wait until a scrape has emptied `queue`, for at most `grace`.
///
/// Returns the number of records still queued; chained after the stop signal
/// in the `serve` shutdown future, it keeps the endpoint up long enough for
/// the final flush record to be scraped.
pub async fn wait_for_drain(queue: &SampleQueue, grace: Duration) -> usize {
    let deadline = tokio::time::Instant::now() + grace;
    loop {
        let queued = queue.len();
        if queued == 0 || tokio::time::Instant::now() >= deadline {
            return queued;
        }
        tokio::time::sleep(DRAIN_CHECK.min(grace)).await;
    }
}

/// Serve until `shutdown` resolves, then finish in-flight requests.
pub async fn serve<F>(
    listener: TcpListener,
    exporter: Arc<Exporter>,
    shutdown: F,
) -> std::io::Result<()>
where
    F: Future<Output = ()> + Send + 'static,
{
    let app = build_router(exporter);
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown)
        .await?;
    log::info!("http server stopped");
    Ok(())
}
