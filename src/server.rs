//! HTTP server for exposing Prometheus metrics.
//!
//! This module provides an Axum-based HTTP server that serves the configured
//! metrics endpoint for Prometheus scraping and a `/health` endpoint for
//! health checks.

use crate::error::{ExporterError, Result};
use crate::metrics::MetricsSink;
use crate::status::TerminationStatus;
use axum::{
    extract::State,
    http::StatusCode,
    response::{Html, IntoResponse, Response},
    routing::get,
    Router,
};
use std::sync::Arc;
use tokio::net::TcpListener;
use tower_http::trace::TraceLayer;
use tracing::{info, warn};

/// Path of the health check route.
pub const HEALTH_PATH: &str = "/health";
/// Path of the landing page.
pub const ROOT_PATH: &str = "/";

/// Shared application state.
#[derive(Clone)]
struct AppState {
    sink: Arc<MetricsSink>,
    endpoint: Arc<str>,
}

/// Build the router serving `endpoint`, `/health` and `/`.
pub fn router(sink: Arc<MetricsSink>, endpoint: &str) -> Router {
    let state = AppState {
        sink,
        endpoint: Arc::from(endpoint),
    };

    Router::new()
        .route(endpoint, get(metrics_handler))
        .route(HEALTH_PATH, get(health_handler))
        .route(ROOT_PATH, get(root_handler))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

/// Start the HTTP server.
///
/// # Arguments
///
/// * `listen_address` - Address to bind to (e.g., "0.0.0.0:9625")
/// * `endpoint` - Path the metrics are served on (e.g., "/metrics")
/// * `sink` - Metrics sink instance
///
/// # Examples
///
/// ```no_run
/// use bareos_exporter::collector::{BackupCollector, CollectorOptions};
/// use bareos_exporter::config::DatabaseConfig;
/// use bareos_exporter::descriptors::DescriptorRegistry;
/// use bareos_exporter::metrics::MetricsSink;
/// use bareos_exporter::server::start_server;
/// use bareos_exporter::store::SqlJobStore;
/// use std::sync::Arc;
///
/// #[tokio::main]
/// async fn main() {
///     let config = DatabaseConfig {
///         url: "postgres://bareos@localhost/bareos".to_string(),
///         ..Default::default()
///     };
///     let store = SqlJobStore::connect(&config).await.unwrap();
///     let collector = BackupCollector::new(
///         Arc::new(store),
///         Arc::new(DescriptorRegistry::new()),
///         CollectorOptions::default(),
///     );
///     let sink = MetricsSink::new(collector, "bareos").unwrap();
///     start_server("0.0.0.0:9625", "/metrics", sink).await.unwrap();
/// }
/// ```
pub async fn start_server(listen_address: &str, endpoint: &str, sink: MetricsSink) -> Result<()> {
    info!("Starting HTTP server on {}", listen_address);

    let listener = TcpListener::bind(listen_address).await?;
    serve(listener, endpoint, Arc::new(sink)).await
}

/// Serve on an already bound listener.
pub async fn serve(listener: TcpListener, endpoint: &str, sink: Arc<MetricsSink>) -> Result<()> {
    let app = router(sink, endpoint);

    axum::serve(listener, app)
        .await
        .map_err(|e| ExporterError::Server(e.to_string()))
}

/// Handler for the metrics endpoint.
async fn metrics_handler(State(state): State<AppState>) -> Response {
    info!("Received metrics scrape request");

    match state.sink.render().await {
        Ok(body) => (
            StatusCode::OK,
            [("content-type", "text/plain; version=0.0.4; charset=utf-8")],
            body,
        )
            .into_response(),
        Err(e) => {
            warn!("Failed to encode metrics: {}", e);
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                format!("Failed to encode metrics: {}", e),
            )
                .into_response()
        }
    }
}

/// Handler for /health endpoint.
async fn health_handler() -> Response {
    (StatusCode::OK, "OK").into_response()
}

/// Handler for root endpoint.
async fn root_handler(State(state): State<AppState>) -> Response {
    let statuses: String = TerminationStatus::ALL
        .iter()
        .map(|s| format!("            <li><code>{}</code> - {}</li>\n", s.label(), s.description()))
        .collect();

    let html = format!(
        r#"<!DOCTYPE html>
<html>
<head>
    <title>Bareos Exporter</title>
    <style>
        body {{ font-family: Arial, sans-serif; margin: 40px; }}
        a {{ color: #0066cc; text-decoration: none; }}
        .info {{ background: #f0f0f0; padding: 15px; border-radius: 5px; }}
    </style>
</head>
<body>
    <h1>Bareos Exporter</h1>
    <div class="info">
        <p>Prometheus metrics exporter for the Bareos backup catalog</p>
        <ul>
            <li><a href="{endpoint}">{endpoint}</a> - Prometheus metrics</li>
            <li><a href="/health">/health</a> - Health check</li>
        </ul>
        <p>Values of the <code>status</code> label:</p>
        <ul>
{statuses}        </ul>
    </div>
</body>
</html>
"#,
        endpoint = state.endpoint,
        statuses = statuses
    );

    (StatusCode::OK, Html(html)).into_response()
}
