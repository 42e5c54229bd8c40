//! HTTP server for spreadsheet exports.
//!
//! # API Endpoints
//!
//! | Method | Path              | Description                          |
//! |--------|-------------------|--------------------------------------|
//! | GET    | `/health`         | Health check                         |
//! | GET    | `/api/views`      | Configured views and their columns   |
//! | GET    | `/export/{name}`  | Download a view as a spreadsheet     |
//! | GET    | `/api/logs`       | SSE stream for export logs           |

use axum::{
    extract::{Path, State},
    http::{header, Method},
    response::{sse::Event, Json, Sse},
    routing::get,
    Router,
};
use futures::stream::Stream;
use serde_json::{json, Value};
use std::{collections::HashMap, convert::Infallible, net::SocketAddr, sync::Arc, time::Duration};
use tokio_stream::wrappers::BroadcastStream;
use tokio_stream::StreamExt as _;
use tower_http::cors::CorsLayer;

use super::logs::{log_error, LOG_BROADCASTER};
use super::types::ViewSummary;
use crate::config::{ConfiguredView, ServerConfig};
use crate::error::{ServerError, ServerResult};
use crate::render::SpreadsheetResponse;

/// Views shared by all handlers, keyed by name.
#[derive(Clone, Default)]
pub struct AppState {
    pub views: Arc<HashMap<String, ConfiguredView>>,
}

impl AppState {
    pub fn new(views: HashMap<String, ConfiguredView>) -> Self {
        Self { views: Arc::new(views) }
    }

    pub fn from_config(config: &ServerConfig) -> ServerResult<Self> {
        Ok(Self::new(config.build()?))
    }
}

pub fn router(state: AppState) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(tower_http::cors::Any)
        .allow_methods([Method::GET, Method::OPTIONS])
        .allow_headers([header::CONTENT_TYPE, header::ACCEPT])
        .expose_headers([header::CONTENT_TYPE, header::CONTENT_DISPOSITION]);

    Router::new()
        .route("/", get(health))
        .route("/health", get(health))
        .route("/api/views", get(list_views))
        .route("/export/{name}", get(export_view))
        .route("/api/logs", get(sse_logs))
        .layer(cors)
        .with_state(state)
}

/// Start the HTTP server
pub async fn start_server(config: &ServerConfig, port: u16) -> ServerResult<()> {
    let state = AppState::from_config(config)?;

    let mut names: Vec<&String> = state.views.keys().collect();
    names.sort();

    let addr = SocketAddr::from(([0, 0, 0, 0], port));
    println!("🚀 Excel view server running on http://localhost:{}", port);
    println!("   GET  /api/views      - List views");
    println!("   GET  /export/{{name}} - Download a view");
    println!("   GET  /api/logs       - SSE log stream");
    println!("   GET  /health         - Health check");
    println!();
    for name in names {
        println!("📄 /export/{}", name);
    }

    let app = router(state);
    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}

/// Health check endpoint
async fn health(State(state): State<AppState>) -> Json<Value> {
    Json(json!({
        "status": "ok",
        "service": "excel-view",
        "version": env!("CARGO_PKG_VERSION"),
        "views": state.views.len(),
    }))
}

async fn list_views(State(state): State<AppState>) -> Json<Vec<ViewSummary>> {
    let mut views: Vec<ViewSummary> = state.views.values().map(ViewSummary::from).collect();
    views.sort_by(|a, b| a.name.cmp(&b.name));
    Json(views)
}

async fn export_view(
    State(state): State<AppState>,
    Path(name): Path<String>,
) -> Result<SpreadsheetResponse, ServerError> {
    let view = state
        .views
        .get(&name)
        .cloned()
        .ok_or_else(|| ServerError::UnknownView(name.clone()))?;

    // File reading, row mapping and encoding all block
    let result = tokio::task::spawn_blocking(move || view.export()).await?;
    result.map_err(|e| {
        log_error(format!("'{}': {}", name, e));
        ServerError::from(e)
    })
}

/// SSE endpoint for real-time log streaming
async fn sse_logs() -> Sse<impl Stream<Item = Result<Event, Infallible>>> {
    let rx = LOG_BROADCASTER.subscribe();

    let stream = BroadcastStream::new(rx).filter_map(|result| match result {
        Ok(entry) => {
            let json = serde_json::to_string(&entry).ok()?;
            Some(Ok(Event::default().data(json)))
        }
        Err(_) => None,
    });

    Sse::new(stream).keep_alive(
        axum::response::sse::KeepAlive::new()
            .interval(Duration::from_secs(15))
            .text("keep-alive"),
    )
}
