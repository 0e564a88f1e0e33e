//! Subscriber-facing HTTP and WebSocket server
//!
//! # Routes
//!
//! - `GET /` with `Upgrade: websocket` - subscribe; without upgrade a `200`
//!   with an empty body (health check)
//! - `GET /test` - liveness check, `{"test":"hi"}`
//! - `GET /stats` - broadcast and upstream counters

mod connection;

use std::sync::Arc;
use std::time::Duration;

use axum::Router;
use axum::extract::State;
use axum::extract::ws::WebSocketUpgrade;
use axum::extract::ws::rejection::WebSocketUpgradeRejection;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Json, Response};
use axum::routing::get;
use chirp_predicate::OperatorRegistry;
use chirp_sources::{UpstreamMetrics, UpstreamMetricsSnapshot};
use chirp_tap::{BroadcastStats, Broadcaster, SubscriberRegistry};
use serde::Serialize;
use serde_json::json;
use tokio::net::TcpListener;
use tokio_util::sync::CancellationToken;
use tower_http::trace::TraceLayer;
use tracing::warn;

use connection::Subscription;

/// Shared state for all handlers
#[derive(Clone)]
pub struct AppState {
    registry: Arc<SubscriberRegistry>,
    broadcaster: Arc<Broadcaster>,
    operators: Arc<OperatorRegistry>,
    upstream_metrics: Option<Arc<UpstreamMetrics>>,
    heartbeat: Option<Duration>,
}

impl AppState {
    /// Create state over an existing registry and broadcaster
    pub fn new(broadcaster: Arc<Broadcaster>, operators: Arc<OperatorRegistry>) -> Self {
        Self {
            registry: Arc::clone(broadcaster.registry()),
            broadcaster,
            operators,
            upstream_metrics: None,
            heartbeat: None,
        }
    }

    /// Report upstream counters on `/stats`
    pub fn with_upstream_metrics(mut self, metrics: Arc<UpstreamMetrics>) -> Self {
        self.upstream_metrics = Some(metrics);
        self
    }

    /// Ping every subscriber at this interval (`None` disables pings)
    pub fn with_heartbeat(mut self, interval: Option<Duration>) -> Self {
        self.heartbeat = interval.filter(|d| !d.is_zero());
        self
    }

    /// Subscriber registry
    pub fn registry(&self) -> &Arc<SubscriberRegistry> {
        &self.registry
    }
}

/// `/stats` response body
#[derive(Debug, Serialize)]
pub struct StatsResponse {
    pub broadcast: BroadcastStats,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub upstream: Option<UpstreamMetricsSnapshot>,
}

/// Build the router
pub fn build_router(state: AppState) -> Router {
    Router::new()
        .route("/", get(subscribe))
        .route("/test", get(liveness))
        .route("/stats", get(stats))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

/// Serve until cancelled
pub async fn serve(
    listener: TcpListener,
    state: AppState,
    cancel: CancellationToken,
) -> std::io::Result<()> {
    axum::serve(listener, build_router(state))
        .with_graceful_shutdown(async move {
            cancel.cancelled().await;
        })
        .await
}

async fn subscribe(
    State(state): State<AppState>,
    upgrade: Result<WebSocketUpgrade, WebSocketUpgradeRejection>,
) -> Response {
    let Ok(upgrade) = upgrade else {
        return StatusCode::OK.into_response();
    };

    let subscription = match Subscription::open(Arc::clone(&state.registry)) {
        Ok(subscription) => subscription,
        Err(e) => {
            warn!(error = %e, "rejecting subscriber");
            return (StatusCode::SERVICE_UNAVAILABLE, e.to_string()).into_response();
        }
    };

    upgrade.on_upgrade(move |socket| connection::run(socket, state, subscription))
}

async fn liveness() -> Json<serde_json::Value> {
    Json(json!({ "test": "hi" }))
}

async fn stats(State(state): State<AppState>) -> Json<StatsResponse> {
    Json(StatsResponse {
        broadcast: state.broadcaster.stats(),
        upstream: state.upstream_metrics.as_ref().map(|m| m.snapshot()),
    })
}
