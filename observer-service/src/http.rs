//! Read-only HTTP endpoint with the latest snapshot.

use std::net::SocketAddr;

use anyhow::Context;
use axum::{
    extract::State,
    http::{header, StatusCode},
    response::{IntoResponse, Response},
    routing::get,
    Json, Router,
};
use iris_firmware::{telemetry::TelemetrySink, Error, Snapshot};
use tokio::sync::watch;
use tracing::info;

pub type SnapshotReceiver = watch::Receiver<Option<Snapshot>>;

/// Telemetry sink feeding the HTTP endpoint. Every snapshot replaces the
/// previous one as a whole.
pub struct WatchSink(pub watch::Sender<Option<Snapshot>>);

impl WatchSink {
    pub fn channel() -> (Self, SnapshotReceiver) {
        let (tx, rx) = watch::channel(None);
        (Self(tx), rx)
    }
}

impl TelemetrySink for WatchSink {
    fn publish(&mut self, snapshot: &Snapshot) -> Result<(), Error> {
        self.0.send_replace(Some(*snapshot));
        Ok(())
    }
}

pub fn router(snapshots: SnapshotReceiver) -> Router {
    Router::new()
        .route("/data", get(data_handler))
        .route("/health", get(health_handler))
        .with_state(snapshots)
}

pub async fn serve(bind: SocketAddr, snapshots: SnapshotReceiver) -> anyhow::Result<()> {
    let listener = tokio::net::TcpListener::bind(bind)
        .await
        .context(format!("Failed to bind to {}", bind))?;

    info!("Telemetry endpoint: http://{}/data", bind);

    axum::serve(listener, router(snapshots))
        .await
        .context("HTTP server failed")
}

async fn data_handler(State(snapshots): State<SnapshotReceiver>) -> Response {
    let latest = *snapshots.borrow();
    // The dashboard is served from a different origin
    let cors = [(header::ACCESS_CONTROL_ALLOW_ORIGIN, "*")];
    match latest {
        Some(snapshot) => (cors, Json(snapshot)).into_response(),
        None => (
            StatusCode::NOT_FOUND,
            cors,
            Json(serde_json::json!({ "error": "No telemetry received yet" })),
        )
            .into_response(),
    }
}

async fn health_handler() -> &'static str {
    "ok"
}
