//! Read endpoint.
//!
//! `GET /` serves the latest snapshot. Before the first successful cycle it
//! answers 200 with a short text placeholder, so pages that auto-refresh the
//! image URL keep working. Everything else is 404.

use std::sync::Arc;

use axum::extract::State;
use axum::http::{header, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::routing::get;
use axum::Router;
use tokio::net::TcpListener;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info};

use crate::service::SnapshotService;

pub const NOT_READY_BODY: &str = "Image not yet available, try again shortly.\n";

pub fn router(service: Arc<SnapshotService>) -> Router {
    Router::new()
        .route("/", get(snapshot_handler))
        .fallback(not_found)
        .with_state(service)
}

/// Serve until `shutdown` is cancelled.
pub async fn serve(
    listener: TcpListener,
    service: Arc<SnapshotService>,
    shutdown: CancellationToken,
) -> std::io::Result<()> {
    info!("Serving snapshots on http://{}/", listener.local_addr()?);
    axum::serve(listener, router(service))
        .with_graceful_shutdown(async move { shutdown.cancelled().await })
        .await
}

async fn snapshot_handler(State(service): State<Arc<SnapshotService>>) -> Response {
    match service.cache().read() {
        Some(snapshot) => {
            debug!("Serving snapshot #{}", snapshot.sequence());
            (
                [
                    (header::CONTENT_TYPE, snapshot.format().content_type().to_string()),
                    (header::CACHE_CONTROL, "no-cache".to_string()),
                    (header::LAST_MODIFIED, snapshot.http_date()),
                ],
                snapshot.bytes().clone(),
            )
                .into_response()
        }
        None => (
            StatusCode::OK,
            [
                (header::CONTENT_TYPE, "text/plain; charset=utf-8"),
                (header::CACHE_CONTROL, "no-cache"),
            ],
            NOT_READY_BODY,
        )
            .into_response(),
    }
}

async fn not_found() -> StatusCode {
    StatusCode::NOT_FOUND
}
