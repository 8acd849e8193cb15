// Copyright (c) 2025 Erick Bourgeois, firestoned
// SPDX-License-Identifier: MIT

//! Prometheus scrape endpoint.

use crate::constants::METRICS_PATH;
use crate::metrics::gather_metrics;
use axum::http::{header, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::routing::get;
use axum::Router;
use std::net::SocketAddr;
use tracing::{error, info};

/// Router serving the metrics registry at `/metrics`
pub fn metrics_router() -> Router {
    Router::new().route(METRICS_PATH, get(metrics_handler))
}

/// Serve [`metrics_router`] on `bind_addr` until the listener fails.
///
/// # Errors
///
/// Returns an error if the address cannot be bound or the server stops.
pub async fn serve_metrics(bind_addr: SocketAddr) -> anyhow::Result<()> {
    info!(bind_address = %bind_addr, path = METRICS_PATH, "Starting metrics server");

    let listener = tokio::net::TcpListener::bind(&bind_addr).await?;
    axum::serve(listener, metrics_router()).await?;

    Ok(())
}

pub(crate) async fn metrics_handler() -> Response {
    match gather_metrics() {
        Ok(body) => (
            [(header::CONTENT_TYPE, "text/plain; version=0.0.4")],
            body,
        )
            .into_response(),
        Err(e) => {
            error!(error = %e, "Failed to encode metrics");
            (StatusCode::INTERNAL_SERVER_ERROR, e.to_string()).into_response()
        }
    }
}

#[cfg(test)]
#[path = "server_tests.rs"]
mod server_tests;
