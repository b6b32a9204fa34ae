// SPDX-FileCopyrightText: 2026 Quarry Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Events API HTTP server built on axum.
//!
//! Routes:
//! - `POST /slack/events`: envelope intake. Events are acknowledged at once
//!   and processed on their own task.
//! - `GET /healthcheck`: liveness check, answers `ok`.

use std::sync::Arc;

use axum::{
    Json, Router,
    body::Bytes,
    extract::State,
    http::{HeaderMap, StatusCode},
    response::{IntoResponse, Response},
    routing::{get, post},
};
use quarry_core::{EventProcessor, QuarryError};
use tower_http::trace::TraceLayer;
use tracing::{debug, info, warn};

use crate::events::Envelope;
use crate::signature::SignatureVerifier;

/// Shared state for the event handlers.
#[derive(Clone)]
pub struct EventsState {
    pub processor: Arc<dyn EventProcessor>,
    /// `None` accepts unsigned requests.
    pub verifier: Option<Arc<SignatureVerifier>>,
}

/// Builds the application router.
pub fn router(state: EventsState) -> Router {
    Router::new()
        .route("/slack/events", post(post_events))
        .route("/healthcheck", get(healthcheck))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

/// Binds `host:port` and serves until the process exits.
pub async fn start_server(host: &str, port: u16, state: EventsState) -> Result<(), QuarryError> {
    if state.verifier.is_none() {
        warn!("no signing secret configured; accepting unsigned event requests");
    }

    let addr = format!("{host}:{port}");
    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .map_err(|e| QuarryError::Channel {
            message: format!("failed to bind events server to {addr}: {e}"),
            source: Some(Box::new(e)),
        })?;

    info!("events server listening on {addr}");

    axum::serve(listener, router(state))
        .await
        .map_err(|e| QuarryError::Channel {
            message: format!("events server error: {e}"),
            source: Some(Box::new(e)),
        })
}

async fn healthcheck() -> &'static str {
    "ok"
}

/// POST /slack/events
async fn post_events(
    State(state): State<EventsState>,
    headers: HeaderMap,
    body: Bytes,
) -> Response {
    if let Some(verifier) = &state.verifier
        && let Err(e) = verifier.verify_request(&headers, &body)
    {
        warn!(reason = %e, "rejected events request with a bad signature");
        return StatusCode::UNAUTHORIZED.into_response();
    }

    let envelope = match Envelope::decode(&body) {
        Ok(envelope) => envelope,
        Err(e) => {
            debug!(error = %e, "undecodable events payload");
            return StatusCode::BAD_REQUEST.into_response();
        }
    };

    match envelope {
        Envelope::Challenge(challenge) => {
            Json(serde_json::json!({ "challenge": challenge })).into_response()
        }
        Envelope::Event(inbound) => {
            debug!(channel = %inbound.channel, ts = %inbound.ts, kind = %inbound.kind, "event accepted");
            let processor = state.processor.clone();
            tokio::spawn(async move { processor.process(inbound).await });
            StatusCode::OK.into_response()
        }
        Envelope::Ignored => StatusCode::OK.into_response(),
    }
}
