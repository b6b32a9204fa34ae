// SPDX-FileCopyrightText: 2026 Quarry Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Query transport that replays a fixed script.

use std::collections::VecDeque;
use std::sync::Arc;

use async_trait::async_trait;
use tokio::sync::Mutex;

use quarry_query::{QueryError, QueryTransport, RemoteQueryRequest, TransportResponse};

/// One scripted outcome.
#[derive(Debug, Clone)]
pub enum ScriptedReply {
    /// An HTTP response.
    Status(u16, String),
    /// A connect or timeout failure.
    TransportFailure,
}

/// Replays scripted replies in order and records every request it receives.
///
/// When the script runs out, further requests get `500`.
pub struct ScriptedTransport {
    script: Arc<Mutex<VecDeque<ScriptedReply>>>,
    requests: Arc<Mutex<Vec<RemoteQueryRequest>>>,
}

impl ScriptedTransport {
    pub fn new(script: Vec<ScriptedReply>) -> Self {
        Self {
            script: Arc::new(Mutex::new(VecDeque::from(script))),
            requests: Arc::new(Mutex::new(Vec::new())),
        }
    }

    /// Bare statuses with a `{}` body.
    pub fn statuses(statuses: &[u16]) -> Self {
        Self::new(
            statuses
                .iter()
                .map(|s| ScriptedReply::Status(*s, "{}".to_string()))
                .collect(),
        )
    }

    /// Successful responses with the given JSON bodies.
    pub fn json_bodies(bodies: Vec<serde_json::Value>) -> Self {
        Self::new(
            bodies
                .into_iter()
                .map(|b| ScriptedReply::Status(200, b.to_string()))
                .collect(),
        )
    }

    /// Requests received so far.
    pub async fn requests(&self) -> Vec<RemoteQueryRequest> {
        self.requests.lock().await.clone()
    }

    pub async fn request_count(&self) -> usize {
        self.requests.lock().await.len()
    }
}

#[async_trait]
impl QueryTransport for ScriptedTransport {
    async fn send(&self, request: &RemoteQueryRequest) -> Result<TransportResponse, QueryError> {
        self.requests.lock().await.push(request.clone());
        let next = self.script.lock().await.pop_front();
        match next.unwrap_or(ScriptedReply::Status(500, "script exhausted".to_string())) {
            ScriptedReply::Status(status, body) => Ok(TransportResponse { status, body }),
            ScriptedReply::TransportFailure => Err(QueryError::Transport {
                message: "scripted connection reset".to_string(),
                source: None,
            }),
        }
    }
}
