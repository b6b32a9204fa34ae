// SPDX-FileCopyrightText: 2026 Quarry Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Failure taxonomy for remote query calls.

use thiserror::Error;

/// Why a call to the query service did not produce a response.
#[derive(Debug, Error)]
pub enum QueryError {
    /// The service rejected the API key (401/403). Never retried.
    #[error("query service rejected the API key (HTTP {status})")]
    Unauthorized { status: u16 },

    /// The request itself was refused (other 4xx, or an unexpected status). Never retried.
    #[error("query service returned HTTP {status}: {body}")]
    ClientError { status: u16, body: String },

    /// Transient failures persisted until the retry budget ran out.
    #[error("query service still failing after {attempts} attempts (last: {last_failure})")]
    RetriesExhausted { attempts: u32, last_failure: String },

    /// The service answered, but not in the state the chain requires.
    #[error("unexpected service state: {0}")]
    UnexpectedState(String),

    /// A success response whose body is not the expected JSON.
    #[error("failed to decode query service response: {0}")]
    Decode(#[from] serde_json::Error),

    /// Connect, timeout, or body-read failure. Retryable inside `call`.
    #[error("transport error: {message}")]
    Transport {
        message: String,
        source: Option<Box<dyn std::error::Error + Send + Sync>>,
    },

    /// The request could not be built (bad base URL, bad header value).
    #[error("invalid request: {0}")]
    InvalidRequest(String),
}

impl QueryError {
    /// True for the auth-rejection variant, which gets its own user-facing text.
    pub fn is_unauthorized(&self) -> bool {
        matches!(self, Self::Unauthorized { .. })
    }

    /// Short label for metrics and logs.
    pub fn kind(&self) -> &'static str {
        match self {
            Self::Unauthorized { .. } => "unauthorized",
            Self::ClientError { .. } => "client_error",
            Self::RetriesExhausted { .. } => "retries_exhausted",
            Self::UnexpectedState(_) => "unexpected_state",
            Self::Decode(_) => "decode",
            Self::Transport { .. } => "transport",
            Self::InvalidRequest(_) => "invalid_request",
        }
    }
}
