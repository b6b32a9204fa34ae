// SPDX-FileCopyrightText: 2026 Quarry Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Resilient client for the remote natural-language-to-SQL service.
//!
//! Requests are plain HTTP GETs with the question and connection settings as
//! query parameters. Each logical call is retried on 5xx and transport
//! failures; 401/403 and other 4xx statuses end the call immediately.

pub mod client;
pub mod error;
pub mod metrics;
pub mod policy;
pub mod settings;
pub mod transport;
pub mod types;

pub use client::QueryClient;
pub use error::QueryError;
pub use metrics::register_metrics;
pub use policy::{
    is_prime, Backoff, ProgressSink, RetryPolicy, Sleeper, TokioSleeper, DEFAULT_DELAY,
    PROGRESS_MESSAGES,
};
pub use settings::QuerySettings;
pub use transport::{HttpTransport, QueryTransport, TransportResponse};
pub use types::{
    ChainOutcome, Endpoint, Question, QueryStatus, RemoteQueryRequest, RemoteQueryResponse,
};
