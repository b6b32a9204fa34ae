// SPDX-FileCopyrightText: 2026 Quarry Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Metric registration and recording helpers for query calls.
//!
//! Uses the metrics-rs facade; without an installed recorder these are no-ops.

use metrics::{describe_counter, describe_histogram};

use crate::types::Endpoint;

/// Register query metric descriptions. Call once at startup.
pub fn register_metrics() {
    describe_counter!("quarry_query_calls_total", "Query service calls by outcome");
    describe_counter!("quarry_query_retries_total", "Retries after transient failures");
    describe_histogram!(
        "quarry_query_attempts",
        "Attempts needed per query service call"
    );
}

pub(crate) fn record_retry(endpoint: Endpoint) {
    metrics::counter!("quarry_query_retries_total", "endpoint" => endpoint.as_ref().to_string())
        .increment(1);
}

pub(crate) fn record_outcome(endpoint: Endpoint, outcome: &'static str, attempts: u32) {
    metrics::counter!(
        "quarry_query_calls_total",
        "endpoint" => endpoint.as_ref().to_string(),
        "outcome" => outcome
    )
    .increment(1);
    metrics::histogram!("quarry_query_attempts").record(f64::from(attempts));
}
