// SPDX-FileCopyrightText: 2026 Quarry Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! TLS enforcement for outbound HTTP connections.
//!
//! Both outbound services (the chat platform and the query service) receive
//! credentials in headers, so remote endpoints must use HTTPS.

use std::time::Duration;

use quarry_core::QuarryError;
use tracing::error;

/// Build a reqwest::Client with TLS 1.2+ and the given per-request timeout.
pub fn build_secure_client(timeout: Duration) -> Result<reqwest::Client, QuarryError> {
    reqwest::Client::builder()
        .min_tls_version(reqwest::tls::Version::TLS_1_2)
        .timeout(timeout)
        .build()
        .map_err(|e| {
            error!("failed to build secure HTTP client: {e}");
            QuarryError::Config(format!("failed to build secure HTTP client: {e}"))
        })
}

/// Validate a URL for security policy compliance.
///
/// - Localhost URLs (127.0.0.1, ::1, localhost) are allowed with any scheme.
/// - Remote URLs MUST use HTTPS.
pub fn validate_url(url: &str) -> Result<(), QuarryError> {
    let parsed =
        url::Url::parse(url).map_err(|e| QuarryError::Config(format!("invalid URL `{url}`: {e}")))?;

    let host = parsed.host_str().unwrap_or("");

    if is_localhost(host) {
        return Ok(());
    }

    if parsed.scheme() != "https" {
        error!(url = %url, "TLS required for remote connections");
        return Err(QuarryError::Config(format!(
            "TLS required for remote connections -- use HTTPS for `{url}`"
        )));
    }

    Ok(())
}

/// Check if an address refers to localhost.
pub fn is_localhost(addr: &str) -> bool {
    matches!(addr, "127.0.0.1" | "::1" | "localhost" | "[::1]") || addr.starts_with("127.")
}
