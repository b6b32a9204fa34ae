// SPDX-FileCopyrightText: 2026 Quarry Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Post-deserialization validation for configuration values.
//!
//! Checks constraints serde cannot express: non-empty addresses, numeric
//! ranges, parseable URLs and compilable redaction patterns.

use crate::diagnostic::ConfigError;
use crate::model::QuarryConfig;

/// Upper bound the chat platform places on a single replies page.
const MAX_THREAD_REPLY_LIMIT: usize = 1000;

/// Validate a deserialized configuration for semantic correctness.
///
/// Returns `Ok(())` if all validations pass, or `Err(Vec<ConfigError>)` with
/// all collected validation errors (does not fail fast).
pub fn validate_config(config: &QuarryConfig) -> Result<(), Vec<ConfigError>> {
    let mut errors = Vec::new();
    let mut fail = |message: String| errors.push(ConfigError::Validation { message });

    if config.server.host.trim().is_empty() {
        fail("server.host must not be empty".to_string());
    }
    if config.server.port == 0 {
        fail("server.port must not be 0".to_string());
    }

    if config.agent.history_window_hours == 0 {
        fail("agent.history_window_hours must be at least 1".to_string());
    }
    if config.agent.dm_history_limit == 0 {
        fail("agent.dm_history_limit must be at least 1".to_string());
    }
    if config.agent.thread_reply_limit == 0 || config.agent.thread_reply_limit > MAX_THREAD_REPLY_LIMIT {
        fail(format!(
            "agent.thread_reply_limit must be between 1 and {MAX_THREAD_REPLY_LIMIT}, got {}",
            config.agent.thread_reply_limit
        ));
    }

    if let Some(message) = check_http_url("query.base_url", &config.query.base_url) {
        fail(message);
    }
    if let Some(message) = check_http_url("slack.api_base_url", &config.slack.api_base_url) {
        fail(message);
    }

    if let Some(temperature) = config.query.temperature
        && !(0.0..=2.0).contains(&temperature)
    {
        fail(format!(
            "query.temperature must be between 0.0 and 2.0, got {temperature}"
        ));
    }
    if config.query.request_timeout_secs == 0 {
        fail("query.request_timeout_secs must be at least 1".to_string());
    }
    if config.query.short_retries == 0 {
        fail("query.short_retries must be at least 1".to_string());
    }
    if config.query.long_retries == 0 {
        fail("query.long_retries must be at least 1".to_string());
    }

    let redaction = &config.redaction;
    for (name, pattern) in [
        ("email_pattern", &redaction.email_pattern),
        ("credit_card_pattern", &redaction.credit_card_pattern),
        ("phone_pattern", &redaction.phone_pattern),
        ("ssn_pattern", &redaction.ssn_pattern),
        ("user_defined_pattern", &redaction.user_defined_pattern),
    ] {
        if pattern.trim().is_empty() {
            continue;
        }
        if let Err(e) = regex::Regex::new(pattern) {
            fail(format!("redaction.{name} is not a valid regex: {e}"));
        }
    }

    if errors.is_empty() {
        Ok(())
    } else {
        Err(errors)
    }
}

fn check_http_url(key: &str, value: &str) -> Option<String> {
    match url::Url::parse(value) {
        Ok(parsed) if matches!(parsed.scheme(), "http" | "https") => None,
        Ok(parsed) => Some(format!(
            "{key} must use http or https, got scheme `{}`",
            parsed.scheme()
        )),
        Err(e) => Some(format!("{key} `{value}` is not a valid URL: {e}")),
    }
}
