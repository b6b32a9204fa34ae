// SPDX-FileCopyrightText: 2026 Quarry Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Configuration model structs for the Quarry query bot.
//!
//! All structs use `#[serde(deny_unknown_fields)]` to reject unrecognized
//! config keys at startup, providing actionable error messages.

use serde::{Deserialize, Serialize};

/// Top-level Quarry configuration.
///
/// Loaded from TOML files following XDG hierarchy, with environment variable overrides.
/// All sections are optional and default to sensible values.
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct QuarryConfig {
    /// Bot identity and conversation reconstruction settings.
    #[serde(default)]
    pub agent: AgentConfig,

    /// Slack workspace credentials and bot identity.
    #[serde(default)]
    pub slack: SlackConfig,

    /// Events endpoint listener settings.
    #[serde(default)]
    pub server: ServerConfig,

    /// Remote query service settings.
    #[serde(default)]
    pub query: QueryConfig,

    /// PII redaction patterns.
    #[serde(default)]
    pub redaction: RedactionConfig,
}

/// Bot behavior and conversation reconstruction settings.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct AgentConfig {
    /// Display name of the bot.
    #[serde(default = "default_agent_name")]
    pub name: String,

    /// Logging level (trace, debug, info, warn, error).
    #[serde(default = "default_log_level")]
    pub log_level: String,

    /// System prompt template. `{user}` and `{bot}` expand to mention tokens.
    #[serde(default = "default_system_prompt")]
    pub system_prompt: String,

    /// Only direct-message history newer than this many hours is used as context.
    #[serde(default = "default_history_window_hours")]
    pub history_window_hours: u32,

    /// How many direct-message history entries to fetch.
    #[serde(default = "default_dm_history_limit")]
    pub dm_history_limit: usize,

    /// How many thread replies to fetch.
    #[serde(default = "default_thread_reply_limit")]
    pub thread_reply_limit: usize,
}

impl Default for AgentConfig {
    fn default() -> Self {
        Self {
            name: default_agent_name(),
            log_level: default_log_level(),
            system_prompt: default_system_prompt(),
            history_window_hours: default_history_window_hours(),
            dm_history_limit: default_dm_history_limit(),
            thread_reply_limit: default_thread_reply_limit(),
        }
    }
}

fn default_agent_name() -> String {
    "quarry".to_string()
}

fn default_log_level() -> String {
    "info".to_string()
}

fn default_system_prompt() -> String {
    "You are {bot}, a bot that answers questions from {user} by writing SQL \
     against the configured database. Answer with a query and a short explanation."
        .to_string()
}

fn default_history_window_hours() -> u32 {
    24
}

fn default_dm_history_limit() -> usize {
    100
}

fn default_thread_reply_limit() -> usize {
    1000
}

/// Slack workspace credentials and bot identity.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct SlackConfig {
    /// Bot token (`xoxb-...`). `None` disables the Slack integration.
    #[serde(default)]
    pub bot_token: Option<String>,

    /// Signing secret for request verification. `None` skips verification.
    #[serde(default)]
    pub signing_secret: Option<String>,

    /// This install's bot id (`B...`).
    #[serde(default)]
    pub bot_id: Option<String>,

    /// The bot's user id (`U...`).
    #[serde(default)]
    pub bot_user_id: Option<String>,

    /// Web API base URL.
    #[serde(default = "default_slack_api_base_url")]
    pub api_base_url: String,
}

impl Default for SlackConfig {
    fn default() -> Self {
        Self {
            bot_token: None,
            signing_secret: None,
            bot_id: None,
            bot_user_id: None,
            api_base_url: default_slack_api_base_url(),
        }
    }
}

fn default_slack_api_base_url() -> String {
    "https://slack.com/api".to_string()
}

/// Events endpoint listener settings.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct ServerConfig {
    /// Host address to bind.
    #[serde(default = "default_host")]
    pub host: String,

    /// Port to bind.
    #[serde(default = "default_port")]
    pub port: u16,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
        }
    }
}

fn default_host() -> String {
    "127.0.0.1".to_string()
}

fn default_port() -> u16 {
    3000
}

/// How a question is sent to the query service.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum QueryMode {
    /// Submit, poll once, poll until compiled, fetch the executed result.
    #[default]
    Chain,
    /// One call that compiles and executes.
    Direct,
}

/// Remote query service settings.
///
/// Every connection-level field is optional; absent fields are simply not sent.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct QueryConfig {
    /// API key sent as `X-API-Key`. Without it the bot replies with a setup hint.
    #[serde(default)]
    pub api_key: Option<String>,

    /// Base URL the endpoint paths are appended to.
    #[serde(default = "default_query_base_url")]
    pub base_url: String,

    /// Call strategy.
    #[serde(default)]
    pub mode: QueryMode,

    /// Table the question is about.
    #[serde(default)]
    pub table_name: Option<String>,

    /// Database connection (resource) name or URL.
    #[serde(default)]
    pub resource_name: Option<String>,

    /// Database schema.
    #[serde(default)]
    pub schema: Option<String>,

    /// Warehouse, for engines that have one.
    #[serde(default)]
    pub warehouse: Option<String>,

    /// AI engine identifier.
    #[serde(default)]
    pub engine: Option<String>,

    /// Model identifier.
    #[serde(default)]
    pub model: Option<String>,

    /// Sampling temperature, 0.0 to 2.0.
    #[serde(default)]
    pub temperature: Option<f32>,

    /// Number of prior exchanges the service should consider.
    #[serde(default)]
    pub chat_history_size: Option<u32>,

    /// Opaque feature flags forwarded to the service.
    #[serde(default)]
    pub experimental_features: Option<String>,

    /// Per-request timeout in seconds.
    #[serde(default = "default_request_timeout_secs")]
    pub request_timeout_secs: u64,

    /// Retry budget for submit and single-call requests.
    #[serde(default = "default_short_retries")]
    pub short_retries: u32,

    /// Retry budget for the long-running poll and fetch steps.
    #[serde(default = "default_long_retries")]
    pub long_retries: u32,

    /// Include the service's intermediate steps in replies.
    #[serde(default)]
    pub debug: bool,
}

impl Default for QueryConfig {
    fn default() -> Self {
        Self {
            api_key: None,
            base_url: default_query_base_url(),
            mode: QueryMode::default(),
            table_name: None,
            resource_name: None,
            schema: None,
            warehouse: None,
            engine: None,
            model: None,
            temperature: None,
            chat_history_size: None,
            experimental_features: None,
            request_timeout_secs: default_request_timeout_secs(),
            short_retries: default_short_retries(),
            long_retries: default_long_retries(),
            debug: false,
        }
    }
}

fn default_query_base_url() -> String {
    "http://127.0.0.1:8000/api".to_string()
}

fn default_request_timeout_secs() -> u64 {
    120
}

fn default_short_retries() -> u32 {
    3
}

fn default_long_retries() -> u32 {
    30
}

/// PII redaction patterns. An empty pattern disables that rule.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct RedactionConfig {
    /// Master switch for PII rules. Known secret formats are always masked.
    #[serde(default = "default_redaction_enabled")]
    pub enabled: bool,

    #[serde(default = "default_email_pattern")]
    pub email_pattern: String,

    #[serde(default = "default_credit_card_pattern")]
    pub credit_card_pattern: String,

    #[serde(default = "default_phone_pattern")]
    pub phone_pattern: String,

    #[serde(default = "default_ssn_pattern")]
    pub ssn_pattern: String,

    /// Extra pattern replaced with `[REDACTED]`.
    #[serde(default)]
    pub user_defined_pattern: String,
}

impl Default for RedactionConfig {
    fn default() -> Self {
        Self {
            enabled: default_redaction_enabled(),
            email_pattern: default_email_pattern(),
            credit_card_pattern: default_credit_card_pattern(),
            phone_pattern: default_phone_pattern(),
            ssn_pattern: default_ssn_pattern(),
            user_defined_pattern: String::new(),
        }
    }
}

fn default_redaction_enabled() -> bool {
    true
}

fn default_email_pattern() -> String {
    r"\b[A-Za-z0-9._%+\-]+@[A-Za-z0-9.\-]+\.[A-Za-z]{2,}\b".to_string()
}

fn default_credit_card_pattern() -> String {
    r"\b\d(?:[ \-]?\d){12,15}\b".to_string()
}

fn default_phone_pattern() -> String {
    r"\b(?:\+?\d{1,3}[ .\-]?)?\(?\d{3}\)?[ .\-]?\d{3}[ .\-]?\d{4}\b".to_string()
}

fn default_ssn_pattern() -> String {
    r"\b\d{3}-\d{2}-\d{4}\b".to_string()
}
