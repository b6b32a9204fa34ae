// SPDX-FileCopyrightText: 2026 Quarry Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! `quarry serve` command implementation.
//!
//! Wires the Slack client, the context resolver and the query client into an
//! [`EventHandler`] and serves the Events API endpoint.

use std::sync::Arc;
use std::time::Duration;

use quarry_agent::EventHandler;
use quarry_config::model::QuarryConfig;
use quarry_context::ContextResolver;
use quarry_core::QuarryError;
use quarry_core::types::{BotIdentity, UserId};
use quarry_query::{HttpTransport, QueryClient, QuerySettings};
use quarry_security::{RedactingWriter, Redactor};
use quarry_slack::{EventsState, SignatureVerifier, SlackClient};
use secrecy::SecretString;
use tracing::info;

/// Slack Web API calls are short; this bounds a stuck connection.
const SLACK_TIMEOUT: Duration = Duration::from_secs(30);

/// Runs the `quarry serve` command until the server stops.
pub async fn run_serve(config: QuarryConfig) -> Result<(), QuarryError> {
    let redactor = Arc::new(Redactor::from_config(&config.redaction)?);
    init_tracing(
        &config.agent.log_level,
        redactor.clone(),
        Arc::new(known_secrets(&config)),
    );
    quarry_query::register_metrics();
    quarry_agent::register_metrics();

    let bot_token = config
        .slack
        .bot_token
        .clone()
        .ok_or_else(|| QuarryError::Config("slack.bot_token is required to serve".into()))?;
    let slack = Arc::new(SlackClient::new(
        &config.slack.api_base_url,
        SecretString::from(bot_token),
        SLACK_TIMEOUT,
    )?);

    let identity = match (&config.slack.bot_id, &config.slack.bot_user_id) {
        (Some(bot_id), Some(bot_user_id)) => BotIdentity {
            bot_id: bot_id.clone(),
            bot_user_id: UserId(bot_user_id.clone()),
        },
        _ => slack.identify().await?,
    };
    info!(
        bot_id = %identity.bot_id,
        bot_user_id = %identity.bot_user_id.0,
        "slack identity resolved"
    );

    let resolver = ContextResolver::new(slack.clone(), redactor, identity, &config.agent)?;

    let api_key = configured_api_key(&config);
    quarry_security::validate_url(&config.query.base_url)?;
    let transport = HttpTransport::new(
        &config.query.base_url,
        SecretString::from(api_key.clone().unwrap_or_default()),
        Duration::from_secs(config.query.request_timeout_secs),
    )?;
    let settings = QuerySettings::from_config(&config.query);
    info!(mode = ?settings.mode, "query service: {}", settings.describe());

    let handler = EventHandler::new(
        resolver,
        slack,
        QueryClient::new(Arc::new(transport)),
        settings,
        api_key.is_some(),
    )
    .with_debug(config.query.debug);

    let verifier = config
        .slack
        .signing_secret
        .clone()
        .map(|secret| Arc::new(SignatureVerifier::new(SecretString::from(secret))));

    quarry_slack::start_server(
        &config.server.host,
        config.server.port,
        EventsState {
            processor: Arc::new(handler),
            verifier,
        },
    )
    .await
}

/// The API key, unless absent or blank.
pub(crate) fn configured_api_key(config: &QuarryConfig) -> Option<String> {
    config
        .query
        .api_key
        .clone()
        .filter(|key| !key.trim().is_empty())
}

/// Configured credential values, masked verbatim wherever they show up in logs.
pub(crate) fn known_secrets(config: &QuarryConfig) -> Vec<String> {
    [
        config.slack.bot_token.as_ref(),
        config.slack.signing_secret.as_ref(),
        config.query.api_key.as_ref(),
    ]
    .into_iter()
    .flatten()
    .filter(|s| !s.trim().is_empty())
    .cloned()
    .collect()
}

/// Initialize the tracing subscriber with an env filter and a redacting writer.
fn init_tracing(log_level: &str, redactor: Arc<Redactor>, secrets: Arc<Vec<String>>) {
    use tracing_subscriber::EnvFilter;

    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(format!("quarry={log_level},warn")));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(true)
        .with_thread_names(false)
        .with_writer(move || {
            RedactingWriter::new(std::io::stderr(), redactor.clone(), secrets.clone())
        })
        .init();
}

#[cfg(test)]
mod tests {
    use super::*;

    fn config(toml: &str) -> QuarryConfig {
        quarry_config::load_and_validate_str(toml).unwrap()
    }

    #[test]
    fn known_secrets_skips_missing_and_blank_values() {
        let config = config(
            r#"
            [slack]
            bot_token = "xoxb-123-abc"
            [query]
            api_key = "  "
            "#,
        );
        assert_eq!(known_secrets(&config), vec!["xoxb-123-abc".to_string()]);
    }

    #[test]
    fn blank_api_key_counts_as_missing() {
        assert_eq!(configured_api_key(&config("[query]\napi_key = \"\"")), None);
        assert_eq!(
            configured_api_key(&config("[query]\napi_key = \"k-1\"")),
            Some("k-1".to_string())
        );
    }
}
