// SPDX-FileCopyrightText: 2026 Quarry Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Slack Web API client on top of slack-morphism.
//!
//! Implements [`ConversationHistory`] over `conversations.history` and
//! `conversations.replies`, and [`ReplySink`] over `chat.postMessage`. State
//! markers travel as message metadata, so every read asks for
//! `include_all_metadata`.
//!
//! slack-morphism types `event_payload` as a map of strings, which cannot hold
//! a marker's message list. Reads and posts therefore go through the session's
//! generic `http_get`/`http_post` with Quarry's own payload types, while
//! `auth.test` uses the typed API.

use std::future::Future;
use std::time::Duration;

use async_trait::async_trait;
use quarry_core::types::{
    BotIdentity, ChatMessage, EmbeddedStateMarker, MessageId, OutboundReply, UserId,
};
use quarry_core::{ConversationHistory, QuarryError, ReplySink};
use secrecy::{ExposeSecret, SecretString};
use serde::{Deserialize, Serialize};
use slack_morphism::ClientResult;
use slack_morphism::errors::SlackClientError;
use slack_morphism::prelude::{
    SlackApiAuthTestResponse, SlackApiToken, SlackApiTokenValue, SlackClientHyperConnector,
    SlackHyperClient,
};
use tracing::debug;

/// Which side of the platform a call is on; decides the error variant.
#[derive(Debug, Clone, Copy)]
enum Direction {
    Read,
    Write,
}

impl Direction {
    fn error(
        self,
        message: String,
        source: Option<Box<dyn std::error::Error + Send + Sync>>,
    ) -> QuarryError {
        match self {
            Direction::Read => QuarryError::Lookup { message, source },
            Direction::Write => QuarryError::Channel { message, source },
        }
    }

    fn failure(self, method: &str, err: SlackClientError) -> QuarryError {
        // API errors carry the raw response body in their Display.
        let reason = match &err {
            SlackClientError::ApiError(api) => api.code.clone(),
            other => other.to_string(),
        };
        self.error(format!("{method} failed: {reason}"), Some(Box::new(err)))
    }
}

#[derive(Debug, Deserialize)]
struct MessagesPage {
    #[serde(default)]
    messages: Vec<ChatMessage>,
}

#[derive(Debug, Deserialize)]
struct Posted {
    ts: String,
}

#[derive(Debug, Serialize)]
struct PostMessage<'a> {
    channel: &'a str,
    text: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    thread_ts: Option<&'a str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    metadata: Option<&'a EmbeddedStateMarker>,
}

impl<'a> From<&'a OutboundReply> for PostMessage<'a> {
    fn from(reply: &'a OutboundReply) -> Self {
        Self {
            channel: &reply.channel,
            text: &reply.text,
            thread_ts: reply.thread_ts.as_deref(),
            metadata: reply.marker.as_ref(),
        }
    }
}

fn identity_from(auth: SlackApiAuthTestResponse) -> Result<BotIdentity, QuarryError> {
    let bot_id = auth.bot_id.ok_or_else(|| {
        QuarryError::Config(
            "slack.bot_token is not a bot token (auth.test returned no bot_id)".into(),
        )
    })?;
    Ok(BotIdentity {
        bot_id: bot_id.0,
        bot_user_id: UserId(auth.user_id.0),
    })
}

/// Bot-token authenticated Slack Web API client.
pub struct SlackClient {
    client: SlackHyperClient,
    token: SlackApiToken,
    api_base_url: String,
    timeout: Duration,
}

impl SlackClient {
    /// Remote API URLs must use HTTPS.
    pub fn new(
        api_base_url: &str,
        bot_token: SecretString,
        timeout: Duration,
    ) -> Result<Self, QuarryError> {
        quarry_security::validate_url(api_base_url)?;
        let api_base_url = api_base_url.trim_end_matches('/').to_string();
        let connector = SlackClientHyperConnector::new()
            .map_err(|e| QuarryError::Config(format!("failed to set up Slack TLS: {e}")))?
            .with_slack_api_url(&api_base_url);
        let token = SlackApiToken::new(SlackApiTokenValue(
            bot_token.expose_secret().to_string(),
        ));
        Ok(Self {
            client: slack_morphism::SlackClient::new(connector),
            token,
            api_base_url,
            timeout,
        })
    }

    /// Asks `auth.test` who the token belongs to.
    pub async fn identify(&self) -> Result<BotIdentity, QuarryError> {
        let session = self.client.open_session(&self.token);
        let auth = self
            .call("auth.test", Direction::Read, session.auth_test())
            .await?;
        identity_from(auth)
    }

    async fn call<T>(
        &self,
        method: &str,
        direction: Direction,
        request: impl Future<Output = ClientResult<T>>,
    ) -> Result<T, QuarryError> {
        match tokio::time::timeout(self.timeout, request).await {
            Err(_) => Err(direction.error(
                format!("{method} timed out after {}s", self.timeout.as_secs()),
                None,
            )),
            Ok(Err(e)) => Err(direction.failure(method, e)),
            Ok(Ok(value)) => {
                debug!(method, "slack call succeeded");
                Ok(value)
            }
        }
    }
}

impl std::fmt::Debug for SlackClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SlackClient")
            .field("api_base_url", &self.api_base_url)
            .field("bot_token", &"[REDACTED]")
            .finish()
    }
}

#[async_trait]
impl ConversationHistory for SlackClient {
    async fn history_of(
        &self,
        channel: &str,
        limit: usize,
        latest: Option<&str>,
    ) -> Result<Vec<ChatMessage>, QuarryError> {
        let session = self.client.open_session(&self.token);
        let page: MessagesPage = self
            .call(
                "conversations.history",
                Direction::Read,
                session.http_session_api.http_get(
                    "conversations.history",
                    &vec![
                        ("channel", Some(channel.to_string())),
                        ("limit", Some(limit.to_string())),
                        ("include_all_metadata", Some("true".to_string())),
                        ("latest", latest.map(str::to_string)),
                        ("inclusive", latest.map(|_| "true".to_string())),
                    ],
                    None,
                ),
            )
            .await?;
        Ok(page.messages)
    }

    async fn replies_in(
        &self,
        channel: &str,
        thread_ts: &str,
        limit: usize,
    ) -> Result<Vec<ChatMessage>, QuarryError> {
        let session = self.client.open_session(&self.token);
        let page: MessagesPage = self
            .call(
                "conversations.replies",
                Direction::Read,
                session.http_session_api.http_get(
                    "conversations.replies",
                    &vec![
                        ("channel", Some(channel.to_string())),
                        ("ts", Some(thread_ts.to_string())),
                        ("limit", Some(limit.to_string())),
                        ("include_all_metadata", Some("true".to_string())),
                    ],
                    None,
                ),
            )
            .await?;
        Ok(page.messages)
    }
}

#[async_trait]
impl ReplySink for SlackClient {
    async fn post_reply(&self, reply: OutboundReply) -> Result<MessageId, QuarryError> {
        let body = PostMessage::from(&reply);
        let session = self.client.open_session(&self.token);
        let posted: Posted = self
            .call(
                "chat.postMessage",
                Direction::Write,
                session
                    .http_session_api
                    .http_post("chat.postMessage", &body, None),
            )
            .await?;
        Ok(MessageId(posted.ts))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use quarry_core::types::DialogueMessage;
    use serde_json::json;
    use slack_morphism::errors::SlackClientApiError;

    #[test]
    fn history_page_decodes_markers() {
        let page: MessagesPage = serde_json::from_value(json!({
            "ok": true,
            "messages": [
                {"ts": "2.0", "user": "U1", "text": "newer"},
                {"ts": "1.0", "bot_id": "B1", "text": "older", "metadata": {
                    "event_type": "bot-convo",
                    "event_payload": {"messages": [], "user": "U1"}
                }}
            ],
            "has_more": false
        }))
        .unwrap();
        assert_eq!(page.messages.len(), 2);
        assert_eq!(page.messages[0].user, Some(UserId::from("U1")));
        assert!(page.messages[1].has_state_marker());
    }

    #[test]
    fn replies_keep_thread_ts() {
        let page: MessagesPage = serde_json::from_value(json!({
            "ok": true,
            "messages": [
                {"ts": "9.000001", "text": "root"},
                {"ts": "9.000002", "thread_ts": "9.000001", "text": "reply"}
            ]
        }))
        .unwrap();
        assert_eq!(page.messages[1].thread_ts.as_deref(), Some("9.000001"));
    }

    #[test]
    fn post_body_attaches_marker_as_metadata() {
        let marker = EmbeddedStateMarker::snapshot(
            &[DialogueMessage::system("prompt")],
            Some(&UserId::from("U1")),
        );
        let reply = OutboundReply {
            channel: "C1".into(),
            thread_ts: Some("1.0".into()),
            text: "working on it".into(),
            marker: Some(marker),
        };
        let body = serde_json::to_value(PostMessage::from(&reply)).unwrap();
        assert_eq!(body["channel"], "C1");
        assert_eq!(body["thread_ts"], "1.0");
        assert_eq!(body["metadata"]["event_type"], "bot-convo");
        assert_eq!(body["metadata"]["event_payload"]["user"], "U1");
        assert_eq!(
            body["metadata"]["event_payload"]["messages"][0]["content"],
            "prompt"
        );
    }

    #[test]
    fn plain_post_omits_optional_fields() {
        let reply = OutboundReply {
            channel: "D1".into(),
            thread_ts: None,
            text: "hi".into(),
            marker: None,
        };
        let body = serde_json::to_value(PostMessage::from(&reply)).unwrap();
        assert_eq!(body, json!({"channel": "D1", "text": "hi"}));
    }

    #[test]
    fn api_failures_map_by_direction() {
        let err = || {
            SlackClientError::ApiError(
                SlackClientApiError::new("channel_not_found".into())
                    .with_http_response_body("{\"ok\":false}".into()),
            )
        };
        let read = Direction::Read.failure("conversations.replies", err());
        assert!(matches!(read, QuarryError::Lookup { .. }));
        assert!(read.to_string().ends_with("conversations.replies failed: channel_not_found"));

        let write = Direction::Write.failure("chat.postMessage", err());
        assert!(matches!(write, QuarryError::Channel { .. }));
    }

    #[test]
    fn identity_reads_auth_test() {
        let auth: SlackApiAuthTestResponse = serde_json::from_value(json!({
            "ok": true,
            "url": "https://acme.slack.com/",
            "team": "Acme",
            "user": "quarry",
            "team_id": "T1",
            "user_id": "UBOT",
            "bot_id": "B1"
        }))
        .unwrap();
        let identity = identity_from(auth).unwrap();
        assert_eq!(identity.bot_id, "B1");
        assert_eq!(identity.bot_user_id, UserId::from("UBOT"));
    }

    #[test]
    fn user_tokens_are_refused() {
        let auth: SlackApiAuthTestResponse = serde_json::from_value(json!({
            "url": "https://acme.slack.com/",
            "team": "Acme",
            "team_id": "T1",
            "user_id": "U1"
        }))
        .unwrap();
        assert!(matches!(identity_from(auth), Err(QuarryError::Config(_))));
    }

    #[test]
    fn remote_http_is_rejected() {
        let err = SlackClient::new(
            "http://slack.example.com/api",
            SecretString::from("t".to_string()),
            Duration::from_secs(1),
        )
        .unwrap_err();
        assert!(matches!(err, QuarryError::Config(_)));
    }
}
