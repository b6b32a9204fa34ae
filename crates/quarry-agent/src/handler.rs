// SPDX-FileCopyrightText: 2026 Quarry Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! The per-event turn: resolve, acknowledge, query, render, reply.

use std::sync::Arc;

use async_trait::async_trait;
use metrics::describe_counter;
use quarry_config::model::QueryMode;
use quarry_context::{ContextResolver, Resolution, ResolvedQuery, SkipReason};
use quarry_core::types::{EmbeddedStateMarker, InboundEvent, OutboundReply};
use quarry_core::{EventProcessor, QuarryError, ReplySink};
use quarry_query::{ProgressSink, QueryClient, QueryError, QuerySettings, Question};
use thiserror::Error;
use tracing::{debug, error, info};

use crate::progress::ThreadProgress;
use crate::render;

/// Acknowledgement posted before the query starts.
pub const LOADING_TEXT: &str = ":hourglass_flowing_sand: Wait a second, please ...";

/// Reply when no API key is configured.
pub const MISSING_API_KEY_TEXT: &str =
    "To use this app, please configure the query service API key first (`[query] api_key`).";

/// Reply when the query service rejects the API key.
pub const UNAUTHORIZED_TEXT: &str =
    ":warning: The query service rejected the configured API key. Please check it and try again.";

/// Reply for every other failure.
pub const GENERIC_ERROR_TEXT: &str =
    ":warning: Sorry! Something went wrong while answering your question. Please try again later. :bow:";

/// Why a turn failed.
#[derive(Debug, Error)]
pub enum TurnError {
    /// Reading from or posting to the chat platform failed.
    #[error(transparent)]
    Platform(#[from] QuarryError),

    #[error(transparent)]
    Query(#[from] QueryError),
}

impl TurnError {
    /// The single reply the user sees. Never carries error detail.
    pub fn user_text(&self) -> &'static str {
        match self {
            TurnError::Query(e) if e.is_unauthorized() => UNAUTHORIZED_TEXT,
            _ => GENERIC_ERROR_TEXT,
        }
    }

    pub fn kind(&self) -> &'static str {
        match self {
            TurnError::Platform(QuarryError::Lookup { .. }) => "lookup",
            TurnError::Platform(_) => "platform",
            TurnError::Query(e) => e.kind(),
        }
    }
}

/// What a successful turn did.
#[derive(Debug, Clone, PartialEq)]
pub enum TurnOutcome {
    Skipped(SkipReason),
    /// Told the user to configure an API key.
    NotConfigured,
    /// Posted `replies` answer messages (excluding acknowledgement and progress notes).
    Answered { replies: usize },
}

impl TurnOutcome {
    fn label(&self) -> &'static str {
        match self {
            TurnOutcome::Skipped(_) => "skipped",
            TurnOutcome::NotConfigured => "not_configured",
            TurnOutcome::Answered { .. } => "answered",
        }
    }
}

/// Register turn metric descriptions. Call once at startup.
pub fn register_metrics() {
    describe_counter!("quarry_turns_total", "Inbound events by turn outcome");
}

/// Handles inbound events end to end.
pub struct EventHandler {
    resolver: ContextResolver,
    replies: Arc<dyn ReplySink>,
    client: QueryClient,
    settings: QuerySettings,
    api_key_configured: bool,
    debug: bool,
}

impl EventHandler {
    pub fn new(
        resolver: ContextResolver,
        replies: Arc<dyn ReplySink>,
        client: QueryClient,
        settings: QuerySettings,
        api_key_configured: bool,
    ) -> Self {
        Self {
            resolver,
            replies,
            client,
            settings,
            api_key_configured,
            debug: false,
        }
    }

    /// Also post the service's intermediate steps.
    pub fn with_debug(mut self, debug: bool) -> Self {
        self.debug = debug;
        self
    }

    /// Runs one turn. Errors are returned, not reported; see [`EventProcessor::process`].
    pub async fn handle(&self, event: &InboundEvent) -> Result<TurnOutcome, TurnError> {
        let query = match self.resolver.resolve(event).await? {
            Resolution::Skip(reason) => return Ok(TurnOutcome::Skipped(reason)),
            Resolution::Query(query) => query,
        };

        if !self.api_key_configured {
            self.post(event, &query, MISSING_API_KEY_TEXT.to_string(), None)
                .await?;
            return Ok(TurnOutcome::NotConfigured);
        }

        let marker = EmbeddedStateMarker::snapshot(&query.dialogue, query.acting_user.as_ref());
        self.post(
            event,
            &query,
            format!("{LOADING_TEXT} {}", self.settings.describe()),
            Some(marker.clone()),
        )
        .await?;

        let question = Question {
            text: query.text_query.clone(),
            team_id: event.team_id.clone(),
            user_id: event
                .user
                .as_ref()
                .or(query.acting_user.as_ref())
                .map(|u| u.0.clone()),
        };
        info!(
            channel = %event.channel,
            mode = ?self.settings.mode,
            turns = query.dialogue.len(),
            "querying"
        );

        let response = match self.settings.mode {
            QueryMode::Chain => {
                let progress: Arc<dyn ProgressSink> = Arc::new(ThreadProgress::new(
                    self.replies.clone(),
                    event.channel.clone(),
                    query.reply_thread.clone(),
                ));
                let outcome = self
                    .client
                    .run_chain(&self.settings, &question, Some(progress))
                    .await?;
                render::combine(outcome)
            }
            QueryMode::Direct => self.client.run_direct(&self.settings, &question).await?,
        };

        let texts = render::render(&response, self.debug);
        let count = texts.len();
        for text in texts {
            self.post(event, &query, text, Some(marker.clone())).await?;
        }
        Ok(TurnOutcome::Answered { replies: count })
    }

    async fn post(
        &self,
        event: &InboundEvent,
        query: &ResolvedQuery,
        text: String,
        marker: Option<EmbeddedStateMarker>,
    ) -> Result<(), QuarryError> {
        self.replies
            .post_reply(OutboundReply {
                channel: event.channel.clone(),
                thread_ts: query.reply_thread.clone(),
                text,
                marker,
            })
            .await
            .map(|_| ())
    }

    /// Posts the single failure reply for `error`.
    async fn report(&self, event: &InboundEvent, error: &TurnError) {
        let reply = OutboundReply {
            channel: event.channel.clone(),
            thread_ts: event.reply_thread(),
            text: error.user_text().to_string(),
            marker: None,
        };
        if let Err(e) = self.replies.post_reply(reply).await {
            error!(channel = %event.channel, error = %e, "failed to post failure reply");
        }
    }
}

#[async_trait]
impl EventProcessor for EventHandler {
    async fn process(&self, event: InboundEvent) {
        match self.handle(&event).await {
            Ok(outcome) => {
                debug!(channel = %event.channel, ts = %event.ts, ?outcome, "turn finished");
                metrics::counter!("quarry_turns_total", "outcome" => outcome.label()).increment(1);
            }
            Err(e) => {
                error!(
                    channel = %event.channel,
                    ts = %event.ts,
                    kind = e.kind(),
                    error = %e,
                    "turn failed"
                );
                metrics::counter!("quarry_turns_total", "outcome" => "failed").increment(1);
                self.report(&event, &e).await;
            }
        }
    }
}
