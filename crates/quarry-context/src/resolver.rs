// SPDX-FileCopyrightText: 2026 Quarry Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Reconstruction of the dialogue behind an inbound event.
//!
//! The chat platform is the only record of a conversation. For every event
//! the resolver re-reads the relevant history, finds the latest state marker
//! this bot left, and rebuilds the dialogue from that checkpoint forward. It
//! also decides whether the bot is expected to answer at all.

use std::collections::HashSet;
use std::sync::Arc;

use chrono::{DateTime, Utc};
use quarry_config::model::AgentConfig;
use quarry_core::types::{
    BotIdentity, ChatMessage, DialogueMessage, EventKind, InboundEvent, Role, UserId,
};
use quarry_core::{ConversationHistory, QuarryError};
use quarry_security::Redactor;
use strum::Display;
use tracing::debug;

use crate::mention::MentionStripper;
use crate::prompt::SystemPrompt;

/// Message subtypes that never start a turn.
const IGNORED_SUBTYPES: &[&str] = &["message_changed", "message_deleted"];

/// Why an event gets no answer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Display)]
#[strum(serialize_all = "snake_case")]
pub enum SkipReason {
    /// Posted by another app.
    ForeignBot,
    /// Posted by this bot.
    OwnMessage,
    /// An edit or deletion notice.
    EditedOrDeleted,
    /// A top-level channel message without a mention.
    NotAddressed,
    /// A channel thread the bot was never brought into.
    MentionRequired,
    /// A mention in a thread whose root already mentions the bot; the message event answers it.
    HandledByMessageEvent,
    /// A thread reply mentioning the bot in a thread that otherwise would not be answered; the mention event answers it.
    HandledByMentionEvent,
    /// Nothing new from a user since the last checkpoint.
    NothingToAnswer,
}

/// The outcome of resolving one event.
#[derive(Debug, Clone, PartialEq)]
pub enum Resolution {
    Query(ResolvedQuery),
    Skip(SkipReason),
}

/// A question ready to be sent, with the dialogue that led to it.
#[derive(Debug, Clone, PartialEq)]
pub struct ResolvedQuery {
    pub dialogue: Vec<DialogueMessage>,
    /// Mention-stripped, redacted text of the latest user message.
    pub text_query: String,
    pub acting_user: Option<UserId>,
    /// Thread replies go to; `None` posts at the top level.
    pub reply_thread: Option<String>,
}

/// The raw messages gathered for one event and the mention obligation.
///
/// Built fresh per event and dropped once the dialogue is reconstructed.
#[derive(Debug, Clone, Default)]
pub struct ThreadState {
    pub thread_id: Option<String>,
    pub root_timestamp: Option<String>,
    /// Chronological.
    pub messages: Vec<ChatMessage>,
    /// The bot answers only if mentioned in the root or already part of the thread.
    pub requires_mention: bool,
    pub root_mentions_bot: bool,
    /// Index in `messages` of the latest checkpoint, once reconstruction has run.
    pub last_resolved_index: Option<usize>,
}

type Gathered = Result<ThreadState, SkipReason>;

/// Resolves inbound events into questions.
pub struct ContextResolver {
    history: Arc<dyn ConversationHistory>,
    redactor: Arc<Redactor>,
    identity: BotIdentity,
    stripper: MentionStripper,
    prompt: SystemPrompt,
    window: chrono::Duration,
    dm_history_limit: usize,
    thread_reply_limit: usize,
}

impl ContextResolver {
    pub fn new(
        history: Arc<dyn ConversationHistory>,
        redactor: Arc<Redactor>,
        identity: BotIdentity,
        config: &AgentConfig,
    ) -> Result<Self, QuarryError> {
        let stripper = MentionStripper::new(&identity.bot_user_id)?;
        Ok(Self {
            history,
            redactor,
            stripper,
            identity,
            prompt: SystemPrompt::new(config.system_prompt.clone()),
            window: chrono::Duration::hours(i64::from(config.history_window_hours)),
            dm_history_limit: config.dm_history_limit,
            thread_reply_limit: config.thread_reply_limit,
        })
    }

    pub fn identity(&self) -> &BotIdentity {
        &self.identity
    }

    /// Resolves `event` against the current time.
    pub async fn resolve(&self, event: &InboundEvent) -> Result<Resolution, QuarryError> {
        self.resolve_at(event, Utc::now()).await
    }

    /// Resolves `event` as of `now`, which bounds the direct-message history window.
    ///
    /// Platform read failures are returned as errors and never retried.
    pub async fn resolve_at(
        &self,
        event: &InboundEvent,
        now: DateTime<Utc>,
    ) -> Result<Resolution, QuarryError> {
        if let Some(reason) = self.screen(event) {
            debug!(channel = %event.channel, ts = %event.ts, %reason, "event skipped");
            return Ok(Resolution::Skip(reason));
        }

        let gathered = match event.thread_ts.as_deref() {
            None => self.top_level(event, now).await?,
            Some(thread_ts) => self.thread(event, thread_ts).await?,
        };
        let state = match gathered {
            Ok(state) => state,
            Err(reason) => {
                debug!(channel = %event.channel, ts = %event.ts, %reason, "event skipped");
                return Ok(Resolution::Skip(reason));
            }
        };

        let resolution = self.reconstruct(event, state);
        if let Resolution::Skip(reason) = &resolution {
            debug!(channel = %event.channel, ts = %event.ts, %reason, "event skipped");
        }
        Ok(resolution)
    }

    /// Checks that need no history.
    fn screen(&self, event: &InboundEvent) -> Option<SkipReason> {
        if let Some(bot_id) = event.bot_id.as_deref() {
            return Some(if bot_id == self.identity.bot_id {
                SkipReason::OwnMessage
            } else {
                SkipReason::ForeignBot
            });
        }
        if event.user.as_ref() == Some(&self.identity.bot_user_id) {
            return Some(SkipReason::OwnMessage);
        }
        if event
            .subtype
            .as_deref()
            .is_some_and(|s| IGNORED_SUBTYPES.contains(&s))
        {
            return Some(SkipReason::EditedOrDeleted);
        }
        None
    }

    async fn top_level(
        &self,
        event: &InboundEvent,
        now: DateTime<Utc>,
    ) -> Result<Gathered, QuarryError> {
        if event.is_direct_message() {
            let mut recent = self
                .history
                .history_of(&event.channel, self.dm_history_limit, None)
                .await?;
            recent.reverse();

            let mut messages: Vec<ChatMessage> = recent
                .into_iter()
                .filter(|m| self.within_window(&m.ts, now))
                .collect();
            ensure_contains(&mut messages, event);

            return Ok(Ok(ThreadState {
                messages,
                ..ThreadState::default()
            }));
        }

        if event.kind == EventKind::Mention {
            return Ok(Ok(ThreadState {
                messages: vec![event.as_chat_message()],
                ..ThreadState::default()
            }));
        }

        Ok(Err(SkipReason::NotAddressed))
    }

    async fn thread(
        &self,
        event: &InboundEvent,
        thread_ts: &str,
    ) -> Result<Gathered, QuarryError> {
        let mut messages = self
            .history
            .replies_in(&event.channel, thread_ts, self.thread_reply_limit)
            .await?;
        ensure_contains(&mut messages, event);

        let mut state = ThreadState {
            thread_id: Some(thread_ts.to_string()),
            root_timestamp: Some(thread_ts.to_string()),
            ..ThreadState::default()
        };

        if !event.is_direct_message() {
            let root_mentions_bot = match messages.iter().find(|m| m.ts == thread_ts) {
                Some(root) => self.stripper.mentions(&root.text),
                None => self
                    .history
                    .history_of(&event.channel, 1, Some(thread_ts))
                    .await?
                    .into_iter()
                    .find(|m| m.ts == thread_ts)
                    .is_some_and(|root| self.stripper.mentions(&root.text)),
            };

            match event.kind {
                EventKind::Mention if root_mentions_bot => {
                    return Ok(Err(SkipReason::HandledByMessageEvent));
                }
                EventKind::Mention => {}
                EventKind::Message => {
                    if !root_mentions_bot && self.stripper.mentions(&event.text) {
                        return Ok(Err(SkipReason::HandledByMentionEvent));
                    }
                    state.requires_mention = true;
                    state.root_mentions_bot = root_mentions_bot;
                }
            }
        }

        state.messages = messages;
        Ok(Ok(state))
    }

    fn within_window(&self, ts: &str, now: DateTime<Utc>) -> bool {
        match parse_ts(ts) {
            Some(posted) => now.signed_duration_since(posted) < self.window,
            None => false,
        }
    }

    /// Merges the latest checkpoint with the messages that follow it.
    fn reconstruct(&self, event: &InboundEvent, mut state: ThreadState) -> Resolution {
        let mut acting_user = event.user.clone();
        let mut checkpoint: Option<Vec<DialogueMessage>> = None;
        let mut excluded = HashSet::new();

        for (idx, message) in state.messages.iter().enumerate() {
            if !message.has_state_marker() {
                continue;
            }
            if message.bot_id.as_deref() != Some(self.identity.bot_id.as_str()) {
                excluded.insert(idx);
                continue;
            }
            let Some(payload) = message.state_marker() else {
                debug!(ts = %message.ts, "ignoring unreadable state marker");
                continue;
            };
            let dialogue_empty = checkpoint.as_ref().is_none_or(Vec::is_empty);
            if (acting_user.is_none() || dialogue_empty)
                && let Some(user) = payload.user
            {
                acting_user = Some(user);
            }
            checkpoint = Some(payload.messages);
            state.last_resolved_index = Some(idx);
        }

        let obligated =
            !state.requires_mention || state.root_mentions_bot || checkpoint.is_some();
        if !obligated {
            return Resolution::Skip(SkipReason::MentionRequired);
        }

        let has_checkpoint = checkpoint.is_some();
        let mut dialogue = checkpoint.unwrap_or_default();
        if (event.is_direct_message() || !has_checkpoint)
            && !dialogue.iter().any(|m| m.role == Role::System)
        {
            let text = self.prompt.render(acting_user.as_ref(), &self.identity);
            dialogue.insert(0, DialogueMessage::system(text));
        }

        let mut text_query = None;
        for (idx, message) in state.messages.iter().enumerate() {
            if excluded.contains(&idx) || state.last_resolved_index.is_some_and(|cp| idx <= cp) {
                continue;
            }
            let text = if idx == 0 {
                self.stripper.strip(&message.text)
            } else {
                message.text.clone()
            };
            let role = if self.is_bot_authored(message) {
                Role::Assistant
            } else {
                Role::User
            };
            let author = self.author_of(message);
            dialogue.push(DialogueMessage {
                role,
                content: format!("{}: {}", author.mention(), self.redactor.redact(&text)),
                author: Some(author),
                source_timestamp: message.ts.clone(),
            });
            if role == Role::User {
                text_query = Some(self.redactor.redact(&self.stripper.strip(&message.text)));
            }
        }

        let Some(text_query) = text_query else {
            return Resolution::Skip(SkipReason::NothingToAnswer);
        };

        Resolution::Query(ResolvedQuery {
            dialogue,
            text_query,
            acting_user,
            reply_thread: event.reply_thread(),
        })
    }

    fn is_bot_authored(&self, message: &ChatMessage) -> bool {
        message.bot_id.as_deref() == Some(self.identity.bot_id.as_str())
            || message.user.as_ref() == Some(&self.identity.bot_user_id)
    }

    fn author_of(&self, message: &ChatMessage) -> UserId {
        match (&message.user, &message.bot_id) {
            (Some(user), _) => user.clone(),
            (None, Some(bot_id)) if *bot_id == self.identity.bot_id => {
                self.identity.bot_user_id.clone()
            }
            (None, Some(bot_id)) => UserId(bot_id.clone()),
            (None, None) => UserId("unknown".to_string()),
        }
    }
}

/// Appends the triggering message when the fetched history does not have it yet.
fn ensure_contains(messages: &mut Vec<ChatMessage>, event: &InboundEvent) {
    if !messages.iter().any(|m| m.ts == event.ts) {
        messages.push(event.as_chat_message());
    }
}

/// Parses a `seconds.micros` platform timestamp.
fn parse_ts(ts: &str) -> Option<DateTime<Utc>> {
    let (secs, frac) = ts.split_once('.').unwrap_or((ts, "0"));
    let secs: i64 = secs.parse().ok()?;
    let micros: u32 = format!("{frac:0<6}").get(..6)?.parse().ok()?;
    DateTime::from_timestamp(secs, micros * 1000)
}
