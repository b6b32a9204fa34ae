// SPDX-FileCopyrightText: 2026 Quarry Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Chat and dialogue types shared across the Quarry crates.

use std::fmt;

use serde::{Deserialize, Serialize};
use strum::{Display, EnumString};

/// `event_type` value identifying a Quarry state marker in message metadata.
pub const MARKER_EVENT_TYPE: &str = "bot-convo";

/// A chat-platform user identifier (e.g. `U024BE7LH`).
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct UserId(pub String);

impl UserId {
    /// Returns the platform mention token for this user, `<@ID>`.
    pub fn mention(&self) -> String {
        format!("<@{}>", self.0)
    }
}

impl fmt::Display for UserId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for UserId {
    fn from(value: &str) -> Self {
        Self(value.to_string())
    }
}

/// Identifier of a posted message (the platform timestamp).
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct MessageId(pub String);

/// Role of a message in the reconstructed dialogue.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Display, EnumString, Serialize, Deserialize,
)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum Role {
    System,
    User,
    Assistant,
}

/// One normalized entry of a conversation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DialogueMessage {
    pub role: Role,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub author: Option<UserId>,
    pub content: String,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub source_timestamp: String,
}

impl DialogueMessage {
    /// A system-role message with no author or timestamp.
    pub fn system(content: impl Into<String>) -> Self {
        Self {
            role: Role::System,
            author: None,
            content: content.into(),
            source_timestamp: String::new(),
        }
    }
}

/// Kind of conversation an event happened in.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Display, EnumString, Serialize, Deserialize,
)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum ChannelType {
    /// Direct message with the bot.
    Im,
    /// Multi-person direct message.
    Mpim,
    /// Public channel.
    Channel,
    /// Private channel.
    Group,
    /// Anything the platform adds later.
    #[serde(other)]
    Unknown,
}

/// What triggered an inbound event.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Display)]
#[strum(serialize_all = "snake_case")]
pub enum EventKind {
    /// A plain message in a channel, DM or thread the bot can see.
    Message,
    /// An explicit `@bot` mention.
    Mention,
}

/// An inbound message or mention event, already decoded from the platform envelope.
#[derive(Debug, Clone, PartialEq)]
pub struct InboundEvent {
    pub kind: EventKind,
    pub channel: String,
    pub channel_type: ChannelType,
    /// Thread root timestamp; `None` for top-level messages.
    pub thread_ts: Option<String>,
    pub ts: String,
    pub text: String,
    pub user: Option<UserId>,
    /// Set when the message was posted by an application.
    pub bot_id: Option<String>,
    /// Platform subtype (`message_changed`, `message_deleted`, ...).
    pub subtype: Option<String>,
    pub team_id: Option<String>,
}

impl InboundEvent {
    /// Whether the event happened in a direct message with the bot.
    pub fn is_direct_message(&self) -> bool {
        self.channel_type == ChannelType::Im
    }

    /// Where replies to this event go: the thread in channels (started at the
    /// event itself when it is top level), the event's own thread in DMs.
    /// `None` posts at the top level of a DM.
    pub fn reply_thread(&self) -> Option<String> {
        if self.is_direct_message() {
            self.thread_ts.clone()
        } else {
            Some(self.thread_ts.clone().unwrap_or_else(|| self.ts.clone()))
        }
    }

    /// The event rendered as a raw history record.
    pub fn as_chat_message(&self) -> ChatMessage {
        ChatMessage {
            ts: self.ts.clone(),
            user: self.user.clone(),
            bot_id: self.bot_id.clone(),
            text: self.text.clone(),
            thread_ts: self.thread_ts.clone(),
            subtype: self.subtype.clone(),
            metadata: None,
        }
    }
}

/// This bot's identity on the chat platform.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BotIdentity {
    /// Application-level bot id (`B...`); distinguishes installs of the same app.
    pub bot_id: String,
    /// The bot's user id (`U...`), used in mention tokens.
    pub bot_user_id: UserId,
}

impl BotIdentity {
    /// The token users type to mention the bot, `<@U...>`.
    pub fn mention_token(&self) -> String {
        self.bot_user_id.mention()
    }
}

/// Metadata block attached to a platform message.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MessageMetadata {
    pub event_type: String,
    #[serde(default)]
    pub event_payload: serde_json::Value,
}

/// A raw message record as returned by the platform's history APIs.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct ChatMessage {
    #[serde(default)]
    pub ts: String,
    #[serde(default)]
    pub user: Option<UserId>,
    #[serde(default)]
    pub bot_id: Option<String>,
    #[serde(default)]
    pub text: String,
    #[serde(default)]
    pub thread_ts: Option<String>,
    #[serde(default)]
    pub subtype: Option<String>,
    #[serde(default)]
    pub metadata: Option<MessageMetadata>,
}

impl ChatMessage {
    /// Whether this message carries a Quarry state marker (from any application).
    pub fn has_state_marker(&self) -> bool {
        self.metadata
            .as_ref()
            .is_some_and(|m| m.event_type == MARKER_EVENT_TYPE)
    }

    /// Decodes the embedded marker payload, if any.
    ///
    /// A marker whose payload does not decode is treated as absent.
    pub fn state_marker(&self) -> Option<MarkerPayload> {
        let metadata = self.metadata.as_ref()?;
        if metadata.event_type != MARKER_EVENT_TYPE {
            return None;
        }
        serde_json::from_value(metadata.event_payload.clone()).ok()
    }
}

/// Payload of an [`EmbeddedStateMarker`].
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct MarkerPayload {
    /// System-role messages only.
    #[serde(default)]
    pub messages: Vec<DialogueMessage>,
    #[serde(default)]
    pub user: Option<UserId>,
}

/// Checkpoint of dialogue state attached to every bot-authored reply.
///
/// Serializes to the platform's message metadata shape:
/// `{"event_type": "bot-convo", "event_payload": {"messages": [...], "user": "U..."}}`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EmbeddedStateMarker {
    pub event_type: String,
    pub event_payload: MarkerPayload,
}

impl EmbeddedStateMarker {
    /// Snapshots the system-role part of a dialogue and the acting user.
    pub fn snapshot(dialogue: &[DialogueMessage], user: Option<&UserId>) -> Self {
        let messages = dialogue
            .iter()
            .filter(|m| m.role == Role::System)
            .cloned()
            .collect();
        Self {
            event_type: MARKER_EVENT_TYPE.to_string(),
            event_payload: MarkerPayload {
                messages,
                user: user.cloned(),
            },
        }
    }
}

/// A reply to post back into a conversation.
#[derive(Debug, Clone, PartialEq)]
pub struct OutboundReply {
    pub channel: String,
    /// Thread to reply in; `None` posts at the top level.
    pub thread_ts: Option<String>,
    pub text: String,
    pub marker: Option<EmbeddedStateMarker>,
}
