// SPDX-FileCopyrightText: 2026 Quarry Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Builders for bot identities, inbound events and history records.

use quarry_core::types::{
    BotIdentity, ChannelType, ChatMessage, DialogueMessage, EmbeddedStateMarker, EventKind,
    InboundEvent, MessageMetadata, UserId,
};

/// Bot id used by [`identity`].
pub const BOT_ID: &str = "B0QUARRY";
/// Bot user id used by [`identity`].
pub const BOT_USER_ID: &str = "UQUARRY";

pub fn identity() -> BotIdentity {
    BotIdentity {
        bot_id: BOT_ID.to_string(),
        bot_user_id: UserId::from(BOT_USER_ID),
    }
}

/// Slack-style timestamp for `epoch_secs` with a sequence suffix.
pub fn slack_ts(epoch_secs: i64, seq: u32) -> String {
    format!("{epoch_secs}.{seq:06}")
}

pub fn user_message(ts: &str, user: &str, text: &str) -> ChatMessage {
    ChatMessage {
        ts: ts.to_string(),
        user: Some(UserId::from(user)),
        text: text.to_string(),
        ..ChatMessage::default()
    }
}

pub fn bot_message(ts: &str, bot_id: &str, text: &str) -> ChatMessage {
    ChatMessage {
        ts: ts.to_string(),
        bot_id: Some(bot_id.to_string()),
        user: Some(UserId::from(BOT_USER_ID)),
        text: text.to_string(),
        ..ChatMessage::default()
    }
}

/// Places `message` in the thread rooted at `thread_ts`.
pub fn in_thread(mut message: ChatMessage, thread_ts: &str) -> ChatMessage {
    message.thread_ts = Some(thread_ts.to_string());
    message
}

/// Attaches a state marker carrying `system_prompt` for `user`.
pub fn with_marker(mut message: ChatMessage, system_prompt: &str, user: &str) -> ChatMessage {
    let marker = EmbeddedStateMarker::snapshot(
        &[DialogueMessage::system(system_prompt)],
        Some(&UserId::from(user)),
    );
    message.metadata = Some(MessageMetadata {
        event_type: marker.event_type,
        event_payload: serde_json::to_value(marker.event_payload).unwrap_or_default(),
    });
    message
}

fn event(kind: EventKind, channel: &str, channel_type: ChannelType, ts: &str, user: &str, text: &str) -> InboundEvent {
    InboundEvent {
        kind,
        channel: channel.to_string(),
        channel_type,
        thread_ts: None,
        ts: ts.to_string(),
        text: text.to_string(),
        user: Some(UserId::from(user)),
        bot_id: None,
        subtype: None,
        team_id: Some("T0TEAM".to_string()),
    }
}

/// A top-level direct message.
pub fn dm_event(channel: &str, ts: &str, user: &str, text: &str) -> InboundEvent {
    event(EventKind::Message, channel, ChannelType::Im, ts, user, text)
}

/// A plain channel message.
pub fn channel_event(channel: &str, ts: &str, user: &str, text: &str) -> InboundEvent {
    event(EventKind::Message, channel, ChannelType::Channel, ts, user, text)
}

/// An `app_mention` event in a channel.
pub fn mention_event(channel: &str, ts: &str, user: &str, text: &str) -> InboundEvent {
    event(EventKind::Mention, channel, ChannelType::Channel, ts, user, text)
}

/// Places `event` in the thread rooted at `thread_ts`.
pub fn threaded(mut event: InboundEvent, thread_ts: &str) -> InboundEvent {
    event.thread_ts = Some(thread_ts.to_string());
    event
}
