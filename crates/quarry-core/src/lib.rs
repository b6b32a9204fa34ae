// SPDX-FileCopyrightText: 2026 Quarry Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Core library for the Quarry query bot.
//!
//! Provides the chat types (raw history records, normalized dialogue
//! messages, state markers), the error type, and the traits that connect the
//! context resolver and the event handler to a chat platform.

pub mod error;
pub mod traits;
pub mod types;

// Re-export key items at crate root for ergonomic imports.
pub use error::QuarryError;
pub use traits::{ConversationHistory, EventProcessor, ReplySink};
pub use types::{
    BotIdentity, ChannelType, ChatMessage, DialogueMessage, EmbeddedStateMarker, EventKind,
    InboundEvent, MarkerPayload, MessageId, MessageMetadata, OutboundReply, Role, UserId,
    MARKER_EVENT_TYPE,
};
