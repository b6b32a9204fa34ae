// SPDX-FileCopyrightText: 2026 Quarry Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Read access to the chat platform's message history.

use async_trait::async_trait;

use crate::error::QuarryError;
use crate::types::ChatMessage;

/// Read-only view of a chat platform's conversation history.
///
/// The platform is the system of record for dialogue state; the resolver
/// rebuilds everything it needs through these two lookups on every event.
#[async_trait]
pub trait ConversationHistory: Send + Sync {
    /// Channel history, newest first.
    ///
    /// With `latest` set, only messages at or before that timestamp are returned
    /// (inclusive), which makes `history_of(channel, 1, Some(ts))` a point lookup.
    async fn history_of(
        &self,
        channel: &str,
        limit: usize,
        latest: Option<&str>,
    ) -> Result<Vec<ChatMessage>, QuarryError>;

    /// Replies in a thread, oldest first, including the root message.
    async fn replies_in(
        &self,
        channel: &str,
        thread_ts: &str,
        limit: usize,
    ) -> Result<Vec<ChatMessage>, QuarryError>;
}
