// SPDX-FileCopyrightText: 2026 Quarry Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Write access to the chat platform.

use async_trait::async_trait;

use crate::error::QuarryError;
use crate::types::{MessageId, OutboundReply};

/// Posts replies into conversations.
#[async_trait]
pub trait ReplySink: Send + Sync {
    /// Posts a reply, attaching its state marker as message metadata.
    async fn post_reply(&self, reply: OutboundReply) -> Result<MessageId, QuarryError>;
}
