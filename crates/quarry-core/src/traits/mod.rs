// SPDX-FileCopyrightText: 2026 Quarry Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Seams between the resolver, the handler, and the chat platform.
//!
//! All traits use `#[async_trait]` for dynamic dispatch compatibility.

pub mod events;
pub mod history;
pub mod reply;

pub use events::EventProcessor;
pub use history::ConversationHistory;
pub use reply::ReplySink;
