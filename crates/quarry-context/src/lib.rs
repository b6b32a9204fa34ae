// SPDX-FileCopyrightText: 2026 Quarry Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Conversation context resolution for the Quarry query bot.
//!
//! Turns an inbound chat event plus the platform's stored history into the
//! dialogue the query service sees, or a reason to stay silent.

pub mod mention;
pub mod prompt;
pub mod resolver;

pub use mention::MentionStripper;
pub use prompt::SystemPrompt;
pub use resolver::{ContextResolver, Resolution, ResolvedQuery, SkipReason, ThreadState};
