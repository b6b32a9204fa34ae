// SPDX-FileCopyrightText: 2026 Quarry Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Per-event orchestration for the Quarry query bot.
//!
//! The [`EventHandler`] is the error boundary for one inbound event:
//! - Resolves the conversation context (or decides to stay silent)
//! - Acknowledges the question in the originating thread
//! - Runs the remote query, posting progress notes while it waits
//! - Renders the answer as plain-text replies carrying the state marker
//!
//! Any failure becomes exactly one user-facing reply.

pub mod handler;
pub mod progress;
pub mod render;

pub use handler::{EventHandler, TurnError, TurnOutcome, register_metrics};
pub use progress::ThreadProgress;
pub use render::{combine, render};
