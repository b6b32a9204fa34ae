// SPDX-FileCopyrightText: 2026 Quarry Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Test utilities for Quarry integration tests.
//!
//! Provides scripted stand-ins for the chat platform and the query service so
//! resolver, client and handler tests run without network access.
//!
//! # Components
//!
//! - [`MockHistory`] - Scripted chat history with captured replies
//! - [`ScriptedTransport`] - Query transport replaying a fixed status sequence
//! - [`RecordingSleeper`] - Records backoff delays instead of sleeping
//! - [`RecordingProgress`] - Captures progress notes
//! - [`fixtures`] - Builders for events and history records

pub mod fixtures;
pub mod mock_history;
pub mod mock_transport;
pub mod recording;

pub use mock_history::MockHistory;
pub use mock_transport::{ScriptedReply, ScriptedTransport};
pub use recording::{RecordingProgress, RecordingSleeper};
