// SPDX-FileCopyrightText: 2026 Quarry Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Error types shared by the Quarry crates.

use thiserror::Error;

/// The primary error type for chat-platform and configuration operations.
///
/// Remote query failures have their own taxonomy in `quarry-query`; this enum
/// covers everything that talks to the chat platform or the process itself.
#[derive(Debug, Error)]
pub enum QuarryError {
    /// Configuration errors (missing credentials, invalid values).
    #[error("configuration error: {0}")]
    Config(String),

    /// A read from the chat platform failed (history, replies, root lookup).
    ///
    /// Fatal for the current turn; never retried.
    #[error("lookup failed: {message}")]
    Lookup {
        message: String,
        source: Option<Box<dyn std::error::Error + Send + Sync>>,
    },

    /// A write to the chat platform failed (posting a reply).
    #[error("channel error: {message}")]
    Channel {
        message: String,
        source: Option<Box<dyn std::error::Error + Send + Sync>>,
    },

    /// Internal or unexpected errors.
    #[error("internal error: {0}")]
    Internal(String),
}

impl QuarryError {
    /// Builds a [`QuarryError::Lookup`] without an underlying source.
    pub fn lookup(message: impl Into<String>) -> Self {
        Self::Lookup {
            message: message.into(),
            source: None,
        }
    }

    /// Builds a [`QuarryError::Channel`] without an underlying source.
    pub fn channel(message: impl Into<String>) -> Self {
        Self::Channel {
            message: message.into(),
            source: None,
        }
    }
}
