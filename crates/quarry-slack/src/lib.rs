// SPDX-FileCopyrightText: 2026 Quarry Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Slack integration for the Quarry query bot.
//!
//! [`SlackClient`] reads conversation history and posts replies through the
//! Web API using slack-morphism. [`server`] exposes the Events API endpoint
//! that decodes push events and hands each one to an
//! [`quarry_core::EventProcessor`].

pub mod client;
pub mod events;
pub mod server;
pub mod signature;

pub use client::SlackClient;
pub use events::Envelope;
pub use server::{router, start_server, EventsState};
pub use signature::SignatureVerifier;
