// SPDX-FileCopyrightText: 2026 Quarry Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Redaction and transport security for the Quarry query bot.
//!
//! Provides the PII/secret redaction filter applied to chat text before it is
//! sent to the query service, the redacting log writer, and TLS enforcement
//! for outbound HTTP clients.

pub mod redact;
pub mod tls;

pub use redact::{redact, redact_url_credentials, RedactingWriter, Redactor};
pub use tls::{build_secure_client, is_localhost, validate_url};
