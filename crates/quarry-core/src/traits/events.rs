// SPDX-FileCopyrightText: 2026 Quarry Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Inbound event dispatch.

use async_trait::async_trait;

use crate::types::InboundEvent;

/// Consumes decoded inbound events.
///
/// Implementations own their error handling: a failure while processing one
/// event must never surface to the dispatcher or affect other events.
#[async_trait]
pub trait EventProcessor: Send + Sync + 'static {
    async fn process(&self, event: InboundEvent);
}
