// SPDX-FileCopyrightText: 2026 Quarry Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

use std::sync::Arc;

use async_trait::async_trait;
use quarry_core::types::OutboundReply;
use quarry_core::{QuarryError, ReplySink};
use quarry_query::ProgressSink;

/// Posts progress notes into the thread a question came from.
///
/// Notes carry no state marker.
pub struct ThreadProgress {
    replies: Arc<dyn ReplySink>,
    channel: String,
    thread_ts: Option<String>,
}

impl ThreadProgress {
    pub fn new(replies: Arc<dyn ReplySink>, channel: String, thread_ts: Option<String>) -> Self {
        Self {
            replies,
            channel,
            thread_ts,
        }
    }
}

#[async_trait]
impl ProgressSink for ThreadProgress {
    async fn notify(&self, text: &str) -> Result<(), QuarryError> {
        self.replies
            .post_reply(OutboundReply {
                channel: self.channel.clone(),
                thread_ts: self.thread_ts.clone(),
                text: text.to_string(),
                marker: None,
            })
            .await
            .map(|_| ())
    }
}
