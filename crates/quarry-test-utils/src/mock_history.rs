// SPDX-FileCopyrightText: 2026 Quarry Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Scripted chat platform for deterministic testing.
//!
//! `MockHistory` implements `ConversationHistory` over an in-memory message
//! store and `ReplySink` by capturing replies. Captured replies are also
//! appended to the store, so a later turn sees the bot's earlier answers.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};

use async_trait::async_trait;
use tokio::sync::Mutex;

use quarry_core::types::{ChatMessage, MessageMetadata, MessageId, OutboundReply};
use quarry_core::{ConversationHistory, QuarryError, ReplySink};

/// One stored message and the channel it lives in.
#[derive(Debug, Clone)]
struct Stored {
    channel: String,
    message: ChatMessage,
}

/// An in-memory chat platform.
pub struct MockHistory {
    store: Arc<Mutex<Vec<Stored>>>,
    sent: Arc<Mutex<Vec<OutboundReply>>>,
    bot_id: String,
    lookups: AtomicUsize,
    fail_lookups: AtomicBool,
    fail_posts: AtomicBool,
    omit_thread_roots: AtomicBool,
    next_ts: AtomicUsize,
}

impl MockHistory {
    /// An empty platform. Replies are stored as authored by `bot_id`.
    pub fn new(bot_id: &str) -> Self {
        Self {
            store: Arc::new(Mutex::new(Vec::new())),
            sent: Arc::new(Mutex::new(Vec::new())),
            bot_id: bot_id.to_string(),
            lookups: AtomicUsize::new(0),
            fail_lookups: AtomicBool::new(false),
            fail_posts: AtomicBool::new(false),
            omit_thread_roots: AtomicBool::new(false),
            next_ts: AtomicUsize::new(1),
        }
    }

    /// Add a message to `channel`.
    pub async fn push(&self, channel: &str, message: ChatMessage) {
        self.store.lock().await.push(Stored {
            channel: channel.to_string(),
            message,
        });
    }

    /// Add several messages to `channel`.
    pub async fn extend(&self, channel: &str, messages: impl IntoIterator<Item = ChatMessage>) {
        let mut store = self.store.lock().await;
        for message in messages {
            store.push(Stored {
                channel: channel.to_string(),
                message,
            });
        }
    }

    /// Make every history read fail with a lookup error.
    pub fn fail_lookups(&self) {
        self.fail_lookups.store(true, Ordering::SeqCst);
    }

    /// Make every post fail with a channel error.
    pub fn fail_posts(&self) {
        self.fail_posts.store(true, Ordering::SeqCst);
    }

    /// Make `replies_in` return a thread's replies without its root message.
    pub fn omit_thread_roots(&self) {
        self.omit_thread_roots.store(true, Ordering::SeqCst);
    }

    /// Number of history reads performed.
    pub fn lookup_count(&self) -> usize {
        self.lookups.load(Ordering::SeqCst)
    }

    /// All replies captured by `post_reply`.
    pub async fn sent_replies(&self) -> Vec<OutboundReply> {
        self.sent.lock().await.clone()
    }

    /// Texts of the captured replies, in order.
    pub async fn sent_texts(&self) -> Vec<String> {
        self.sent
            .lock()
            .await
            .iter()
            .map(|r| r.text.clone())
            .collect()
    }

    fn begin_lookup(&self) -> Result<(), QuarryError> {
        self.lookups.fetch_add(1, Ordering::SeqCst);
        if self.fail_lookups.load(Ordering::SeqCst) {
            return Err(QuarryError::lookup("mock history unavailable"));
        }
        Ok(())
    }
}

/// Orders Slack-style `seconds.micros` timestamps numerically.
fn ts_key(ts: &str) -> (u64, u64) {
    let (secs, micros) = ts.split_once('.').unwrap_or((ts, "0"));
    (secs.parse().unwrap_or(0), micros.parse().unwrap_or(0))
}

#[async_trait]
impl ConversationHistory for MockHistory {
    async fn history_of(
        &self,
        channel: &str,
        limit: usize,
        latest: Option<&str>,
    ) -> Result<Vec<ChatMessage>, QuarryError> {
        self.begin_lookup()?;
        let store = self.store.lock().await;
        let mut messages: Vec<ChatMessage> = store
            .iter()
            .filter(|s| s.channel == channel)
            .filter(|s| latest.is_none_or(|l| ts_key(&s.message.ts) <= ts_key(l)))
            .map(|s| s.message.clone())
            .collect();
        messages.sort_by_key(|m| std::cmp::Reverse(ts_key(&m.ts)));
        messages.truncate(limit);
        Ok(messages)
    }

    async fn replies_in(
        &self,
        channel: &str,
        thread_ts: &str,
        limit: usize,
    ) -> Result<Vec<ChatMessage>, QuarryError> {
        self.begin_lookup()?;
        let with_root = !self.omit_thread_roots.load(Ordering::SeqCst);
        let store = self.store.lock().await;
        let mut messages: Vec<ChatMessage> = store
            .iter()
            .filter(|s| s.channel == channel)
            .filter(|s| {
                (with_root && s.message.ts == thread_ts)
                    || (s.message.ts != thread_ts
                        && s.message.thread_ts.as_deref() == Some(thread_ts))
            })
            .map(|s| s.message.clone())
            .collect();
        messages.sort_by_key(|m| ts_key(&m.ts));
        messages.truncate(limit);
        Ok(messages)
    }
}

#[async_trait]
impl ReplySink for MockHistory {
    async fn post_reply(&self, reply: OutboundReply) -> Result<MessageId, QuarryError> {
        if self.fail_posts.load(Ordering::SeqCst) {
            return Err(QuarryError::channel("mock post rejected"));
        }
        let n = self.next_ts.fetch_add(1, Ordering::SeqCst);
        let ts = format!("1900000000.{n:06}");

        let metadata = reply.marker.as_ref().and_then(|marker| {
            serde_json::to_value(&marker.event_payload)
                .ok()
                .map(|payload| MessageMetadata {
                    event_type: marker.event_type.clone(),
                    event_payload: payload,
                })
        });
        let stored = ChatMessage {
            ts: ts.clone(),
            bot_id: Some(self.bot_id.clone()),
            text: reply.text.clone(),
            thread_ts: reply.thread_ts.clone(),
            metadata,
            ..ChatMessage::default()
        };
        self.push(&reply.channel, stored).await;
        self.sent.lock().await.push(reply);
        Ok(MessageId(ts))
    }
}
