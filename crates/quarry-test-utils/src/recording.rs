// SPDX-FileCopyrightText: 2026 Quarry Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Recorders for retry delays and progress notes.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

use async_trait::async_trait;
use tokio::sync::Mutex;

use quarry_core::QuarryError;
use quarry_query::{ProgressSink, Sleeper};

/// Records requested delays and returns immediately.
#[derive(Default)]
pub struct RecordingSleeper {
    delays: Arc<Mutex<Vec<Duration>>>,
}

impl RecordingSleeper {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn delays(&self) -> Vec<Duration> {
        self.delays.lock().await.clone()
    }

    pub async fn count(&self) -> usize {
        self.delays.lock().await.len()
    }
}

#[async_trait]
impl Sleeper for RecordingSleeper {
    async fn sleep(&self, duration: Duration) {
        self.delays.lock().await.push(duration);
    }
}

/// Captures progress notes; can be told to fail every post.
#[derive(Default)]
pub struct RecordingProgress {
    notes: Arc<Mutex<Vec<String>>>,
    failing: AtomicBool,
}

impl RecordingProgress {
    pub fn new() -> Self {
        Self::default()
    }

    /// A sink whose every post fails (the note is still recorded).
    pub fn failing() -> Self {
        let sink = Self::default();
        sink.failing.store(true, Ordering::SeqCst);
        sink
    }

    pub async fn notes(&self) -> Vec<String> {
        self.notes.lock().await.clone()
    }
}

#[async_trait]
impl ProgressSink for RecordingProgress {
    async fn notify(&self, text: &str) -> Result<(), QuarryError> {
        self.notes.lock().await.push(text.to_string());
        if self.failing.load(Ordering::SeqCst) {
            return Err(QuarryError::channel("progress sink unavailable"));
        }
        Ok(())
    }
}
