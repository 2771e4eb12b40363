//! Test doubles shared by the unit tests in this crate.

#![allow(clippy::unwrap_used, clippy::expect_used, clippy::panic)]

use async_trait::async_trait;
use spotfinder_store::{AnalysisStore, StoreError, StoreResult, StoredSpot};
use std::collections::VecDeque;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;

use crate::client::TextGenerator;
use crate::error::ProviderError;

/// Replies from a script, counting calls and recording prompts.
pub struct ScriptedGenerator {
    replies: Mutex<VecDeque<Result<String, u16>>>,
    fallback: Result<String, u16>,
    calls: AtomicUsize,
    prompts: Mutex<Vec<(String, String, Option<f32>)>>,
}

impl ScriptedGenerator {
    /// Always replies with `text`.
    pub fn replying(text: &str) -> Self {
        Self::new(Vec::new(), Ok(text.to_string()))
    }

    /// Always fails with HTTP 503.
    pub fn failing() -> Self {
        Self::new(Vec::new(), Err(503))
    }

    /// Replies in order, then keeps failing.
    pub fn sequence(replies: Vec<Result<&str, u16>>) -> Self {
        let replies = replies
            .into_iter()
            .map(|r| r.map(str::to_string))
            .collect();
        Self::new(replies, Err(503))
    }

    fn new(replies: Vec<Result<String, u16>>, fallback: Result<String, u16>) -> Self {
        Self {
            replies: Mutex::new(replies.into()),
            fallback,
            calls: AtomicUsize::new(0),
            prompts: Mutex::new(Vec::new()),
        }
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    pub fn last_prompt(&self) -> Option<(String, String)> {
        self.prompts
            .lock()
            .unwrap()
            .last()
            .map(|(s, u, _)| (s.clone(), u.clone()))
    }

    pub fn last_temperature(&self) -> Option<f32> {
        self.prompts.lock().unwrap().last().and_then(|(_, _, t)| *t)
    }
}

#[async_trait]
impl TextGenerator for ScriptedGenerator {
    async fn complete(
        &self,
        system: &str,
        user: &str,
        temperature: Option<f32>,
    ) -> Result<String, ProviderError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.prompts
            .lock()
            .unwrap()
            .push((system.to_string(), user.to_string(), temperature));

        let next = self
            .replies
            .lock()
            .unwrap()
            .pop_front()
            .unwrap_or_else(|| self.fallback.clone());
        next.map_err(|status| ProviderError::Status {
            status,
            message: "scripted failure".into(),
        })
    }
}

/// Analysis store whose writes always fail; reads fail too when asked.
#[derive(Default)]
pub struct FailingWriteStore {
    fail_reads: bool,
    writes: AtomicUsize,
}

impl FailingWriteStore {
    pub fn failing_reads() -> Self {
        Self {
            fail_reads: true,
            writes: AtomicUsize::new(0),
        }
    }

    pub fn write_attempts(&self) -> usize {
        self.writes.load(Ordering::SeqCst)
    }
}

impl AnalysisStore for FailingWriteStore {
    fn get_analysis(&self, _place_id: &str) -> StoreResult<Option<StoredSpot>> {
        if self.fail_reads {
            Err(StoreError::storage("connection refused"))
        } else {
            Ok(None)
        }
    }

    fn upsert_analysis(&self, _place_id: &str, _fish_analysis: &str) -> StoreResult<()> {
        self.writes.fetch_add(1, Ordering::SeqCst);
        Err(StoreError::storage("disk full"))
    }

    fn spots_missing_description(&self) -> StoreResult<Vec<StoredSpot>> {
        Ok(Vec::new())
    }

    fn set_description(&self, _place_id: &str, _description: &str) -> StoreResult<()> {
        self.writes.fetch_add(1, Ordering::SeqCst);
        Err(StoreError::storage("disk full"))
    }
}
