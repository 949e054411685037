//! Scripted adapter for tests
//!
//! Queues canned outcomes per operation and records what it was asked, so
//! tests can drive the advisory path deterministically without a network.

use std::collections::VecDeque;
use std::sync::Mutex;

use async_trait::async_trait;

use crate::adapter::{ChatContext, DecisionAssist, ReviewContext};
use crate::disposition::{Disposition, DispositionStatus};
use crate::error::AssistError;

#[derive(Default)]
pub struct ScriptedAssist {
    reviews: Mutex<VecDeque<Result<Disposition, AssistError>>>,
    review_calls: Mutex<Vec<ReviewContext>>,
    text_failures: Mutex<bool>,
}

impl ScriptedAssist {
    pub fn new() -> Self {
        Self::default()
    }

    /// An adapter that always recommends the given status
    pub fn always(status: DispositionStatus, reason: &str) -> Self {
        let scripted = Self::new();
        // An empty queue falls through to this default
        *scripted.reviews.lock().unwrap_or_else(|p| p.into_inner()) =
            VecDeque::from([Ok(Disposition {
                status,
                reason: reason.to_string(),
                notes: None,
            })]);
        scripted
    }

    /// An adapter whose every call fails as unavailable
    pub fn unavailable() -> Self {
        let scripted = Self::new();
        scripted.fail_text_operations();
        scripted
    }

    /// Queues the next review outcome
    ///
    /// The last queued outcome is never consumed; it becomes the standing
    /// answer once the queue drains down to it.
    pub fn push_review(&self, outcome: Result<Disposition, AssistError>) {
        self.reviews
            .lock()
            .unwrap_or_else(|p| p.into_inner())
            .push_back(outcome);
    }

    /// Makes format/autocomplete/chat fail from now on
    pub fn fail_text_operations(&self) {
        *self.text_failures.lock().unwrap_or_else(|p| p.into_inner()) = true;
    }

    /// Review contexts seen so far, in call order
    pub fn review_calls(&self) -> Vec<ReviewContext> {
        self.review_calls
            .lock()
            .unwrap_or_else(|p| p.into_inner())
            .clone()
    }

    fn text_result(&self, value: String) -> Result<String, AssistError> {
        if *self.text_failures.lock().unwrap_or_else(|p| p.into_inner()) {
            Err(AssistError::unavailable("scripted failure"))
        } else {
            Ok(value)
        }
    }
}

#[async_trait]
impl DecisionAssist for ScriptedAssist {
    async fn review(&self, ctx: &ReviewContext) -> Result<Disposition, AssistError> {
        self.review_calls
            .lock()
            .unwrap_or_else(|p| p.into_inner())
            .push(ctx.clone());
        let mut queue = self.reviews.lock().unwrap_or_else(|p| p.into_inner());
        match queue.len() {
            0 => Err(AssistError::unavailable("scripted queue empty")),
            // Keep the last scripted outcome as a standing answer
            1 => match queue.front() {
                Some(Ok(d)) => Ok(d.clone()),
                Some(Err(_)) | None => Err(AssistError::unavailable("scripted failure")),
            },
            _ => match queue.pop_front() {
                Some(outcome) => outcome,
                None => Err(AssistError::unavailable("scripted queue empty")),
            },
        }
    }

    async fn format_text(&self, raw: &str) -> Result<String, AssistError> {
        self.text_result(format!("[formatted] {raw}"))
    }

    async fn autocomplete(&self, prefix: &str) -> Result<String, AssistError> {
        self.text_result(format!("{prefix} (completed)"))
    }

    async fn chat(&self, message: &str, _ctx: &ChatContext) -> Result<String, AssistError> {
        self.text_result(format!("You asked: {message}"))
    }
}
