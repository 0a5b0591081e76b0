// src/engine/core.rs

//! Pure scheduler state.
//!
//! `CoreState` owns the FIFO of sequential jobs, the running counters, the
//! enabled/disposed flags and the current abort token. It performs no IO and
//! spawns nothing, so every transition can be unit tested without a Tokio
//! runtime. The async shell (`engine::orchestrator`) keeps it behind a mutex
//! and never holds that lock across an `.await`.

use std::collections::VecDeque;

use crate::engine::abort::AbortToken;
use crate::engine::job::QueuedJob;
use crate::engine::status::{OrchestratorStatus, StatusSnapshot};

#[derive(Debug)]
pub struct CoreState {
    queue: VecDeque<QueuedJob>,
    running_sequential: usize,
    running_parallel: usize,
    enabled: bool,
    disposed: bool,
    abort: AbortToken,
}

impl CoreState {
    pub fn new(enabled: bool) -> Self {
        Self {
            queue: VecDeque::new(),
            running_sequential: 0,
            running_parallel: 0,
            enabled,
            disposed: false,
            abort: AbortToken::new(),
        }
    }

    pub fn is_enabled(&self) -> bool {
        self.enabled
    }

    /// Returns true if the flag actually changed.
    pub fn set_enabled(&mut self, enabled: bool) -> bool {
        let changed = self.enabled != enabled;
        self.enabled = enabled;
        changed
    }

    pub fn is_disposed(&self) -> bool {
        self.disposed
    }

    pub fn mark_disposed(&mut self) {
        self.disposed = true;
    }

    pub fn queued(&self) -> usize {
        self.queue.len()
    }

    pub fn activity(&self) -> usize {
        self.queue.len() + self.running_sequential + self.running_parallel
    }

    pub fn status(&self) -> OrchestratorStatus {
        OrchestratorStatus::derive(self.enabled, self.activity())
    }

    pub fn snapshot(&self) -> StatusSnapshot {
        StatusSnapshot {
            status: self.status(),
            queued: self.queue.len(),
            sequential: self.running_sequential,
            parallel: self.running_parallel,
        }
    }

    /// Token for jobs starting now.
    pub fn abort_token(&self) -> AbortToken {
        self.abort.clone()
    }

    pub fn enqueue(&mut self, job: QueuedJob) {
        self.queue.push_back(job);
    }

    /// Take the head of the queue and mark it running.
    ///
    /// Returns `None` while another sequential job is still running, so the
    /// lane can never hold two jobs at once.
    pub fn pop_sequential(&mut self) -> Option<QueuedJob> {
        if self.running_sequential > 0 {
            return None;
        }
        let job = self.queue.pop_front()?;
        self.running_sequential = 1;
        Some(job)
    }

    pub fn finish_sequential(&mut self) {
        self.running_sequential = self.running_sequential.saturating_sub(1);
    }

    pub fn start_parallel(&mut self) {
        self.running_parallel += 1;
    }

    pub fn finish_parallel(&mut self) {
        self.running_parallel = self.running_parallel.saturating_sub(1);
    }

    /// Drop every queued job, cancel the running generation and mint a new
    /// token.
    ///
    /// The returned jobs still need their completion signals fulfilled; the
    /// caller does that outside the lock.
    pub fn abort_all(&mut self) -> Vec<QueuedJob> {
        let discarded: Vec<QueuedJob> = self.queue.drain(..).collect();
        self.abort.cancel();
        self.abort = AbortToken::new();
        discarded
    }
}
