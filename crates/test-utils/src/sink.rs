#![allow(dead_code)]

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;

use runonsave::engine::{OrchestratorStatus, StatusSnapshot, StatusSurface};
use runonsave::output::OutputSink;

/// Output sink that keeps everything in memory.
///
/// `clear` empties the buffer and bumps a counter; `show` only counts.
#[derive(Debug, Default)]
pub struct MemorySink {
    text: Mutex<String>,
    clears: AtomicUsize,
    shows: AtomicUsize,
}

impl MemorySink {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn contents(&self) -> String {
        self.text.lock().unwrap().clone()
    }

    pub fn lines(&self) -> Vec<String> {
        self.contents().lines().map(str::to_string).collect()
    }

    pub fn contains(&self, needle: &str) -> bool {
        self.contents().contains(needle)
    }

    pub fn clear_count(&self) -> usize {
        self.clears.load(Ordering::SeqCst)
    }

    pub fn show_count(&self) -> usize {
        self.shows.load(Ordering::SeqCst)
    }
}

impl OutputSink for MemorySink {
    fn append(&self, text: &str) {
        self.text.lock().unwrap().push_str(text);
    }

    fn clear(&self) {
        self.text.lock().unwrap().clear();
        self.clears.fetch_add(1, Ordering::SeqCst);
    }

    fn show(&self, _force_focus: bool) {
        self.shows.fetch_add(1, Ordering::SeqCst);
    }
}

/// Status surface that records every snapshot it is given.
#[derive(Debug, Default)]
pub struct RecordingStatus {
    history: Mutex<Vec<StatusSnapshot>>,
}

impl RecordingStatus {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn history(&self) -> Vec<StatusSnapshot> {
        self.history.lock().unwrap().clone()
    }

    pub fn last(&self) -> Option<StatusSnapshot> {
        self.history.lock().unwrap().last().copied()
    }

    /// Status values in order, with consecutive duplicates collapsed.
    pub fn statuses(&self) -> Vec<OrchestratorStatus> {
        let mut out: Vec<OrchestratorStatus> = Vec::new();
        for snapshot in self.history() {
            if out.last() != Some(&snapshot.status) {
                out.push(snapshot.status);
            }
        }
        out
    }
}

impl StatusSurface for RecordingStatus {
    fn update(&self, snapshot: &StatusSnapshot) {
        self.history.lock().unwrap().push(*snapshot);
    }
}
