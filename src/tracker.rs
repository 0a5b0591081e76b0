// src/tracker.rs

//! Save de-duplication.
//!
//! Editors fire a "will-save" before writing and a "did-save" after. Several
//! save cycles can be in flight at once, so we count dirty will-saves per
//! path and reconcile them on each did-save. A did-save with nothing pending
//! is "unchanged" (e.g. a save of a clean buffer, or an external touch) and
//! can be skipped when `ignore_unchanged_files` is on.

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::{Mutex, PoisonError};

use tracing::debug;

use crate::types::Resource;

type Runner = Box<dyn Fn(&Resource) + Send + Sync>;
type IgnoreUnchanged = Box<dyn Fn() -> bool + Send + Sync>;

pub struct SaveTracker {
    pending: Mutex<HashMap<PathBuf, usize>>,
    runner: Runner,
    ignore_unchanged: IgnoreUnchanged,
}

impl std::fmt::Debug for SaveTracker {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SaveTracker")
            .field("pending", &self.pending)
            .finish_non_exhaustive()
    }
}

impl SaveTracker {
    /// `runner` is invoked for every did-save that is not suppressed.
    /// `ignore_unchanged` is read on each did-save so config reloads apply
    /// immediately.
    pub fn new<R, P>(runner: R, ignore_unchanged: P) -> Self
    where
        R: Fn(&Resource) + Send + Sync + 'static,
        P: Fn() -> bool + Send + Sync + 'static,
    {
        Self {
            pending: Mutex::new(HashMap::new()),
            runner: Box::new(runner),
            ignore_unchanged: Box::new(ignore_unchanged),
        }
    }

    /// Number of will-saves for `path` not yet reconciled.
    pub fn pending_save_count(&self, path: &Path) -> usize {
        self.pending
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .get(path)
            .copied()
            .unwrap_or(0)
    }

    pub fn on_will_save(&self, resource: &Resource) {
        if !resource.is_dirty() {
            return;
        }

        let mut pending = self.pending.lock().unwrap_or_else(PoisonError::into_inner);
        let count = pending.entry(resource.path().to_path_buf()).or_insert(0);
        *count += 1;
        debug!(path = %resource.path().display(), pending = *count, "will-save recorded");
    }

    /// Reconcile one pending save and run commands unless suppressed.
    ///
    /// Returns true if the runner was invoked.
    pub fn on_did_save(&self, resource: &Resource) -> bool {
        let prev_count = {
            let mut pending = self.pending.lock().unwrap_or_else(PoisonError::into_inner);
            let prev = pending.get(resource.path()).copied().unwrap_or(0);
            if prev > 1 {
                pending.insert(resource.path().to_path_buf(), prev - 1);
            } else {
                pending.remove(resource.path());
            }
            prev
        };

        let was_unchanged = prev_count == 0;
        if was_unchanged && (self.ignore_unchanged)() {
            debug!(path = %resource.path().display(), "unchanged save ignored");
            return false;
        }

        (self.runner)(resource);
        true
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;
    use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};

    use proptest::prelude::*;

    use super::*;

    struct Harness {
        tracker: SaveTracker,
        runs: Arc<AtomicUsize>,
        ignore: Arc<AtomicBool>,
    }

    fn harness(ignore_unchanged: bool) -> Harness {
        let runs = Arc::new(AtomicUsize::new(0));
        let ignore = Arc::new(AtomicBool::new(ignore_unchanged));
        let r = Arc::clone(&runs);
        let i = Arc::clone(&ignore);
        let tracker = SaveTracker::new(
            move |_| {
                r.fetch_add(1, Ordering::SeqCst);
            },
            move || i.load(Ordering::SeqCst),
        );
        Harness { tracker, runs, ignore }
    }

    #[test]
    fn dirty_and_clean_saves_under_both_policies() {
        // (is_dirty, ignore_unchanged, pending after will-save, should run)
        let cases = [
            (true, false, 1, true),
            (true, true, 1, true),
            (false, false, 0, true),
            (false, true, 0, false),
        ];

        for (is_dirty, ignore, expected_pending, should_run) in cases {
            let h = harness(ignore);
            let doc = Resource::text_document("/file1.txt", is_dirty);

            h.tracker.on_will_save(&doc);
            assert_eq!(h.tracker.pending_save_count(doc.path()), expected_pending);

            h.tracker.on_did_save(&doc);
            assert_eq!(h.tracker.pending_save_count(doc.path()), 0);
            assert_eq!(h.runs.load(Ordering::SeqCst), usize::from(should_run));
        }
    }

    #[test]
    fn two_pending_saves_reconcile_to_zero_and_run_twice() {
        let h = harness(true);
        let doc = Resource::text_document("/a.rs", true);

        h.tracker.on_will_save(&doc);
        h.tracker.on_will_save(&doc);
        assert_eq!(h.tracker.pending_save_count(doc.path()), 2);

        assert!(h.tracker.on_did_save(&doc));
        assert_eq!(h.tracker.pending_save_count(doc.path()), 1);
        assert!(h.tracker.on_did_save(&doc));
        assert_eq!(h.tracker.pending_save_count(doc.path()), 0);

        assert_eq!(h.runs.load(Ordering::SeqCst), 2);
    }

    #[test]
    fn did_save_without_will_save_respects_policy() {
        let h = harness(true);
        let doc = Resource::text_document("/b.rs", false);
        assert!(!h.tracker.on_did_save(&doc));
        assert_eq!(h.runs.load(Ordering::SeqCst), 0);

        h.ignore.store(false, Ordering::SeqCst);
        assert!(h.tracker.on_did_save(&doc));
        assert_eq!(h.runs.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn extra_did_saves_never_go_negative() {
        let h = harness(false);
        let doc = Resource::notebook("/c.ipynb", true);
        h.tracker.on_will_save(&doc);
        h.tracker.on_did_save(&doc);
        h.tracker.on_did_save(&doc);
        h.tracker.on_did_save(&doc);
        assert_eq!(h.tracker.pending_save_count(doc.path()), 0);
        assert_eq!(h.runs.load(Ordering::SeqCst), 3);
    }

    #[test]
    fn counters_are_per_path() {
        let h = harness(true);
        let a = Resource::text_document("/a", true);
        let b = Resource::text_document("/b", false);
        h.tracker.on_will_save(&a);
        h.tracker.on_did_save(&b);
        assert_eq!(h.tracker.pending_save_count(a.path()), 1);
        assert_eq!(h.runs.load(Ordering::SeqCst), 0);
    }

    proptest! {
        /// Against a plain counter model: pending never underflows, and a
        /// did-save runs unless it had nothing pending and unchanged saves
        /// are ignored.
        #[test]
        fn matches_counter_model(
            ops in proptest::collection::vec((any::<bool>(), any::<bool>()), 0..64),
            ignore in any::<bool>(),
        ) {
            let h = harness(ignore);
            let doc = Resource::text_document("/p.rs", true);
            let mut pending = 0usize;
            let mut runs = 0usize;

            for (is_will_save, dirty) in ops {
                if is_will_save {
                    h.tracker.on_will_save(&Resource::text_document("/p.rs", dirty));
                    if dirty {
                        pending += 1;
                    }
                } else {
                    let ran = h.tracker.on_did_save(&doc);
                    let expected = pending > 0 || !ignore;
                    prop_assert_eq!(ran, expected);
                    runs += usize::from(expected);
                    pending = pending.saturating_sub(1);
                }
                prop_assert_eq!(h.tracker.pending_save_count(doc.path()), pending);
            }

            prop_assert_eq!(h.runs.load(Ordering::SeqCst), runs);
        }
    }
}
