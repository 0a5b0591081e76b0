// src/watch/mod.rs

//! File watching and change detection for the CLI host.
//!
//! This module is responsible for:
//! - Wiring up a cross-platform filesystem watcher (`notify`) on every
//!   workspace root.
//! - Content hashing (`blake3`) so a write that leaves a file unchanged is
//!   reported as an "unchanged" save rather than a dirty one.
//! - Routing writes to the configuration file to a reload.
//! - Dropping writes made by commands to the file they were run for.
//!
//! It does **not** know about commands or matching; it only turns
//! filesystem changes into save events.

pub mod cache;
pub mod hash;
pub mod path_utils;
pub mod watcher;

pub use cache::{FileCache, Observation};
pub use hash::compute_file_hash;
pub use watcher::{COALESCE_WINDOW, RecentRunFilter, WatcherHandle, spawn_watcher};
