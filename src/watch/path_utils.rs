// src/watch/path_utils.rs

//! Utility functions for path handling in the watcher.

use std::path::{Component, Path, PathBuf};

/// Directory names whose contents never count as saves.
pub const IGNORED_DIRS: &[&str] = &[".runonsave", ".git"];

/// True if any component of `path` is one of [`IGNORED_DIRS`].
pub fn is_ignored(path: &Path) -> bool {
    path.components().any(|component| match component {
        Component::Normal(name) => IGNORED_DIRS.iter().any(|dir| name == *dir),
        _ => false,
    })
}

/// Canonicalize when possible, otherwise keep the path as given.
pub fn canonical_or_self(path: &Path) -> PathBuf {
    path.canonicalize().unwrap_or_else(|_| path.to_path_buf())
}

/// Whether `a` and `b` name the same file.
///
/// Tries a direct comparison first; falls back to comparing canonical forms
/// (symlinked temp dirs, `/private/var` on macOS).
pub fn same_path(a: &Path, b: &Path) -> bool {
    a == b || canonical_or_self(a) == canonical_or_self(b)
}
