// src/workspace.rs

use std::path::{Path, PathBuf};

/// The set of workspace folders the host was started with.
///
/// Commands run with the owning folder of the saved file as their working
/// directory, and `${workspaceFolder}` / `${relativeFile}` are computed
/// against it.
#[derive(Debug, Clone, Default)]
pub struct WorkspaceFolders {
    roots: Vec<PathBuf>,
}

impl WorkspaceFolders {
    pub fn new(roots: impl IntoIterator<Item = PathBuf>) -> Self {
        Self {
            roots: roots.into_iter().collect(),
        }
    }

    pub fn roots(&self) -> &[PathBuf] {
        &self.roots
    }

    /// First configured root, used for host-level state such as the flag file.
    pub fn primary_root(&self) -> Option<&Path> {
        self.roots.first().map(PathBuf::as_path)
    }

    /// The deepest configured root that contains `path`.
    pub fn folder_for(&self, path: &Path) -> Option<&Path> {
        self.roots
            .iter()
            .filter(|root| path.starts_with(root))
            .max_by_key(|root| root.components().count())
            .map(PathBuf::as_path)
    }

    /// Owning folder of `path`, or its containing directory when no folder
    /// owns it.
    pub fn resolve_root(&self, path: &Path) -> PathBuf {
        match self.folder_for(path) {
            Some(root) => root.to_path_buf(),
            None => path
                .parent()
                .filter(|p| !p.as_os_str().is_empty())
                .map(Path::to_path_buf)
                .unwrap_or_else(|| PathBuf::from(".")),
        }
    }
}
