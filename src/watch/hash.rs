// src/watch/hash.rs

use std::fs::File;
use std::io::Read;
use std::path::Path;

use anyhow::{Context, Result};
use blake3::Hasher;
use tracing::trace;

/// Hash the contents of a single file.
///
/// Returns `None` when `path` is not a regular file (deleted, a directory,
/// a dangling link). Files are read in fixed-size chunks so large files do
/// not need to fit in memory.
pub fn compute_file_hash(path: &Path) -> Result<Option<String>> {
    if !path.is_file() {
        return Ok(None);
    }

    let mut file =
        File::open(path).with_context(|| format!("opening file for hashing: {:?}", path))?;
    let mut hasher = Hasher::new();
    let mut buf = [0u8; 8192];
    loop {
        let n = file
            .read(&mut buf)
            .with_context(|| format!("reading file for hashing: {:?}", path))?;
        if n == 0 {
            break;
        }
        hasher.update(&buf[..n]);
    }

    let hash = hasher.finalize().to_hex().to_string();
    trace!(?path, hash = %hash, "computed file hash");
    Ok(Some(hash))
}

#[cfg(test)]
mod tests {
    use std::fs;

    use super::*;

    #[test]
    fn same_content_same_hash() {
        let dir = tempfile::tempdir().unwrap();
        let a = dir.path().join("a.txt");
        let b = dir.path().join("b.txt");
        fs::write(&a, "hello").unwrap();
        fs::write(&b, "hello").unwrap();

        let ha = compute_file_hash(&a).unwrap().unwrap();
        let hb = compute_file_hash(&b).unwrap().unwrap();
        assert_eq!(ha, hb);

        fs::write(&b, "hello!").unwrap();
        assert_ne!(ha, compute_file_hash(&b).unwrap().unwrap());
    }

    #[test]
    fn directories_and_missing_files_have_no_hash() {
        let dir = tempfile::tempdir().unwrap();
        assert_eq!(compute_file_hash(dir.path()).unwrap(), None);
        assert_eq!(compute_file_hash(&dir.path().join("gone")).unwrap(), None);
    }
}
