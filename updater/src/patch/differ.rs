//! Snapshot comparison between an old and a new installed tree.
//!
//! The differ scans both trees, hashes every file, and emits the
//! [`FileEntry`] and [`DeleteEntry`] lists a manifest needs. Output is
//! sorted by path so the same two trees always produce the same manifest.

use super::hasher::hash_file;
use super::manifest::{DeleteEntry, FileEntry};
use super::scanner::{TreeSnapshot, scan, scan_if_exists};
use super::sha256_digest::Sha256Digest;
use log::debug;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use thiserror::Error;

/// Whether the change set was computed against an existing old tree.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Baseline {
    /// No old tree existed; every file is an addition.
    Missing,
    /// An old tree was scanned.
    Present,
}

/// The additions, modifications, and deletions between two trees.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChangeSet {
    /// Added or modified files, sorted by path.
    pub files: Vec<FileEntry>,
    /// Deleted files, sorted by path.
    pub deletes: Vec<DeleteEntry>,
    /// Whether an old tree took part in the comparison.
    pub baseline: Baseline,
}

impl ChangeSet {
    /// Return true when the change set was built without an old tree.
    #[must_use]
    pub fn is_full_install(&self) -> bool {
        self.baseline == Baseline::Missing
    }

    /// Return true when there is nothing to add, modify, or delete.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.files.is_empty() && self.deletes.is_empty()
    }
}

/// Errors raised while comparing two trees.
#[derive(Debug, Error)]
pub enum DiffError {
    /// The new tree does not exist or is not a directory.
    #[error("new tree {path} is not a directory")]
    NewTreeMissing {
        /// The path that was expected to be the new tree.
        path: PathBuf,
    },

    /// A tree could not be scanned or a file could not be hashed.
    #[error("failed to read {path}: {source}")]
    Io {
        /// The file or directory being read.
        path: PathBuf,
        /// The underlying I/O error.
        #[source]
        source: io::Error,
    },
}

/// Compare `old_root` against `new_root`.
///
/// Passing `None`, or an `old_root` that does not exist, selects the full
/// install case: every file in `new_root` is reported with no prior hash
/// and nothing is deleted. A file present in both trees is unchanged only
/// when its size and its digest both agree.
///
/// # Errors
///
/// Returns [`DiffError::NewTreeMissing`] when `new_root` is not a
/// directory and [`DiffError::Io`] when a scan or hash fails.
///
/// # Examples
///
/// ```
/// use treepatch_updater::patch::differ::diff;
///
/// let old = tempfile::tempdir().expect("temp dir");
/// let new = tempfile::tempdir().expect("temp dir");
/// std::fs::write(old.path().join("app.exe"), b"v1").expect("write");
/// std::fs::write(old.path().join("old.dll"), b"gone").expect("write");
/// std::fs::write(new.path().join("app.exe"), b"v2").expect("write");
///
/// let change_set = diff(Some(old.path()), new.path()).expect("diff");
/// assert_eq!(change_set.files.len(), 1);
/// assert!(change_set.files[0].old_hash.is_some());
/// assert_eq!(change_set.deletes[0].path, "old.dll");
/// ```
pub fn diff(old_root: Option<&Path>, new_root: &Path) -> Result<ChangeSet, DiffError> {
    if !new_root.is_dir() {
        return Err(DiffError::NewTreeMissing {
            path: new_root.to_path_buf(),
        });
    }
    let new_tree = scan(new_root).map_err(|source| DiffError::Io {
        path: new_root.to_path_buf(),
        source,
    })?;

    let (old_tree, baseline) = match old_root {
        Some(root) if root.exists() => {
            let tree = scan_if_exists(root).map_err(|source| DiffError::Io {
                path: root.to_path_buf(),
                source,
            })?;
            (tree, Baseline::Present)
        }
        _ => (TreeSnapshot::new(), Baseline::Missing),
    };

    let files = changed_files(&old_tree, &new_tree)?;
    let deletes = deleted_files(&old_tree, &new_tree)?;
    debug!(
        "diff found {} changed and {} deleted files",
        files.len(),
        deletes.len()
    );
    Ok(ChangeSet {
        files,
        deletes,
        baseline,
    })
}

fn changed_files(
    old_tree: &TreeSnapshot,
    new_tree: &TreeSnapshot,
) -> Result<Vec<FileEntry>, DiffError> {
    let mut files = Vec::new();
    for (relative, new_path) in new_tree {
        let (new_hash, new_size) = hash_and_size(new_path)?;
        let old_hash = match old_tree.get(relative) {
            Some(old_path) => {
                let (old_hash, old_size) = hash_and_size(old_path)?;
                if old_hash == new_hash && old_size == new_size {
                    continue;
                }
                Some(old_hash)
            }
            None => None,
        };
        files.push(FileEntry {
            path: relative.as_str().to_owned(),
            old_hash,
            new_hash,
            size: new_size,
        });
    }
    Ok(files)
}

fn deleted_files(
    old_tree: &TreeSnapshot,
    new_tree: &TreeSnapshot,
) -> Result<Vec<DeleteEntry>, DiffError> {
    old_tree
        .iter()
        .filter(|(relative, _)| !new_tree.contains_key(*relative))
        .map(|(relative, old_path)| {
            let old_hash = hash_file(old_path).map_err(|source| DiffError::Io {
                path: old_path.clone(),
                source,
            })?;
            Ok(DeleteEntry {
                path: relative.as_str().to_owned(),
                old_hash,
            })
        })
        .collect()
}

fn hash_and_size(path: &Path) -> Result<(Sha256Digest, u64), DiffError> {
    let io_err = |source| DiffError::Io {
        path: path.to_path_buf(),
        source,
    };
    let size = fs::metadata(path).map_err(io_err)?.len();
    let digest = hash_file(path).map_err(io_err)?;
    Ok((digest, size))
}
