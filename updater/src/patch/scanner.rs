//! Tree scanner for installed directories.
//!
//! Enumerates regular files beneath a root and maps each one to its
//! normalised [`PatchPath`]. Symbolic links are not followed and are not
//! reported, whether they point at files or directories; special files
//! (sockets, devices, FIFOs) are skipped the same way. Empty directories
//! contribute nothing because only files are tracked.

use super::patch_path::PatchPath;
use log::trace;
use std::collections::BTreeMap;
use std::io;
use std::path::{Path, PathBuf};
use walkdir::WalkDir;

/// A regular file discovered beneath a scanned root.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TreeEntry {
    /// Path relative to the scanned root.
    pub relative: PatchPath,
    /// Path as found on disk.
    pub absolute: PathBuf,
}

/// Snapshot of a tree: relative path to on-disk path, ordered by path.
pub type TreeSnapshot = BTreeMap<PatchPath, PathBuf>;

/// Lazily walk the regular files beneath `root`.
///
/// Entries within a directory are visited in file-name order. Traversal
/// errors (unreadable directories, vanished entries) are yielded in place
/// rather than silently dropped.
pub fn walk(root: &Path) -> impl Iterator<Item = io::Result<TreeEntry>> + '_ {
    WalkDir::new(root)
        .follow_links(false)
        .sort_by_file_name()
        .into_iter()
        .filter_map(move |entry| match entry {
            Ok(entry) if entry.file_type().is_file() => Some(tree_entry(root, entry.path())),
            Ok(entry) => {
                if entry.file_type().is_symlink() {
                    trace!("skipping symlink {}", entry.path().display());
                }
                None
            }
            Err(err) => Some(Err(io::Error::from(err))),
        })
}

/// Scan every regular file beneath `root`.
///
/// # Errors
///
/// Returns an error if `root` is not a directory, if any directory cannot be
/// read, or if a file name is not valid UTF-8.
///
/// # Examples
///
/// ```
/// use treepatch_updater::patch::scanner::scan;
///
/// let dir = tempfile::tempdir().expect("temp dir");
/// std::fs::create_dir_all(dir.path().join("lib/empty")).expect("mkdir");
/// std::fs::write(dir.path().join("lib/a.dll"), b"a").expect("write");
/// std::fs::write(dir.path().join("app.exe"), b"v1").expect("write");
///
/// let snapshot = scan(dir.path()).expect("scan");
/// let paths: Vec<&str> = snapshot.keys().map(|p| p.as_str()).collect();
/// assert_eq!(paths, ["app.exe", "lib/a.dll"]);
/// ```
pub fn scan(root: &Path) -> io::Result<TreeSnapshot> {
    if !root.is_dir() {
        return Err(io::Error::new(
            io::ErrorKind::NotFound,
            format!("{} is not a directory", root.display()),
        ));
    }
    walk(root)
        .map(|entry| entry.map(|e| (e.relative, e.absolute)))
        .collect()
}

/// Scan `root`, treating a missing root as an empty tree.
///
/// # Errors
///
/// Returns an error if `root` exists but cannot be scanned.
pub fn scan_if_exists(root: &Path) -> io::Result<TreeSnapshot> {
    if root.exists() {
        scan(root)
    } else {
        Ok(TreeSnapshot::new())
    }
}

/// Convert a walked path into a [`TreeEntry`].
fn tree_entry(root: &Path, path: &Path) -> io::Result<TreeEntry> {
    let relative = path.strip_prefix(root).map_err(io::Error::other)?;
    let patch_path = PatchPath::from_relative(relative).ok_or_else(|| {
        io::Error::new(
            io::ErrorKind::InvalidData,
            format!(
                "cannot represent {} as a patch path (non-UTF-8, colon, or device name?)",
                relative.display()
            ),
        )
    })?;
    Ok(TreeEntry {
        relative: patch_path,
        absolute: path.to_path_buf(),
    })
}
