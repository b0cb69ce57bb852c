//! Read-only verification of the live tree before anything is written.
//!
//! Path safety is checked first and is never bypassable. Hash checks
//! compare every file the patch will touch against the digest it was built
//! from; `force` skips them but not the checks that each target is a file
//! and that no symbolic link sits on the way to it.

use super::error::{ApplyError, EntryAction, Problem};
use crate::patch::hasher::hash_file;
use crate::patch::manifest::{DeleteEntry, FileEntry, Manifest};
use crate::patch::patch_path::PatchPath;
use crate::patch::sha256_digest::Sha256Digest;
use log::debug;
use std::fs;
use std::path::{Path, PathBuf};

/// A file to be written, resolved against the target directory.
#[derive(Debug)]
pub(crate) struct PlannedFile<'m> {
    pub(crate) entry: &'m FileEntry,
    pub(crate) path: PatchPath,
    pub(crate) dest: PathBuf,
}

/// A file to be removed, resolved against the target directory.
#[derive(Debug)]
pub(crate) struct PlannedDelete<'m> {
    pub(crate) entry: &'m DeleteEntry,
    pub(crate) path: PatchPath,
    pub(crate) dest: PathBuf,
}

/// The verified work list for the mutation phases.
#[derive(Debug)]
pub(crate) struct Plan<'m> {
    pub(crate) files: Vec<PlannedFile<'m>>,
    pub(crate) deletes: Vec<PlannedDelete<'m>>,
}

impl Plan<'_> {
    /// Count deletions whose target currently exists.
    pub(crate) fn pending_deletes(&self) -> usize {
        self.deletes.iter().filter(|d| d.dest.is_file()).count()
    }
}

/// Validate paths and verify the target tree against `manifest`.
pub(crate) fn verify<'m>(
    manifest: &'m Manifest,
    target_dir: &Path,
    force: bool,
) -> Result<Plan<'m>, ApplyError> {
    let plan = resolve_paths(manifest, target_dir)?;

    let mut problems = Vec::new();
    for file in &plan.files {
        if check_links(&file.path, target_dir, &mut problems) {
            let expected = if force { None } else { file.entry.old_hash.as_ref() };
            check_target(&file.path, &file.dest, expected, EntryAction::Replace, &mut problems);
        }
    }
    for delete in &plan.deletes {
        if check_links(&delete.path, target_dir, &mut problems) {
            let expected = (!force).then_some(&delete.entry.old_hash);
            check_target(&delete.path, &delete.dest, expected, EntryAction::Delete, &mut problems);
        }
    }

    if problems.is_empty() {
        debug!(
            "pre-flight passed for {} files and {} deletions",
            plan.files.len(),
            plan.deletes.len()
        );
        Ok(plan)
    } else {
        Err(ApplyError::VerificationFailed { problems })
    }
}

/// Parse every manifest path, reporting all unsafe ones together.
fn resolve_paths<'m>(manifest: &'m Manifest, target_dir: &Path) -> Result<Plan<'m>, ApplyError> {
    let mut unsafe_paths = Vec::new();
    let mut files = Vec::new();
    let mut deletes = Vec::new();

    for entry in manifest.files() {
        match PatchPath::parse(&entry.path) {
            Ok(path) => files.push(PlannedFile {
                entry,
                dest: path.resolve_under(target_dir),
                path,
            }),
            Err(_) => unsafe_paths.push(entry.path.clone()),
        }
    }
    for entry in manifest.deletes() {
        match PatchPath::parse(&entry.path) {
            Ok(path) => deletes.push(PlannedDelete {
                entry,
                dest: path.resolve_under(target_dir),
                path,
            }),
            Err(_) => unsafe_paths.push(entry.path.clone()),
        }
    }

    if unsafe_paths.is_empty() {
        Ok(Plan { files, deletes })
    } else {
        Err(ApplyError::PathTraversal {
            paths: unsafe_paths,
        })
    }
}

/// Walk `path` below `target_dir` one segment at a time and record a
/// problem at the first symbolic link. Returns true when there is none.
///
/// `target_dir` itself may be a link; only what lies inside it is checked.
fn check_links(path: &PatchPath, target_dir: &Path, problems: &mut Vec<Problem>) -> bool {
    let mut current = target_dir.to_path_buf();
    let mut walked = Vec::new();
    for segment in path.as_str().split('/') {
        current.push(segment);
        walked.push(segment);
        match fs::symlink_metadata(&current) {
            Ok(metadata) if metadata.file_type().is_symlink() => {
                problems.push(Problem::Symlink {
                    path: path.to_string(),
                    link: walked.join("/"),
                });
                return false;
            }
            Ok(_) => {}
            Err(_) => return true,
        }
    }
    true
}

/// Record any problem with the current state of `dest`.
///
/// A missing target is never a problem. A present target must be a
/// regular file and, when `expected` is given, must hash to it.
fn check_target(
    path: &PatchPath,
    dest: &Path,
    expected: Option<&Sha256Digest>,
    action: EntryAction,
    problems: &mut Vec<Problem>,
) {
    let Ok(metadata) = fs::metadata(dest) else {
        return;
    };
    if !metadata.is_file() {
        problems.push(Problem::NotAFile {
            path: path.to_string(),
        });
        return;
    }
    let Some(expected) = expected else {
        return;
    };
    match hash_file(dest) {
        Ok(actual) if &actual == expected => {}
        Ok(actual) => problems.push(Problem::HashMismatch {
            path: path.to_string(),
            action,
            expected: expected.clone(),
            actual,
        }),
        Err(err) => problems.push(Problem::Unreadable {
            path: path.to_string(),
            reason: err.to_string(),
        }),
    }
}
