//! Verified, backed-up application of a patch archive to an installed tree.
//!
//! [`apply`] runs strictly ordered phases, each of which must succeed
//! before the next begins:
//!
//! 1. open the archive and decode its manifest;
//! 2. pre-flight: reject unsafe paths, then verify the live files against
//!    the digests the patch was built from (read-only);
//! 3. stop here for a dry run;
//! 4. extract and verify new content in a private staging directory;
//! 5. back up and remove deleted files;
//! 6. back up, atomically replace, and re-verify changed files.
//!
//! Replacement is atomic per file only. If a later file fails, earlier
//! files stay replaced and the originals remain in the backup snapshot.
//!
//! # Sub-modules
//!
//! - [`error`]: `ApplyError` and pre-flight `Problem` reporting.

mod archive;
mod backup;
pub mod error;
mod preflight;
mod replace;
mod staging;

use crate::patch::hasher::hash_file;
use crate::patch::sha256_digest::Sha256Digest;
use archive::PatchArchive;
use backup::BackupSnapshot;
use error::{ApplyError, io_error};
use log::info;
use preflight::Plan;
use staging::StagingArea;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};

/// Options controlling an [`apply`] run.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ApplyOptions {
    /// Where to keep originals; a timestamped sibling of the target
    /// directory when `None`.
    pub backup_dir: Option<PathBuf>,
    /// Verify and report without modifying anything.
    pub dry_run: bool,
    /// Skip pre-flight hash checks. Path safety is still enforced.
    pub force: bool,
}

/// Summary of an [`apply`] run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ApplyResult {
    /// The backup snapshot, absent for dry runs.
    pub backup_dir: Option<PathBuf>,
    /// Files added or modified (or that would be, for a dry run).
    pub updated_count: usize,
    /// Files removed (or that would be, for a dry run).
    pub deleted_count: usize,
    /// Whether this was a dry run.
    pub dry_run: bool,
}

/// Apply the patch archive at `archive` to `target_dir`.
///
/// `target_dir` may be absent for a full-install patch; it is created once
/// verification has passed.
///
/// # Errors
///
/// - [`ApplyError::InvalidArchive`] when the archive, its manifest, or a
///   member's content is unusable;
/// - [`ApplyError::PathTraversal`] when any manifest path is unsafe, for
///   dry runs and forced runs alike;
/// - [`ApplyError::VerificationFailed`] listing every pre-flight problem;
/// - [`ApplyError::VerifyAfterWriteFailed`] when a replaced file does not
///   hash to its expected digest;
/// - [`ApplyError::TargetNotDirectory`] or [`ApplyError::Io`] on
///   filesystem failures.
///
/// Nothing in `target_dir` is modified unless pre-flight and staging both
/// succeed.
pub fn apply(
    archive: &Path,
    target_dir: &Path,
    options: &ApplyOptions,
) -> Result<ApplyResult, ApplyError> {
    apply_with(archive, target_dir, options, &hash_file)
}

/// Testable inner function; `rehash` digests each file after its rename.
fn apply_with(
    archive: &Path,
    target_dir: &Path,
    options: &ApplyOptions,
    rehash: &dyn Fn(&Path) -> io::Result<Sha256Digest>,
) -> Result<ApplyResult, ApplyError> {
    let mut patch = PatchArchive::open(archive)?;
    if target_dir.exists() && !target_dir.is_dir() {
        return Err(ApplyError::TargetNotDirectory {
            path: target_dir.to_path_buf(),
        });
    }

    let manifest = patch.manifest().clone();
    info!(
        "applying patch {} -> {} to {}",
        display_version(manifest.from_version()),
        manifest.to_version(),
        target_dir.display()
    );
    let plan = preflight::verify(&manifest, target_dir, options.force)?;

    if options.dry_run {
        let result = ApplyResult {
            backup_dir: None,
            updated_count: plan.files.len(),
            deleted_count: plan.pending_deletes(),
            dry_run: true,
        };
        info!(
            "dry run: {} files would be updated and {} deleted",
            result.updated_count, result.deleted_count
        );
        return Ok(result);
    }

    let staging = staging::stage(&mut patch, &plan.files)?;
    fs::create_dir_all(target_dir).map_err(io_error(format!(
        "failed to create target directory {}",
        target_dir.display()
    )))?;
    let mut backup = BackupSnapshot::create(options.backup_dir.as_deref(), target_dir)?;

    let deleted_count = delete_phase(&plan, target_dir, &mut backup)?;
    let updated_count = replace_phase(&plan, &staging, &mut backup, rehash)?;

    info!("updated {updated_count} files and deleted {deleted_count}");
    Ok(ApplyResult {
        backup_dir: Some(backup.into_root()),
        updated_count,
        deleted_count,
        dry_run: false,
    })
}

fn delete_phase(
    plan: &Plan<'_>,
    target_dir: &Path,
    backup: &mut BackupSnapshot,
) -> Result<usize, ApplyError> {
    let mut deleted = 0;
    for delete in &plan.deletes {
        if !delete.dest.is_file() {
            info!("{} already absent", delete.path);
            continue;
        }
        backup.save(&delete.path, &delete.dest)?;
        if replace::remove_and_prune(&delete.dest, target_dir)
            .map_err(io_error(format!("failed to delete \"{}\"", delete.path)))?
        {
            deleted += 1;
        }
    }
    Ok(deleted)
}

fn replace_phase(
    plan: &Plan<'_>,
    staging: &StagingArea,
    backup: &mut BackupSnapshot,
    rehash: &dyn Fn(&Path) -> io::Result<Sha256Digest>,
) -> Result<usize, ApplyError> {
    let mut replaced = 0;
    for (file, staged) in plan.files.iter().zip(&staging.files) {
        if file.dest.is_file() {
            backup.save(&file.path, &file.dest)?;
        }
        replace::atomic_replace(&staged.path, &file.dest, staged.unix_mode)
            .map_err(io_error(format!("failed to replace \"{}\"", file.path)))?;

        let actual = rehash(&file.dest)
            .map_err(io_error(format!("failed to re-read \"{}\"", file.path)))?;
        if actual != file.entry.new_hash {
            return Err(ApplyError::VerifyAfterWriteFailed {
                path: file.path.to_string(),
                expected: file.entry.new_hash.clone(),
                actual,
                replaced,
                backup_dir: backup.root().to_path_buf(),
            });
        }
        replaced += 1;
    }
    Ok(replaced)
}

fn display_version(version: &str) -> &str {
    if version.is_empty() { "(none)" } else { version }
}

#[cfg(test)]
#[path = "apply_tests.rs"]
mod tests;
