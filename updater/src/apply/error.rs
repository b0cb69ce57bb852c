//! Error types for applying a patch archive.
//!
//! Pre-flight verification collects every [`Problem`] it finds before
//! failing, so one run shows the operator the complete picture. Every later
//! phase fails on its first error.

use crate::patch::sha256_digest::Sha256Digest;
use std::fmt;
use std::io;
use std::path::PathBuf;
use thiserror::Error;

/// What the patch intended to do with a file that failed verification.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EntryAction {
    /// The file was going to be replaced.
    Replace,
    /// The file was going to be deleted.
    Delete,
}

impl fmt::Display for EntryAction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Replace => write!(f, "replace"),
            Self::Delete => write!(f, "delete"),
        }
    }
}

/// A single pre-flight finding against the live target tree.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Problem {
    /// The file on disk is not the version the patch was built against.
    HashMismatch {
        /// Manifest path of the file.
        path: String,
        /// What the patch would have done.
        action: EntryAction,
        /// Digest recorded in the manifest.
        expected: Sha256Digest,
        /// Digest of the file on disk.
        actual: Sha256Digest,
    },
    /// The file on disk could not be hashed.
    Unreadable {
        /// Manifest path of the file.
        path: String,
        /// The read failure.
        reason: String,
    },
    /// A directory or special file sits where the patch expects a file.
    NotAFile {
        /// Manifest path of the entry.
        path: String,
    },
    /// The entry, or a directory above it, is a symbolic link. Following
    /// it could write outside the target directory.
    Symlink {
        /// Manifest path of the entry.
        path: String,
        /// The leading part of `path` that is a link.
        link: String,
    },
}

impl Problem {
    /// Return the manifest path the problem concerns.
    #[must_use]
    pub fn path(&self) -> &str {
        match self {
            Self::HashMismatch { path, .. }
            | Self::Unreadable { path, .. }
            | Self::NotAFile { path }
            | Self::Symlink { path, .. } => path,
        }
    }
}

impl fmt::Display for Problem {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::HashMismatch {
                path,
                action,
                expected,
                actual,
            } => write!(
                f,
                "{path}: hash mismatch before {action} (expected {expected}, found {actual})"
            ),
            Self::Unreadable { path, reason } => write!(f, "{path}: cannot read ({reason})"),
            Self::NotAFile { path } => write!(f, "{path}: not a regular file"),
            Self::Symlink { path, link } if path == link => {
                write!(f, "{path}: is a symbolic link")
            }
            Self::Symlink { path, link } => {
                write!(f, "{path}: {link} is a symbolic link")
            }
        }
    }
}

/// Errors arising from [`apply`](super::apply).
#[derive(Debug, Error)]
pub enum ApplyError {
    /// The archive is not a readable patch: no manifest, a malformed
    /// manifest, a missing member, or member content that does not match
    /// its recorded digest.
    #[error("invalid patch archive {archive}: {reason}")]
    InvalidArchive {
        /// The archive being applied.
        archive: PathBuf,
        /// Description of the defect.
        reason: String,
    },

    /// One or more manifest paths could escape the target directory.
    #[error("unsafe paths in manifest: {}", .paths.join(", "))]
    PathTraversal {
        /// Every unsafe path, in manifest order.
        paths: Vec<String>,
    },

    /// The target tree is not at the version the patch expects.
    #[error("pre-flight verification failed ({} problem(s)):{}", .problems.len(), bullet_list(.problems))]
    VerificationFailed {
        /// Every problem found.
        problems: Vec<Problem>,
    },

    /// A replaced file does not hash to its expected digest. Files replaced
    /// before it stay replaced.
    #[error(
        "{path} does not match its expected digest after replacement (expected {expected}, found {actual}); \
         {replaced} file(s) were already replaced, originals are in {}",
        .backup_dir.display()
    )]
    VerifyAfterWriteFailed {
        /// Manifest path of the file.
        path: String,
        /// Digest recorded in the manifest.
        expected: Sha256Digest,
        /// Digest of the file after the rename.
        actual: Sha256Digest,
        /// Number of files successfully replaced before this one.
        replaced: usize,
        /// The backup snapshot holding the pre-patch files.
        backup_dir: PathBuf,
    },

    /// The target path exists but is not a directory.
    #[error("target {path} is not a directory")]
    TargetNotDirectory {
        /// The target path.
        path: PathBuf,
    },

    /// A filesystem operation failed.
    #[error("{context}: {source}")]
    Io {
        /// What was being done.
        context: String,
        /// The underlying I/O error.
        #[source]
        source: io::Error,
    },
}

impl ApplyError {
    /// Suggest what the operator should do next.
    #[must_use]
    pub fn hint(&self) -> &'static str {
        match self {
            Self::InvalidArchive { .. } => "the patch archive is damaged; obtain a fresh copy",
            Self::PathTraversal { .. } => {
                "the patch tries to write outside the target directory; do not apply it"
            }
            Self::VerificationFailed { .. } => {
                "the target directory is not at the expected version; re-install from scratch or pass --force"
            }
            Self::VerifyAfterWriteFailed { .. } => {
                "the installation is partially updated; restore it from the backup directory"
            }
            Self::TargetNotDirectory { .. } => "point the target at the installation directory",
            Self::Io { .. } => "check permissions and that the application is not running",
        }
    }
}

/// Build an [`ApplyError::Io`] with `context`.
pub(crate) fn io_error(context: impl Into<String>) -> impl FnOnce(io::Error) -> ApplyError {
    let context = context.into();
    move |source| ApplyError::Io { context, source }
}

fn bullet_list(problems: &[Problem]) -> String {
    problems.iter().map(|p| format!("\n  - {p}")).collect()
}
