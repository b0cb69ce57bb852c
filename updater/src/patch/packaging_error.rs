//! Error types for patch archive creation.
//!
//! Covers invalid manifest paths, missing or drifting source files, and the
//! I/O and zip failures that can occur while writing the archive.

use super::error::PatchError;
use super::manifest_codec::FormatError;
use super::sha256_digest::Sha256Digest;
use std::path::PathBuf;
use thiserror::Error;

/// Errors arising from patch packaging.
#[derive(Debug, Error)]
pub enum PackagingError {
    /// A manifest path could escape the tree it is applied to.
    #[error("refusing to package: {0}")]
    UnsafePath(#[from] PatchError),

    /// A file listed in the change set is absent from the source tree.
    #[error("source file missing for \"{path}\": {source_path}")]
    MissingSourceFile {
        /// The manifest path of the entry.
        path: String,
        /// Where the file was expected on disk.
        source_path: PathBuf,
    },

    /// A source file changed after the change set was computed.
    #[error("source file \"{path}\" changed while packaging (expected {expected}, read {actual})")]
    SourceChanged {
        /// The manifest path of the entry.
        path: String,
        /// Digest recorded in the change set.
        expected: Sha256Digest,
        /// Digest of the bytes actually written.
        actual: Sha256Digest,
    },

    /// The manifest could not be encoded.
    #[error("manifest encoding failed: {0}")]
    Format(#[from] FormatError),

    /// The zip writer failed.
    #[error("archive write failed: {0}")]
    Archive(#[from] zip::result::ZipError),

    /// An I/O operation failed (reading sources, writing the archive).
    #[error("I/O error during packaging: {0}")]
    Io(#[from] std::io::Error),
}
