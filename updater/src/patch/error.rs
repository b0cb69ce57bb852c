//! Error types for patch value validation.
//!
//! Each variant names the rejected input and the constraint it violated.

use thiserror::Error;

/// Errors arising from invalid patch-related values.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum PatchError {
    /// A SHA-256 digest is not a valid 64-character hex string.
    #[error("invalid SHA-256 digest: {reason}")]
    InvalidSha256Digest {
        /// Description of the validation failure.
        reason: String,
    },

    /// A relative path could escape its root or is not normalised.
    #[error("unsafe path \"{path}\": {reason}")]
    UnsafePath {
        /// The rejected path as written in the manifest.
        path: String,
        /// Description of the violated rule.
        reason: String,
    },
}

/// Result type alias using [`PatchError`].
pub type Result<T> = std::result::Result<T, PatchError>;
