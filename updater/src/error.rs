//! Error types for the update orchestrator.
//!
//! [`UpdateError`] is the single error surfaced by [`crate::orchestrator`].
//! Each variant carries enough context to act on and a recovery hint, and
//! maps to a stable process exit code so scripted callers can tell a
//! refused patch from a broken network.

use crate::apply::error::ApplyError;
use crate::config::ConfigError;
use crate::descriptor::DescriptorError;
use crate::download::DownloadError;
use crate::location::LocationError;
use crate::patch::sha256_digest::Sha256Digest;
use std::path::PathBuf;
use thiserror::Error;

/// Exit code for success.
pub const EXIT_OK: i32 = 0;
/// Exit code for generic and I/O failures.
pub const EXIT_FAILURE: i32 = 1;
/// Exit code when the patch was refused before anything was modified.
pub const EXIT_REFUSED: i32 = 2;
/// Exit code for integrity and network failures.
pub const EXIT_TRANSFER: i32 = 3;
/// Exit code when the installation was left partially updated.
pub const EXIT_PARTIAL: i32 = 4;

/// Errors that can occur while running an update.
#[derive(Debug, Error)]
pub enum UpdateError {
    /// The update descriptor could not be parsed.
    #[error("invalid update descriptor {source_location}: {source}")]
    Descriptor {
        /// Where the descriptor was read from.
        source_location: String,
        /// The underlying parse failure.
        #[source]
        source: DescriptorError,
    },

    /// A descriptor or patch location could not be interpreted.
    #[error(transparent)]
    InvalidLocation(#[from] LocationError),

    /// The downloaded archive does not match the descriptor's digest.
    #[error("patch archive {archive} failed its integrity check: expected {expected}, found {actual}")]
    Integrity {
        /// The archive that was checked.
        archive: String,
        /// Digest recorded in the descriptor.
        expected: Sha256Digest,
        /// Digest of the archive on disk.
        actual: Sha256Digest,
    },

    /// A descriptor or archive download failed.
    #[error(transparent)]
    Network(#[from] DownloadError),

    /// The applier refused or failed to apply the patch.
    #[error(transparent)]
    Apply(#[from] ApplyError),

    /// Layered configuration could not be resolved.
    #[error(transparent)]
    Config(#[from] ConfigError),

    /// A filesystem operation outside the applier failed.
    #[error("{context}: {source}")]
    Io {
        /// What was being attempted.
        context: String,
        /// The underlying I/O error.
        #[source]
        source: std::io::Error,
    },

    /// No descriptor was given and none could be found.
    #[error("no update descriptor given and none found at {searched}")]
    NoDescriptor {
        /// The default location that was checked.
        searched: PathBuf,
    },

    /// No target directory was given and none could be derived.
    #[error("no target directory given and none could be derived from the running executable")]
    NoTargetDir,
}

/// Convenience type alias for results with [`UpdateError`].
pub type Result<T> = std::result::Result<T, UpdateError>;

impl UpdateError {
    /// Returns a recovery hint for the error, if applicable.
    #[must_use]
    pub fn recovery_hint(&self) -> Option<&'static str> {
        match self {
            Self::Descriptor { .. } => Some("check that the descriptor is valid JSON with `to_version` and `patch`"),
            Self::InvalidLocation(_) => Some("use a local path or an http(s) URL"),
            Self::Integrity { .. } => {
                Some("the archive was corrupted or tampered with in transit; download it again")
            }
            Self::Network(_) => Some("check network connectivity and that the update server is reachable"),
            Self::Apply(err) => Some(err.hint()),
            Self::Config(_) => Some("fix or remove treepatch.toml and the TREEPATCH_* environment variables"),
            Self::Io { .. } => None,
            Self::NoDescriptor { .. } => Some("pass the descriptor path or URL, or set TREEPATCH_DESCRIPTOR"),
            Self::NoTargetDir => Some("pass --target-dir or set TREEPATCH_TARGET_DIR"),
        }
    }

    /// The process exit code for this error.
    #[must_use]
    pub fn exit_code(&self) -> i32 {
        match self {
            Self::Apply(err) => apply_exit_code(err),
            Self::Integrity { .. } | Self::Network(_) => EXIT_TRANSFER,
            _ => EXIT_FAILURE,
        }
    }
}

/// The process exit code for an applier failure.
#[must_use]
pub fn apply_exit_code(err: &ApplyError) -> i32 {
    match err {
        ApplyError::VerificationFailed { .. } | ApplyError::PathTraversal { .. } => EXIT_REFUSED,
        ApplyError::VerifyAfterWriteFailed { .. } => EXIT_PARTIAL,
        _ => EXIT_FAILURE,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::patch::hasher::hash_bytes;
    use rstest::rstest;

    fn integrity() -> UpdateError {
        UpdateError::Integrity {
            archive: "update.zip".to_owned(),
            expected: hash_bytes(b"expected"),
            actual: hash_bytes(b"actual"),
        }
    }

    #[rstest]
    #[case::integrity(integrity(), EXIT_TRANSFER)]
    #[case::network(
        UpdateError::Network(DownloadError::NotFound { url: "https://example.com/u.json".to_owned() }),
        EXIT_TRANSFER
    )]
    #[case::traversal(
        UpdateError::Apply(ApplyError::PathTraversal { paths: vec!["../x".to_owned()] }),
        EXIT_REFUSED
    )]
    #[case::verification(
        UpdateError::Apply(ApplyError::VerificationFailed { problems: Vec::new() }),
        EXIT_REFUSED
    )]
    #[case::partial(
        UpdateError::Apply(ApplyError::VerifyAfterWriteFailed {
            path: "app.exe".to_owned(),
            expected: hash_bytes(b"a"),
            actual: hash_bytes(b"b"),
            replaced: 1,
            backup_dir: PathBuf::from("backup"),
        }),
        EXIT_PARTIAL
    )]
    #[case::no_target(UpdateError::NoTargetDir, EXIT_FAILURE)]
    fn exit_codes_distinguish_failure_classes(#[case] err: UpdateError, #[case] expected: i32) {
        assert_eq!(err.exit_code(), expected);
    }

    #[test]
    fn integrity_message_names_both_digests() {
        let message = integrity().to_string();
        assert!(message.contains(hash_bytes(b"expected").as_str()));
        assert!(message.contains(hash_bytes(b"actual").as_str()));
    }

    #[test]
    fn apply_errors_delegate_their_hint() {
        let err = UpdateError::Apply(ApplyError::PathTraversal { paths: Vec::new() });
        assert_eq!(
            err.recovery_hint(),
            Some(ApplyError::PathTraversal { paths: Vec::new() }.hint())
        );
    }

    #[test]
    fn every_user_facing_variant_has_a_hint() {
        assert!(integrity().recovery_hint().is_some());
        assert!(UpdateError::NoTargetDir.recovery_hint().is_some());
    }
}
