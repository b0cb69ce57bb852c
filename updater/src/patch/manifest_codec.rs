//! JSON encoding and decoding of patch manifests.
//!
//! Decoding enforces the structural rules serde cannot express on its own:
//! a non-empty `to_version`, unique entry paths, and disjoint `files` and
//! `deletes` lists. Unknown fields are ignored so newer publishers can add
//! metadata without breaking older appliers.

use super::manifest::Manifest;
use std::collections::HashSet;
use thiserror::Error;

/// Errors raised while encoding or decoding a manifest.
#[derive(Debug, Error)]
pub enum FormatError {
    /// The document is not valid JSON or does not match the schema.
    #[error("malformed manifest: {0}")]
    Json(#[from] serde_json::Error),

    /// The document parsed but breaks a manifest invariant.
    #[error("invalid manifest: {reason}")]
    Invariant {
        /// Description of the broken invariant.
        reason: String,
    },
}

/// Result type alias using [`FormatError`].
pub type Result<T> = std::result::Result<T, FormatError>;

/// Serialise a manifest as pretty-printed JSON.
///
/// # Errors
///
/// Returns [`FormatError::Json`] if serialisation fails.
pub fn encode(manifest: &Manifest) -> Result<Vec<u8>> {
    let mut bytes = serde_json::to_vec_pretty(manifest)?;
    bytes.push(b'\n');
    Ok(bytes)
}

/// Parse and validate a manifest.
///
/// # Errors
///
/// Returns [`FormatError::Json`] when a required field is missing or has
/// the wrong type, when a digest is not 64 hex characters, or when `type`
/// is present and not `"patch"`. Returns [`FormatError::Invariant`] when
/// `to_version` is empty or entry paths repeat.
///
/// # Examples
///
/// ```
/// use treepatch_updater::patch::manifest_codec::decode;
///
/// let manifest = decode(br#"{"to_version": "1.0.0"}"#).expect("minimal manifest");
/// assert_eq!(manifest.to_version(), "1.0.0");
/// assert!(manifest.files().is_empty());
///
/// assert!(decode(br#"{"type": "bundle", "to_version": "1.0.0"}"#).is_err());
/// ```
pub fn decode(bytes: &[u8]) -> Result<Manifest> {
    let manifest: Manifest = serde_json::from_slice(bytes)?;
    validate(&manifest)?;
    Ok(manifest)
}

/// Check the invariants a published manifest must hold.
pub(crate) fn validate(manifest: &Manifest) -> Result<()> {
    if manifest.to_version().trim().is_empty() {
        return Err(invariant("to_version must not be empty"));
    }

    let mut file_paths = HashSet::new();
    for entry in manifest.files() {
        if !file_paths.insert(entry.path.as_str()) {
            return Err(invariant(format!(
                "duplicate file entry \"{}\"",
                entry.path
            )));
        }
    }

    let mut delete_paths = HashSet::new();
    for entry in manifest.deletes() {
        if !delete_paths.insert(entry.path.as_str()) {
            return Err(invariant(format!(
                "duplicate delete entry \"{}\"",
                entry.path
            )));
        }
        if file_paths.contains(entry.path.as_str()) {
            return Err(invariant(format!(
                "\"{}\" is listed in both files and deletes",
                entry.path
            )));
        }
    }
    Ok(())
}

fn invariant(reason: impl Into<String>) -> FormatError {
    FormatError::Invariant {
        reason: reason.into(),
    }
}
