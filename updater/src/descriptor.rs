//! Update descriptor published alongside a patch archive.
//!
//! The descriptor names the version transition, where to fetch the patch
//! from, and optionally the SHA-256 of the whole archive:
//!
//! ```json
//! { "from_version": "1.0.1", "to_version": "1.0.2",
//!   "patch": "update_1.0.2.zip", "sha256": "…" }
//! ```

use crate::patch::sha256_digest::Sha256Digest;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Errors raised while reading or writing a descriptor.
#[derive(Debug, Error)]
pub enum DescriptorError {
    /// The document is not valid JSON or does not match the schema.
    #[error("malformed update descriptor: {0}")]
    Malformed(#[from] serde_json::Error),

    /// The document parsed but a required value is blank.
    #[error("invalid update descriptor: {reason}")]
    Invalid {
        /// Description of the problem.
        reason: String,
    },
}

/// Pointer to a published patch archive.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UpdateDescriptor {
    /// Version the patch upgrades from.
    #[serde(default)]
    pub from_version: String,
    /// Version the patch upgrades to.
    pub to_version: String,
    /// Absolute URL, or a path relative to the descriptor's location.
    pub patch: String,
    /// SHA-256 of the whole archive; when present it gates the apply.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sha256: Option<Sha256Digest>,
}

impl UpdateDescriptor {
    /// Parse a descriptor from JSON text.
    ///
    /// # Errors
    ///
    /// Returns [`DescriptorError::Malformed`] for invalid JSON, missing
    /// fields, or a malformed digest, and [`DescriptorError::Invalid`]
    /// when `patch` or `to_version` is blank.
    ///
    /// # Examples
    ///
    /// ```
    /// use treepatch_updater::descriptor::UpdateDescriptor;
    ///
    /// let descriptor = UpdateDescriptor::parse(
    ///     r#"{"from_version": "1.0.1", "to_version": "1.0.2", "patch": "update.zip"}"#,
    /// )
    /// .expect("valid descriptor");
    /// assert_eq!(descriptor.patch, "update.zip");
    /// assert!(descriptor.sha256.is_none());
    /// ```
    pub fn parse(text: &str) -> Result<Self, DescriptorError> {
        let descriptor: Self = serde_json::from_str(text)?;
        if descriptor.patch.trim().is_empty() {
            return Err(DescriptorError::Invalid {
                reason: "\"patch\" must not be empty".to_owned(),
            });
        }
        if descriptor.to_version.trim().is_empty() {
            return Err(DescriptorError::Invalid {
                reason: "\"to_version\" must not be empty".to_owned(),
            });
        }
        Ok(descriptor)
    }

    /// Serialise the descriptor as pretty-printed JSON.
    ///
    /// # Errors
    ///
    /// Returns [`DescriptorError::Malformed`] if serialisation fails.
    pub fn to_json(&self) -> Result<String, DescriptorError> {
        let mut json = serde_json::to_string_pretty(self)?;
        json.push('\n');
        Ok(json)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::patch::hasher::hash_bytes;
    use rstest::rstest;

    #[test]
    fn parses_full_descriptor() {
        let digest = hash_bytes(b"archive");
        let text = format!(
            r#"{{"from_version": "1.0.1", "to_version": "1.0.2",
                "patch": "https://host/patch.zip", "sha256": "{digest}", "channel": "stable"}}"#
        );
        let descriptor = UpdateDescriptor::parse(&text).expect("parse");
        assert_eq!(descriptor.from_version, "1.0.1");
        assert_eq!(descriptor.sha256, Some(digest));
    }

    #[rstest]
    #[case::missing_patch(r#"{"to_version": "1"}"#)]
    #[case::missing_to_version(r#"{"patch": "p.zip"}"#)]
    #[case::bad_digest(r#"{"to_version": "1", "patch": "p.zip", "sha256": "xyz"}"#)]
    #[case::not_json("patch=p.zip")]
    fn rejects_malformed_descriptors(#[case] text: &str) {
        let err = UpdateDescriptor::parse(text).expect_err("must fail");
        assert!(matches!(err, DescriptorError::Malformed(_)));
    }

    #[rstest]
    #[case::blank_patch(r#"{"to_version": "1", "patch": "  "}"#)]
    #[case::blank_to_version(r#"{"to_version": "", "patch": "p.zip"}"#)]
    fn rejects_blank_values(#[case] text: &str) {
        let err = UpdateDescriptor::parse(text).expect_err("must fail");
        assert!(matches!(err, DescriptorError::Invalid { .. }));
    }

    #[test]
    fn to_json_round_trips_and_omits_missing_digest() {
        let descriptor = UpdateDescriptor {
            from_version: "1.0.1".to_owned(),
            to_version: "1.0.2".to_owned(),
            patch: "update_1.0.2.zip".to_owned(),
            sha256: None,
        };
        let json = descriptor.to_json().expect("json");
        assert!(!json.contains("sha256"));
        assert_eq!(UpdateDescriptor::parse(&json).expect("parse"), descriptor);
    }
}
