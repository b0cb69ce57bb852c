//! SHA-256 digest newtype for content addressing.
//!
//! Digests are stored as 64-character lowercase hexadecimal strings.
//! Uppercase input is accepted and normalised, so two digests compare equal
//! regardless of the case they were written in.

use super::error::{PatchError, Result};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::fmt;

/// Expected length of a hex-encoded SHA-256 digest.
const DIGEST_HEX_LEN: usize = 64;

/// A validated, lowercase hex-encoded SHA-256 digest.
///
/// # Examples
///
/// ```
/// use treepatch_updater::patch::sha256_digest::Sha256Digest;
///
/// let upper = "AB".repeat(32);
/// let digest = Sha256Digest::try_from(upper.as_str()).expect("valid digest");
/// assert_eq!(digest.as_str(), "ab".repeat(32));
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct Sha256Digest(String);

impl Sha256Digest {
    /// Return the digest as a hex string slice.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Consume the wrapper and return the inner string.
    #[must_use]
    pub fn into_inner(self) -> String {
        self.0
    }

    /// Finalise a running hasher into a digest.
    pub(crate) fn from_hasher(hasher: Sha256) -> Self {
        Self(format!("{:x}", hasher.finalize()))
    }
}

impl TryFrom<&str> for Sha256Digest {
    type Error = PatchError;

    fn try_from(value: &str) -> Result<Self> {
        validate_sha256(value)?;
        Ok(Self(value.to_ascii_lowercase()))
    }
}

impl TryFrom<String> for Sha256Digest {
    type Error = PatchError;

    fn try_from(mut value: String) -> Result<Self> {
        validate_sha256(&value)?;
        value.make_ascii_lowercase();
        Ok(Self(value))
    }
}

impl From<Sha256Digest> for String {
    fn from(value: Sha256Digest) -> Self {
        value.0
    }
}

impl AsRef<str> for Sha256Digest {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for Sha256Digest {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Validate that `value` is a well-formed hex-encoded SHA-256 digest.
fn validate_sha256(value: &str) -> Result<()> {
    if value.len() != DIGEST_HEX_LEN {
        return Err(PatchError::InvalidSha256Digest {
            reason: format!(
                "expected {DIGEST_HEX_LEN} hex characters, got {}",
                value.len()
            ),
        });
    }
    if let Some(bad) = value.chars().find(|c| !c.is_ascii_hexdigit()) {
        return Err(PatchError::InvalidSha256Digest {
            reason: format!("non-hex character '{bad}'"),
        });
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[test]
    fn accepts_valid_sixty_four_char_hex() {
        let digest = Sha256Digest::try_from("a".repeat(64).as_str());
        assert!(digest.is_ok());
    }

    #[rstest]
    #[case::too_short(6)]
    #[case::too_long(65)]
    #[case::empty(0)]
    fn rejects_wrong_length(#[case] len: usize) {
        assert!(Sha256Digest::try_from("a".repeat(len)).is_err());
    }

    #[test]
    fn rejects_non_hex_characters() {
        let mut bad = "a".repeat(63);
        bad.push('g');
        let err = Sha256Digest::try_from(bad.as_str()).expect_err("non-hex must fail");
        assert!(err.to_string().contains("'g'"));
    }

    #[test]
    fn uppercase_is_normalised_to_lowercase() {
        let upper = Sha256Digest::try_from("F".repeat(64)).expect("valid");
        let lower = Sha256Digest::try_from("f".repeat(64)).expect("valid");
        assert_eq!(upper, lower);
        assert_eq!(upper.as_str(), "f".repeat(64));
    }

    #[test]
    fn serde_rejects_invalid_digest() {
        let result: std::result::Result<Sha256Digest, _> = serde_json::from_str("\"short\"");
        assert!(result.is_err());
    }

    #[test]
    fn serde_round_trips_as_plain_string() {
        let digest = Sha256Digest::try_from("0".repeat(64)).expect("valid");
        let json = serde_json::to_string(&digest).expect("serialize");
        assert_eq!(json, format!("\"{}\"", "0".repeat(64)));
        let back: Sha256Digest = serde_json::from_str(&json).expect("deserialize");
        assert_eq!(back, digest);
    }
}
