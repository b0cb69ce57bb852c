//! Manifest schema types for patch archives.
//!
//! Each patch archive carries a `manifest.json` describing the version
//! transition, where the patch came from, and every file it adds, modifies,
//! or deletes:
//!
//! ```json
//! {
//!   "type": "patch",
//!   "from_version": "1.0.1",
//!   "to_version": "1.0.2",
//!   "created_utc": "2026-02-03T00:00:00Z",
//!   "source": { "from_dir": "release/1.0.1", "to_dir": "release/1.0.2" },
//!   "files": [
//!     { "path": "app.exe", "old_sha256": "…", "new_sha256": "…", "size": 123 }
//!   ],
//!   "deletes": [ { "path": "old.dll", "old_sha256": "…" } ]
//! }
//! ```
//!
//! Entry paths are kept as written so that an unsafe path survives decoding
//! and can be reported precisely by the applier; use
//! [`PatchPath::parse`](super::patch_path::PatchPath::parse) before touching
//! the filesystem.

use super::differ::{Baseline, ChangeSet};
use super::sha256_digest::Sha256Digest;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Member name of the manifest inside a patch archive.
pub const MANIFEST_MEMBER: &str = "manifest.json";

/// The document type tag. Only patches exist today.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ManifestKind {
    /// A patch between two installed trees.
    #[default]
    Patch,
}

/// A file added or modified by a patch.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FileEntry {
    /// Relative POSIX path of the file, also its archive member name.
    pub path: String,
    /// Digest of the file before the patch; `None` if it did not exist.
    #[serde(rename = "old_sha256", default)]
    pub old_hash: Option<Sha256Digest>,
    /// Digest of the file after the patch.
    #[serde(rename = "new_sha256")]
    pub new_hash: Sha256Digest,
    /// Byte length of the new content. Informational only.
    #[serde(default)]
    pub size: u64,
}

/// A file removed by a patch.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DeleteEntry {
    /// Relative POSIX path of the file.
    pub path: String,
    /// Digest the file must have before it is removed.
    #[serde(rename = "old_sha256")]
    pub old_hash: Sha256Digest,
}

/// Marker value for `{"mode": "full"}` provenance.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SourceMode {
    /// No baseline tree existed when the patch was built.
    Full,
}

/// Free-form provenance of a patch.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum PatchSource {
    /// Built without a baseline: every file is an addition.
    Full {
        /// Always [`SourceMode::Full`].
        mode: SourceMode,
    },
    /// Built by diffing two directories.
    Directories {
        /// The baseline tree.
        from_dir: String,
        /// The target tree.
        to_dir: String,
    },
    /// Provenance written by other tooling, kept verbatim.
    Other(serde_json::Map<String, serde_json::Value>),
}

impl PatchSource {
    /// Provenance for a patch with no baseline.
    #[must_use]
    pub fn full() -> Self {
        Self::Full {
            mode: SourceMode::Full,
        }
    }

    /// Provenance for a patch diffed between two directories.
    #[must_use]
    pub fn directories(from_dir: impl Into<String>, to_dir: impl Into<String>) -> Self {
        Self::Directories {
            from_dir: from_dir.into(),
            to_dir: to_dir.into(),
        }
    }

    /// Return true for `{"mode": "full"}` provenance.
    #[must_use]
    pub fn is_full(&self) -> bool {
        matches!(self, Self::Full { .. })
    }
}

impl Default for PatchSource {
    fn default() -> Self {
        Self::Other(serde_json::Map::new())
    }
}

/// An ISO 8601 UTC timestamp recording when the patch was built.
///
/// Stored as an opaque string; [`crate::timestamp`] produces the canonical
/// `YYYY-MM-DDThh:mm:ssZ` form.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct CreatedUtc(String);

impl CreatedUtc {
    /// Wrap a timestamp string.
    #[must_use]
    pub fn new(value: impl Into<String>) -> Self {
        Self(value.into())
    }

    /// Return the timestamp as a string slice.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for CreatedUtc {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Version and provenance metadata supplied by the publisher.
///
/// Groups the caller-provided fields so [`Manifest::new`] takes the
/// metadata and the computed [`ChangeSet`] separately.
#[derive(Debug, Clone, PartialEq)]
pub struct PatchMetadata {
    /// Version the patch upgrades from; empty for a full install.
    pub from_version: String,
    /// Version the patch upgrades to.
    pub to_version: String,
    /// Build timestamp.
    pub created_utc: CreatedUtc,
    /// Provenance. Replaced by `{"mode": "full"}` for full-install change
    /// sets.
    pub source: PatchSource,
}

/// The manifest embedded in every patch archive.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Manifest {
    #[serde(rename = "type", default)]
    kind: ManifestKind,
    #[serde(default)]
    from_version: String,
    to_version: String,
    #[serde(default)]
    created_utc: CreatedUtc,
    #[serde(default)]
    source: PatchSource,
    #[serde(default)]
    files: Vec<FileEntry>,
    #[serde(default)]
    deletes: Vec<DeleteEntry>,
}

impl Manifest {
    /// Build a manifest from publisher metadata and a computed change set.
    ///
    /// # Examples
    ///
    /// ```
    /// use treepatch_updater::patch::differ::{Baseline, ChangeSet};
    /// use treepatch_updater::patch::manifest::{
    ///     CreatedUtc, Manifest, PatchMetadata, PatchSource,
    /// };
    ///
    /// let metadata = PatchMetadata {
    ///     from_version: String::new(),
    ///     to_version: "1.0.0".to_owned(),
    ///     created_utc: CreatedUtc::new("2026-02-03T00:00:00Z"),
    ///     source: PatchSource::directories("old", "new"),
    /// };
    /// let change_set = ChangeSet {
    ///     files: Vec::new(),
    ///     deletes: Vec::new(),
    ///     baseline: Baseline::Missing,
    /// };
    /// let manifest = Manifest::new(metadata, change_set);
    /// assert!(manifest.source().is_full());
    /// ```
    #[must_use]
    pub fn new(metadata: PatchMetadata, change_set: ChangeSet) -> Self {
        let source = match change_set.baseline {
            Baseline::Missing => PatchSource::full(),
            Baseline::Present => metadata.source,
        };
        Self {
            kind: ManifestKind::Patch,
            from_version: metadata.from_version,
            to_version: metadata.to_version,
            created_utc: metadata.created_utc,
            source,
            files: change_set.files,
            deletes: change_set.deletes,
        }
    }

    /// Return the document type.
    #[must_use]
    pub fn kind(&self) -> ManifestKind {
        self.kind
    }

    /// Return the version the patch upgrades from.
    #[must_use]
    pub fn from_version(&self) -> &str {
        &self.from_version
    }

    /// Return the version the patch upgrades to.
    #[must_use]
    pub fn to_version(&self) -> &str {
        &self.to_version
    }

    /// Return the build timestamp.
    #[must_use]
    pub fn created_utc(&self) -> &CreatedUtc {
        &self.created_utc
    }

    /// Return the patch provenance.
    #[must_use]
    pub fn source(&self) -> &PatchSource {
        &self.source
    }

    /// Return the added and modified files, in manifest order.
    #[must_use]
    pub fn files(&self) -> &[FileEntry] {
        &self.files
    }

    /// Return the deleted files, in manifest order.
    #[must_use]
    pub fn deletes(&self) -> &[DeleteEntry] {
        &self.deletes
    }

    /// Return true when every file entry lacks a prior hash and nothing is
    /// deleted, i.e. the patch can populate an empty directory.
    #[must_use]
    pub fn is_full_install(&self) -> bool {
        self.deletes.is_empty() && self.files.iter().all(|f| f.old_hash.is_none())
    }
}

#[cfg(test)]
#[path = "manifest_tests.rs"]
mod tests;
