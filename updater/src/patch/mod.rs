//! Release-time patch model: hashing, tree scanning, diffing, manifests, and
//! packaging.
//!
//! Everything a publisher needs to turn an old and a new installed tree into
//! a distributable patch archive lives here. The apply side consumes the
//! same manifest types from [`crate::apply`].
//!
//! # Sub-modules
//!
//! - [`error`]: Validation errors for digests and relative paths.
//! - [`hasher`]: Streaming SHA-256 over files and readers.
//! - [`sha256_digest`]: Hex SHA-256 digest newtype (`Sha256Digest`).
//! - [`patch_path`]: Normalised, traversal-free relative path (`PatchPath`).
//! - [`scanner`]: Regular-file enumeration of a directory tree.
//! - [`differ`]: Snapshot comparison producing a `ChangeSet`.
//! - [`manifest`]: Manifest schema types.
//! - [`manifest_codec`]: Manifest JSON encoding and decoding.
//! - [`packaging`]: Patch archive creation.
//! - [`packaging_error`]: Error types for packaging.

pub mod differ;
pub mod error;
pub mod hasher;
pub mod manifest;
pub mod manifest_codec;
pub mod packaging;
pub mod packaging_error;
pub mod patch_path;
pub mod scanner;
pub mod sha256_digest;
