//! Patch-based updates for installed file trees.
//!
//! A publisher diffs two builds of an application into a content-addressed
//! patch archive; an updater later verifies an installation against the
//! patch, backs up what it will touch, and applies it file by file with
//! atomic replacement. The crate backs three binaries:
//! `treepatch-package`, `treepatch-apply`, and `treepatch-updater`.
//!
//! # Modules
//!
//! - [`patch`] - Hashing, tree scanning, diffing, manifests, and packaging
//! - [`apply`] - Verified, backed-up application of a patch archive
//! - [`descriptor`] - The published update descriptor
//! - [`location`] - Local-path and URL locations with relative resolution
//! - [`download`] - HTTP retrieval behind the `PatchFetcher` trait
//! - [`launcher`] - Relaunching the application after an update
//! - [`orchestrator`] - The end-to-end update pipeline
//! - [`config`] - Layered settings for the updater binary
//! - [`cli`] - Command-line argument definitions for the updater
//! - [`error`] - Update errors with recovery hints and exit codes
//! - [`output`] - Progress and summary formatting
//! - [`timestamp`] - UTC timestamp formatting without a date library

pub mod apply;
pub mod cli;
pub mod config;
pub mod descriptor;
pub mod download;
pub mod error;
pub mod launcher;
pub mod location;
pub mod orchestrator;
pub mod output;
pub mod patch;
pub mod timestamp;

#[cfg(any(test, feature = "test-support"))]
pub mod test_utils;
