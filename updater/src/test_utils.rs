//! Shared test utilities for the updater crate.

use crate::download::{DownloadError, PatchFetcher};
use crate::patch::differ::diff;
use crate::patch::hasher::hash_bytes;
use crate::patch::manifest::{CreatedUtc, PatchMetadata, PatchSource};
use crate::patch::packaging::{PackageOutput, package};
use crate::patch::packaging_error::PackagingError;
use std::cell::RefCell;
use std::collections::{BTreeMap, HashMap};
use std::fs;
use std::io;
use std::path::Path;
use url::Url;

/// A file tree keyed by `/`-separated relative path.
pub type Tree = BTreeMap<String, Vec<u8>>;

/// Creates `root` and writes each `(relative path, content)` pair under it.
///
/// # Errors
///
/// Returns any I/O error from creating directories or writing files.
pub fn write_tree(root: &Path, files: &[(&str, &str)]) -> io::Result<()> {
    fs::create_dir_all(root)?;
    for (relative, content) in files {
        let path = root.join(relative);
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }
        fs::write(path, content)?;
    }
    Ok(())
}

/// Reads every regular file under `root` into a [`Tree`].
///
/// # Errors
///
/// Returns any error from walking the tree or reading a file.
pub fn read_tree(root: &Path) -> io::Result<Tree> {
    let mut tree = Tree::new();
    for entry in walkdir::WalkDir::new(root) {
        let entry = entry.map_err(io::Error::other)?;
        if !entry.file_type().is_file() {
            continue;
        }
        let relative = entry
            .path()
            .strip_prefix(root)
            .map_err(io::Error::other)?
            .to_string_lossy()
            .replace('\\', "/");
        tree.insert(relative, fs::read(entry.path())?);
    }
    Ok(tree)
}

/// Computes the lowercase hex SHA-256 of `content`.
#[must_use]
pub fn sha256_hex(content: &[u8]) -> String {
    hash_bytes(content).into_inner()
}

/// Diffs `old` against `new` and packages the result at `out`.
///
/// # Errors
///
/// Returns a [`PackagingError`] if diffing or packaging fails.
pub fn build_patch(
    old: Option<&Path>,
    new: &Path,
    out: &Path,
    to_version: &str,
) -> Result<PackageOutput, PackagingError> {
    let change_set = diff(old, new).map_err(|err| PackagingError::Io(io::Error::other(err)))?;
    let metadata = PatchMetadata {
        from_version: if old.is_some() { "1.0.0" } else { "" }.to_owned(),
        to_version: to_version.to_owned(),
        created_utc: CreatedUtc::new("2026-02-03T00:00:00Z"),
        source: PatchSource::default(),
    };
    package(change_set, metadata, new, out)
}

/// A [`PatchFetcher`] that serves canned bodies keyed by URL.
///
/// Unknown URLs answer [`DownloadError::NotFound`]. Every request is
/// recorded so tests can assert on what was fetched.
#[derive(Debug, Default)]
pub struct StubFetcher {
    responses: HashMap<String, Vec<u8>>,
    requests: RefCell<Vec<String>>,
}

impl StubFetcher {
    /// Creates a fetcher with no responses.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Serves `body` for `url`.
    #[must_use]
    pub fn with_response(mut self, url: &str, body: impl Into<Vec<u8>>) -> Self {
        self.responses.insert(url.to_owned(), body.into());
        self
    }

    /// URLs requested so far, in order.
    #[must_use]
    pub fn requests(&self) -> Vec<String> {
        self.requests.borrow().clone()
    }

    fn respond(&self, url: &Url) -> Result<&[u8], DownloadError> {
        self.requests.borrow_mut().push(url.to_string());
        self.responses
            .get(url.as_str())
            .map(Vec::as_slice)
            .ok_or_else(|| DownloadError::NotFound {
                url: url.to_string(),
            })
    }
}

impl PatchFetcher for StubFetcher {
    fn fetch_text(&self, url: &Url) -> Result<String, DownloadError> {
        let body = self.respond(url)?;
        String::from_utf8(body.to_vec()).map_err(|err| DownloadError::HttpError {
            url: url.to_string(),
            reason: err.to_string(),
        })
    }

    fn fetch_to_file(&self, url: &Url, dest: &Path) -> Result<(), DownloadError> {
        let body = self.respond(url)?;
        fs::write(dest, body)?;
        Ok(())
    }
}
