//! End-to-end update: descriptor, download, integrity gate, apply, relaunch.
//!
//! The pipeline is fetch descriptor → resolve archive → download → verify
//! archive digest → apply → relaunch. Every step aborts the run on failure
//! except a missing application executable, which is reported and
//! otherwise ignored. Network access and process spawning sit behind the
//! [`PatchFetcher`] and [`Launcher`] traits so [`run_with`] can be driven
//! entirely from tests.

use crate::apply::{ApplyOptions, ApplyResult, apply};
use crate::descriptor::UpdateDescriptor;
use crate::download::{HttpFetcher, PatchFetcher};
use crate::error::{Result, UpdateError};
use crate::launcher::{LaunchOutcome, Launcher, ProcessLauncher, relaunch};
use crate::location::Location;
use crate::output::{apply_summary, launch_summary, write_stderr_line};
use crate::patch::hasher::hash_file;
use log::info;
use std::fmt::Display;
use std::io::Write;
use std::path::{Path, PathBuf};
use std::time::Duration;
use tempfile::TempDir;
use url::Url;

/// File name used for a downloaded archive whose URL has no final segment.
const FALLBACK_ARCHIVE_NAME: &str = "patch.zip";

/// Options for an update run.
#[derive(Debug, Clone)]
pub struct RunOptions<'a> {
    /// Skip the applier's pre-flight hash checks. Never bypasses the
    /// archive integrity check or path safety.
    pub force: bool,
    /// Relaunch the application after a successful apply.
    pub launch: bool,
    /// Executable to relaunch, relative to the target directory unless
    /// absolute.
    pub executable: &'a Path,
    /// Where to keep originals; a timestamped sibling of the target when
    /// `None`.
    pub backup_dir: Option<&'a Path>,
    /// Per-request download timeout.
    pub download_timeout: Duration,
    /// When true, suppress progress output.
    pub quiet: bool,
}

/// The result of a successful update.
#[derive(Debug)]
pub struct UpdateOutcome {
    /// The descriptor that was followed.
    pub descriptor: UpdateDescriptor,
    /// What the applier did.
    pub apply: ApplyResult,
    /// What happened to the relaunch request.
    pub launch: LaunchOutcome,
}

/// Run an update with the production HTTP fetcher and process launcher.
///
/// # Errors
///
/// See [`run_with`].
pub fn run(
    descriptor_source: &str,
    target_dir: &Path,
    options: &RunOptions<'_>,
    stderr: &mut dyn Write,
) -> Result<UpdateOutcome> {
    let fetcher = HttpFetcher::new(options.download_timeout);
    run_with(
        descriptor_source,
        target_dir,
        options,
        &fetcher,
        &ProcessLauncher,
        stderr,
    )
}

/// Testable inner function with injected dependencies.
///
/// `descriptor_source` is a local path or an `http(s)`/`file` URL.
///
/// # Errors
///
/// - [`UpdateError::InvalidLocation`] for unusable descriptor or patch
///   locations;
/// - [`UpdateError::Network`] when a download fails;
/// - [`UpdateError::Descriptor`] when the descriptor does not parse;
/// - [`UpdateError::Integrity`] when the archive does not match the
///   descriptor's digest, checked before the archive is opened;
/// - [`UpdateError::Apply`] for any applier failure;
/// - [`UpdateError::Io`] for local read and relaunch failures.
pub fn run_with(
    descriptor_source: &str,
    target_dir: &Path,
    options: &RunOptions<'_>,
    fetcher: &dyn PatchFetcher,
    launcher: &dyn Launcher,
    stderr: &mut dyn Write,
) -> Result<UpdateOutcome> {
    // Step 1: Load the descriptor.
    let location = Location::parse(descriptor_source)?;
    progress(options.quiet, stderr, format!("Checking for updates at {location}..."));
    let descriptor = load_descriptor(&location, fetcher)?;
    info!(
        "descriptor {location}: {} -> {}, patch {}",
        display_version(&descriptor.from_version),
        descriptor.to_version,
        descriptor.patch
    );

    // Step 2: Resolve and fetch the archive.
    let archive_location = location.resolve(&descriptor.patch)?;
    if archive_location.is_remote() {
        progress(options.quiet, stderr, format!("Downloading {archive_location}..."));
    }
    let archive = fetch_archive(&archive_location, fetcher)?;

    // Step 3: Integrity gate.
    if let Some(expected) = &descriptor.sha256 {
        let actual = hash_file(archive.path()).map_err(|source| UpdateError::Io {
            context: format!("failed to hash patch archive {archive_location}"),
            source,
        })?;
        if &actual != expected {
            return Err(UpdateError::Integrity {
                archive: archive_location.to_string(),
                expected: expected.clone(),
                actual,
            });
        }
        info!("archive digest verified");
    }

    // Step 4: Apply.
    progress(
        options.quiet,
        stderr,
        format!(
            "Updating {} from {} to {}...",
            target_dir.display(),
            display_version(&descriptor.from_version),
            descriptor.to_version
        ),
    );
    let apply_options = ApplyOptions {
        backup_dir: options.backup_dir.map(Path::to_path_buf),
        dry_run: false,
        force: options.force,
    };
    let result = apply(archive.path(), target_dir, &apply_options)?;
    progress(options.quiet, stderr, apply_summary(&result));

    // Step 5: Relaunch.
    let launch = if options.launch {
        relaunch(launcher, target_dir, options.executable).map_err(|source| UpdateError::Io {
            context: format!("failed to relaunch {}", options.executable.display()),
            source,
        })?
    } else {
        LaunchOutcome::Skipped
    };
    if let Some(line) = launch_summary(&launch) {
        progress(options.quiet, stderr, line);
    }

    Ok(UpdateOutcome {
        descriptor,
        apply: result,
        launch,
    })
}

fn load_descriptor(location: &Location, fetcher: &dyn PatchFetcher) -> Result<UpdateDescriptor> {
    let text = match location {
        Location::Local(path) => {
            std::fs::read_to_string(path).map_err(|source| UpdateError::Io {
                context: format!("failed to read update descriptor {}", path.display()),
                source,
            })?
        }
        Location::Remote(url) => fetcher.fetch_text(url)?,
    };
    UpdateDescriptor::parse(&text).map_err(|source| UpdateError::Descriptor {
        source_location: location.to_string(),
        source,
    })
}

/// A patch archive ready to open; downloaded copies live until dropped.
enum FetchedArchive {
    Local(PathBuf),
    Downloaded { _dir: TempDir, path: PathBuf },
}

impl FetchedArchive {
    fn path(&self) -> &Path {
        match self {
            Self::Local(path) | Self::Downloaded { path, .. } => path,
        }
    }
}

fn fetch_archive(location: &Location, fetcher: &dyn PatchFetcher) -> Result<FetchedArchive> {
    let url = match location {
        Location::Local(path) => return Ok(FetchedArchive::Local(path.clone())),
        Location::Remote(url) => url,
    };
    let dir = tempfile::Builder::new()
        .prefix("treepatch-download-")
        .tempdir()
        .map_err(|source| UpdateError::Io {
            context: "failed to create download directory".to_owned(),
            source,
        })?;
    let path = dir.path().join(archive_file_name(url));
    fetcher.fetch_to_file(url, &path)?;
    info!("downloaded {url} to {}", path.display());
    Ok(FetchedArchive::Downloaded { _dir: dir, path })
}

/// The last path segment of `url`, or a fixed name when it has none.
fn archive_file_name(url: &Url) -> String {
    url.path_segments()
        .and_then(|mut segments| segments.next_back())
        .filter(|name| !name.is_empty() && *name != "." && *name != "..")
        .map_or_else(|| FALLBACK_ARCHIVE_NAME.to_owned(), str::to_owned)
}

fn progress(quiet: bool, stderr: &mut dyn Write, message: impl Display) {
    if !quiet {
        write_stderr_line(stderr, message);
    }
}

fn display_version(version: &str) -> &str {
    if version.is_empty() { "(none)" } else { version }
}

#[cfg(test)]
#[path = "orchestrator_tests.rs"]
mod tests;
