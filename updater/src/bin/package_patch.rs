//! Release-time packaging binary.
//!
//! Thin CLI wrapper around [`treepatch_updater::patch::differ`] and
//! [`treepatch_updater::patch::packaging`]: diffs an old and a new build
//! tree, writes the patch archive, and optionally emits the update
//! descriptor that points at it, with the archive digest filled in.

use clap::Parser;
use std::io::{self, Write};
use std::path::{Path, PathBuf};
use thiserror::Error;
use treepatch_updater::descriptor::{DescriptorError, UpdateDescriptor};
use treepatch_updater::output::{package_summary, write_error};
use treepatch_updater::patch::differ::{DiffError, diff};
use treepatch_updater::patch::manifest::{CreatedUtc, PatchMetadata, PatchSource};
use treepatch_updater::patch::packaging::{PackageOutput, package};
use treepatch_updater::patch::packaging_error::PackagingError;
use treepatch_updater::timestamp;

/// Build a patch archive from two installed trees.
///
/// Omit `--old` to produce a full-install patch that adds every file in
/// `--new`.
#[derive(Parser, Debug)]
#[command(name = "treepatch-package")]
#[command(version, about = "Build a patch archive from two installed trees")]
struct PackageCli {
    /// The new build tree.
    #[arg(long, value_name = "DIR")]
    new: PathBuf,

    /// The previous build tree [default: none, producing a full install].
    #[arg(long, value_name = "DIR")]
    old: Option<PathBuf>,

    /// Version the patch upgrades from.
    #[arg(long, value_name = "VERSION", default_value = "")]
    from_version: String,

    /// Version the patch upgrades to.
    #[arg(long, value_name = "VERSION")]
    to_version: String,

    /// Path of the archive to write.
    #[arg(long, value_name = "ZIP")]
    output: PathBuf,

    /// Also write an update descriptor to this path.
    #[arg(long, value_name = "JSON")]
    descriptor: Option<PathBuf>,

    /// Patch reference recorded in the descriptor [default: the archive's file name].
    #[arg(long, value_name = "REF", requires = "descriptor")]
    patch_ref: Option<String>,

    /// ISO 8601 creation timestamp [default: current UTC time].
    #[arg(long, value_name = "TIMESTAMP")]
    created_utc: Option<String>,
}

/// Errors returned by the packaging CLI.
#[derive(Debug, Error)]
enum PackageCliError {
    /// A tree could not be scanned.
    #[error("{0}")]
    Diff(#[from] DiffError),

    /// The archive could not be built.
    #[error("{0}")]
    Packaging(#[from] PackagingError),

    /// The descriptor could not be serialised.
    #[error("{0}")]
    Descriptor(#[from] DescriptorError),

    /// A tree argument is not a directory.
    #[error("not a directory: {}", .0.display())]
    NotADirectory(PathBuf),

    /// `--to-version` is blank.
    #[error("--to-version must not be empty")]
    EmptyVersion,

    /// The `--created-utc` value is not `YYYY-MM-DDThh:mm:ssZ`.
    #[error("invalid --created-utc timestamp: {0}")]
    InvalidTimestamp(String),

    /// Failed to read the system clock.
    #[error("system time error: {0}")]
    SystemTime(#[from] std::time::SystemTimeError),

    /// The descriptor or the report could not be written.
    #[error("{context}: {source}")]
    Io {
        /// What was being written.
        context: String,
        /// The underlying I/O error.
        #[source]
        source: io::Error,
    },
}

fn main() {
    let cli = PackageCli::parse();
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("warn")).init();
    let mut stdout = io::stdout();
    if let Err(err) = run(&cli, &mut stdout) {
        write_error(&mut io::stderr(), err, None);
        std::process::exit(1);
    }
}

/// Validate inputs, build the archive, and report it on `stdout`.
fn run(cli: &PackageCli, stdout: &mut dyn Write) -> Result<(), PackageCliError> {
    if cli.to_version.trim().is_empty() {
        return Err(PackageCliError::EmptyVersion);
    }
    for dir in std::iter::once(&cli.new).chain(cli.old.as_ref()) {
        if !dir.is_dir() {
            return Err(PackageCliError::NotADirectory(dir.clone()));
        }
    }
    let created_utc = match cli.created_utc.as_deref() {
        Some(ts) if timestamp::is_iso8601(ts) => ts.to_owned(),
        Some(ts) => return Err(PackageCliError::InvalidTimestamp(ts.to_owned())),
        None => timestamp::now_iso8601()?,
    };

    let change_set = diff(cli.old.as_deref(), &cli.new)?;
    let source = match &cli.old {
        Some(old) => PatchSource::directories(display(old), display(&cli.new)),
        None => PatchSource::full(),
    };
    let metadata = PatchMetadata {
        from_version: cli.from_version.clone(),
        to_version: cli.to_version.clone(),
        created_utc: CreatedUtc::new(created_utc),
        source,
    };
    let output = package(change_set, metadata, &cli.new, &cli.output)?;
    report(stdout, &package_summary(&output))?;

    if let Some(path) = &cli.descriptor {
        let patch = cli
            .patch_ref
            .clone()
            .unwrap_or_else(|| archive_file_name(&output.archive_path));
        write_descriptor(path, cli, patch, &output)?;
        report(stdout, &format!("Wrote descriptor {}", path.display()))?;
    }
    Ok(())
}

fn write_descriptor(
    path: &Path,
    cli: &PackageCli,
    patch: String,
    output: &PackageOutput,
) -> Result<(), PackageCliError> {
    let descriptor = UpdateDescriptor {
        from_version: cli.from_version.clone(),
        to_version: cli.to_version.clone(),
        patch,
        sha256: Some(output.sha256.clone()),
    };
    let json = descriptor.to_json()?;
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        std::fs::create_dir_all(parent).map_err(|source| PackageCliError::Io {
            context: format!("failed to create {}", parent.display()),
            source,
        })?;
    }
    std::fs::write(path, json).map_err(|source| PackageCliError::Io {
        context: format!("failed to write descriptor {}", path.display()),
        source,
    })
}

fn report(stdout: &mut dyn Write, message: &str) -> Result<(), PackageCliError> {
    writeln!(stdout, "{message}").map_err(|source| PackageCliError::Io {
        context: "failed to write output".to_owned(),
        source,
    })
}

fn archive_file_name(path: &Path) -> String {
    path.file_name()
        .map_or_else(|| display(path), |name| name.to_string_lossy().into_owned())
}

fn display(path: &Path) -> String {
    path.display().to_string()
}
