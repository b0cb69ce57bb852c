//! User-facing progress and summary output.
//!
//! Library code never prints directly; callers hand in the stream so
//! binaries write to stderr and tests capture into a `Vec<u8>`.

use crate::apply::ApplyResult;
use crate::launcher::LaunchOutcome;
use crate::patch::packaging::PackageOutput;
use std::fmt::Display;
use std::io::Write;

/// Write `message` and a newline to `stderr`, ignoring write failures.
pub fn write_stderr_line(stderr: &mut dyn Write, message: impl Display) {
    if writeln!(stderr, "{message}").is_err() {
        // Best-effort logging; ignore write failures.
    }
}

/// Write an error and, when available, its recovery hint.
pub fn write_error(stderr: &mut dyn Write, error: impl Display, hint: Option<&str>) {
    write_stderr_line(stderr, format!("error: {error}"));
    if let Some(hint) = hint {
        write_stderr_line(stderr, format!("hint: {hint}"));
    }
}

fn files(count: usize) -> &'static str {
    if count == 1 { "file" } else { "files" }
}

/// Summarise an apply run.
///
/// # Example
///
/// ```
/// use treepatch_updater::apply::ApplyResult;
/// use treepatch_updater::output::apply_summary;
///
/// let result = ApplyResult {
///     backup_dir: None,
///     updated_count: 2,
///     deleted_count: 1,
///     dry_run: true,
/// };
/// assert_eq!(apply_summary(&result), "Dry run: would update 2 files and delete 1 file.");
/// ```
#[must_use]
pub fn apply_summary(result: &ApplyResult) -> String {
    let (updated, deleted) = (result.updated_count, result.deleted_count);
    if result.dry_run {
        return format!(
            "Dry run: would update {updated} {} and delete {deleted} {}.",
            files(updated),
            files(deleted)
        );
    }
    let mut summary = format!(
        "Updated {updated} {} and deleted {deleted} {}.",
        files(updated),
        files(deleted)
    );
    if let Some(backup) = &result.backup_dir {
        summary.push_str(&format!(" Originals saved to {}", backup.display()));
    }
    summary
}

/// Summarise a packaging run.
#[must_use]
pub fn package_summary(output: &PackageOutput) -> String {
    let manifest = &output.manifest;
    let changed = manifest.files().len();
    let deleted = manifest.deletes().len();
    format!(
        "Wrote {}: {changed} changed {}, {deleted} deleted {}{}\nsha256 {}",
        output.archive_path.display(),
        files(changed),
        files(deleted),
        if manifest.is_full_install() { " (full install)" } else { "" },
        output.sha256
    )
}

/// Describe a relaunch outcome, or `None` when relaunch was skipped.
#[must_use]
pub fn launch_summary(outcome: &LaunchOutcome) -> Option<String> {
    match outcome {
        LaunchOutcome::Launched(path) => Some(format!("Relaunched {}", path.display())),
        LaunchOutcome::NotFound(path) => Some(format!(
            "Application executable {} not found; start it manually.",
            path.display()
        )),
        LaunchOutcome::Skipped => None,
    }
}
