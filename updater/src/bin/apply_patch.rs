//! Standalone patch application binary.
//!
//! Thin CLI wrapper around [`treepatch_updater::apply`] for applying an
//! archive that is already on disk, without a descriptor or download step.
//! Exits `0` on success, `2` when the patch is refused before anything is
//! modified, `4` when the target was left partially updated, and `1`
//! otherwise.

use clap::Parser;
use std::io::{self, Write};
use std::path::PathBuf;
use treepatch_updater::apply::error::ApplyError;
use treepatch_updater::apply::{ApplyOptions, ApplyResult, apply};
use treepatch_updater::cli::log_level;
use treepatch_updater::error::{EXIT_OK, apply_exit_code};
use treepatch_updater::output::{apply_summary, write_error, write_stderr_line};

/// Apply a patch archive to an installation directory.
#[derive(Parser, Debug)]
#[command(name = "treepatch-apply")]
#[command(version, about = "Apply a patch archive to an installation directory")]
struct ApplyCli {
    /// The patch archive.
    #[arg(value_name = "ARCHIVE")]
    archive: PathBuf,

    /// The installation directory to update.
    #[arg(value_name = "TARGET")]
    target: PathBuf,

    /// Directory for the backup snapshot [default: a timestamped sibling of TARGET].
    #[arg(long, value_name = "DIR")]
    backup_dir: Option<PathBuf>,

    /// Verify and report without modifying anything.
    #[arg(long)]
    dry_run: bool,

    /// Apply even if installed files differ from the expected version.
    /// Path safety is always enforced.
    #[arg(long)]
    force: bool,

    /// Increase log verbosity (repeatable: -v, -vv).
    #[arg(short, long = "verbose", action = clap::ArgAction::Count)]
    verbosity: u8,
}

impl ApplyCli {
    fn options(&self) -> ApplyOptions {
        ApplyOptions {
            backup_dir: self.backup_dir.clone(),
            dry_run: self.dry_run,
            force: self.force,
        }
    }
}

fn main() {
    let cli = ApplyCli::parse();
    env_logger::Builder::new()
        .filter_level(log_level(cli.verbosity, false))
        .parse_default_env()
        .init();
    let result = apply(&cli.archive, &cli.target, &cli.options());
    let exit_code = exit_code_for_result(&result, &mut io::stderr());
    if exit_code != EXIT_OK {
        std::process::exit(exit_code);
    }
}

/// Report the outcome on `stderr` and choose the exit code.
fn exit_code_for_result(result: &Result<ApplyResult, ApplyError>, stderr: &mut dyn Write) -> i32 {
    match result {
        Ok(summary) => {
            write_stderr_line(stderr, apply_summary(summary));
            EXIT_OK
        }
        Err(err) => {
            write_error(stderr, err, Some(err.hint()));
            apply_exit_code(err)
        }
    }
}
