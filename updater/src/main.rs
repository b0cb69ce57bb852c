//! Updater CLI entrypoint.
//!
//! Resolves settings from the command line, environment, and
//! `treepatch.toml`, then fetches the update descriptor, verifies and
//! applies the patch it names, and relaunches the application.

use clap::Parser;
use std::io::Write;
use std::path::Path;
use treepatch_updater::cli::{Cli, log_level};
use treepatch_updater::config::{DEFAULT_DESCRIPTOR_NAME, Settings};
use treepatch_updater::error::{EXIT_OK, Result, UpdateError};
use treepatch_updater::orchestrator::{RunOptions, UpdateOutcome, run};
use treepatch_updater::output::write_error;

fn main() {
    let cli = Cli::parse();
    env_logger::Builder::new()
        .filter_level(log_level(cli.verbosity, cli.quiet))
        .parse_default_env()
        .init();
    let mut stderr = std::io::stderr();
    let run_result = run_update(&cli, &mut stderr);
    let exit_code = exit_code_for_run_result(&run_result, &mut stderr);
    if exit_code != EXIT_OK {
        std::process::exit(exit_code);
    }
}

fn run_update(cli: &Cli, stderr: &mut dyn Write) -> Result<UpdateOutcome> {
    let settings = Settings::from_process(&cli.overrides())?;
    let descriptor = settings
        .descriptor
        .as_deref()
        .ok_or_else(|| UpdateError::NoDescriptor {
            searched: Path::new(DEFAULT_DESCRIPTOR_NAME).to_path_buf(),
        })?;
    let target_dir = settings.target_dir.as_ref().ok_or(UpdateError::NoTargetDir)?;

    let options = RunOptions {
        force: cli.force,
        launch: !cli.no_launch,
        executable: settings.executable.as_std_path(),
        backup_dir: cli.backup_dir.as_deref().map(camino::Utf8Path::as_std_path),
        download_timeout: settings.download_timeout,
        quiet: cli.quiet,
    };
    run(descriptor, target_dir.as_std_path(), &options, stderr)
}

fn exit_code_for_run_result(result: &Result<UpdateOutcome>, stderr: &mut dyn Write) -> i32 {
    match result {
        Ok(_) => EXIT_OK,
        Err(err) => {
            write_error(stderr, err, err.recovery_hint());
            err.exit_code()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use treepatch_updater::error::EXIT_FAILURE;

    #[test]
    fn exit_code_for_run_result_prints_error_and_hint() {
        let mut stderr = Vec::new();
        let exit_code = exit_code_for_run_result(&Err(UpdateError::NoTargetDir), &mut stderr);
        assert_eq!(exit_code, EXIT_FAILURE);

        let stderr_text = String::from_utf8(stderr).expect("stderr was not UTF-8");
        assert!(stderr_text.contains("no target directory"));
        assert!(stderr_text.contains("hint: pass --target-dir"));
    }
}
