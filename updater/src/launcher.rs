//! Relaunching the application after an update.

use log::{info, warn};
use std::io;
use std::path::{Path, PathBuf};
use std::process::{Command, Stdio};

/// What happened to the relaunch request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LaunchOutcome {
    /// The executable was started.
    Launched(PathBuf),
    /// The executable does not exist; the update itself still succeeded.
    NotFound(PathBuf),
    /// Relaunch was not requested.
    Skipped,
}

/// Trait for starting the updated application.
#[cfg_attr(test, mockall::automock)]
pub trait Launcher {
    /// Start `executable` with `working_dir` as its current directory,
    /// without waiting for it to exit.
    ///
    /// # Errors
    ///
    /// Returns an error if the process cannot be spawned.
    fn launch(&self, executable: &Path, working_dir: &Path) -> io::Result<()>;
}

/// Spawns the application as a detached child process.
#[derive(Debug, Default, Clone, Copy)]
pub struct ProcessLauncher;

impl Launcher for ProcessLauncher {
    fn launch(&self, executable: &Path, working_dir: &Path) -> io::Result<()> {
        Command::new(executable)
            .current_dir(working_dir)
            .stdin(Stdio::null())
            .stdout(Stdio::null())
            .stderr(Stdio::null())
            .spawn()?;
        Ok(())
    }
}

/// Relaunch `executable` (relative to `target_dir` unless absolute).
///
/// A missing executable is reported as [`LaunchOutcome::NotFound`] and
/// logged, not treated as a failure.
///
/// # Errors
///
/// Returns an error if the executable exists but cannot be started.
pub fn relaunch(
    launcher: &dyn Launcher,
    target_dir: &Path,
    executable: &Path,
) -> io::Result<LaunchOutcome> {
    let path = target_dir.join(executable);
    if !path.is_file() {
        warn!("application executable {} not found; not relaunching", path.display());
        return Ok(LaunchOutcome::NotFound(path));
    }
    launcher.launch(&path, target_dir)?;
    info!("relaunched {}", path.display());
    Ok(LaunchOutcome::Launched(path))
}

#[cfg(test)]
mod tests {
    use super::*;
    use mockall::predicate::eq;
    use tempfile::TempDir;

    #[test]
    fn missing_executable_is_not_fatal() {
        let temp = TempDir::new().expect("temp dir");
        let mut launcher = MockLauncher::new();
        launcher.expect_launch().never();

        let outcome = relaunch(&launcher, temp.path(), Path::new("app.exe")).expect("relaunch");

        assert_eq!(outcome, LaunchOutcome::NotFound(temp.path().join("app.exe")));
    }

    #[test]
    fn existing_executable_is_launched_from_target_dir() {
        let temp = TempDir::new().expect("temp dir");
        let exe = temp.path().join("app.exe");
        std::fs::write(&exe, b"binary").expect("write");
        let mut launcher = MockLauncher::new();
        launcher
            .expect_launch()
            .with(eq(exe.clone()), eq(temp.path().to_path_buf()))
            .times(1)
            .returning(|_, _| Ok(()));

        let outcome = relaunch(&launcher, temp.path(), Path::new("app.exe")).expect("relaunch");

        assert_eq!(outcome, LaunchOutcome::Launched(exe));
    }

    #[test]
    fn spawn_failure_is_propagated() {
        let temp = TempDir::new().expect("temp dir");
        std::fs::write(temp.path().join("app"), b"binary").expect("write");
        let mut launcher = MockLauncher::new();
        launcher
            .expect_launch()
            .returning(|_, _| Err(io::Error::from(io::ErrorKind::PermissionDenied)));

        let err = relaunch(&launcher, temp.path(), Path::new("app")).expect_err("must fail");

        assert_eq!(err.kind(), io::ErrorKind::PermissionDenied);
    }
}
