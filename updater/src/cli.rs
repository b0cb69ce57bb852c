//! CLI argument definitions for the updater.
//!
//! Only arguments given explicitly land in [`Overrides`]; everything else
//! falls through to the environment, `treepatch.toml`, and the built-in
//! fallbacks resolved by [`crate::config::Settings`].

use crate::config::Overrides;
use camino::Utf8PathBuf;
use clap::Parser;

/// Update an installed application by applying a published patch.
#[derive(Parser, Debug, Default)]
#[command(name = "treepatch-updater")]
#[command(version, about)]
#[command(after_help = concat!(
    "ENVIRONMENT:\n",
    "  TREEPATCH_DESCRIPTOR              Descriptor path or URL\n",
    "  TREEPATCH_TARGET_DIR              Installation directory\n",
    "  TREEPATCH_EXECUTABLE              Executable to relaunch\n",
    "  TREEPATCH_DOWNLOAD_TIMEOUT_SECS   Per-request download timeout\n\n",
    "EXIT STATUS:\n",
    "  0  updated\n",
    "  1  generic or I/O failure\n",
    "  2  patch refused: installation not at the expected version, or unsafe paths\n",
    "  3  download or integrity failure\n",
    "  4  partially updated; restore from the backup directory\n\n",
    "EXAMPLES:\n",
    "  Update from a published descriptor:\n",
    "    $ treepatch-updater https://updates.example.com/app/update.json\n\n",
    "  Update a specific installation without relaunching:\n",
    "    $ treepatch-updater update.json --target-dir /opt/app --no-launch",
))]
pub struct Cli {
    /// Update descriptor path or URL [default: update.json beside the updater].
    #[arg(value_name = "DESCRIPTOR")]
    pub descriptor: Option<String>,

    /// Installation directory to update [default: the updater's directory].
    #[arg(short, long, value_name = "DIR")]
    pub target_dir: Option<Utf8PathBuf>,

    /// Executable to relaunch, relative to the target directory.
    #[arg(long, value_name = "PATH")]
    pub executable: Option<Utf8PathBuf>,

    /// Directory for the backup snapshot [default: a timestamped sibling of the target].
    #[arg(long, value_name = "DIR")]
    pub backup_dir: Option<Utf8PathBuf>,

    /// Per-request download timeout in seconds [default: 30].
    #[arg(long, value_name = "SECS")]
    pub timeout: Option<u64>,

    /// Apply even if installed files differ from the expected version.
    /// Archive integrity and path safety are always enforced.
    #[arg(long)]
    pub force: bool,

    /// Do not relaunch the application after updating.
    #[arg(long)]
    pub no_launch: bool,

    /// Increase log verbosity (repeatable: -v, -vv).
    #[arg(
        short,
        long = "verbose",
        action = clap::ArgAction::Count,
        conflicts_with = "quiet"
    )]
    pub verbosity: u8,

    /// Suppress progress output (errors still shown).
    #[arg(short, long, conflicts_with = "verbosity")]
    pub quiet: bool,
}

impl Cli {
    /// The settings given explicitly on the command line.
    #[must_use]
    pub fn overrides(&self) -> Overrides {
        Overrides {
            descriptor: self.descriptor.clone(),
            target_dir: self.target_dir.clone(),
            executable: self.executable.clone(),
            download_timeout_secs: self.timeout,
        }
    }
}

/// Map a `-v` count to a default log filter.
#[must_use]
pub fn log_level(verbosity: u8, quiet: bool) -> log::LevelFilter {
    if quiet {
        return log::LevelFilter::Error;
    }
    match verbosity {
        0 => log::LevelFilter::Warn,
        1 => log::LevelFilter::Info,
        2 => log::LevelFilter::Debug,
        _ => log::LevelFilter::Trace,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[test]
    fn cli_parses_defaults() {
        let cli = Cli::parse_from(["treepatch-updater"]);
        assert!(cli.descriptor.is_none());
        assert!(cli.target_dir.is_none());
        assert!(!cli.force);
        assert!(!cli.no_launch);
        assert_eq!(cli.verbosity, 0);
        assert_eq!(cli.overrides(), Overrides::default());
    }

    #[test]
    fn cli_parses_descriptor_and_target() {
        let cli = Cli::parse_from([
            "treepatch-updater",
            "https://updates.example.com/update.json",
            "--target-dir",
            "/opt/app",
            "--timeout",
            "90",
            "--no-launch",
        ]);
        let overrides = cli.overrides();
        assert_eq!(
            overrides.descriptor.as_deref(),
            Some("https://updates.example.com/update.json")
        );
        assert_eq!(overrides.target_dir, Some(Utf8PathBuf::from("/opt/app")));
        assert_eq!(overrides.download_timeout_secs, Some(90));
        assert!(cli.no_launch);
    }

    #[test]
    fn quiet_conflicts_with_verbose() {
        let result = Cli::try_parse_from(["treepatch-updater", "-q", "-v"]);
        assert!(result.is_err());
    }

    #[rstest]
    #[case::default(0, false, log::LevelFilter::Warn)]
    #[case::verbose(1, false, log::LevelFilter::Info)]
    #[case::very_verbose(2, false, log::LevelFilter::Debug)]
    #[case::trace(5, false, log::LevelFilter::Trace)]
    #[case::quiet(0, true, log::LevelFilter::Error)]
    fn log_level_follows_flags(
        #[case] verbosity: u8,
        #[case] quiet: bool,
        #[case] expected: log::LevelFilter,
    ) {
        assert_eq!(log_level(verbosity, quiet), expected);
    }
}
