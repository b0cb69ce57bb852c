//! Layered settings for the updater binary.
//!
//! Each setting is taken from the first layer that provides it:
//!
//! 1. explicit command-line arguments;
//! 2. `TREEPATCH_*` environment variables;
//! 3. `treepatch.toml` next to the running executable;
//! 4. well-known fallbacks derived from the executable's location.
//!
//! Resolution is pure over its inputs; [`Settings::from_process`] wires in
//! the real environment and executable path.

use crate::download::DEFAULT_TIMEOUT;
use camino::{Utf8Path, Utf8PathBuf};
use serde::Deserialize;
use std::io;
use std::path::PathBuf;
use std::time::Duration;
use thiserror::Error;

/// Name of the optional settings file beside the executable.
pub const CONFIG_FILE_NAME: &str = "treepatch.toml";

/// Descriptor looked for beside the executable when none is configured.
pub const DEFAULT_DESCRIPTOR_NAME: &str = "update.json";

/// Application executable relaunched after an update, relative to the
/// target directory.
pub const DEFAULT_EXECUTABLE: &str = if cfg!(windows) { "app.exe" } else { "app" };

/// Environment variable naming the descriptor path or URL.
pub const ENV_DESCRIPTOR: &str = "TREEPATCH_DESCRIPTOR";
/// Environment variable naming the target directory.
pub const ENV_TARGET_DIR: &str = "TREEPATCH_TARGET_DIR";
/// Environment variable naming the executable to relaunch.
pub const ENV_EXECUTABLE: &str = "TREEPATCH_EXECUTABLE";
/// Environment variable holding the download timeout in seconds.
pub const ENV_DOWNLOAD_TIMEOUT: &str = "TREEPATCH_DOWNLOAD_TIMEOUT_SECS";

/// Errors raised while resolving settings.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// The settings file exists but could not be read.
    #[error("failed to read {path}: {source}")]
    Read {
        /// Path to the settings file.
        path: Utf8PathBuf,
        /// The underlying I/O error.
        #[source]
        source: io::Error,
    },

    /// The settings file is not valid.
    #[error("invalid {path}: {reason}")]
    Parse {
        /// Path to the settings file.
        path: Utf8PathBuf,
        /// Parser diagnostic.
        reason: String,
    },

    /// A timeout value is not a positive whole number of seconds.
    #[error("invalid download timeout \"{value}\" from {origin}: expected a positive number of seconds")]
    InvalidTimeout {
        /// The rejected value.
        value: String,
        /// Which layer supplied it.
        origin: &'static str,
    },

    /// The running executable lives at a non-UTF-8 path.
    #[error("executable path {} is not valid UTF-8", .path.display())]
    NonUtf8Path {
        /// The offending path.
        path: PathBuf,
    },
}

/// Contents of `treepatch.toml`. Every key is optional.
#[derive(Clone, Debug, Default, Deserialize, Eq, PartialEq)]
#[serde(default, deny_unknown_fields)]
pub struct FileSettings {
    /// Descriptor path or URL.
    pub descriptor: Option<String>,
    /// Installation directory to update.
    pub target_dir: Option<Utf8PathBuf>,
    /// Executable to relaunch, relative to the target directory.
    pub executable: Option<Utf8PathBuf>,
    /// Per-request download timeout in seconds.
    pub download_timeout_secs: Option<u64>,
}

impl FileSettings {
    /// Parse settings from TOML text.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Parse`] for malformed TOML or unknown keys.
    pub fn parse(text: &str, path: &Utf8Path) -> Result<Self, ConfigError> {
        toml::from_str(text).map_err(|err| ConfigError::Parse {
            path: path.to_owned(),
            reason: err.to_string(),
        })
    }

    /// Load `treepatch.toml` from `dir`; a missing file yields defaults.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Read`] or [`ConfigError::Parse`].
    pub fn load_from(dir: &Utf8Path) -> Result<Self, ConfigError> {
        let path = dir.join(CONFIG_FILE_NAME);
        match std::fs::read_to_string(&path) {
            Ok(text) => Self::parse(&text, &path),
            Err(err) if err.kind() == io::ErrorKind::NotFound => Ok(Self::default()),
            Err(source) => Err(ConfigError::Read { path, source }),
        }
    }
}

/// Values given explicitly on the command line.
#[derive(Clone, Debug, Default, Eq, PartialEq)]
pub struct Overrides {
    /// Descriptor path or URL.
    pub descriptor: Option<String>,
    /// Installation directory to update.
    pub target_dir: Option<Utf8PathBuf>,
    /// Executable to relaunch.
    pub executable: Option<Utf8PathBuf>,
    /// Download timeout in seconds.
    pub download_timeout_secs: Option<u64>,
}

/// Fully resolved updater settings.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Settings {
    /// Descriptor path or URL; `None` when no layer supplied one and the
    /// default `update.json` does not exist.
    pub descriptor: Option<String>,
    /// Installation directory; `None` when it cannot be derived.
    pub target_dir: Option<Utf8PathBuf>,
    /// Executable to relaunch, relative to the target directory unless
    /// absolute.
    pub executable: Utf8PathBuf,
    /// Per-request download timeout.
    pub download_timeout: Duration,
}

impl Settings {
    /// Resolve settings from the live process environment.
    ///
    /// # Errors
    ///
    /// Returns a [`ConfigError`] when any layer holds an invalid value.
    pub fn from_process(overrides: &Overrides) -> Result<Self, ConfigError> {
        let exe_dir = executable_dir()?;
        let file = match exe_dir.as_deref() {
            Some(dir) => FileSettings::load_from(dir)?,
            None => FileSettings::default(),
        };
        Self::resolve(
            overrides,
            |key| std::env::var(key).ok(),
            &file,
            exe_dir.as_deref(),
        )
    }

    /// Resolve settings from explicit layers.
    ///
    /// `env` looks up an environment variable; blank values count as unset.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::InvalidTimeout`] for a zero or non-numeric
    /// timeout.
    pub fn resolve<F>(
        overrides: &Overrides,
        env: F,
        file: &FileSettings,
        exe_dir: Option<&Utf8Path>,
    ) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let lookup = |key: &str| env(key).filter(|value| !value.trim().is_empty());

        let descriptor = overrides
            .descriptor
            .clone()
            .or_else(|| lookup(ENV_DESCRIPTOR))
            .or_else(|| file.descriptor.clone())
            .or_else(|| default_descriptor(exe_dir));

        let target_dir = overrides
            .target_dir
            .clone()
            .or_else(|| lookup(ENV_TARGET_DIR).map(Utf8PathBuf::from))
            .or_else(|| file.target_dir.clone())
            .or_else(|| exe_dir.map(Utf8Path::to_path_buf));

        let executable = overrides
            .executable
            .clone()
            .or_else(|| lookup(ENV_EXECUTABLE).map(Utf8PathBuf::from))
            .or_else(|| file.executable.clone())
            .unwrap_or_else(|| Utf8PathBuf::from(DEFAULT_EXECUTABLE));

        let download_timeout = resolve_timeout(overrides, lookup(ENV_DOWNLOAD_TIMEOUT), file)?;

        Ok(Self {
            descriptor,
            target_dir,
            executable,
            download_timeout,
        })
    }
}

fn resolve_timeout(
    overrides: &Overrides,
    env_value: Option<String>,
    file: &FileSettings,
) -> Result<Duration, ConfigError> {
    if let Some(secs) = overrides.download_timeout_secs {
        return positive_secs(secs, "the command line");
    }
    if let Some(value) = env_value {
        let secs = value.trim().parse::<u64>().map_err(|_| ConfigError::InvalidTimeout {
            value: value.clone(),
            origin: ENV_DOWNLOAD_TIMEOUT,
        })?;
        return positive_secs(secs, ENV_DOWNLOAD_TIMEOUT);
    }
    if let Some(secs) = file.download_timeout_secs {
        return positive_secs(secs, CONFIG_FILE_NAME);
    }
    Ok(DEFAULT_TIMEOUT)
}

fn positive_secs(secs: u64, origin: &'static str) -> Result<Duration, ConfigError> {
    if secs == 0 {
        return Err(ConfigError::InvalidTimeout {
            value: secs.to_string(),
            origin,
        });
    }
    Ok(Duration::from_secs(secs))
}

fn default_descriptor(exe_dir: Option<&Utf8Path>) -> Option<String> {
    let candidate = exe_dir?.join(DEFAULT_DESCRIPTOR_NAME);
    candidate.is_file().then(|| candidate.into_string())
}

/// The directory holding the running executable, if it can be determined.
fn executable_dir() -> Result<Option<Utf8PathBuf>, ConfigError> {
    let Ok(exe) = std::env::current_exe() else {
        return Ok(None);
    };
    let exe = Utf8PathBuf::try_from(exe).map_err(|err| ConfigError::NonUtf8Path {
        path: err.into_path_buf(),
    })?;
    Ok(exe.parent().map(Utf8Path::to_path_buf))
}
