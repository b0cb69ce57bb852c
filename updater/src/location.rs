//! Descriptor and archive locations: local paths or HTTP(S) URLs.
//!
//! A location string containing `://` is treated as a URL; anything else is
//! a filesystem path. `file://` URLs are converted to local paths.

use std::fmt;
use std::path::{Path, PathBuf};
use thiserror::Error;
use url::Url;

/// Errors raised while interpreting a location string.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum LocationError {
    /// The string looks like a URL but does not parse as one.
    #[error("invalid URL \"{value}\": {reason}")]
    InvalidUrl {
        /// The rejected input.
        value: String,
        /// Parser diagnostic.
        reason: String,
    },

    /// The URL scheme is not supported.
    #[error("unsupported URL scheme \"{scheme}\" in {value} (expected http, https, or file)")]
    UnsupportedScheme {
        /// The rejected input.
        value: String,
        /// The offending scheme.
        scheme: String,
    },

    /// The location string is empty.
    #[error("location is empty")]
    Empty,
}

/// Where a descriptor or archive lives.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Location {
    /// A path on the local filesystem.
    Local(PathBuf),
    /// An `http` or `https` URL.
    Remote(Url),
}

impl Location {
    /// Interpret a user-supplied location string.
    ///
    /// # Errors
    ///
    /// Returns [`LocationError`] for empty input, unparsable URLs, and
    /// schemes other than `http`, `https`, and `file`.
    ///
    /// # Examples
    ///
    /// ```
    /// use treepatch_updater::location::Location;
    ///
    /// assert!(matches!(
    ///     Location::parse("https://example.com/update.json"),
    ///     Ok(Location::Remote(_))
    /// ));
    /// assert!(matches!(Location::parse("update.json"), Ok(Location::Local(_))));
    /// assert!(Location::parse("ftp://example.com/update.json").is_err());
    /// ```
    pub fn parse(value: &str) -> Result<Self, LocationError> {
        let value = value.trim();
        if value.is_empty() {
            return Err(LocationError::Empty);
        }
        if !value.contains("://") {
            return Ok(Self::Local(PathBuf::from(value)));
        }
        let url = Url::parse(value).map_err(|err| LocationError::InvalidUrl {
            value: value.to_owned(),
            reason: err.to_string(),
        })?;
        from_url(url, value)
    }

    /// Resolve `reference` (the descriptor's `patch` field) against this
    /// location.
    ///
    /// Absolute URLs are used as given. Relative references join onto a
    /// remote base with standard URL resolution, or onto the parent
    /// directory of a local base. Absolute local paths are used verbatim.
    ///
    /// # Errors
    ///
    /// Returns [`LocationError`] when `reference` is an invalid or
    /// unsupported URL, or cannot be joined onto a remote base.
    ///
    /// # Examples
    ///
    /// ```
    /// use treepatch_updater::location::Location;
    ///
    /// let base = Location::parse("https://host/releases/update.json").expect("url");
    /// let archive = base.resolve("update_1.0.2.zip").expect("join");
    /// assert_eq!(archive.to_string(), "https://host/releases/update_1.0.2.zip");
    /// ```
    pub fn resolve(&self, reference: &str) -> Result<Self, LocationError> {
        let reference = reference.trim();
        if reference.is_empty() {
            return Err(LocationError::Empty);
        }
        if reference.contains("://") {
            return Self::parse(reference);
        }
        match self {
            Self::Remote(base) => {
                let joined = base.join(reference).map_err(|err| LocationError::InvalidUrl {
                    value: reference.to_owned(),
                    reason: err.to_string(),
                })?;
                from_url(joined, reference)
            }
            Self::Local(base) => {
                let path = Path::new(reference);
                if path.is_absolute() {
                    return Ok(Self::Local(path.to_path_buf()));
                }
                let dir = base.parent().unwrap_or_else(|| Path::new(""));
                Ok(Self::Local(dir.join(path)))
            }
        }
    }

    /// Return true for HTTP(S) locations.
    #[must_use]
    pub fn is_remote(&self) -> bool {
        matches!(self, Self::Remote(_))
    }
}

impl fmt::Display for Location {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Local(path) => write!(f, "{}", path.display()),
            Self::Remote(url) => write!(f, "{url}"),
        }
    }
}

fn from_url(url: Url, original: &str) -> Result<Location, LocationError> {
    match url.scheme() {
        "http" | "https" => Ok(Location::Remote(url)),
        "file" => url
            .to_file_path()
            .map(Location::Local)
            .map_err(|()| LocationError::InvalidUrl {
                value: original.to_owned(),
                reason: "not a local file path".to_owned(),
            }),
        scheme => Err(LocationError::UnsupportedScheme {
            value: original.to_owned(),
            scheme: scheme.to_owned(),
        }),
    }
}
