//! HTTP retrieval of descriptors and patch archives.
//!
//! Provides a trait-based abstraction over the network so the orchestrator
//! can be exercised without a server. Transport failures are fatal and are
//! never retried.

use std::fs::File;
use std::io;
use std::path::Path;
use std::time::Duration;
use url::Url;

/// Default network timeout for a single request, body included.
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(30);

/// Trait for fetching update resources over the network.
///
/// Abstractions allow tests to mock HTTP behaviour without network access.
#[cfg_attr(test, mockall::automock)]
pub trait PatchFetcher {
    /// Fetch a small text resource, such as an update descriptor.
    ///
    /// # Errors
    ///
    /// Returns an error if the request fails or the resource is not found.
    fn fetch_text(&self, url: &Url) -> Result<String, DownloadError>;

    /// Stream a resource into the file at `dest`, creating or truncating it.
    ///
    /// # Errors
    ///
    /// Returns an error if the request or the file write fails.
    fn fetch_to_file(&self, url: &Url, dest: &Path) -> Result<(), DownloadError>;
}

/// Errors arising from network retrieval.
#[derive(Debug, thiserror::Error)]
pub enum DownloadError {
    /// HTTP request failed.
    #[error("download failed for {url}: {reason}")]
    HttpError {
        /// The URL that was requested.
        url: String,
        /// A human-readable description of the failure.
        reason: String,
    },

    /// The requested resource was not found (HTTP 404).
    #[error("not found: {url}")]
    NotFound {
        /// The URL that returned 404.
        url: String,
    },

    /// I/O error writing the downloaded file.
    #[error("I/O error writing download: {0}")]
    Io(#[from] io::Error),
}

/// HTTP(S) fetcher using `ureq`.
///
/// # Examples
///
/// ```
/// use std::time::Duration;
/// use treepatch_updater::download::HttpFetcher;
///
/// let fetcher = HttpFetcher::new(Duration::from_secs(10));
/// assert_eq!(fetcher.timeout(), Duration::from_secs(10));
/// ```
pub struct HttpFetcher {
    agent: ureq::Agent,
    timeout: Duration,
}

impl HttpFetcher {
    /// Build a fetcher whose requests give up after `timeout`.
    #[must_use]
    pub fn new(timeout: Duration) -> Self {
        let config = ureq::Agent::config_builder()
            .timeout_global(Some(timeout))
            .build();
        Self {
            agent: ureq::Agent::new_with_config(config),
            timeout,
        }
    }

    /// Return the configured per-request timeout.
    #[must_use]
    pub fn timeout(&self) -> Duration {
        self.timeout
    }
}

impl Default for HttpFetcher {
    fn default() -> Self {
        Self::new(DEFAULT_TIMEOUT)
    }
}

impl PatchFetcher for HttpFetcher {
    fn fetch_text(&self, url: &Url) -> Result<String, DownloadError> {
        let response = self
            .agent
            .get(url.as_str())
            .call()
            .map_err(|e| map_ureq_error(url.as_str(), &e))?;
        response
            .into_body()
            .read_to_string()
            .map_err(|e| DownloadError::HttpError {
                url: url.to_string(),
                reason: e.to_string(),
            })
    }

    fn fetch_to_file(&self, url: &Url, dest: &Path) -> Result<(), DownloadError> {
        let response = self
            .agent
            .get(url.as_str())
            .call()
            .map_err(|e| map_ureq_error(url.as_str(), &e))?;
        let mut file = File::create(dest)?;
        io::copy(&mut response.into_body().as_reader(), &mut file)?;
        file.sync_all()?;
        Ok(())
    }
}

/// Map a ureq error to a [`DownloadError`].
fn map_ureq_error(url: &str, err: &ureq::Error) -> DownloadError {
    match err {
        ureq::Error::StatusCode(404) => DownloadError::NotFound {
            url: url.to_owned(),
        },
        other => DownloadError::HttpError {
            url: url.to_owned(),
            reason: other.to_string(),
        },
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[test]
    fn map_ureq_error_maps_404_to_not_found() {
        let err = ureq::Error::StatusCode(404);
        let mapped = map_ureq_error("https://example.test/update.json", &err);
        assert!(matches!(mapped, DownloadError::NotFound { .. }));
    }

    #[rstest]
    #[case::server_error(ureq::Error::StatusCode(500))]
    #[case::forbidden(ureq::Error::StatusCode(403))]
    #[case::connection_refused(ureq::Error::Io(io::Error::from(io::ErrorKind::ConnectionRefused)))]
    #[case::timed_out(ureq::Error::Io(io::Error::from(io::ErrorKind::TimedOut)))]
    fn map_ureq_error_maps_other_failures_to_http_error(#[case] err: ureq::Error) {
        let mapped = map_ureq_error("https://example.test/update.json", &err);
        let DownloadError::HttpError { url, reason } = mapped else {
            panic!("unexpected mapping {mapped:?}");
        };
        assert_eq!(url, "https://example.test/update.json");
        assert_eq!(reason, err.to_string());
    }

    #[test]
    fn default_fetcher_uses_thirty_second_timeout() {
        assert_eq!(HttpFetcher::default().timeout(), Duration::from_secs(30));
    }
}
