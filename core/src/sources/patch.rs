//! Raw patch download by pull request number.

use std::time::Duration;
use thiserror::Error;

pub const DEFAULT_PATCH_BASE_URL: &str = "https://patch-diff.githubusercontent.com/raw";
pub const DEFAULT_FETCH_TIMEOUT: Duration = Duration::from_secs(15);

#[derive(Error, Debug)]
pub enum FetchError {
    #[error("unexpected HTTP status {0}")]
    Status(u16),
    #[error("{0}")]
    Http(#[from] reqwest::Error),
}

pub trait PatchFetcher {
    /// Fetch the unified patch text for one pull request. Not retried.
    fn fetch_patch(&self, number: u64) -> Result<String, FetchError>;
}

/// [`PatchFetcher`] over HTTPS with a fixed per-request timeout.
pub struct HttpPatchFetcher {
    client: reqwest::blocking::Client,
    base_url: String,
    repo: String,
}

impl HttpPatchFetcher {
    pub fn new(repo: impl Into<String>, timeout: Duration) -> Result<Self, FetchError> {
        let client = reqwest::blocking::Client::builder()
            .timeout(timeout)
            .user_agent(concat!("omp-impact/", env!("CARGO_PKG_VERSION")))
            .build()?;
        Ok(Self {
            client,
            base_url: DEFAULT_PATCH_BASE_URL.to_owned(),
            repo: repo.into(),
        })
    }

    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into();
        self
    }

    pub fn patch_url(&self, number: u64) -> String {
        format!(
            "{}/{}/pull/{number}.patch",
            self.base_url.trim_end_matches('/'),
            self.repo
        )
    }
}

impl PatchFetcher for HttpPatchFetcher {
    fn fetch_patch(&self, number: u64) -> Result<String, FetchError> {
        let url = self.patch_url(number);
        log::debug!("[patch] GET {url}");

        let response = self.client.get(&url).send()?;
        let status = response.status();
        if !status.is_success() {
            return Err(FetchError::Status(status.as_u16()));
        }
        Ok(response.text()?)
    }
}
