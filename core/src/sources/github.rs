//! GitHub provider abstraction.
//!
//! Defines a trait for listing closed pull requests and a concrete
//! implementation backed by the `gh` CLI.

use serde::{Deserialize, Serialize};
use std::process::{Command, Stdio};

// ---------------------------------------------------------------------------
// Types
// ---------------------------------------------------------------------------

/// A pull request as returned by the REST `pulls` listing.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PullRequest {
    pub number: u64,
    #[serde(default)]
    pub title: Option<String>,
    #[serde(default)]
    pub body: Option<String>,
    pub html_url: String,
    #[serde(default)]
    pub updated_at: String,
}

impl PullRequest {
    pub fn title(&self) -> &str {
        self.title.as_deref().unwrap_or("")
    }

    pub fn body(&self) -> &str {
        self.body.as_deref().unwrap_or("")
    }
}

// ---------------------------------------------------------------------------
// Trait
// ---------------------------------------------------------------------------

/// Abstraction over GitHub operations so the `gh` CLI can be swapped for
/// direct API calls later.
pub trait GitHubProvider {
    type Error: std::error::Error;

    /// Returns `true` when the provider is installed and authenticated.
    fn is_available(&self) -> bool;

    /// One page (1-based) of closed pull requests against `base`, most
    /// recently updated first. An empty page means the listing is exhausted.
    fn list_closed_pull_requests(
        &self,
        base: &str,
        page: u32,
        per_page: u32,
    ) -> Result<Vec<PullRequest>, Self::Error>;
}

// ---------------------------------------------------------------------------
// GhCliProvider
// ---------------------------------------------------------------------------

/// [`GitHubProvider`] backed by `gh api`.
pub struct GhCliProvider {
    repo: String,
    token: Option<String>,
}

impl GhCliProvider {
    /// `repo` is `owner/name`. When `token` is set it is handed to `gh` as
    /// `GH_TOKEN`, overriding whatever login `gh` has stored.
    pub fn new(repo: impl Into<String>, token: Option<String>) -> Self {
        Self {
            repo: repo.into(),
            token,
        }
    }

    fn command(&self) -> Command {
        let mut cmd = Command::new("gh");
        if let Some(token) = &self.token {
            cmd.env("GH_TOKEN", token);
        }
        cmd
    }
}

impl GitHubProvider for GhCliProvider {
    type Error = GhError;

    fn is_available(&self) -> bool {
        self.command()
            .args(["auth", "status"])
            .stdout(Stdio::null())
            .stderr(Stdio::null())
            .status()
            .map(|s| s.success())
            .unwrap_or(false)
    }

    fn list_closed_pull_requests(
        &self,
        base: &str,
        page: u32,
        per_page: u32,
    ) -> Result<Vec<PullRequest>, GhError> {
        let output = self
            .command()
            .args(["api", "-X", "GET", &format!("repos/{}/pulls", self.repo)])
            .args(["-f", "state=closed"])
            .args(["-f", "sort=updated"])
            .args(["-f", "direction=desc"])
            .args(["-f", &format!("base={base}")])
            .args(["-F", &format!("per_page={per_page}")])
            .args(["-F", &format!("page={page}")])
            .output()
            .map_err(|e| GhError::Io(e.to_string()))?;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            return Err(GhError::Command(stderr.into_owned()));
        }

        let prs: Vec<PullRequest> =
            serde_json::from_slice(&output.stdout).map_err(|e| GhError::Parse(e.to_string()))?;
        Ok(prs)
    }
}

// ---------------------------------------------------------------------------
// Error type
// ---------------------------------------------------------------------------

#[derive(Debug)]
pub enum GhError {
    Io(String),
    Command(String),
    Parse(String),
}

impl std::fmt::Display for GhError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Io(msg) => write!(f, "gh I/O error: {msg}"),
            Self::Command(msg) => write!(f, "gh command error: {msg}"),
            Self::Parse(msg) => write!(f, "gh parse error: {msg}"),
        }
    }
}

impl std::error::Error for GhError {}
