pub mod github;
pub mod patch;

pub use github::{GhCliProvider, GhError, GitHubProvider, PullRequest};
pub use patch::{FetchError, HttpPatchFetcher, PatchFetcher};
