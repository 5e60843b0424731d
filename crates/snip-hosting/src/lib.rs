mod client;
mod location;
mod status;
mod token;

use thiserror::Error;

pub use client::{CommitRef, GitHubClient, RateLimit, SourceHost, decode_content};
pub use location::BlobLocation;
pub use status::{FetchOutcome, FetchStatus};
pub use token::load_token;

#[derive(Debug, Error)]
pub enum HostingError {
    #[error("API token not found: set {env} or hosting.token_file")]
    MissingToken { env: String, file: Option<String> },
    #[error("http error: {0}")]
    Http(#[from] reqwest::Error),
    #[error("{url} returned HTTP {status}")]
    Status { status: u16, url: String },
}
