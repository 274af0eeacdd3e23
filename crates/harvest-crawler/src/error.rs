use std::io;
use std::path::PathBuf;
use std::time::Duration;

use thiserror::Error;

/// Why a single request didn't produce a document.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum FetchCause {
    #[error("timed out after {0:?}")]
    Timeout(Duration),

    #[error("HTTP status {0}")]
    Status(u16),

    #[error("transport error: {0}")]
    Transport(String),

    #[error("couldn't read body: {0}")]
    Body(String),
}

impl FetchCause {
    /// Whether another attempt may succeed.
    pub fn is_transient(&self) -> bool {
        match self {
            Self::Timeout(_) | Self::Transport(_) => true,
            Self::Status(code) => *code == 429 || *code >= 500,
            Self::Body(_) => false,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{url}: {cause}")]
pub struct FetchFailure {
    pub url: String,
    pub cause: FetchCause,
}

#[derive(Debug, Error)]
pub enum SitemapError {
    #[error("couldn't fetch sitemap {url}: {cause}")]
    Fetch { url: String, cause: FetchCause },

    #[error("couldn't parse sitemap {url}: {message}")]
    Parse { url: String, message: String },
}

impl SitemapError {
    pub fn url(&self) -> &str {
        match self {
            Self::Fetch { url, .. } | Self::Parse { url, .. } => url,
        }
    }
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("invalid sitemap source: {0}")]
    Source(String),

    #[error("invalid crawler config: {0}")]
    Invalid(String),

    #[error("couldn't build HTTP client: {0}")]
    Client(#[from] reqwest::Error),
}

#[derive(Debug, Error)]
pub enum WriteError {
    #[error("couldn't write batch: {0}")]
    Io(#[from] io::Error),

    #[error("couldn't encode batch: {0}")]
    Encode(#[source] Box<dyn std::error::Error + Send + Sync>),

    #[error("couldn't move batch to {path}: {source}")]
    Persist { path: PathBuf, source: io::Error },
}

#[derive(Debug, Error)]
pub enum CrawlError {
    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error(transparent)]
    Sitemap(#[from] SitemapError),

    #[error(transparent)]
    Write(#[from] WriteError),
}
