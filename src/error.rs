//! Error types for the acquisition pipeline.
//!
//! Every stage returns a [`PipelineError`] on failure. The orchestrator turns
//! these into per-item report entries, so no single article can abort a batch.
//! [`ConfigError`] is only raised at startup, before any article is touched.

use std::path::PathBuf;
use thiserror::Error;

/// A failure while processing a single article.
#[derive(Debug, Error)]
pub enum PipelineError {
    /// The URL could not be fetched: bad URL, timeout, connection failure,
    /// or a non-success HTTP status.
    #[error("network error fetching {url}: {message}")]
    Network { url: String, message: String },

    /// None of the body strategies located an article container.
    #[error("no article content found")]
    ContentNotFound,

    /// Creating the output directory or writing the document failed.
    #[error("filesystem error at {}: {source}", path.display())]
    Filesystem {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

impl PipelineError {
    pub fn network(url: &str, message: impl Into<String>) -> Self {
        PipelineError::Network {
            url: url.to_string(),
            message: message.into(),
        }
    }

    pub fn filesystem(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        PipelineError::Filesystem {
            path: path.into(),
            source,
        }
    }
}

/// A problem with the configuration, detected before the batch starts.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config file {}: {source}", path.display())]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("invalid config file {}: {source}", path.display())]
    Parse {
        path: PathBuf,
        #[source]
        source: serde_yaml::Error,
    },

    #[error("invalid pattern {pattern:?}: {source}")]
    Pattern {
        pattern: String,
        #[source]
        source: regex::Error,
    },

    #[error("invalid value for header {name}: {message}")]
    Header { name: &'static str, message: String },

    #[error("failed to build HTTP client: {0}")]
    Client(String),
}
