//! Error types for the library layer.

use std::path::PathBuf;

use thiserror::Error;

use crate::scrape::ScrapeError;

/// Errors produced by the library layer, wrapping upstream API and scraping
/// errors and adding retry exhaustion, configuration and file failures.
#[derive(Error, Debug)]
pub enum LeaderboardError {
    /// A terminal error from the JSON API (not retried).
    #[error("{label}: {source}")]
    Api {
        label: String,
        #[source]
        source: codeforces_api::Error,
    },
    /// A terminal error while fetching an HTML page (not retried).
    #[error("{label}: {source}")]
    Scrape {
        label: String,
        #[source]
        source: ScrapeError,
    },
    /// Every attempt hit a retryable failure.
    #[error("{label}: rate limit / transient failures, gave up after {attempts} attempts (last error: {last})")]
    RetriesExhausted {
        label: String,
        attempts: u32,
        last: String,
    },
    #[error("configuration error: {0}")]
    Config(String),
    #[error("I/O error on {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("YAML error: {0}")]
    Yaml(#[from] serde_yml::Error),
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

impl LeaderboardError {
    pub(crate) fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Io {
            path: path.into(),
            source,
        }
    }
}

/// Converts a terminal per-attempt error into a [`LeaderboardError`] tagged
/// with the operation label.
pub trait IntoLeaderboardError {
    fn into_leaderboard_error(self, label: &str) -> LeaderboardError;
}

impl IntoLeaderboardError for codeforces_api::Error {
    fn into_leaderboard_error(self, label: &str) -> LeaderboardError {
        LeaderboardError::Api {
            label: label.to_string(),
            source: self,
        }
    }
}

impl IntoLeaderboardError for ScrapeError {
    fn into_leaderboard_error(self, label: &str) -> LeaderboardError {
        LeaderboardError::Scrape {
            label: label.to_string(),
            source: self,
        }
    }
}
