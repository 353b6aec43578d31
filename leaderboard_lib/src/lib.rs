//! Library layer for the course leaderboard: throttled Codeforces access,
//! roster resolution, contest catalog, scoring, and the snapshot writer.
//!
//! Wraps the `codeforces_api` crate with a shared rate limiter and a retry
//! state machine, then turns group and official contest activity into
//! per-participant credit records.

pub mod catalog;
pub mod client;
pub mod config;
pub mod error;
pub mod exceptions;
pub mod pipeline;
pub mod rate_limiter;
pub mod roster;
pub mod scoring;
pub mod scrape;
pub mod snapshot;
pub mod window;

pub use codeforces_api;
pub use codeforces_api::types;
pub use codeforces_api::Credentials;

pub use catalog::{Catalog, CatalogContest, CatalogProblem, ContestKind};
pub use client::CodeforcesClient;
pub use config::{load_credentials, LeaderboardConfig};
pub use error::LeaderboardError;
pub use exceptions::{Exception, ExceptionBook, ExceptionKey};
pub use pipeline::{run, ManualInputs, RunOutcome};
pub use rate_limiter::{
    Endpoint, EndpointCounts, RateLimiter, RequestTracker, RetryPolicy, TrackerSummary,
};
pub use scoring::{classify_solve, ParticipantRecord, SolveType};
pub use scrape::ScrapeError;
pub use snapshot::{write_snapshot, Snapshot};
pub use window::TimeWindow;
