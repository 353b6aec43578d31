//! Compiled-in run constants, environment tuning, and credential resolution.

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::time::Duration;

use codeforces_api::Credentials;

use crate::error::LeaderboardError;
use crate::rate_limiter::{RetryPolicy, DEFAULT_MIN_INTERVAL};
use crate::window::TimeWindow;

pub const GROUP_CODE: &str = "AnBhEByjKm";
/// Local date in the fixed offset below.
pub const START_DATE: &str = "2026-01-12";
/// Local date, inclusive.
pub const END_DATE: &str = "2026-05-01";
/// UTC-07:00 year-round (no DST).
pub const UTC_OFFSET_SECONDS: i32 = -7 * 60 * 60;
pub const TIMEZONE_LABEL: &str = "MST";

pub const OUTPUT_PATH: &str = "src/data/cse494s26_leaderboard.yaml";
pub const EXCEPTIONS_PATH: &str = "src/data/cse494s26_exceptions.yaml";
pub const EXCLUDED_HANDLES_PATH: &str = "src/data/cse494s26_excluded_handles.yaml";
pub const EXCLUDED_HANDLES_ENV: &str = "LEADERBOARD_EXCLUDED_HANDLES";
pub const ENV_FILE: &str = ".env";
pub const RETRY_MAX_ENV: &str = "LEADERBOARD_RETRY_MAX";

pub const API_BASE_URL: &str = "https://codeforces.com/api";
pub const SITE_BASE_URL: &str = "https://codeforces.com";

const API_KEY_NAMES: &[&str] = &["CF_API_KEY", "API_KEY", "api_key", "ApiKey"];
const API_SECRET_NAMES: &[&str] = &["CF_API_SECRET", "API_SECRET", "api_secret", "ApiSecret"];

/// Everything a run needs besides credentials and the manual input files.
#[derive(Debug, Clone)]
pub struct LeaderboardConfig {
    pub group_code: String,
    pub window: TimeWindow,
    pub output_path: PathBuf,
    pub exceptions_path: PathBuf,
    pub excluded_handles_path: PathBuf,
    pub api_base_url: String,
    pub site_base_url: String,
    pub min_request_interval: Duration,
    pub retry: RetryPolicy,
}

impl LeaderboardConfig {
    /// The compiled-in configuration.
    pub fn from_constants() -> Result<Self, LeaderboardError> {
        Ok(Self {
            group_code: GROUP_CODE.to_string(),
            window: TimeWindow::parse(START_DATE, END_DATE, UTC_OFFSET_SECONDS, TIMEZONE_LABEL)?,
            output_path: PathBuf::from(OUTPUT_PATH),
            exceptions_path: PathBuf::from(EXCEPTIONS_PATH),
            excluded_handles_path: PathBuf::from(EXCLUDED_HANDLES_PATH),
            api_base_url: API_BASE_URL.to_string(),
            site_base_url: SITE_BASE_URL.to_string(),
            min_request_interval: DEFAULT_MIN_INTERVAL,
            retry: RetryPolicy::default(),
        })
    }

    /// Compiled-in configuration with pacing and retry knobs read from the
    /// environment (`LEADERBOARD_RETRY_MAX`, `LEADERBOARD_RETRY_BASE_MS`,
    /// `LEADERBOARD_MIN_INTERVAL_MS`). Unparseable values keep the defaults;
    /// a retry count that does not fit in `u32` is a configuration error.
    pub fn from_env() -> Result<Self, LeaderboardError> {
        let mut config = Self::from_constants()?;
        let defaults = RetryPolicy::default();
        config.retry = RetryPolicy::new(
            retry_attempts(env_u64(RETRY_MAX_ENV, u64::from(defaults.max_attempts)))?,
            Duration::from_millis(env_u64(
                "LEADERBOARD_RETRY_BASE_MS",
                defaults.base_backoff.as_millis() as u64,
            )),
        );
        config.min_request_interval = Duration::from_millis(env_u64(
            "LEADERBOARD_MIN_INTERVAL_MS",
            DEFAULT_MIN_INTERVAL.as_millis() as u64,
        ));
        Ok(config)
    }

    /// Text shown by `--help`: the activity window and the files touched.
    pub fn describe(&self) -> String {
        format!(
            "Activity window ({}): {} to {} (inclusive)\n\
             Reads API_KEY/API_SECRET from {} (or CF_API_KEY/CF_API_SECRET) and writes:\n  - {}\n\
             Applies manual overrides from:\n  - {}\n\
             Excludes handles listed in:\n  - {}\n  - ${}",
            self.window.label(),
            self.window.start_date(),
            self.window.end_date(),
            ENV_FILE,
            self.output_path.display(),
            self.exceptions_path.display(),
            self.excluded_handles_path.display(),
            EXCLUDED_HANDLES_ENV,
        )
    }
}

/// Resolves credentials from a dotenv file merged under the process
/// environment. Returns `None` unless both key and secret are non-empty.
pub fn load_credentials(env_file: &Path) -> Option<Credentials> {
    let mut vars = read_env_file(env_file);
    vars.extend(std::env::vars());
    resolve_credentials(&vars)
}

/// First non-empty match per accepted key name.
pub fn resolve_credentials(vars: &HashMap<String, String>) -> Option<Credentials> {
    let api_key = first_present(vars, API_KEY_NAMES)?;
    let api_secret = first_present(vars, API_SECRET_NAMES)?;
    Some(Credentials::new(api_key, api_secret))
}

fn first_present(vars: &HashMap<String, String>, names: &[&str]) -> Option<String> {
    names
        .iter()
        .filter_map(|name| vars.get(*name))
        .map(|v| v.trim())
        .find(|v| !v.is_empty())
        .map(str::to_string)
}

fn read_env_file(path: &Path) -> HashMap<String, String> {
    let mut vars = HashMap::new();
    let iter = match dotenvy::from_path_iter(path) {
        Ok(iter) => iter,
        Err(e) => {
            if !e.not_found() {
                tracing::warn!("Ignoring unreadable env file {}: {}", path.display(), e);
            }
            return vars;
        }
    };
    for item in iter {
        match item {
            Ok((key, value)) => {
                vars.insert(key, value);
            }
            Err(e) => tracing::warn!("Skipping malformed line in {}: {}", path.display(), e),
        }
    }
    vars
}

fn retry_attempts(value: u64) -> Result<u32, LeaderboardError> {
    u32::try_from(value).map_err(|_| {
        LeaderboardError::Config(format!(
            "{}={} is out of range (max {})",
            RETRY_MAX_ENV,
            value,
            u32::MAX
        ))
    })
}

fn env_u64(key: &str, default: u64) -> u64 {
    std::env::var(key)
        .ok()
        .and_then(|val| val.trim().parse::<u64>().ok())
        .unwrap_or(default)
}
