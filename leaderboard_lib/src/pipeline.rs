//! One full leaderboard run, from contest discovery to the in-memory snapshot.

use std::collections::HashSet;

use crate::catalog::{Catalog, ContestKind};
use crate::client::CodeforcesClient;
use crate::config::{LeaderboardConfig, EXCLUDED_HANDLES_ENV};
use crate::error::LeaderboardError;
use crate::exceptions::{
    load_exceptions, load_excluded_handles, Exception, ExceptionBook, ExceptionKey,
};
use crate::roster::resolve_roster;
use crate::scoring::{score_participant, EarliestAccepted};
use crate::snapshot::Snapshot;

/// The manual input files for a run.
#[derive(Debug, Default)]
pub struct ManualInputs {
    pub exceptions: Vec<Exception>,
    /// Normalized handles.
    pub excluded: HashSet<String>,
}

impl ManualInputs {
    /// Reads the exceptions file and the exclusion file plus
    /// `LEADERBOARD_EXCLUDED_HANDLES`. Missing files are empty.
    pub fn load(config: &LeaderboardConfig) -> Result<Self, LeaderboardError> {
        let exceptions = load_exceptions(&config.exceptions_path)?;
        let env_value = std::env::var(EXCLUDED_HANDLES_ENV).ok();
        let excluded = load_excluded_handles(&config.excluded_handles_path, env_value.as_deref())?;
        Ok(Self {
            exceptions,
            excluded,
        })
    }
}

#[derive(Debug)]
pub struct RunOutcome {
    pub snapshot: Snapshot,
    /// Exceptions that matched no solve, sorted.
    pub unapplied: Vec<ExceptionKey>,
}

/// Runs the whole pipeline. `now` (epoch seconds) decides which contests
/// have started and stamps `last_updated`.
///
/// Any error aborts the run; nothing is written here.
pub async fn run(
    client: &CodeforcesClient,
    config: &LeaderboardConfig,
    inputs: ManualInputs,
    now: i64,
) -> Result<RunOutcome, LeaderboardError> {
    let window = &config.window;
    tracing::info!(
        "Activity window ({}): {} to {} (inclusive)",
        window.label(),
        window.start_date(),
        window.end_date()
    );

    tracing::info!("Fetching group contests...");
    let group_contests = client.group_contests(&config.group_code).await?;

    tracing::info!("Fetching official contests (Div. 1 / Div. 2)...");
    let official_contests = client.official_contests().await?;

    let mut catalog = Catalog::merge(
        &group_contests,
        &official_contests,
        window,
        now,
        client.site_base_url(),
        &config.group_code,
    );
    tracing::info!(
        "  contests included: {} (group: {}, official: {})",
        catalog.len(),
        catalog.count(ContestKind::Group),
        catalog.count(ContestKind::Official)
    );
    catalog.attach_problems(client).await?;

    let mut exceptions = ExceptionBook::new(inputs.exceptions);
    if !exceptions.is_empty() {
        tracing::info!("Loaded manual exceptions: {}", exceptions.len());
    }

    let all_group_ids: Vec<i64> = group_contests
        .iter()
        .map(|c| c.id)
        .filter(|&id| id != 0)
        .collect();
    let roster = resolve_roster(
        client,
        &config.group_code,
        &all_group_ids,
        &exceptions,
        &inputs.excluded,
    )
    .await?;

    let group_ids: Vec<i64> = catalog.of_kind(ContestKind::Group).map(|c| c.id).collect();
    let has_official = catalog.count(ContestKind::Official) > 0;

    let mut records = Vec::with_capacity(roster.len());
    for (idx, handle) in roster.iter().enumerate() {
        tracing::info!("[{}/{}] Fetching submissions for {}...", idx + 1, roster.len(), handle);
        let mut earliest = EarliestAccepted::new();

        for &contest_id in &group_ids {
            let submissions = client.contest_submissions(contest_id, handle).await?;
            earliest.record_group_submissions(contest_id, &submissions, window);
        }

        if has_official {
            let history = client
                .user_submissions_since(handle, window.start_epoch())
                .await?;
            earliest.record_official_submissions(&history, &catalog, window);
        }

        let record = score_participant(handle, &catalog, earliest, &mut exceptions, window);
        tracing::debug!(
            "  {}: {} credits ({} live)",
            handle,
            record.total_credits,
            record.total_live_credits
        );
        records.push((handle.clone(), record));
    }

    let unapplied = exceptions.unapplied();
    if !unapplied.is_empty() {
        tracing::warn!(
            "Some exceptions did not match any detected accepted submission in the window:"
        );
        for key in &unapplied {
            tracing::warn!("  - {}", key);
        }
    }

    Ok(RunOutcome {
        snapshot: Snapshot::build(&catalog, records, window, now),
        unapplied,
    })
}
