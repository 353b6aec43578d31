//! Group membership: scrape the member listing, fall back to standings.

use std::cmp::Ordering;
use std::collections::HashSet;

use codeforces_api::{Auth, StandingsQuery};

use crate::client::CodeforcesClient;
use crate::error::LeaderboardError;
use crate::exceptions::{normalize_handle, ExceptionBook};
use crate::scrape::extract_handles;

pub const MAX_MEMBER_PAGES: usize = 50;
pub const STANDINGS_PAGE_SIZE: i64 = 500;
pub const MAX_STANDINGS_PAGES: usize = 200;

/// Resolves the participant roster.
///
/// The member listing is tried first. If page 1 cannot be fetched, or the
/// listing yields no handles, handles are derived from the standings of
/// every group contest instead (plus exception handles). Either way the
/// result is unioned with exception handles, stripped of excluded handles,
/// de-duplicated case-insensitively and sorted case-insensitively.
pub async fn resolve_roster(
    client: &CodeforcesClient,
    group_code: &str,
    group_contest_ids: &[i64],
    exceptions: &ExceptionBook,
    excluded: &HashSet<String>,
) -> Result<Vec<String>, LeaderboardError> {
    tracing::info!("Fetching group members for {}...", group_code);
    let scraped = match scrape_members(client, group_code).await {
        Ok(handles) if !handles.is_empty() => {
            tracing::info!("  loaded {} members from group members page", handles.len());
            Some(handles)
        }
        Ok(_) => {
            tracing::warn!(
                "  group members page listed no handles; falling back to contest standings"
            );
            None
        }
        Err(e) => {
            tracing::warn!(
                "  failed to scrape group members page; falling back to contest standings ({})",
                e
            );
            None
        }
    };

    let handles = match scraped {
        Some(handles) => handles,
        None => {
            let derived = standings_fallback(client, group_contest_ids, exceptions).await?;
            tracing::info!("  derived {} handles from group contest standings", derived.len());
            derived
        }
    };

    let roster = finalize_roster(handles, exceptions.handles(), excluded);
    tracing::info!("  members: {}", roster.len());
    Ok(roster)
}

/// Walks the paginated member listing.
///
/// Stops when a page adds no new handle or after [`MAX_MEMBER_PAGES`]. A
/// failure on page 1 is returned; a failure on a later page truncates.
pub async fn scrape_members(
    client: &CodeforcesClient,
    group_code: &str,
) -> Result<Vec<String>, LeaderboardError> {
    let mut seen = HashSet::new();
    let mut handles = Vec::new();

    for page in 1..=MAX_MEMBER_PAGES {
        let url = client.group_members_url(group_code, page);
        let html = match client.fetch_text(&url).await {
            Ok(html) => html,
            Err(e) if page == 1 => return Err(e),
            Err(e) => {
                tracing::warn!("  member page {} unavailable, stopping: {}", page, e);
                break;
            }
        };

        let before = handles.len();
        for handle in extract_handles(&html) {
            if seen.insert(handle.clone()) {
                handles.push(handle);
            }
        }
        if handles.len() == before {
            break;
        }
    }
    Ok(handles)
}

/// Exception handles, then every member of every standings row of each
/// group contest, paged in blocks of [`STANDINGS_PAGE_SIZE`].
pub async fn standings_fallback(
    client: &CodeforcesClient,
    group_contest_ids: &[i64],
    exceptions: &ExceptionBook,
) -> Result<Vec<String>, LeaderboardError> {
    let mut seen: HashSet<String> = HashSet::new();
    let mut handles: Vec<String> = Vec::new();
    let mut add = |handle: &str| {
        let handle = handle.trim();
        if !handle.is_empty() && seen.insert(handle.to_string()) {
            handles.push(handle.to_string());
        }
    };

    for handle in exceptions.handles() {
        add(handle);
    }

    for &contest_id in group_contest_ids {
        let mut from = 1;
        for _ in 0..MAX_STANDINGS_PAGES {
            let query = StandingsQuery::new(contest_id)
                .with_from(from)
                .with_count(STANDINGS_PAGE_SIZE)
                .with_unofficial(true);
            let standings = client.standings(&query, Auth::Required).await?;
            for row in &standings.rows {
                for member in &row.party.members {
                    add(&member.handle);
                }
            }
            if (standings.rows.len() as i64) < STANDINGS_PAGE_SIZE {
                break;
            }
            from += STANDINGS_PAGE_SIZE;
        }
    }
    Ok(handles)
}

/// Unions `exception_handles`, drops `excluded` (normalized), keeps the first
/// spelling of each case-insensitive handle, and sorts case-insensitively
/// with the raw handle as tiebreak.
pub fn finalize_roster(
    handles: Vec<String>,
    exception_handles: &[String],
    excluded: &HashSet<String>,
) -> Vec<String> {
    let mut seen = HashSet::new();
    let mut roster: Vec<String> = handles
        .into_iter()
        .chain(exception_handles.iter().cloned())
        .map(|h| h.trim().to_string())
        .filter(|h| !h.is_empty())
        .filter(|h| {
            let key = normalize_handle(h);
            !excluded.contains(&key) && seen.insert(key)
        })
        .collect();
    sort_handles(&mut roster);
    roster
}

/// Case-insensitive order, raw handle as tiebreak.
pub fn handle_order(a: &str, b: &str) -> Ordering {
    a.to_lowercase()
        .cmp(&b.to_lowercase())
        .then_with(|| a.cmp(b))
}

pub fn sort_handles(handles: &mut [String]) {
    handles.sort_by(|a, b| handle_order(a, b));
}
