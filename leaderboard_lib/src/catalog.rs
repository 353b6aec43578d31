//! Contest catalog: in-window group and official contests with problem lists.

use std::collections::HashMap;
use std::sync::OnceLock;

use codeforces_api::types::Contest;
use codeforces_api::{Auth, StandingsQuery};
use regex::Regex;
use serde::Serialize;

use crate::client::CodeforcesClient;
use crate::error::LeaderboardError;
use crate::exceptions::normalize_problem_id;
use crate::window::TimeWindow;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ContestKind {
    Group,
    Official,
}

impl ContestKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            ContestKind::Group => "group",
            ContestKind::Official => "official",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CatalogProblem {
    pub id: String,
    pub title: String,
    pub link: String,
}

#[derive(Debug, Clone, PartialEq)]
pub struct CatalogContest {
    pub id: i64,
    pub kind: ContestKind,
    pub name: String,
    pub link: String,
    pub start_time: i64,
    pub end_time: i64,
    pub problems: Vec<CatalogProblem>,
    pub is_div2: bool,
}

/// Contests ordered by start time, indexed by id.
#[derive(Debug, Clone, Default)]
pub struct Catalog {
    contests: Vec<CatalogContest>,
    index: HashMap<i64, usize>,
}

fn rated_division_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"Div\.\s*[12]").expect("valid division regex"))
}

fn div2_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"Div\.\s*2").expect("valid div2 regex"))
}

/// "Div. 1", "Div. 2" and combined "Div. 1 + Div. 2" rounds.
pub fn is_rated_division(name: &str) -> bool {
    rated_division_re().is_match(name)
}

pub fn is_div2(name: &str) -> bool {
    div2_re().is_match(name)
}

pub fn group_contest_link(site: &str, group_code: &str, contest_id: i64) -> String {
    format!("{}/group/{}/contest/{}", site, group_code, contest_id)
}

pub fn contest_link(site: &str, contest_id: i64) -> String {
    format!("{}/contest/{}", site, contest_id)
}

pub fn problem_link(site: &str, contest_id: i64, problem_id: &str) -> String {
    format!("{}/contest/{}/problem/{}", site, contest_id, problem_id)
}

fn started_in_window(contest: &Contest, window: &TimeWindow, now: i64) -> bool {
    let start = contest.start();
    start <= now && window.contains(start)
}

impl Catalog {
    /// Filters and merges both sources without touching the network.
    ///
    /// Group contests are taken first, so an id seen in both sources stays a
    /// group contest. Official contests must carry a rated-division name.
    pub fn merge(
        group: &[Contest],
        official: &[Contest],
        window: &TimeWindow,
        now: i64,
        site: &str,
        group_code: &str,
    ) -> Self {
        let mut contests: Vec<CatalogContest> = Vec::new();
        let mut seen = std::collections::HashSet::new();

        for c in group {
            if !started_in_window(c, window, now) || !seen.insert(c.id) {
                continue;
            }
            contests.push(CatalogContest {
                id: c.id,
                kind: ContestKind::Group,
                name: c.name.trim().to_string(),
                link: group_contest_link(site, group_code, c.id),
                start_time: c.start(),
                end_time: c.end(),
                problems: Vec::new(),
                is_div2: false,
            });
        }

        for c in official {
            if !is_rated_division(&c.name)
                || !started_in_window(c, window, now)
                || !seen.insert(c.id)
            {
                continue;
            }
            contests.push(CatalogContest {
                id: c.id,
                kind: ContestKind::Official,
                name: c.name.trim().to_string(),
                link: contest_link(site, c.id),
                start_time: c.start(),
                end_time: c.end(),
                problems: Vec::new(),
                is_div2: is_div2(&c.name),
            });
        }

        // Stable: equal start times keep group-before-official order.
        contests.sort_by_key(|c| c.start_time);
        Self::from_contests(contests)
    }

    pub fn from_contests(contests: Vec<CatalogContest>) -> Self {
        let index = contests
            .iter()
            .enumerate()
            .map(|(i, c)| (c.id, i))
            .collect();
        Self { contests, index }
    }

    pub fn contests(&self) -> &[CatalogContest] {
        &self.contests
    }

    pub fn get(&self, contest_id: i64) -> Option<&CatalogContest> {
        self.index.get(&contest_id).map(|&i| &self.contests[i])
    }

    pub fn of_kind(&self, kind: ContestKind) -> impl Iterator<Item = &CatalogContest> {
        self.contests.iter().filter(move |c| c.kind == kind)
    }

    pub fn count(&self, kind: ContestKind) -> usize {
        self.of_kind(kind).count()
    }

    pub fn len(&self) -> usize {
        self.contests.len()
    }

    pub fn is_empty(&self) -> bool {
        self.contests.is_empty()
    }

    /// Fills in problem lists from a one-row standings query per contest.
    ///
    /// Group contests need a signed request and any failure aborts. Official
    /// contests fall back to an empty list (e.g. standings not yet open).
    pub async fn attach_problems(
        &mut self,
        client: &CodeforcesClient,
    ) -> Result<(), LeaderboardError> {
        for kind in [ContestKind::Group, ContestKind::Official] {
            tracing::info!("Fetching problem lists for {} contests...", kind.as_str());
            for contest in self.contests.iter_mut().filter(|c| c.kind == kind) {
                let auth = match kind {
                    ContestKind::Group => Auth::Required,
                    ContestKind::Official => Auth::Optional,
                };
                match fetch_problems(client, contest.id, auth).await {
                    Ok(problems) => contest.problems = problems,
                    Err(e) if kind == ContestKind::Official => {
                        tracing::warn!(
                            "No problem list for contest {} ({}); leaving it empty: {}",
                            contest.id,
                            contest.name,
                            e
                        );
                        contest.problems = Vec::new();
                    }
                    Err(e) => return Err(e),
                }
            }
        }
        Ok(())
    }
}

async fn fetch_problems(
    client: &CodeforcesClient,
    contest_id: i64,
    auth: Auth,
) -> Result<Vec<CatalogProblem>, LeaderboardError> {
    let query = StandingsQuery::new(contest_id)
        .with_from(1)
        .with_count(1)
        .with_unofficial(true);
    let standings = client.standings(&query, auth).await?;
    let site = client.site_base_url();
    Ok(standings
        .problems
        .iter()
        .filter_map(|p| {
            let id = normalize_problem_id(&p.index);
            if id.is_empty() {
                return None;
            }
            Some(CatalogProblem {
                link: problem_link(site, contest_id, &id),
                title: p.name.trim().to_string(),
                id,
            })
        })
        .collect())
}
