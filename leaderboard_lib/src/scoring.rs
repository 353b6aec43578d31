//! Earliest-accepted retention, credit policy, and per-participant records.

use std::collections::HashMap;

use codeforces_api::types::Submission;
use serde::Serialize;

use crate::catalog::{Catalog, CatalogContest, ContestKind};
use crate::exceptions::{normalize_problem_id, ExceptionBook, ExceptionKey};
use crate::window::TimeWindow;

/// One week after contest end.
pub const UPSOLVE_GRACE_SECONDS: i64 = 168 * 60 * 60;
pub const LIVE_CREDITS: u32 = 2;
pub const UPSOLVE_CREDITS: u32 = 1;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum SolveType {
    Live,
    Upsolve,
}

impl SolveType {
    /// Case-insensitive `live` / `upsolve`.
    pub fn parse(s: &str) -> Option<Self> {
        match s.trim().to_lowercase().as_str() {
            "live" => Some(SolveType::Live),
            "upsolve" => Some(SolveType::Upsolve),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            SolveType::Live => "live",
            SolveType::Upsolve => "upsolve",
        }
    }
}

/// Solve type and credits for an accepted submission at `submitted_at`.
pub fn classify_solve(
    contest: &CatalogContest,
    problem_id: &str,
    submitted_at: i64,
) -> (SolveType, u32) {
    let solve_type = if submitted_at <= contest.end_time {
        SolveType::Live
    } else {
        SolveType::Upsolve
    };

    let credits = match (contest.kind, solve_type) {
        (ContestKind::Group, SolveType::Live) => LIVE_CREDITS,
        (ContestKind::Group, SolveType::Upsolve) => {
            if submitted_at <= contest.end_time + UPSOLVE_GRACE_SECONDS {
                UPSOLVE_CREDITS
            } else {
                0
            }
        }
        // Problem A of a Div. 2 round earns nothing.
        (ContestKind::Official, SolveType::Live) if contest.is_div2 && problem_id == "A" => 0,
        (ContestKind::Official, SolveType::Live) => LIVE_CREDITS,
        (ContestKind::Official, SolveType::Upsolve) => 0,
    };

    (solve_type, credits)
}

/// Earliest accepted timestamp per `(contest, problem)` for one participant.
#[derive(Debug, Default, Clone)]
pub struct EarliestAccepted {
    by_contest: HashMap<i64, HashMap<String, i64>>,
}

impl EarliestAccepted {
    pub fn new() -> Self {
        Self::default()
    }

    /// Keeps `submitted_at` only if it beats the current entry.
    pub fn record(&mut self, contest_id: i64, problem_id: &str, submitted_at: i64) {
        let slot = self
            .by_contest
            .entry(contest_id)
            .or_default()
            .entry(problem_id.to_string())
            .or_insert(submitted_at);
        if submitted_at < *slot {
            *slot = submitted_at;
        }
    }

    pub fn contains(&self, contest_id: i64, problem_id: &str) -> bool {
        self.by_contest
            .get(&contest_id)
            .is_some_and(|p| p.contains_key(problem_id))
    }

    pub fn get(&self, contest_id: i64, problem_id: &str) -> Option<i64> {
        self.by_contest.get(&contest_id)?.get(problem_id).copied()
    }

    pub fn is_empty(&self) -> bool {
        self.by_contest.values().all(HashMap::is_empty)
    }

    /// Submissions from `contest.status` for one group contest.
    pub fn record_group_submissions(
        &mut self,
        contest_id: i64,
        submissions: &[Submission],
        window: &TimeWindow,
    ) {
        for sub in submissions {
            if let Some(problem_id) = accepted_in_window(sub, window) {
                self.record(contest_id, &problem_id, sub.creation_time_seconds);
            }
        }
    }

    /// Submissions from `user.status`, kept only for official catalog contests.
    pub fn record_official_submissions(
        &mut self,
        submissions: &[Submission],
        catalog: &Catalog,
        window: &TimeWindow,
    ) {
        for sub in submissions {
            let Some(contest_id) = sub.contest_id else {
                continue;
            };
            let is_official = catalog
                .get(contest_id)
                .is_some_and(|c| c.kind == ContestKind::Official);
            if !is_official {
                continue;
            }
            if let Some(problem_id) = accepted_in_window(sub, window) {
                self.record(contest_id, &problem_id, sub.creation_time_seconds);
            }
        }
    }
}

fn accepted_in_window(sub: &Submission, window: &TimeWindow) -> Option<String> {
    if !sub.is_accepted() || !window.contains(sub.creation_time_seconds) {
        return None;
    }
    let problem_id = normalize_problem_id(&sub.problem.index);
    (!problem_id.is_empty()).then_some(problem_id)
}

/// One solved problem as written to the snapshot.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SolveView {
    pub problem_id: String,
    pub submitted_at: String,
    pub solve_type: SolveType,
    pub credits: u32,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub remark: Option<String>,
    #[serde(skip)]
    pub submitted_epoch: i64,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CompetitionRecord {
    pub competition_id: i64,
    pub total_credits: u32,
    pub problems: Vec<SolveView>,
}

#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize)]
pub struct ParticipantRecord {
    pub total_credits: u32,
    pub total_live_credits: u32,
    pub competitions: Vec<CompetitionRecord>,
}

/// Builds one participant's record from their earliest accepted solves.
///
/// Exceptions for this handle whose contest is in the catalog but have no
/// detected solve get a synthetic one at contest end (live) or end + 1s
/// (upsolve). Every matching exception then overrides solve type and credits
/// and is marked applied in `exceptions`.
pub fn score_participant(
    handle: &str,
    catalog: &Catalog,
    mut earliest: EarliestAccepted,
    exceptions: &mut ExceptionBook,
    window: &TimeWindow,
) -> ParticipantRecord {
    for exception in exceptions.for_handle(handle) {
        let Some(contest) = catalog.get(exception.competition_id) else {
            continue;
        };
        if earliest.contains(contest.id, &exception.problem_id) {
            continue;
        }
        let synthetic = match exception.solve_type {
            Some(SolveType::Upsolve) => contest.end_time + 1,
            _ => contest.end_time,
        };
        earliest.record(contest.id, &exception.problem_id, synthetic);
    }

    let mut contests: Vec<&CatalogContest> = earliest
        .by_contest
        .keys()
        .filter_map(|id| catalog.get(*id))
        .collect();
    contests.sort_by_key(|c| (c.start_time, c.id));

    let mut record = ParticipantRecord::default();
    for contest in contests {
        let Some(solved) = earliest.by_contest.get(&contest.id) else {
            continue;
        };
        let mut problems: Vec<SolveView> = solved
            .iter()
            .map(|(problem_id, &submitted_at)| {
                let (mut solve_type, mut credits) =
                    classify_solve(contest, problem_id, submitted_at);
                let mut remark = None;

                let key = ExceptionKey::new(handle, contest.id, problem_id);
                if let Some(exception) = exceptions.get(&key) {
                    if let Some(overridden) = exception.solve_type {
                        solve_type = overridden;
                    }
                    if let Some(overridden) = exception.credits {
                        credits = overridden;
                    }
                    remark = exception.remark.clone();
                    exceptions.mark_applied(&key);
                }

                SolveView {
                    problem_id: problem_id.clone(),
                    submitted_at: window.format_timestamp(submitted_at),
                    solve_type,
                    credits,
                    remark,
                    submitted_epoch: submitted_at,
                }
            })
            .collect();
        if problems.is_empty() {
            continue;
        }
        problems.sort_by(|a, b| {
            a.submitted_epoch
                .cmp(&b.submitted_epoch)
                .then_with(|| a.problem_id.cmp(&b.problem_id))
        });

        let total_credits: u32 = problems.iter().map(|p| p.credits).sum();
        record.total_credits += total_credits;
        record.total_live_credits += problems
            .iter()
            .filter(|p| p.solve_type == SolveType::Live)
            .map(|p| p.credits)
            .sum::<u32>();
        record.competitions.push(CompetitionRecord {
            competition_id: contest.id,
            total_credits,
            problems,
        });
    }
    record
}
