//! Manual overrides (exceptions) and excluded handles.
//!
//! Both files are loosely-typed YAML. Records are validated here, at the load
//! boundary, into strict types; anything malformed is dropped with a warning.

use std::collections::{BTreeSet, HashMap, HashSet};
use std::fmt;
use std::path::Path;

use serde_yml::Value;

use crate::error::LeaderboardError;
use crate::scoring::SolveType;

pub fn normalize_handle(handle: &str) -> String {
    handle.trim().to_lowercase()
}

pub fn normalize_problem_id(problem_id: &str) -> String {
    problem_id.trim().to_uppercase()
}

/// `(normalized handle, contest id, normalized problem id)`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ExceptionKey {
    pub handle: String,
    pub contest_id: i64,
    pub problem_id: String,
}

impl ExceptionKey {
    pub fn new(handle: &str, contest_id: i64, problem_id: &str) -> Self {
        Self {
            handle: normalize_handle(handle),
            contest_id,
            problem_id: normalize_problem_id(problem_id),
        }
    }
}

impl fmt::Display for ExceptionKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}::{}::{}", self.handle, self.contest_id, self.problem_id)
    }
}

/// A validated manual override.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Exception {
    /// Handle as written in the file.
    pub handle: String,
    pub competition_id: i64,
    pub problem_id: String,
    pub solve_type: Option<SolveType>,
    pub credits: Option<u32>,
    pub remark: Option<String>,
}

impl Exception {
    pub fn key(&self) -> ExceptionKey {
        ExceptionKey::new(&self.handle, self.competition_id, &self.problem_id)
    }
}

/// Exceptions indexed by key and by handle, with unapplied-key tracking.
#[derive(Debug, Default)]
pub struct ExceptionBook {
    by_key: HashMap<ExceptionKey, Exception>,
    by_handle: HashMap<String, Vec<ExceptionKey>>,
    /// Handles in file order, original spelling.
    handles: Vec<String>,
    unapplied: BTreeSet<ExceptionKey>,
}

impl ExceptionBook {
    /// Later records with the same key replace earlier ones.
    pub fn new(exceptions: Vec<Exception>) -> Self {
        let mut book = Self::default();
        for exception in exceptions {
            let key = exception.key();
            let handle_key = key.handle.clone();
            if !book.by_handle.contains_key(&handle_key) {
                book.handles.push(exception.handle.trim().to_string());
            }
            let keys = book.by_handle.entry(handle_key).or_default();
            if !keys.contains(&key) {
                keys.push(key.clone());
            }
            book.unapplied.insert(key.clone());
            if book.by_key.insert(key.clone(), exception).is_some() {
                tracing::warn!("Duplicate exception for {}; the later entry wins", key);
            }
        }
        book
    }

    pub fn len(&self) -> usize {
        self.by_key.len()
    }

    pub fn is_empty(&self) -> bool {
        self.by_key.is_empty()
    }

    pub fn get(&self, key: &ExceptionKey) -> Option<&Exception> {
        self.by_key.get(key)
    }

    /// Distinct handles named by any exception, original spelling, file order.
    pub fn handles(&self) -> &[String] {
        &self.handles
    }

    /// Exceptions for one participant, in file order.
    pub fn for_handle(&self, handle: &str) -> Vec<&Exception> {
        self.by_handle
            .get(&normalize_handle(handle))
            .map(|keys| keys.iter().filter_map(|k| self.by_key.get(k)).collect())
            .unwrap_or_default()
    }

    pub fn mark_applied(&mut self, key: &ExceptionKey) {
        self.unapplied.remove(key);
    }

    /// Keys that matched no solve of any participant, sorted.
    pub fn unapplied(&self) -> Vec<ExceptionKey> {
        self.unapplied.iter().cloned().collect()
    }
}

/// Loads exceptions from a YAML sequence. A missing or blank file is empty.
pub fn load_exceptions(path: &Path) -> Result<Vec<Exception>, LeaderboardError> {
    let Some(raw) = read_optional(path)? else {
        return Ok(Vec::new());
    };
    parse_exceptions(&raw)
}

pub fn parse_exceptions(raw: &str) -> Result<Vec<Exception>, LeaderboardError> {
    if raw.trim().is_empty() {
        return Ok(Vec::new());
    }
    let data: Value = serde_yml::from_str(raw)?;
    let Value::Sequence(items) = data else {
        tracing::warn!("Exceptions file is not a list; ignoring it");
        return Ok(Vec::new());
    };

    let mut exceptions = Vec::new();
    for (idx, item) in items.iter().enumerate() {
        match parse_exception(item) {
            Ok(exception) => exceptions.push(exception),
            Err(reason) => tracing::warn!("Dropping exception #{}: {}", idx + 1, reason),
        }
    }
    Ok(exceptions)
}

fn parse_exception(item: &Value) -> Result<Exception, String> {
    let field = |name: &str| item.get(name).filter(|v| !v.is_null());

    let handle = field("handle")
        .and_then(scalar_string)
        .filter(|h| !h.is_empty())
        .ok_or("missing handle")?;
    let competition_id = field("competition_id")
        .and_then(scalar_i64)
        .ok_or("missing or non-numeric competition_id")?;
    let problem_id = field("problem_id")
        .and_then(scalar_string)
        .filter(|p| !p.is_empty())
        .ok_or("missing problem_id")?;

    let solve_type = match field("solve_type").and_then(scalar_string) {
        None => None,
        Some(s) if s.is_empty() => None,
        Some(s) => Some(
            SolveType::parse(&s).ok_or_else(|| format!("unknown solve_type '{}'", s))?,
        ),
    };
    let credits = match field("credits") {
        None => None,
        Some(v) => {
            let credits = scalar_i64(v).ok_or("non-numeric credits")?;
            if !(0..=2).contains(&credits) {
                return Err(format!("credits {} outside 0..=2", credits));
            }
            Some(credits as u32)
        }
    };
    let remark = field("remark")
        .and_then(scalar_string)
        .filter(|r| !r.is_empty());

    Ok(Exception {
        handle,
        competition_id,
        problem_id: normalize_problem_id(&problem_id),
        solve_type,
        credits,
        remark,
    })
}

/// Loads excluded handles (normalized) from the file and an environment
/// value, unioned. The file may hold a list, a comma-separated string, or a
/// mapping with a `handles` list.
pub fn load_excluded_handles(
    path: &Path,
    env_value: Option<&str>,
) -> Result<HashSet<String>, LeaderboardError> {
    let mut excluded: HashSet<String> = env_value
        .map(split_handle_list)
        .unwrap_or_default()
        .iter()
        .map(|h| normalize_handle(h))
        .filter(|h| !h.is_empty())
        .collect();

    if let Some(raw) = read_optional(path)? {
        if !raw.trim().is_empty() {
            let data: Value = serde_yml::from_str(&raw)?;
            excluded.extend(
                handle_list(&data)
                    .iter()
                    .map(|h| normalize_handle(h))
                    .filter(|h| !h.is_empty()),
            );
        }
    }
    Ok(excluded)
}

fn handle_list(value: &Value) -> Vec<String> {
    match value {
        Value::Sequence(items) => items.iter().filter_map(scalar_string).collect(),
        Value::String(s) => split_handle_list(s),
        Value::Mapping(_) => value.get("handles").map(handle_list).unwrap_or_default(),
        _ => Vec::new(),
    }
}

fn split_handle_list(value: &str) -> Vec<String> {
    value
        .split(',')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(str::to_string)
        .collect()
}

fn scalar_string(value: &Value) -> Option<String> {
    match value {
        Value::String(s) => Some(s.trim().to_string()),
        Value::Number(n) => Some(n.to_string()),
        Value::Bool(b) => Some(b.to_string()),
        _ => None,
    }
}

fn scalar_i64(value: &Value) -> Option<i64> {
    match value {
        Value::Number(n) => n.as_i64(),
        Value::String(s) => s.trim().parse().ok(),
        _ => None,
    }
}

fn read_optional(path: &Path) -> Result<Option<String>, LeaderboardError> {
    match std::fs::read_to_string(path) {
        Ok(raw) => Ok(Some(raw)),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(None),
        Err(e) => Err(LeaderboardError::io(path, e)),
    }
}
