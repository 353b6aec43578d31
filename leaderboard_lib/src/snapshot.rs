//! The leaderboard artifact and its writer.

use std::path::{Path, PathBuf};

use serde::ser::{SerializeMap, Serializer};
use serde::Serialize;

use crate::catalog::{Catalog, CatalogProblem};
use crate::error::LeaderboardError;
use crate::roster::handle_order;
use crate::scoring::ParticipantRecord;
use crate::window::TimeWindow;

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CompetitionSummary {
    pub id: i64,
    pub name: String,
    pub link: String,
    pub start: String,
    pub end: String,
    pub problems: Vec<CatalogProblem>,
}

/// Handle → record, serialized as a mapping in case-insensitive handle order.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct RecordsByHandle(Vec<(String, ParticipantRecord)>);

impl RecordsByHandle {
    pub fn new(mut records: Vec<(String, ParticipantRecord)>) -> Self {
        records.sort_by(|(a, _), (b, _)| handle_order(a, b));
        Self(records)
    }

    pub fn get(&self, handle: &str) -> Option<&ParticipantRecord> {
        self.0.iter().find(|(h, _)| h == handle).map(|(_, r)| r)
    }

    pub fn handles(&self) -> impl Iterator<Item = &str> {
        self.0.iter().map(|(h, _)| h.as_str())
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl Serialize for RecordsByHandle {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(self.0.len()))?;
        for (handle, record) in &self.0 {
            map.serialize_entry(handle, record)?;
        }
        map.end()
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Snapshot {
    pub last_updated: String,
    pub competitions: Vec<CompetitionSummary>,
    pub records_by_handle: RecordsByHandle,
}

impl Snapshot {
    pub fn build(
        catalog: &Catalog,
        records: Vec<(String, ParticipantRecord)>,
        window: &TimeWindow,
        now: i64,
    ) -> Self {
        let competitions = catalog
            .contests()
            .iter()
            .map(|c| CompetitionSummary {
                id: c.id,
                name: c.name.clone(),
                link: c.link.clone(),
                start: window.format_timestamp(c.start_time),
                end: window.format_timestamp(c.end_time),
                problems: c.problems.clone(),
            })
            .collect();
        Self {
            last_updated: window.format_timestamp(now),
            competitions,
            records_by_handle: RecordsByHandle::new(records),
        }
    }
}

fn is_json(path: &Path) -> bool {
    path.extension()
        .is_some_and(|ext| ext.eq_ignore_ascii_case("json"))
}

/// Serializes for `path`: JSON for `.json`, YAML otherwise.
pub fn render(path: &Path, snapshot: &Snapshot) -> Result<String, LeaderboardError> {
    if is_json(path) {
        let mut out = serde_json::to_string_pretty(snapshot)?;
        out.push('\n');
        Ok(out)
    } else {
        Ok(serde_yml::to_string(snapshot)?)
    }
}

/// Replaces the artifact at `path`, creating parent directories.
///
/// The content goes to a sibling `.tmp` file first and is renamed over the
/// target, so readers never see a half-written file.
pub fn write_snapshot(path: &Path, snapshot: &Snapshot) -> Result<(), LeaderboardError> {
    let content = render(path, snapshot)?;

    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        std::fs::create_dir_all(parent).map_err(|e| LeaderboardError::io(parent, e))?;
    }

    let tmp = temp_path(path);
    std::fs::write(&tmp, content).map_err(|e| LeaderboardError::io(&tmp, e))?;
    std::fs::rename(&tmp, path).map_err(|e| LeaderboardError::io(path, e))?;
    Ok(())
}

fn temp_path(path: &Path) -> PathBuf {
    let mut name = path
        .file_name()
        .map(|n| n.to_os_string())
        .unwrap_or_default();
    name.push(".tmp");
    path.with_file_name(name)
}
