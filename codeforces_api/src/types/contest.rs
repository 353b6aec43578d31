use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Contest {
    pub id: i64,
    #[serde(default)]
    pub name: String,
    #[serde(rename = "type", default)]
    pub contest_type: Option<String>,
    #[serde(default)]
    pub phase: Option<ContestPhase>,
    #[serde(default)]
    pub frozen: bool,
    #[serde(default)]
    pub duration_seconds: i64,
    #[serde(default)]
    pub start_time_seconds: Option<i64>,
    #[serde(default)]
    pub relative_time_seconds: Option<i64>,
}

impl Contest {
    /// Start time in epoch seconds; contests without one are treated as starting at 0.
    pub fn start(&self) -> i64 {
        self.start_time_seconds.unwrap_or(0)
    }

    /// `start + duration`.
    pub fn end(&self) -> i64 {
        self.start() + self.duration_seconds
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ContestPhase {
    Before,
    Coding,
    PendingSystemTest,
    SystemTest,
    Finished,
    #[serde(other)]
    Unknown,
}
