use serde::{Deserialize, Serialize};

use super::{Party, Problem};

/// One entry of `contest.status` or `user.status`.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Submission {
    pub id: i64,
    #[serde(default)]
    pub contest_id: Option<i64>,
    #[serde(default)]
    pub creation_time_seconds: i64,
    #[serde(default)]
    pub relative_time_seconds: Option<i64>,
    pub problem: Problem,
    #[serde(default)]
    pub author: Option<Party>,
    #[serde(default)]
    pub programming_language: Option<String>,
    #[serde(default)]
    pub verdict: Option<String>,
    #[serde(default)]
    pub passed_test_count: Option<i64>,
}

impl Submission {
    pub fn is_accepted(&self) -> bool {
        self.verdict.as_deref() == Some("OK")
    }
}
