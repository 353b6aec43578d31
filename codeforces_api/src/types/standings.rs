use serde::{Deserialize, Serialize};

use super::Contest;

/// Result of `contest.standings`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Standings {
    pub contest: Contest,
    #[serde(default)]
    pub problems: Vec<Problem>,
    #[serde(default)]
    pub rows: Vec<RanklistRow>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Problem {
    #[serde(default)]
    pub contest_id: Option<i64>,
    #[serde(default)]
    pub index: String,
    #[serde(default)]
    pub name: String,
    #[serde(rename = "type", default)]
    pub problem_type: Option<String>,
    #[serde(default)]
    pub rating: Option<i64>,
    #[serde(default)]
    pub tags: Vec<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RanklistRow {
    pub party: Party,
    #[serde(default)]
    pub rank: i64,
    #[serde(default)]
    pub points: f64,
    #[serde(default)]
    pub penalty: i64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Party {
    #[serde(default)]
    pub contest_id: Option<i64>,
    #[serde(default)]
    pub members: Vec<Member>,
    #[serde(default)]
    pub participant_type: Option<String>,
    #[serde(default)]
    pub team_name: Option<String>,
    #[serde(default)]
    pub ghost: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Member {
    pub handle: String,
    #[serde(default)]
    pub name: Option<String>,
}
