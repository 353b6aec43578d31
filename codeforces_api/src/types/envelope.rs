use serde::{Deserialize, Serialize};

/// Wrapper around every API response: `{"status": "OK", "result": ...}` on
/// success, `{"status": "FAILED", "comment": "..."}` otherwise.
#[derive(Debug, Serialize, Deserialize)]
#[serde(bound(deserialize = "T: Deserialize<'de>"))]
pub struct Envelope<T> {
    pub status: String,
    #[serde(default)]
    pub comment: Option<String>,
    #[serde(default)]
    pub result: Option<T>,
}

impl<T> Envelope<T> {
    pub fn is_ok(&self) -> bool {
        self.status == "OK"
    }
}
