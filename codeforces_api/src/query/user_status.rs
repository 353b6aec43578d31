//! Query builder for `user.status`.

#[derive(Debug, Clone)]
pub struct UserStatusQuery {
    pub handle: String,
    pub from: i64,
    pub count: i64,
}

impl UserStatusQuery {
    pub fn new(handle: &str) -> Self {
        Self {
            handle: handle.to_string(),
            from: 1,
            count: 1000,
        }
    }

    pub fn with_from(mut self, from: i64) -> Self {
        self.from = from;
        self
    }

    pub fn with_count(mut self, count: i64) -> Self {
        self.count = count;
        self
    }

    pub fn to_query_pairs(&self) -> Vec<(String, String)> {
        vec![
            ("handle".to_string(), self.handle.clone()),
            ("from".to_string(), self.from.to_string()),
            ("count".to_string(), self.count.to_string()),
        ]
    }
}
