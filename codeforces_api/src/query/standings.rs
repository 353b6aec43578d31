//! Query builder for `contest.standings`.

/// Parameters for a standings request. Only `contest_id` is required.
#[derive(Debug, Clone, Default)]
pub struct StandingsQuery {
    pub contest_id: i64,
    pub from: Option<i64>,
    pub count: Option<i64>,
    pub show_unofficial: bool,
}

impl StandingsQuery {
    pub fn new(contest_id: i64) -> Self {
        Self {
            contest_id,
            ..Self::default()
        }
    }

    /// 1-based index of the first row to return.
    pub fn with_from(mut self, from: i64) -> Self {
        self.from = Some(from);
        self
    }

    pub fn with_count(mut self, count: i64) -> Self {
        self.count = Some(count);
        self
    }

    pub fn with_unofficial(mut self, show_unofficial: bool) -> Self {
        self.show_unofficial = show_unofficial;
        self
    }

    /// Build query parameter pairs (excluding None values).
    pub fn to_query_pairs(&self) -> Vec<(String, String)> {
        let mut params = vec![("contestId".to_string(), self.contest_id.to_string())];
        if let Some(from) = self.from {
            params.push(("from".to_string(), from.to_string()));
        }
        if let Some(count) = self.count {
            params.push(("count".to_string(), count.to_string()));
        }
        if self.show_unofficial {
            params.push(("showUnofficial".to_string(), "true".to_string()));
        }
        params
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn minimal_query_has_only_contest_id() {
        let pairs = StandingsQuery::new(2050).to_query_pairs();
        assert_eq!(pairs, vec![("contestId".to_string(), "2050".to_string())]);
    }

    #[test]
    fn problem_list_query() {
        let pairs = StandingsQuery::new(2050)
            .with_from(1)
            .with_count(1)
            .with_unofficial(true)
            .to_query_pairs();
        assert_eq!(pairs.len(), 4);
        assert!(pairs.contains(&("showUnofficial".to_string(), "true".to_string())));
        assert!(pairs.contains(&("count".to_string(), "1".to_string())));
    }
}
