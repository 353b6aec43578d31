//! Throttled, retrying wrapper around the API client and the HTML fetcher.

use std::time::Duration;

use codeforces_api::types::{Contest, Standings, Submission};
use codeforces_api::user_agent::get_user_agent;
use codeforces_api::{Auth, Client, Credentials, StandingsQuery, UserStatusQuery};

use crate::config::LeaderboardConfig;
use crate::error::LeaderboardError;
use crate::rate_limiter::{with_retry, Endpoint, RateLimiter, RequestTracker, RetryPolicy};
use crate::scrape::fetch_html;

/// Page size for `user.status` history paging.
pub const HISTORY_PAGE_SIZE: i64 = 1000;
/// Hard cap on `user.status` pages per handle.
pub const HISTORY_MAX_PAGES: usize = 50;

const PAGE_TIMEOUT: Duration = Duration::from_secs(60);

/// All outbound traffic for one run.
///
/// Every call (API or HTML) first waits on the shared [`RateLimiter`], then
/// runs under the [`RetryPolicy`]. There is no caching: each run reads the
/// remote state from scratch.
pub struct CodeforcesClient {
    api: Client,
    web: reqwest::Client,
    site_base_url: String,
    rate_limiter: RateLimiter,
    retry: RetryPolicy,
}

impl CodeforcesClient {
    pub fn new(
        config: &LeaderboardConfig,
        credentials: Option<Credentials>,
    ) -> Result<Self, LeaderboardError> {
        let api = Client::with_base_url(&config.api_base_url, credentials)
            .map_err(|e| LeaderboardError::Config(format!("API client: {}", e)))?;
        let web = reqwest::Client::builder()
            .user_agent(get_user_agent())
            .timeout(PAGE_TIMEOUT)
            .build()
            .map_err(|e| LeaderboardError::Config(format!("HTTP client: {}", e)))?;
        Ok(Self {
            api,
            web,
            site_base_url: config.site_base_url.trim_end_matches('/').to_string(),
            rate_limiter: RateLimiter::new(config.min_request_interval),
            retry: config.retry,
        })
    }

    pub fn has_credentials(&self) -> bool {
        self.api.has_credentials()
    }

    pub fn site_base_url(&self) -> &str {
        &self.site_base_url
    }

    pub fn tracker(&self) -> &RequestTracker {
        self.rate_limiter.tracker()
    }

    /// Every contest visible to the group.
    pub async fn group_contests(
        &self,
        group_code: &str,
    ) -> Result<Vec<Contest>, LeaderboardError> {
        let api = &self.api;
        with_retry(
            &self.rate_limiter,
            &self.retry,
            Endpoint::ContestList,
            "contest.list(group)",
            move || api.group_contests(group_code),
        )
        .await
        .map_err(|e| e.into_error("contest.list(group)"))
    }

    /// Every public contest.
    pub async fn official_contests(&self) -> Result<Vec<Contest>, LeaderboardError> {
        let api = &self.api;
        with_retry(
            &self.rate_limiter,
            &self.retry,
            Endpoint::ContestList,
            "contest.list",
            move || api.contests(),
        )
        .await
        .map_err(|e| e.into_error("contest.list"))
    }

    pub async fn standings(
        &self,
        query: &StandingsQuery,
        auth: Auth,
    ) -> Result<Standings, LeaderboardError> {
        let label = format!("contest.standings({})", query.contest_id);
        let api = &self.api;
        with_retry(
            &self.rate_limiter,
            &self.retry,
            Endpoint::ContestStandings,
            &label,
            move || api.contest_standings(query, auth),
        )
        .await
        .map_err(|e| e.into_error(&label))
    }

    /// One participant's submissions to one contest.
    pub async fn contest_submissions(
        &self,
        contest_id: i64,
        handle: &str,
    ) -> Result<Vec<Submission>, LeaderboardError> {
        let label = format!("contest.status({}, {})", contest_id, handle);
        let api = &self.api;
        with_retry(
            &self.rate_limiter,
            &self.retry,
            Endpoint::ContestStatus,
            &label,
            move || api.contest_status(contest_id, handle),
        )
        .await
        .map_err(|e| e.into_error(&label))
    }

    /// A participant's submissions created at or after `since` (epoch
    /// seconds), newest first.
    ///
    /// Pages of [`HISTORY_PAGE_SIZE`] until a page is empty, its oldest
    /// submission predates `since`, or [`HISTORY_MAX_PAGES`] pages were read.
    pub async fn user_submissions_since(
        &self,
        handle: &str,
        since: i64,
    ) -> Result<Vec<Submission>, LeaderboardError> {
        let mut all = Vec::new();
        let mut from = 1;
        for _ in 0..HISTORY_MAX_PAGES {
            let query = UserStatusQuery::new(handle)
                .with_from(from)
                .with_count(HISTORY_PAGE_SIZE);
            let label = format!("user.status({}, from={})", handle, from);
            let api = &self.api;
            let query_ref = &query;
            let page = with_retry(
                &self.rate_limiter,
                &self.retry,
                Endpoint::UserStatus,
                &label,
                move || api.user_status(query_ref),
            )
            .await
            .map_err(|e| e.into_error(&label))?;

            let Some(oldest) = page.last().map(|s| s.creation_time_seconds) else {
                break;
            };
            all.extend(
                page.into_iter()
                    .filter(|s| s.creation_time_seconds >= since),
            );
            if oldest < since {
                break;
            }
            from += HISTORY_PAGE_SIZE;
        }
        Ok(all)
    }

    /// GET an HTML page under the same throttle and retry policy. Counted as
    /// a member page fetch.
    pub async fn fetch_text(&self, url: &str) -> Result<String, LeaderboardError> {
        let web = &self.web;
        with_retry(
            &self.rate_limiter,
            &self.retry,
            Endpoint::MemberPage,
            url,
            move || fetch_html(web, url),
        )
        .await
        .map_err(|e| e.into_error(url))
    }

    /// Member listing URL; page 1 carries no page parameter.
    pub fn group_members_url(&self, group_code: &str, page: usize) -> String {
        let base = format!("{}/group/{}/members", self.site_base_url, group_code);
        if page <= 1 {
            base
        } else {
            format!("{}?pageIndex={}", base, page)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn client() -> CodeforcesClient {
        let mut config = LeaderboardConfig::from_constants().unwrap();
        config.site_base_url = "https://cf.example/".to_string();
        CodeforcesClient::new(&config, None).unwrap()
    }

    #[test]
    fn member_urls() {
        let client = client();
        assert_eq!(
            client.group_members_url("G1", 1),
            "https://cf.example/group/G1/members"
        );
        assert_eq!(
            client.group_members_url("G1", 3),
            "https://cf.example/group/G1/members?pageIndex=3"
        );
    }

    #[test]
    fn no_credentials_means_unsigned() {
        assert!(!client().has_credentials());
    }
}
