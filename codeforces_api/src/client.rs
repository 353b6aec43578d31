//! HTTP client for the Codeforces JSON API.

use std::time::Duration;

use serde::de::DeserializeOwned;
use url::Url;

use crate::{
    query::{StandingsQuery, UserStatusQuery},
    signature::{build_sorted_query, sign_now, Credentials},
    types::{Contest, Envelope, Standings, Submission},
    user_agent::get_user_agent,
    Error,
};

/// Request timeout for a single API call.
const REQUEST_TIMEOUT: Duration = Duration::from_secs(60);

/// Whether a method must be called with a signed request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Auth {
    /// Fail with [`Error::MissingCredentials`] when no credentials are configured.
    Required,
    /// Sign when credentials are available, otherwise send an anonymous request.
    Optional,
}

/// HTTP client for the Codeforces API.
///
/// Every method performs exactly one HTTP request. Throttling and retries
/// belong to the caller.
pub struct Client {
    http: reqwest::Client,
    /// Base URL for the API. Defaults to `https://codeforces.com/api`.
    base_api_url: String,
    credentials: Option<Credentials>,
}

impl Client {
    /// Creates a client pointing at the production API.
    pub fn new(credentials: Option<Credentials>) -> Result<Self, Error> {
        Self::with_base_url("https://codeforces.com/api", credentials)
    }

    /// Creates a client with a custom base URL. Used for testing with wiremock.
    pub fn with_base_url(base_url: &str, credentials: Option<Credentials>) -> Result<Self, Error> {
        let http = reqwest::Client::builder()
            .user_agent(get_user_agent())
            .timeout(REQUEST_TIMEOUT)
            .build()
            .map_err(|e| Error::Transport {
                method: "client".to_string(),
                source: e,
            })?;
        Ok(Self {
            http,
            base_api_url: base_url.trim_end_matches('/').to_string(),
            credentials,
        })
    }

    pub fn has_credentials(&self) -> bool {
        self.credentials.is_some()
    }

    fn get_url(&self, method: &str, params: &[(String, String)], auth: Auth) -> Result<Url, Error> {
        let params = match (&self.credentials, auth) {
            (Some(creds), _) => sign_now(method, params, creds),
            (None, Auth::Required) => {
                return Err(Error::MissingCredentials {
                    method: method.to_string(),
                })
            }
            (None, Auth::Optional) => params.to_vec(),
        };
        let query = build_sorted_query(&params);
        let raw = if query.is_empty() {
            format!("{}/{}", self.base_api_url, method)
        } else {
            format!("{}/{}?{}", self.base_api_url, method, query)
        };
        Url::parse(&raw).map_err(|e| {
            tracing::error!("Invalid URL constructed for {}: {}", method, e);
            Error::InvalidUrl(e.to_string())
        })
    }

    async fn get<T>(
        &self,
        method: &str,
        params: &[(String, String)],
        auth: Auth,
    ) -> Result<T, Error>
    where
        T: DeserializeOwned,
    {
        let url = self.get_url(method, params, auth)?;
        let resp = self
            .http
            .get(url)
            .header("accept", "application/json")
            .send()
            .await
            .map_err(|e| Error::Transport {
                method: method.to_string(),
                source: e,
            })?;

        let status = resp.status();
        let body = resp.text().await.map_err(|e| Error::Transport {
            method: method.to_string(),
            source: e,
        })?;

        if !status.is_success() {
            let snippet = truncate_body(&body, 400);
            tracing::debug!("{} returned HTTP {}: {}", method, status, snippet);
            return Err(Error::HttpStatus {
                method: method.to_string(),
                status: status.as_u16(),
                body: snippet,
            });
        }

        let envelope: Envelope<serde_json::Value> =
            serde_json::from_str(&body).map_err(|e| Error::Parse {
                method: method.to_string(),
                message: format!("{} | body: {}", e, truncate_body(&body, 400)),
            })?;

        if !envelope.is_ok() {
            let comment = envelope
                .comment
                .unwrap_or_else(|| truncate_body(&body, 800));
            return Err(Error::Api {
                method: method.to_string(),
                comment,
            });
        }

        let result = envelope.result.unwrap_or(serde_json::Value::Null);
        serde_json::from_value::<T>(result).map_err(|e| Error::Parse {
            method: method.to_string(),
            message: e.to_string(),
        })
    }

    /// `contest.list` for a private group. Requires credentials.
    pub async fn group_contests(&self, group_code: &str) -> Result<Vec<Contest>, Error> {
        let params = vec![
            ("gym".to_string(), "false".to_string()),
            ("groupCode".to_string(), group_code.to_string()),
        ];
        self.get("contest.list", &params, Auth::Required).await
    }

    /// `contest.list` for all public contests.
    pub async fn contests(&self) -> Result<Vec<Contest>, Error> {
        let params = vec![("gym".to_string(), "false".to_string())];
        self.get("contest.list", &params, Auth::Optional).await
    }

    /// `contest.standings`.
    pub async fn contest_standings(
        &self,
        query: &StandingsQuery,
        auth: Auth,
    ) -> Result<Standings, Error> {
        self.get("contest.standings", &query.to_query_pairs(), auth)
            .await
    }

    /// `contest.status` filtered to one handle. Requires credentials because
    /// group contests are only visible to signed requests.
    pub async fn contest_status(
        &self,
        contest_id: i64,
        handle: &str,
    ) -> Result<Vec<Submission>, Error> {
        let params = vec![
            ("contestId".to_string(), contest_id.to_string()),
            ("handle".to_string(), handle.to_string()),
        ];
        self.get("contest.status", &params, Auth::Required).await
    }

    /// `user.status`: one page of a user's submission history, newest first.
    pub async fn user_status(&self, query: &UserStatusQuery) -> Result<Vec<Submission>, Error> {
        self.get("user.status", &query.to_query_pairs(), Auth::Optional)
            .await
    }
}

fn truncate_body(body: &str, max: usize) -> String {
    if body.len() <= max {
        return body.to_string();
    }
    let mut end = max;
    while !body.is_char_boundary(end) {
        end -= 1;
    }
    format!("{}...[truncated]", &body[..end])
}
