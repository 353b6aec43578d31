//! HTML scraping of the group member listing (the API has no member endpoint).

use std::sync::OnceLock;

use percent_encoding::percent_decode_str;
use regex::Regex;
use reqwest::StatusCode;

use crate::rate_limiter::Retryable;

#[derive(thiserror::Error, Debug)]
pub enum ScrapeError {
    #[error("http error: {0}")]
    Http(#[from] reqwest::Error),
    #[error("unexpected status {status} for {url}")]
    HttpStatus { status: StatusCode, url: String },
}

impl Retryable for ScrapeError {
    fn is_retryable(&self) -> bool {
        match self {
            Self::Http(_) => true,
            Self::HttpStatus { status, .. } => {
                *status == StatusCode::TOO_MANY_REQUESTS
                    || *status == StatusCode::SERVICE_UNAVAILABLE
            }
        }
    }
}

/// One GET for an HTML page; a single attempt.
pub async fn fetch_html(http: &reqwest::Client, url: &str) -> Result<String, ScrapeError> {
    let resp = http
        .get(url)
        .header("accept", "text/html,application/xhtml+xml")
        .header("accept-language", "en-US,en;q=0.9")
        .header("cache-control", "no-cache")
        .send()
        .await?;

    if !resp.status().is_success() {
        return Err(ScrapeError::HttpStatus {
            status: resp.status(),
            url: url.to_string(),
        });
    }

    Ok(resp.text().await?)
}

fn profile_link_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(r#"href="/profile/([^"/?#]+)""#).expect("valid profile link regex")
    })
}

/// Handles linked from `/profile/<handle>` anchors, in page order.
///
/// Tokens are percent-decoded (kept raw when the bytes are not UTF-8),
/// trimmed, and dropped when empty or containing a space. Duplicates are kept;
/// callers own de-duplication.
pub fn extract_handles(html: &str) -> Vec<String> {
    profile_link_re()
        .captures_iter(html)
        .filter_map(|cap| cap.get(1))
        .map(|m| {
            let raw = m.as_str();
            percent_decode_str(raw)
                .decode_utf8()
                .map(|decoded| decoded.into_owned())
                .unwrap_or_else(|_| raw.to_string())
        })
        .map(|h| h.trim().to_string())
        .filter(|h| !h.is_empty() && !h.contains(' '))
        .collect()
}
