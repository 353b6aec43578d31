//! Error types for the API client.

/// Errors that can occur when making API requests.
///
/// Each variant describes the outcome of a single attempt; retrying is the
/// caller's decision, guided by [`Error::is_retryable`].
#[derive(thiserror::Error, Debug)]
pub enum Error {
    /// The request never produced an HTTP response (connect, TLS, timeout, body read).
    #[error("request for {method} failed: {source}")]
    Transport {
        method: String,
        #[source]
        source: reqwest::Error,
    },
    /// The server answered with a non-success HTTP status.
    #[error("HTTP {status} for {method}: {body}")]
    HttpStatus {
        method: String,
        status: u16,
        body: String,
    },
    /// The envelope status was not `OK`.
    #[error("API error for {method}: {comment}")]
    Api { method: String, comment: String },
    /// The method needs a signed request but no credentials were configured.
    #[error("missing API credentials for {method}; set API_KEY and API_SECRET in .env (or CF_API_KEY/CF_API_SECRET)")]
    MissingCredentials { method: String },
    /// The response body could not be decoded.
    #[error("failed to parse response for {method}: {message}")]
    Parse { method: String, message: String },
    #[error("invalid URL: {0}")]
    InvalidUrl(String),
}

impl Error {
    /// True for failures worth another attempt after a backoff: transport
    /// errors, HTTP 429/503, and API comments that mention rate limiting.
    pub fn is_retryable(&self) -> bool {
        match self {
            Self::Transport { .. } => true,
            Self::HttpStatus { status, .. } => *status == 429 || *status == 503,
            Self::Api { comment, .. } => is_rate_limit_comment(comment),
            Self::MissingCredentials { .. } | Self::Parse { .. } | Self::InvalidUrl(_) => false,
        }
    }
}

fn is_rate_limit_comment(comment: &str) -> bool {
    let lower = comment.to_lowercase();
    lower.contains("limit") || lower.contains("too many")
}

#[cfg(test)]
mod tests {
    use super::*;

    fn api(comment: &str) -> Error {
        Error::Api {
            method: "contest.list".into(),
            comment: comment.into(),
        }
    }

    fn status(code: u16) -> Error {
        Error::HttpStatus {
            method: "contest.list".into(),
            status: code,
            body: String::new(),
        }
    }

    #[test]
    fn throttling_statuses_are_retryable() {
        assert!(status(429).is_retryable());
        assert!(status(503).is_retryable());
        assert!(!status(400).is_retryable());
        assert!(!status(500).is_retryable());
    }

    #[test]
    fn rate_limit_comments_are_retryable() {
        assert!(api("Call limit exceeded").is_retryable());
        assert!(api("Too many requests").is_retryable());
        assert!(!api("contestId: Contest with id 1 not found").is_retryable());
    }

    #[test]
    fn missing_credentials_is_terminal() {
        let err = Error::MissingCredentials {
            method: "contest.status".into(),
        };
        assert!(!err.is_retryable());
        assert!(err.to_string().contains("contest.status"));
    }
}
