//! User agent sent with every outbound request.

/// Returns the user agent string identifying this client to the platform.
pub fn get_user_agent() -> String {
    format!("cf-leaderboard/{} (rust)", env!("CARGO_PKG_VERSION"))
}
