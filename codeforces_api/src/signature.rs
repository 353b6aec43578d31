//! Request signing for authenticated API methods.

use rand::Rng;
use sha2::{Digest, Sha512};

/// API key and secret used to sign requests.
#[derive(Clone, PartialEq, Eq)]
pub struct Credentials {
    pub api_key: String,
    pub api_secret: String,
}

impl Credentials {
    pub fn new(api_key: impl Into<String>, api_secret: impl Into<String>) -> Self {
        Self {
            api_key: api_key.into(),
            api_secret: api_secret.into(),
        }
    }
}

impl std::fmt::Debug for Credentials {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Credentials")
            .field("api_key", &self.api_key)
            .field("api_secret", &"<redacted>")
            .finish()
    }
}

/// Serializes parameters as a form-encoded query string sorted by key, then value.
/// Pairs with an empty value are dropped.
pub fn build_sorted_query(params: &[(String, String)]) -> String {
    let mut sorted: Vec<&(String, String)> =
        params.iter().filter(|(_, v)| !v.is_empty()).collect();
    sorted.sort();
    let mut serializer = url::form_urlencoded::Serializer::new(String::new());
    for (key, value) in sorted {
        serializer.append_pair(key, value);
    }
    serializer.finish()
}

/// Extends `params` with `apiKey`, `time` and `apiSig`.
///
/// The signature is `rand + sha512_hex("{rand}/{method}?{sorted query}#{secret}")`
/// where `rand` is the six-digit, zero-padded `nonce`.
pub fn sign_params(
    method: &str,
    params: &[(String, String)],
    credentials: &Credentials,
    time: i64,
    nonce: u32,
) -> Vec<(String, String)> {
    let mut signed = params.to_vec();
    signed.push(("apiKey".to_string(), credentials.api_key.clone()));
    signed.push(("time".to_string(), time.to_string()));

    let rand = format!("{:06}", nonce % 1_000_000);
    let source = format!(
        "{}/{}?{}#{}",
        rand,
        method,
        build_sorted_query(&signed),
        credentials.api_secret
    );
    let hash = hex::encode(Sha512::digest(source.as_bytes()));
    signed.push(("apiSig".to_string(), format!("{}{}", rand, hash)));
    signed
}

/// Signs with the current clock and a random nonce.
pub(crate) fn sign_now(
    method: &str,
    params: &[(String, String)],
    credentials: &Credentials,
) -> Vec<(String, String)> {
    let time = chrono::Utc::now().timestamp();
    let nonce = rand::thread_rng().gen_range(0..1_000_000);
    sign_params(method, params, credentials, time, nonce)
}
