// Upstash connection settings

use std::time::Duration;

/// Request timeout when none is configured
pub const DEFAULT_REQUEST_TIMEOUT: Duration = Duration::from_secs(10);

/// Credential variable pairs, in lookup order (Upstash, then Vercel KV)
const CREDENTIAL_VARS: [(&str, &str); 2] = [
    ("UPSTASH_REDIS_REST_URL", "UPSTASH_REDIS_REST_TOKEN"),
    ("KV_REST_API_URL", "KV_REST_API_TOKEN"),
];

#[derive(Clone)]
pub struct UpstashConfig {
    pub url: String,
    pub token: String,
    pub timeout: Duration,
}

impl std::fmt::Debug for UpstashConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("UpstashConfig")
            .field("url", &self.url)
            .field("token", &"<redacted>")
            .field("timeout", &self.timeout)
            .finish()
    }
}

impl UpstashConfig {
    pub fn new(url: impl Into<String>, token: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            token: token.into(),
            timeout: DEFAULT_REQUEST_TIMEOUT,
        }
    }

    /// Credentials from the process environment, if both halves are present
    pub fn from_env() -> Option<Self> {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    /// URL and token are looked up independently, each taking the first
    /// non-empty variable of its kind
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Option<Self> {
        let non_empty = |name: &str| lookup(name).filter(|v| !v.trim().is_empty());

        let url = CREDENTIAL_VARS.iter().find_map(|(url, _)| non_empty(url))?;
        let token = CREDENTIAL_VARS
            .iter()
            .find_map(|(_, token)| non_empty(token))?;
        Some(Self::new(url, token))
    }
}
