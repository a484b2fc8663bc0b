use chrono::{DateTime, Utc};

/// A bearer token and the instant after which it must be refetched.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CachedToken {
    pub value: String,
    pub expires_at: DateTime<Utc>,
}

impl CachedToken {
    pub fn new(value: String, expires_at: DateTime<Utc>) -> Self {
        Self { value, expires_at }
    }

    pub fn is_valid_at(&self, now: DateTime<Utc>) -> bool {
        !self.value.is_empty() && now < self.expires_at
    }
}

/// Keep the first and last 20 characters of a token for logging.
pub fn redact(token: &str) -> String {
    if token.len() <= 40 || !token.is_ascii() {
        return token.chars().take(8).collect::<String>() + "...";
    }
    format!("{}...{}", &token[..20], &token[token.len() - 20..])
}
