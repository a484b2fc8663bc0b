use std::sync::Arc;

use base64::Engine;
use chrono::{DateTime, Duration, Utc};
use serde_json::Value;
use tokio::sync::RwLock;
use tokio::time::Instant;
use tracing::{debug, info, warn};

use crate::cache::token::{redact, CachedToken};
use crate::cache::token_cache::TokenCache;
use crate::config::service::CredentialsConfig;
use crate::errors::{CredentialError, SourceError};
use crate::helpers::time::get_instant;
use crate::observability::metrics::get_metrics;
use crate::sources::adc::AdcSource;
use crate::sources::metadata::MetadataSource;
use crate::sources::SourceKind;
use crate::utils::constants::{CREDENTIAL_TTL_SECS, METADATA_RETRY_SECS, SIGNED_TOKEN_PREFIX};

static FETCH_MSG: &str = "fetch";
static INVALID_MSG: &str = "invalid_format";

/// Per-audience identity tokens for backend-to-backend calls.
///
/// Cheap to clone; clones share the cache and the metadata status.
#[derive(Debug, Clone)]
pub struct CredentialManager {
    cache: TokenCache,
    primary: SourceKind,
    fallback: SourceKind,
    dev_mode: bool,
    /// None until the metadata server has answered (or failed to connect) once
    metadata_available: Arc<RwLock<Option<MetadataStatus>>>,
}

#[derive(Debug, Clone, Copy)]
struct MetadataStatus {
    available: bool,
    checked_at: Instant,
}

impl CredentialManager {
    pub fn new(cache: TokenCache, metadata: MetadataSource, fallback: AdcSource, dev_mode: bool) -> Self {
        Self {
            cache,
            primary: SourceKind::Metadata(metadata),
            fallback: SourceKind::Adc(fallback),
            dev_mode,
            metadata_available: Arc::new(RwLock::new(None)),
        }
    }

    pub fn from_config(cfg: &CredentialsConfig, cache: TokenCache) -> anyhow::Result<Self> {
        let timeout = cfg.fetch_timeout();
        let metadata = MetadataSource::new(&cfg.metadata_url, timeout)?;
        let fallback = AdcSource::new(cfg.adc_path.as_deref(), timeout)?;
        let dev_mode = cfg.is_dev_mode();
        if dev_mode {
            warn!("running in development mode - user credentials are used when the metadata server is unavailable");
        }
        Ok(Self::new(cache, metadata, fallback, dev_mode))
    }

    pub fn is_dev_mode(&self) -> bool {
        self.dev_mode
    }

    /// Some(true) once the metadata server answered, Some(false) once it was unreachable.
    pub async fn has_metadata_server(&self) -> Option<bool> {
        self.metadata_available.read().await.map(|status| status.available)
    }

    pub async fn get_credential(&self, audience: &str) -> Result<String, CredentialError> {
        self.get_credential_at(audience, Utc::now()).await
    }

    /// Cached token for `audience` if still valid at `now`, otherwise a fresh one
    /// cached until `now + 55m`.
    pub async fn get_credential_at(&self, audience: &str, now: DateTime<Utc>) -> Result<String, CredentialError> {
        let metrics = get_metrics().await;
        if let Some(cached) = self.cache.get_at(audience, now).await {
            metrics.credential_cache_hits.inc();
            debug!(audience = %audience, expires_at = %cached.expires_at, "identity token cache hit");
            return Ok(cached.value);
        }

        let token = self.fetch(audience).await.inspect_err(|_| {
            metrics.credential_failures.with_label_values(&[FETCH_MSG]).inc();
        })?;

        if !looks_like_signed_token(&token) {
            metrics.credential_failures.with_label_values(&[INVALID_MSG]).inc();
            warn!(audience = %audience, token_preview = %redact(&token), token_len = token.len(), "token doesn't look like a signed JWT");
            return Err(CredentialError::InvalidCredentialFormat { audience: audience.to_owned() });
        }
        if let Some(exp) = jwt_expiry(&token) {
            debug!(audience = %audience, jwt_exp = exp, "identity token claims decoded");
        }

        let expires_at = now + Duration::seconds(CREDENTIAL_TTL_SECS);
        self.cache.set(audience, CachedToken::new(token.clone(), expires_at)).await;
        metrics.cached_credentials.set(self.cache.len().await as i64);
        info!(audience = %audience, token_len = token.len(), expires_at = %expires_at, "identity token fetched");

        Ok(token)
    }

    pub async fn clear_cache(&self) {
        self.cache.clear().await;
        get_metrics().await.cached_credentials.set(0);
    }

    /// (total, expired)
    pub async fn cache_stats(&self) -> (usize, usize) {
        self.cache.stats_at(Utc::now()).await
    }

    async fn fetch(&self, audience: &str) -> Result<String, CredentialError> {
        let fetch_error = |reason: String| CredentialError::CredentialFetch {
            audience: audience.to_owned(),
            reason,
        };
        let metrics = get_metrics().await;

        if !self.skip_metadata().await {
            metrics.credential_fetches.with_label_values(&[self.primary.name()]).inc();
            match self.primary.fetch_identity_token(audience).await {
                Ok(token) => {
                    self.mark_metadata(true).await;
                    return Ok(token);
                }
                Err(SourceError::Unavailable(reason)) => {
                    self.mark_metadata(false).await;
                    warn!(audience = %audience, reason = %reason, "metadata server unavailable");
                    if !self.dev_mode {
                        return Err(fetch_error(
                            "metadata server not available (running locally?): enable credentials.dev_mode and run 'gcloud auth application-default login'".to_owned(),
                        ));
                    }
                }
                Err(e) => return Err(fetch_error(e.to_string())),
            }
        }

        metrics.credential_fetches.with_label_values(&[self.fallback.name()]).inc();
        self.fallback
            .fetch_identity_token(audience)
            .await
            .map_err(|e| fetch_error(e.to_string()))
    }

    /// Only dev mode skips an unreachable metadata server, and only until the retry interval passes.
    async fn skip_metadata(&self) -> bool {
        if !self.dev_mode {
            return false;
        }
        match *self.metadata_available.read().await {
            Some(MetadataStatus { available: false, checked_at }) => {
                checked_at.elapsed() < std::time::Duration::from_secs(METADATA_RETRY_SECS)
            }
            _ => false,
        }
    }

    async fn mark_metadata(&self, available: bool) {
        let mut status = self.metadata_available.write().await;
        if (*status).map(|p| p.available) != Some(available) {
            info!(available = available, "metadata server availability changed");
        }
        *status = Some(MetadataStatus { available, checked_at: get_instant() });
    }
}

/// Compact JWS: `eyJ` header and three non-empty segments.
pub fn looks_like_signed_token(token: &str) -> bool {
    if !token.starts_with(SIGNED_TOKEN_PREFIX) {
        return false;
    }
    let segments: Vec<&str> = token.split('.').collect();
    segments.len() == 3 && segments.iter().all(|segment| !segment.is_empty())
}

fn jwt_expiry(token: &str) -> Option<i64> {
    let payload = token.split('.').nth(1)?;
    let decoded = base64::engine::general_purpose::URL_SAFE_NO_PAD
        .decode(payload.trim_end_matches('='))
        .ok()?;
    serde_json::from_slice::<Value>(&decoded).ok()?.get("exp")?.as_i64()
}
