use std::collections::BTreeMap;
use std::time::Duration;

use anyhow::{anyhow, Context, Result};
use reqwest::Client;
use serde::Deserialize;
use tracing::{debug, info};

use crate::cache::token::CachedToken;
use crate::cache::token_cache::TokenCache;
use crate::config::service::ServiceConfig;
use crate::discovery::{BackendDescriptor, ServiceDirectory};
use crate::helpers::time::{expires_at_with_margin, get_token_safety_margin_seconds, now};
use crate::sources::adc::AdcSource;
use crate::sources::metadata::MetadataSource;
use crate::sources::SourceKind;

const API_TOKEN_KEY: &str = "cloud-run-admin-api";
const ENABLED_VALUE: &str = "true";
const API_TIMEOUT: Duration = Duration::from_secs(30);

#[derive(Debug, Deserialize, Default)]
struct ServiceList {
    #[serde(default)]
    items: Vec<KnativeService>,
    #[serde(default)]
    metadata: ListMeta,
}

#[derive(Debug, Deserialize, Default)]
struct ListMeta {
    #[serde(rename = "continue")]
    continue_token: Option<String>,
}

#[derive(Debug, Deserialize, Default)]
struct KnativeService {
    #[serde(default)]
    metadata: ObjectMeta,
    #[serde(default)]
    spec: ServiceSpec,
    #[serde(default)]
    status: ServiceStatus,
}

#[derive(Debug, Deserialize, Default)]
struct ObjectMeta {
    #[serde(default)]
    name: String,
    #[serde(default)]
    labels: BTreeMap<String, String>,
}

#[derive(Debug, Deserialize, Default)]
struct ServiceSpec {
    #[serde(default)]
    template: RevisionTemplate,
}

#[derive(Debug, Deserialize, Default)]
struct RevisionTemplate {
    #[serde(default)]
    metadata: ObjectMeta,
}

#[derive(Debug, Deserialize, Default)]
struct ServiceStatus {
    url: Option<String>,
}

/// Lists Cloud Run services through the Knative-style admin API.
#[derive(Debug, Clone)]
pub struct CloudRunDirectory {
    api_base_url: Option<String>,
    enable_key: String,
    client: Client,
    token_source: SourceKind,
    token_cache: TokenCache,
    safety_margin_seconds: u64,
}

impl CloudRunDirectory {
    pub fn new(
        api_base_url: Option<String>,
        label_namespace: &str,
        token_source: SourceKind,
        safety_margin_seconds: u64,
        timeout: Duration,
    ) -> Result<Self> {
        let client = Client::builder().timeout(timeout).build()?;
        Ok(Self {
            api_base_url: api_base_url.map(|url| url.trim_end_matches('/').to_owned()),
            enable_key: format!("{}_enable", label_namespace),
            client,
            token_source,
            token_cache: TokenCache::new(),
            safety_margin_seconds,
        })
    }

    /// Access tokens come from the metadata server, or from user credentials in dev mode.
    pub fn from_config(cfg: &ServiceConfig) -> Result<Self> {
        let creds = &cfg.credentials;
        let timeout = creds.fetch_timeout();
        let token_source = if creds.is_dev_mode() {
            SourceKind::Adc(AdcSource::new(creds.adc_path.as_deref(), timeout)?)
        } else {
            SourceKind::Metadata(MetadataSource::new(&creds.metadata_url, timeout)?)
        };
        let margin = get_token_safety_margin_seconds(cfg.settings.safety_margin_seconds);
        Self::new(
            cfg.discovery.api_base_url.clone(),
            &cfg.routing.label_namespace,
            token_source,
            margin,
            API_TIMEOUT,
        )
    }

    pub(crate) fn base_url(&self, region: &str) -> String {
        self.api_base_url
            .clone()
            .unwrap_or_else(|| format!("https://{}-run.googleapis.com", region))
    }

    async fn access_token(&self) -> Result<String> {
        if let Some(cached) = self.token_cache.get(API_TOKEN_KEY).await {
            return Ok(cached.value);
        }
        let token = self
            .token_source
            .fetch_access_token()
            .await
            .with_context(|| format!("failed to get access token from {}", self.token_source.name()))?;
        let expires_at = expires_at_with_margin(now(), token.expires_in, self.safety_margin_seconds);
        self.token_cache
            .set(API_TOKEN_KEY, CachedToken::new(token.access_token.clone(), expires_at))
            .await;
        debug!(source = self.token_source.name(), expires_at = %expires_at, "admin API access token refreshed");
        Ok(token.access_token)
    }

    async fn fetch_page(&self, url: &str, token: &str, continue_token: Option<&str>) -> Result<ServiceList> {
        let mut request = self.client.get(url).bearer_auth(token);
        if let Some(next) = continue_token {
            request = request.query(&[("continue", next)]);
        }
        let response = request.send().await?;
        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(anyhow!("Cloud Run API returned {}: {}", status, body.trim()));
        }
        Ok(response.json::<ServiceList>().await?)
    }

    /// Service-level labels unless only the revision template carries the opt-in marker.
    fn select_labels(&self, service: KnativeService) -> BTreeMap<String, String> {
        let enabled = |labels: &BTreeMap<String, String>| {
            labels.get(&self.enable_key).map(String::as_str) == Some(ENABLED_VALUE)
        };
        if !enabled(&service.metadata.labels) && enabled(&service.spec.template.metadata.labels) {
            return service.spec.template.metadata.labels;
        }
        service.metadata.labels
    }
}

impl ServiceDirectory for CloudRunDirectory {
    async fn list_backends(&self, project_id: &str, region: &str) -> Result<Vec<BackendDescriptor>> {
        let token = self.access_token().await?;
        let url = format!(
            "{}/apis/serving.knative.dev/v1/namespaces/{}/services",
            self.base_url(region),
            project_id
        );

        let mut backends = Vec::new();
        let mut continue_token: Option<String> = None;
        loop {
            let page = self
                .fetch_page(&url, &token, continue_token.as_deref())
                .await
                .with_context(|| format!("listing services in {}/{}", project_id, region))?;

            for service in page.items {
                let name = service.metadata.name.clone();
                let Some(url) = service.status.url.clone().filter(|url| !url.is_empty()) else {
                    debug!(project = %project_id, service = %name, "service has no URL yet, skipped");
                    continue;
                };
                let labels = self.select_labels(service);
                backends.push(BackendDescriptor {
                    name,
                    url,
                    project_id: project_id.to_owned(),
                    region: region.to_owned(),
                    labels,
                });
            }

            match page.metadata.continue_token.filter(|next| !next.is_empty()) {
                Some(next) => continue_token = Some(next),
                None => break,
            }
        }

        info!(project = %project_id, region = %region, services = backends.len(), "services listed");
        Ok(backends)
    }
}
