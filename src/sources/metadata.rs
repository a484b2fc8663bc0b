use std::time::Duration;

use reqwest::Client;
use serde::Deserialize;
use tracing::debug;

use crate::errors::SourceError;

pub const IDENTITY_PATH: &str = "/computeMetadata/v1/instance/service-accounts/default/identity";
pub const ACCESS_TOKEN_PATH: &str = "/computeMetadata/v1/instance/service-accounts/default/token";

/// OAuth2 access token as returned by the metadata server and the token endpoint.
#[derive(Debug, Deserialize, Clone)]
pub struct AccessToken {
    pub access_token: String,
    pub expires_in: u64,
}

/// Platform-local token source: the GCE/Cloud Run metadata server.
#[derive(Debug, Clone)]
pub struct MetadataSource {
    pub base_url: String,
    client: Client,
}

impl MetadataSource {
    pub fn new(base_url: &str, timeout: Duration) -> anyhow::Result<Self> {
        let client = Client::builder().timeout(timeout).build()?;
        Ok(Self { base_url: base_url.trim_end_matches('/').to_owned(), client })
    }

    /// Identity token whose `aud` is the backend URL.
    pub async fn fetch_identity_token(&self, audience: &str) -> Result<String, SourceError> {
        let url = format!("{}{}", self.base_url, IDENTITY_PATH);
        debug!(audience = %audience, "requesting identity token from metadata server");

        let body = self.get_text(&url, &[("audience", audience)]).await?;
        Ok(body.trim().to_owned())
    }

    /// Access token for Google APIs (used to list services).
    pub async fn fetch_access_token(&self) -> Result<AccessToken, SourceError> {
        let url = format!("{}{}", self.base_url, ACCESS_TOKEN_PATH);
        let body = self.get_text(&url, &[]).await?;
        serde_json::from_str::<AccessToken>(&body)
            .map_err(|e| SourceError::Request(format!("invalid access token response: {}", e)))
    }

    async fn get_text(&self, url: &str, query: &[(&str, &str)]) -> Result<String, SourceError> {
        let response = self
            .client
            .get(url)
            .query(query)
            .header("Metadata-Flavor", "Google")
            .send()
            .await
            .map_err(SourceError::from_reqwest)?;

        let status = response.status();
        let body = response.text().await.map_err(SourceError::from_reqwest)?;
        if !status.is_success() {
            return Err(SourceError::Request(format!(
                "metadata server returned {}: {}",
                status,
                body.trim()
            )));
        }
        Ok(body)
    }
}
