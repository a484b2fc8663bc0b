use std::path::PathBuf;
use std::time::Duration;

use reqwest::Client;
use serde::Deserialize;
use tracing::debug;

use crate::errors::SourceError;
use crate::sources::metadata::AccessToken;
use crate::utils::constants::{DEFAULT_ADC_TOKEN_URI, ENV_ADC_PATH};

const AUTHORIZED_USER: &str = "authorized_user";

/// Application default credentials file written by
/// `gcloud auth application-default login`.
#[derive(Debug, Deserialize, Clone)]
pub struct AdcFile {
    #[serde(rename = "type")]
    pub credential_type: String,
    pub client_id: Option<String>,
    pub client_secret: Option<String>,
    pub refresh_token: Option<String>,
    pub token_uri: Option<String>,
}

#[derive(Debug, Deserialize)]
struct RefreshResponse {
    access_token: String,
    expires_in: u64,
    id_token: Option<String>,
}

/// Development fallback: exchanges the developer's refresh token for tokens.
#[derive(Debug, Clone)]
pub struct AdcSource {
    pub path: PathBuf,
    client: Client,
}

impl AdcSource {
    pub fn new(path: Option<&str>, timeout: Duration) -> anyhow::Result<Self> {
        let client = Client::builder().timeout(timeout).build()?;
        Ok(Self { path: resolve_adc_path(path), client })
    }

    /// User credentials cannot pick the audience; the returned token is the
    /// developer's own identity token.
    pub async fn fetch_identity_token(&self, audience: &str) -> Result<String, SourceError> {
        debug!(audience = %audience, path = %self.path.display(), "exchanging user credentials for identity token");
        let response = self.refresh().await?;
        response
            .id_token
            .filter(|token| !token.is_empty())
            .ok_or_else(|| SourceError::Request("ADC returned empty identity token".to_owned()))
    }

    pub async fn fetch_access_token(&self) -> Result<AccessToken, SourceError> {
        let response = self.refresh().await?;
        Ok(AccessToken { access_token: response.access_token, expires_in: response.expires_in })
    }

    async fn refresh(&self) -> Result<RefreshResponse, SourceError> {
        let adc = self.load()?;
        let (client_id, client_secret, refresh_token) =
            match (adc.client_id, adc.client_secret, adc.refresh_token) {
                (Some(id), Some(secret), Some(refresh)) => (id, secret, refresh),
                _ => {
                    return Err(SourceError::Request(format!(
                        "ADC file '{}' is missing client_id, client_secret or refresh_token",
                        self.path.display()
                    )))
                }
            };
        let token_uri = adc.token_uri.unwrap_or_else(|| DEFAULT_ADC_TOKEN_URI.to_owned());

        let response = self
            .client
            .post(&token_uri)
            .form(&[
                ("grant_type", "refresh_token"),
                ("client_id", client_id.as_str()),
                ("client_secret", client_secret.as_str()),
                ("refresh_token", refresh_token.as_str()),
            ])
            .send()
            .await
            .map_err(|e| SourceError::Request(format!("ADC token exchange failed: {}", e)))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(SourceError::Request(format!(
                "ADC token endpoint returned {}: {}",
                status,
                body.trim()
            )));
        }
        response
            .json::<RefreshResponse>()
            .await
            .map_err(|e| SourceError::Request(format!("invalid ADC token response: {}", e)))
    }

    fn load(&self) -> Result<AdcFile, SourceError> {
        let raw = std::fs::read_to_string(&self.path).map_err(|e| {
            SourceError::Request(format!(
                "cannot read ADC file '{}' (did you run 'gcloud auth application-default login'?): {}",
                self.path.display(),
                e
            ))
        })?;
        let adc: AdcFile = serde_json::from_str(&raw)
            .map_err(|e| SourceError::Request(format!("invalid ADC file: {}", e)))?;
        if adc.credential_type != AUTHORIZED_USER {
            return Err(SourceError::Request(format!(
                "unsupported ADC credential type '{}', expected '{}'",
                adc.credential_type, AUTHORIZED_USER
            )));
        }
        Ok(adc)
    }
}

fn resolve_adc_path(configured: Option<&str>) -> PathBuf {
    if let Some(path) = configured {
        return PathBuf::from(path);
    }
    if let Ok(path) = std::env::var(ENV_ADC_PATH) {
        return PathBuf::from(path);
    }
    let home = std::env::var("HOME").unwrap_or_default();
    PathBuf::from(home).join(".config/gcloud/application_default_credentials.json")
}
