use serde::Deserialize;
use std::time::Duration;

use crate::config::settings::SettingsConfig;
use crate::utils::constants::*;

/// ================================
/// Full service configuration
/// ================================
#[derive(Debug, Deserialize, Clone)]
pub struct ServiceConfig {
    #[serde(default)]
    pub settings: SettingsConfig,
    pub discovery: DiscoveryConfig,
    #[serde(default)]
    pub credentials: CredentialsConfig,
    #[serde(default)]
    pub routing: RoutingConfig,
    #[serde(default)]
    pub output: OutputConfig,
}

/// ================================
/// Discovery - which partitions to list
/// ================================
#[derive(Debug, Deserialize, Clone)]
pub struct DiscoveryConfig {
    pub project_ids: Vec<String>,
    pub region: String,
    #[serde(default = "default_poll_interval_seconds")]
    pub poll_interval_seconds: u64,
    /// overrides `https://{region}-run.googleapis.com`
    pub api_base_url: Option<String>,
}

impl DiscoveryConfig {
    pub fn poll_interval(&self) -> Duration {
        Duration::from_secs(self.poll_interval_seconds)
    }
}

/// ================================
/// Credentials - identity tokens for backends
/// ================================
#[derive(Debug, Deserialize, Clone)]
pub struct CredentialsConfig {
    /// None => auto-detect (dev mode when K_SERVICE is absent)
    pub dev_mode: Option<bool>,
    #[serde(default = "default_metadata_url")]
    pub metadata_url: String,
    #[serde(default = "default_fetch_timeout_seconds")]
    pub fetch_timeout_seconds: u64,
    /// application default credentials file, used only in dev mode
    pub adc_path: Option<String>,
}

impl Default for CredentialsConfig {
    fn default() -> Self {
        Self {
            dev_mode: None,
            metadata_url: default_metadata_url(),
            fetch_timeout_seconds: default_fetch_timeout_seconds(),
            adc_path: None,
        }
    }
}

impl CredentialsConfig {
    pub fn is_dev_mode(&self) -> bool {
        self.dev_mode
            .unwrap_or_else(|| std::env::var(ENV_CLOUD_RUN_SERVICE).is_err())
    }

    pub fn fetch_timeout(&self) -> Duration {
        Duration::from_secs(self.fetch_timeout_seconds)
    }
}

/// ================================
/// Routing - label namespace and emitted policy
/// ================================
#[derive(Debug, Deserialize, Clone)]
pub struct RoutingConfig {
    #[serde(default = "default_label_namespace")]
    pub label_namespace: String,
    #[serde(default)]
    pub user_auth_enabled: bool,
    #[serde(default = "default_identity_marker")]
    pub identity_marker: String,
    #[serde(default = "default_forward_auth_middlewares")]
    pub forward_auth_middlewares: Vec<String>,
    #[serde(default = "default_handoff_timeout_seconds")]
    pub handoff_timeout_seconds: u64,
}

impl Default for RoutingConfig {
    fn default() -> Self {
        Self {
            label_namespace: default_label_namespace(),
            user_auth_enabled: false,
            identity_marker: default_identity_marker(),
            forward_auth_middlewares: default_forward_auth_middlewares(),
            handoff_timeout_seconds: default_handoff_timeout_seconds(),
        }
    }
}

impl RoutingConfig {
    pub fn handoff_timeout(&self) -> Duration {
        Duration::from_secs(self.handoff_timeout_seconds)
    }
}

/// ================================
/// Output - where the file consumer writes snapshots
/// ================================
#[derive(Debug, Deserialize, Clone)]
pub struct OutputConfig {
    #[serde(default = "default_output_path")]
    pub path: String,
}

impl Default for OutputConfig {
    fn default() -> Self {
        Self { path: default_output_path() }
    }
}

fn default_poll_interval_seconds() -> u64 {
    DEFAULT_POLL_INTERVAL_SECS
}

fn default_metadata_url() -> String {
    DEFAULT_METADATA_URL.to_string()
}

fn default_fetch_timeout_seconds() -> u64 {
    DEFAULT_FETCH_TIMEOUT_SECS
}

fn default_label_namespace() -> String {
    DEFAULT_LABEL_NAMESPACE.to_string()
}

fn default_identity_marker() -> String {
    DEFAULT_IDENTITY_MARKER.to_string()
}

fn default_forward_auth_middlewares() -> Vec<String> {
    DEFAULT_FORWARD_AUTH_MIDDLEWARES.iter().map(|name| name.to_string()).collect()
}

fn default_handoff_timeout_seconds() -> u64 {
    DEFAULT_HANDOFF_TIMEOUT_SECS
}

fn default_output_path() -> String {
    DEFAULT_OUTPUT_PATH.to_string()
}
