//! Configuration validation with aggregated errors.
//! - Aggregates all issues into Vec<String>
//! - Validates discovery partitions, intervals, URLs, retry and logging invariants

use std::collections::HashSet;
use tracing::{error, info};

use crate::config::service::{CredentialsConfig, DiscoveryConfig, RoutingConfig, ServiceConfig};
use crate::config::settings::{RetryConfig, SettingsConfig};
use crate::observability::metrics::get_metrics;

/// Public entrypoint: returns Ok(()) or Err(Vec<String>) containing all issues.
pub async fn validate_service_config(cfg: &ServiceConfig) -> Result<(), Vec<String>> {
    let mut errors: Vec<String> = Vec::new();

    validate_settings(&cfg.settings, &mut errors);
    validate_discovery(&cfg.discovery, &mut errors);
    validate_credentials(&cfg.credentials, &mut errors);
    validate_routing(&cfg.routing, &mut errors);

    if cfg.output.path.trim().is_empty() {
        errors.push("output.path must not be empty".to_string());
    }

    if errors.is_empty() {
        info!("config valid");
        Ok(())
    } else {
        error!("configuration validation errors ({}):", errors.len());
        for e in &errors {
            error!(" - {}", e);
        }
        get_metrics().await.config_validation_errors.inc();
        Err(errors)
    }
}

/// SETTINGS VALIDATION
fn validate_settings(settings: &SettingsConfig, errors: &mut Vec<String>) {
    if let Some(retry) = &settings.retry {
        validate_retry("settings.retry", retry, errors);
    }

    if let Some(s) = settings.safety_margin_seconds {
        if s >= 60 * 60 {
            errors.push(format!(
                "settings.safety_margin_seconds ({}) must be shorter than the token lifetime (3600)",
                s
            ));
        }
    }

    if settings.server.host.is_empty() {
        errors.push("settings.server.host must not be empty".to_string());
    }
    if settings.server.port.parse::<u16>().is_err() {
        errors.push(format!(
            "settings.server.port '{}' must be a valid port",
            settings.server.port
        ));
    }
    if settings.metrics.is_enabled && !settings.metrics.path.starts_with('/') {
        errors.push(format!(
            "settings.metrics.path '{}' must start with '/'",
            settings.metrics.path
        ));
    }

    if let Some(logging) = &settings.logging {
        let allowed = ["trace", "debug", "info", "warn", "error"];
        if !allowed.contains(&logging.level.to_lowercase().as_str()) {
            errors.push(format!(
                "settings.logging.level '{}' must be one of {:?}",
                logging.level, allowed
            ));
        }
    }
}

fn validate_retry(prefix: &str, retry: &RetryConfig, errors: &mut Vec<String>) {
    if retry.attempts == Some(0) {
        errors.push(format!("{}.attempts must be >= 1", prefix));
    }
    if let (Some(base), Some(max)) = (retry.base_delay_ms, retry.max_delay_ms) {
        if max < base {
            errors.push(format!(
                "{}.max_delay_ms ({}) must be >= base_delay_ms ({})",
                prefix, max, base
            ));
        }
    }
}

/// DISCOVERY VALIDATION
fn validate_discovery(discovery: &DiscoveryConfig, errors: &mut Vec<String>) {
    if discovery.project_ids.is_empty() {
        errors.push("discovery.project_ids is empty; at least one project required".to_string());
    }

    let mut seen = HashSet::new();
    for project in &discovery.project_ids {
        if project.trim().is_empty() {
            errors.push("discovery.project_ids contains an empty id".to_string());
        } else if !seen.insert(project.as_str()) {
            errors.push(format!("discovery.project_ids contains '{}' twice", project));
        }
    }

    if discovery.region.trim().is_empty() {
        errors.push("discovery.region must be specified".to_string());
    }
    if discovery.poll_interval_seconds == 0 {
        errors.push("discovery.poll_interval_seconds must be > 0".to_string());
    }
    if let Some(url) = &discovery.api_base_url {
        validate_url("discovery.api_base_url", url, errors);
    }
}

/// CREDENTIALS VALIDATION
fn validate_credentials(credentials: &CredentialsConfig, errors: &mut Vec<String>) {
    validate_url("credentials.metadata_url", &credentials.metadata_url, errors);
    if credentials.fetch_timeout_seconds == 0 {
        errors.push("credentials.fetch_timeout_seconds must be > 0".to_string());
    }
}

/// ROUTING VALIDATION
fn validate_routing(routing: &RoutingConfig, errors: &mut Vec<String>) {
    let ns = &routing.label_namespace;
    if ns.is_empty() || ns.contains('_') {
        errors.push(format!(
            "routing.label_namespace '{}' must be non-empty and contain no '_'",
            ns
        ));
    }
    if routing.identity_marker.trim().is_empty() {
        errors.push("routing.identity_marker must not be empty".to_string());
    }
    if routing.handoff_timeout_seconds == 0 {
        errors.push("routing.handoff_timeout_seconds must be > 0".to_string());
    }
}

fn validate_url(field: &str, url: &str, errors: &mut Vec<String>) {
    if !(url.starts_with("http://") || url.starts_with("https://")) {
        errors.push(format!("{} '{}' must be an http(s) URL", field, url));
    }
}
