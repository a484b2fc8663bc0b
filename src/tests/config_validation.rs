#[cfg(test)]
mod tests {
    use std::path::Path;

    use serial_test::serial;

    use crate::config::proc_loader::{expand_env_vars, file_to_config, parse_config};
    use crate::config::proc_validator::validate_service_config;
    use crate::config::settings::LogFormat;
    use crate::reconciler::ReconcilerSettings;
    use crate::ServiceConfig;

    #[tokio::test]
    #[serial]
    async fn demo_config_is_valid() {
        let path = Path::new("demos/route-agent.yaml");
        let service_config: ServiceConfig = file_to_config(path)
            .await
            .expect("demos/route-agent.yaml must exist in repo root for tests");
        validate_service_config(&service_config).await.unwrap();

        assert_eq!(service_config.discovery.project_ids, vec!["labs-stg"]);
        assert_eq!(service_config.routing.forward_auth_middlewares.len(), 3);
        assert!(service_config.settings.metrics.is_enabled);
    }

    #[tokio::test]
    async fn minimal_config_gets_defaults() {
        let yaml = r#"
discovery:
  project_ids: [labs-stg, labs-prd]
  region: europe-west1
"#;
        let cfg = parse_config(yaml.to_string()).await.unwrap();

        assert_eq!(cfg.discovery.poll_interval_seconds, 30);
        assert_eq!(cfg.discovery.region, "europe-west1");
        assert!(cfg.discovery.api_base_url.is_none());
        assert_eq!(cfg.credentials.metadata_url, "http://metadata.google.internal");
        assert_eq!(cfg.credentials.fetch_timeout_seconds, 5);
        assert_eq!(cfg.routing.label_namespace, "traefik");
        assert_eq!(cfg.routing.identity_marker, "home-index");
        assert_eq!(cfg.routing.handoff_timeout_seconds, 60);
        assert!(!cfg.routing.user_auth_enabled);
        assert_eq!(cfg.output.path, "/etc/traefik/dynamic/routes.yml");
        assert_eq!(cfg.settings.safety_margin_seconds, Some(60));
        assert_eq!(cfg.settings.logging.as_ref().map(|l| l.format.clone()), Some(LogFormat::Compact));

        let settings = ReconcilerSettings::from_config(&cfg);
        assert_eq!(settings.project_ids, vec!["labs-stg", "labs-prd"]);
        assert_eq!(settings.retry.attempts, 3);
        assert_eq!(settings.handoff_timeout.as_secs(), 60);
    }

    #[tokio::test]
    async fn invalid_config_reports_all_errors() {
        let invalid_yaml = r#"
settings:
  server:
    port: "not-a-port"
  retry:
    attempts: 0
    base_delay_ms: 500
    max_delay_ms: 100
discovery:
  project_ids: [labs-stg, labs-stg, ""]
  region: ""
  poll_interval_seconds: 0
credentials:
  metadata_url: metadata.google.internal
routing:
  label_namespace: my_ns
  handoff_timeout_seconds: 0
output:
  path: ""
"#;
        let err = parse_config(invalid_yaml.to_string()).await.unwrap_err();
        let message = err.to_string();

        assert!(message.starts_with("config is not valid"), "{}", message);
        for expected in [
            "settings.server.port",
            "settings.retry.attempts",
            "max_delay_ms (100) must be >= base_delay_ms (500)",
            "contains 'labs-stg' twice",
            "contains an empty id",
            "discovery.region",
            "poll_interval_seconds",
            "credentials.metadata_url",
            "routing.label_namespace 'my_ns'",
            "handoff_timeout_seconds",
            "output.path",
        ] {
            assert!(message.contains(expected), "missing '{}' in:\n{}", expected, message);
        }
    }

    #[tokio::test]
    async fn missing_discovery_is_a_parse_error() {
        let err = parse_config("routing:\n  label_namespace: traefik\n".to_string()).await.unwrap_err();
        assert!(err.to_string().contains("discovery"), "{}", err);
    }

    #[test]
    #[serial]
    fn env_placeholders_expand_with_defaults() {
        std::env::set_var("ROUTE_AGENT_TEST_REGION", "asia-east1");
        std::env::remove_var("ROUTE_AGENT_TEST_MISSING");

        let expanded = expand_env_vars("region: ${ROUTE_AGENT_TEST_REGION:us-central1}\nproject: ${ROUTE_AGENT_TEST_MISSING:labs-stg}\nempty: ${ROUTE_AGENT_TEST_MISSING}");
        assert_eq!(expanded, "region: asia-east1\nproject: labs-stg\nempty: ");

        std::env::remove_var("ROUTE_AGENT_TEST_REGION");
    }

    #[test]
    #[serial]
    fn dev_mode_is_detected_from_cloud_run_environment() {
        let mut credentials = crate::config::service::CredentialsConfig::default();

        std::env::set_var("K_SERVICE", "route-agent");
        assert!(!credentials.is_dev_mode());
        std::env::remove_var("K_SERVICE");
        assert!(credentials.is_dev_mode());

        credentials.dev_mode = Some(false);
        assert!(!credentials.is_dev_mode());
    }
}
