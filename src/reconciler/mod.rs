//! Periodic re-derivation of the routing configuration.
//!
//! Each cycle lists every project, turns opted-in backends into routes and
//! hands one complete snapshot to the consumer. Failures are isolated per
//! project and per backend; a cycle never emits a partial snapshot of one backend.

use std::time::Duration;

use tokio::sync::mpsc::error::SendTimeoutError;
use tokio::sync::mpsc::Sender;
use tracing::{debug, error, info, warn};

use crate::config::service::ServiceConfig;
use crate::credentials::manager::CredentialManager;
use crate::discovery::{BackendDescriptor, ServiceDirectory};
use crate::errors::ReconcileError;
use crate::helpers::time::get_instant;
use crate::observability::metrics::get_metrics;
use crate::parser::labels::LabelParser;
use crate::resilience::retry::RetrySettings;
use crate::routing::assembler::{AssemblyPolicy, ConfigAssembler};
use crate::routing::types::RoutingConfiguration;

pub mod handle;

pub use handle::ReconcilerHandle;

static NO_ROUTES_MSG: &str = "no_routes";
static HANDOFF_TIMEOUT_MSG: &str = "handoff_timeout";
static CONSUMER_CLOSED_MSG: &str = "consumer_closed";

#[derive(Debug, Clone)]
pub struct ReconcilerSettings {
    pub project_ids: Vec<String>,
    pub region: String,
    pub poll_interval: Duration,
    pub handoff_timeout: Duration,
    pub identity_marker: String,
    pub label_namespace: String,
    pub policy: AssemblyPolicy,
    pub retry: RetrySettings,
}

impl ReconcilerSettings {
    pub fn from_config(cfg: &ServiceConfig) -> Self {
        Self {
            project_ids: cfg.discovery.project_ids.clone(),
            region: cfg.discovery.region.clone(),
            poll_interval: cfg.discovery.poll_interval(),
            handoff_timeout: cfg.routing.handoff_timeout(),
            identity_marker: cfg.routing.identity_marker.clone(),
            label_namespace: cfg.routing.label_namespace.clone(),
            policy: AssemblyPolicy::from_config(&cfg.routing),
            retry: RetrySettings::from_config(cfg.settings.retry.as_ref()),
        }
    }
}

pub struct Reconciler<D: ServiceDirectory> {
    directory: D,
    credentials: CredentialManager,
    parser: LabelParser,
    settings: ReconcilerSettings,
}

impl<D: ServiceDirectory> Reconciler<D> {
    pub fn new(directory: D, credentials: CredentialManager, settings: ReconcilerSettings) -> Self {
        Self {
            directory,
            credentials,
            parser: LabelParser::new(&settings.label_namespace),
            settings,
        }
    }

    /// One full pass over every project. Per-project and per-backend failures
    /// are logged and skipped, so this never fails as a whole.
    pub async fn build_configuration(&self) -> RoutingConfiguration {
        let metrics = get_metrics().await;
        let mut assembler = ConfigAssembler::new(self.settings.policy.clone());
        let mut identity_url: Option<String> = None;
        let region = self.settings.region.as_str();

        for project in &self.settings.project_ids {
            let backends = match self
                .settings
                .retry
                .run_with_retry(|| self.directory.list_backends(project, region))
                .await
            {
                Ok(backends) => backends,
                Err(e) => {
                    let err = ReconcileError::DirectoryQuery { project: project.clone(), reason: format!("{:#}", e) };
                    metrics.directory_failures.with_label_values(&[project.as_str()]).inc();
                    error!(project = %project, region = %region, "{}", err);
                    continue;
                }
            };

            let mut enabled = 0usize;
            for backend in &backends {
                if !self.parser.is_enabled(&backend.labels) {
                    debug!(backend = %backend.name, key = self.parser.enable_key(), "skipping backend, not opted in");
                    continue;
                }
                enabled += 1;

                if let Err(err) = self.add_backend(&mut assembler, backend).await {
                    metrics.backend_failures.with_label_values(&[project.as_str(), NO_ROUTES_MSG]).inc();
                    warn!(backend = %backend.name, project = %project, "{}", err);
                    continue;
                }
                metrics.backends_processed.with_label_values(&[project.as_str()]).inc();

                if backend.name.contains(&self.settings.identity_marker) && !backend.url.is_empty() {
                    info!(backend = %backend.name, url = %backend.url, "identity backend found");
                    identity_url = Some(backend.url.clone());
                }
            }

            if enabled == 0 {
                warn!(project = %project, services = backends.len(), "no opted-in backends in project");
            } else {
                info!(project = %project, enabled, services = backends.len(), "project processed");
            }
        }

        let config = assembler.finish(identity_url.as_deref());
        metrics.routers_emitted.set(config.routers.len() as i64);
        metrics.middlewares_emitted.set(config.middlewares.len() as i64);
        config
    }

    /// Parse, fetch the credential (failure only omits the middleware), assemble.
    async fn add_backend(
        &self,
        assembler: &mut ConfigAssembler,
        backend: &BackendDescriptor,
    ) -> Result<(), ReconcileError> {
        let parsed = self.parser.parse(&backend.name, &backend.labels)?;

        let credential = match self.credentials.get_credential(&backend.url).await {
            Ok(token) => Some(token),
            Err(e) => {
                warn!(backend = %backend.name, audience = %backend.url, "{}, continuing without credential middleware", e);
                None
            }
        };

        let outcome = assembler.add_backend(backend, parsed, credential.as_deref());
        let metrics = get_metrics().await;
        metrics
            .route_conflicts
            .with_label_values(&["replaced"])
            .inc_by(outcome.replaced.len() as u64);
        metrics
            .route_conflicts
            .with_label_values(&["rejected"])
            .inc_by(outcome.rejected.len() as u64);
        debug!(
            backend = %backend.name,
            service = %outcome.service,
            accepted = outcome.accepted.len(),
            rejected = outcome.rejected.len(),
            "backend assembled"
        );
        Ok(())
    }

    /// Build a snapshot and hand it off, waiting at most the handoff timeout
    /// for the consumer to free the slot.
    pub async fn reconcile_once(&self, tx: &Sender<RoutingConfiguration>) -> Result<(), ReconcileError> {
        let metrics = get_metrics().await;
        let started = get_instant();
        metrics.cycles.inc();

        let config = self.build_configuration().await;
        let routers = config.routers.len();
        let result = match tx.send_timeout(config, self.settings.handoff_timeout).await {
            Ok(()) => Ok(()),
            Err(SendTimeoutError::Timeout(_)) => {
                metrics.handoff_timeouts.inc();
                metrics.cycle_failures.with_label_values(&[HANDOFF_TIMEOUT_MSG]).inc();
                Err(ReconcileError::HandoffTimeout(self.settings.handoff_timeout))
            }
            Err(SendTimeoutError::Closed(_)) => {
                metrics.cycle_failures.with_label_values(&[CONSUMER_CLOSED_MSG]).inc();
                Err(ReconcileError::ConsumerClosed)
            }
        };

        let outcome = if result.is_ok() { "ok" } else { "error" };
        let elapsed = started.elapsed();
        metrics
            .cycle_duration
            .with_label_values(&[outcome])
            .observe(elapsed.as_secs_f64());
        info!(routers, elapsed_ms = elapsed.as_millis() as u64, outcome, "reconciliation cycle finished");
        result
    }
}
