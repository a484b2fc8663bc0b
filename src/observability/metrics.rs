use prometheus::{HistogramOpts, HistogramVec, IntCounter, IntCounterVec, IntGauge, Opts, Registry};
use tracing::info;
use std::sync::Arc;
use tokio::sync::OnceCell;


// Declare the static OnceCell to hold the Metrics.
static METRICS_INSTANCE: OnceCell<Arc<Metrics>> = OnceCell::const_new();

/// Asynchronously initializes and gets a reference to the process-wide `Metrics`.
pub async fn get_metrics() -> &'static Arc<Metrics> {
    METRICS_INSTANCE.get_or_init(|| async {
        info!("Initializing Metrics ...");
        Metrics::new()}
    ).await
}


#[derive(Clone)]
pub struct Metrics {
    pub registry: Registry,

    // Reconciliation cycle
    pub cycles: IntCounter,
    pub cycle_failures: IntCounterVec,
    pub cycle_duration: HistogramVec,
    pub handoff_timeouts: IntCounter,

    // Discovery
    pub directory_failures: IntCounterVec,
    pub backends_processed: IntCounterVec,
    pub backend_failures: IntCounterVec,

    // Credentials
    pub credential_fetches: IntCounterVec,
    pub credential_failures: IntCounterVec,
    pub credential_cache_hits: IntCounter,
    pub cached_credentials: IntGauge,

    // Emitted configuration
    pub routers_emitted: IntGauge,
    pub middlewares_emitted: IntGauge,
    pub route_conflicts: IntCounterVec,
    pub snapshot_writes: IntCounterVec,

    // Config/runtime
    pub config_validation_errors: IntCounter,
    pub up: IntGauge,
}

impl Metrics {
    fn new() -> Arc<Self> {
        let registry = Registry::new_custom(Some("routeagent".into()), None).unwrap();

        let metrics: Arc<Metrics> = Arc::new(Self {
            // Cycle
            cycles: IntCounter::new("reconcile_cycles_total", "Reconciliation cycles started").unwrap(),
            cycle_failures: IntCounterVec::new(Opts::new("reconcile_cycle_failures_total", "Failed cycles by reason"),&["reason"],).unwrap(),
            cycle_duration: HistogramVec::new(HistogramOpts::new("reconcile_cycle_duration_seconds", "Cycle duration seconds").buckets(vec![0.05, 0.1, 0.25, 0.5, 1.0, 2.5, 5.0, 10.0, 30.0]),&["outcome"],).unwrap(),
            handoff_timeouts: IntCounter::new("handoff_timeouts_total", "Snapshots not consumed in time").unwrap(),

            // Discovery
            directory_failures: IntCounterVec::new(Opts::new("directory_failures_total", "Directory listing failures by project"),&["project"],).unwrap(),
            backends_processed: IntCounterVec::new(Opts::new("backends_processed_total", "Backends turned into routes"),&["project"],).unwrap(),
            backend_failures: IntCounterVec::new(Opts::new("backend_failures_total", "Backends skipped by reason"),&["project", "reason"],).unwrap(),

            // Credentials
            credential_fetches: IntCounterVec::new(Opts::new("credential_fetches_total", "Identity token fetches by source"),&["source"],).unwrap(),
            credential_failures: IntCounterVec::new(Opts::new("credential_failures_total", "Identity token failures by reason"),&["reason"],).unwrap(),
            credential_cache_hits: IntCounter::new("credential_cache_hits_total", "Identity tokens served from cache").unwrap(),
            cached_credentials: IntGauge::new("cached_credentials", "Identity tokens currently cached").unwrap(),

            // Emitted
            routers_emitted: IntGauge::new("routers_emitted", "Routers in the last snapshot").unwrap(),
            middlewares_emitted: IntGauge::new("middlewares_emitted", "Middlewares in the last snapshot").unwrap(),
            route_conflicts: IntCounterVec::new(Opts::new("route_conflicts_total", "Route ownership decisions on contested routes"),&["decision"],).unwrap(),
            snapshot_writes: IntCounterVec::new(Opts::new("snapshot_writes_total", "Snapshot file writes by outcome"),&["outcome"],).unwrap(),

            // Config/runtime
            config_validation_errors: IntCounter::new("config_validation_errors_total","Validation errors during startup",).unwrap(),
            up: IntGauge::new("up", "1 if service is healthy").unwrap(),

            registry,
        });

        // Register all metrics in the registry
        let reg = &metrics.registry;
        reg.register(Box::new(metrics.cycles.clone())).unwrap();
        reg.register(Box::new(metrics.cycle_failures.clone())).unwrap();
        reg.register(Box::new(metrics.cycle_duration.clone())).unwrap();
        reg.register(Box::new(metrics.handoff_timeouts.clone())).unwrap();
        reg.register(Box::new(metrics.directory_failures.clone())).unwrap();
        reg.register(Box::new(metrics.backends_processed.clone())).unwrap();
        reg.register(Box::new(metrics.backend_failures.clone())).unwrap();
        reg.register(Box::new(metrics.credential_fetches.clone())).unwrap();
        reg.register(Box::new(metrics.credential_failures.clone())).unwrap();
        reg.register(Box::new(metrics.credential_cache_hits.clone())).unwrap();
        reg.register(Box::new(metrics.cached_credentials.clone())).unwrap();
        reg.register(Box::new(metrics.routers_emitted.clone())).unwrap();
        reg.register(Box::new(metrics.middlewares_emitted.clone())).unwrap();
        reg.register(Box::new(metrics.route_conflicts.clone())).unwrap();
        reg.register(Box::new(metrics.snapshot_writes.clone())).unwrap();
        reg.register(Box::new(metrics.config_validation_errors.clone())).unwrap();
        reg.register(Box::new(metrics.up.clone())).unwrap();

        metrics
    }
}
