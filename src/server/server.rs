use anyhow::{Context, Result};
use axum::Router;
use tracing::info;
use crate::config::settings::SettingsConfig;
use crate::observability::metrics::{get_metrics, Metrics};
use crate::observability::routes::MetricsState;

#[derive(Clone)]
pub struct AppState {
    pub metrics_state: MetricsState,
}

impl AppState {
    pub fn new(metrics: &Metrics) -> Self {
        Self {
            metrics_state: MetricsState::new(metrics.registry.clone()),
        }
    }
}

/// Start the Axum server exposing the metrics route, if enabled.
pub async fn start(settings_config: &SettingsConfig) -> Result<()> {
    let metrics = get_metrics().await;
    let state = AppState::new(metrics);

    let app = Router::new()
        .merge(state.metrics_state.router(&settings_config.metrics))
        .with_state(state);

    metrics.up.set(1);
    if !app.has_routes() {
        info!("metrics disabled, http server not started");
        return Ok(());
    }

    let bind_addr = format!("{}:{}", settings_config.server.host, settings_config.server.port);
    info!("http server listening on {}", bind_addr);
    let listener = tokio::net::TcpListener::bind(&bind_addr)
        .await
        .with_context(|| format!("failed to bind {}", bind_addr))?;
    axum::serve(listener, app).await.context("http server failed")?;

    Ok(())
}
