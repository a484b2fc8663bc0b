use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use tokio::fs;
use tokio::sync::mpsc::Receiver;
use tracing::{debug, error, info};

use crate::helpers::time::get_instant;
use crate::observability::metrics::get_metrics;
use crate::routing::types::RoutingConfiguration;

static WRITTEN_MSG: &str = "written";
static ERROR_MSG: &str = "error";

/// Writes each snapshot as a Traefik dynamic configuration file, replacing
/// the previous one whole.
#[derive(Debug, Clone)]
pub struct FileSink {
    path: PathBuf,
}

impl FileSink {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    /// Consume snapshots until every sender is gone. A failed write is logged
    /// and the next snapshot is still taken.
    pub async fn run(self, mut rx: Receiver<RoutingConfiguration>) -> Result<()> {
        info!(path = %self.path.display(), "start sink 'type: file'");
        while let Some(config) = rx.recv().await {
            if let Err(e) = self.write_snapshot(&config).await {
                error!(path = %self.path.display(), "failed to write snapshot: {:#}", e);
            }
        }
        info!("configuration channel closed, file sink stopped");
        Ok(())
    }

    pub async fn write_snapshot(&self, config: &RoutingConfiguration) -> Result<()> {
        let metrics = get_metrics().await;
        let start = get_instant();

        let rendered = config.to_yaml().context("failed to render routing configuration")?;
        debug!(path = %self.path.display(), bytes = rendered.len(), "snapshot rendered");

        write_atomic(&self.path, &rendered).await.inspect_err(|_| {
            metrics.snapshot_writes.with_label_values(&[ERROR_MSG]).inc();
        })?;
        metrics.snapshot_writes.with_label_values(&[WRITTEN_MSG]).inc();
        info!(
            path = %self.path.display(),
            routers = config.routers.len(),
            services = config.backends.len(),
            middlewares = config.middlewares.len(),
            elapsed_ms = start.elapsed().as_millis() as u64,
            "snapshot written"
        );
        Ok(())
    }
}

/// Write to `<path>.tmp` then rename, so readers never see a partial file.
async fn write_atomic(path: &Path, contents: &str) -> Result<()> {
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        fs::create_dir_all(parent)
            .await
            .with_context(|| format!("failed to create directory {}", parent.display()))?;
    }
    let mut tmp = path.as_os_str().to_owned();
    tmp.push(".tmp");
    let tmp = PathBuf::from(tmp);

    fs::write(&tmp, contents.as_bytes())
        .await
        .with_context(|| format!("failed to write {}", tmp.display()))?;
    fs::rename(&tmp, path)
        .await
        .with_context(|| format!("failed to move {} to {}", tmp.display(), path.display()))?;
    Ok(())
}
