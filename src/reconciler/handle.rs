use std::sync::Arc;

use tokio::sync::mpsc::Sender;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tokio::time::{interval, MissedTickBehavior};
use tracing::{error, info};

use crate::discovery::ServiceDirectory;
use crate::errors::ReconcileError;
use crate::reconciler::Reconciler;
use crate::routing::types::RoutingConfiguration;

/// Running timer loop; dropping the handle stops it like [`ReconcilerHandle::stop`].
#[derive(Debug)]
pub struct ReconcilerHandle {
    stop_tx: watch::Sender<bool>,
    task: JoinHandle<()>,
}

impl ReconcilerHandle {
    /// No further ticks start; a cycle already running completes.
    pub fn stop(&self) {
        let _ = self.stop_tx.send(true);
    }

    pub async fn join(self) -> anyhow::Result<()> {
        self.task.await?;
        Ok(())
    }
}

impl<D> Reconciler<D>
where
    D: ServiceDirectory + 'static,
{
    /// First cycle runs inline so its error reaches the caller; later cycles
    /// run on the poll interval and only log their errors.
    pub async fn start(
        self: Arc<Self>,
        tx: Sender<RoutingConfiguration>,
    ) -> Result<ReconcilerHandle, ReconcileError> {
        self.reconcile_once(&tx).await?;

        let (stop_tx, mut stop_rx) = watch::channel(false);
        let period = self.settings.poll_interval;
        let reconciler = Arc::clone(&self);

        let task = tokio::spawn(async move {
            let mut ticker = interval(period);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
            // first tick completes immediately, the initial cycle already ran
            ticker.tick().await;
            info!(interval_secs = period.as_secs(), "reconciliation loop started");

            loop {
                tokio::select! {
                    changed = stop_rx.changed() => {
                        if changed.is_err() || *stop_rx.borrow() {
                            break;
                        }
                    }
                    _ = ticker.tick() => {
                        if let Err(e) = reconciler.reconcile_once(&tx).await {
                            error!("reconciliation cycle failed, retrying next tick: {}", e);
                        }
                    }
                }
            }
            info!("reconciliation loop stopped");
        });

        Ok(ReconcilerHandle { stop_tx, task })
    }
}
