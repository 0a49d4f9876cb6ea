//! Monitoring task and its handle
//!
//! One background task owns the polling loop. Cancellation is checked
//! at cycle boundaries, never mid-cycle, so a cycle that is already
//! fetching finishes and lands in the ledger before the task stops.

use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use futures::future::join_all;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};

use aps_core::traits::ConvertStatusSource;
use aps_core::{Controller, Credentials};

use crate::parse::parse_convert_status;
use crate::progress::{FleetProgress, HostCycle, MonitorSummary};

/// Handle on a running monitor.
///
/// Snapshots stream over a watch channel after every cycle; `cancel`
/// stops the loop at the next cycle boundary, and `join` waits it out
/// and hands back the final summary.
pub struct MonitorHandle {
    snapshots: watch::Receiver<FleetProgress>,
    cancel: CancellationToken,
    task: JoinHandle<MonitorSummary>,
}

impl MonitorHandle {
    /// Subscribe to progress snapshots
    pub fn snapshots(&self) -> watch::Receiver<FleetProgress> {
        self.snapshots.clone()
    }

    /// Ask the monitor to stop once the cycle in flight is done
    pub fn cancel(&self) {
        self.cancel.cancel();
    }

    /// Wait for the monitor to stop and take its final summary
    pub async fn join(self) -> Option<MonitorSummary> {
        match self.task.await {
            Ok(summary) => Some(summary),
            Err(e) => {
                warn!(error = %e, "monitor task did not finish cleanly");
                None
            }
        }
    }
}

/// Spawn the monitoring loop over a fixed controller set.
///
/// The controller list is captured here, once; changes to the
/// operator's selection never alter a monitor that is already running.
pub fn spawn_monitor(
    source: Arc<dyn ConvertStatusSource>,
    credentials: Credentials,
    cluster: impl Into<String>,
    controllers: Vec<Controller>,
    interval: Duration,
) -> MonitorHandle {
    let progress = FleetProgress::new(cluster, &controllers);
    let (tx, rx) = watch::channel(progress.clone());
    let cancel = CancellationToken::new();
    let token = cancel.clone();

    let task = tokio::spawn(async move {
        let mut progress = progress;
        info!(
            cluster = %progress.cluster,
            controllers = controllers.len(),
            interval_secs = interval.as_secs(),
            "monitor started"
        );

        loop {
            if token.is_cancelled() {
                break;
            }

            let cycle = run_cycle(source.as_ref(), &credentials, &controllers).await;
            progress.apply_cycle(cycle, Utc::now());
            // Nobody may be watching anymore; the ledger carries on.
            let _ = tx.send(progress.clone());

            tokio::select! {
                _ = token.cancelled() => break,
                _ = tokio::time::sleep(interval) => {}
            }
        }

        let summary = progress.summary(Utc::now());
        info!(
            cluster = %summary.cluster,
            cycles = summary.cycles,
            completed = summary.completed,
            still_converting = summary.still_converting,
            unresolved = summary.unresolved,
            "monitor stopped"
        );
        summary
    });

    MonitorHandle {
        snapshots: rx,
        cancel,
        task,
    }
}

/// Fetch and parse every controller's status once.
///
/// Fetches run concurrently and results come back in the controllers'
/// declared order; a failed fetch leaves that host offline for this
/// cycle only.
async fn run_cycle(
    source: &dyn ConvertStatusSource,
    credentials: &Credentials,
    controllers: &[Controller],
) -> Vec<HostCycle> {
    let fetches = controllers.iter().map(|controller| async move {
        match source
            .fetch_convert_status(&controller.address, credentials)
            .await
        {
            Ok(payload) => HostCycle {
                host: controller.name.clone(),
                address: controller.address.clone(),
                snapshot: Some(parse_convert_status(&payload)),
            },
            Err(e) => {
                warn!(host = %controller.name, error = %e, "status fetch failed");
                HostCycle {
                    host: controller.name.clone(),
                    address: controller.address.clone(),
                    snapshot: None,
                }
            }
        }
    });
    join_all(fetches).await
}
