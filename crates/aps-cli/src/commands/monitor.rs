//! Monitor command implementation

use std::sync::Arc;

use anyhow::Result;

use aps_core::traits::{ConvertStatusSource, FleetDirectory};
use aps_fleet::RestStatusSource;
use aps_monitor::{spawn_monitor, MonitorHandle};

use crate::context::Settings;
use crate::output::{self, print_info, print_success};

/// Execute the monitor command against one cluster
pub async fn monitor_command(settings: &Settings, cluster: &str) -> Result<()> {
    let store = settings.open_store()?;
    let controllers = store.cluster_members(cluster)?;
    let credentials = settings.credentials()?;
    let api = settings.api_client()?;
    let interval = settings.config.monitor.interval;

    print_info(&format!(
        "Monitoring cluster '{}' every {}s; Ctrl+C stops it",
        cluster,
        interval.as_secs()
    ));

    let source: Arc<dyn ConvertStatusSource> = Arc::new(RestStatusSource::new(api));
    let handle = spawn_monitor(source, credentials, cluster, controllers, interval);
    watch_until_interrupt(handle).await
}

/// Print a dashboard for every completed cycle until Ctrl+C, then the
/// terminal summary
pub(super) async fn watch_until_interrupt(handle: MonitorHandle) -> Result<()> {
    let mut snapshots = handle.snapshots();
    let mut finished_noted = false;

    loop {
        tokio::select! {
            _ = tokio::signal::ctrl_c() => break,
            changed = snapshots.changed() => {
                if changed.is_err() {
                    break;
                }
                let progress = snapshots.borrow_and_update().clone();
                println!("{}", output::format_dashboard(&progress));
                if !finished_noted && progress.all_completed() {
                    print_success("Every tracked AP has completed; Ctrl+C to stop");
                    finished_noted = true;
                }
            }
        }
    }

    handle.cancel();
    if let Some(summary) = handle.join().await {
        println!("{}", output::format_monitor_summary(&summary));
    }
    Ok(())
}
