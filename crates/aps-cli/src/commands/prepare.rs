//! Prepare command implementation

use anyhow::{bail, Result};

use aps_console::SshConnector;
use aps_core::traits::FleetDirectory;
use aps_core::SessionState;
use aps_fleet::FleetStore;
use aps_orchestrator::{prepare_for_migration, PrepareTarget};

use crate::context::{confirm, Settings, StdinAdvisor};
use crate::output::{self, print_info, print_warning};

/// Execute the prepare command against one cluster
pub async fn prepare_command(settings: &Settings, cluster: &str) -> Result<()> {
    let store = settings.open_store()?;
    let targets = prepare_targets(&store, cluster)?;

    println!("Prepare will disable redundancy and AP load-balancing on:");
    for target in &targets {
        println!(
            "  {} ({}) at {}",
            target.host, target.address, target.node_path
        );
    }
    warn_stale_profile_names(&store, cluster, &targets)?;
    if !confirm("Proceed?", settings.assume_yes)? {
        print_warning("Aborted");
        return Ok(());
    }

    let credentials = settings.credentials()?;
    let connector = SshConnector::new();
    let advisor = StdinAdvisor;
    let mut state = SessionState::new();

    let report = prepare_for_migration(
        &connector,
        &credentials,
        &targets,
        &advisor,
        &settings.config.console,
        &mut state,
    )
    .await;

    println!("{}", output::format_workflow(&report.summary));
    output::report_workflow("Prepare", &report.summary);
    if let Some(target) = state.migration_target() {
        print_info(&format!(
            "Recorded migration target: cluster '{}' at {}",
            target.cluster_name, target.node_path
        ));
        print_info("Targets live for the process only; 'ap-shift run' keeps them until cleanup");
    }

    if !report.summary.all_succeeded() {
        bail!(
            "Prepare failed on {} host(s)",
            report.summary.total() - report.summary.success_count()
        );
    }
    Ok(())
}

/// Warn when the directory records no profile named after the cluster
/// at a target's hierarchy node.
///
/// Controllers report their live membership name while the profile at
/// the node may carry a different one; the migration workflow falls
/// back to the discovered name in that case, so the mismatch is worth
/// surfacing before the operator confirms.
pub(super) fn warn_stale_profile_names(
    store: &FleetStore,
    cluster: &str,
    targets: &[PrepareTarget],
) -> Result<()> {
    let mut paths: Vec<_> = targets.iter().map(|t| &t.node_path).collect();
    paths.sort_by(|a, b| a.as_str().cmp(b.as_str()));
    paths.dedup();
    for path in paths {
        let recorded = store.clusters_for_node_path(path)?;
        if !recorded.iter().any(|name| name == cluster) {
            print_warning(&format!(
                "No controller at {} reports cluster '{}'; the profile name may differ",
                path, cluster
            ));
        }
    }
    Ok(())
}

/// One prepare target per member of the cluster
pub(super) fn prepare_targets(store: &FleetStore, cluster: &str) -> Result<Vec<PrepareTarget>> {
    let members = store.cluster_members(cluster)?;
    Ok(members
        .into_iter()
        .map(|controller| PrepareTarget {
            host: controller.name,
            address: controller.address,
            node_path: controller.node_path,
            cluster_name: cluster.to_string(),
        })
        .collect())
}
