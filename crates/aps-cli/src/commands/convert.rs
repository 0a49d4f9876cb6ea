//! Conversion engine commands

use anyhow::{bail, Result};

use aps_console::SshConnector;
use aps_core::traits::FleetDirectory;
use aps_core::SessionState;
use aps_fleet::FleetStore;
use aps_orchestrator::{add_ap_group, start_conversion, ConvertTarget};

use crate::context::{confirm, Settings};
use crate::output::{self, print_warning};

/// Execute `convert start` against one cluster
pub async fn convert_start_command(settings: &Settings, cluster: &str) -> Result<()> {
    let store = settings.open_store()?;
    let targets = convert_targets(&store, cluster)?;
    let max_downloads = settings.config.convert.max_downloads;

    println!(
        "Conversion will be armed on {} controller(s), {} concurrent downloads each:",
        targets.len(),
        max_downloads
    );
    for target in &targets {
        println!("  {} ({})", target.host, target.address);
    }
    if !confirm("Proceed?", settings.assume_yes)? {
        print_warning("Aborted");
        return Ok(());
    }

    let credentials = settings.credentials()?;
    let connector = SshConnector::new();
    let summary = start_conversion(
        &connector,
        &credentials,
        &targets,
        max_downloads,
        &settings.config.console,
    )
    .await;

    println!("{}", output::format_workflow(&summary));
    output::report_workflow("Convert start", &summary);
    if !summary.all_succeeded() {
        bail!(
            "Conversion start failed on {} host(s)",
            summary.total() - summary.success_count()
        );
    }
    Ok(())
}

/// Execute `convert add-group` against one cluster
pub async fn convert_add_group_command(
    settings: &Settings,
    cluster: &str,
    group: &str,
) -> Result<()> {
    let store = settings.open_store()?;
    let targets = convert_targets(&store, cluster)?;

    if !cluster_ap_groups(&store, cluster)?
        .iter()
        .any(|known| known == group)
    {
        print_warning(&format!(
            "AP group '{}' is not in the inventory; sending it anyway",
            group
        ));
    }

    println!(
        "AP group '{}' will be enrolled on {} controller(s):",
        group,
        targets.len()
    );
    for target in &targets {
        println!("  {} ({})", target.host, target.address);
    }
    if !confirm("Proceed?", settings.assume_yes)? {
        print_warning("Aborted");
        return Ok(());
    }

    let credentials = settings.credentials()?;
    let connector = SshConnector::new();
    let mut state = SessionState::new();
    let summary = add_ap_group(
        &connector,
        &credentials,
        &targets,
        group,
        &settings.config.console,
        &mut state,
    )
    .await;

    println!("{}", output::format_workflow(&summary));
    output::report_workflow("Add group", &summary);
    if !summary.all_succeeded() {
        bail!(
            "Group enrollment failed on {} host(s)",
            summary.total() - summary.success_count()
        );
    }
    Ok(())
}

/// One convert target per member of the cluster
pub(super) fn convert_targets(store: &FleetStore, cluster: &str) -> Result<Vec<ConvertTarget>> {
    let members = store.cluster_members(cluster)?;
    Ok(members
        .into_iter()
        .map(|controller| ConvertTarget {
            host: controller.name,
            address: controller.address,
        })
        .collect())
}

/// AP group names known anywhere in the cluster, deduplicated and sorted
pub(super) fn cluster_ap_groups(store: &FleetStore, cluster: &str) -> Result<Vec<String>> {
    let mut names = Vec::new();
    for member in store.cluster_members(cluster)? {
        names.extend(store.ap_groups_for(member.id)?);
    }
    names.sort();
    names.dedup();
    Ok(names)
}
