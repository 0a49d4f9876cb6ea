//! Cluster selection and census

use anyhow::Result;

use aps_core::traits::FleetDirectory;
use aps_fleet::FleetStore;

use crate::context::Settings;
use crate::output::{self, print_info, print_success, print_warning};

/// Execute the select-cluster command.
///
/// With no argument, lists the selectable clusters; with one, checks it
/// against the inventory and lists its controllers.
pub fn select_cluster_command(settings: &Settings, cluster: Option<&str>) -> Result<()> {
    let store = settings.open_store()?;

    match cluster {
        None => {
            let census = cluster_census(&store)?;
            if census.is_empty() {
                print_warning("No clusters in the inventory");
                print_info("Run 'ap-shift discover' to collect the fleet");
                return Ok(());
            }
            println!("{}", output::format_clusters(&census, None));
            print_info("Pass a cluster name to list its controllers");
        }
        Some(name) => {
            let rows: Vec<_> = store
                .cluster_members(name)?
                .into_iter()
                .map(|controller| (controller, Some(name.to_string())))
                .collect();
            println!("{}", output::format_controllers(&rows));
            print_success(&format!(
                "Cluster '{}' has {} controller(s)",
                name,
                rows.len()
            ));
        }
    }

    Ok(())
}

/// Selectable clusters with their member counts
pub(super) fn cluster_census(store: &FleetStore) -> Result<Vec<(String, usize)>> {
    let mut census = Vec::new();
    for name in store.selectable_clusters()? {
        let members = store.cluster_members(&name)?;
        census.push((name, members.len()));
    }
    Ok(census)
}
