//! Show command implementation

use anyhow::Result;

use aps_core::traits::FleetDirectory;
use aps_core::Controller;
use aps_fleet::FleetStore;

use crate::context::Settings;
use crate::output::{self, print_info, print_warning};

use super::select::cluster_census;

/// Execute the show command
pub fn show_command(settings: &Settings) -> Result<()> {
    let store = settings.open_store()?;
    render_inventory(&store)
}

/// Print the full collected inventory
pub(super) fn render_inventory(store: &FleetStore) -> Result<()> {
    let rows = inventory_rows(store)?;
    if rows.is_empty() {
        print_warning("Inventory is empty");
        print_info("Run 'ap-shift discover' to collect the fleet");
        return Ok(());
    }

    println!("Controllers:");
    println!("{}", output::format_controllers(&rows));

    println!();
    println!("Clusters:");
    println!("{}", output::format_clusters(&cluster_census(store)?, None));

    println!();
    println!("AP groups:");
    println!("{}", output::format_ap_groups(&store.ap_groups_detailed()?));

    let models = store.ap_models()?;
    println!();
    println!("AP hardware:");
    println!("{}", output::format_ap_models(&models));

    let total: u64 = models.iter().map(|(_, count)| count).sum();
    print_info(&format!("{} AP(s) across {} model(s)", total, models.len()));
    Ok(())
}

/// Controllers paired with their resolved cluster, in store order
pub(super) fn inventory_rows(store: &FleetStore) -> Result<Vec<(Controller, Option<String>)>> {
    let mut rows = Vec::new();
    for controller in store.controllers()? {
        let cluster = store.membership(controller.id)?.map(|m| m.cluster_name);
        rows.push((controller, cluster));
    }
    Ok(rows)
}
