//! Discover command implementation

use anyhow::Result;

use aps_fleet::discover_fleet;

use crate::context::Settings;
use crate::output::{self, print_info, print_success, print_warning};

use super::show::inventory_rows;

/// Execute the discover command
pub async fn discover_command(settings: &Settings) -> Result<()> {
    let conductor = settings.conductor()?;
    let credentials = settings.credentials()?;
    let store = settings.open_store()?;
    let api = settings.api_client()?;

    print_info(&format!("Discovering fleet through {}...", conductor));
    let outcome = discover_fleet(&api, &store, &conductor, &credentials).await?;

    for failure in &outcome.failures {
        print_warning(&format!("{}: {}", failure.address, failure.detail));
    }

    println!("{}", output::format_controllers(&inventory_rows(&store)?));
    println!();
    println!("{}", output::format_ap_models(&outcome.ap_models));

    print_success(&format!(
        "Discovered {} controller(s) and {} AP group(s)",
        outcome.controllers.len(),
        outcome.ap_group_count
    ));
    Ok(())
}
