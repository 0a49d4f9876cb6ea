//! Cleanup command implementation

use anyhow::{bail, Result};

use aps_console::SshConnector;
use aps_core::traits::FleetDirectory;
use aps_core::SessionState;
use aps_orchestrator::{cleanup_and_restore, RestorationPlan};

use crate::context::{confirm, Settings};
use crate::output::{self, print_error, print_success, print_warning};

/// Execute the cleanup command.
///
/// A one-shot invocation has no recorded migration target, so the
/// restoration plan always falls back to every resolved cluster the
/// directory knows.
pub async fn cleanup_command(settings: &Settings) -> Result<()> {
    let store = settings.open_store()?;
    let conductor = settings.conductor()?;

    let controllers = store.controllers()?;
    if controllers.is_empty() {
        print_warning("Inventory is empty; nothing to clean up");
        return Ok(());
    }

    let mut state = SessionState::new();
    let plan = RestorationPlan::resolve(&state, &store)?;
    println!(
        "{}",
        output::format_cleanup_plan(&controllers, &plan, &conductor)
    );
    if plan.full_fleet {
        print_warning(
            "No recorded migration target; every resolved cluster profile will be restored",
        );
    }
    if !confirm("Proceed?", settings.assume_yes)? {
        print_warning("Aborted");
        return Ok(());
    }

    let credentials = settings.credentials()?;
    let connector = SshConnector::new();
    let report = cleanup_and_restore(
        &connector,
        &credentials,
        &controllers,
        &conductor,
        &plan,
        &settings.config.console,
        &mut state,
    )
    .await;

    println!("Clear phase:");
    println!("{}", output::format_workflow(&report.clear_summary));
    println!();
    println!("Restore phase:");
    println!("{}", output::format_workflow(&report.restore_summary));

    if report.clear_summary.all_succeeded() && report.restore_summary.all_succeeded() {
        print_success("Cleanup and restore completed");
        Ok(())
    } else {
        print_error("Cleanup finished with failures");
        bail!("Cleanup left the fleet partially restored");
    }
}
