//! Interactive migration session
//!
//! One process, one [`SessionState`]. The cluster selection, enrolled
//! AP groups, and the recorded migration target live across menu
//! actions until cleanup drops them or the operator quits.

use std::sync::Arc;

use anyhow::{bail, Result};

use aps_console::SshConnector;
use aps_core::traits::{ConvertStatusSource, FleetDirectory};
use aps_core::{Credentials, SessionState};
use aps_fleet::{discover_fleet, FleetStore, RestStatusSource};
use aps_monitor::spawn_monitor;
use aps_orchestrator::{
    add_ap_group, cleanup_and_restore, prepare_for_migration, start_conversion, RestorationPlan,
};

use crate::context::{confirm, prompt_line, Settings, StdinAdvisor};
use crate::output::{self, print_error, print_info, print_success, print_warning};

/// Execute the interactive session loop.
///
/// Credentials are collected once up front. The conductor address is
/// resolved lazily because only discovery and cleanup need it.
pub async fn run_command(settings: &Settings) -> Result<()> {
    let store = settings.open_store()?;
    let credentials = settings.credentials()?;
    let connector = SshConnector::new();
    let mut state = SessionState::new();
    let mut conductor = settings.conductor_configured().map(str::to_string);

    loop {
        println!("{}", menu(&state));
        let choice = prompt_line("Select an option")?;
        let result = match choice.as_str() {
            "1" => menu_discover(settings, &store, &credentials, &mut conductor).await,
            "2" => menu_prepare(settings, &store, &credentials, &connector, &mut state).await,
            "3" => super::show::render_inventory(&store),
            "4" => menu_select(&store, &mut state),
            "5" => menu_convert(settings, &store, &credentials, &connector, &state).await,
            "6" => menu_add_group(settings, &store, &credentials, &connector, &mut state).await,
            "7" => {
                menu_cleanup(
                    settings,
                    &store,
                    &credentials,
                    &connector,
                    &mut conductor,
                    &mut state,
                )
                .await
            }
            "8" => menu_monitor(settings, &store, &credentials, &state).await,
            "9" | "q" | "quit" | "exit" => break,
            "" => continue,
            other => {
                print_warning(&format!("Unknown option: {}", other));
                continue;
            }
        };
        if let Err(e) = result {
            print_error(&format!("{:#}", e));
        }
    }

    print_info("Session closed");
    Ok(())
}

/// Render the banner, session state, and option list
fn menu(state: &SessionState) -> String {
    let cluster = state.selected_cluster().unwrap_or("none selected");
    let groups = match state.selected_ap_groups().len() {
        0 => "none".to_string(),
        n => format!("{} enrolled", n),
    };
    let prepared = match state.migration_target() {
        Some(target) => format!("cluster '{}' at {}", target.cluster_name, target.node_path),
        None => "no".to_string(),
    };

    let mut out = String::new();
    out.push_str("\n  \x1b[1;34map-shift\x1b[0m migration session\n\n");
    out.push_str(&format!("  Cluster:   {}\n", cluster));
    out.push_str(&format!("  AP groups: {}\n", groups));
    out.push_str(&format!("  Prepared:  {}\n", prepared));
    out.push('\n');
    out.push_str("    1. Run discovery\n");
    out.push_str("    2. Prepare cluster for migration\n");
    out.push_str("    3. Show collected inventory\n");
    out.push_str("    4. Select cluster\n");
    out.push_str("    5. Start AP conversion\n");
    out.push_str("    6. Add AP group to conversion\n");
    out.push_str("    7. Cleanup and restore\n");
    out.push_str("    8. Live conversion dashboard\n");
    out.push_str("    9. Quit\n");
    out
}

/// Conductor address for this session, prompting once if unconfigured
fn resolve_conductor(conductor: &mut Option<String>) -> Result<String> {
    if let Some(address) = conductor {
        return Ok(address.clone());
    }
    let entered = prompt_line("Conductor address")?;
    if entered.is_empty() {
        bail!("A conductor address is required");
    }
    *conductor = Some(entered.clone());
    Ok(entered)
}

/// Cluster the operator selected, or a pointer at option 4
fn selected_cluster(state: &SessionState) -> Option<String> {
    match state.selected_cluster() {
        Some(name) => Some(name.to_string()),
        None => {
            print_warning("Select a cluster first (option 4)");
            None
        }
    }
}

async fn menu_discover(
    settings: &Settings,
    store: &FleetStore,
    credentials: &Credentials,
    conductor: &mut Option<String>,
) -> Result<()> {
    let conductor = resolve_conductor(conductor)?;
    let api = settings.api_client()?;

    print_info(&format!("Discovering fleet through {}...", conductor));
    let outcome = discover_fleet(&api, store, &conductor, credentials).await?;
    for failure in &outcome.failures {
        print_warning(&format!("{}: {}", failure.address, failure.detail));
    }
    print_success(&format!(
        "Discovered {} controller(s) and {} AP group(s)",
        outcome.controllers.len(),
        outcome.ap_group_count
    ));
    Ok(())
}

async fn menu_prepare(
    settings: &Settings,
    store: &FleetStore,
    credentials: &Credentials,
    connector: &SshConnector,
    state: &mut SessionState,
) -> Result<()> {
    let Some(cluster) = selected_cluster(state) else {
        return Ok(());
    };
    let targets = super::prepare::prepare_targets(store, &cluster)?;

    println!("Prepare will disable redundancy and AP load-balancing on:");
    for target in &targets {
        println!(
            "  {} ({}) at {}",
            target.host, target.address, target.node_path
        );
    }
    super::prepare::warn_stale_profile_names(store, &cluster, &targets)?;
    if !confirm("Proceed?", settings.assume_yes)? {
        print_warning("Aborted");
        return Ok(());
    }

    let advisor = StdinAdvisor;
    let report = prepare_for_migration(
        connector,
        credentials,
        &targets,
        &advisor,
        &settings.config.console,
        state,
    )
    .await;

    println!("{}", output::format_workflow(&report.summary));
    output::report_workflow("Prepare", &report.summary);
    if let Some(target) = state.migration_target() {
        print_info(&format!(
            "Recorded migration target: cluster '{}' at {}",
            target.cluster_name, target.node_path
        ));
    }
    Ok(())
}

fn menu_select(store: &FleetStore, state: &mut SessionState) -> Result<()> {
    let census = super::select::cluster_census(store)?;
    if census.is_empty() {
        print_warning("No clusters in the inventory");
        print_info("Run discovery first (option 1)");
        return Ok(());
    }

    println!(
        "{}",
        output::format_clusters(&census, state.selected_cluster())
    );
    let entered = prompt_line("Cluster number (blank keeps the current selection)")?;
    if entered.is_empty() {
        return Ok(());
    }

    let pick = entered
        .parse::<usize>()
        .ok()
        .and_then(|index| index.checked_sub(1))
        .and_then(|index| census.get(index));
    match pick {
        Some((name, members)) => {
            print_success(&format!(
                "Selected cluster '{}' with {} controller(s)",
                name, members
            ));
            state.select_cluster(name.clone());
        }
        None => print_warning(&format!("No cluster numbered '{}'", entered)),
    }
    Ok(())
}

async fn menu_convert(
    settings: &Settings,
    store: &FleetStore,
    credentials: &Credentials,
    connector: &SshConnector,
    state: &SessionState,
) -> Result<()> {
    let Some(cluster) = selected_cluster(state) else {
        return Ok(());
    };
    let targets = super::convert::convert_targets(store, &cluster)?;
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

    let summary = start_conversion(
        connector,
        credentials,
        &targets,
        max_downloads,
        &settings.config.console,
    )
    .await;
    println!("{}", output::format_workflow(&summary));
    output::report_workflow("Convert start", &summary);
    Ok(())
}

async fn menu_add_group(
    settings: &Settings,
    store: &FleetStore,
    credentials: &Credentials,
    connector: &SshConnector,
    state: &mut SessionState,
) -> Result<()> {
    let Some(cluster) = selected_cluster(state) else {
        return Ok(());
    };

    let known = super::convert::cluster_ap_groups(store, &cluster)?;
    let enrolled = state.selected_ap_groups();
    let remaining: Vec<String> = known
        .into_iter()
        .filter(|name| !enrolled.contains(name))
        .collect();
    if remaining.is_empty() {
        print_warning("Every AP group on this cluster is already enrolled");
        return Ok(());
    }

    for (index, name) in remaining.iter().enumerate() {
        println!("  {}. {}", index + 1, name);
    }
    let entered = prompt_line("AP group number")?;
    let Some(group) = entered
        .parse::<usize>()
        .ok()
        .and_then(|index| index.checked_sub(1))
        .and_then(|index| remaining.get(index))
    else {
        print_warning(&format!("No AP group numbered '{}'", entered));
        return Ok(());
    };

    let targets = super::convert::convert_targets(store, &cluster)?;
    if !confirm(
        &format!(
            "Enroll AP group '{}' on {} controller(s)?",
            group,
            targets.len()
        ),
        settings.assume_yes,
    )? {
        print_warning("Aborted");
        return Ok(());
    }

    let summary = add_ap_group(
        connector,
        credentials,
        &targets,
        group,
        &settings.config.console,
        state,
    )
    .await;
    println!("{}", output::format_workflow(&summary));
    output::report_workflow("Add group", &summary);
    Ok(())
}

async fn menu_cleanup(
    settings: &Settings,
    store: &FleetStore,
    credentials: &Credentials,
    connector: &SshConnector,
    conductor: &mut Option<String>,
    state: &mut SessionState,
) -> Result<()> {
    let controllers = store.controllers()?;
    if controllers.is_empty() {
        print_warning("Inventory is empty; nothing to clean up");
        return Ok(());
    }
    let conductor = resolve_conductor(conductor)?;

    let plan = RestorationPlan::resolve(state, store)?;
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

    let report = cleanup_and_restore(
        connector,
        credentials,
        &controllers,
        &conductor,
        &plan,
        &settings.config.console,
        state,
    )
    .await;

    println!("Clear phase:");
    println!("{}", output::format_workflow(&report.clear_summary));
    println!();
    println!("Restore phase:");
    println!("{}", output::format_workflow(&report.restore_summary));

    if report.session_cleared {
        print_info("Cluster selection, AP groups, and migration target cleared");
    }
    if report.clear_summary.all_succeeded() && report.restore_summary.all_succeeded() {
        print_success("Cleanup and restore completed");
    } else {
        print_error("Cleanup finished with failures");
    }
    Ok(())
}

async fn menu_monitor(
    settings: &Settings,
    store: &FleetStore,
    credentials: &Credentials,
    state: &SessionState,
) -> Result<()> {
    let Some(cluster) = selected_cluster(state) else {
        return Ok(());
    };
    let controllers = store.cluster_members(&cluster)?;

    if !confirm(
        &format!("Start live monitoring of '{}'? Ctrl+C stops it", cluster),
        settings.assume_yes,
    )? {
        print_warning("Aborted");
        return Ok(());
    }

    let api = settings.api_client()?;
    let source: Arc<dyn ConvertStatusSource> = Arc::new(RestStatusSource::new(api));
    let handle = spawn_monitor(
        source,
        credentials.clone(),
        cluster,
        controllers,
        settings.config.monitor.interval,
    );
    super::monitor::watch_until_interrupt(handle).await
}
