//! Cleanup and restoration workflow
//!
//! Undoes a migration in two phases. Phase one walks every known
//! controller and clears its conversion state (drop enrolled groups,
//! cancel anything active). Phase two reopens a single console on the
//! conductor and restores cluster profiles node by node, re-enabling
//! redundancy and AP load balancing and writing memory after each one.
//!
//! When a prepare ran earlier in the session, its recorded target names
//! the one profile to restore. Without one, the plan falls back to every
//! resolved cluster in the directory, which touches profiles this
//! session never changed.

use tracing::{info, warn};

use aps_console::prompt::entered_profile_context;
use aps_console::{ConsoleDriver, PromptPolicy};
use aps_core::config::ConsoleTiming;
use aps_core::error::{ConnectError, DirectoryError};
use aps_core::traits::{ConsoleConnector, FleetDirectory};
use aps_core::{Controller, Credentials, NodePath, SessionState};

use crate::cmd;
use crate::executor::{
    answer_if_prompted, close_quietly, connect_driver, first_line, record_flagged_step,
};
use crate::outcome::{HostOutcome, HostPhase, StepOutcome, WorkflowSummary};

/// Which cluster profiles the restore phase will visit
#[derive(Debug, Clone)]
pub struct RestorationPlan {
    /// (cluster name, node path) pairs to restore, in order
    pub targets: Vec<(String, NodePath)>,
    /// True when the plan covers the whole directory instead of a
    /// recorded migration target
    pub full_fleet: bool,
}

impl RestorationPlan {
    /// Build the plan from the session's recorded target, falling back
    /// to every resolved cluster the directory knows
    pub fn resolve(
        state: &SessionState,
        directory: &dyn FleetDirectory,
    ) -> Result<Self, DirectoryError> {
        if let Some(target) = state.migration_target() {
            return Ok(Self {
                targets: vec![(target.cluster_name.clone(), target.node_path.clone())],
                full_fleet: false,
            });
        }
        Ok(Self {
            targets: directory.cluster_node_paths()?,
            full_fleet: true,
        })
    }
}

/// What one cleanup run did
#[derive(Debug)]
pub struct CleanupReport {
    /// Phase one: per-controller conversion clearing
    pub clear_summary: WorkflowSummary,
    /// Phase two: per-profile restoration, plus the final save
    pub restore_summary: WorkflowSummary,
    /// True when restoration covered the whole directory
    pub full_fleet: bool,
    /// True when the session's selections were dropped afterwards
    pub session_cleared: bool,
}

/// Clear conversion state fleet-wide, then restore cluster profiles.
///
/// The session is only reset when at least one controller actually
/// cleared; an all-failed phase one leaves the selections in place so
/// the operator can fix connectivity and run cleanup again.
pub async fn cleanup_and_restore(
    connector: &dyn ConsoleConnector,
    credentials: &Credentials,
    controllers: &[Controller],
    conductor: &str,
    plan: &RestorationPlan,
    timing: &ConsoleTiming,
    state: &mut SessionState,
) -> CleanupReport {
    if plan.full_fleet {
        warn!(
            clusters = plan.targets.len(),
            "no recorded migration target; restoring every resolved cluster profile"
        );
    }

    let policy = PromptPolicy::standard();
    let mut clear_summary = WorkflowSummary::new();
    for controller in controllers {
        info!(host = %controller.name, "clearing conversion state");
        let outcome =
            clear_conversion_state(connector, credentials, controller, &policy, timing).await;
        clear_summary.push(outcome);
    }

    let restore_summary = restore_profiles(connector, credentials, conductor, plan, timing).await;

    let session_cleared = clear_summary.success_count() > 0;
    if session_cleared {
        state.clear_after_cleanup();
    }

    info!(
        cleared = clear_summary.success_count(),
        restored = restore_summary.success_count(),
        session_cleared,
        "cleanup finished"
    );

    CleanupReport {
        clear_summary,
        restore_summary,
        full_fleet: plan.full_fleet,
        session_cleared,
    }
}

/// Drop enrolled groups and cancel any active conversion on one controller
async fn clear_conversion_state(
    connector: &dyn ConsoleConnector,
    credentials: &Credentials,
    controller: &Controller,
    policy: &PromptPolicy,
    timing: &ConsoleTiming,
) -> HostOutcome {
    let mut outcome = HostOutcome::new(&controller.name, &controller.address);

    let mut driver = match connect_driver(connector, &controller.address, credentials, timing).await
    {
        Ok(driver) => driver,
        Err(e) => {
            outcome.fail(HostPhase::Connecting, "connect", e.to_string());
            return outcome;
        }
    };
    outcome.push(StepOutcome::applied("connect"));

    // Either command may ask for confirmation depending on what is
    // in flight; the answer is only sent when the prompt shows up.
    for command in [cmd::CONVERT_CLEAR_ALL, cmd::CONVERT_CANCEL] {
        match driver.send_with_settle(command, timing.convert_settle).await {
            Ok(output) => {
                match answer_if_prompted(&mut driver, policy, &output, timing.convert_settle).await
                {
                    Ok(_) => outcome.push(StepOutcome::applied(command)),
                    Err(e) => {
                        outcome.fail(HostPhase::Configuring, command, e.to_string());
                        break;
                    }
                }
            }
            Err(e) => {
                outcome.fail(HostPhase::Configuring, command, e.to_string());
                break;
            }
        }
    }

    close_quietly(&mut driver).await;
    outcome
}

/// Restore every planned cluster profile over one conductor console
async fn restore_profiles(
    connector: &dyn ConsoleConnector,
    credentials: &Credentials,
    conductor: &str,
    plan: &RestorationPlan,
    timing: &ConsoleTiming,
) -> WorkflowSummary {
    let mut summary = WorkflowSummary::new();

    let mut driver = match connect_driver(connector, conductor, credentials, timing).await {
        Ok(driver) => driver,
        Err(e) => {
            for (cluster, _) in &plan.targets {
                let mut outcome = HostOutcome::new(cluster.as_str(), conductor);
                outcome.fail(HostPhase::Connecting, "connect", e.to_string());
                summary.push(outcome);
            }
            return summary;
        }
    };

    let mut broken = false;
    for (cluster, node_path) in &plan.targets {
        if broken {
            let mut outcome = HostOutcome::new(cluster.as_str(), conductor);
            outcome.push(StepOutcome::skipped("restore"));
            outcome.failed_in = Some(HostPhase::Configuring);
            summary.push(outcome);
            continue;
        }

        info!(cluster = %cluster, node = %node_path, "restoring cluster profile");
        let outcome = restore_one(&mut driver, cluster, node_path, timing).await;
        // Inside one console, a hard failure means the channel itself
        // broke; nothing further can be sent on it.
        broken = !outcome.succeeded();
        summary.push(outcome);
    }

    // One last save so changes hanging at the root level survive too.
    let mut final_outcome = HostOutcome::new("conductor", conductor);
    if broken {
        final_outcome.push(StepOutcome::skipped(cmd::WRITE_MEMORY));
        final_outcome.failed_in = Some(HostPhase::Persisting);
    } else {
        match driver
            .send_with_settle(cmd::WRITE_MEMORY, timing.persist_settle)
            .await
        {
            Ok(_) => final_outcome.push(StepOutcome::applied(cmd::WRITE_MEMORY)),
            Err(e) => final_outcome.fail(HostPhase::Persisting, cmd::WRITE_MEMORY, e.to_string()),
        }
    }
    summary.push(final_outcome);

    close_quietly(&mut driver).await;
    summary
}

async fn restore_one(
    driver: &mut ConsoleDriver,
    cluster: &str,
    node_path: &NodePath,
    timing: &ConsoleTiming,
) -> HostOutcome {
    let mut outcome = HostOutcome::new(cluster, driver.address());

    match restore_steps(driver, cluster, node_path, &mut outcome).await {
        Ok(()) => {
            // Persist before touching the next node so one failure
            // cannot take earlier restorations down with it.
            match driver
                .send_with_settle(cmd::WRITE_MEMORY, timing.persist_settle)
                .await
            {
                Ok(_) => outcome.push(StepOutcome::applied(cmd::WRITE_MEMORY)),
                Err(e) => {
                    outcome.fail(HostPhase::Persisting, cmd::WRITE_MEMORY, e.to_string())
                }
            }
        }
        Err(e) => outcome.fail(HostPhase::Configuring, "restore", e.to_string()),
    }
    outcome
}

async fn restore_steps(
    driver: &mut ConsoleDriver,
    cluster: &str,
    node_path: &NodePath,
    outcome: &mut HostOutcome,
) -> Result<(), ConnectError> {
    driver
        .send_settled(&cmd::change_config_node(node_path.as_str()))
        .await?;
    driver.send_settled(cmd::CONFIGURE_TERMINAL).await?;
    outcome.push(StepOutcome::applied("enter node context"));

    let profile = cmd::cluster_profile(cluster);
    let output = driver.send_settled(&profile).await?;
    if entered_profile_context(&output) {
        outcome.push(StepOutcome::applied(profile));
    } else {
        // The profile may have been removed since prepare; the enables
        // are sent anyway and the response decides how it went.
        let detail = first_line(&output).unwrap_or_else(|| "context not confirmed".to_string());
        warn!(cluster, detail = %detail, "profile context not confirmed");
        outcome.push(StepOutcome::partial(profile, detail));
    }

    for command in [cmd::REDUNDANCY, cmd::ACTIVE_AP_LB] {
        let output = driver.send_settled(command).await?;
        record_flagged_step(outcome, command, &output);
    }

    driver.send_settled(cmd::EXIT).await?;
    driver.send_settled(cmd::EXIT).await?;
    outcome.push(StepOutcome::applied("exit contexts"));
    Ok(())
}
