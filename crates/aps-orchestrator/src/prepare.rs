//! Cluster preparation workflow
//!
//! Before APs can be converted, the cluster profile on every target
//! controller's hierarchy node is reshaped: AP load balancing and
//! redundancy are switched off so the cluster stops shuffling APs
//! around mid-migration, and the change is written to memory.
//!
//! Controllers sometimes reject the profile name the directory expects
//! (stale inventory, renamed profiles). Entry into the profile context
//! is confirmed from the console banner, and a miss starts a bounded
//! fallback ladder driven by a [`ProfileAdvisor`]: query the
//! controller's live membership, try an operator-supplied name, or
//! abandon the host.

use tracing::{info, warn};

use aps_console::prompt::entered_profile_context;
use aps_console::ConsoleDriver;
use aps_core::config::ConsoleTiming;
use aps_core::error::ConnectError;
use aps_core::text::extract_profile_name;
use aps_core::traits::{ConsoleConnector, FallbackChoice, ProfileAdvisor};
use aps_core::{Credentials, MigrationTarget, NodePath, SessionState};

use crate::cmd;
use crate::executor::{close_quietly, connect_driver, first_line, record_flagged_step};
use crate::outcome::{HostOutcome, HostPhase, StepOutcome, WorkflowSummary};

/// Profile-name recovery attempts before a host is abandoned
const MAX_FALLBACK_ATTEMPTS: usize = 3;

/// One controller to prepare
#[derive(Debug, Clone)]
pub struct PrepareTarget {
    /// Controller name, used in reporting
    pub host: String,
    /// Console address
    pub address: String,
    /// Hierarchy node holding the cluster profile
    pub node_path: NodePath,
    /// Cluster profile name the directory expects
    pub cluster_name: String,
}

/// Result of one prepare run
#[derive(Debug)]
pub struct PrepareReport {
    /// Per-host outcomes, in execution order
    pub summary: WorkflowSummary,
}

/// Prepare every target controller's cluster profile for migration.
///
/// Hosts are worked strictly one at a time; a failure on one controller
/// is recorded and the loop moves on. Each host that persists its
/// change updates the session's migration target with the profile name
/// that actually worked, so a later cleanup restores the right profile
/// even when the directory's name was stale.
pub async fn prepare_for_migration(
    connector: &dyn ConsoleConnector,
    credentials: &Credentials,
    targets: &[PrepareTarget],
    advisor: &dyn ProfileAdvisor,
    timing: &ConsoleTiming,
    state: &mut SessionState,
) -> PrepareReport {
    let mut summary = WorkflowSummary::new();
    for target in targets {
        info!(host = %target.host, cluster = %target.cluster_name, "preparing controller");
        let outcome = prepare_one(connector, credentials, target, advisor, timing, state).await;
        summary.push(outcome);
    }
    info!(
        succeeded = summary.success_count(),
        total = summary.total(),
        "prepare finished"
    );
    PrepareReport { summary }
}

async fn prepare_one(
    connector: &dyn ConsoleConnector,
    credentials: &Credentials,
    target: &PrepareTarget,
    advisor: &dyn ProfileAdvisor,
    timing: &ConsoleTiming,
    state: &mut SessionState,
) -> HostOutcome {
    let mut outcome = HostOutcome::new(&target.host, &target.address);

    let mut driver = match connect_driver(connector, &target.address, credentials, timing).await {
        Ok(driver) => driver,
        Err(e) => {
            outcome.fail(HostPhase::Connecting, "connect", e.to_string());
            return outcome;
        }
    };
    outcome.push(StepOutcome::applied("connect"));

    let confirmed = match run_steps(&mut driver, target, advisor, &mut outcome).await {
        Ok(confirmed) => confirmed,
        Err(e) => {
            outcome.fail(HostPhase::Configuring, "configuration", e.to_string());
            close_quietly(&mut driver).await;
            return outcome;
        }
    };

    // The migration target is only recorded once the change survives a
    // reboot, and with the profile name the controller actually accepted.
    if let Some(cluster_name) = confirmed {
        match driver
            .send_with_settle(cmd::WRITE_MEMORY, timing.persist_settle)
            .await
        {
            Ok(_) => {
                outcome.push(StepOutcome::applied(cmd::WRITE_MEMORY));
                state.record_migration_target(MigrationTarget {
                    node_path: target.node_path.clone(),
                    cluster_name,
                });
            }
            Err(e) => outcome.fail(HostPhase::Persisting, cmd::WRITE_MEMORY, e.to_string()),
        }
    }

    close_quietly(&mut driver).await;
    outcome
}

/// Run the configuration sequence on one connected controller.
///
/// Returns the profile name that was confirmed, or `None` when the
/// fallback ladder was abandoned. `Err` means the console itself broke.
async fn run_steps(
    driver: &mut ConsoleDriver,
    target: &PrepareTarget,
    advisor: &dyn ProfileAdvisor,
    outcome: &mut HostOutcome,
) -> Result<Option<String>, ConnectError> {
    let change_node = cmd::change_config_node(target.node_path.as_str());
    let output = driver.send_settled(&change_node).await?;
    record_flagged_step(outcome, change_node, &output);

    let output = driver.send_settled(cmd::CONFIGURE_TERMINAL).await?;
    record_flagged_step(outcome, cmd::CONFIGURE_TERMINAL, &output);

    let confirmed = match enter_profile_with_fallback(driver, target, advisor, outcome).await? {
        Some(name) => name,
        None => return Ok(None),
    };

    // Load balancing first: with it still active the cluster may move
    // APs while redundancy is being torn down.
    for command in [cmd::NO_ACTIVE_AP_LB, cmd::NO_REDUNDANCY] {
        let output = driver.send_settled(command).await?;
        record_flagged_step(outcome, command, &output);
    }

    driver.send_settled(cmd::EXIT).await?;
    driver.send_settled(cmd::EXIT).await?;
    outcome.push(StepOutcome::applied("exit contexts"));

    Ok(Some(confirmed))
}

/// Enter the cluster profile context, escalating through the advisor
/// when the expected name is rejected
async fn enter_profile_with_fallback(
    driver: &mut ConsoleDriver,
    target: &PrepareTarget,
    advisor: &dyn ProfileAdvisor,
    outcome: &mut HostOutcome,
) -> Result<Option<String>, ConnectError> {
    if try_enter_profile(driver, &target.cluster_name, outcome).await? {
        return Ok(Some(target.cluster_name.clone()));
    }

    let mut rejected = target.cluster_name.clone();
    for _ in 0..MAX_FALLBACK_ATTEMPTS {
        match advisor.advise(&target.host, &rejected) {
            FallbackChoice::QueryLive => {
                // The membership listing only exists outside configure
                // mode, so step out, read it, and step back in.
                driver.send_settled(cmd::EXIT).await?;
                let listing = driver.send_settled(cmd::SHOW_CLUSTER_MEMBERSHIP).await?;
                driver.send_settled(cmd::CONFIGURE_TERMINAL).await?;

                match extract_profile_name(&listing) {
                    Some(name) if advisor.accept_discovered(&target.host, &name) => {
                        if try_enter_profile(driver, &name, outcome).await? {
                            return Ok(Some(name));
                        }
                        rejected = name;
                    }
                    Some(name) => {
                        info!(host = %target.host, discovered = %name, "discovered profile name declined");
                    }
                    None => {
                        warn!(host = %target.host, "membership listing named no profile");
                    }
                }
            }
            FallbackChoice::UseName(name) => {
                if try_enter_profile(driver, &name, outcome).await? {
                    return Ok(Some(name));
                }
                rejected = name;
            }
            FallbackChoice::Abort => break,
        }
    }

    outcome.fail(
        HostPhase::Fallback,
        "enter cluster profile",
        format!("no working profile name for {}", target.host),
    );
    Ok(None)
}

/// One attempt at entering the profile context under `name`
async fn try_enter_profile(
    driver: &mut ConsoleDriver,
    name: &str,
    outcome: &mut HostOutcome,
) -> Result<bool, ConnectError> {
    let command = cmd::cluster_profile(name);
    let output = driver.send_settled(&command).await?;
    if entered_profile_context(&output) {
        outcome.push(StepOutcome::applied(command));
        Ok(true)
    } else {
        let detail = first_line(&output).unwrap_or_else(|| "context not confirmed".to_string());
        warn!(profile = name, detail = %detail, "profile context not entered");
        outcome.push(StepOutcome::failed(command, detail));
        Ok(false)
    }
}
