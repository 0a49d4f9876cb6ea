//! Conversion kickoff workflow
//!
//! Arms the AP conversion engine on every member of the prepared
//! cluster, then enrolls AP groups one at a time. Arming prints a
//! confirmation prompt that must be answered; a controller that never
//! shows the prompt did not arm, and is reported as failed rather than
//! assumed converted.

use tracing::{info, warn};

use aps_console::prompt::contains_error_marker;
use aps_console::PromptPolicy;
use aps_core::config::ConsoleTiming;
use aps_core::traits::ConsoleConnector;
use aps_core::{Credentials, SessionState};

use crate::cmd;
use crate::executor::{answer_if_prompted, close_quietly, connect_driver, first_line};
use crate::outcome::{HostOutcome, HostPhase, StepOutcome, WorkflowSummary};

/// One cluster member to run conversion commands on
#[derive(Debug, Clone)]
pub struct ConvertTarget {
    /// Controller name, used in reporting
    pub host: String,
    /// Console address
    pub address: String,
}

/// Arm the conversion engine on every target controller.
///
/// Each member is armed over its own console. The activation command
/// asks for confirmation before doing anything; the answer is sent
/// exactly once, and a missing prompt fails that host.
pub async fn start_conversion(
    connector: &dyn ConsoleConnector,
    credentials: &Credentials,
    targets: &[ConvertTarget],
    max_downloads: u16,
    timing: &ConsoleTiming,
) -> WorkflowSummary {
    let policy = PromptPolicy::standard();
    let mut summary = WorkflowSummary::new();
    for target in targets {
        info!(host = %target.host, max_downloads, "arming conversion");
        let outcome =
            arm_controller(connector, credentials, target, max_downloads, &policy, timing).await;
        summary.push(outcome);
    }
    info!(
        armed = summary.success_count(),
        total = summary.total(),
        "conversion kickoff finished"
    );
    summary
}

async fn arm_controller(
    connector: &dyn ConsoleConnector,
    credentials: &Credentials,
    target: &ConvertTarget,
    max_downloads: u16,
    policy: &PromptPolicy,
    timing: &ConsoleTiming,
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

    let step = cmd::convert_activate(max_downloads);
    match driver.send_settled(&step).await {
        Ok(output) => match answer_if_prompted(&mut driver, policy, &output, timing.settle).await {
            Ok(Some(_)) => outcome.push(StepOutcome::applied(step)),
            Ok(None) => outcome.fail(
                HostPhase::Configuring,
                step,
                "expected confirmation prompt never appeared",
            ),
            Err(e) => outcome.fail(HostPhase::Configuring, step, e.to_string()),
        },
        Err(e) => outcome.fail(HostPhase::Configuring, step, e.to_string()),
    }

    close_quietly(&mut driver).await;
    outcome
}

/// Enroll one AP group into the active conversion on every target.
///
/// The group joins the session's enrolled list as soon as at least one
/// controller accepted it; with zero acceptances the selection is left
/// untouched so the operator sees the group as not enrolled.
pub async fn add_ap_group(
    connector: &dyn ConsoleConnector,
    credentials: &Credentials,
    targets: &[ConvertTarget],
    group: &str,
    timing: &ConsoleTiming,
    state: &mut SessionState,
) -> WorkflowSummary {
    let mut summary = WorkflowSummary::new();
    for target in targets {
        info!(host = %target.host, group, "enrolling AP group");
        let outcome = enroll_group(connector, credentials, target, group, timing).await;
        summary.push(outcome);
    }

    if summary.success_count() > 0 {
        state.add_ap_group(group);
    } else {
        warn!(group, "AP group rejected by every controller");
    }
    summary
}

async fn enroll_group(
    connector: &dyn ConsoleConnector,
    credentials: &Credentials,
    target: &ConvertTarget,
    group: &str,
    timing: &ConsoleTiming,
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

    let step = cmd::convert_add_group(group);
    match driver.send_settled(&step).await {
        Ok(output) => {
            if contains_error_marker(&output) {
                let detail =
                    first_line(&output).unwrap_or_else(|| "error marker in response".to_string());
                outcome.fail(HostPhase::Configuring, step, detail);
            } else {
                outcome.push(StepOutcome::applied(step));
            }
        }
        Err(e) => outcome.fail(HostPhase::Configuring, step, e.to_string()),
    }

    close_quietly(&mut driver).await;
    outcome
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testutil::{creds, FakeConnector};
    use aps_console::prompt::PROCEED_PROMPT;

    fn member(host: &str, address: &str) -> ConvertTarget {
        ConvertTarget {
            host: host.to_string(),
            address: address.to_string(),
        }
    }

    #[tokio::test(start_paused = true)]
    async fn test_activation_answers_the_prompt_once() {
        let connector = FakeConnector::new(|_address, line| {
            if line.starts_with("ap convert active") {
                format!("All APs will reboot.\n{}", PROCEED_PROMPT)
            } else {
                "(md) #".to_string()
            }
        });
        let targets = vec![member("md-1", "10.0.0.1"), member("md-2", "10.0.0.2")];

        let summary = start_conversion(
            &connector,
            &creds(),
            &targets,
            20,
            &ConsoleTiming::default(),
        )
        .await;

        assert!(summary.all_succeeded());
        assert_eq!(
            connector.sent_to("10.0.0.1"),
            vec![
                "ap convert active specific-aps activate max-downloads 20 no-pre-validation",
                "y",
            ]
        );
        assert_eq!(
            connector.sent_to("10.0.0.2"),
            vec![
                "ap convert active specific-aps activate max-downloads 20 no-pre-validation",
                "y",
            ]
        );
    }

    #[tokio::test(start_paused = true)]
    async fn test_missing_prompt_fails_the_host() {
        // md-2 swallows the confirmation prompt.
        let connector = FakeConnector::new(|address, line| {
            if line.starts_with("ap convert active") && address == "10.0.0.1" {
                PROCEED_PROMPT.to_string()
            } else {
                "(md) #".to_string()
            }
        });
        let targets = vec![member("md-1", "10.0.0.1"), member("md-2", "10.0.0.2")];

        let summary = start_conversion(
            &connector,
            &creds(),
            &targets,
            20,
            &ConsoleTiming::default(),
        )
        .await;

        assert_eq!(summary.success_count(), 1);
        assert_eq!(summary.failed_hosts(), vec!["md-2"]);
        assert_eq!(
            summary.hosts[1].failed_in,
            Some(HostPhase::Configuring)
        );
        assert!(!connector.sent_to("10.0.0.2").iter().any(|line| line == "y"));
    }

    #[tokio::test(start_paused = true)]
    async fn test_group_enrolls_when_one_controller_accepts() {
        let connector = FakeConnector::new(|address, line| {
            if line.starts_with("ap convert add") && address == "10.0.0.1" {
                "Error: AP group not found\n(md) #".to_string()
            } else {
                "(md) #".to_string()
            }
        });
        let targets = vec![member("md-1", "10.0.0.1"), member("md-2", "10.0.0.2")];
        let mut state = SessionState::new();

        let summary = add_ap_group(
            &connector,
            &creds(),
            &targets,
            "building-a",
            &ConsoleTiming::default(),
            &mut state,
        )
        .await;

        assert_eq!(summary.success_count(), 1);
        assert_eq!(summary.failed_hosts(), vec!["md-1"]);
        assert_eq!(
            connector.sent_to("10.0.0.2"),
            vec!["ap convert add ap-group building-a"]
        );
        assert_eq!(state.selected_ap_groups(), ["building-a"]);
    }

    #[tokio::test(start_paused = true)]
    async fn test_group_not_recorded_when_every_controller_rejects() {
        let connector = FakeConnector::new(|_address, _line| "Invalid input\n(md) #".to_string());
        let targets = vec![member("md-1", "10.0.0.1"), member("md-2", "10.0.0.2")];
        let mut state = SessionState::new();

        let summary = add_ap_group(
            &connector,
            &creds(),
            &targets,
            "building-a",
            &ConsoleTiming::default(),
            &mut state,
        )
        .await;

        assert_eq!(summary.success_count(), 0);
        assert!(state.selected_ap_groups().is_empty());
    }
}
