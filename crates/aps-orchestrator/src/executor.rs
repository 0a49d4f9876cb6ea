//! Shared per-host execution helpers

use std::time::Duration;

use tracing::{debug, warn};

use aps_console::prompt::contains_error_marker;
use aps_console::{ConsoleDriver, PromptPolicy};
use aps_core::config::ConsoleTiming;
use aps_core::error::ConnectError;
use aps_core::traits::ConsoleConnector;
use aps_core::Credentials;

use crate::outcome::{HostOutcome, StepOutcome};

/// Open a console on `address` and wrap it in a paced driver
pub(crate) async fn connect_driver(
    connector: &dyn ConsoleConnector,
    address: &str,
    credentials: &Credentials,
    timing: &ConsoleTiming,
) -> Result<ConsoleDriver, ConnectError> {
    let console = connector.connect(address, credentials).await?;
    Ok(ConsoleDriver::new(console, address)
        .with_settle(timing.settle)
        .with_read_ceiling(timing.read_ceiling))
}

/// Answer a confirmation prompt when `output` carries one.
///
/// The response line is sent at most once per captured response. Returns
/// the text that followed the answer, or `None` when no rule matched.
pub(crate) async fn answer_if_prompted(
    driver: &mut ConsoleDriver,
    policy: &PromptPolicy,
    output: &str,
    settle: Duration,
) -> Result<Option<String>, ConnectError> {
    match policy.first_match(output) {
        Some(rule) => {
            debug!(
                address = %driver.address(),
                trigger = %rule.trigger,
                "answering confirmation prompt"
            );
            let follow = driver.send_with_settle(&rule.response, settle).await?;
            Ok(Some(follow))
        }
        None => Ok(None),
    }
}

/// Close a console, keeping any error out of the host outcome
pub(crate) async fn close_quietly(driver: &mut ConsoleDriver) {
    if let Err(e) = driver.close().await {
        debug!(address = %driver.address(), error = %e, "console close failed");
    }
}

/// Record a configuration step, downgrading it to partial when the
/// response carries an error marker
pub(crate) fn record_flagged_step(
    outcome: &mut HostOutcome,
    step: impl Into<String>,
    output: &str,
) {
    let step = step.into();
    if contains_error_marker(output) {
        let detail =
            first_line(output).unwrap_or_else(|| "error marker in response".to_string());
        warn!(step = %step, detail = %detail, "controller flagged command");
        outcome.push(StepOutcome::partial(step, detail));
    } else {
        outcome.push(StepOutcome::applied(step));
    }
}

/// First non-empty line of a captured response, for step details
pub(crate) fn first_line(output: &str) -> Option<String> {
    output
        .lines()
        .map(str::trim)
        .find(|line| !line.is_empty())
        .map(str::to_string)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_first_line_skips_blanks() {
        assert_eq!(
            first_line("\n   \nError: bad profile\nmore"),
            Some("Error: bad profile".to_string())
        );
        assert_eq!(first_line("  \n \n"), None);
    }

    #[test]
    fn test_flagged_step_goes_partial() {
        use crate::outcome::StepStatus;

        let mut outcome = HostOutcome::new("md-1", "10.0.0.1");
        record_flagged_step(&mut outcome, "no redundancy", "(md) #");
        record_flagged_step(&mut outcome, "no redundancy", "Invalid input\n(md) #");

        assert_eq!(outcome.steps[0].status, StepStatus::Applied);
        assert_eq!(outcome.steps[1].status, StepStatus::Partial);
        assert_eq!(outcome.steps[1].detail.as_deref(), Some("Invalid input"));
        // Partial never fails the host.
        assert!(outcome.succeeded());
    }
}
