//! Workflow outcome reporting
//!
//! A workflow never reduces a host to one boolean: each configuration
//! step records whether it applied cleanly, applied with a flagged
//! response, failed, or never ran, so partial applications stay visible
//! in the summary.

use std::fmt;

/// How far one configuration step got
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StepStatus {
    /// Command ran and nothing in the response flagged it
    Applied,
    /// Command ran but the response carried an error marker
    Partial,
    /// Step did not take effect
    Failed,
    /// Step never ran because an earlier one failed
    Skipped,
}

impl fmt::Display for StepStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            StepStatus::Applied => "applied",
            StepStatus::Partial => "partial",
            StepStatus::Failed => "failed",
            StepStatus::Skipped => "skipped",
        };
        write!(f, "{}", label)
    }
}

/// Outcome of one named step on one host
#[derive(Debug, Clone)]
pub struct StepOutcome {
    /// Step label
    pub step: String,
    /// How the step went
    pub status: StepStatus,
    /// Response excerpt or error, when there is one worth keeping
    pub detail: Option<String>,
}

impl StepOutcome {
    /// Step that applied cleanly
    pub fn applied(step: impl Into<String>) -> Self {
        Self {
            step: step.into(),
            status: StepStatus::Applied,
            detail: None,
        }
    }

    /// Step whose response carried an error marker
    pub fn partial(step: impl Into<String>, detail: impl Into<String>) -> Self {
        Self {
            step: step.into(),
            status: StepStatus::Partial,
            detail: Some(detail.into()),
        }
    }

    /// Step that failed outright
    pub fn failed(step: impl Into<String>, detail: impl Into<String>) -> Self {
        Self {
            step: step.into(),
            status: StepStatus::Failed,
            detail: Some(detail.into()),
        }
    }

    /// Step that never ran
    pub fn skipped(step: impl Into<String>) -> Self {
        Self {
            step: step.into(),
            status: StepStatus::Skipped,
            detail: None,
        }
    }
}

/// Phase of the per-host loop a failure happened in
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HostPhase {
    /// Opening the console
    Connecting,
    /// Running configuration steps
    Configuring,
    /// Working through the profile-name fallback ladder
    Fallback,
    /// Persisting the configuration
    Persisting,
    /// Closing the console
    Closing,
}

impl fmt::Display for HostPhase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            HostPhase::Connecting => "connecting",
            HostPhase::Configuring => "configuring",
            HostPhase::Fallback => "fallback",
            HostPhase::Persisting => "persisting",
            HostPhase::Closing => "closing",
        };
        write!(f, "{}", label)
    }
}

/// Everything that happened on one host during a workflow
#[derive(Debug, Clone)]
pub struct HostOutcome {
    /// Host label (controller name or cluster name)
    pub host: String,
    /// Address the console was opened on
    pub address: String,
    /// Step-by-step record, in execution order
    pub steps: Vec<StepOutcome>,
    /// Phase the host failed in, when it failed
    pub failed_in: Option<HostPhase>,
}

impl HostOutcome {
    /// Start an empty record for one host
    pub fn new(host: impl Into<String>, address: impl Into<String>) -> Self {
        Self {
            host: host.into(),
            address: address.into(),
            steps: Vec::new(),
            failed_in: None,
        }
    }

    /// Append a step outcome
    pub fn push(&mut self, step: StepOutcome) {
        self.steps.push(step);
    }

    /// Record a failing step; the first failure pins the phase
    pub fn fail(&mut self, phase: HostPhase, step: impl Into<String>, detail: impl Into<String>) {
        self.steps.push(StepOutcome::failed(step, detail));
        if self.failed_in.is_none() {
            self.failed_in = Some(phase);
        }
    }

    /// True when every step ran without a hard failure
    pub fn succeeded(&self) -> bool {
        self.failed_in.is_none()
    }
}

/// Fleet-level rollup of one workflow run
#[derive(Debug, Clone, Default)]
pub struct WorkflowSummary {
    /// Per-host outcomes, in execution order
    pub hosts: Vec<HostOutcome>,
}

impl WorkflowSummary {
    /// Start an empty summary
    pub fn new() -> Self {
        Self::default()
    }

    /// Append one host's outcome
    pub fn push(&mut self, outcome: HostOutcome) {
        self.hosts.push(outcome);
    }

    /// Hosts that completed without a hard failure
    pub fn success_count(&self) -> usize {
        self.hosts.iter().filter(|h| h.succeeded()).count()
    }

    /// Hosts attempted
    pub fn total(&self) -> usize {
        self.hosts.len()
    }

    /// Names of the hosts that failed, in execution order
    pub fn failed_hosts(&self) -> Vec<&str> {
        self.hosts
            .iter()
            .filter(|h| !h.succeeded())
            .map(|h| h.host.as_str())
            .collect()
    }

    /// True when every attempted host succeeded
    pub fn all_succeeded(&self) -> bool {
        self.hosts.iter().all(|h| h.succeeded())
    }
}
