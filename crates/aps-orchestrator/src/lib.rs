//! aps-orchestrator: migration workflows
//!
//! Sequences the configuration workflows of a staged AP migration over
//! controller consoles: preparing a cluster (disabling its redundancy
//! and load-balancing conveniences), arming and scoping the conversion,
//! and the cleanup that restores cluster profiles afterwards.
//!
//! Every workflow runs host by host, records a step-by-step outcome per
//! host, and never lets one controller's failure stop the rest of the
//! fleet.

pub mod cleanup;
pub mod cmd;
pub mod convert;
mod executor;
pub mod outcome;
pub mod prepare;

#[cfg(test)]
pub(crate) mod testutil;

pub use cleanup::{cleanup_and_restore, CleanupReport, RestorationPlan};
pub use convert::{add_ap_group, start_conversion, ConvertTarget};
pub use outcome::{HostOutcome, HostPhase, StepOutcome, StepStatus, WorkflowSummary};
pub use prepare::{prepare_for_migration, PrepareReport, PrepareTarget};
