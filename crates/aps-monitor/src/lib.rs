//! aps-monitor: live AP conversion monitoring
//!
//! Polls every controller of the cluster under migration for its
//! conversion status, normalizes the heterogeneous payloads, and folds
//! them into a running picture of which APs are converting, which have
//! finished, and which vanished without an answer. The monitor runs as
//! a background task that publishes a fresh snapshot after every cycle
//! and keeps going until it is cancelled.

pub mod engine;
pub mod parse;
pub mod progress;

pub use engine::{spawn_monitor, MonitorHandle};
pub use parse::{parse_convert_status, ConversionSnapshot, ConversionSummary, ConvertingAp};
pub use progress::{ApRecord, ControllerProgress, FleetProgress, HostCycle, MonitorSummary};
