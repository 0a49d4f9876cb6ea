//! CLI command implementations

mod cleanup;
mod config;
mod convert;
mod discover;
mod monitor;
mod prepare;
mod run;
mod select;
mod show;

pub use cleanup::cleanup_command;
pub use config::{config_init, config_show};
pub use convert::{convert_add_group_command, convert_start_command};
pub use discover::discover_command;
pub use monitor::monitor_command;
pub use prepare::prepare_command;
pub use run::run_command;
pub use select::select_cluster_command;
pub use show::show_command;
