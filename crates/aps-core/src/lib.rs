//! aps-core: Core abstractions and configuration for apShift
//!
//! This crate provides the shared types, trait seams, and configuration
//! structures used by the fleet directory, the workflow orchestrator, the
//! conversion monitor, and the CLI.

pub mod config;
pub mod error;
pub mod state;
pub mod text;
pub mod traits;
pub mod types;

pub use error::ApsError;
pub use state::SessionState;
pub use types::{Controller, Credentials, MigrationTarget, NodePath};
