//! aps-cli: command-line interface for apShift
//!
//! Provides the `ap-shift` binary: fleet discovery through the
//! conductor, cluster preparation, AP conversion control, cleanup, and
//! a live conversion dashboard, as one-shot subcommands or as an
//! interactive session.

pub mod commands;
pub mod context;
pub mod output;
