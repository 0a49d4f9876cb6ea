//! aps-console: interactive controller console driver
//!
//! The controllers' configuration shell is driven the way an operator drives
//! it: send a line, give the device a moment, then read whatever it printed
//! until the prompt comes back. This crate provides that primitive
//! ([`ConsoleDriver`]), the prompt vocabulary the workflows share, and the
//! SSH transport behind it.

pub mod driver;
pub mod prompt;
pub mod ssh;

pub use driver::ConsoleDriver;
pub use prompt::{PromptPolicy, PromptRule};
pub use ssh::SshConnector;
