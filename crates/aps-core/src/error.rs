//! Core error types for apShift

use std::path::PathBuf;
use thiserror::Error;

/// Top-level error type for the apShift ecosystem
#[derive(Error, Debug)]
pub enum ApsError {
    /// Console transport error
    #[error("Console error: {0}")]
    Connect(#[from] ConnectError),

    /// REST API error
    #[error("API error: {0}")]
    Fetch(#[from] FetchError),

    /// Fleet directory error
    #[error("Fleet directory error: {0}")]
    Directory(#[from] DirectoryError),

    /// Configuration error
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    /// I/O error
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// Console transport errors
#[derive(Error, Debug)]
pub enum ConnectError {
    /// Controller could not be reached
    #[error("Cannot reach {address}: {detail}")]
    Unreachable { address: String, detail: String },

    /// Controller rejected the login
    #[error("Authentication failed for {address}")]
    AuthenticationFailed { address: String },

    /// Console channel closed with an exchange still in flight
    #[error("Console channel closed: {0}")]
    ChannelClosed(String),

    /// SSH layer error
    #[error("SSH error: {0}")]
    Ssh(String),

    /// I/O error on the console transport
    #[error("Console I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// REST API errors
#[derive(Error, Debug)]
pub enum FetchError {
    /// HTTP client could not be built
    #[error("HTTP client error: {0}")]
    Client(String),

    /// Request could not be delivered
    #[error("Request to {address} failed: {detail}")]
    Transport { address: String, detail: String },

    /// Controller rejected the login
    #[error("Login rejected by {address}")]
    LoginRejected { address: String },

    /// Login succeeded but the session token was missing
    #[error("Login to {address} returned no session token")]
    MissingToken { address: String },

    /// Response body did not have the expected shape
    #[error("Unexpected payload from {address}: {detail}")]
    Payload { address: String, detail: String },
}

/// Fleet directory errors
#[derive(Error, Debug)]
pub enum DirectoryError {
    /// Underlying store failed
    #[error("Fleet store error: {0}")]
    Store(String),

    /// Cluster not present in the directory
    #[error("Unknown cluster: {0}")]
    UnknownCluster(String),
}

/// Configuration-related errors
#[derive(Error, Debug)]
pub enum ConfigError {
    /// Config file not found
    #[error("Config file not found: {0}")]
    NotFound(PathBuf),

    /// Invalid configuration
    #[error("Invalid config: {0}")]
    Invalid(String),

    /// TOML parse error
    #[error("TOML parse error: {0}")]
    Parse(#[from] toml::de::Error),

    /// TOML serialize error
    #[error("TOML serialize error: {0}")]
    Serialize(#[from] toml::ser::Error),
}
