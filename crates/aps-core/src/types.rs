//! Core domain types

use serde::{Deserialize, Serialize};
use std::fmt;

/// Cluster name recorded when a controller's membership output cannot be parsed
pub const UNRESOLVED_CLUSTER: &str = "Unknown";

/// Position of a controller in the configuration hierarchy
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct NodePath(pub String);

impl NodePath {
    /// Create a new node path
    pub fn new(path: impl Into<String>) -> Self {
        Self(path.into())
    }

    /// Get the raw path string
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for NodePath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<String> for NodePath {
    fn from(s: String) -> Self {
        Self(s)
    }
}

impl From<&str> for NodePath {
    fn from(s: &str) -> Self {
        Self(s.to_string())
    }
}

/// Row identifier assigned by the fleet directory
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ControllerId(pub i64);

impl ControllerId {
    /// Create a new controller ID
    pub fn new(id: i64) -> Self {
        Self(id)
    }

    /// Get the raw ID value
    pub fn value(&self) -> i64 {
        self.0
    }
}

impl fmt::Display for ControllerId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Login material shared by the controllers' API and console
#[derive(Clone, Serialize, Deserialize)]
pub struct Credentials {
    /// Account name
    pub username: String,
    /// Account password
    pub password: String,
}

impl Credentials {
    /// Create new credentials
    pub fn new(username: impl Into<String>, password: impl Into<String>) -> Self {
        Self {
            username: username.into(),
            password: password.into(),
        }
    }
}

impl fmt::Debug for Credentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Credentials")
            .field("username", &self.username)
            .field("password", &"***")
            .finish()
    }
}

/// A managed controller discovered through the conductor
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Controller {
    /// Directory row ID
    pub id: ControllerId,
    /// Management address
    pub address: String,
    /// Device name as reported by the conductor
    pub name: String,
    /// Configuration hierarchy node the controller lives under
    pub node_path: NodePath,
    /// Hardware model, when reported
    pub model: Option<String>,
    /// Firmware version, when reported
    pub version: Option<String>,
}

/// Cluster membership as reported by a controller
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ClusterMembership {
    /// Cluster profile name, or [`UNRESOLVED_CLUSTER`] when parsing failed
    pub cluster_name: String,
    /// Whether this controller is the connected cluster leader
    pub is_leader: bool,
    /// Peer addresses reported alongside this controller
    pub peers: Vec<String>,
}

impl ClusterMembership {
    /// Membership recorded when the controller's output could not be parsed
    pub fn unresolved() -> Self {
        Self {
            cluster_name: UNRESOLVED_CLUSTER.to_string(),
            is_leader: false,
            peers: Vec::new(),
        }
    }

    /// True when the cluster name was actually extracted
    pub fn is_resolved(&self) -> bool {
        self.cluster_name != UNRESOLVED_CLUSTER
    }
}

/// AP group definition present on a controller
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ApGroup {
    /// Group name
    pub name: String,
    /// Profile status column, when reported
    pub profile_status: Option<String>,
}

/// Where a prepared cluster profile lives, for later restoration
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MigrationTarget {
    /// Hierarchy node holding the profile
    pub node_path: NodePath,
    /// Cluster profile name that was reshaped
    pub cluster_name: String,
}
