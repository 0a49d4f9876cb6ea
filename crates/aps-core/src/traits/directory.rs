//! Fleet directory trait

use crate::error::DirectoryError;
use crate::types::{ClusterMembership, Controller, ControllerId, NodePath};

/// Read side of the fleet directory.
///
/// The workflows resolve controllers and clusters through this trait so they
/// run the same against the SQLite store and an in-memory test double.
pub trait FleetDirectory: Send + Sync {
    /// All controllers known to the directory
    fn controllers(&self) -> Result<Vec<Controller>, DirectoryError>;

    /// Membership recorded for a controller, if any
    fn membership(&self, controller: ControllerId) -> Result<Option<ClusterMembership>, DirectoryError>;

    /// Cluster names eligible for selection; unresolved memberships are excluded
    fn selectable_clusters(&self) -> Result<Vec<String>, DirectoryError>;

    /// Controllers recorded as members of `cluster`
    fn cluster_members(&self, cluster: &str) -> Result<Vec<Controller>, DirectoryError>;

    /// Resolved cluster names recorded at one hierarchy node
    fn clusters_for_node_path(&self, path: &NodePath) -> Result<Vec<String>, DirectoryError>;

    /// Every resolved (cluster, node-path) pair; the unresolved sentinel
    /// never names a real profile, so it is left out
    fn cluster_node_paths(&self) -> Result<Vec<(String, NodePath)>, DirectoryError>;

    /// AP group names recorded for one controller
    fn ap_groups_for(&self, controller: ControllerId) -> Result<Vec<String>, DirectoryError>;
}
