//! In-memory session bookkeeping
//!
//! Selections made by the operator live for one run of the tool: the cluster
//! being migrated, the AP groups enrolled into the conversion, and the
//! migration target recorded by a successful prepare. Nothing here survives a
//! restart; the fleet directory is the durable side.

use crate::types::MigrationTarget;

/// Operator selections for one run of the tool
#[derive(Debug, Clone, Default)]
pub struct SessionState {
    selected_cluster: Option<String>,
    selected_ap_groups: Vec<String>,
    migration_target: Option<MigrationTarget>,
}

impl SessionState {
    /// Create an empty session
    pub fn new() -> Self {
        Self::default()
    }

    /// Currently selected cluster, if any
    pub fn selected_cluster(&self) -> Option<&str> {
        self.selected_cluster.as_deref()
    }

    /// Select the cluster to migrate.
    ///
    /// Changing the cluster drops any AP groups selected for the old one.
    pub fn select_cluster(&mut self, name: impl Into<String>) {
        let name = name.into();
        if self.selected_cluster.as_deref() != Some(name.as_str()) {
            self.selected_ap_groups.clear();
        }
        tracing::debug!(cluster = %name, "cluster selected");
        self.selected_cluster = Some(name);
    }

    /// AP groups enrolled so far
    pub fn selected_ap_groups(&self) -> &[String] {
        &self.selected_ap_groups
    }

    /// Record an enrolled AP group; returns false if it was already present
    pub fn add_ap_group(&mut self, name: impl Into<String>) -> bool {
        let name = name.into();
        if self.selected_ap_groups.contains(&name) {
            return false;
        }
        self.selected_ap_groups.push(name);
        true
    }

    /// The migration target recorded by the last successful prepare
    pub fn migration_target(&self) -> Option<&MigrationTarget> {
        self.migration_target.as_ref()
    }

    /// Record a migration target, replacing any previous one
    pub fn record_migration_target(&mut self, target: MigrationTarget) {
        tracing::debug!(cluster = %target.cluster_name, node = %target.node_path, "migration target recorded");
        self.migration_target = Some(target);
    }

    /// Drop the target and all selections once the fleet has been restored
    pub fn clear_after_cleanup(&mut self) {
        self.selected_cluster = None;
        self.selected_ap_groups.clear();
        self.migration_target = None;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::NodePath;

    fn target(cluster: &str) -> MigrationTarget {
        MigrationTarget {
            node_path: NodePath::new("/md/site"),
            cluster_name: cluster.to_string(),
        }
    }

    #[test]
    fn test_reselecting_cluster_clears_groups() {
        let mut state = SessionState::new();
        state.select_cluster("alpha");
        assert!(state.add_ap_group("floor-1"));
        assert_eq!(state.selected_ap_groups().len(), 1);

        state.select_cluster("beta");
        assert!(state.selected_ap_groups().is_empty());

        // Re-selecting the same cluster keeps the groups.
        state.add_ap_group("floor-2");
        state.select_cluster("beta");
        assert_eq!(state.selected_ap_groups(), ["floor-2"]);
    }

    #[test]
    fn test_ap_group_dedupe() {
        let mut state = SessionState::new();
        assert!(state.add_ap_group("floor-1"));
        assert!(!state.add_ap_group("floor-1"));
        assert_eq!(state.selected_ap_groups().len(), 1);
    }

    #[test]
    fn test_recording_target_replaces_previous() {
        let mut state = SessionState::new();
        state.record_migration_target(target("alpha"));
        state.record_migration_target(target("beta"));
        assert_eq!(state.migration_target().map(|t| t.cluster_name.as_str()), Some("beta"));
    }

    #[test]
    fn test_clear_after_cleanup() {
        let mut state = SessionState::new();
        state.select_cluster("alpha");
        state.add_ap_group("floor-1");
        state.record_migration_target(target("alpha"));

        state.clear_after_cleanup();
        assert!(state.selected_cluster().is_none());
        assert!(state.selected_ap_groups().is_empty());
        assert!(state.migration_target().is_none());
    }
}
