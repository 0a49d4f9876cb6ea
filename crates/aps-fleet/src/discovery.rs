//! Fleet discovery
//!
//! Walks the conductor's managed-device inventory, asks every reachable
//! controller for its cluster membership and AP group catalog, and
//! snapshots the AP model census into the fleet store.

use serde_json::Value;
use tracing::{info, warn};

use aps_core::error::FetchError;
use aps_core::types::{ApGroup, ClusterMembership, Controller};
use aps_core::traits::FleetDirectory;
use aps_core::{ApsError, Credentials, NodePath};

use crate::api::ApiClient;
use crate::store::FleetStore;

/// Managed-device inventory with per-device state
pub const SHOW_SWITCHES_DEBUG: &str = "show switches debug";

/// Cluster membership as seen from one controller
pub const SHOW_CLUSTER_MEMBERSHIP: &str = "show lc-cluster group-membership";

/// AP group catalog on one controller
pub const SHOW_AP_GROUPS: &str = "show ap-group";

/// Full AP database, including hardware types
pub const SHOW_AP_DATABASE_LONG: &str = "show ap database long";

/// A managed device row parsed from the conductor inventory
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DiscoveredController {
    /// Management address
    pub address: String,
    /// Device name
    pub name: String,
    /// Configuration hierarchy node
    pub node_path: NodePath,
    /// Hardware model, when reported
    pub model: Option<String>,
    /// Firmware version, when reported
    pub version: Option<String>,
}

/// One controller that discovery could not fully resolve
#[derive(Debug, Clone)]
pub struct DiscoveryFailure {
    /// Controller address
    pub address: String,
    /// What went wrong
    pub detail: String,
}

/// What a discovery run produced
#[derive(Debug, Clone)]
pub struct DiscoveryOutcome {
    /// Controllers now present in the store
    pub controllers: Vec<Controller>,
    /// Distinct AP group names recorded across the fleet
    pub ap_group_count: usize,
    /// AP hardware census
    pub ap_models: Vec<(String, u64)>,
    /// Controllers whose membership or catalog fetch failed
    pub failures: Vec<DiscoveryFailure>,
}

/// Rebuild the fleet store from a conductor.
///
/// The store is only cleared once the conductor inventory has been
/// fetched, so a failed login leaves the previous inventory intact.
/// Per-controller membership failures are recorded as unresolved rather
/// than aborting the run.
pub async fn discover_fleet(
    api: &ApiClient,
    store: &FleetStore,
    conductor: &str,
    credentials: &Credentials,
) -> Result<DiscoveryOutcome, ApsError> {
    info!(conductor, "discovering fleet");
    let session = api.login(conductor, credentials).await.map_err(ApsError::Fetch)?;
    let inventory = session
        .show_command(SHOW_SWITCHES_DEBUG)
        .await
        .map_err(ApsError::Fetch)?;
    let discovered = parse_switch_inventory(&inventory);
    info!(count = discovered.len(), "managed devices reported up");

    store.clear()?;

    let mut failures = Vec::new();
    for controller in &discovered {
        let id = store.upsert_controller(controller)?;
        match fetch_controller_state(api, &controller.address, credentials).await {
            Ok((membership, groups)) => {
                if !membership.is_resolved() {
                    warn!(address = %controller.address, "membership output had no profile name");
                }
                store.replace_membership(id, &membership)?;
                store.replace_ap_groups(id, &groups)?;
            }
            Err(e) => {
                warn!(address = %controller.address, error = %e, "controller fetch failed");
                store.replace_membership(id, &ClusterMembership::unresolved())?;
                failures.push(DiscoveryFailure {
                    address: controller.address.clone(),
                    detail: e.to_string(),
                });
            }
        }
    }

    let ap_group_count = store.ap_groups_detailed()?.len();

    let mut ap_models = Vec::new();
    match session.show_command(SHOW_AP_DATABASE_LONG).await {
        Ok(payload) => {
            ap_models = count_ap_models(&payload);
            store.replace_ap_models(&ap_models)?;
        }
        Err(e) => {
            warn!(error = %e, "AP database fetch failed");
            failures.push(DiscoveryFailure {
                address: conductor.to_string(),
                detail: format!("AP database fetch failed: {}", e),
            });
        }
    }

    let controllers = store.controllers()?;
    Ok(DiscoveryOutcome {
        controllers,
        ap_group_count,
        ap_models,
        failures,
    })
}

/// Fetch one controller's cluster membership and AP group catalog over
/// a single API session
async fn fetch_controller_state(
    api: &ApiClient,
    address: &str,
    credentials: &Credentials,
) -> Result<(ClusterMembership, Vec<ApGroup>), FetchError> {
    let session = api.login(address, credentials).await?;
    let membership = parse_membership(&session.show_command(SHOW_CLUSTER_MEMBERSHIP).await?);
    let groups = parse_ap_groups(&session.show_command(SHOW_AP_GROUPS).await?);
    Ok((membership, groups))
}

/// Keep managed devices that are up.
///
/// The inventory lists every node in the hierarchy; only rows typed
/// "MD" matter here, and devices reported down cannot be logged into.
pub fn parse_switch_inventory(payload: &Value) -> Vec<DiscoveredController> {
    let rows = match payload.get("All Switches").and_then(Value::as_array) {
        Some(rows) => rows,
        None => return Vec::new(),
    };

    rows.iter()
        .filter_map(|row| {
            if row.get("Type").and_then(Value::as_str) != Some("MD") {
                return None;
            }
            let status = row.get("Status").and_then(Value::as_str).unwrap_or("");
            if status.eq_ignore_ascii_case("down") {
                return None;
            }
            let address = row.get("IP Address").and_then(Value::as_str)?;
            Some(DiscoveredController {
                address: address.to_string(),
                name: row
                    .get("Name")
                    .and_then(Value::as_str)
                    .unwrap_or("")
                    .to_string(),
                node_path: NodePath::new(
                    row.get("Nodepath").and_then(Value::as_str).unwrap_or(""),
                ),
                model: row
                    .get("Model")
                    .and_then(Value::as_str)
                    .map(str::to_string),
                version: row
                    .get("Version")
                    .and_then(Value::as_str)
                    .map(str::to_string),
            })
        })
        .collect()
}

/// Parse cluster membership from the raw `_data` lines.
///
/// The command prints free text: a "Profile Name = <name>" header, then
/// one row per member where the local controller is marked "self" and
/// others "peer". The connected leader carries "CONNECTED (Leader)".
pub fn parse_membership(payload: &Value) -> ClusterMembership {
    let text = match payload.get("_data").and_then(Value::as_array) {
        Some(lines) => lines
            .iter()
            .filter_map(Value::as_str)
            .collect::<Vec<_>>()
            .join("\n"),
        None => return ClusterMembership::unresolved(),
    };

    let cluster_name = match aps_core::text::extract_profile_name(&text) {
        Some(name) => name,
        None => return ClusterMembership::unresolved(),
    };

    let mut is_leader = false;
    let mut peers = Vec::new();
    for line in text.lines() {
        if line.contains("self") && line.contains("CONNECTED (Leader)") {
            is_leader = true;
        }
        let mut tokens = line.split_whitespace();
        if tokens.next() == Some("peer") {
            if let Some(address) = tokens.next() {
                peers.push(address.to_string());
            }
        }
    }

    ClusterMembership {
        cluster_name,
        is_leader,
        peers,
    }
}

/// Parse the AP group catalog
pub fn parse_ap_groups(payload: &Value) -> Vec<ApGroup> {
    let rows = match payload.get("AP group List").and_then(Value::as_array) {
        Some(rows) => rows,
        None => return Vec::new(),
    };

    rows.iter()
        .filter_map(|row| {
            let name = row.get("Name").and_then(Value::as_str)?;
            Some(ApGroup {
                name: name.to_string(),
                profile_status: row
                    .get("Profile Status")
                    .and_then(Value::as_str)
                    .filter(|status| !status.is_empty())
                    .map(str::to_string),
            })
        })
        .collect()
}

/// Count APs per hardware type, sorted by model name
pub fn count_ap_models(payload: &Value) -> Vec<(String, u64)> {
    let rows = match payload.get("AP Database").and_then(Value::as_array) {
        Some(rows) => rows,
        None => return Vec::new(),
    };

    let mut counts = std::collections::BTreeMap::new();
    for row in rows {
        if let Some(model) = row.get("AP Type").and_then(Value::as_str) {
            *counts.entry(model.to_string()).or_insert(0u64) += 1;
        }
    }
    counts.into_iter().collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_parse_switch_inventory_filters_type_and_status() {
        let payload = json!({
            "All Switches": [
                {"IP Address": "10.0.0.1", "Name": "md-1", "Type": "MD", "Status": "up",
                 "Nodepath": "/md/east", "Model": "A7240", "Version": "8.10.0.9"},
                {"IP Address": "10.0.0.2", "Name": "md-2", "Type": "MD", "Status": "DOWN",
                 "Nodepath": "/md/east"},
                {"IP Address": "10.0.0.3", "Name": "conductor", "Type": "master", "Status": "up",
                 "Nodepath": "/mm"},
                {"Name": "no-address", "Type": "MD", "Status": "up"}
            ]
        });

        let controllers = parse_switch_inventory(&payload);
        assert_eq!(controllers.len(), 1);
        assert_eq!(controllers[0].address, "10.0.0.1");
        assert_eq!(controllers[0].name, "md-1");
        assert_eq!(controllers[0].node_path.as_str(), "/md/east");
        assert_eq!(controllers[0].model.as_deref(), Some("A7240"));
        assert_eq!(controllers[0].version.as_deref(), Some("8.10.0.9"));
    }

    #[test]
    fn test_parse_switch_inventory_missing_key() {
        assert!(parse_switch_inventory(&json!({"other": []})).is_empty());
    }

    #[test]
    fn test_parse_membership_leader_and_peers() {
        let payload = json!({
            "_data": [
                "Cluster Enabled, Profile Name = east-cluster",
                "Redundancy Mode On",
                "Current Cluster members(3):",
                "self 10.0.0.1 CONNECTED (Leader)",
                "peer 10.0.0.2 CONNECTED",
                "peer 10.0.0.3 CONNECTED"
            ]
        });

        let membership = parse_membership(&payload);
        assert_eq!(membership.cluster_name, "east-cluster");
        assert!(membership.is_leader);
        assert_eq!(membership.peers, vec!["10.0.0.2", "10.0.0.3"]);
    }

    #[test]
    fn test_parse_membership_member_without_lead() {
        let payload = json!({
            "_data": [
                "Profile Name = east-cluster",
                "self 10.0.0.2 CONNECTED",
                "peer 10.0.0.1 CONNECTED (Leader)"
            ]
        });

        let membership = parse_membership(&payload);
        assert_eq!(membership.cluster_name, "east-cluster");
        assert!(!membership.is_leader);
        assert_eq!(membership.peers, vec!["10.0.0.1"]);
    }

    #[test]
    fn test_parse_membership_unresolved() {
        let payload = json!({"_data": ["lc-cluster not configured"]});
        assert_eq!(parse_membership(&payload), ClusterMembership::unresolved());

        let missing = json!({"_meta": []});
        assert_eq!(parse_membership(&missing), ClusterMembership::unresolved());
    }

    #[test]
    fn test_parse_ap_groups() {
        let payload = json!({
            "AP group List": [
                {"Name": "building-a", "Profile Status": ""},
                {"Name": "building-b", "Profile Status": "predefined (editable)"},
                {"Profile Status": "orphan row"}
            ]
        });

        let groups = parse_ap_groups(&payload);
        assert_eq!(groups.len(), 2);
        assert_eq!(groups[0].name, "building-a");
        assert_eq!(groups[0].profile_status, None);
        assert_eq!(
            groups[1].profile_status.as_deref(),
            Some("predefined (editable)")
        );
    }

    #[test]
    fn test_count_ap_models() {
        let payload = json!({
            "AP Database": [
                {"Name": "ap-1", "AP Type": "515"},
                {"Name": "ap-2", "AP Type": "515"},
                {"Name": "ap-3", "AP Type": "303"},
                {"Name": "no-type"}
            ]
        });

        assert_eq!(
            count_ap_models(&payload),
            vec![("303".to_string(), 1), ("515".to_string(), 2)]
        );
    }
}
