//! SQLite-backed fleet inventory
//!
//! Discovery writes controllers, cluster memberships, AP groups, and the
//! AP model census here; the workflows read them back through the
//! [`FleetDirectory`] trait.

use std::path::Path;
use std::sync::{Mutex, MutexGuard};

use rusqlite::{params, Connection, OptionalExtension};
use tracing::debug;

use aps_core::error::DirectoryError;
use aps_core::traits::FleetDirectory;
use aps_core::types::{ApGroup, ClusterMembership, Controller, ControllerId, UNRESOLVED_CLUSTER};
use aps_core::NodePath;

use crate::discovery::DiscoveredController;

/// Inventory schema, applied on every open
const SCHEMA: &str = "
CREATE TABLE IF NOT EXISTS controllers (
    id            INTEGER PRIMARY KEY AUTOINCREMENT,
    address       TEXT NOT NULL UNIQUE,
    name          TEXT NOT NULL,
    node_path     TEXT NOT NULL,
    model         TEXT,
    version       TEXT,
    discovered_at TEXT NOT NULL
);

CREATE TABLE IF NOT EXISTS cluster_memberships (
    controller_id INTEGER PRIMARY KEY REFERENCES controllers(id) ON DELETE CASCADE,
    cluster_name  TEXT NOT NULL,
    is_leader     INTEGER NOT NULL DEFAULT 0,
    peers         TEXT NOT NULL DEFAULT '[]',
    recorded_at   TEXT NOT NULL
);

CREATE TABLE IF NOT EXISTS ap_groups (
    controller_id  INTEGER NOT NULL REFERENCES controllers(id) ON DELETE CASCADE,
    name           TEXT NOT NULL,
    profile_status TEXT,
    PRIMARY KEY (controller_id, name)
);

CREATE TABLE IF NOT EXISTS ap_models (
    model    TEXT PRIMARY KEY,
    ap_count INTEGER NOT NULL
);
";

/// Map a rusqlite error into the directory error space
fn store_err(e: rusqlite::Error) -> DirectoryError {
    DirectoryError::Store(e.to_string())
}

/// Current time as an RFC 3339 string for audit columns
fn now() -> String {
    chrono::Utc::now().to_rfc3339()
}

/// Durable fleet inventory
pub struct FleetStore {
    conn: Mutex<Connection>,
}

impl FleetStore {
    /// Open (or create) the inventory at `path`
    pub fn open(path: &Path) -> Result<Self, DirectoryError> {
        debug!(path = %path.display(), "opening fleet store");
        let conn = Connection::open(path).map_err(store_err)?;
        Self::init(conn)
    }

    /// Open a throwaway in-memory inventory
    pub fn open_in_memory() -> Result<Self, DirectoryError> {
        let conn = Connection::open_in_memory().map_err(store_err)?;
        Self::init(conn)
    }

    fn init(conn: Connection) -> Result<Self, DirectoryError> {
        conn.execute_batch(SCHEMA).map_err(store_err)?;
        conn.pragma_update(None, "foreign_keys", "ON")
            .map_err(store_err)?;
        Ok(Self {
            conn: Mutex::new(conn),
        })
    }

    fn conn(&self) -> MutexGuard<'_, Connection> {
        self.conn
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    /// Drop every inventory row ahead of a fresh discovery
    pub fn clear(&self) -> Result<(), DirectoryError> {
        let conn = self.conn();
        conn.execute_batch(
            "DELETE FROM cluster_memberships;
             DELETE FROM controllers;
             DELETE FROM ap_groups;
             DELETE FROM ap_models;",
        )
        .map_err(store_err)
    }

    /// Insert or refresh one controller row, keyed by address
    pub fn upsert_controller(
        &self,
        controller: &DiscoveredController,
    ) -> Result<ControllerId, DirectoryError> {
        let conn = self.conn();
        conn.execute(
            "INSERT INTO controllers (address, name, node_path, model, version, discovered_at)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6)
             ON CONFLICT(address) DO UPDATE SET
                 name = excluded.name,
                 node_path = excluded.node_path,
                 model = excluded.model,
                 version = excluded.version,
                 discovered_at = excluded.discovered_at",
            params![
                controller.address,
                controller.name,
                controller.node_path.as_str(),
                controller.model,
                controller.version,
                now(),
            ],
        )
        .map_err(store_err)?;

        let id: i64 = conn
            .query_row(
                "SELECT id FROM controllers WHERE address = ?1",
                params![controller.address],
                |row| row.get(0),
            )
            .map_err(store_err)?;
        Ok(ControllerId::new(id))
    }

    /// Record (or overwrite) the membership for one controller
    pub fn replace_membership(
        &self,
        controller: ControllerId,
        membership: &ClusterMembership,
    ) -> Result<(), DirectoryError> {
        let peers = serde_json::to_string(&membership.peers)
            .map_err(|e| DirectoryError::Store(e.to_string()))?;
        let conn = self.conn();
        conn.execute(
            "INSERT OR REPLACE INTO cluster_memberships
                 (controller_id, cluster_name, is_leader, peers, recorded_at)
             VALUES (?1, ?2, ?3, ?4, ?5)",
            params![
                controller.value(),
                membership.cluster_name,
                membership.is_leader,
                peers,
                now(),
            ],
        )
        .map_err(store_err)?;
        Ok(())
    }

    /// Replace one controller's AP group catalog
    pub fn replace_ap_groups(
        &self,
        controller: ControllerId,
        groups: &[ApGroup],
    ) -> Result<(), DirectoryError> {
        let mut conn = self.conn();
        let tx = conn.transaction().map_err(store_err)?;
        tx.execute(
            "DELETE FROM ap_groups WHERE controller_id = ?1",
            params![controller.value()],
        )
        .map_err(store_err)?;
        for group in groups {
            tx.execute(
                "INSERT OR REPLACE INTO ap_groups (controller_id, name, profile_status)
                 VALUES (?1, ?2, ?3)",
                params![controller.value(), group.name, group.profile_status],
            )
            .map_err(store_err)?;
        }
        tx.commit().map_err(store_err)
    }

    /// Replace the AP model census
    pub fn replace_ap_models(&self, models: &[(String, u64)]) -> Result<(), DirectoryError> {
        let mut conn = self.conn();
        let tx = conn.transaction().map_err(store_err)?;
        tx.execute("DELETE FROM ap_models", []).map_err(store_err)?;
        for (model, count) in models {
            tx.execute(
                "INSERT OR REPLACE INTO ap_models (model, ap_count) VALUES (?1, ?2)",
                params![model, *count as i64],
            )
            .map_err(store_err)?;
        }
        tx.commit().map_err(store_err)
    }

    /// AP model census, sorted by model name
    pub fn ap_models(&self) -> Result<Vec<(String, u64)>, DirectoryError> {
        let conn = self.conn();
        let mut stmt = conn
            .prepare("SELECT model, ap_count FROM ap_models ORDER BY model")
            .map_err(store_err)?;
        let rows = stmt
            .query_map([], |row| {
                Ok((row.get::<_, String>(0)?, row.get::<_, i64>(1)? as u64))
            })
            .map_err(store_err)?;
        let mut models = Vec::new();
        for row in rows {
            models.push(row.map_err(store_err)?);
        }
        Ok(models)
    }

    /// Distinct AP groups across the fleet, with their profile status column
    pub fn ap_groups_detailed(&self) -> Result<Vec<ApGroup>, DirectoryError> {
        let conn = self.conn();
        let mut stmt = conn
            .prepare("SELECT DISTINCT name, profile_status FROM ap_groups ORDER BY name")
            .map_err(store_err)?;
        let rows = stmt
            .query_map([], |row| {
                Ok(ApGroup {
                    name: row.get(0)?,
                    profile_status: row.get(1)?,
                })
            })
            .map_err(store_err)?;
        let mut groups = Vec::new();
        for row in rows {
            groups.push(row.map_err(store_err)?);
        }
        Ok(groups)
    }
}

impl FleetDirectory for FleetStore {
    fn controllers(&self) -> Result<Vec<Controller>, DirectoryError> {
        let conn = self.conn();
        let mut stmt = conn
            .prepare(
                "SELECT id, address, name, node_path, model, version
                 FROM controllers ORDER BY name, address",
            )
            .map_err(store_err)?;
        let rows = stmt.query_map([], row_to_controller).map_err(store_err)?;
        let mut controllers = Vec::new();
        for row in rows {
            controllers.push(row.map_err(store_err)?);
        }
        Ok(controllers)
    }

    fn membership(
        &self,
        controller: ControllerId,
    ) -> Result<Option<ClusterMembership>, DirectoryError> {
        let conn = self.conn();
        let row = conn
            .query_row(
                "SELECT cluster_name, is_leader, peers
                 FROM cluster_memberships WHERE controller_id = ?1",
                params![controller.value()],
                |row| {
                    Ok((
                        row.get::<_, String>(0)?,
                        row.get::<_, bool>(1)?,
                        row.get::<_, String>(2)?,
                    ))
                },
            )
            .optional()
            .map_err(store_err)?;

        match row {
            Some((cluster_name, is_leader, peers)) => {
                let peers: Vec<String> = serde_json::from_str(&peers)
                    .map_err(|e| DirectoryError::Store(e.to_string()))?;
                Ok(Some(ClusterMembership {
                    cluster_name,
                    is_leader,
                    peers,
                }))
            }
            None => Ok(None),
        }
    }

    fn selectable_clusters(&self) -> Result<Vec<String>, DirectoryError> {
        let conn = self.conn();
        let mut stmt = conn
            .prepare(
                "SELECT DISTINCT cluster_name FROM cluster_memberships
                 WHERE cluster_name != ?1 ORDER BY cluster_name",
            )
            .map_err(store_err)?;
        let rows = stmt
            .query_map(params![UNRESOLVED_CLUSTER], |row| row.get::<_, String>(0))
            .map_err(store_err)?;
        let mut clusters = Vec::new();
        for row in rows {
            clusters.push(row.map_err(store_err)?);
        }
        Ok(clusters)
    }

    fn cluster_members(&self, cluster: &str) -> Result<Vec<Controller>, DirectoryError> {
        let conn = self.conn();
        let mut stmt = conn
            .prepare(
                "SELECT c.id, c.address, c.name, c.node_path, c.model, c.version
                 FROM controllers c
                 JOIN cluster_memberships m ON m.controller_id = c.id
                 WHERE m.cluster_name = ?1
                 ORDER BY c.name, c.address",
            )
            .map_err(store_err)?;
        let rows = stmt
            .query_map(params![cluster], row_to_controller)
            .map_err(store_err)?;
        let mut members = Vec::new();
        for row in rows {
            members.push(row.map_err(store_err)?);
        }
        if members.is_empty() {
            return Err(DirectoryError::UnknownCluster(cluster.to_string()));
        }
        Ok(members)
    }

    fn cluster_node_paths(&self) -> Result<Vec<(String, NodePath)>, DirectoryError> {
        let conn = self.conn();
        let mut stmt = conn
            .prepare(
                "SELECT DISTINCT m.cluster_name, c.node_path
                 FROM cluster_memberships m
                 JOIN controllers c ON m.controller_id = c.id
                 WHERE m.cluster_name != ?1
                 ORDER BY m.cluster_name, c.node_path",
            )
            .map_err(store_err)?;
        let rows = stmt
            .query_map(params![UNRESOLVED_CLUSTER], |row| {
                Ok((
                    row.get::<_, String>(0)?,
                    NodePath::new(row.get::<_, String>(1)?),
                ))
            })
            .map_err(store_err)?;
        let mut pairs = Vec::new();
        for row in rows {
            pairs.push(row.map_err(store_err)?);
        }
        Ok(pairs)
    }

    fn clusters_for_node_path(&self, path: &NodePath) -> Result<Vec<String>, DirectoryError> {
        let conn = self.conn();
        let mut stmt = conn
            .prepare(
                "SELECT DISTINCT m.cluster_name
                 FROM cluster_memberships m
                 JOIN controllers c ON m.controller_id = c.id
                 WHERE c.node_path = ?1 AND m.cluster_name != ?2
                 ORDER BY m.cluster_name",
            )
            .map_err(store_err)?;
        let rows = stmt
            .query_map(params![path.as_str(), UNRESOLVED_CLUSTER], |row| {
                row.get::<_, String>(0)
            })
            .map_err(store_err)?;
        let mut clusters = Vec::new();
        for row in rows {
            clusters.push(row.map_err(store_err)?);
        }
        Ok(clusters)
    }

    fn ap_groups_for(&self, controller: ControllerId) -> Result<Vec<String>, DirectoryError> {
        let conn = self.conn();
        let mut stmt = conn
            .prepare("SELECT name FROM ap_groups WHERE controller_id = ?1 ORDER BY name")
            .map_err(store_err)?;
        let rows = stmt
            .query_map(params![controller.value()], |row| row.get::<_, String>(0))
            .map_err(store_err)?;
        let mut names = Vec::new();
        for row in rows {
            names.push(row.map_err(store_err)?);
        }
        Ok(names)
    }
}

fn row_to_controller(row: &rusqlite::Row<'_>) -> rusqlite::Result<Controller> {
    Ok(Controller {
        id: ControllerId::new(row.get(0)?),
        address: row.get(1)?,
        name: row.get(2)?,
        node_path: NodePath::new(row.get::<_, String>(3)?),
        model: row.get(4)?,
        version: row.get(5)?,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn discovered(address: &str, name: &str, node_path: &str) -> DiscoveredController {
        DiscoveredController {
            address: address.to_string(),
            name: name.to_string(),
            node_path: NodePath::new(node_path),
            model: Some("A7240".to_string()),
            version: Some("8.10.0.9".to_string()),
        }
    }

    #[test]
    fn test_upsert_is_keyed_by_address() {
        let store = FleetStore::open_in_memory().unwrap();
        let first = store
            .upsert_controller(&discovered("10.0.0.1", "md-1", "/md/east"))
            .unwrap();
        let second = store
            .upsert_controller(&discovered("10.0.0.1", "md-1-renamed", "/md/west"))
            .unwrap();
        assert_eq!(first, second);

        let controllers = store.controllers().unwrap();
        assert_eq!(controllers.len(), 1);
        assert_eq!(controllers[0].name, "md-1-renamed");
        assert_eq!(controllers[0].node_path.as_str(), "/md/west");
    }

    #[test]
    fn test_membership_round_trip() {
        let store = FleetStore::open_in_memory().unwrap();
        let id = store
            .upsert_controller(&discovered("10.0.0.1", "md-1", "/md/east"))
            .unwrap();
        let membership = ClusterMembership {
            cluster_name: "east-cluster".to_string(),
            is_leader: true,
            peers: vec!["10.0.0.2".to_string(), "10.0.0.3".to_string()],
        };
        store.replace_membership(id, &membership).unwrap();

        let loaded = store.membership(id).unwrap().unwrap();
        assert_eq!(loaded, membership);
    }

    #[test]
    fn test_membership_missing_is_none() {
        let store = FleetStore::open_in_memory().unwrap();
        assert!(store.membership(ControllerId::new(42)).unwrap().is_none());
    }

    #[test]
    fn test_selectable_clusters_exclude_unresolved() {
        let store = FleetStore::open_in_memory().unwrap();
        let a = store
            .upsert_controller(&discovered("10.0.0.1", "md-1", "/md/east"))
            .unwrap();
        let b = store
            .upsert_controller(&discovered("10.0.0.2", "md-2", "/md/west"))
            .unwrap();
        store
            .replace_membership(
                a,
                &ClusterMembership {
                    cluster_name: "east-cluster".to_string(),
                    is_leader: true,
                    peers: Vec::new(),
                },
            )
            .unwrap();
        store.replace_membership(b, &ClusterMembership::unresolved()).unwrap();

        assert_eq!(store.selectable_clusters().unwrap(), vec!["east-cluster"]);

        // the sentinel never names a real profile, so it is not restorable
        let pairs = store.cluster_node_paths().unwrap();
        assert_eq!(pairs.len(), 1);
        assert_eq!(pairs[0].0, "east-cluster");
        assert_eq!(pairs[0].1.as_str(), "/md/east");
    }

    #[test]
    fn test_cluster_members_unknown_cluster() {
        let store = FleetStore::open_in_memory().unwrap();
        let err = store.cluster_members("nope").unwrap_err();
        assert!(matches!(err, DirectoryError::UnknownCluster(_)));
    }

    #[test]
    fn test_cluster_members_sorted_by_name() {
        let store = FleetStore::open_in_memory().unwrap();
        for (address, name) in [("10.0.0.2", "md-b"), ("10.0.0.1", "md-a")] {
            let id = store
                .upsert_controller(&discovered(address, name, "/md/east"))
                .unwrap();
            store
                .replace_membership(
                    id,
                    &ClusterMembership {
                        cluster_name: "east-cluster".to_string(),
                        is_leader: false,
                        peers: Vec::new(),
                    },
                )
                .unwrap();
        }
        let members = store.cluster_members("east-cluster").unwrap();
        let names: Vec<&str> = members.iter().map(|c| c.name.as_str()).collect();
        assert_eq!(names, ["md-a", "md-b"]);
    }

    fn group(name: &str) -> ApGroup {
        ApGroup {
            name: name.to_string(),
            profile_status: None,
        }
    }

    #[test]
    fn test_ap_groups_replace_per_controller() {
        let store = FleetStore::open_in_memory().unwrap();
        let a = store
            .upsert_controller(&discovered("10.0.0.1", "md-1", "/md/east"))
            .unwrap();
        let b = store
            .upsert_controller(&discovered("10.0.0.2", "md-2", "/md/east"))
            .unwrap();

        store
            .replace_ap_groups(a, &[group("building-a"), group("building-b")])
            .unwrap();
        store.replace_ap_groups(b, &[group("building-b")]).unwrap();

        assert_eq!(
            store.ap_groups_for(a).unwrap(),
            vec!["building-a", "building-b"]
        );
        assert_eq!(store.ap_groups_for(b).unwrap(), vec!["building-b"]);

        // A refresh replaces the controller's catalog wholesale and
        // leaves the other controller's rows alone.
        store.replace_ap_groups(a, &[group("building-c")]).unwrap();
        assert_eq!(store.ap_groups_for(a).unwrap(), vec!["building-c"]);
        assert_eq!(store.ap_groups_for(b).unwrap(), vec!["building-b"]);

        // The fleet-wide view de-duplicates by name.
        let detailed = store.ap_groups_detailed().unwrap();
        let names: Vec<&str> = detailed.iter().map(|g| g.name.as_str()).collect();
        assert_eq!(names, ["building-b", "building-c"]);
    }

    #[test]
    fn test_clusters_for_node_path() {
        let store = FleetStore::open_in_memory().unwrap();
        let a = store
            .upsert_controller(&discovered("10.0.0.1", "md-1", "/md/east"))
            .unwrap();
        let b = store
            .upsert_controller(&discovered("10.0.0.2", "md-2", "/md/east"))
            .unwrap();
        let c = store
            .upsert_controller(&discovered("10.0.0.3", "md-3", "/md/west"))
            .unwrap();
        for (id, cluster) in [(a, "east-cluster"), (c, "west-cluster")] {
            store
                .replace_membership(
                    id,
                    &ClusterMembership {
                        cluster_name: cluster.to_string(),
                        is_leader: false,
                        peers: Vec::new(),
                    },
                )
                .unwrap();
        }
        store.replace_membership(b, &ClusterMembership::unresolved()).unwrap();

        assert_eq!(
            store.clusters_for_node_path(&NodePath::new("/md/east")).unwrap(),
            vec!["east-cluster"]
        );
        assert_eq!(
            store.clusters_for_node_path(&NodePath::new("/md/west")).unwrap(),
            vec!["west-cluster"]
        );
        assert!(store
            .clusters_for_node_path(&NodePath::new("/md/north"))
            .unwrap()
            .is_empty());
    }

    #[test]
    fn test_ap_models_round_trip() {
        let store = FleetStore::open_in_memory().unwrap();
        store
            .replace_ap_models(&[("AP-515".to_string(), 40), ("AP-303".to_string(), 12)])
            .unwrap();
        assert_eq!(
            store.ap_models().unwrap(),
            vec![("AP-303".to_string(), 12), ("AP-515".to_string(), 40)]
        );
    }

    #[test]
    fn test_clear_empties_every_table() {
        let store = FleetStore::open_in_memory().unwrap();
        let id = store
            .upsert_controller(&discovered("10.0.0.1", "md-1", "/md/east"))
            .unwrap();
        store.replace_membership(id, &ClusterMembership::unresolved()).unwrap();
        store.replace_ap_groups(id, &[group("building-a")]).unwrap();
        store.replace_ap_models(&[("AP-515".to_string(), 1)]).unwrap();

        store.clear().unwrap();

        assert!(store.controllers().unwrap().is_empty());
        assert!(store.ap_groups_detailed().unwrap().is_empty());
        assert!(store.ap_models().unwrap().is_empty());
        assert!(store.cluster_node_paths().unwrap().is_empty());
    }

    #[test]
    fn test_open_persists_across_reopen() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("fleet.db");
        {
            let store = FleetStore::open(&path).unwrap();
            store
                .upsert_controller(&discovered("10.0.0.1", "md-1", "/md/east"))
                .unwrap();
        }
        let store = FleetStore::open(&path).unwrap();
        assert_eq!(store.controllers().unwrap().len(), 1);
    }
}
