//! Fleet-wide conversion progress ledger
//!
//! Controllers never report individual completions; an AP simply stops
//! appearing in the converting list once it has rebooted onto the new
//! image. The ledger therefore infers progress by diffing successive
//! cycles: an AP that vanishes while its controller is answering is
//! completed, an AP that vanishes while its controller is offline is
//! unresolved (it may have finished, or the controller took it down
//! with itself). The aggregate in-flight counter adds a second, rougher
//! signal: a drop between cycles estimates that many completions even
//! when per-AP rows are unavailable.

use std::collections::{BTreeMap, BTreeSet};
use std::time::Duration;

use chrono::{DateTime, Utc};
use tracing::{debug, info};

use aps_core::Controller;

use crate::parse::ConversionSnapshot;

/// One controller's fetch result for one cycle
#[derive(Debug, Clone)]
pub struct HostCycle {
    /// Controller name
    pub host: String,
    /// Controller address
    pub address: String,
    /// Parsed status, or `None` when the fetch failed this cycle
    pub snapshot: Option<ConversionSnapshot>,
}

/// Everything remembered about one AP across cycles
#[derive(Debug, Clone)]
pub struct ApRecord {
    /// Controller that reported the AP
    pub controller: String,
    /// Hardware address
    pub mac: String,
    /// Last reported upgrade state
    pub state: String,
    /// Last reported failure reason or free text
    pub detail: Option<String>,
    /// First cycle the AP appeared in
    pub first_seen: DateTime<Utc>,
    /// Most recent cycle the AP appeared in
    pub last_seen: DateTime<Utc>,
    /// When the AP was inferred complete, if it was
    pub completed_at: Option<DateTime<Utc>>,
}

/// Running per-controller conversion state
#[derive(Debug, Clone)]
pub struct ControllerProgress {
    /// Controller address
    pub address: String,
    /// Whether the last fetch succeeded
    pub online: bool,
    /// APs reported converting in the last cycle
    pub converting_now: usize,
    /// Controller's own in-flight counter
    pub in_flight: u32,
    /// Configured in-flight ceiling
    pub max_in_flight: u32,
    /// Free-text progress line from the last cycle
    pub current_status: Option<String>,
    /// Latched true the first time the engine reports `Active`
    pub conversion_started: bool,
    /// Start time reported when the engine first went active
    pub started_at: Option<String>,
    /// AP groups reported when the engine first went active
    pub ap_groups: Vec<String>,
    /// Highest in-flight counter seen
    pub peak_in_flight: u32,
    /// Completions estimated from drops in the in-flight counter
    pub completed_estimate: u32,
    /// In-flight counter from the previous cycle
    pub last_in_flight: u32,
}

impl ControllerProgress {
    fn new(address: impl Into<String>) -> Self {
        Self {
            address: address.into(),
            online: false,
            converting_now: 0,
            in_flight: 0,
            max_in_flight: 0,
            current_status: None,
            conversion_started: false,
            started_at: None,
            ap_groups: Vec::new(),
            peak_in_flight: 0,
            completed_estimate: 0,
            last_in_flight: 0,
        }
    }
}

/// Accumulated monitoring state for one cluster.
///
/// Cloned wholesale into the snapshot channel after every cycle; every
/// dashboard view is derivable from one instance without another fetch.
#[derive(Debug, Clone)]
pub struct FleetProgress {
    /// Cluster being monitored
    pub cluster: String,
    /// When monitoring started
    pub started: DateTime<Utc>,
    /// Completed polling cycles
    pub cycles: u64,
    /// When the last cycle finished
    pub last_cycle_at: Option<DateTime<Utc>>,
    /// Per-controller state, keyed by controller name
    pub controllers: BTreeMap<String, ControllerProgress>,
    /// Every AP ever seen converting, keyed by AP name
    pub aps: BTreeMap<String, ApRecord>,
    /// APs reported converting in the last cycle
    pub converting: BTreeSet<String>,
    /// APs inferred complete
    pub completed: BTreeSet<String>,
    /// APs that vanished while their controller was offline
    pub unresolved: BTreeSet<String>,
}

impl FleetProgress {
    /// Start an empty ledger over a fixed controller set
    pub fn new(cluster: impl Into<String>, controllers: &[Controller]) -> Self {
        Self {
            cluster: cluster.into(),
            started: Utc::now(),
            cycles: 0,
            last_cycle_at: None,
            controllers: controllers
                .iter()
                .map(|c| (c.name.clone(), ControllerProgress::new(&c.address)))
                .collect(),
            aps: BTreeMap::new(),
            converting: BTreeSet::new(),
            completed: BTreeSet::new(),
            unresolved: BTreeSet::new(),
        }
    }

    /// Fold one cycle's fetch results into the ledger
    pub fn apply_cycle(&mut self, cycle: Vec<HostCycle>, now: DateTime<Utc>) {
        self.cycles += 1;
        self.last_cycle_at = Some(now);

        let mut current = BTreeSet::new();
        let mut offline_hosts = BTreeSet::new();

        for host in cycle {
            let entry = self
                .controllers
                .entry(host.host.clone())
                .or_insert_with(|| ControllerProgress::new(&host.address));

            let snapshot = match host.snapshot {
                Some(snapshot) => snapshot,
                None => {
                    entry.online = false;
                    entry.converting_now = 0;
                    offline_hosts.insert(host.host);
                    continue;
                }
            };

            entry.online = true;
            entry.converting_now = snapshot.aps.len();
            entry.in_flight = snapshot.summary.current_converting;
            entry.max_in_flight = snapshot.summary.max_converting;
            entry.current_status = snapshot.summary.current_status.clone();

            if snapshot.summary.is_active() && !entry.conversion_started {
                entry.conversion_started = true;
                entry.started_at = snapshot.summary.start_time.clone();
                entry.ap_groups = snapshot.summary.ap_groups.clone();
                info!(host = %host.host, groups = ?entry.ap_groups, "conversion reported active");
            }

            entry.peak_in_flight = entry.peak_in_flight.max(entry.in_flight);
            if entry.last_in_flight > entry.in_flight {
                let dropped = entry.last_in_flight - entry.in_flight;
                entry.completed_estimate += dropped;
                debug!(host = %host.host, dropped, "in-flight counter dropped");
            }
            entry.last_in_flight = entry.in_flight;

            for ap in snapshot.aps {
                current.insert(ap.name.clone());
                let record = self.aps.entry(ap.name).or_insert_with(|| ApRecord {
                    controller: host.host.clone(),
                    mac: ap.mac.clone(),
                    state: String::new(),
                    detail: None,
                    first_seen: now,
                    last_seen: now,
                    completed_at: None,
                });
                record.last_seen = now;
                record.state = ap.state;
                record.detail = ap.detail;
            }
        }

        // An AP back on the converting list is no longer unresolved.
        for name in &current {
            self.unresolved.remove(name);
        }

        let vanished: Vec<String> = self.converting.difference(&current).cloned().collect();
        for name in vanished {
            let host_offline = self
                .aps
                .get(&name)
                .map(|record| offline_hosts.contains(&record.controller))
                .unwrap_or(false);
            if host_offline {
                debug!(ap = %name, "AP vanished while its controller was offline");
                self.unresolved.insert(name);
            } else {
                if let Some(record) = self.aps.get_mut(&name) {
                    record.completed_at = Some(now);
                }
                info!(ap = %name, "AP finished converting");
                self.completed.insert(name);
            }
        }

        self.converting = current;
    }

    /// Completions estimated from in-flight counter drops, fleet-wide
    pub fn estimated_completions(&self) -> u32 {
        self.controllers.values().map(|c| c.completed_estimate).sum()
    }

    /// True once every tracked AP has been seen completing
    pub fn all_completed(&self) -> bool {
        !self.aps.is_empty() && self.completed.len() == self.aps.len()
    }

    /// Roll the ledger up into a final summary
    pub fn summary(&self, now: DateTime<Utc>) -> MonitorSummary {
        MonitorSummary {
            cluster: self.cluster.clone(),
            cycles: self.cycles,
            runtime: (now - self.started).to_std().unwrap_or_default(),
            tracked: self.aps.len(),
            completed: self.completed.len(),
            still_converting: self.converting.len(),
            unresolved: self.unresolved.len(),
            estimated_completions: self.estimated_completions(),
        }
    }
}

/// Terminal rollup produced when the monitor stops
#[derive(Debug, Clone)]
pub struct MonitorSummary {
    /// Cluster that was monitored
    pub cluster: String,
    /// Polling cycles completed
    pub cycles: u64,
    /// Wall-clock monitoring time
    pub runtime: Duration,
    /// APs ever seen converting
    pub tracked: usize,
    /// APs inferred complete
    pub completed: usize,
    /// APs still converting at shutdown
    pub still_converting: usize,
    /// APs whose outcome was never observed
    pub unresolved: usize,
    /// Fleet-wide estimate from in-flight counter drops
    pub estimated_completions: u32,
}

impl MonitorSummary {
    /// True when every tracked AP was seen completing
    pub fn all_completed(&self) -> bool {
        self.tracked > 0 && self.completed == self.tracked
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    use chrono::TimeZone;

    use crate::parse::{ConversionSummary, ConvertingAp};

    fn at(minute: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2026, 6, 1, 12, minute, 0).unwrap()
    }

    fn ap(name: &str) -> ConvertingAp {
        ConvertingAp {
            name: name.to_string(),
            mac: "aa:bb:cc:00:11:22".to_string(),
            state: "Downloading".to_string(),
            detail: None,
        }
    }

    fn online(host: &str, aps: &[&str], in_flight: u32) -> HostCycle {
        HostCycle {
            host: host.to_string(),
            address: "10.0.0.1".to_string(),
            snapshot: Some(ConversionSnapshot {
                aps: aps.iter().map(|name| ap(name)).collect(),
                summary: ConversionSummary {
                    status: Some("Active".to_string()),
                    current_converting: in_flight,
                    max_converting: 20,
                    ap_groups: vec!["building-a".to_string()],
                    ..ConversionSummary::default()
                },
            }),
        }
    }

    fn offline(host: &str) -> HostCycle {
        HostCycle {
            host: host.to_string(),
            address: "10.0.0.1".to_string(),
            snapshot: None,
        }
    }

    fn members(names: &[&str]) -> Vec<Controller> {
        use aps_core::types::ControllerId;
        use aps_core::NodePath;

        names
            .iter()
            .enumerate()
            .map(|(i, name)| Controller {
                id: ControllerId::new(i as i64 + 1),
                address: format!("10.0.0.{}", i + 1),
                name: name.to_string(),
                node_path: NodePath::new("/md/east"),
                model: None,
                version: None,
            })
            .collect()
    }

    #[test]
    fn test_completion_by_disappearance() {
        let mut progress = FleetProgress::new("east", &members(&["md-1"]));

        progress.apply_cycle(vec![online("md-1", &["ap-1", "ap-2"], 2)], at(0));
        assert_eq!(progress.converting.len(), 2);
        assert!(progress.completed.is_empty());

        progress.apply_cycle(vec![online("md-1", &["ap-2"], 1)], at(1));
        assert!(progress.completed.contains("ap-1"));
        assert_eq!(progress.aps["ap-1"].completed_at, Some(at(1)));
        assert_eq!(progress.converting.len(), 1);
        assert!(!progress.all_completed());

        progress.apply_cycle(vec![online("md-1", &[], 0)], at(2));
        assert_eq!(progress.completed.len(), 2);
        assert!(progress.all_completed());
    }

    #[test]
    fn test_offline_disappearance_is_unresolved() {
        let mut progress = FleetProgress::new("east", &members(&["md-1"]));

        progress.apply_cycle(vec![online("md-1", &["ap-1"], 1)], at(0));
        progress.apply_cycle(vec![offline("md-1")], at(1));

        assert!(progress.unresolved.contains("ap-1"));
        assert!(progress.completed.is_empty());
        assert!(progress.aps["ap-1"].completed_at.is_none());
        assert!(!progress.controllers["md-1"].online);

        // The controller comes back and still reports the AP: it is
        // converting again, not unresolved.
        progress.apply_cycle(vec![online("md-1", &["ap-1"], 1)], at(2));
        assert!(progress.unresolved.is_empty());
        assert!(progress.converting.contains("ap-1"));

        // Gone while the controller is answering: completed.
        progress.apply_cycle(vec![online("md-1", &[], 0)], at(3));
        assert!(progress.completed.contains("ap-1"));
        assert!(progress.unresolved.is_empty());
    }

    #[test]
    fn test_estimate_from_counter_drops() {
        let mut progress = FleetProgress::new("east", &members(&["md-1"]));

        progress.apply_cycle(vec![online("md-1", &[], 5)], at(0));
        assert_eq!(progress.estimated_completions(), 0);
        assert_eq!(progress.controllers["md-1"].peak_in_flight, 5);

        progress.apply_cycle(vec![online("md-1", &[], 2)], at(1));
        assert_eq!(progress.estimated_completions(), 3);

        // A rising counter never subtracts.
        progress.apply_cycle(vec![online("md-1", &[], 4)], at(2));
        assert_eq!(progress.estimated_completions(), 3);
        assert_eq!(progress.controllers["md-1"].peak_in_flight, 5);
    }

    #[test]
    fn test_active_latch_keeps_first_report() {
        let mut progress = FleetProgress::new("east", &members(&["md-1"]));

        let mut idle = online("md-1", &[], 0);
        if let Some(snapshot) = idle.snapshot.as_mut() {
            snapshot.summary.status = Some("Inactive".to_string());
        }
        progress.apply_cycle(vec![idle], at(0));
        assert!(!progress.controllers["md-1"].conversion_started);

        let mut first = online("md-1", &[], 1);
        if let Some(snapshot) = first.snapshot.as_mut() {
            snapshot.summary.start_time = Some("Jun 1 12:01:00".to_string());
        }
        progress.apply_cycle(vec![first], at(1));
        assert!(progress.controllers["md-1"].conversion_started);
        assert_eq!(
            progress.controllers["md-1"].started_at.as_deref(),
            Some("Jun 1 12:01:00")
        );

        let mut second = online("md-1", &[], 1);
        if let Some(snapshot) = second.snapshot.as_mut() {
            snapshot.summary.start_time = Some("Jun 1 12:02:00".to_string());
            snapshot.summary.ap_groups.push("building-z".to_string());
        }
        progress.apply_cycle(vec![second], at(2));
        assert_eq!(
            progress.controllers["md-1"].started_at.as_deref(),
            Some("Jun 1 12:01:00")
        );
        assert_eq!(progress.controllers["md-1"].ap_groups, ["building-a"]);
    }

    #[test]
    fn test_summary_rollup() {
        let mut progress = FleetProgress::new("east", &members(&["md-1", "md-2"]));
        assert_eq!(progress.controllers.len(), 2);

        progress.apply_cycle(
            vec![online("md-1", &["ap-1", "ap-2"], 2), offline("md-2")],
            at(0),
        );
        progress.apply_cycle(
            vec![online("md-1", &["ap-2"], 1), offline("md-2")],
            at(1),
        );

        let summary = progress.summary(at(2));
        assert_eq!(summary.cycles, 2);
        assert_eq!(summary.tracked, 2);
        assert_eq!(summary.completed, 1);
        assert_eq!(summary.still_converting, 1);
        assert_eq!(summary.unresolved, 0);
        assert_eq!(summary.estimated_completions, 1);
        assert!(!summary.all_completed());
    }
}
