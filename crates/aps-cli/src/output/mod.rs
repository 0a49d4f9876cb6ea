//! Output formatting utilities for the CLI
//!
//! This module renders the fleet inventory, workflow outcomes, and the
//! live conversion dashboard as terminal tables, plus the colored
//! status line helpers the commands share.

use chrono::Utc;
use tabled::{
    settings::{Style, Width},
    Table, Tabled,
};

use aps_core::types::{ApGroup, Controller};
use aps_monitor::{FleetProgress, MonitorSummary};
use aps_orchestrator::{HostOutcome, RestorationPlan, StepStatus, WorkflowSummary};

/// Format the controller inventory as an ASCII table
///
/// Each row carries the controller together with its resolved cluster
/// name, when one is known.
///
/// # Returns
/// A formatted string suitable for terminal output, or a placeholder
/// line if the inventory is empty.
pub fn format_controllers(rows: &[(Controller, Option<String>)]) -> String {
    if rows.is_empty() {
        return "No controllers in the inventory".to_string();
    }

    #[derive(Tabled)]
    struct ControllerRow {
        #[tabled(rename = "NAME")]
        name: String,
        #[tabled(rename = "ADDRESS")]
        address: String,
        #[tabled(rename = "CLUSTER")]
        cluster: String,
        #[tabled(rename = "NODE PATH")]
        node_path: String,
        #[tabled(rename = "MODEL")]
        model: String,
        #[tabled(rename = "VERSION")]
        version: String,
    }

    let rows: Vec<ControllerRow> = rows
        .iter()
        .map(|(c, cluster)| ControllerRow {
            name: c.name.clone(),
            address: c.address.clone(),
            cluster: cluster.clone().unwrap_or_else(|| "-".to_string()),
            node_path: truncate(c.node_path.as_str(), 28),
            model: c.model.clone().unwrap_or_else(|| "-".to_string()),
            version: c.version.clone().unwrap_or_else(|| "-".to_string()),
        })
        .collect();

    Table::new(rows)
        .with(Style::rounded())
        .with(Width::wrap(110))
        .to_string()
}

/// Format the cluster census as a numbered table
///
/// The numbering matches the picker in the interactive session; the
/// currently selected cluster, if any, is marked.
pub fn format_clusters(census: &[(String, usize)], selected: Option<&str>) -> String {
    if census.is_empty() {
        return "No clusters in the inventory".to_string();
    }

    #[derive(Tabled)]
    struct ClusterRow {
        #[tabled(rename = "#")]
        index: usize,
        #[tabled(rename = "CLUSTER")]
        cluster: String,
        #[tabled(rename = "CONTROLLERS")]
        controllers: usize,
    }

    let rows: Vec<ClusterRow> = census
        .iter()
        .enumerate()
        .map(|(i, (name, members))| ClusterRow {
            index: i + 1,
            cluster: if selected == Some(name.as_str()) {
                format!("{} (selected)", name)
            } else {
                name.clone()
            },
            controllers: *members,
        })
        .collect();

    Table::new(rows).with(Style::rounded()).to_string()
}

/// Format the AP group catalog as an ASCII table
pub fn format_ap_groups(groups: &[ApGroup]) -> String {
    if groups.is_empty() {
        return "No AP groups recorded".to_string();
    }

    #[derive(Tabled)]
    struct GroupRow {
        #[tabled(rename = "GROUP")]
        group: String,
        #[tabled(rename = "PROFILE STATUS")]
        profile_status: String,
    }

    let rows: Vec<GroupRow> = groups
        .iter()
        .map(|g| GroupRow {
            group: g.name.clone(),
            profile_status: g.profile_status.clone().unwrap_or_else(|| "-".to_string()),
        })
        .collect();

    Table::new(rows).with(Style::rounded()).to_string()
}

/// Format the AP hardware census as an ASCII table
pub fn format_ap_models(models: &[(String, u64)]) -> String {
    if models.is_empty() {
        return "No AP inventory recorded".to_string();
    }

    #[derive(Tabled)]
    struct ModelRow {
        #[tabled(rename = "MODEL")]
        model: String,
        #[tabled(rename = "APS")]
        aps: u64,
    }

    let rows: Vec<ModelRow> = models
        .iter()
        .map(|(model, count)| ModelRow {
            model: model.clone(),
            aps: *count,
        })
        .collect();

    Table::new(rows).with(Style::rounded()).to_string()
}

/// Format a workflow's per-host outcomes as an ASCII table
///
/// Shows each host's result, how many steps applied, and the first
/// failure detail when one was recorded.
pub fn format_workflow(summary: &WorkflowSummary) -> String {
    if summary.hosts.is_empty() {
        return "No hosts attempted".to_string();
    }

    #[derive(Tabled)]
    struct HostRow {
        #[tabled(rename = "HOST")]
        host: String,
        #[tabled(rename = "ADDRESS")]
        address: String,
        #[tabled(rename = "RESULT")]
        result: String,
        #[tabled(rename = "STEPS")]
        steps: String,
        #[tabled(rename = "DETAIL")]
        detail: String,
    }

    let rows: Vec<HostRow> = summary
        .hosts
        .iter()
        .map(|outcome| HostRow {
            host: outcome.host.clone(),
            address: outcome.address.clone(),
            result: match outcome.failed_in {
                None => "ok".to_string(),
                Some(phase) => format!("failed ({})", phase),
            },
            steps: format!(
                "{}/{}",
                outcome
                    .steps
                    .iter()
                    .filter(|s| s.status == StepStatus::Applied)
                    .count(),
                outcome.steps.len()
            ),
            detail: first_problem(outcome)
                .map(|d| truncate(d, 48))
                .unwrap_or_else(|| "-".to_string()),
        })
        .collect();

    Table::new(rows)
        .with(Style::rounded())
        .with(Width::wrap(110))
        .to_string()
}

/// First recorded failure or partial-apply detail on a host
fn first_problem(outcome: &HostOutcome) -> Option<&str> {
    outcome
        .steps
        .iter()
        .find(|s| matches!(s.status, StepStatus::Failed | StepStatus::Partial))
        .and_then(|s| s.detail.as_deref())
}

/// Print the one-line verdict for a finished workflow
pub fn report_workflow(name: &str, summary: &WorkflowSummary) {
    if summary.all_succeeded() {
        print_success(&format!(
            "{} completed on {} of {} hosts",
            name,
            summary.success_count(),
            summary.total()
        ));
    } else {
        print_error(&format!(
            "{} completed on {} of {} hosts (failed: {})",
            name,
            summary.success_count(),
            summary.total(),
            summary.failed_hosts().join(", ")
        ));
    }
}

/// Format the cleanup plan before the operator confirms it
pub fn format_cleanup_plan(
    controllers: &[Controller],
    plan: &RestorationPlan,
    conductor: &str,
) -> String {
    let mut out = String::new();

    out.push_str(&format!(
        "Phase 1 - clear conversion state on {} controller(s):\n",
        controllers.len()
    ));
    for controller in controllers {
        out.push_str(&format!("  {} ({})\n", controller.name, controller.address));
    }

    out.push_str(&format!(
        "Phase 2 - restore {} cluster profile(s) through the conductor at {}:\n",
        plan.targets.len(),
        conductor
    ));
    for (cluster, node_path) in &plan.targets {
        out.push_str(&format!("  cluster '{}' at {}\n", cluster, node_path));
    }

    out
}

/// How many AP rows the dashboard lists before folding the rest
const DASHBOARD_AP_ROWS: usize = 20;

/// Render the live conversion dashboard from one progress snapshot
///
/// Everything shown here is derived from the snapshot; nothing is
/// fetched from the controllers.
pub fn format_dashboard(progress: &FleetProgress) -> String {
    let runtime = (Utc::now() - progress.started).num_seconds().max(0) as u64;

    let mut out = String::new();
    out.push_str(&format!(
        "\nCluster '{}' - cycle {} - running {}\n",
        progress.cluster,
        progress.cycles,
        format_duration(runtime)
    ));

    #[derive(Tabled)]
    struct ControllerStatusRow {
        #[tabled(rename = "CONTROLLER")]
        controller: String,
        #[tabled(rename = "ONLINE")]
        online: String,
        #[tabled(rename = "IN-FLIGHT")]
        in_flight: String,
        #[tabled(rename = "PEAK")]
        peak: u32,
        #[tabled(rename = "EST DONE")]
        est_done: u32,
        #[tabled(rename = "STATUS")]
        status: String,
    }

    let rows: Vec<ControllerStatusRow> = progress
        .controllers
        .iter()
        .map(|(name, c)| ControllerStatusRow {
            controller: name.clone(),
            online: if c.online { "yes" } else { "no" }.to_string(),
            in_flight: format!("{}/{}", c.in_flight, c.max_in_flight),
            peak: c.peak_in_flight,
            est_done: c.completed_estimate,
            status: c
                .current_status
                .as_deref()
                .map(|s| truncate(s, 32))
                .unwrap_or_else(|| "-".to_string()),
        })
        .collect();
    out.push_str(&Table::new(rows).with(Style::rounded()).to_string());
    out.push('\n');

    out.push_str(&format!(
        "Converting: {}   Completed: {}   Unresolved: {}   Estimated done: {}\n",
        progress.converting.len(),
        progress.completed.len(),
        progress.unresolved.len(),
        progress.estimated_completions()
    ));

    if !progress.converting.is_empty() {
        #[derive(Tabled)]
        struct ApRow {
            #[tabled(rename = "AP")]
            ap: String,
            #[tabled(rename = "MAC")]
            mac: String,
            #[tabled(rename = "STATE")]
            state: String,
        }

        let rows: Vec<ApRow> = progress
            .converting
            .iter()
            .take(DASHBOARD_AP_ROWS)
            .filter_map(|name| progress.aps.get(name).map(|record| (name, record)))
            .map(|(name, record)| ApRow {
                ap: name.clone(),
                mac: record.mac.clone(),
                state: truncate(&record.state, 24),
            })
            .collect();
        out.push_str(&Table::new(rows).with(Style::rounded()).to_string());
        out.push('\n');
        if progress.converting.len() > DASHBOARD_AP_ROWS {
            out.push_str(&format!(
                "... and {} more converting\n",
                progress.converting.len() - DASHBOARD_AP_ROWS
            ));
        }
    }

    out
}

/// Format the terminal summary printed when monitoring stops
pub fn format_monitor_summary(summary: &MonitorSummary) -> String {
    let mut out = String::new();

    out.push_str(&format!(
        "\nMonitoring summary for cluster '{}'\n",
        summary.cluster
    ));
    out.push_str(&format!("  Cycles:            {}\n", summary.cycles));
    out.push_str(&format!(
        "  Runtime:           {}\n",
        format_duration(summary.runtime.as_secs())
    ));
    out.push_str(&format!("  APs tracked:       {}\n", summary.tracked));
    out.push_str(&format!("  Completed:         {}\n", summary.completed));
    out.push_str(&format!(
        "  Still converting:  {}\n",
        summary.still_converting
    ));
    out.push_str(&format!("  Unresolved:        {}\n", summary.unresolved));
    out.push_str(&format!(
        "  Estimated done:    {} (from in-flight counter drops)\n",
        summary.estimated_completions
    ));

    out
}

/// Format duration in human-readable form
fn format_duration(secs: u64) -> String {
    if secs < 60 {
        format!("{}s", secs)
    } else if secs < 3600 {
        let mins = secs / 60;
        let remaining_secs = secs % 60;
        format!("{}m {}s", mins, remaining_secs)
    } else if secs < 86400 {
        let hours = secs / 3600;
        let remaining_mins = (secs % 3600) / 60;
        format!("{}h {}m", hours, remaining_mins)
    } else {
        let days = secs / 86400;
        let remaining_hours = (secs % 86400) / 3600;
        format!("{}d {}h", days, remaining_hours)
    }
}

/// Truncate a string with ellipsis if too long
fn truncate(s: &str, max_len: usize) -> String {
    if s.len() <= max_len {
        s.to_string()
    } else {
        format!("{}...", &s[..max_len.saturating_sub(3)])
    }
}

/// Print a success message in green with a checkmark prefix
///
/// Outputs to stdout with green coloring for positive feedback to the user.
pub fn print_success(msg: &str) {
    use crossterm::style::{Color, Print, ResetColor, SetForegroundColor};

    let mut stdout = std::io::stdout();
    let _ = crossterm::execute!(
        stdout,
        SetForegroundColor(Color::Green),
        Print("✓ "),
        ResetColor,
        Print(msg),
        Print("\n")
    );
}

/// Print an error message in red with an X prefix
///
/// Outputs to stderr with red coloring for error feedback to the user.
pub fn print_error(msg: &str) {
    use crossterm::style::{Color, Print, ResetColor, SetForegroundColor};

    let mut stderr = std::io::stderr();
    let _ = crossterm::execute!(
        stderr,
        SetForegroundColor(Color::Red),
        Print("✗ "),
        ResetColor,
        Print(msg),
        Print("\n")
    );
}

/// Print a warning message in yellow with a warning symbol prefix
///
/// Outputs to stderr with yellow coloring for cautionary feedback to the user.
pub fn print_warning(msg: &str) {
    use crossterm::style::{Color, Print, ResetColor, SetForegroundColor};

    let mut stderr = std::io::stderr();
    let _ = crossterm::execute!(
        stderr,
        SetForegroundColor(Color::Yellow),
        Print("⚠ "),
        ResetColor,
        Print(msg),
        Print("\n")
    );
}

/// Print an informational message in cyan with an info symbol prefix
///
/// Outputs to stdout with cyan coloring for informational feedback to the user.
pub fn print_info(msg: &str) {
    use crossterm::style::{Color, Print, ResetColor, SetForegroundColor};

    let mut stdout = std::io::stdout();
    let _ = crossterm::execute!(
        stdout,
        SetForegroundColor(Color::Cyan),
        Print("ℹ "),
        ResetColor,
        Print(msg),
        Print("\n")
    );
}

#[cfg(test)]
mod tests {
    use super::*;

    use aps_core::types::{ControllerId, NodePath};
    use aps_orchestrator::{HostPhase, StepOutcome};

    fn controller(name: &str, address: &str) -> Controller {
        Controller {
            id: ControllerId(1),
            address: address.to_string(),
            name: name.to_string(),
            node_path: NodePath::new("/md/East"),
            model: Some("A7210".to_string()),
            version: None,
        }
    }

    #[test]
    fn format_duration_ranges() {
        assert_eq!(format_duration(45), "45s");
        assert_eq!(format_duration(90), "1m 30s");
        assert_eq!(format_duration(3700), "1h 1m");
        assert_eq!(format_duration(200_000), "2d 7h");
    }

    #[test]
    fn truncate_keeps_short_strings() {
        assert_eq!(truncate("short", 12), "short");
        assert_eq!(truncate("a-much-longer-string", 12), "a-much-lo...");
    }

    #[test]
    fn empty_collections_have_placeholder_lines() {
        assert_eq!(format_controllers(&[]), "No controllers in the inventory");
        assert_eq!(format_clusters(&[], None), "No clusters in the inventory");
        assert_eq!(format_ap_groups(&[]), "No AP groups recorded");
        assert_eq!(format_ap_models(&[]), "No AP inventory recorded");
        assert_eq!(
            format_workflow(&WorkflowSummary::new()),
            "No hosts attempted"
        );
    }

    #[test]
    fn controller_table_shows_cluster_and_dashes() {
        let rows = vec![
            (controller("wc-a", "10.1.1.10"), Some("east".to_string())),
            (controller("wc-b", "10.1.1.11"), None),
        ];
        let table = format_controllers(&rows);
        assert!(table.contains("wc-a"));
        assert!(table.contains("east"));
        assert!(table.contains("10.1.1.11"));
    }

    #[test]
    fn cluster_table_marks_selection() {
        let census = vec![("east".to_string(), 2), ("west".to_string(), 3)];
        let table = format_clusters(&census, Some("west"));
        assert!(table.contains("west (selected)"));
        assert!(!table.contains("east (selected)"));
    }

    #[test]
    fn workflow_table_reports_result_and_steps() {
        let mut summary = WorkflowSummary::new();

        let mut ok = HostOutcome::new("wc-a", "10.1.1.10");
        ok.push(StepOutcome::applied("change-config-node /md/East"));
        ok.push(StepOutcome::applied("write memory"));
        summary.push(ok);

        let mut bad = HostOutcome::new("wc-b", "10.1.1.11");
        bad.push(StepOutcome::applied("configure terminal"));
        bad.fail(
            HostPhase::Configuring,
            "lc-cluster group-profile east",
            "profile context never confirmed",
        );
        summary.push(bad);

        let table = format_workflow(&summary);
        assert!(table.contains("ok"));
        assert!(table.contains("failed (configuring)"));
        assert!(table.contains("2/2"));
        assert!(table.contains("profile context never confirmed"));
    }

    #[test]
    fn dashboard_carries_cluster_and_counters() {
        let progress = FleetProgress::new("east", &[controller("wc-a", "10.1.1.10")]);
        let dashboard = format_dashboard(&progress);
        assert!(dashboard.contains("Cluster 'east'"));
        assert!(dashboard.contains("wc-a"));
        assert!(dashboard.contains("Converting: 0"));
    }

    #[test]
    fn cleanup_plan_lists_both_phases() {
        let plan = RestorationPlan {
            targets: vec![("east".to_string(), NodePath::new("/md/East"))],
            full_fleet: false,
        };
        let controllers = vec![controller("wc-a", "10.1.1.10")];
        let text = format_cleanup_plan(&controllers, &plan, "10.0.0.1");
        assert!(text.contains("Phase 1"));
        assert!(text.contains("wc-a (10.1.1.10)"));
        assert!(text.contains("cluster 'east' at /md/East"));
        assert!(text.contains("10.0.0.1"));
    }
}
