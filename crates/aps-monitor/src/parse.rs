//! Conversion status payload parsing
//!
//! The status document is only semi-structured: newer firmware returns
//! named tables, older firmware returns raw console text under `_data`,
//! and some builds return both for the same command. Structured tables
//! win when present; the raw lines are only scanned when the per-AP
//! table is missing, so one AP never shows up twice.

use serde_json::Value;

/// Structured table of conversion engine parameters
const PARAMETERS_KEY: &str = "AP Conversion Parameters";

/// Structured list of AP groups enrolled for conversion
const GROUPS_KEY: &str = "AP Groups Listed for Conversion";

/// Structured per-AP conversion table
const IMAGE_STATUS_KEY: &str = "AP Image Conversion Status";

/// Raw output lines accompanying, or standing in for, the tables
const DATA_KEY: &str = "_data";

/// Fragments that mark a raw line as table furniture
const HEADER_FRAGMENTS: [&str; 7] = [
    "AP Name", "------", "Status", "Total APs", "No APs", "AP Group", "AP Mac",
];

/// First-token fragments that mark a raw line as a totals row
const SUMMARY_TOKENS: [&str; 4] = ["Total", "Completed", "Failed", "In-Progress"];

/// One AP the controller reports as converting
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConvertingAp {
    /// AP name
    pub name: String,
    /// Hardware address
    pub mac: String,
    /// Upgrade state as the controller words it
    pub state: String,
    /// Failure reason or trailing free text, when present
    pub detail: Option<String>,
}

/// Aggregate conversion state of one controller
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ConversionSummary {
    /// Engine status, `Active` once armed
    pub status: Option<String>,
    /// Conversion mode
    pub mode: Option<String>,
    /// APs converting right now
    pub current_converting: u32,
    /// Configured ceiling on simultaneous conversions
    pub max_converting: u32,
    /// When the engine was armed, as reported
    pub start_time: Option<String>,
    /// Free-text progress line
    pub current_status: Option<String>,
    /// AP groups enrolled for conversion
    pub ap_groups: Vec<String>,
}

impl ConversionSummary {
    /// True when the controller reports the conversion engine as armed
    pub fn is_active(&self) -> bool {
        self.status.as_deref() == Some("Active")
    }
}

/// Everything one status payload said about a controller
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ConversionSnapshot {
    /// APs currently converting
    pub aps: Vec<ConvertingAp>,
    /// Aggregate engine state
    pub summary: ConversionSummary,
}

/// Parse one conversion status payload into a normalized snapshot
pub fn parse_convert_status(payload: &Value) -> ConversionSnapshot {
    let mut snapshot = ConversionSnapshot::default();

    if let Some(params) = payload.get(PARAMETERS_KEY).and_then(Value::as_array) {
        for param in params {
            if let (Some(item), Some(value)) = (str_field(param, "Item"), str_field(param, "Value"))
            {
                match item {
                    "Status" => snapshot.summary.status = Some(value.to_string()),
                    "Mode" => snapshot.summary.mode = Some(value.to_string()),
                    "Current Simultaneous Converting" => {
                        snapshot.summary.current_converting = value.parse().unwrap_or(0)
                    }
                    "Max Simultaneous Converting" => {
                        snapshot.summary.max_converting = value.parse().unwrap_or(0)
                    }
                    "Start Time" => snapshot.summary.start_time = Some(value.to_string()),
                    "Current Status" => snapshot.summary.current_status = Some(value.to_string()),
                    _ => {}
                }
            }
        }
    }

    if let Some(groups) = payload.get(GROUPS_KEY).and_then(Value::as_array) {
        for group in groups {
            if let Some(name) = str_field(group, "AP Groups") {
                snapshot.summary.ap_groups.push(name.to_string());
            }
        }
    }

    match payload.get(IMAGE_STATUS_KEY) {
        Some(Value::Array(entries)) => {
            for entry in entries {
                if !entry.is_object() {
                    continue;
                }
                let failure = str_field(entry, "Failure Reason").filter(|r| !r.is_empty());
                snapshot.aps.push(ConvertingAp {
                    name: str_field(entry, "AP Name").unwrap_or("Unknown").to_string(),
                    mac: str_field(entry, "AP Mac").unwrap_or("Unknown").to_string(),
                    state: str_field(entry, "Upgrade State").unwrap_or("Unknown").to_string(),
                    detail: failure.map(str::to_string),
                });
            }
        }
        Some(_) => {}
        None => parse_raw_lines(payload, &mut snapshot),
    }

    snapshot
}

/// Heuristic scan of raw output lines for AP entries.
///
/// Lines are tokenized on whitespace; table furniture and totals rows
/// are dropped, and the first three tokens of what survives are taken
/// as name, hardware address, and state.
fn parse_raw_lines(payload: &Value, snapshot: &mut ConversionSnapshot) {
    let lines = match payload.get(DATA_KEY).and_then(Value::as_array) {
        Some(lines) => lines,
        None => return,
    };

    for line in lines.iter().filter_map(Value::as_str) {
        if line.trim().is_empty() {
            continue;
        }
        if HEADER_FRAGMENTS.iter().any(|fragment| line.contains(fragment)) {
            continue;
        }

        let parts: Vec<&str> = line.split_whitespace().collect();
        if parts.len() < 3 {
            continue;
        }
        let name = parts[0];
        if SUMMARY_TOKENS.iter().any(|token| name.contains(token)) {
            continue;
        }

        snapshot.aps.push(ConvertingAp {
            name: name.to_string(),
            mac: parts[1].to_string(),
            state: parts[2].to_string(),
            detail: if parts.len() > 3 {
                Some(parts[3..].join(" "))
            } else {
                None
            },
        });
    }
}

fn str_field<'a>(entry: &'a Value, key: &str) -> Option<&'a str> {
    entry.get(key).and_then(Value::as_str)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_parses_structured_payload() {
        let payload = json!({
            "AP Conversion Parameters": [
                { "Item": "Status", "Value": "Active" },
                { "Item": "Mode", "Value": "Specific APs" },
                { "Item": "Current Simultaneous Converting", "Value": "3" },
                { "Item": "Max Simultaneous Converting", "Value": "20" },
                { "Item": "Start Time", "Value": "Jun 1 12:04:11" },
                { "Item": "Current Status", "Value": "Converting" },
            ],
            "AP Groups Listed for Conversion": [
                { "AP Groups": "building-a" },
                { "AP Groups": "building-b" },
            ],
            "AP Image Conversion Status": [
                {
                    "AP Name": "ap-305-1",
                    "AP Mac": "aa:bb:cc:00:11:22",
                    "Upgrade State": "Downloading",
                    "Failure Reason": "",
                },
                {
                    "AP Name": "ap-305-2",
                    "AP Mac": "aa:bb:cc:00:11:23",
                    "Upgrade State": "Failed",
                    "Failure Reason": "image checksum mismatch",
                },
            ],
        });

        let snapshot = parse_convert_status(&payload);

        assert!(snapshot.summary.is_active());
        assert_eq!(snapshot.summary.current_converting, 3);
        assert_eq!(snapshot.summary.max_converting, 20);
        assert_eq!(snapshot.summary.ap_groups, ["building-a", "building-b"]);

        assert_eq!(snapshot.aps.len(), 2);
        assert_eq!(snapshot.aps[0].name, "ap-305-1");
        assert_eq!(snapshot.aps[0].detail, None);
        assert_eq!(
            snapshot.aps[1].detail.as_deref(),
            Some("image checksum mismatch")
        );
    }

    #[test]
    fn test_non_numeric_counters_read_as_zero() {
        let payload = json!({
            "AP Conversion Parameters": [
                { "Item": "Current Simultaneous Converting", "Value": "n/a" },
            ],
        });
        let snapshot = parse_convert_status(&payload);
        assert_eq!(snapshot.summary.current_converting, 0);
    }

    #[test]
    fn test_raw_lines_ignored_when_table_present() {
        let payload = json!({
            "AP Image Conversion Status": [
                { "AP Name": "ap-1", "AP Mac": "aa:aa", "Upgrade State": "Rebooting" },
            ],
            "_data": ["ap-1  aa:aa  Rebooting", "ap-2  bb:bb  Downloading"],
        });
        let snapshot = parse_convert_status(&payload);
        assert_eq!(snapshot.aps.len(), 1);
        assert_eq!(snapshot.aps[0].name, "ap-1");
    }

    #[test]
    fn test_raw_line_fallback() {
        let payload = json!({
            "_data": [
                "AP Name          AP Mac             Status",
                "-------          ------             ------",
                "",
                "ap-515-lobby  cc:dd:ee:00:11:22  Downloading  42 percent",
                "short line",
                "Total:3 Completed:1 Failed:0",
                "ap-515-cafe   cc:dd:ee:00:11:23  Queued",
            ],
        });

        let snapshot = parse_convert_status(&payload);

        assert_eq!(snapshot.aps.len(), 2);
        assert_eq!(snapshot.aps[0].name, "ap-515-lobby");
        assert_eq!(snapshot.aps[0].mac, "cc:dd:ee:00:11:22");
        assert_eq!(snapshot.aps[0].state, "Downloading");
        assert_eq!(snapshot.aps[0].detail.as_deref(), Some("42 percent"));
        assert_eq!(snapshot.aps[1].name, "ap-515-cafe");
        assert_eq!(snapshot.aps[1].detail, None);
    }

    #[test]
    fn test_empty_payload() {
        let snapshot = parse_convert_status(&json!({}));
        assert!(snapshot.aps.is_empty());
        assert!(!snapshot.summary.is_active());
    }
}
