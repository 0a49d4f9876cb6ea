//! Controller command vocabulary
//!
//! Every line the workflows send is assembled here, so the exact wording
//! lives in one place.

/// Switch the configuration context to a hierarchy node
pub fn change_config_node(node_path: &str) -> String {
    format!("change-config-node {}", node_path)
}

/// Enter configuration mode
pub const CONFIGURE_TERMINAL: &str = "configure terminal";

/// Enter a named cluster profile context
pub fn cluster_profile(name: &str) -> String {
    format!("lc-cluster group-profile {}", name)
}

/// Disable AP load balancing inside a cluster profile
pub const NO_ACTIVE_AP_LB: &str = "no active-ap-lb";

/// Disable redundancy inside a cluster profile
pub const NO_REDUNDANCY: &str = "no redundancy";

/// Re-enable AP load balancing inside a cluster profile
pub const ACTIVE_AP_LB: &str = "active-ap-lb";

/// Re-enable redundancy inside a cluster profile
pub const REDUNDANCY: &str = "redundancy";

/// Leave the current context
pub const EXIT: &str = "exit";

/// Persist the configuration of the current node
pub const WRITE_MEMORY: &str = "write memory";

/// Live cluster membership listing, used to recover a profile name
pub const SHOW_CLUSTER_MEMBERSHIP: &str = "show lc-cluster group-membership";

/// Arm the conversion engine for specific AP groups
pub fn convert_activate(max_downloads: u16) -> String {
    format!(
        "ap convert active specific-aps activate max-downloads {} no-pre-validation",
        max_downloads
    )
}

/// Enroll one AP group into the active conversion
pub fn convert_add_group(group: &str) -> String {
    format!("ap convert add ap-group {}", group)
}

/// Drop every AP group from the conversion
pub const CONVERT_CLEAR_ALL: &str = "ap convert clear-all";

/// Cancel an active conversion
pub const CONVERT_CANCEL: &str = "ap convert cancel";

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_command_formatting() {
        assert_eq!(
            change_config_node("/md/site-east"),
            "change-config-node /md/site-east"
        );
        assert_eq!(
            cluster_profile("east-cluster"),
            "lc-cluster group-profile east-cluster"
        );
        assert_eq!(
            convert_activate(20),
            "ap convert active specific-aps activate max-downloads 20 no-pre-validation"
        );
        assert_eq!(
            convert_add_group("building-a"),
            "ap convert add ap-group building-a"
        );
    }
}
