//! Text scanners shared by discovery and the console workflows

/// Extract a cluster profile name from a `Profile Name = <name>` line.
///
/// Controllers print the line both in membership listings and inside profile
/// banners; the name is the first token after the `=`, with any trailing
/// comma stripped.
pub fn extract_profile_name(output: &str) -> Option<String> {
    for line in output.lines() {
        if let Some((_, rest)) = line.split_once("Profile Name =") {
            if let Some(token) = rest.split_whitespace().next() {
                let token = token.trim_end_matches(',');
                if !token.is_empty() {
                    return Some(token.to_string());
                }
            }
        }
    }
    None
}
