//! Prompt vocabulary for the controller shell
//!
//! Confirmation questions, context banners, and rejection markers the
//! workflows look for in captured output. Kept in one place so every
//! workflow screens the same strings.

/// Confirmation question printed by destructive `ap convert` commands
pub const PROCEED_PROMPT: &str = "Do you want to proceed with the operation? [y/n]:";

/// Markers that indicate the shell entered a cluster profile context.
///
/// Firmware builds vary in case and banner wording; any one counts.
pub const PROFILE_CONTEXT_MARKERS: [&str; 4] = [
    "Classic Controller Cluster Profile",
    "(lc-cluster-profile)",
    "(LC-CLUSTER-PROFILE)",
    "lc-cluster-profile",
];

/// Substrings that mark a rejected configuration command
pub const ERROR_MARKERS: [&str; 2] = ["Error", "Invalid"];

/// True when `output` shows the shell inside a cluster profile context
pub fn entered_profile_context(output: &str) -> bool {
    PROFILE_CONTEXT_MARKERS
        .iter()
        .any(|marker| output.contains(marker))
}

/// True when `output` carries a rejection marker
pub fn contains_error_marker(output: &str) -> bool {
    ERROR_MARKERS.iter().any(|marker| output.contains(marker))
}

/// One trigger/response pair for unattended confirmation handling
#[derive(Debug, Clone)]
pub struct PromptRule {
    /// Substring that identifies the question
    pub trigger: String,
    /// Line sent back when the trigger appears
    pub response: String,
}

impl PromptRule {
    /// Create a new rule
    pub fn new(trigger: impl Into<String>, response: impl Into<String>) -> Self {
        Self {
            trigger: trigger.into(),
            response: response.into(),
        }
    }
}

/// Ordered confirmation table; the first matching rule wins
#[derive(Debug, Clone, Default)]
pub struct PromptPolicy {
    rules: Vec<PromptRule>,
}

impl PromptPolicy {
    /// Create a policy from an ordered rule table
    pub fn new(rules: Vec<PromptRule>) -> Self {
        Self { rules }
    }

    /// Policy covering the stock `ap convert` confirmation
    pub fn standard() -> Self {
        Self::new(vec![PromptRule::new(PROCEED_PROMPT, "y")])
    }

    /// First rule whose trigger appears in `output`
    pub fn first_match(&self, output: &str) -> Option<&PromptRule> {
        self.rules.iter().find(|rule| output.contains(&rule.trigger))
    }
}
