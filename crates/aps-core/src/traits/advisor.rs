//! Operator escalation for the prepare fallback

/// What to try next when a cluster profile name is rejected
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FallbackChoice {
    /// Query the controller's live membership for the profile name
    QueryLive,
    /// Try an operator-supplied profile name
    UseName(String),
    /// Give up on this controller
    Abort,
}

/// Decides how prepare recovers when a controller rejects the expected
/// cluster profile name.
///
/// The CLI implements this over stdin; tests script the answers.
pub trait ProfileAdvisor: Send + Sync {
    /// Called after `rejected` failed to enter the profile context on `host`
    fn advise(&self, host: &str, rejected: &str) -> FallbackChoice;

    /// Called when a live query turned up `discovered`; true means use it
    fn accept_discovered(&self, host: &str, discovered: &str) -> bool;
}
