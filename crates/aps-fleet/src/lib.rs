//! Fleet discovery and inventory
//!
//! Talks to the conductor's REST API to enumerate managed controllers,
//! resolves each controller's cluster membership, and persists the
//! result in a local SQLite inventory that the workflows read back.

pub mod api;
pub mod discovery;
pub mod store;

pub use api::{ApiClient, ApiSession, RestStatusSource};
pub use discovery::{discover_fleet, DiscoveryOutcome};
pub use store::FleetStore;
