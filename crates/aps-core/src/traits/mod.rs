//! Trait seams between the workflow crates
//!
//! Concrete transports (SSH console, HTTPS API, SQLite store) live in the
//! leaf crates; the workflows only see these traits, so tests can script
//! every exchange.

mod advisor;
mod console;
mod directory;
mod status;

pub use advisor::{FallbackChoice, ProfileAdvisor};
pub use console::{ConsoleConnector, RemoteConsole};
pub use directory::FleetDirectory;
pub use status::ConvertStatusSource;
