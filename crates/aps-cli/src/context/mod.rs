//! Resolved invocation context and operator prompts
//!
//! Flags win over the configuration file, and anything still missing
//! that a command genuinely needs is asked for on stdin, once. The
//! stdin prompt helpers here are shared by every command, including
//! the prepare fallback ladder's [`StdinAdvisor`].

use std::path::PathBuf;

use anyhow::{bail, Context, Result};
use tracing::debug;

use aps_core::config::{self, ToolConfig};
use aps_core::error::ConfigError;
use aps_core::traits::{FallbackChoice, ProfileAdvisor};
use aps_core::Credentials;
use aps_fleet::{ApiClient, FleetStore};

use crate::output::print_warning;

/// Everything a command needs from the invocation
pub struct Settings {
    /// Loaded (or defaulted) configuration
    pub config: ToolConfig,
    /// Where the configuration came from, for messages
    pub config_path: PathBuf,
    /// `--conductor` flag
    pub conductor_override: Option<String>,
    /// `--username` flag
    pub username_override: Option<String>,
    /// `--password` flag or environment
    pub password: Option<String>,
    /// `--yes` flag; skips confirmation prompts
    pub assume_yes: bool,
}

impl Settings {
    /// Resolve settings from the global flags and the configuration file.
    ///
    /// A missing file at the default location falls back to defaults; a
    /// missing file named explicitly with `--config` is an error.
    pub fn resolve(
        config_path: Option<&PathBuf>,
        conductor: Option<String>,
        username: Option<String>,
        password: Option<String>,
        assume_yes: bool,
    ) -> Result<Self> {
        let (path, explicit) = match config_path {
            Some(path) => (path.clone(), true),
            None => (config::default_config_path(), false),
        };

        let config = match config::load_config::<ToolConfig>(&path) {
            Ok(config) => config,
            Err(ConfigError::NotFound(_)) if !explicit => {
                debug!(path = %path.display(), "no configuration file; using defaults");
                ToolConfig::default()
            }
            Err(e) => {
                return Err(e).with_context(|| format!("Failed to load config from {:?}", path))
            }
        };

        Ok(Self {
            config,
            config_path: path,
            conductor_override: conductor,
            username_override: username,
            password,
            assume_yes,
        })
    }

    /// Conductor address from the flag or the configuration, if any
    pub fn conductor_configured(&self) -> Option<&str> {
        self.conductor_override
            .as_deref()
            .or(self.config.conductor.as_deref())
    }

    /// Conductor address; an error when neither flag nor config has one
    pub fn conductor(&self) -> Result<String> {
        match self.conductor_configured() {
            Some(address) => Ok(address.to_string()),
            None => bail!("No conductor address; pass --conductor or set it in the config"),
        }
    }

    /// Credentials for the API and the consoles, prompting for whatever
    /// the flags and configuration left out
    pub fn credentials(&self) -> Result<Credentials> {
        let username = match self
            .username_override
            .clone()
            .or_else(|| self.config.username.clone())
        {
            Some(username) => username,
            None => prompt_line("Username")?,
        };
        if username.is_empty() {
            bail!("A username is required");
        }

        let password = match self.password.clone() {
            Some(password) => password,
            None => prompt_line(&format!("Password for {}", username))?,
        };
        if password.is_empty() {
            bail!("A password is required");
        }

        Ok(Credentials::new(username, password))
    }

    /// Open the fleet inventory at the configured database path
    pub fn open_store(&self) -> Result<FleetStore> {
        FleetStore::open(&self.config.database_path).with_context(|| {
            format!(
                "Failed to open fleet database at {:?}",
                self.config.database_path
            )
        })
    }

    /// Build the REST client for the configured API port
    pub fn api_client(&self) -> Result<ApiClient> {
        ApiClient::new(self.config.api_port).context("Failed to build the API client")
    }
}

/// Ask one line of input on stdin, trimmed
pub fn prompt_line(label: &str) -> Result<String> {
    print!("{}: ", label);
    std::io::Write::flush(&mut std::io::stdout())?;

    let mut input = String::new();
    let read = std::io::stdin().read_line(&mut input)?;
    if read == 0 {
        bail!("Input closed");
    }
    Ok(input.trim().to_string())
}

/// Ask a yes/no question; `assume_yes` short-circuits to true
pub fn confirm(question: &str, assume_yes: bool) -> Result<bool> {
    if assume_yes {
        return Ok(true);
    }

    print!("{} [y/N] ", question);
    std::io::Write::flush(&mut std::io::stdout())?;

    let mut input = String::new();
    std::io::stdin().read_line(&mut input)?;
    Ok(input.trim().eq_ignore_ascii_case("y"))
}

/// Menu meaning of one fallback answer
#[derive(Debug, PartialEq, Eq)]
enum FallbackPick {
    QueryLive,
    Manual,
    Skip,
}

fn parse_fallback_pick(input: &str) -> Option<FallbackPick> {
    match input.trim() {
        "1" => Some(FallbackPick::QueryLive),
        "2" => Some(FallbackPick::Manual),
        "3" | "q" => Some(FallbackPick::Skip),
        _ => None,
    }
}

/// Profile advisor that escalates to the operator on stdin.
///
/// Consulted by the prepare workflow when a controller rejects the
/// cluster profile name the directory expected.
pub struct StdinAdvisor;

impl ProfileAdvisor for StdinAdvisor {
    fn advise(&self, host: &str, rejected: &str) -> FallbackChoice {
        print_warning(&format!(
            "{} did not accept cluster profile '{}'",
            host, rejected
        ));
        println!("  1) query the live cluster membership for the profile name");
        println!("  2) enter a profile name manually");
        println!("  3) skip this controller");

        loop {
            let answer = match prompt_line("Choice") {
                Ok(answer) => answer,
                Err(_) => return FallbackChoice::Abort,
            };
            match parse_fallback_pick(&answer) {
                Some(FallbackPick::QueryLive) => return FallbackChoice::QueryLive,
                Some(FallbackPick::Manual) => match prompt_line("Cluster profile name") {
                    Ok(name) if !name.is_empty() => return FallbackChoice::UseName(name),
                    Ok(_) => continue,
                    Err(_) => return FallbackChoice::Abort,
                },
                Some(FallbackPick::Skip) => return FallbackChoice::Abort,
                None => print_warning("Enter 1, 2, or 3"),
            }
        }
    }

    fn accept_discovered(&self, host: &str, discovered: &str) -> bool {
        confirm(
            &format!("{} reports cluster profile '{}'. Use it?", host, discovered),
            false,
        )
        .unwrap_or(false)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn flag_conductor_wins_over_config() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.toml");
        std::fs::write(&path, "conductor = \"10.0.0.9\"\n").unwrap();

        let settings =
            Settings::resolve(Some(&path), Some("10.0.0.1".to_string()), None, None, false)
                .unwrap();
        assert_eq!(settings.conductor().unwrap(), "10.0.0.1");

        let settings = Settings::resolve(Some(&path), None, None, None, false).unwrap();
        assert_eq!(settings.conductor().unwrap(), "10.0.0.9");
    }

    #[test]
    fn missing_conductor_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.toml");
        std::fs::write(&path, "api_port = 4343\n").unwrap();

        let settings = Settings::resolve(Some(&path), None, None, None, false).unwrap();
        assert!(settings.conductor().is_err());
    }

    #[test]
    fn explicit_missing_config_fails() {
        let path = PathBuf::from("/nonexistent/ap-shift/config.toml");
        assert!(Settings::resolve(Some(&path), None, None, None, false).is_err());
    }

    #[test]
    fn credentials_come_from_flags_without_prompting() {
        let settings = Settings {
            config: ToolConfig::default(),
            config_path: PathBuf::from("unused.toml"),
            conductor_override: None,
            username_override: Some("admin".to_string()),
            password: Some("secret".to_string()),
            assume_yes: false,
        };

        let credentials = settings.credentials().unwrap();
        assert_eq!(credentials.username, "admin");
        assert_eq!(credentials.password, "secret");
    }

    #[test]
    fn assume_yes_skips_the_prompt() {
        assert!(confirm("anything", true).unwrap());
    }

    #[test]
    fn fallback_picks_parse() {
        assert_eq!(parse_fallback_pick("1"), Some(FallbackPick::QueryLive));
        assert_eq!(parse_fallback_pick(" 2 "), Some(FallbackPick::Manual));
        assert_eq!(parse_fallback_pick("3"), Some(FallbackPick::Skip));
        assert_eq!(parse_fallback_pick("q"), Some(FallbackPick::Skip));
        assert_eq!(parse_fallback_pick("yes"), None);
        assert_eq!(parse_fallback_pick(""), None);
    }
}
