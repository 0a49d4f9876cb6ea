//! ap-shift CLI
//!
//! Single binary for the staged AP migration workflow:
//! - Fleet discovery through the conductor's REST API
//! - Cluster preparation and conversion over the controllers' consoles
//! - Live conversion monitoring
//! - An interactive session that keeps selections between steps

use std::path::PathBuf;

use anyhow::Result;
use clap::{Parser, Subcommand};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use ap_shift::commands;
use ap_shift::context::Settings;
use aps_core::traits::FleetDirectory;
use aps_fleet::FleetStore;

#[derive(Parser)]
#[command(name = "ap-shift")]
#[command(
    author,
    version,
    about = "Staged AP migration for clustered wireless controllers"
)]
#[command(propagate_version = true)]
struct Cli {
    /// Conductor address (overrides config)
    #[arg(short = 'm', long, global = true)]
    conductor: Option<String>,

    /// Account used for the API and the consoles
    #[arg(short, long, global = true)]
    username: Option<String>,

    /// Password; prefer the environment variable over the flag
    #[arg(long, global = true, env = "AP_SHIFT_PASSWORD", hide_env_values = true)]
    password: Option<String>,

    /// Path to configuration file
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    /// Answer yes to every confirmation prompt
    #[arg(short = 'y', long, global = true)]
    yes: bool,

    /// Enable verbose output
    #[arg(short, long, global = true, action = clap::ArgAction::Count)]
    verbose: u8,

    /// Suppress all output except errors
    #[arg(short, long, global = true)]
    quiet: bool,

    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
    /// Walk the conductor's API and record the fleet
    Discover,

    /// Show the recorded inventory
    /// Alias: info
    #[command(alias = "info")]
    Show,

    /// List clusters, or the members of one
    /// Alias: select
    #[command(alias = "select")]
    SelectCluster {
        /// Cluster profile name; lists every cluster when omitted
        cluster: Option<String>,
    },

    /// Disable redundancy and AP load-balancing on a cluster
    Prepare {
        /// Cluster profile name
        cluster: String,
    },

    /// Conversion engine operations
    Convert {
        #[command(subcommand)]
        action: ConvertAction,
    },

    /// Clear conversion state and restore cluster profiles
    Cleanup,

    /// Watch AP conversion progress live
    Monitor {
        /// Cluster profile name
        cluster: String,
    },

    /// Interactive migration session
    /// Alias: menu
    #[command(alias = "menu")]
    Run,

    /// Manage configuration
    Config {
        #[command(subcommand)]
        action: ConfigAction,
    },
}

#[derive(Subcommand)]
enum ConvertAction {
    /// Arm conversion on every member of a cluster
    Start {
        /// Cluster profile name
        cluster: String,
    },

    /// Enroll one more AP group on a converting cluster
    AddGroup {
        /// Cluster profile name
        cluster: String,
        /// AP group name
        group: String,
    },
}

#[derive(Subcommand)]
enum ConfigAction {
    /// Show current configuration
    Show,
    /// Write a default configuration file
    Init {
        /// Overwrite an existing file
        #[arg(short, long)]
        force: bool,
    },
    /// Show config file path
    Path,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // Setup logging based on verbosity
    tracing_subscriber::registry()
        .with(tracing_subscriber::EnvFilter::new(
            std::env::var("RUST_LOG").unwrap_or_else(|_| log_level(cli.quiet, cli.verbose).into()),
        ))
        .with(tracing_subscriber::fmt::layer().with_target(false))
        .init();

    let settings = || {
        Settings::resolve(
            cli.config.as_ref(),
            cli.conductor.clone(),
            cli.username.clone(),
            cli.password.clone(),
            cli.yes,
        )
    };

    // Handle no command - show a quick overview
    let command = match cli.command {
        Some(cmd) => cmd,
        None => {
            show_quick_overview(&settings()?);
            return Ok(());
        }
    };

    match command {
        Commands::Discover => commands::discover_command(&settings()?).await?,

        Commands::Show => commands::show_command(&settings()?)?,

        Commands::SelectCluster { cluster } => {
            commands::select_cluster_command(&settings()?, cluster.as_deref())?
        }

        Commands::Prepare { cluster } => commands::prepare_command(&settings()?, &cluster).await?,

        Commands::Convert { action } => match action {
            ConvertAction::Start { cluster } => {
                commands::convert_start_command(&settings()?, &cluster).await?
            }
            ConvertAction::AddGroup { cluster, group } => {
                commands::convert_add_group_command(&settings()?, &cluster, &group).await?
            }
        },

        Commands::Cleanup => commands::cleanup_command(&settings()?).await?,

        Commands::Monitor { cluster } => commands::monitor_command(&settings()?, &cluster).await?,

        Commands::Run => commands::run_command(&settings()?).await?,

        // Config never resolves settings; `config init --config <path>`
        // must work when the named file does not exist yet
        Commands::Config { action } => match action {
            ConfigAction::Show => commands::config_show(cli.config.as_ref())?,
            ConfigAction::Init { force } => commands::config_init(cli.config.as_ref(), force)?,
            ConfigAction::Path => {
                println!("{}", aps_core::config::default_config_path().display());
            }
        },
    }

    Ok(())
}

/// Default log filter for the given verbosity flags
fn log_level(quiet: bool, verbose: u8) -> &'static str {
    match (quiet, verbose) {
        (true, _) => "error",
        (false, 0) => "warn",
        (false, 1) => "info",
        (false, 2) => "debug",
        (false, _) => "trace",
    }
}

fn show_quick_overview(settings: &Settings) {
    println!();
    println!("  \x1b[1;34map-shift\x1b[0m - Staged AP migration for clustered controllers");
    println!();

    match settings.conductor_configured() {
        Some(address) => println!("  Conductor: \x1b[32m●\x1b[0m {}", address),
        None => {
            println!("  Conductor: \x1b[33m●\x1b[0m Not configured");
            println!("             Pass --conductor or set it in the config");
        }
    }

    let db = &settings.config.database_path;
    match FleetStore::open(db).and_then(|store| store.controllers()) {
        Ok(controllers) if !controllers.is_empty() => {
            println!(
                "  Inventory: {} controller(s) in {:?}",
                controllers.len(),
                db
            );
        }
        _ => {
            println!("  Inventory: empty");
            println!("             Run: ap-shift discover");
        }
    }

    println!();
    println!("  Commands:");
    println!("    ap-shift discover            Walk the conductor and record the fleet");
    println!("    ap-shift prepare <cluster>   Disable redundancy and AP load-balancing");
    println!("    ap-shift convert start <c>   Arm AP conversion on a cluster");
    println!("    ap-shift monitor <cluster>   Watch conversion progress live");
    println!("    ap-shift run                 Interactive migration session");
    println!();
}
