//! ---
//! ems_section: "12-gui-setup-wizard"
//! ems_subsection: "binary"
//! ems_type: "source"
//! ems_scope: "code"
//! ems_description: "Binary entrypoint for the Sunkalp monitor CLI and dashboard."
//! ems_version: "v0.0.0-prealpha"
//! ems_owner: "tbd"
//! ---
use std::path::PathBuf;

use anyhow::Result;
use clap::{ArgAction, Parser, Subcommand};
use sunkalp_common::config::AppConfig;
use sunkalp_common::logging::init_tracing;
use sunkalp_common::version::version_text;
use sunkalp_core::Monitor;
use tracing::info;

mod commands;
mod tui;

#[derive(Debug, Parser)]
#[command(
    author,
    disable_version_flag = true,
    about = "Solar microgrid telemetry monitor",
    long_about = None
)]
struct Cli {
    #[arg(long, value_name = "FILE", help = "Path to configuration file")]
    config: Option<PathBuf>,

    #[arg(
        long,
        value_name = "DIR",
        help = "Directory holding the persisted session (overrides storage.directory)"
    )]
    state_dir: Option<PathBuf>,

    #[arg(
        short = 'V',
        long = "version",
        action = ArgAction::SetTrue,
        help = "Print extended version information and exit"
    )]
    version: bool,

    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Debug, Clone, Subcommand)]
enum Commands {
    #[command(about = "Open the terminal dashboard (default)")]
    Dashboard,
    #[command(about = "Sign in with an identity token issued by the identity provider")]
    Login {
        #[arg(long, value_name = "TOKEN", help = "ID token, or '-' to read it from stdin")]
        token: String,
    },
    #[command(about = "Sign out and clear every persisted session value")]
    Logout,
    #[command(about = "Store channel credentials and verify them with one poll")]
    Connect {
        #[arg(long = "channel", value_name = "ID")]
        channel: String,
        #[arg(long = "api-key", value_name = "KEY")]
        api_key: String,
    },
    #[command(about = "Show the persisted session")]
    Status,
    #[command(about = "Poll once and print readings and alerts")]
    Poll {
        #[arg(long = "channel", value_name = "ID", requires = "api_key")]
        channel: Option<String>,
        #[arg(long = "api-key", value_name = "KEY", requires = "channel")]
        api_key: Option<String>,
    },
    #[command(about = "Poll on the configured interval until interrupted")]
    Watch,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    if cli.version {
        println!("{}", version_text());
        return Ok(());
    }

    let mut candidates = Vec::new();
    if let Some(path) = &cli.config {
        candidates.push(path.clone());
    }
    candidates.push(PathBuf::from("configs/sunkalp.toml"));
    candidates.push(PathBuf::from("configs/sunkalp.dev.toml"));
    let loaded = AppConfig::load_with_source(&candidates)?;
    let mut config = loaded.config;

    let command = cli.command.unwrap_or(Commands::Dashboard);
    if matches!(command, Commands::Dashboard) {
        // Anything written to stdout would tear the terminal UI.
        config.logging.stdout = false;
    }
    init_tracing("sunkalp", &config.logging)?;
    match &loaded.source {
        Some(path) => info!(config_path = %path.display(), "configuration loaded"),
        None => info!("no configuration file found; using built-in defaults"),
    }

    let monitor = Monitor::from_config(&config, cli.state_dir.as_deref())?;
    match command {
        Commands::Dashboard => tui::run(monitor)?,
        Commands::Login { token } => commands::login(monitor, &token)?,
        Commands::Logout => commands::logout(monitor),
        Commands::Connect { channel, api_key } => {
            commands::connect(monitor, &channel, &api_key).await?
        }
        Commands::Status => commands::status(&monitor, &config, loaded.source.as_deref()),
        Commands::Poll { channel, api_key } => {
            let overrides = channel.zip(api_key);
            commands::poll(monitor, overrides).await?
        }
        Commands::Watch => commands::watch(monitor).await?,
    }
    Ok(())
}
