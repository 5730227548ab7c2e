//! devc - devcontainer management tool

mod commands;

use clap::{ArgAction, Parser, Subcommand};
use commands::Context;
use devc_config::{GlobalConfig, Workspace};
use std::path::PathBuf;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

#[derive(Parser)]
#[command(name = "devc")]
#[command(author, version, about = "devcontainer management tool", long_about = None)]
struct Cli {
    /// Verbose output (-v info, -vv debug)
    #[arg(short, long, action = ArgAction::Count, global = true)]
    verbose: u8,

    /// Configuration directory, relative to the current directory
    #[arg(short, long, global = true, value_name = "DIR")]
    config_dir: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Build the devcontainer image
    Build,

    /// Start the devcontainer, creating it if needed
    Start,

    /// Stop the devcontainer
    Stop {
        /// Also remove containers and networks
        #[arg(short, long)]
        remove: bool,
    },

    /// List devcontainers of the current directory
    #[command(visible_aliases = ["ls", "ps"])]
    List,

    /// Open a shell inside the devcontainer
    Shell {
        /// Shell binary (default from global config, usually `sh`)
        #[arg(short, long)]
        shell: Option<String>,
    },

    /// Run a command inside the devcontainer
    Exec {
        /// Command and arguments
        #[arg(trailing_var_arg = true, required = true)]
        cmd: Vec<String>,
    },

    /// Create a minimal devcontainer.json
    Init,
}

#[tokio::main]
async fn main() {
    if let Err(e) = run().await {
        eprintln!("Error: {}", e);
        std::process::exit(1);
    }
}

fn log_filter(verbose: u8) -> EnvFilter {
    if std::env::var_os("RUST_LOG").is_some() {
        return EnvFilter::from_default_env();
    }
    EnvFilter::new(match verbose {
        0 => "warn",
        1 => "info",
        _ => "debug",
    })
}

async fn run() -> anyhow::Result<()> {
    let cli = Cli::parse();

    // Initialize logging
    tracing_subscriber::registry()
        .with(log_filter(cli.verbose))
        .with(
            tracing_subscriber::fmt::layer()
                .with_target(false)
                .with_writer(std::io::stderr),
        )
        .init();

    let global = match GlobalConfig::load() {
        Ok(config) => config,
        Err(e) => {
            tracing::warn!("Ignoring global config: {}", e);
            GlobalConfig::default()
        }
    };

    let workspace = Workspace::current()?;
    let config_dir = workspace.path.join(
        cli.config_dir
            .unwrap_or_else(|| PathBuf::from(&global.defaults.config_dir)),
    );
    let ctx = Context {
        workspace,
        config_dir,
        global,
    };

    match cli.command {
        Commands::Build => commands::build(&ctx).await?,
        Commands::Start => commands::start(&ctx).await?,
        Commands::Stop { remove } => commands::stop(&ctx, remove).await?,
        Commands::List => commands::list(&ctx).await?,
        Commands::Shell { shell } => commands::shell(&ctx, shell).await?,
        Commands::Exec { cmd } => commands::exec(&ctx, cmd).await?,
        Commands::Init => commands::init(&ctx)?,
    }

    Ok(())
}
