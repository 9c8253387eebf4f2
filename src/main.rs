use clap::{Parser, Subcommand};
use std::path::PathBuf;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[derive(Parser)]
#[command(name = "upmon")]
#[command(about = "Batch upload monitor", long_about = None)]
struct Cli {
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
    /// Run the client for every monitored entity and report the outcomes
    Run {
        /// Entity list file, overriding the configured one
        #[arg(long)]
        entities: Option<PathBuf>,
    },
    /// Classify an existing run log without invoking the client
    Check {
        /// Path to the log artifact
        log: PathBuf,
        /// Entity name for the report subject (defaults to the file stem)
        #[arg(long)]
        entity: Option<String>,
    },
    Config {
        #[command(subcommand)]
        action: ConfigAction,
    },
}

#[derive(Subcommand)]
enum ConfigAction {
    /// Write a commented starter config
    Init {
        #[arg(long)]
        stdout: bool,
    },
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "upmon=info".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let cli = Cli::parse();
    let config_path = upmon::config::resolve_config_path(cli.config.as_deref());

    match cli.command {
        Some(Commands::Run { entities }) => run_batch(config_path, entities).await?,
        None => run_batch(config_path, None).await?,
        Some(Commands::Check { log, entity }) => {
            upmon::cli::check::check(&log, entity, config_path)?;
        }
        Some(Commands::Config { action }) => match action {
            ConfigAction::Init { stdout } => {
                upmon::cli::config::init(stdout)?;
            }
        },
    }

    Ok(())
}

async fn run_batch(
    config_path: Option<PathBuf>,
    entities: Option<PathBuf>,
) -> Result<(), Box<dyn std::error::Error>> {
    let Some(config_path) = config_path else {
        eprintln!("Error: config not found");
        eprintln!("Searched locations:");
        eprintln!("  ~/.config/upmon/config.yml");
        eprintln!("  /etc/upmon/config.yml");
        eprintln!("\nUse --config <path> to specify a config file, or run 'upmon config init' to generate one.");
        std::process::exit(1);
    };

    let failed = upmon::cli::run::run(&config_path, entities).await?;
    if failed > 0 {
        std::process::exit(1);
    }
    Ok(())
}
