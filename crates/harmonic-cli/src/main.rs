use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;

mod commands;

#[derive(Parser)]
#[command(name = "harmonic", version, about = "Harmonic Exchange CLI")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Request quota inspection and enforcement
    Quota {
        #[command(subcommand)]
        action: commands::quota::QuotaAction,
    },
    /// Exchange request management
    Request {
        #[command(subcommand)]
        action: commands::request::RequestAction,
    },
    /// Badge tiers and awards
    Badge {
        #[command(subcommand)]
        action: commands::badge::BadgeAction,
    },
    /// Configuration management
    Config {
        #[command(subcommand)]
        action: commands::config::ConfigAction,
    },
}

fn init_tracing() {
    let filter = EnvFilter::try_from_env("HX_LOG").unwrap_or_else(|_| EnvFilter::new("warn"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

fn main() {
    init_tracing();

    let cli = Cli::parse();
    let result = match cli.command {
        Commands::Quota { action } => commands::quota::run(action),
        Commands::Request { action } => commands::request::run(action),
        Commands::Badge { action } => commands::badge::run(action),
        Commands::Config { action } => commands::config::run(action),
    };

    if let Err(e) = result {
        eprintln!("error: {e}");
        std::process::exit(1);
    }
}
