use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;

mod commands;

#[derive(Parser)]
#[command(name = "upkeep-cli", version, about = "UpKeep CLI")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Platform connection management
    Auth {
        #[command(subcommand)]
        action: commands::auth::AuthAction,
    },
    /// Contact roster and nudges
    Contact {
        #[command(subcommand)]
        action: commands::contact::ContactAction,
    },
    /// Signal feed and assistant
    Feed {
        #[command(subcommand)]
        action: commands::feed::FeedAction,
    },
    /// Configuration management
    Config {
        #[command(subcommand)]
        action: commands::config::ConfigAction,
    },
}

fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")),
        )
        .init();

    let cli = Cli::parse();
    let result = match cli.command {
        Commands::Auth { action } => commands::auth::run(action),
        Commands::Contact { action } => commands::contact::run(action),
        Commands::Feed { action } => commands::feed::run(action),
        Commands::Config { action } => commands::config::run(action),
    };

    if let Err(e) = result {
        eprintln!("error: {e}");
        std::process::exit(1);
    }
}
