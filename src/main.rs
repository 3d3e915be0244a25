mod commands;

use anyhow::Result;
use clap::{Parser, Subcommand};
use std::path::PathBuf;
use tracing::error;

use city_locator::config::Config;
use city_locator::log_format;

#[derive(Parser, Debug)]
#[command(
    name = "city-locator",
    about = "Geocode cities with provider fallback and answer action requests"
)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Serve action requests over HTTP at POST /invoke
    Serve {
        /// Interface to bind to
        #[arg(long, default_value = "0.0.0.0")]
        interface: String,
        /// Port to listen on
        #[arg(long, default_value_t = 8080)]
        port: u16,
    },
    /// Handle a single action event read from a file, or stdin when no file is given
    Invoke {
        /// Path to the event JSON
        event: Option<PathBuf>,
        /// Pretty-print the response envelope
        #[arg(long, default_value_t = false)]
        pretty: bool,
    },
    /// Geocode one city
    Geocode {
        city: String,
    },
    /// Geocode two cities and report the straight-line distance between them
    Distance {
        source: String,
        destination: String,
    },
}

async fn run(cli: Cli, config: Config) -> Result<()> {
    match cli.command {
        Commands::Serve { interface, port } => {
            commands::handle_serve(&config, interface, port).await
        }
        Commands::Invoke { event, pretty } => commands::handle_invoke(&config, event, pretty).await,
        Commands::Geocode { city } => commands::handle_geocode(&config, &city).await,
        Commands::Distance {
            source,
            destination,
        } => commands::handle_distance(&config, &source, &destination).await,
    }
}

#[tokio::main]
async fn main() {
    // Load environment variables from .env file
    dotenvy::dotenv().ok();

    let cli = Cli::parse();

    let config = match Config::from_env() {
        Ok(config) => config,
        Err(e) => {
            eprintln!("Invalid configuration: {:#}", e);
            std::process::exit(2);
        }
    };

    log_format::init(&config.log_level, config.log_format);

    if let Err(e) = run(cli, config).await {
        error!("{:#}", e);
        std::process::exit(1);
    }
}
