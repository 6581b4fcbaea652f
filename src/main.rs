use clap::{Parser, Subcommand};
use tokio::signal;
use tracing::{error, info};

use pendlewatch::app::App;
use pendlewatch::cli::{output, quote};
use pendlewatch::config::Config;

#[derive(Parser)]
#[command(name = "pendlewatch", version, about = "Pendle yield-market monitor")]
struct Cli {
    /// Path to the configuration file.
    #[arg(long, default_value = "config.toml")]
    config: String,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Run the monitoring daemon.
    Run,
    /// Quote one market once and print the ranked aggregator table.
    Quote {
        /// Chain id the market lives on.
        #[arg(long)]
        chain: u64,
        /// Market contract address.
        #[arg(long)]
        address: String,
    },
}

#[tokio::main]
async fn main() {
    let _ = dotenvy::dotenv();
    let cli = Cli::parse();

    let config = match Config::load(&cli.config) {
        Ok(c) => c,
        Err(e) => {
            eprintln!("Failed to load config: {e}");
            std::process::exit(1);
        }
    };

    match cli.command {
        Command::Run => {
            config.init_logging();
            info!("pendlewatch starting");

            tokio::select! {
                result = App::run(config) => {
                    if let Err(e) = result {
                        error!(error = %e, "Fatal error");
                        std::process::exit(1);
                    }
                }
                _ = signal::ctrl_c() => {
                    info!("Shutdown signal received");
                }
            }

            info!("pendlewatch stopped");
        }
        Command::Quote { chain, address } => {
            match App::single_quote(config, chain, &address).await {
                Ok(composite) => quote::print(&composite),
                Err(e) => {
                    output::error(&format!("quote failed: {e}"));
                    std::process::exit(1);
                }
            }
        }
    }
}
