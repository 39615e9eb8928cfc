//! Crypto report bot
//!
//! # Usage
//!
//! ```bash
//! # Required: BOT_API, GEMINI_API, EXA_API, ALPHA_API (a .env file works too)
//! cargo run --bin crypto-bot -p agent-crypto
//!
//! # One report on stdout, no Telegram involved
//! cargo run --bin crypto-bot -p agent-crypto -- report BTC --chart
//! ```

use agent_crypto::{App, ChartOutcome, ChartRenderer, CryptoConfig, ReportGenerator, Symbol};
use clap::{Parser, Subcommand};
use std::sync::Arc;
use tracing::info;

#[derive(Parser, Debug)]
#[command(name = "crypto-bot")]
#[command(about = "Telegram bot writing crypto market reports", long_about = None)]
struct Args {
    #[command(subcommand)]
    command: Option<Command>,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Run the Telegram bot (default)
    Serve,
    /// Generate one report and print it
    Report {
        /// Ticker symbol, e.g. BTC
        symbol: String,
        /// Also render the 7-day chart and print its path
        #[arg(long)]
        chart: bool,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let _ = dotenvy::dotenv();
    let args = Args::parse();

    let config = Arc::new(CryptoConfig::from_env()?);
    agent_utils::init_tracing_with(config.log_format, "info");
    info!(?config, "Configuration loaded");

    let app = App::from_config(config)?;

    match args.command.unwrap_or(Command::Serve) {
        Command::Serve => app.serve().await?,
        Command::Report { symbol, chart } => {
            let symbol = Symbol::from_user_input(&symbol);

            if chart {
                let (report, outcome) = tokio::join!(
                    app.crew().final_summary(&symbol),
                    app.charts().render(&symbol)
                );
                println!("{}", report?);
                match outcome {
                    ChartOutcome::Rendered(artifact) => {
                        println!("\nChart: {}", artifact.keep().display());
                    }
                    ChartOutcome::Unavailable(message) => println!("\n{message}"),
                }
            } else {
                println!("{}", app.crew().final_summary(&symbol).await?);
            }
        }
    }

    Ok(())
}
