//! Cadence: variable-delay repeating timer
//!
//! Main binary with subcommands:
//! - `run`: Fire a repeating interval driven by a delay list
//! - `plan`: Print the delays a list would produce, without waiting

use clap::{Parser, Subcommand};
use miette::Result;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use cadence_scheduler::DelaySequence;

mod daemon;
mod plan;

#[derive(Parser)]
#[command(name = "cadence")]
#[command(about = "Variable-delay repeating timer", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Fire a repeating interval until stopped (Ctrl-C) or the firing limit is hit
    Run {
        /// Comma-separated delays in milliseconds, drained from the end.
        /// "5000,2000,500" waits 500, then 2000, then 5000 forever.
        #[arg(long, env = "CADENCE_DELAYS")]
        delays: DelaySequence,

        /// Message logged on every firing
        #[arg(long, env = "CADENCE_MESSAGE", default_value = "tick")]
        message: String,

        /// Stop after this many firings
        #[arg(long, env = "CADENCE_MAX_FIRINGS")]
        max_firings: Option<u64>,
    },

    /// Print the delays that would be applied, in order
    Plan {
        /// Comma-separated delays in milliseconds
        #[arg(long, env = "CADENCE_DELAYS")]
        delays: DelaySequence,

        /// Number of firings to show
        #[arg(long, default_value = "10")]
        count: usize,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize tracing
    tracing_subscriber::registry()
        .with(tracing_subscriber::EnvFilter::new(
            std::env::var("RUST_LOG")
                .unwrap_or_else(|_| "cadence=info,cadence_scheduler=info".to_string()),
        ))
        .with(tracing_subscriber::fmt::layer())
        .init();

    let cli = Cli::parse();

    match cli.command {
        Commands::Run {
            delays,
            message,
            max_firings,
        } => daemon::run(delays, message, max_firings).await,

        Commands::Plan { delays, count } => {
            for line in plan::describe(&delays, count) {
                println!("{}", line);
            }
            Ok(())
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cli_is_well_formed() {
        use clap::CommandFactory;
        Cli::command().debug_assert();
    }

    #[test]
    fn test_parse_run_command() {
        let cli = Cli::try_parse_from([
            "cadence",
            "run",
            "--delays",
            "1000,100",
            "--max-firings",
            "3",
        ])
        .unwrap();

        match cli.command {
            Commands::Run {
                delays,
                message,
                max_firings,
            } => {
                assert_eq!(delays, DelaySequence::from_millis([1000, 100]).unwrap());
                assert_eq!(message, "tick");
                assert_eq!(max_firings, Some(3));
            }
            Commands::Plan { .. } => panic!("Expected Run command"),
        }
    }

    #[test]
    fn test_parse_rejects_zero_delay() {
        let result = Cli::try_parse_from(["cadence", "plan", "--delays", "100,0"]);
        assert!(result.is_err());
    }
}
