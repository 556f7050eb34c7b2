//! seatkit-collect binary
//!
//! Run with: cargo run -- --uid 1000 --pid 4242
//!
//! For help: cargo run -- --help

use std::io::IsTerminal;

use clap::Parser;
use seatkit::{Cli, run_collect_with_cli};

#[tokio::main(flavor = "current_thread")]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    match run_collect_with_cli(&cli).await {
        Ok(outcome) => {
            let code = outcome.exit_code();
            if code != 0 {
                std::process::exit(code);
            }
            Ok(())
        }
        Err(e) => {
            // Stdout is reserved for collected parameters
            eprintln!("Error: {e:#}");

            if std::io::stdin().is_terminal() {
                eprintln!("\nFor debugging, run with --diagnostic to log to a file.");
                eprintln!("Or use -v/-vv/-vvv for more verbose logging.");
            }

            std::process::exit(1);
        }
    }
}
