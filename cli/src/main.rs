//! Deckhand CLI - provision, track and tear down static sites and servers

#![cfg_attr(test, allow(clippy::expect_used))]

use std::process::ExitCode;

use clap::Parser;
use deckhand_cli::cli::Cli;
use deckhand_cli::output::json::{error_code, format_error};
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> ExitCode {
    // Diagnostics go to stderr so stdout stays parseable in --json mode.
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_env("DECKHAND_LOG").unwrap_or_else(|_| EnvFilter::new("warn")),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    let json = cli.json();
    match cli.run().await {
        Ok(code) => code,
        Err(e) => {
            let obj = if json {
                format_error(&format!("{e:#}"), error_code(&e)).ok()
            } else {
                None
            };
            match obj {
                Some(obj) => println!("{obj}"),
                None => eprintln!("Error: {e}"),
            }
            ExitCode::FAILURE
        }
    }
}
