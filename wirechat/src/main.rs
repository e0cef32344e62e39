//! `WireChat`: command-line chat client.
//!
//! Connects to the configured server, authenticates with the stored token,
//! and turns the terminal into a chat session: inbound events print as
//! timestamped lines, typed lines go out as messages, and lines starting
//! with the command prefix run client commands.
//!
//! ```bash
//! # Server from the config file
//! cargo run --bin wirechat
//!
//! # Server from the command line
//! cargo run --bin wirechat -- --server wss://chat.example.com/api
//!
//! # Or via environment variables
//! WIRECHAT_SERVER=wss://chat.example.com/api cargo run --bin wirechat
//! ```

use std::path::Path;
use std::process::ExitCode;

use clap::Parser;
use tokio::io::AsyncBufReadExt;
use tracing_appender::non_blocking::WorkerGuard;

use wirechat::client::Client;
use wirechat::config::{CliArgs, ClientConfig, Credentials};
use wirechat::render;

#[tokio::main]
async fn main() -> ExitCode {
    let cli = CliArgs::parse();

    let config = match ClientConfig::load(&cli) {
        Ok(config) => config,
        Err(err) => {
            eprintln!("wirechat: {err}");
            return ExitCode::FAILURE;
        }
    };
    let credentials = match Credentials::load(cli.auth.as_deref()) {
        Ok(credentials) => credentials,
        Err(err) => {
            eprintln!("wirechat: {err}");
            return ExitCode::FAILURE;
        }
    };

    // Logging goes to a file so the terminal stays clean for chat output.
    let _log_guard = init_logging(&cli.log_level, cli.log_file.as_deref());
    tracing::info!("wirechat starting");

    let Some(options) = config.to_client_options(&credentials) else {
        eprintln!("wirechat: no server URL configured (--server, WIRECHAT_SERVER, or [server] url)");
        return ExitCode::FAILURE;
    };

    let (client, line_tx, mut events) = Client::new(options);

    // stdin → event loop. Lines typed before authentication are dropped by
    // the client rather than buffered.
    tokio::spawn(async move {
        let mut lines = tokio::io::BufReader::new(tokio::io::stdin()).lines();
        while let Ok(Some(line)) = lines.next_line().await {
            if line_tx.send(line).await.is_err() {
                break;
            }
        }
    });

    // event loop → terminal.
    let printer = tokio::spawn(async move {
        while let Some(event) = events.recv().await {
            println!("{}", render::stamp(&render::format_event(&event)));
        }
    });

    let shutdown = client.run().await;
    tracing::info!(?shutdown, "wirechat exiting");

    // The client dropped its render sender; let the printer drain.
    let _ = printer.await;

    // A ban exits like any other shutdown, no special code.
    ExitCode::SUCCESS
}

/// Initialize file-based logging.
///
/// Returns a [`WorkerGuard`] that must be held until shutdown so buffered
/// log entries are flushed.
fn init_logging(level: &str, file_path: Option<&Path>) -> Option<WorkerGuard> {
    let default_path = std::env::temp_dir().join("wirechat.log");
    let log_path = file_path.unwrap_or(&default_path);

    let log_dir = log_path.parent()?;
    let file_name = log_path.file_name()?.to_str()?;

    let file_appender = tracing_appender::rolling::never(log_dir, file_name);
    let (non_blocking, guard) = tracing_appender::non_blocking(file_appender);

    let env_filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(level));

    tracing_subscriber::fmt()
        .with_writer(non_blocking)
        .with_env_filter(env_filter)
        .with_ansi(false)
        .init();

    Some(guard)
}
