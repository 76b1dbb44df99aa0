//! ITSM console binary - composition root.
//!
//! 1. Parse CLI flags and load configuration from TOML
//! 2. Initialise logging
//! 3. Build the HTTP gateway and the chat controller
//! 4. Print replies from the controller's event stream
//! 5. Read operator input from stdin until /quit or EOF

mod cli;
mod render;
mod repl;

use std::sync::Arc;

use clap::Parser;
use tokio::io::{AsyncBufReadExt, BufReader};

use itsm_chat::{ChatController, HttpGateway};
use itsm_core::config::{ConsoleConfig, GeneralConfig};

use crate::cli::CliArgs;
use crate::repl::{Console, Flow};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let args = CliArgs::parse();
    let config_file = args.resolve_config_path();

    // Loaded before tracing is up so the file's log level can apply.
    let loaded = if config_file.exists() {
        Some(ConsoleConfig::load(&config_file))
    } else {
        None
    };
    let config_level = match &loaded {
        Some(Ok(config)) => config.general.log_level.clone(),
        _ => GeneralConfig::default().log_level,
    };

    // Tracing. Logs go to stderr, the conversation to stdout.
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| {
                tracing_subscriber::EnvFilter::new(args.resolve_log_level(&config_level))
            }),
        )
        .with_writer(std::io::stderr)
        .init();

    tracing::info!("Starting ITSM console v{}", env!("CARGO_PKG_VERSION"));

    let mut config = match loaded {
        Some(Ok(config)) => {
            tracing::info!(path = %config_file.display(), "Configuration loaded");
            config
        }
        Some(Err(e)) => {
            tracing::warn!(path = %config_file.display(), error = %e, "Invalid configuration, using defaults");
            ConsoleConfig::default()
        }
        None => {
            tracing::info!(path = %config_file.display(), "No configuration file, using defaults");
            ConsoleConfig::default()
        }
    };
    config.backend.base_url = args.resolve_backend_url(&config.backend.base_url);

    if args.init_config {
        config.save(&config_file)?;
        println!("Wrote {}", config_file.display());
        return Ok(());
    }

    // Backend and controller.
    let gateway = HttpGateway::new(&config.backend)?;
    tracing::info!(url = %gateway.chat_url(), "Chat endpoint configured");
    let controller = Arc::new(ChatController::new(config.chat.clone(), Arc::new(gateway)));

    let printer = tokio::spawn(repl::print_events(
        Arc::clone(&controller),
        controller.subscribe(),
    ));

    let console = Console::new(Arc::clone(&controller));
    console.show(controller.current_session()?)?;
    println!("Type /help for commands.");

    // === Input loop ===

    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    while let Some(line) = lines.next_line().await? {
        let command = match repl::parse(&line) {
            Ok(Some(command)) => command,
            Ok(None) => continue,
            Err(e) => {
                println!("! {}", e);
                continue;
            }
        };
        match console.execute(command).await {
            Ok(Flow::Continue) => {}
            Ok(Flow::Quit) => break,
            Err(e) => println!("! {}", e),
        }
    }

    printer.abort();
    tracing::info!("ITSM console stopped");
    Ok(())
}
