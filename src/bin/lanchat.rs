//! lanchat - peer-to-peer LAN chat
//!
//! One process listens for peers on the given port and dials peers on
//! request, keeping any number of chat connections open at once.
//!
//! # Usage
//!
//! ```bash
//! # Listen on port 8000
//! lanchat 8000
//!
//! # Give up on unreachable peers after 2 seconds
//! lanchat 8000 --connect-timeout 2
//!
//! # Write debug logs to a file instead of the terminal
//! RUST_LOG=lanchat_node=debug lanchat 8000 --log-file /tmp/lanchat.log
//! ```
//!
//! # Signal Handling
//!
//! - SIGTERM/SIGINT: close every connection and exit with code 0

use std::fs::File;
use std::path::PathBuf;
use std::process;
use std::sync::Mutex;
use std::time::Duration;

use anyhow::{Context, Result};
use clap::error::ErrorKind;
use clap::Parser;
use tokio::io::BufReader;
use tracing::{error, info};
use tracing_subscriber::EnvFilter;

use lanchat_node::config::{NodeConfig, DEFAULT_CONNECT_TIMEOUT};
use lanchat_node::display::spawn_display;
use lanchat_node::shutdown::shutdown;
use lanchat_node::Node;
use lanchat_protocol::HELP_TEXT;

/// Peer-to-peer LAN chat
#[derive(Parser, Debug)]
#[command(name = "lanchat", version, about)]
struct Args {
    /// Port to listen on for peer connections (1-65535)
    #[arg(value_name = "PORT", value_parser = clap::value_parser!(u16).range(1..))]
    port: u16,

    /// Seconds to wait for an outbound connection before giving up
    #[arg(long, value_name = "SECS", default_value_t = DEFAULT_CONNECT_TIMEOUT.as_secs(), value_parser = clap::value_parser!(u64).range(1..))]
    connect_timeout: u64,

    /// Write logs to this file instead of stderr
    #[arg(long, value_name = "PATH")]
    log_file: Option<PathBuf>,

    /// Log at debug level by default
    #[arg(short, long)]
    verbose: bool,
}

impl Args {
    fn node_config(&self) -> NodeConfig {
        NodeConfig {
            connect_timeout: Duration::from_secs(self.connect_timeout),
            ..NodeConfig::new(self.port)
        }
    }
}

fn main() {
    let args = match Args::try_parse() {
        Ok(args) => args,
        Err(e) => match e.kind() {
            ErrorKind::DisplayHelp | ErrorKind::DisplayVersion => e.exit(),
            _ => {
                let _ = e.print();
                process::exit(1);
            }
        },
    };

    if let Err(e) = init_logging(&args) {
        eprintln!("lanchat: {e:#}");
        process::exit(1);
    }

    let code = match run(args) {
        Ok(()) => 0,
        Err(e) => {
            error!(error = %e, "Fatal error");
            eprintln!("lanchat: {e:#}");
            1
        }
    };

    // Exit explicitly: the runtime's stdin reader is a blocking thread that
    // would otherwise keep the process alive until the next input line.
    process::exit(code);
}

/// Installs the tracing subscriber.
///
/// Logs go to stderr by default and default to `warn` so they stay out of
/// the chat output; `--log-file` redirects them.
fn init_logging(args: &Args) -> Result<()> {
    let default_level = if args.verbose { "debug" } else { "warn" };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| {
        EnvFilter::new(format!(
            "lanchat={default_level},lanchat_node={default_level},lanchat_protocol={default_level}"
        ))
    });

    match &args.log_file {
        Some(path) => {
            let file = File::create(path)
                .with_context(|| format!("Failed to create log file {}", path.display()))?;
            tracing_subscriber::fmt()
                .with_env_filter(filter)
                .with_writer(Mutex::new(file))
                .with_ansi(false)
                .init();
        }
        None => {
            tracing_subscriber::fmt()
                .with_env_filter(filter)
                .with_writer(std::io::stderr)
                .init();
        }
    }

    Ok(())
}

/// Runs the node (async entry point).
#[tokio::main]
async fn run(args: Args) -> Result<()> {
    info!(
        version = env!("CARGO_PKG_VERSION"),
        pid = process::id(),
        "lanchat starting"
    );

    let (display, display_task) = spawn_display(tokio::io::stdout());

    let (node, listener) = Node::start(args.node_config(), display.clone())
        .await
        .context("Failed to start listener")?;
    tokio::spawn(listener.run());

    display.reply(format!(
        "Chat application started on port {}",
        node.identity().listen_port
    ));
    display.reply(HELP_TEXT);

    let dispatcher = node.dispatcher();
    let stdin = BufReader::new(tokio::io::stdin());

    tokio::select! {
        _ = dispatcher.run(stdin) => {}
        result = wait_for_shutdown_signal() => {
            if let Err(e) = result {
                error!(error = %e, "Error waiting for shutdown signal");
            }
            info!("Shutdown signal received");
            shutdown(&node).await;
        }
    }

    display.flush().await;
    drop(display);
    display_task.abort();

    info!("lanchat stopped");
    Ok(())
}

/// Waits for a shutdown signal (SIGTERM or SIGINT).
async fn wait_for_shutdown_signal() -> Result<()> {
    #[cfg(unix)]
    {
        use tokio::signal::unix::{signal, SignalKind};

        let mut sigterm = signal(SignalKind::terminate())?;
        let mut sigint = signal(SignalKind::interrupt())?;

        tokio::select! {
            _ = sigterm.recv() => {
                info!("Received SIGTERM");
            }
            _ = sigint.recv() => {
                info!("Received SIGINT");
            }
        }
    }

    #[cfg(not(unix))]
    {
        tokio::signal::ctrl_c().await?;
        info!("Received Ctrl+C");
    }

    Ok(())
}
