//! Route compiler (v1)
//!
//! Compiles access policies into a data-plane route configuration and
//! local reply configuration.
//!
//! # Architecture Overview
//!
//! ```text
//!   config.toml ──▶ config::loader ──▶ config::validation
//!                                            │
//!                                            ▼
//!                                      builder::Builder
//!                         ┌──────────────────┴──────────────────┐
//!                         ▼                                     ▼
//!               route_configuration                        local_reply
//!                 └─▶ virtual_host                          └─▶ render
//!                       ├─▶ control_plane
//!                       └─▶ policy_route ─▶ routing::stable_id
//!                                            │
//!                                            ▼
//!                              lifecycle::ConfigPublisher
//!                             (last good snapshot, output file)
//! ```
//!
//! # Commands
//! - `validate`: load and check a configuration file
//! - `compile`: build once and write the snapshot
//! - `watch`: rebuild on every file change until Ctrl-C

use std::net::SocketAddr;
use std::path::PathBuf;
use std::sync::Arc;

use clap::{Parser, Subcommand};

use route_compiler::config::loader::load_config;
use route_compiler::config::watcher::ConfigWatcher;
use route_compiler::observability::{init_logging, init_metrics};
use route_compiler::{ConfigPublisher, HtmlPageRenderer, Shutdown};

#[derive(Parser)]
#[command(name = "route-compiler")]
#[command(about = "Compile access policies into data-plane route configuration", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Load and validate a configuration file
    Validate {
        #[arg(short, long)]
        config: PathBuf,
    },
    /// Compile once and write the snapshot to a file or stdout
    Compile {
        #[arg(short, long)]
        config: PathBuf,

        #[arg(short, long)]
        output: Option<PathBuf>,

        #[arg(long)]
        pretty: bool,
    },
    /// Recompile and republish on every configuration change
    Watch {
        #[arg(short, long)]
        config: PathBuf,

        #[arg(short, long)]
        output: PathBuf,

        /// Overrides `observability.metrics_address`
        #[arg(long)]
        metrics_address: Option<SocketAddr>,

        #[arg(long)]
        pretty: bool,
    },
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();

    match cli.command {
        Commands::Validate { config } => {
            let loaded = load_config(&config)?;
            init_logging(&loaded.observability)?;
            tracing::info!(
                path = ?config,
                policies = loaded.options.policies.len(),
                services = %loaded.options.services,
                "Configuration is valid"
            );
        }
        Commands::Compile { config, output, pretty } => {
            let loaded = load_config(&config)?;
            init_logging(&loaded.observability)?;

            let mut publisher = ConfigPublisher::new(Arc::new(HtmlPageRenderer)).with_pretty(pretty);
            if let Some(output) = &output {
                publisher = publisher.with_output(output);
            }
            let snapshot = publisher.publish(&loaded.options)?;
            if output.is_none() {
                use std::io::Write;
                std::io::stdout().write_all(&publisher.encode(&snapshot)?)?;
            }
        }
        Commands::Watch {
            config,
            output,
            metrics_address,
            pretty,
        } => {
            let loaded = load_config(&config)?;
            init_logging(&loaded.observability)?;

            tracing::info!(
                path = ?config,
                output = ?output,
                policies = loaded.options.policies.len(),
                "route-compiler v0.1.0 watching"
            );

            let metrics_address = match metrics_address {
                Some(addr) => Some(addr),
                None => loaded
                    .observability
                    .metrics_address
                    .as_deref()
                    .map(str::parse::<SocketAddr>)
                    .transpose()?,
            };
            if let Some(addr) = metrics_address {
                init_metrics(addr);
            }

            let publisher = Arc::new(
                ConfigPublisher::new(Arc::new(HtmlPageRenderer))
                    .with_output(output)
                    .with_pretty(pretty),
            );
            // later updates can still succeed
            if let Err(e) = publisher.publish(&loaded.options) {
                tracing::error!(error = %e, "Initial build failed, waiting for a valid configuration");
            }

            let (watcher, updates) = ConfigWatcher::new(&config);
            let _watcher = watcher.run()?;

            let shutdown = Shutdown::new();
            let publish_task = tokio::spawn(Arc::clone(&publisher).run(updates, shutdown.subscribe()));

            shutdown.trigger_on_ctrl_c().await?;
            publish_task.await?;

            tracing::info!(
                version = ?publisher.current().map(|s| s.version),
                "Shutdown complete"
            );
        }
    }

    Ok(())
}
