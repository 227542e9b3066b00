mod cli;

use clap::Parser;
use std::path::PathBuf;
use tokio_util::sync::CancellationToken;
use tracing::info;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use crate::cli::{Cli, Commands};
use orchestra_auditor::Auditor;
use orchestra_core::config::{Config, ConfigValidator};
use orchestra_core::error::OrchestraError;
use orchestra_musician::Musician;

#[tokio::main]
async fn main() -> Result<(), OrchestraError> {
    let cli = Cli::parse();

    // Initialize tracing
    let env_filter = if cli.dev {
        EnvFilter::new(
            "orchestra_cli=debug,orchestra_auditor=debug,orchestra_musician=debug,orchestra_core=debug",
        )
    } else {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| {
            EnvFilter::new("orchestra_cli=info,orchestra_auditor=info,orchestra_musician=info,warn")
        })
    };
    tracing_subscriber::registry()
        .with(env_filter)
        .with(fmt::layer())
        .init();

    // Handle ConfigSample without loading config
    if let Commands::ConfigSample { output } = &cli.command {
        let path = output
            .clone()
            .unwrap_or_else(|| PathBuf::from("./orchestra.sample.yaml"));
        Config::sample().save(&path)?;
        println!("Sample configuration written to {:?}", path);
        return Ok(());
    }

    let mut config = Config::load(cli.config_path.as_deref())?;

    match cli.command {
        Commands::Auditor {
            group,
            udp_port,
            interface,
            host,
            port,
        } => {
            // CLI args take precedence over config file values
            if let Some(group) = group {
                config.auditor.multicast_group = group;
            }
            if let Some(udp_port) = udp_port {
                config.auditor.udp_port = udp_port;
            }
            if let Some(interface) = interface {
                config.auditor.interface = interface;
            }
            if let Some(host) = host {
                config.auditor.tcp_host = host;
            }
            if let Some(port) = port {
                config.auditor.tcp_port = port;
            }

            let auditor = Auditor::bind(&config.auditor).await?;
            info!("Auditor ready, serving snapshots on {}", auditor.local_addr()?);
            auditor.run(shutdown_on_ctrl_c()).await?;
        }
        Commands::Musician {
            instrument,
            interval_ms,
        } => {
            if let Some(interval_ms) = interval_ms {
                config.musician.interval_ms = interval_ms;
            }
            ConfigValidator::validate(&config)?;

            let musician = Musician::new(instrument, &config.musician)?;
            musician.run(shutdown_on_ctrl_c()).await?;
        }
        Commands::ConfigSample { .. } => {
            // Already handled
        }
    }

    Ok(())
}

/// Token cancelled on the first Ctrl-C
fn shutdown_on_ctrl_c() -> CancellationToken {
    let shutdown = CancellationToken::new();
    let token = shutdown.clone();
    tokio::spawn(async move {
        match tokio::signal::ctrl_c().await {
            Ok(()) => {
                info!("Shutting down");
                token.cancel();
            }
            Err(e) => tracing::error!("Failed to listen for Ctrl-C: {}", e),
        }
    });
    shutdown
}
