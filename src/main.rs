//! Serial-to-TCP bridge command line
//!
//! Usage:
//!   serial-tcp-bridge                      Run with bridge.toml settings
//!   serial-tcp-bridge --serial COM3 --hex  Override settings for this run
//!   serial-tcp-bridge ports                List serial ports

mod cli;

use anyhow::Result;
use clap::Parser;
use cli::{Cli, Command};
use serial_tcp_bridge::logging::{self, ConsoleSink};
use serial_tcp_bridge::transport::serial::available_ports;
use serial_tcp_bridge::{config, Bridge, StopObserver};
use std::sync::Arc;
use tokio::sync::Notify;

fn main() -> Result<()> {
    let cli = Cli::parse();
    logging::init_tracing(cli.verbose);

    match cli.command.unwrap_or(Command::Run) {
        Command::Ports => {
            list_ports();
            Ok(())
        }
        Command::Run => {
            let rt = tokio::runtime::Runtime::new()?;
            rt.block_on(run(cli))
        }
    }
}

fn list_ports() {
    let ports = available_ports();
    if ports.is_empty() {
        println!("No serial ports found");
    }
    for port in ports {
        println!("{}", port);
    }
}

async fn run(cli: Cli) -> Result<()> {
    let path = cli.config.clone().unwrap_or_else(config::default_path);
    let mut settings = config::load(&path);
    cli.apply(&mut settings);
    if cli.save {
        config::save(&path, &settings)?;
    }
    let bridge_config = settings.to_bridge_config()?;

    let stopped = Arc::new(Notify::new());
    let notify = stopped.clone();
    let observer: Arc<dyn StopObserver> = Arc::new(move || notify.notify_one());
    let bridge = Arc::new(Bridge::new(Arc::new(ConsoleSink), Some(observer)));

    // start() blocks while connecting; keep it off the signal path
    let starter = {
        let bridge = bridge.clone();
        tokio::spawn(async move { bridge.start(bridge_config).await })
    };

    tokio::select! {
        _ = shutdown_signal() => {}
        _ = stopped.notified() => {}
    }

    bridge.stop().await;
    let _ = starter.await;
    Ok(())
}

/// Resolve on SIGINT/SIGTERM (Ctrl-C on Windows)
async fn shutdown_signal() {
    #[cfg(unix)]
    {
        use tokio::signal::unix::{signal, SignalKind};

        match (
            signal(SignalKind::terminate()),
            signal(SignalKind::interrupt()),
        ) {
            (Ok(mut sigterm), Ok(mut sigint)) => {
                tokio::select! {
                    _ = sigterm.recv() => {},
                    _ = sigint.recv() => {},
                }
            }
            _ => {
                let _ = tokio::signal::ctrl_c().await;
            }
        }
    }

    #[cfg(not(unix))]
    {
        let _ = tokio::signal::ctrl_c().await;
    }
}
