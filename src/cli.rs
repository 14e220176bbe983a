//! Command-line interface definition using clap
//!
//! Provides structured argument parsing with automatic help generation.
//! Options override the settings file for this run (and are written back
//! with `--save`).

use clap::{Parser, Subcommand};
use serial_tcp_bridge::config::Config;
use std::path::PathBuf;

// =============================================================================
// CLI Definition
// =============================================================================

/// Transparent serial-to-TCP bridge
#[derive(Parser, Debug, Default)]
#[command(name = "serial-tcp-bridge")]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    /// Enable verbose debug output
    #[arg(short, long)]
    pub verbose: bool,

    /// Settings file (default: bridge.toml next to the executable)
    #[arg(short, long, value_name = "FILE")]
    pub config: Option<PathBuf>,

    /// TCP server host
    #[arg(long, value_name = "HOST")]
    pub host: Option<String>,

    /// TCP server port
    #[arg(long, value_name = "PORT")]
    pub tcp_port: Option<u16>,

    /// Serial device (e.g. COM3, /dev/ttyUSB0)
    #[arg(long, value_name = "DEVICE")]
    pub serial: Option<String>,

    /// Serial baud rate
    #[arg(long, value_name = "BAUD")]
    pub baud: Option<u32>,

    /// Print relayed traffic
    #[arg(long)]
    pub print: bool,

    /// Print relayed traffic as hex (implies --print)
    #[arg(long)]
    pub hex: bool,

    /// Stop instead of reconnecting when a transport is lost
    #[arg(long)]
    pub no_reconnect: bool,

    /// Heartbeat payload sent to the TCP server
    #[arg(long, value_name = "DATA")]
    pub heartbeat: Option<String>,

    /// Heartbeat payload is a hex string
    #[arg(long)]
    pub heartbeat_hex: bool,

    /// Seconds between heartbeats (0 = once after connecting)
    #[arg(long, value_name = "SECS")]
    pub heartbeat_interval: Option<u64>,

    /// Write the effective settings back to the settings file
    #[arg(long)]
    pub save: bool,

    #[command(subcommand)]
    pub command: Option<Command>,
}

#[derive(Subcommand, Debug, Clone, Copy, PartialEq, Eq)]
pub enum Command {
    /// Run the bridge (default)
    Run,
    /// List available serial ports
    Ports,
}

impl Cli {
    /// Apply command-line overrides on top of the settings file
    pub fn apply(&self, config: &mut Config) {
        if let Some(host) = &self.host {
            config.bridge.server_host = host.clone();
        }
        if let Some(port) = self.tcp_port {
            config.bridge.server_port = port;
        }
        if let Some(serial) = &self.serial {
            config.bridge.serial_port = serial.clone();
        }
        if let Some(baud) = self.baud {
            config.bridge.baud_rate = baud;
        }
        if self.no_reconnect {
            config.bridge.auto_reconnect = false;
        }
        if self.print || self.hex {
            config.logs.print = true;
        }
        if self.hex {
            config.logs.hex = true;
        }
        if let Some(data) = &self.heartbeat {
            config.heartbeat.enabled = true;
            config.heartbeat.data = data.clone();
            config.heartbeat.hex = self.heartbeat_hex;
        }
        if let Some(interval) = self.heartbeat_interval {
            config.heartbeat.interval = interval;
        }
    }
}

// =============================================================================
// Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cli_parse_defaults() {
        let cli = Cli::parse_from(["serial-tcp-bridge"]);
        assert!(!cli.verbose);
        assert!(cli.config.is_none());
        assert!(cli.command.is_none());
    }

    #[test]
    fn test_cli_parse_verbose() {
        let cli = Cli::parse_from(["serial-tcp-bridge", "-v"]);
        assert!(cli.verbose);

        let cli = Cli::parse_from(["serial-tcp-bridge", "--verbose"]);
        assert!(cli.verbose);
    }

    #[test]
    fn test_cli_parse_ports() {
        let cli = Cli::parse_from(["serial-tcp-bridge", "ports"]);
        assert_eq!(cli.command, Some(Command::Ports));
    }

    #[test]
    fn test_overrides_applied() {
        let cli = Cli::parse_from([
            "serial-tcp-bridge",
            "--host",
            "10.1.1.5",
            "--tcp-port",
            "4001",
            "--serial",
            "COM3",
            "--baud",
            "115200",
            "--hex",
            "--no-reconnect",
            "--heartbeat",
            "aa55",
            "--heartbeat-hex",
            "--heartbeat-interval",
            "10",
        ]);

        let mut config = Config::default();
        cli.apply(&mut config);

        assert_eq!(config.bridge.server_host, "10.1.1.5");
        assert_eq!(config.bridge.server_port, 4001);
        assert_eq!(config.bridge.serial_port, "COM3");
        assert_eq!(config.bridge.baud_rate, 115200);
        assert!(!config.bridge.auto_reconnect);
        assert!(config.logs.print);
        assert!(config.logs.hex);
        assert!(config.heartbeat.enabled);
        assert!(config.heartbeat.hex);
        assert_eq!(config.heartbeat.data, "aa55");
        assert_eq!(config.heartbeat.interval, 10);
    }

    #[test]
    fn test_no_overrides_keeps_file_values() {
        let cli = Cli::parse_from(["serial-tcp-bridge", "run"]);
        let mut config = Config::default();
        config.bridge.serial_port = "COM9".into();
        config.heartbeat.enabled = true;

        cli.apply(&mut config);

        assert_eq!(config.bridge.serial_port, "COM9");
        assert!(config.heartbeat.enabled);
        assert!(config.bridge.auto_reconnect);
    }
}
