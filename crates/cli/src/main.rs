//! etrv CLI - Control Danfoss Eco eTRV radiator thermostats
//!
//! Usage:
//!   etrv scan                          - Scan for valves in range
//!   etrv pair <address> [--save name]  - Retrieve a valve's secret key
//!   etrv -d <dev> temp get             - Read temperatures
//!   etrv -d <dev> temp set 21.5        - Change the set point
//!   etrv -d <dev> battery              - Battery level
//!   etrv -d <dev> settings show        - Settings block
//!   etrv -d <dev> clock sync           - Sync the valve clock
//!   etrv registry list                 - Saved devices

mod commands;
mod context;

use clap::{Parser, Subcommand};
use commands::{
    BatteryCommand, ClockCommand, NameCommand, PairCommand, RegistryCommand, ScanCommand,
    ScheduleCommand, SettingsCommand, TempCommand,
};
use context::Context;
use shared::DeviceRegistry;
use std::path::PathBuf;
use std::time::Duration;

#[derive(Parser)]
#[command(name = "etrv")]
#[command(about = "etrv - Control Danfoss Eco eTRV radiator thermostats over Bluetooth LE")]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Saved device name or Bluetooth address
    #[arg(short, long, global = true)]
    device: Option<String>,

    /// 4-character PIN, defaults to 0000
    #[arg(long, global = true)]
    pin: Option<String>,

    /// 16-byte secret key, hex encoded
    #[arg(long, global = true)]
    secret: Option<String>,

    /// Registry file (defaults to the user config dir)
    #[arg(long, global = true)]
    registry: Option<PathBuf>,

    /// Scan duration and discovery window in seconds
    #[arg(short = 't', long, global = true, default_value_t = 10)]
    timeout: u64,

    /// Output as JSON (for scripting)
    #[arg(long, global = true)]
    json: bool,
}

#[derive(Subcommand)]
enum Commands {
    /// Scan for valves in range
    Scan(ScanCommand),
    /// Retrieve the secret key from a valve in pairing mode
    Pair(PairCommand),
    /// Read or set the target temperature
    Temp(TempCommand),
    /// Read the battery level
    Battery(BatteryCommand),
    /// Inspect or change the settings block
    Settings(SettingsCommand),
    /// Read or set the device name
    Name(NameCommand),
    /// Read or sync the valve clock
    Clock(ClockCommand),
    /// Show the weekly schedule
    Schedule(ScheduleCommand),
    /// Manage saved devices
    Registry(RegistryCommand),
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize logging
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .init();

    let cli = Cli::parse();

    let registry_path = match cli.registry {
        Some(path) => path,
        None => DeviceRegistry::default_path()?,
    };
    let ctx = Context {
        json: cli.json,
        device: cli.device,
        pin: cli.pin,
        secret: cli.secret,
        registry_path,
        timeout: Duration::from_secs(cli.timeout),
    };

    match cli.command {
        Commands::Scan(cmd) => cmd.run(&ctx).await,
        Commands::Pair(cmd) => cmd.run(&ctx).await,
        Commands::Temp(cmd) => cmd.run(&ctx).await,
        Commands::Battery(cmd) => cmd.run(&ctx).await,
        Commands::Settings(cmd) => cmd.run(&ctx).await,
        Commands::Name(cmd) => cmd.run(&ctx).await,
        Commands::Clock(cmd) => cmd.run(&ctx).await,
        Commands::Schedule(cmd) => cmd.run(&ctx).await,
        Commands::Registry(cmd) => cmd.run(&ctx),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_timeout_is_a_global_flag() {
        let cli = Cli::parse_from(["etrv", "--timeout", "5", "scan"]);
        assert_eq!(cli.timeout, 5);

        // Global flags are accepted after the subcommand too
        let cli = Cli::parse_from(["etrv", "scan", "-t", "5"]);
        assert_eq!(cli.timeout, 5);

        let cli = Cli::parse_from(["etrv", "scan"]);
        assert_eq!(cli.timeout, 10);
    }
}
