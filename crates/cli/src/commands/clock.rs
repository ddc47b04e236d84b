//! etrv clock command

use crate::context::Context;
use chrono::{Local, Offset, Utc};
use clap::{Args, Subcommand};

#[derive(Debug, Args)]
pub struct ClockCommand {
    #[command(subcommand)]
    pub command: ClockSubcommand,
}

#[derive(Debug, Subcommand)]
pub enum ClockSubcommand {
    /// Show the valve clock
    Get,
    /// Set the valve clock from this machine
    Sync {
        /// UTC offset in seconds; defaults to the host timezone
        #[arg(long)]
        offset: Option<i32>,
    },
}

impl ClockCommand {
    pub async fn run(&self, ctx: &Context) -> anyhow::Result<()> {
        let mut dev = ctx.open_device().await?;
        match &self.command {
            ClockSubcommand::Get => {
                let time = dev.time().await?;
                dev.disconnect().await?;
                if ctx.json {
                    ctx.emit_json(&time)?;
                } else {
                    let utc = time
                        .utc()
                        .map(|t| t.format("%Y-%m-%d %H:%M:%S").to_string())
                        .unwrap_or_else(|| "invalid".to_string());
                    println!("Valve time (UTC): {}", utc);
                    println!("UTC offset:       {}s", time.utc_offset);
                }
            }
            ClockSubcommand::Sync { offset } => {
                let offset =
                    offset.unwrap_or_else(|| Local::now().offset().fix().local_minus_utc());
                let now = Utc::now();
                dev.set_time(now, offset).await?;
                dev.disconnect().await?;
                if ctx.json {
                    ctx.emit_json(&serde_json::json!({
                        "utc": now.to_rfc3339(),
                        "utcOffset": offset,
                    }))?;
                } else {
                    println!("Valve clock set to {} (offset {}s)", now.to_rfc3339(), offset);
                }
            }
        }
        Ok(())
    }
}
