//! etrv temp command

use crate::context::Context;
use clap::{Args, Subcommand};
use shared::Temperature;

#[derive(Debug, Args)]
pub struct TempCommand {
    #[command(subcommand)]
    pub command: TempSubcommand,
}

#[derive(Debug, Subcommand)]
pub enum TempSubcommand {
    /// Show room and target temperature
    Get,
    /// Set a new target temperature (rounded to 0.5 degrees)
    Set {
        /// Target in degrees Celsius
        celsius: f32,
    },
}

impl TempCommand {
    pub async fn run(&self, ctx: &Context) -> anyhow::Result<()> {
        let mut dev = ctx.open_device().await?;
        match &self.command {
            TempSubcommand::Get => {
                let temp = dev.temperature().await?;
                if ctx.json {
                    ctx.emit_json(&temp)?;
                } else {
                    println!("Room temperature: {}", temp.room);
                    println!("Set point:        {}", temp.set_point);
                }
            }
            TempSubcommand::Set { celsius } => {
                let target = Temperature::from_celsius(*celsius);
                dev.set_temperature(target).await?;
                if ctx.json {
                    ctx.emit_json(&serde_json::json!({ "setPoint": target }))?;
                } else {
                    println!("Set point changed to {}", target);
                }
            }
        }
        dev.disconnect().await?;
        Ok(())
    }
}
