//! etrv name command

use crate::context::Context;
use clap::{Args, Subcommand};

#[derive(Debug, Args)]
pub struct NameCommand {
    #[command(subcommand)]
    pub command: NameSubcommand,
}

#[derive(Debug, Subcommand)]
pub enum NameSubcommand {
    /// Show the device name
    Get,
    /// Rename the valve (16 ASCII characters max)
    Set { name: String },
}

impl NameCommand {
    pub async fn run(&self, ctx: &Context) -> anyhow::Result<()> {
        let mut dev = ctx.open_device().await?;
        let name = match &self.command {
            NameSubcommand::Get => dev.name().await?,
            NameSubcommand::Set { name } => {
                dev.set_name(name).await?;
                name.clone()
            }
        };
        dev.disconnect().await?;

        if ctx.json {
            ctx.emit_json(&serde_json::json!({ "name": name }))?;
        } else {
            println!("Device name: {}", name);
        }
        Ok(())
    }
}
