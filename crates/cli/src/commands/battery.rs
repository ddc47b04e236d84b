//! etrv battery command

use crate::context::Context;
use clap::Args;

#[derive(Debug, Args)]
pub struct BatteryCommand {}

impl BatteryCommand {
    pub async fn run(&self, ctx: &Context) -> anyhow::Result<()> {
        let mut dev = ctx.open_device().await?;
        let percent = dev.battery().await?;
        dev.disconnect().await?;

        if ctx.json {
            ctx.emit_json(&serde_json::json!({ "percent": percent }))?;
        } else {
            println!("Battery level: {}%", percent);
        }
        Ok(())
    }
}
