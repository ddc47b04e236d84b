//! etrv scan command

use crate::context::Context;
use clap::Args;
use console::style;
use indicatif::{ProgressBar, ProgressStyle};
use std::time::Duration;

#[derive(Debug, Args)]
pub struct ScanCommand {}

impl ScanCommand {
    pub async fn run(&self, ctx: &Context) -> anyhow::Result<()> {
        let spinner = if ctx.json {
            None
        } else {
            let bar = ProgressBar::new_spinner();
            bar.set_style(ProgressStyle::with_template("{spinner} {msg}")?);
            bar.set_message(format!("Scanning for {}s...", ctx.timeout.as_secs()));
            bar.enable_steady_tick(Duration::from_millis(100));
            Some(bar)
        };

        let valves = device::scan(ctx.timeout).await?;

        if let Some(bar) = spinner {
            bar.finish_and_clear();
        }

        if ctx.json {
            return ctx.emit_json(&valves);
        }

        if valves.is_empty() {
            println!("No eTRV devices found");
            return Ok(());
        }

        println!("Detected eTRV devices:");
        for valve in &valves {
            let rssi = valve
                .rssi
                .map(|r| format!("{}dB", r))
                .unwrap_or_else(|| "?".to_string());
            println!(
                "{}, RSSI={} ({})",
                style(&valve.address).bold(),
                rssi,
                valve.local_name
            );
        }
        Ok(())
    }
}
