//! etrv schedule command

use crate::context::Context;
use clap::{Args, Subcommand};
use protocol::DAY_NAMES;

#[derive(Debug, Args)]
pub struct ScheduleCommand {
    #[command(subcommand)]
    pub command: ScheduleSubcommand,
}

#[derive(Debug, Subcommand)]
pub enum ScheduleSubcommand {
    /// Show the weekly program
    Show,
}

impl ScheduleCommand {
    pub async fn run(&self, ctx: &Context) -> anyhow::Result<()> {
        let mut dev = ctx.open_device().await?;
        let schedule = dev.schedule().await?;
        dev.disconnect().await?;

        if ctx.json {
            return ctx.emit_json(&schedule);
        }

        println!("Home: {}  Away: {}", schedule.home, schedule.away);
        for (name, day) in DAY_NAMES.iter().zip(schedule.days.iter()) {
            if day.events.is_empty() {
                println!("{:<10} (no switches)", name);
                continue;
            }
            let events: Vec<String> = day
                .events
                .iter()
                .enumerate()
                .map(|(i, event)| {
                    let target = if i % 2 == 0 { "home" } else { "away" };
                    format!("{} {}", event, target)
                })
                .collect();
            println!("{:<10} {}", name, events.join(", "));
        }
        Ok(())
    }
}
