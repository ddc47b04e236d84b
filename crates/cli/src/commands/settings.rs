//! etrv settings command

use crate::context::Context;
use anyhow::Context as _;
use chrono::{DateTime, NaiveDateTime, Utc};
use clap::{Args, Subcommand};
use protocol::{ScheduleMode, SettingsPayload};
use shared::Temperature;

#[derive(Debug, Args)]
pub struct SettingsCommand {
    #[command(subcommand)]
    pub command: SettingsSubcommand,
}

#[derive(Debug, Subcommand)]
pub enum SettingsSubcommand {
    /// Show the settings block
    Show,
    /// Switch operating mode
    Mode {
        /// manual, scheduled or vacation
        mode: ScheduleMode,
    },
    /// Configure the vacation window
    Vacation {
        /// Window start, e.g. 2026-12-20T18:00 (UTC)
        #[arg(long)]
        from: String,
        /// Window end
        #[arg(long)]
        to: String,
        /// Temperature to hold during the window, in Celsius
        #[arg(long)]
        temp: f32,
    },
}

fn parse_datetime(s: &str) -> anyhow::Result<DateTime<Utc>> {
    let naive = NaiveDateTime::parse_from_str(s, "%Y-%m-%dT%H:%M")
        .with_context(|| format!("Cannot parse '{}'. Expected e.g. 2026-12-20T18:00", s))?;
    Ok(naive.and_utc())
}

fn print_settings(settings: &SettingsPayload) {
    let fmt_ts = |ts: Option<DateTime<Utc>>| {
        ts.map(|t| t.format("%Y-%m-%d %H:%M UTC").to_string())
            .unwrap_or_else(|| "unset".to_string())
    };
    println!("Mode:                 {}", settings.schedule_mode);
    println!("Frost protection:     {}", settings.frost_protection);
    println!("Vacation temperature: {}", settings.vacation_temperature);
    println!("Vacation from:        {}", fmt_ts(settings.vacation_from));
    println!("Vacation to:          {}", fmt_ts(settings.vacation_to));
}

impl SettingsCommand {
    pub async fn run(&self, ctx: &Context) -> anyhow::Result<()> {
        let mut dev = ctx.open_device().await?;
        let settings = match &self.command {
            SettingsSubcommand::Show => dev.settings().await?,
            SettingsSubcommand::Mode { mode } => dev.set_schedule_mode(*mode).await?,
            SettingsSubcommand::Vacation { from, to, temp } => {
                let from = parse_datetime(from)?;
                let to = parse_datetime(to)?;
                if to <= from {
                    anyhow::bail!("Vacation end must be after its start");
                }
                let temp = Temperature::from_celsius(*temp);
                dev.update_settings(|s| {
                    s.vacation_temperature = temp;
                    s.vacation_from = Some(from);
                    s.vacation_to = Some(to);
                })
                .await?
            }
        };
        dev.disconnect().await?;

        if ctx.json {
            ctx.emit_json(&settings)?;
        } else {
            print_settings(&settings);
        }
        Ok(())
    }
}
