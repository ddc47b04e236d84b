//! etrv pair command

use crate::context::{parse_pin, Context};
use anyhow::bail;
use clap::Args;
use console::style;
use device::{BtleplugTransport, DeviceOptions, EtrvDevice};
use serde::Serialize;
use shared::DeviceEntry;

#[derive(Debug, Args)]
pub struct PairCommand {
    /// Bluetooth address of the valve
    pub address: String,

    /// Save the key to the registry under this name
    #[arg(long)]
    pub save: Option<String>,

    /// Skip the pairing-mode confirmation prompt
    #[arg(short, long)]
    pub yes: bool,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct PairResult<'a> {
    address: &'a str,
    secret: String,
}

impl PairCommand {
    pub async fn run(&self, ctx: &Context) -> anyhow::Result<()> {
        if !self.yes && !ctx.json {
            println!(
                "The secret key can only be read while the valve is in pairing mode. \
                 Press the timer button on the valve to enter it."
            );
            let confirmed = dialoguer::Confirm::new()
                .with_prompt("Is the valve in pairing mode?")
                .default(true)
                .interact()?;
            if !confirmed {
                bail!("Put the valve in pairing mode and try again");
            }
        }

        let mut options = DeviceOptions::default();
        if let Some(pin) = &ctx.pin {
            options.pin = parse_pin(pin)?;
        }

        let transport = BtleplugTransport::new(&self.address, ctx.timeout).await?;
        let mut dev = EtrvDevice::new(Box::new(transport), self.address.clone(), options);
        let key = dev.retrieve_secret_key().await?;
        dev.disconnect().await?;

        let secret = hex::encode(key);
        if ctx.json {
            ctx.emit_json(&PairResult {
                address: &self.address,
                secret: secret.clone(),
            })?;
        } else {
            println!("Secret key: {}", style(&secret).bold());
            println!("Save it; the valve only reveals it in pairing mode.");
        }

        if let Some(name) = &self.save {
            let mut registry = ctx.registry()?;
            registry.add(
                name.clone(),
                DeviceEntry {
                    address: self.address.clone(),
                    secret: Some(secret),
                    pin: ctx.pin.clone(),
                },
            );
            registry.save(&ctx.registry_path)?;
            if !ctx.json {
                println!("Saved as '{}' in {}", name, ctx.registry_path.display());
            }
        }
        Ok(())
    }
}
