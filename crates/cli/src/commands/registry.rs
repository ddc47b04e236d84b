//! etrv registry command

use crate::context::{parse_pin, parse_secret, Context};
use clap::{Args, Subcommand};
use console::style;
use shared::DeviceEntry;

#[derive(Debug, Args)]
pub struct RegistryCommand {
    #[command(subcommand)]
    pub command: RegistrySubcommand,
}

#[derive(Debug, Subcommand)]
pub enum RegistrySubcommand {
    /// List saved devices
    List,
    /// Add or update a device
    Add {
        /// Name to save the device under
        name: String,
        /// Bluetooth address
        address: String,
        /// 16-byte secret key, hex encoded
        #[arg(long)]
        secret: Option<String>,
        /// 4-character PIN
        #[arg(long)]
        pin: Option<String>,
    },
    /// Remove a device
    Remove { name: String },
}

impl RegistryCommand {
    pub fn run(&self, ctx: &Context) -> anyhow::Result<()> {
        let mut registry = ctx.registry()?;
        match &self.command {
            RegistrySubcommand::List => {
                if ctx.json {
                    return ctx.emit_json(&registry);
                }
                if registry.devices.is_empty() {
                    println!("No saved devices. Use 'etrv pair --save' or 'etrv registry add'");
                    return Ok(());
                }
                for name in registry.device_names() {
                    let entry = &registry.devices[&name];
                    let paired = if entry.secret.is_some() {
                        "paired"
                    } else {
                        "no key"
                    };
                    println!("{:<16} {}  ({})", style(&name).bold(), entry.address, paired);
                }
            }
            RegistrySubcommand::Add {
                name,
                address,
                secret,
                pin,
            } => {
                // Validate before persisting
                if let Some(secret) = secret {
                    parse_secret(secret)?;
                }
                if let Some(pin) = pin {
                    parse_pin(pin)?;
                }
                registry.add(
                    name.clone(),
                    DeviceEntry {
                        address: address.clone(),
                        secret: secret.clone(),
                        pin: pin.clone(),
                    },
                );
                registry.save(&ctx.registry_path)?;
                if !ctx.json {
                    println!("Saved '{}' -> {}", name, address);
                }
            }
            RegistrySubcommand::Remove { name } => {
                let entry = registry.remove(name)?;
                registry.save(&ctx.registry_path)?;
                if !ctx.json {
                    println!("Removed '{}' ({})", name, entry.address);
                }
            }
        }
        Ok(())
    }
}
