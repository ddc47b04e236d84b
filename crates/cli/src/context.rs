//! Shared command context: global flags, registry access, device setup

use anyhow::{bail, Context as _};
use device::{BtleplugTransport, DeviceOptions, EtrvDevice};
use protocol::SecretKey;
use serde::Serialize;
use shared::{DeviceEntry, DeviceRegistry};
use std::path::PathBuf;
use std::time::Duration;

/// Everything a command needs besides its own arguments
pub struct Context {
    pub json: bool,
    pub device: Option<String>,
    pub pin: Option<String>,
    pub secret: Option<String>,
    pub registry_path: PathBuf,
    /// Scan duration and peripheral discovery window
    pub timeout: Duration,
}

impl Context {
    pub fn registry(&self) -> anyhow::Result<DeviceRegistry> {
        Ok(DeviceRegistry::from_file(&self.registry_path)?)
    }

    /// Open a session with the device named by `--device`, pulling the PIN
    /// and secret from the command line first and the registry second.
    pub async fn open_device(&self) -> anyhow::Result<EtrvDevice> {
        let target = self
            .device
            .as_deref()
            .context("No device given. Pass --device <name-or-address>")?;
        let entry = self.registry()?.resolve(target)?;
        let options = self.device_options(&entry)?;
        let transport = BtleplugTransport::new(&entry.address, self.timeout).await?;
        Ok(EtrvDevice::new(Box::new(transport), entry.address, options))
    }

    pub fn device_options(&self, entry: &DeviceEntry) -> anyhow::Result<DeviceOptions> {
        let mut options = DeviceOptions::default();

        let pin = self.pin.as_deref().or(entry.pin.as_deref());
        if let Some(pin) = pin {
            options.pin = parse_pin(pin)?;
        }

        options.secret = match &self.secret {
            Some(hex_key) => Some(parse_secret(hex_key)?),
            None => entry.secret_bytes()?,
        };
        Ok(options)
    }

    /// Print one JSON document, the whole output of a command in `--json`
    /// mode.
    pub fn emit_json(&self, value: &impl Serialize) -> anyhow::Result<()> {
        println!("{}", serde_json::to_string_pretty(value)?);
        Ok(())
    }
}

pub fn parse_pin(pin: &str) -> anyhow::Result<[u8; 4]> {
    let bytes = pin.as_bytes();
    if bytes.len() != 4 {
        bail!("PIN must be exactly 4 characters, got {}", bytes.len());
    }
    Ok([bytes[0], bytes[1], bytes[2], bytes[3]])
}

pub fn parse_secret(hex_key: &str) -> anyhow::Result<SecretKey> {
    let bytes = hex::decode(hex_key).context("Secret key is not valid hex")?;
    let key: SecretKey = bytes
        .try_into()
        .map_err(|b: Vec<u8>| anyhow::anyhow!("Secret key must be 16 bytes, got {}", b.len()))?;
    Ok(key)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_pin() {
        assert_eq!(parse_pin("0000").unwrap(), *b"0000");
        assert_eq!(parse_pin("1234").unwrap(), *b"1234");
        assert!(parse_pin("123").is_err());
        assert!(parse_pin("12345").is_err());
    }

    #[test]
    fn test_parse_secret() {
        let key = parse_secret("000102030405060708090a0b0c0d0e0f").unwrap();
        assert_eq!(key[1], 0x01);
        assert!(parse_secret("0001").is_err());
        assert!(parse_secret("not-hex").is_err());
    }

    #[test]
    fn test_device_options_cli_flags_win() {
        let ctx = Context {
            json: false,
            device: None,
            pin: Some("4321".to_string()),
            secret: Some("ffeeddccbbaa99887766554433221100".to_string()),
            registry_path: PathBuf::from("/nonexistent"),
            timeout: Duration::from_secs(10),
        };
        let entry = DeviceEntry {
            address: "aa:bb:cc:dd:ee:ff".to_string(),
            secret: Some("000102030405060708090a0b0c0d0e0f".to_string()),
            pin: Some("0000".to_string()),
        };

        let options = ctx.device_options(&entry).unwrap();
        assert_eq!(options.pin, *b"4321");
        assert_eq!(options.secret.unwrap()[0], 0xff);
    }

    #[test]
    fn test_device_options_fall_back_to_registry() {
        let ctx = Context {
            json: false,
            device: None,
            pin: None,
            secret: None,
            registry_path: PathBuf::from("/nonexistent"),
            timeout: Duration::from_secs(10),
        };
        let entry = DeviceEntry {
            address: "aa:bb:cc:dd:ee:ff".to_string(),
            secret: Some("000102030405060708090a0b0c0d0e0f".to_string()),
            pin: None,
        };

        let options = ctx.device_options(&entry).unwrap();
        assert_eq!(options.pin, *b"0000");
        assert_eq!(options.secret.unwrap()[15], 0x0f);
    }
}
