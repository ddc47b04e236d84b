//! Saved device registry (devices.json)

use crate::error::{DeviceNotFoundError, EtrvError, Result};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::{Path, PathBuf};

/// A saved valve: address plus optional pairing data
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DeviceEntry {
    /// Bluetooth address, e.g. "00:04:2f:c0:ff:ee"
    pub address: String,

    /// 16-byte secret key, hex encoded
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub secret: Option<String>,

    /// 4-character PIN, defaults to "0000" when absent
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub pin: Option<String>,
}

impl DeviceEntry {
    /// Decode the stored secret, if any
    pub fn secret_bytes(&self) -> Result<Option<[u8; 16]>> {
        match &self.secret {
            None => Ok(None),
            Some(hex_key) => {
                let bytes = hex::decode(hex_key)
                    .map_err(|e| EtrvError::Config(format!("Invalid secret hex: {}", e)))?;
                let key: [u8; 16] = bytes.try_into().map_err(|b: Vec<u8>| {
                    EtrvError::Config(format!("Secret key must be 16 bytes, got {}", b.len()))
                })?;
                Ok(Some(key))
            }
        }
    }
}

/// Registry of named valves, persisted as JSON
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DeviceRegistry {
    /// Saved devices by name
    #[serde(default)]
    pub devices: HashMap<String, DeviceEntry>,
}

impl DeviceRegistry {
    /// Default location: `$XDG_CONFIG_HOME/etrv/devices.json`
    pub fn default_path() -> Result<PathBuf> {
        let dir = dirs::config_dir()
            .ok_or_else(|| EtrvError::Config("Cannot determine config directory".to_string()))?;
        Ok(dir.join("etrv").join("devices.json"))
    }

    /// Load the registry from a JSON file. A missing file is an empty registry.
    pub fn from_file(path: &Path) -> Result<Self> {
        if !path.exists() {
            return Ok(Self::default());
        }
        let content = std::fs::read_to_string(path)?;
        let registry: Self = serde_json::from_str(&content)?;
        Ok(registry)
    }

    /// Persist the registry, creating parent directories as needed
    pub fn save(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let content = serde_json::to_string_pretty(self)?;
        std::fs::write(path, content)?;
        Ok(())
    }

    /// Add or replace a device
    pub fn add(&mut self, name: impl Into<String>, entry: DeviceEntry) {
        self.devices.insert(name.into(), entry);
    }

    /// Remove a device, returning its entry
    pub fn remove(&mut self, name: &str) -> Result<DeviceEntry> {
        self.devices.remove(name).ok_or_else(|| {
            DeviceNotFoundError {
                name: name.to_string(),
                known_devices: self.device_names(),
            }
            .into()
        })
    }

    /// Resolve a name or raw Bluetooth address to an entry.
    ///
    /// Anything containing a ':' is treated as a literal address and returned
    /// as an anonymous entry; otherwise the name must exist in the registry.
    pub fn resolve(&self, name_or_address: &str) -> Result<DeviceEntry> {
        if let Some(entry) = self.devices.get(name_or_address) {
            return Ok(entry.clone());
        }
        if name_or_address.contains(':') {
            return Ok(DeviceEntry {
                address: name_or_address.to_string(),
                secret: None,
                pin: None,
            });
        }
        Err(DeviceNotFoundError {
            name: name_or_address.to_string(),
            known_devices: self.device_names(),
        }
        .into())
    }

    /// Names of all saved devices, sorted
    pub fn device_names(&self) -> Vec<String> {
        let mut names: Vec<String> = self.devices.keys().cloned().collect();
        names.sort();
        names
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_entry() -> DeviceEntry {
        DeviceEntry {
            address: "00:04:2f:c0:ff:ee".to_string(),
            secret: Some("0102030405060708090a0b0c0d0e0f10".to_string()),
            pin: None,
        }
    }

    #[test]
    fn test_registry_parse() {
        let json = r#"{
            "devices": {
                "livingroom": {
                    "address": "00:04:2f:c0:ff:ee",
                    "secret": "0102030405060708090a0b0c0d0e0f10"
                }
            }
        }"#;

        let registry: DeviceRegistry = serde_json::from_str(json).unwrap();
        assert!(registry.devices.contains_key("livingroom"));
    }

    #[test]
    fn test_missing_file_is_empty() {
        let registry = DeviceRegistry::from_file(Path::new("/nonexistent/devices.json")).unwrap();
        assert!(registry.devices.is_empty());
    }

    #[test]
    fn test_save_and_reload() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("etrv").join("devices.json");

        let mut registry = DeviceRegistry::default();
        registry.add("bedroom", sample_entry());
        registry.save(&path).unwrap();

        let reloaded = DeviceRegistry::from_file(&path).unwrap();
        assert_eq!(reloaded.device_names(), vec!["bedroom".to_string()]);
        assert_eq!(
            reloaded.devices["bedroom"].address,
            "00:04:2f:c0:ff:ee"
        );
    }

    #[test]
    fn test_resolve_by_name() {
        let mut registry = DeviceRegistry::default();
        registry.add("livingroom", sample_entry());

        let entry = registry.resolve("livingroom").unwrap();
        assert_eq!(entry.address, "00:04:2f:c0:ff:ee");
    }

    #[test]
    fn test_resolve_raw_address() {
        let registry = DeviceRegistry::default();
        let entry = registry.resolve("aa:bb:cc:dd:ee:ff").unwrap();
        assert_eq!(entry.address, "aa:bb:cc:dd:ee:ff");
        assert!(entry.secret.is_none());
    }

    #[test]
    fn test_resolve_unknown_name() {
        let mut registry = DeviceRegistry::default();
        registry.add("livingroom", sample_entry());

        let err = registry.resolve("kitchen").unwrap_err();
        assert!(err.to_string().contains("kitchen"));
        assert!(err.to_string().contains("livingroom"));
    }

    #[test]
    fn test_remove_unknown_fails() {
        let mut registry = DeviceRegistry::default();
        assert!(registry.remove("nope").is_err());
    }

    #[test]
    fn test_secret_bytes() {
        let entry = sample_entry();
        let key = entry.secret_bytes().unwrap().unwrap();
        assert_eq!(key[0], 0x01);
        assert_eq!(key[15], 0x10);
    }

    #[test]
    fn test_secret_bytes_bad_length() {
        let entry = DeviceEntry {
            address: "aa:bb:cc:dd:ee:ff".to_string(),
            secret: Some("010203".to_string()),
            pin: None,
        };
        assert!(entry.secret_bytes().is_err());
    }
}
