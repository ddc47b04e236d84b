//! BLE transport abstraction and the btleplug implementation

use async_trait::async_trait;
use btleplug::api::{Central, Manager as _, Peripheral as _, ScanFilter, WriteType};
use btleplug::platform::{Adapter, Manager, Peripheral};
use protocol::characteristics::characteristic_by_handle;
use shared::{EtrvError, Result};
use std::time::Duration;
use tracing::debug;
use uuid::Uuid;

/// Raw GATT access to one valve.
///
/// Methods address characteristics by attribute handle; implementations map
/// handles to whatever their stack needs.
#[async_trait]
pub trait BleTransport: Send {
    async fn connect(&mut self) -> Result<()>;
    async fn disconnect(&mut self) -> Result<()>;
    fn is_connected(&self) -> bool;
    async fn read_handle(&mut self, handle: u16) -> Result<Vec<u8>>;
    async fn write_handle(&mut self, handle: u16, data: &[u8]) -> Result<()>;
}

pub(crate) fn ble_err(e: btleplug::Error) -> EtrvError {
    EtrvError::Bluetooth(e.to_string())
}

/// Production transport over btleplug
pub struct BtleplugTransport {
    adapter: Adapter,
    address: String,
    discovery_timeout: Duration,
    peripheral: Option<Peripheral>,
    connected: bool,
}

impl BtleplugTransport {
    /// Create a transport for the valve at `address` using the first
    /// Bluetooth adapter on the host. `discovery_timeout` bounds how long
    /// connecting may scan for a peripheral the adapter has not seen yet.
    pub async fn new(address: impl Into<String>, discovery_timeout: Duration) -> Result<Self> {
        let manager = Manager::new().await.map_err(ble_err)?;
        let adapter = manager
            .adapters()
            .await
            .map_err(ble_err)?
            .into_iter()
            .next()
            .ok_or_else(|| EtrvError::Bluetooth("No Bluetooth adapter found".to_string()))?;
        Ok(Self {
            adapter,
            address: address.into(),
            discovery_timeout,
            peripheral: None,
            connected: false,
        })
    }

    async fn find_peripheral(&self) -> Result<Peripheral> {
        // The peripheral may need to be seen in a scan before the adapter
        // knows it, so scan in one-second rounds until the address shows
        // up or the discovery window is spent.
        let rounds = self.discovery_timeout.as_secs().max(1);
        for _ in 0..rounds {
            for peripheral in self.adapter.peripherals().await.map_err(ble_err)? {
                if peripheral.address().to_string().eq_ignore_ascii_case(&self.address) {
                    return Ok(peripheral);
                }
            }
            self.adapter
                .start_scan(ScanFilter::default())
                .await
                .map_err(ble_err)?;
            tokio::time::sleep(Duration::from_secs(1)).await;
            self.adapter.stop_scan().await.map_err(ble_err)?;
        }
        Err(EtrvError::Bluetooth(format!(
            "Device {} not found",
            self.address
        )))
    }

    fn peripheral(&self) -> Result<&Peripheral> {
        self.peripheral
            .as_ref()
            .ok_or_else(|| EtrvError::Bluetooth("Not connected".to_string()))
    }

    fn resolve_characteristic(
        &self,
        handle: u16,
    ) -> Result<btleplug::api::Characteristic> {
        let gatt = characteristic_by_handle(handle).ok_or_else(|| {
            EtrvError::Bluetooth(format!("Unknown characteristic handle {:#06x}", handle))
        })?;
        let uuid = Uuid::parse_str(gatt.uuid)
            .map_err(|e| EtrvError::Bluetooth(format!("Bad UUID for {}: {}", gatt.name, e)))?;
        self.peripheral()?
            .characteristics()
            .into_iter()
            .find(|c| c.uuid == uuid)
            .ok_or_else(|| {
                EtrvError::Bluetooth(format!(
                    "Characteristic {} ({}) not present on device",
                    gatt.name, gatt.uuid
                ))
            })
    }
}

#[async_trait]
impl BleTransport for BtleplugTransport {
    async fn connect(&mut self) -> Result<()> {
        if self.connected {
            return Ok(());
        }
        let peripheral = self.find_peripheral().await?;
        peripheral.connect().await.map_err(ble_err)?;
        peripheral.discover_services().await.map_err(ble_err)?;
        debug!("Connected to {}", self.address);
        self.peripheral = Some(peripheral);
        self.connected = true;
        Ok(())
    }

    async fn disconnect(&mut self) -> Result<()> {
        if let Some(peripheral) = self.peripheral.take() {
            let _ = peripheral.disconnect().await;
        }
        self.connected = false;
        Ok(())
    }

    fn is_connected(&self) -> bool {
        self.connected
    }

    async fn read_handle(&mut self, handle: u16) -> Result<Vec<u8>> {
        let characteristic = self.resolve_characteristic(handle)?;
        self.peripheral()?
            .read(&characteristic)
            .await
            .map_err(ble_err)
    }

    async fn write_handle(&mut self, handle: u16, data: &[u8]) -> Result<()> {
        let characteristic = self.resolve_characteristic(handle)?;
        self.peripheral()?
            .write(&characteristic, data, WriteType::WithResponse)
            .await
            .map_err(ble_err)
    }
}
