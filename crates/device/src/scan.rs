//! Valve discovery

use crate::transport::ble_err;
use btleplug::api::{Central, Manager as _, Peripheral as _, ScanFilter};
use btleplug::platform::Manager;
use serde::Serialize;
use shared::{EtrvError, Result};
use std::time::Duration;
use tracing::debug;

/// Suffix of the advertised local name of an eTRV in range
pub const ETRV_NAME_SUFFIX: &str = ";eTRV";

/// A valve seen during a scan
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DiscoveredValve {
    pub address: String,
    pub local_name: String,
    pub rssi: Option<i16>,
}

/// Scan for eTRV valves for the given duration.
///
/// Matches advertisements whose complete local name ends in `;eTRV`, the
/// pattern the stock firmware broadcasts.
pub async fn scan(timeout: Duration) -> Result<Vec<DiscoveredValve>> {
    let manager = Manager::new().await.map_err(ble_err)?;
    let adapter = manager
        .adapters()
        .await
        .map_err(ble_err)?
        .into_iter()
        .next()
        .ok_or_else(|| EtrvError::Bluetooth("No Bluetooth adapter found".to_string()))?;

    adapter
        .start_scan(ScanFilter::default())
        .await
        .map_err(ble_err)?;
    tokio::time::sleep(timeout).await;
    adapter.stop_scan().await.map_err(ble_err)?;

    let mut valves = Vec::new();
    for peripheral in adapter.peripherals().await.map_err(ble_err)? {
        let Some(props) = peripheral.properties().await.map_err(ble_err)? else {
            continue;
        };
        let Some(name) = props.local_name else {
            continue;
        };
        if !name.ends_with(ETRV_NAME_SUFFIX) {
            continue;
        }
        debug!("Found valve {} ({})", props.address, name);
        valves.push(DiscoveredValve {
            address: props.address.to_string(),
            local_name: name,
            rssi: props.rssi,
        });
    }
    Ok(valves)
}
