//! The eTRV session: typed operations over one connected valve

use crate::transport::BleTransport;
use chrono::{DateTime, Utc};
use protocol::characteristics::{
    GattChar, BATTERY_LEVEL_R, DEVICE_NAME_RW, PIN_W, SCHEDULE_RW, SECRET_R, SETTINGS_RW,
    TEMPERATURE_RW, TIME_RW,
};
use protocol::{
    decode_payload, decode_secret, encode_payload, BatteryPayload, NamePayload, Schedule,
    ScheduleMode, SecretKey, SettingsPayload, TemperaturePayload, TimePayload,
};
use shared::{ConnectFailedError, EtrvError, Result, Temperature};
use std::time::Duration;
use tracing::{debug, warn};

/// Connection retry policy
#[derive(Debug, Clone)]
pub struct ConnectOptions {
    /// Maximum connection attempts before giving up
    pub attempts: u32,
    /// Delay between attempts
    pub retry_delay: Duration,
    /// Write the PIN right after connecting
    pub send_pin: bool,
}

impl Default for ConnectOptions {
    fn default() -> Self {
        Self {
            attempts: 10,
            retry_delay: Duration::from_millis(100),
            send_pin: true,
        }
    }
}

/// Session configuration
#[derive(Debug, Clone)]
pub struct DeviceOptions {
    /// 4-byte PIN, `b"0000"` unless changed on the valve
    pub pin: [u8; 4],
    /// Secret key from pairing; required for encrypted characteristics
    pub secret: Option<SecretKey>,
    pub connect: ConnectOptions,
}

impl Default for DeviceOptions {
    fn default() -> Self {
        Self {
            pin: *b"0000",
            secret: None,
            connect: ConnectOptions::default(),
        }
    }
}

/// A session with one valve.
///
/// Operations connect on demand, so callers can construct a device and go
/// straight to reading.
pub struct EtrvDevice {
    address: String,
    options: DeviceOptions,
    transport: Box<dyn BleTransport>,
}

impl EtrvDevice {
    pub fn new(
        transport: Box<dyn BleTransport>,
        address: impl Into<String>,
        options: DeviceOptions,
    ) -> Self {
        Self {
            address: address.into(),
            options,
            transport,
        }
    }

    pub fn address(&self) -> &str {
        &self.address
    }

    pub fn secret(&self) -> Option<&SecretKey> {
        self.options.secret.as_ref()
    }

    pub fn set_secret(&mut self, secret: SecretKey) {
        self.options.secret = Some(secret);
    }

    pub fn is_connected(&self) -> bool {
        self.transport.is_connected()
    }

    /// Connect to the valve, retrying per [`ConnectOptions`], and send the
    /// PIN once the link is up.
    pub async fn connect(&mut self) -> Result<()> {
        if self.transport.is_connected() {
            debug!("Device already connected {}", self.address);
            return Ok(());
        }

        let opts = self.options.connect.clone();
        let mut last_error = String::from("no attempts made");
        for attempt in 1..=opts.attempts {
            debug!("Trying to connect to {} (attempt {})", self.address, attempt);
            match self.transport.connect().await {
                Ok(()) => {
                    if opts.send_pin {
                        self.send_pin().await?;
                    }
                    return Ok(());
                }
                Err(e) => {
                    warn!(
                        "Unable to connect to {}. Retrying in {:?}",
                        self.address, opts.retry_delay
                    );
                    last_error = e.to_string();
                    if attempt < opts.attempts {
                        tokio::time::sleep(opts.retry_delay).await;
                    }
                }
            }
        }
        Err(ConnectFailedError {
            address: self.address.clone(),
            attempts: opts.attempts,
            last_error,
        }
        .into())
    }

    pub async fn disconnect(&mut self) -> Result<()> {
        debug!("Disconnecting from {}", self.address);
        self.transport.disconnect().await
    }

    async fn ensure_connected(&mut self) -> Result<()> {
        if !self.transport.is_connected() {
            self.connect().await?;
        }
        Ok(())
    }

    async fn send_pin(&mut self) -> Result<()> {
        debug!("Writing PIN to {}", self.address);
        let pin = self.options.pin;
        self.transport.write_handle(PIN_W.handle, &pin).await
    }

    /// Read the secret key. The valve only answers while in pairing mode
    /// (timer button pressed); the key is kept on the session for
    /// subsequent encrypted operations.
    pub async fn retrieve_secret_key(&mut self) -> Result<SecretKey> {
        self.ensure_connected().await?;
        let data = self.transport.read_handle(SECRET_R.handle).await?;
        let key = decode_secret(&data)?;
        self.options.secret = Some(key);
        Ok(key)
    }

    fn require_secret(&self) -> Result<SecretKey> {
        self.options.secret.ok_or(EtrvError::SecretRequired)
    }

    async fn read_encrypted(&mut self, characteristic: GattChar) -> Result<Vec<u8>> {
        // Fail before touching the radio when no key is available
        let key = self.require_secret()?;
        self.ensure_connected().await?;
        let raw = self.transport.read_handle(characteristic.handle).await?;
        Ok(decode_payload(&raw, &key)?)
    }

    async fn write_encrypted(&mut self, characteristic: GattChar, plain: &[u8]) -> Result<()> {
        let key = self.require_secret()?;
        self.ensure_connected().await?;
        let wire = encode_payload(plain, &key)?;
        self.transport.write_handle(characteristic.handle, &wire).await
    }

    /// Battery level in percent
    pub async fn battery(&mut self) -> Result<u8> {
        self.ensure_connected().await?;
        let data = self.transport.read_handle(BATTERY_LEVEL_R.handle).await?;
        Ok(BatteryPayload::decode(&data)?.percent)
    }

    /// Current room and set-point temperature
    pub async fn temperature(&mut self) -> Result<TemperaturePayload> {
        let plain = self.read_encrypted(TEMPERATURE_RW).await?;
        Ok(TemperaturePayload::decode(&plain)?)
    }

    /// Temperature measured at the valve, 0.5 degree resolution
    pub async fn room_temperature(&mut self) -> Result<Temperature> {
        Ok(self.temperature().await?.room)
    }

    /// Current target temperature
    pub async fn set_point(&mut self) -> Result<Temperature> {
        Ok(self.temperature().await?.set_point)
    }

    /// Set a new target temperature
    pub async fn set_temperature(&mut self, target: Temperature) -> Result<()> {
        let plain = TemperaturePayload::encode_set_point(target);
        self.write_encrypted(TEMPERATURE_RW, &plain).await
    }

    /// Read the settings block
    pub async fn settings(&mut self) -> Result<SettingsPayload> {
        let plain = self.read_encrypted(SETTINGS_RW).await?;
        Ok(SettingsPayload::decode(&plain)?)
    }

    /// Read-modify-write the settings block, preserving the opaque flag
    /// bytes the firmware keeps in it.
    pub async fn update_settings(
        &mut self,
        mutate: impl FnOnce(&mut SettingsPayload),
    ) -> Result<SettingsPayload> {
        let mut settings = self.settings().await?;
        mutate(&mut settings);
        self.write_encrypted(SETTINGS_RW, &settings.encode()).await?;
        Ok(settings)
    }

    /// Switch between manual, scheduled and vacation operation
    pub async fn set_schedule_mode(&mut self, mode: ScheduleMode) -> Result<SettingsPayload> {
        self.update_settings(|s| s.schedule_mode = mode).await
    }

    /// Device name
    pub async fn name(&mut self) -> Result<String> {
        let plain = self.read_encrypted(DEVICE_NAME_RW).await?;
        Ok(NamePayload::decode(&plain)?.name)
    }

    /// Rename the valve (16 ASCII bytes max)
    pub async fn set_name(&mut self, name: &str) -> Result<()> {
        let plain = NamePayload::encode(name)?;
        self.write_encrypted(DEVICE_NAME_RW, &plain).await
    }

    /// Read the valve clock
    pub async fn time(&mut self) -> Result<TimePayload> {
        let plain = self.read_encrypted(TIME_RW).await?;
        Ok(TimePayload::decode(&plain)?)
    }

    /// Set the valve clock from a UTC instant and a UTC offset in seconds
    pub async fn set_time(&mut self, utc: DateTime<Utc>, utc_offset: i32) -> Result<()> {
        let plain = TimePayload::from_utc(utc, utc_offset).encode();
        self.write_encrypted(TIME_RW, &plain).await
    }

    /// Read the weekly schedule from its three characteristics
    pub async fn schedule(&mut self) -> Result<Schedule> {
        let mut plain = Vec::new();
        for characteristic in SCHEDULE_RW {
            plain.extend(self.read_encrypted(characteristic).await?);
        }
        Ok(Schedule::decode(&plain)?)
    }

    /// Write the weekly schedule
    pub async fn set_schedule(&mut self, schedule: &Schedule) -> Result<()> {
        let encoded = schedule.encode()?;
        let parts = Schedule::split_parts(&encoded);
        for (characteristic, part) in SCHEDULE_RW.into_iter().zip(parts) {
            self.write_encrypted(characteristic, part).await?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use chrono::TimeZone;
    use protocol::{DayProgram, SwitchEvent, SCHEDULE_PART_LENS};
    use shared::ProtocolError;
    use std::collections::HashMap;
    use std::sync::{Arc, Mutex};

    #[derive(Debug, Default)]
    struct FakeState {
        store: HashMap<u16, Vec<u8>>,
        written: Vec<(u16, Vec<u8>)>,
        connected: bool,
        connect_calls: u32,
        connect_failures_left: u32,
    }

    #[derive(Clone, Default)]
    struct FakeTransport {
        state: Arc<Mutex<FakeState>>,
    }

    impl FakeTransport {
        fn with_store(entries: &[(u16, Vec<u8>)]) -> Self {
            let fake = Self::default();
            {
                let mut state = fake.state.lock().unwrap();
                for (handle, data) in entries {
                    state.store.insert(*handle, data.clone());
                }
            }
            fake
        }

        fn failing(failures: u32) -> Self {
            let fake = Self::default();
            fake.state.lock().unwrap().connect_failures_left = failures;
            fake
        }
    }

    #[async_trait]
    impl BleTransport for FakeTransport {
        async fn connect(&mut self) -> Result<()> {
            let mut state = self.state.lock().unwrap();
            state.connect_calls += 1;
            if state.connect_failures_left > 0 {
                state.connect_failures_left -= 1;
                return Err(EtrvError::Bluetooth("refused".to_string()));
            }
            state.connected = true;
            Ok(())
        }

        async fn disconnect(&mut self) -> Result<()> {
            self.state.lock().unwrap().connected = false;
            Ok(())
        }

        fn is_connected(&self) -> bool {
            self.state.lock().unwrap().connected
        }

        async fn read_handle(&mut self, handle: u16) -> Result<Vec<u8>> {
            self.state
                .lock()
                .unwrap()
                .store
                .get(&handle)
                .cloned()
                .ok_or_else(|| EtrvError::Bluetooth(format!("no data at {:#06x}", handle)))
        }

        async fn write_handle(&mut self, handle: u16, data: &[u8]) -> Result<()> {
            self.state
                .lock()
                .unwrap()
                .written
                .push((handle, data.to_vec()));
            Ok(())
        }
    }

    const ADDRESS: &str = "00:04:2f:c0:ff:ee";

    fn test_key() -> SecretKey {
        *b"0123456789abcdef"
    }

    fn paired_options() -> DeviceOptions {
        DeviceOptions {
            secret: Some(test_key()),
            ..Default::default()
        }
    }

    fn device(fake: &FakeTransport, options: DeviceOptions) -> EtrvDevice {
        EtrvDevice::new(Box::new(fake.clone()), ADDRESS, options)
    }

    fn encrypted(plain: &[u8]) -> Vec<u8> {
        encode_payload(plain, &test_key()).unwrap()
    }

    // ============== Connection ==============

    #[tokio::test]
    async fn test_connect_sends_pin() {
        let fake = FakeTransport::default();
        let mut dev = device(&fake, DeviceOptions::default());

        dev.connect().await.unwrap();

        let state = fake.state.lock().unwrap();
        assert!(state.connected);
        assert_eq!(state.written, vec![(PIN_W.handle, b"0000".to_vec())]);
    }

    #[tokio::test]
    async fn test_connect_can_skip_pin() {
        let fake = FakeTransport::default();
        let mut options = DeviceOptions::default();
        options.connect.send_pin = false;
        let mut dev = device(&fake, options);

        dev.connect().await.unwrap();
        assert!(fake.state.lock().unwrap().written.is_empty());
    }

    #[tokio::test]
    async fn test_connect_retry_is_bounded() {
        let fake = FakeTransport::failing(u32::MAX);
        let mut options = DeviceOptions::default();
        options.connect.attempts = 3;
        options.connect.retry_delay = Duration::from_millis(1);
        let mut dev = device(&fake, options);

        let err = dev.connect().await.unwrap_err();
        assert!(matches!(err, EtrvError::ConnectFailed(_)));
        assert!(err.to_string().contains("3 attempts"));
        assert_eq!(fake.state.lock().unwrap().connect_calls, 3);
    }

    #[tokio::test]
    async fn test_connect_recovers_after_failures() {
        let fake = FakeTransport::failing(2);
        let mut options = DeviceOptions::default();
        options.connect.retry_delay = Duration::from_millis(1);
        let mut dev = device(&fake, options);

        dev.connect().await.unwrap();
        assert_eq!(fake.state.lock().unwrap().connect_calls, 3);
    }

    #[tokio::test]
    async fn test_operations_auto_connect() {
        let fake = FakeTransport::with_store(&[(BATTERY_LEVEL_R.handle, vec![91])]);
        let mut dev = device(&fake, DeviceOptions::default());

        assert!(!dev.is_connected());
        assert_eq!(dev.battery().await.unwrap(), 91);
        assert!(dev.is_connected());
    }

    // ============== Battery ==============

    #[tokio::test]
    async fn test_battery_is_plaintext_and_needs_no_secret() {
        let fake = FakeTransport::with_store(&[(BATTERY_LEVEL_R.handle, vec![87])]);
        let mut dev = device(&fake, DeviceOptions::default());

        assert!(dev.secret().is_none());
        assert_eq!(dev.battery().await.unwrap(), 87);
    }

    #[tokio::test]
    async fn test_battery_rejects_cipher_block_sized_payload() {
        // An encrypted answer here must surface as a length error, not as a
        // garbage percentage
        let fake = FakeTransport::with_store(&[(BATTERY_LEVEL_R.handle, encrypted(&[87]))]);
        let mut dev = device(&fake, paired_options());

        let err = dev.battery().await.unwrap_err();
        assert!(matches!(
            err,
            EtrvError::Protocol(ProtocolError::UnexpectedLength {
                expected: 1,
                actual: 8,
                ..
            })
        ));
    }

    // ============== Secret handling ==============

    #[tokio::test]
    async fn test_encrypted_read_requires_secret() {
        let fake = FakeTransport::default();
        let mut dev = device(&fake, DeviceOptions::default());

        let err = dev.temperature().await.unwrap_err();
        assert!(matches!(err, EtrvError::SecretRequired));
        // The radio must not have been touched
        assert_eq!(fake.state.lock().unwrap().connect_calls, 0);
    }

    #[tokio::test]
    async fn test_retrieve_secret_key() {
        let fake = FakeTransport::with_store(&[(SECRET_R.handle, test_key().to_vec())]);
        let mut dev = device(&fake, DeviceOptions::default());

        let key = dev.retrieve_secret_key().await.unwrap();
        assert_eq!(key, test_key());
        assert_eq!(dev.secret(), Some(&test_key()));
    }

    #[tokio::test]
    async fn test_retrieved_key_unlocks_encrypted_reads() {
        let plain = [44u8, 42, 0, 0, 0, 0, 0, 0];
        let fake = FakeTransport::with_store(&[
            (SECRET_R.handle, test_key().to_vec()),
            (TEMPERATURE_RW.handle, encrypted(&plain)),
        ]);
        let mut dev = device(&fake, DeviceOptions::default());

        dev.retrieve_secret_key().await.unwrap();
        let temp = dev.temperature().await.unwrap();
        assert_eq!(temp.room.as_celsius(), 22.0);
    }

    // ============== Temperature ==============

    #[tokio::test]
    async fn test_temperature_read() {
        let plain = [43u8, 45, 0, 0, 0, 0, 0, 0];
        let fake = FakeTransport::with_store(&[(TEMPERATURE_RW.handle, encrypted(&plain))]);
        let mut dev = device(&fake, paired_options());

        let temp = dev.temperature().await.unwrap();
        assert_eq!(temp.room.as_celsius(), 21.5);
        assert_eq!(temp.set_point.as_celsius(), 22.5);
        assert_eq!(dev.room_temperature().await.unwrap().as_celsius(), 21.5);
        assert_eq!(dev.set_point().await.unwrap().as_celsius(), 22.5);
    }

    #[tokio::test]
    async fn test_set_temperature_writes_encrypted_set_point() {
        let fake = FakeTransport::default();
        let mut dev = device(&fake, paired_options());

        dev.set_temperature(Temperature::from_celsius(23.0))
            .await
            .unwrap();

        let state = fake.state.lock().unwrap();
        let (handle, wire) = state.written.last().unwrap();
        assert_eq!(*handle, TEMPERATURE_RW.handle);

        let plain = decode_payload(wire, &test_key()).unwrap();
        let payload = TemperaturePayload::decode(&plain).unwrap();
        assert_eq!(payload.set_point.as_celsius(), 23.0);
        assert_eq!(payload.room.half_degrees(), 0);
    }

    // ============== Settings ==============

    fn settings_plain() -> [u8; 16] {
        let mut data = [0u8; 16];
        data[0] = 0xaa;
        data[2] = 0xbb;
        data[3] = 12; // frost protection 6.0 C
        data[4] = 0; // manual
        data[5] = 30;
        data[15] = 0xcc;
        data
    }

    #[tokio::test]
    async fn test_update_settings_preserves_opaque_bytes() {
        let fake =
            FakeTransport::with_store(&[(SETTINGS_RW.handle, encrypted(&settings_plain()))]);
        let mut dev = device(&fake, paired_options());

        let updated = dev
            .set_schedule_mode(ScheduleMode::Vacation)
            .await
            .unwrap();
        assert_eq!(updated.schedule_mode, ScheduleMode::Vacation);

        let state = fake.state.lock().unwrap();
        let (handle, wire) = state.written.last().unwrap();
        assert_eq!(*handle, SETTINGS_RW.handle);

        let plain = decode_payload(wire, &test_key()).unwrap();
        assert_eq!(plain[0], 0xaa);
        assert_eq!(plain[2], 0xbb);
        assert_eq!(plain[4], 2);
        assert_eq!(plain[15], 0xcc);
    }

    // ============== Name and time ==============

    #[tokio::test]
    async fn test_name_round_trip() {
        let mut plain = [0u8; 16];
        plain[..7].copy_from_slice(b"Hallway");
        let fake = FakeTransport::with_store(&[(DEVICE_NAME_RW.handle, encrypted(&plain))]);
        let mut dev = device(&fake, paired_options());

        assert_eq!(dev.name().await.unwrap(), "Hallway");

        dev.set_name("Kitchen").await.unwrap();
        let state = fake.state.lock().unwrap();
        let (_, wire) = state.written.last().unwrap();
        let written = decode_payload(wire, &test_key()).unwrap();
        assert_eq!(&written[..7], b"Kitchen");
    }

    #[tokio::test]
    async fn test_clock_round_trip() {
        let now = chrono::Utc.timestamp_opt(1_700_000_000, 0).unwrap();
        let fake = FakeTransport::default();
        let mut dev = device(&fake, paired_options());

        dev.set_time(now, 3600).await.unwrap();

        let wire = {
            let state = fake.state.lock().unwrap();
            let (handle, wire) = state.written.last().unwrap();
            assert_eq!(*handle, TIME_RW.handle);
            wire.clone()
        };

        // Feed the written clock back and read it
        let fake2 = FakeTransport::with_store(&[(TIME_RW.handle, wire)]);
        let mut dev2 = device(&fake2, paired_options());
        let time = dev2.time().await.unwrap();
        assert_eq!(time.utc_offset, 3600);
        assert_eq!(time.utc().unwrap(), now);
    }

    // ============== Schedule ==============

    fn sample_schedule() -> Schedule {
        let day = DayProgram {
            events: vec![
                SwitchEvent::new(7 * 60).unwrap(),
                SwitchEvent::new(21 * 60 + 30).unwrap(),
            ],
        };
        Schedule {
            home: Temperature::from_celsius(22.0),
            away: Temperature::from_celsius(17.0),
            days: [
                day.clone(),
                day.clone(),
                day.clone(),
                day.clone(),
                day.clone(),
                day.clone(),
                day,
            ],
        }
    }

    #[tokio::test]
    async fn test_schedule_read_across_parts() {
        let schedule = sample_schedule();
        let encoded = schedule.encode().unwrap();
        let parts = Schedule::split_parts(&encoded);

        let fake = FakeTransport::with_store(&[
            (SCHEDULE_RW[0].handle, encrypted(parts[0])),
            (SCHEDULE_RW[1].handle, encrypted(parts[1])),
            (SCHEDULE_RW[2].handle, encrypted(parts[2])),
        ]);
        let mut dev = device(&fake, paired_options());

        assert_eq!(dev.schedule().await.unwrap(), schedule);
    }

    #[tokio::test]
    async fn test_schedule_write_splits_parts() {
        let schedule = sample_schedule();
        let fake = FakeTransport::default();
        let mut dev = device(&fake, paired_options());

        dev.set_schedule(&schedule).await.unwrap();

        let state = fake.state.lock().unwrap();
        // PIN write plus three schedule parts
        let schedule_writes: Vec<_> = state
            .written
            .iter()
            .filter(|(h, _)| *h != PIN_W.handle)
            .collect();
        assert_eq!(schedule_writes.len(), 3);

        let mut plain = Vec::new();
        for (i, (handle, wire)) in schedule_writes.iter().enumerate() {
            assert_eq!(*handle, SCHEDULE_RW[i].handle);
            let part = decode_payload(wire, &test_key()).unwrap();
            assert_eq!(part.len(), SCHEDULE_PART_LENS[i]);
            plain.extend(part);
        }
        assert_eq!(Schedule::decode(&plain).unwrap(), schedule);
    }
}
