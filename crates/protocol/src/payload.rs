//! Typed payloads for the valve's characteristics
//!
//! All multi-byte integers are big-endian on the wire. Temperatures are
//! half-degree counts, see [`shared::Temperature`].

use crate::characteristics::{
    BATTERY_LEVEL_R, DEVICE_NAME_RW, SECRET_R, SETTINGS_RW, TEMPERATURE_RW, TIME_RW,
};
use crate::xxtea::SecretKey;
use chrono::{DateTime, TimeZone, Utc};
use serde::Serialize;
use shared::{ProtocolError, Temperature};
use std::fmt;
use std::str::FromStr;

fn check_len(handle: u16, expected: usize, data: &[u8]) -> Result<(), ProtocolError> {
    if data.len() != expected {
        return Err(ProtocolError::UnexpectedLength {
            handle,
            expected,
            actual: data.len(),
        });
    }
    Ok(())
}

fn read_u32_be(data: &[u8]) -> u32 {
    u32::from_be_bytes([data[0], data[1], data[2], data[3]])
}

/// Operating mode of the valve
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ScheduleMode {
    /// Hold the manually set temperature
    Manual,
    /// Follow the weekly schedule
    Scheduled,
    /// Hold the vacation temperature between the vacation dates
    Vacation,
}

impl TryFrom<u8> for ScheduleMode {
    type Error = ProtocolError;

    fn try_from(value: u8) -> Result<Self, ProtocolError> {
        match value {
            0 => Ok(ScheduleMode::Manual),
            1 => Ok(ScheduleMode::Scheduled),
            2 => Ok(ScheduleMode::Vacation),
            other => Err(ProtocolError::InvalidScheduleMode(other)),
        }
    }
}

impl From<ScheduleMode> for u8 {
    fn from(mode: ScheduleMode) -> u8 {
        match mode {
            ScheduleMode::Manual => 0,
            ScheduleMode::Scheduled => 1,
            ScheduleMode::Vacation => 2,
        }
    }
}

impl fmt::Display for ScheduleMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            ScheduleMode::Manual => "manual",
            ScheduleMode::Scheduled => "scheduled",
            ScheduleMode::Vacation => "vacation",
        };
        f.write_str(s)
    }
}

impl FromStr for ScheduleMode {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "manual" => Ok(ScheduleMode::Manual),
            "scheduled" => Ok(ScheduleMode::Scheduled),
            "vacation" => Ok(ScheduleMode::Vacation),
            other => Err(format!(
                "Unknown mode '{}'. Expected manual, scheduled or vacation",
                other
            )),
        }
    }
}

/// Room and set-point temperature (handle 0x002d)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TemperaturePayload {
    /// Temperature measured at the valve
    pub room: Temperature,
    /// Target temperature
    pub set_point: Temperature,
}

impl TemperaturePayload {
    pub const WIRE_LEN: usize = 8;

    pub fn decode(data: &[u8]) -> Result<Self, ProtocolError> {
        check_len(TEMPERATURE_RW.handle, Self::WIRE_LEN, data)?;
        Ok(Self {
            room: Temperature::from_half_degrees(data[0]),
            set_point: Temperature::from_half_degrees(data[1]),
        })
    }

    /// Encode for a set-point write. The room byte is read-only on the
    /// device and is sent as zero.
    pub fn encode_set_point(set_point: Temperature) -> [u8; Self::WIRE_LEN] {
        let mut out = [0u8; Self::WIRE_LEN];
        out[1] = set_point.half_degrees();
        out
    }
}

/// Settings block (handle 0x002a)
///
/// The first three bytes and the last two are configuration flags the
/// firmware understands but this crate does not model; they are carried
/// opaquely so a read-modify-write cycle preserves them.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SettingsPayload {
    #[serde(skip)]
    pub flags: [u8; 3],
    /// Temperature the frost-protection feature falls back to
    pub frost_protection: Temperature,
    pub schedule_mode: ScheduleMode,
    pub vacation_temperature: Temperature,
    /// Vacation window start, `None` when unset
    pub vacation_from: Option<DateTime<Utc>>,
    /// Vacation window end, `None` when unset
    pub vacation_to: Option<DateTime<Utc>>,
    #[serde(skip)]
    pub tail: [u8; 2],
}

impl SettingsPayload {
    pub const WIRE_LEN: usize = 16;

    pub fn decode(data: &[u8]) -> Result<Self, ProtocolError> {
        check_len(SETTINGS_RW.handle, Self::WIRE_LEN, data)?;
        Ok(Self {
            flags: [data[0], data[1], data[2]],
            frost_protection: Temperature::from_half_degrees(data[3]),
            schedule_mode: ScheduleMode::try_from(data[4])?,
            vacation_temperature: Temperature::from_half_degrees(data[5]),
            vacation_from: decode_timestamp(read_u32_be(&data[6..10])),
            vacation_to: decode_timestamp(read_u32_be(&data[10..14])),
            tail: [data[14], data[15]],
        })
    }

    pub fn encode(&self) -> [u8; Self::WIRE_LEN] {
        let mut out = [0u8; Self::WIRE_LEN];
        out[..3].copy_from_slice(&self.flags);
        out[3] = self.frost_protection.half_degrees();
        out[4] = u8::from(self.schedule_mode);
        out[5] = self.vacation_temperature.half_degrees();
        out[6..10].copy_from_slice(&encode_timestamp(self.vacation_from));
        out[10..14].copy_from_slice(&encode_timestamp(self.vacation_to));
        out[14..].copy_from_slice(&self.tail);
        out
    }
}

fn decode_timestamp(secs: u32) -> Option<DateTime<Utc>> {
    if secs == 0 {
        return None;
    }
    Utc.timestamp_opt(secs as i64, 0).single()
}

fn encode_timestamp(ts: Option<DateTime<Utc>>) -> [u8; 4] {
    let secs = ts.map(|t| t.timestamp().clamp(0, u32::MAX as i64)).unwrap_or(0);
    (secs as u32).to_be_bytes()
}

/// Valve clock (handle 0x0036)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TimePayload {
    /// Seconds since epoch in the valve's local time
    pub local_time: u32,
    /// Offset of local time from UTC, in seconds
    pub utc_offset: i32,
}

impl TimePayload {
    pub const WIRE_LEN: usize = 8;

    pub fn decode(data: &[u8]) -> Result<Self, ProtocolError> {
        check_len(TIME_RW.handle, Self::WIRE_LEN, data)?;
        Ok(Self {
            local_time: read_u32_be(&data[0..4]),
            utc_offset: read_u32_be(&data[4..8]) as i32,
        })
    }

    pub fn encode(&self) -> [u8; Self::WIRE_LEN] {
        let mut out = [0u8; Self::WIRE_LEN];
        out[..4].copy_from_slice(&self.local_time.to_be_bytes());
        out[4..].copy_from_slice(&(self.utc_offset as u32).to_be_bytes());
        out
    }

    /// Build from a UTC instant and the valve's UTC offset
    pub fn from_utc(utc: DateTime<Utc>, utc_offset: i32) -> Self {
        let local = (utc.timestamp() + utc_offset as i64).clamp(0, u32::MAX as i64);
        Self {
            local_time: local as u32,
            utc_offset,
        }
    }

    /// The clock reading as a UTC instant
    pub fn utc(&self) -> Option<DateTime<Utc>> {
        let secs = self.local_time as i64 - self.utc_offset as i64;
        Utc.timestamp_opt(secs, 0).single()
    }
}

/// Battery level (handle 0x0010), a single plaintext byte
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct BatteryPayload {
    /// Remaining charge, 0-100
    pub percent: u8,
}

impl BatteryPayload {
    pub const WIRE_LEN: usize = 1;

    pub fn decode(data: &[u8]) -> Result<Self, ProtocolError> {
        check_len(BATTERY_LEVEL_R.handle, Self::WIRE_LEN, data)?;
        Ok(Self { percent: data[0] })
    }
}

/// Device name (handle 0x0030), 16 bytes of zero-padded ASCII
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct NamePayload {
    pub name: String,
}

impl NamePayload {
    pub const WIRE_LEN: usize = 16;

    pub fn decode(data: &[u8]) -> Result<Self, ProtocolError> {
        check_len(DEVICE_NAME_RW.handle, Self::WIRE_LEN, data)?;
        let trimmed: &[u8] = match data.iter().position(|&b| b == 0) {
            Some(end) => &data[..end],
            None => data,
        };
        if !trimmed.is_ascii() {
            return Err(ProtocolError::NameNotAscii);
        }
        Ok(Self {
            name: String::from_utf8_lossy(trimmed).into_owned(),
        })
    }

    pub fn encode(name: &str) -> Result<[u8; Self::WIRE_LEN], ProtocolError> {
        if !name.is_ascii() {
            return Err(ProtocolError::NameNotAscii);
        }
        if name.len() > Self::WIRE_LEN {
            return Err(ProtocolError::NameTooLong(name.len()));
        }
        let mut out = [0u8; Self::WIRE_LEN];
        out[..name.len()].copy_from_slice(name.as_bytes());
        Ok(out)
    }
}

/// Parse the secret key characteristic (handle 0x003f)
pub fn decode_secret(data: &[u8]) -> Result<SecretKey, ProtocolError> {
    check_len(SECRET_R.handle, 16, data)?;
    let mut key = [0u8; 16];
    key.copy_from_slice(data);
    Ok(key)
}
