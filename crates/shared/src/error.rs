//! Error types for etrv

use thiserror::Error;

/// Error thrown when connecting to a valve fails after all retry attempts
#[derive(Debug, Error)]
#[error("Unable to connect to '{address}' after {attempts} attempts: {last_error}")]
pub struct ConnectFailedError {
    pub address: String,
    pub attempts: u32,
    pub last_error: String,
}

/// Error thrown when a registry lookup does not match any saved device
#[derive(Debug, Error)]
#[error("Device '{name}' not found in registry. Known devices: {}", known_devices.join(", "))]
pub struct DeviceNotFoundError {
    pub name: String,
    pub known_devices: Vec<String>,
}

/// Errors produced while encoding or decoding characteristic payloads
#[derive(Debug, Error)]
pub enum ProtocolError {
    #[error("Payload for handle {handle:#06x} has length {actual}, expected {expected}")]
    UnexpectedLength {
        handle: u16,
        expected: usize,
        actual: usize,
    },

    #[error("Unknown schedule mode value {0}")]
    InvalidScheduleMode(u8),

    #[error("Encrypted payload length {0} is not a multiple of 4")]
    RaggedPayload(usize),

    #[error("Device name is limited to 16 ASCII bytes, got {0} bytes")]
    NameTooLong(usize),

    #[error("Device name contains non-ASCII bytes")]
    NameNotAscii,

    #[error("Invalid schedule: {0}")]
    InvalidSchedule(String),
}

/// General etrv error type
#[derive(Debug, Error)]
pub enum EtrvError {
    #[error(transparent)]
    ConnectFailed(#[from] ConnectFailedError),

    #[error(transparent)]
    DeviceNotFound(#[from] DeviceNotFoundError),

    #[error(transparent)]
    Protocol(#[from] ProtocolError),

    #[error("No secret key set. Pair with the valve first to retrieve one")]
    SecretRequired,

    #[error("Bluetooth error: {0}")]
    Bluetooth(String),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("{0}")]
    Other(String),
}

pub type Result<T> = std::result::Result<T, EtrvError>;
