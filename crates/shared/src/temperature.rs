//! Half-degree fixed-point temperature

use serde::{Deserialize, Serialize};
use std::fmt;

/// Temperature in half-degree Celsius steps, as stored on the valve.
///
/// The eTRV encodes every temperature as a single unsigned byte counting
/// half degrees, so the representable range is 0.0 to 127.5 degrees C.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(into = "f32", from = "f32")]
pub struct Temperature(u8);

impl Temperature {
    /// Create from a Celsius value, rounding to the nearest half degree.
    /// Values outside the representable range are clamped.
    pub fn from_celsius(celsius: f32) -> Self {
        let steps = (celsius * 2.0).round().clamp(0.0, u8::MAX as f32);
        Temperature(steps as u8)
    }

    /// Create from a raw half-degree count as read off the wire.
    pub fn from_half_degrees(steps: u8) -> Self {
        Temperature(steps)
    }

    /// Celsius value
    pub fn as_celsius(&self) -> f32 {
        self.0 as f32 * 0.5
    }

    /// Raw half-degree count for the wire
    pub fn half_degrees(&self) -> u8 {
        self.0
    }
}

impl From<Temperature> for f32 {
    fn from(t: Temperature) -> f32 {
        t.as_celsius()
    }
}

impl From<f32> for Temperature {
    fn from(celsius: f32) -> Self {
        Temperature::from_celsius(celsius)
    }
}

impl fmt::Display for Temperature {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:.1}°C", self.as_celsius())
    }
}
