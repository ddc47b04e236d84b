//! Weekly schedule model and codec
//!
//! The schedule lives on three characteristics which together carry one
//! logical payload: a two-byte header (home and away temperatures) followed
//! by seven day programs of six event slots each. An event slot holds the
//! time of day in 30-minute steps at which the valve switches between the
//! away and home temperatures; slots are used in ascending order, alternate
//! starting with the switch to home, and unused slots are zero.

use serde::Serialize;
use shared::{ProtocolError, Temperature};
use std::fmt;

/// Slots per day program
pub const EVENTS_PER_DAY: usize = 6;

/// Plaintext length of the complete logical schedule payload
pub const SCHEDULE_WIRE_LEN: usize = 2 + 7 * EVENTS_PER_DAY;

/// Plaintext lengths of the three characteristic chunks:
/// header + Mon-Wed, Thu-Fri, Sat-Sun
pub const SCHEDULE_PART_LENS: [usize; 3] = [
    2 + 3 * EVENTS_PER_DAY,
    2 * EVENTS_PER_DAY,
    2 * EVENTS_PER_DAY,
];

const MINUTES_PER_STEP: u16 = 30;
const MINUTES_PER_DAY: u16 = 24 * 60;

pub const DAY_NAMES: [&str; 7] = [
    "Monday",
    "Tuesday",
    "Wednesday",
    "Thursday",
    "Friday",
    "Saturday",
    "Sunday",
];

/// A temperature switch at a time of day
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SwitchEvent {
    /// Minutes after midnight; must be a positive multiple of 30
    pub minutes: u16,
}

impl SwitchEvent {
    pub fn new(minutes: u16) -> Result<Self, ProtocolError> {
        if minutes % MINUTES_PER_STEP != 0 {
            return Err(ProtocolError::InvalidSchedule(format!(
                "Event time {} is not on a 30-minute boundary",
                minutes
            )));
        }
        if minutes == 0 || minutes >= MINUTES_PER_DAY {
            return Err(ProtocolError::InvalidSchedule(format!(
                "Event time {} outside 00:30..23:30",
                minutes
            )));
        }
        Ok(Self { minutes })
    }

    fn from_step(step: u8) -> Result<Self, ProtocolError> {
        Self::new(step as u16 * MINUTES_PER_STEP)
    }

    fn step(&self) -> u8 {
        (self.minutes / MINUTES_PER_STEP) as u8
    }
}

impl fmt::Display for SwitchEvent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:02}:{:02}", self.minutes / 60, self.minutes % 60)
    }
}

/// One day's switch events, ascending, at most six
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DayProgram {
    pub events: Vec<SwitchEvent>,
}

impl DayProgram {
    fn decode(data: &[u8]) -> Result<Self, ProtocolError> {
        let mut events: Vec<SwitchEvent> = Vec::new();
        for &step in data {
            if step == 0 {
                break;
            }
            let event = SwitchEvent::from_step(step)?;
            if let Some(prev) = events.last() {
                if event.minutes <= prev.minutes {
                    return Err(ProtocolError::InvalidSchedule(format!(
                        "Events out of order: {} after {}",
                        event, prev
                    )));
                }
            }
            events.push(event);
        }
        Ok(Self { events })
    }

    fn encode(&self, out: &mut [u8]) -> Result<(), ProtocolError> {
        if self.events.len() > EVENTS_PER_DAY {
            return Err(ProtocolError::InvalidSchedule(format!(
                "Day has {} events, at most {} allowed",
                self.events.len(),
                EVENTS_PER_DAY
            )));
        }
        for window in self.events.windows(2) {
            if window[1].minutes <= window[0].minutes {
                return Err(ProtocolError::InvalidSchedule(format!(
                    "Events out of order: {} after {}",
                    window[1], window[0]
                )));
            }
        }
        for (slot, event) in out.iter_mut().zip(self.events.iter().map(SwitchEvent::step)) {
            *slot = event;
        }
        Ok(())
    }
}

/// The valve's weekly program
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Schedule {
    /// Comfort temperature used between a switch-to-home and the following
    /// switch-to-away event
    pub home: Temperature,
    /// Setback temperature used outside home periods
    pub away: Temperature,
    /// Monday first
    pub days: [DayProgram; 7],
}

impl Schedule {
    /// Decode the concatenated plaintext of the three schedule chunks
    pub fn decode(data: &[u8]) -> Result<Self, ProtocolError> {
        if data.len() != SCHEDULE_WIRE_LEN {
            return Err(ProtocolError::UnexpectedLength {
                handle: crate::characteristics::SCHEDULE_RW[0].handle,
                expected: SCHEDULE_WIRE_LEN,
                actual: data.len(),
            });
        }
        let home = Temperature::from_half_degrees(data[0]);
        let away = Temperature::from_half_degrees(data[1]);

        let mut days: [DayProgram; 7] = Default::default();
        for (i, day) in days.iter_mut().enumerate() {
            let start = 2 + i * EVENTS_PER_DAY;
            *day = DayProgram::decode(&data[start..start + EVENTS_PER_DAY])?;
        }
        Ok(Self { home, away, days })
    }

    /// Encode to the concatenated plaintext form
    pub fn encode(&self) -> Result<Vec<u8>, ProtocolError> {
        let mut out = vec![0u8; SCHEDULE_WIRE_LEN];
        out[0] = self.home.half_degrees();
        out[1] = self.away.half_degrees();
        for (i, day) in self.days.iter().enumerate() {
            let start = 2 + i * EVENTS_PER_DAY;
            day.encode(&mut out[start..start + EVENTS_PER_DAY])?;
        }
        Ok(out)
    }

    /// Split an encoded payload into the per-characteristic chunks
    pub fn split_parts(encoded: &[u8]) -> [&[u8]; 3] {
        let (a, rest) = encoded.split_at(SCHEDULE_PART_LENS[0]);
        let (b, c) = rest.split_at(SCHEDULE_PART_LENS[1]);
        [a, b, c]
    }
}
