//! GATT characteristic table for the eTRV

/// One GATT characteristic on the valve
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct GattChar {
    /// Attribute handle, as used by the stock firmware
    pub handle: u16,
    /// Characteristic UUID
    pub uuid: &'static str,
    /// Human-readable name for logs
    pub name: &'static str,
}

/// Battery level, single plaintext byte (standard Battery Service)
pub const BATTERY_LEVEL_R: GattChar = GattChar {
    handle: 0x0010,
    uuid: "00002a19-0000-1000-8000-00805f9b34fb",
    name: "battery",
};

/// PIN, written plaintext right after connecting
pub const PIN_W: GattChar = GattChar {
    handle: 0x0024,
    uuid: "10020001-2749-0001-0000-00805f9b042f",
    name: "pin",
};

/// Settings block (frost protection, mode, vacation), encrypted
pub const SETTINGS_RW: GattChar = GattChar {
    handle: 0x002a,
    uuid: "10020003-2749-0001-0000-00805f9b042f",
    name: "settings",
};

/// Room and set-point temperature, encrypted
pub const TEMPERATURE_RW: GattChar = GattChar {
    handle: 0x002d,
    uuid: "10020005-2749-0001-0000-00805f9b042f",
    name: "temperature",
};

/// Device name, encrypted, 16 bytes zero-padded
pub const DEVICE_NAME_RW: GattChar = GattChar {
    handle: 0x0030,
    uuid: "10020006-2749-0001-0000-00805f9b042f",
    name: "device-name",
};

/// Valve clock, encrypted
pub const TIME_RW: GattChar = GattChar {
    handle: 0x0036,
    uuid: "10020008-2749-0001-0000-00805f9b042f",
    name: "time",
};

/// Secret key, plaintext, readable only in pairing mode
pub const SECRET_R: GattChar = GattChar {
    handle: 0x003f,
    uuid: "1002000b-2749-0001-0000-00805f9b042f",
    name: "secret",
};

/// Weekly schedule, encrypted, split over three characteristics
pub const SCHEDULE_RW: [GattChar; 3] = [
    GattChar {
        handle: 0x0045,
        uuid: "1002000d-2749-0001-0000-00805f9b042f",
        name: "schedule-1",
    },
    GattChar {
        handle: 0x0048,
        uuid: "1002000e-2749-0001-0000-00805f9b042f",
        name: "schedule-2",
    },
    GattChar {
        handle: 0x004b,
        uuid: "1002000f-2749-0001-0000-00805f9b042f",
        name: "schedule-3",
    },
];

/// All characteristics, for handle/UUID lookup
pub const ALL_CHARACTERISTICS: [GattChar; 10] = [
    BATTERY_LEVEL_R,
    PIN_W,
    SETTINGS_RW,
    TEMPERATURE_RW,
    DEVICE_NAME_RW,
    TIME_RW,
    SECRET_R,
    SCHEDULE_RW[0],
    SCHEDULE_RW[1],
    SCHEDULE_RW[2],
];

/// Look up a characteristic by its attribute handle
pub fn characteristic_by_handle(handle: u16) -> Option<&'static GattChar> {
    ALL_CHARACTERISTICS.iter().find(|c| c.handle == handle)
}
