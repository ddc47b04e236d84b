//! # etrv Protocol
//!
//! Wire-level pieces of the eTRV Bluetooth protocol: the GATT
//! characteristic table, the XXTEA payload cipher, and typed codecs for
//! every characteristic the valve exposes.

pub mod characteristics;
pub mod payload;
pub mod schedule;
pub mod xxtea;

// Re-exports
pub use characteristics::*;
pub use payload::*;
pub use schedule::*;
pub use xxtea::{decode_payload, encode_payload, SecretKey};
