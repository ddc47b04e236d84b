//! # etrv Device
//!
//! The BLE session layer: valve discovery, connection handling with PIN
//! authentication, and typed read/write access to every characteristic the
//! eTRV exposes. The transport is a trait so the session logic is testable
//! without a radio; [`BtleplugTransport`] is the production implementation.

pub mod scan;
pub mod session;
pub mod transport;

// Re-exports
pub use scan::*;
pub use session::*;
pub use transport::*;
