//! etrv subcommands

pub mod battery;
pub mod clock;
pub mod name;
pub mod pair;
pub mod registry;
pub mod scan;
pub mod schedule;
pub mod settings;
pub mod temp;

pub use battery::BatteryCommand;
pub use clock::ClockCommand;
pub use name::NameCommand;
pub use pair::PairCommand;
pub use registry::RegistryCommand;
pub use scan::ScanCommand;
pub use schedule::ScheduleCommand;
pub use settings::SettingsCommand;
pub use temp::TempCommand;
