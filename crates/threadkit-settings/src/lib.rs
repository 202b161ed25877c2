//! threadkit settings crate
//!
//! Ring geometry and drive, bed layout and planner tuning, persisted as
//! JSON or TOML.

pub mod config;
pub mod error;

pub use config::{BedSettings, CollisionAvoid, Config, GeneralSettings, RingDrive, RingSettings};
pub use error::{Result, SettingsError};
