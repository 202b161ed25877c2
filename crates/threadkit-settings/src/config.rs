//! Configuration for the ring, bed and planner.
//!
//! Loaded from JSON or TOML; the format is chosen by file extension.

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use threadkit_core::{Angle, Point};
use tracing::info;

use crate::error::{Result, SettingsError};

/// How the ring is driven
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RingDrive {
    /// Dedicated `A` axis
    #[default]
    Axis,
    /// Second extruder (tool 1) repurposed to turn the ring
    Extruder,
    /// No motor; the print pauses for the thread to be moved by hand
    Manual,
}

impl std::fmt::Display for RingDrive {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Axis => write!(f, "axis"),
            Self::Extruder => write!(f, "extruder"),
            Self::Manual => write!(f, "manual"),
        }
    }
}

/// Head X range in which the carrier must be parked out of the way
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CollisionAvoid {
    /// Head X range `[min, max]` that triggers the rule
    pub head_between: [f64; 2],
    /// Ring angle range `[min, max]` (degrees) that collides
    pub ring_between: [f64; 2],
    /// Ring angle (degrees) to park at
    pub move_ring_to: f64,
}

/// Ring settings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RingSettings {
    /// Ring center in bed coordinates at bed Y = 0
    pub center: [f64; 3],
    /// Radius in mm
    pub radius: f64,
    /// Angle (degrees) the ring is at after manual homing
    pub home_angle: f64,
    /// +1 or -1 depending on how the motor is mounted
    pub rotation_multiplier: f64,
    /// Feedrate for ring moves
    pub feedrate: f64,
    /// Teeth on the motor gear
    pub motor_gear_teeth: u32,
    /// Teeth on the ring gear
    pub ring_gear_teeth: u32,
    /// Microsteps per motor rotation
    pub stepper_microsteps_per_rotation: u32,
    /// How the ring is driven
    pub drive: RingDrive,
    /// Lines that pause the print for a manual thread move; `M601` if empty
    pub pause_commands: Vec<String>,
    /// Head/carrier collision rules
    pub collision_avoid: Vec<CollisionAvoid>,
}

impl Default for RingSettings {
    fn default() -> Self {
        Self {
            center: [110.0, 110.0, 0.0],
            radius: 93.0,
            home_angle: 0.0,
            rotation_multiplier: 1.0,
            feedrate: 5000.0,
            motor_gear_teeth: 30,
            ring_gear_teeth: 125,
            stepper_microsteps_per_rotation: 3200,
            drive: RingDrive::Axis,
            pause_commands: Vec::new(),
            collision_avoid: Vec::new(),
        }
    }
}

impl RingSettings {
    /// Ring center as a point
    pub fn center_point(&self) -> Point {
        Point::from(self.center)
    }

    /// Home angle
    pub fn home(&self) -> Angle {
        Angle::from_degrees(self.home_angle)
    }

    /// Motor microsteps per degree of ring rotation
    pub fn steps_per_degree(&self) -> f64 {
        f64::from(self.stepper_microsteps_per_rotation) * f64::from(self.ring_gear_teeth)
            / f64::from(self.motor_gear_teeth)
            / 360.0
    }

    /// Smallest ring move the hardware can make
    pub fn min_move(&self) -> Angle {
        Angle::from_degrees(1.0 / self.steps_per_degree())
    }
}

/// Bed settings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct BedSettings {
    /// Bed origin offset
    pub zero: [f64; 3],
    /// Bed width and depth
    pub size: [f64; 2],
    /// Where the thread is tied to the bed before printing
    pub anchor: [f64; 3],
    /// True for printers that move the bed in Y under a fixed ring
    pub moves_y: bool,
}

impl Default for BedSettings {
    fn default() -> Self {
        Self {
            zero: [0.0, 0.0, 0.0],
            size: [220.0, 220.0],
            anchor: [20.0, 110.0, 0.0],
            moves_y: true,
        }
    }
}

impl BedSettings {
    /// Thread anchor as a point
    pub fn anchor_point(&self) -> Point {
        Point::from(self.anchor)
    }
}

/// Planner settings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct GeneralSettings {
    /// Minimum clearance between the thread and segment endpoints (mm)
    pub avoid_by: f64,
    /// Bound on avoid/print rounds per call
    pub max_avoid_iterations: usize,
    /// Thread direction from the bed anchor at start (degrees)
    pub initial_thread_angle: f64,
}

impl Default for GeneralSettings {
    fn default() -> Self {
        Self {
            avoid_by: 1.0,
            max_avoid_iterations: 5,
            initial_thread_angle: 180.0,
        }
    }
}

/// Complete threadkit configuration
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Planner settings
    pub general: GeneralSettings,
    /// Ring settings
    pub ring: RingSettings,
    /// Bed settings
    pub bed: BedSettings,
}

enum Format {
    Json,
    Toml,
}

fn format_of(path: &Path) -> Result<Format> {
    match path.extension().and_then(|e| e.to_str()) {
        Some("json") => Ok(Format::Json),
        Some("toml") => Ok(Format::Toml),
        _ => Err(SettingsError::UnsupportedFormat(
            "Config file must be .json or .toml".to_string(),
        )),
    }
}

impl Config {
    /// Load config from file (JSON or TOML)
    pub fn load_from_file(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)?;
        let config: Self = match format_of(path)? {
            Format::Json => serde_json::from_str(&content)?,
            Format::Toml => toml::from_str(&content)?,
        };
        config.validate()?;
        info!("Loaded configuration from {}", path.display());
        Ok(config)
    }

    /// Save config to file (JSON or TOML)
    pub fn save_to_file(&self, path: &Path) -> Result<()> {
        self.validate()?;
        let content = match format_of(path)? {
            Format::Json => serde_json::to_string_pretty(self)?,
            Format::Toml => toml::to_string_pretty(self)?,
        };
        std::fs::write(path, content)?;
        Ok(())
    }

    /// Default location: `<config dir>/threadkit/config.toml`
    pub fn default_path() -> Result<PathBuf> {
        dirs::config_dir()
            .map(|d| d.join("threadkit").join("config.toml"))
            .ok_or_else(|| SettingsError::ConfigDirectory("no config directory".to_string()))
    }

    /// Validate configuration
    pub fn validate(&self) -> Result<()> {
        if self.ring.radius <= 0.0 {
            return Err(SettingsError::invalid("ring.radius", "must be > 0"));
        }
        if self.ring.rotation_multiplier.abs() != 1.0 {
            return Err(SettingsError::invalid(
                "ring.rotation_multiplier",
                "must be 1 or -1",
            ));
        }
        if self.ring.feedrate <= 0.0 {
            return Err(SettingsError::invalid("ring.feedrate", "must be > 0"));
        }
        if self.ring.motor_gear_teeth == 0
            || self.ring.ring_gear_teeth == 0
            || self.ring.stepper_microsteps_per_rotation == 0
        {
            return Err(SettingsError::invalid(
                "ring",
                "gear teeth and microsteps must be > 0",
            ));
        }
        if self.ring.pause_commands.iter().any(|c| c.trim().is_empty()) {
            return Err(SettingsError::invalid(
                "ring.pause_commands",
                "must not contain blank lines",
            ));
        }
        if self.bed.size.iter().any(|s| *s <= 0.0) {
            return Err(SettingsError::invalid("bed.size", "must be > 0"));
        }
        if self.general.avoid_by < 0.0 {
            return Err(SettingsError::invalid("general.avoid_by", "must be >= 0"));
        }
        if self.general.max_avoid_iterations == 0 {
            return Err(SettingsError::invalid(
                "general.max_avoid_iterations",
                "must be > 0",
            ));
        }
        let anchor = self.bed.anchor_point();
        if self.ring.center_point().distance_2d(&anchor) >= self.ring.radius {
            return Err(SettingsError::invalid(
                "bed.anchor",
                "must be inside the ring",
            ));
        }
        Ok(())
    }
}
