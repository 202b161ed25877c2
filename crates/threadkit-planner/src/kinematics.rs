//! Ring kinematics adapters
//!
//! Translate "rotate the ring" into machine commands. The planner only deals
//! in angles; gearing and step conversion live here and in the firmware
//! setup lines.

use std::fmt;

use threadkit_core::{Angle, ConfigurationError, Result};
use threadkit_gcode::{GcodeArg, GcodeLine, GcodeParser};
use threadkit_settings::{RingDrive, RingSettings};

use crate::ring::Ring;

/// Tool number of the extruder that prints
pub const PRINT_TOOL: u8 = 0;

/// Tool number used to drive the ring on extruder-driven machines
pub const RING_TOOL: u8 = 1;

/// Machine-specific ring motion
pub trait RingKinematics: fmt::Debug + Send + Sync {
    /// Short name for logs
    fn name(&self) -> &'static str;

    /// Lines emitted once before printing starts
    fn setup_lines(&self, ring: &Ring, settings: &RingSettings) -> Vec<GcodeLine>;

    /// Rewrite a home command if the ring axis must not be homed
    fn home_line(&self, line: &GcodeLine) -> GcodeLine {
        line.clone()
    }

    /// Commands that rotate the ring by `delta`. `ring` is already at the
    /// new angle.
    fn ring_move(&self, ring: &Ring, delta: Angle, settings: &RingSettings)
        -> Result<Vec<GcodeLine>>;

    /// Argument to attach to a bed move so the ring turns with it, if the
    /// machine can move both at once
    fn sync_arg(&self, _ring: &Ring) -> Option<(char, f64)> {
        None
    }

    /// False if the ring cannot be turned while the bed moves
    fn follows_bed(&self) -> bool {
        true
    }
}

/// Ring on a dedicated `A` axis with absolute positioning
#[derive(Debug, Clone, Copy, Default)]
pub struct AxisRing;

impl AxisRing {
    fn axis_value(ring: &Ring) -> f64 {
        ring.position() * ring.rotation_multiplier()
    }
}

impl RingKinematics for AxisRing {
    fn name(&self) -> &'static str {
        "axis"
    }

    fn setup_lines(&self, ring: &Ring, settings: &RingSettings) -> Vec<GcodeLine> {
        vec![
            GcodeLine::synthetic(
                "G92",
                &[('A', Self::axis_value(ring))],
                Some(" Ring assumed manually homed"),
            ),
            GcodeLine::synthetic(
                "M92",
                &[('A', settings.steps_per_degree())],
                Some(" Ring steps per degree"),
            ),
        ]
    }

    fn home_line(&self, line: &GcodeLine) -> GcodeLine {
        // a bare G28 would try to home A
        if line.args.is_empty() {
            line.with_flag('X').with_flag('Y').with_flag('Z')
        } else {
            line.clone()
        }
    }

    fn ring_move(
        &self,
        ring: &Ring,
        _delta: Angle,
        settings: &RingSettings,
    ) -> Result<Vec<GcodeLine>> {
        let comment = format!(" Ring to {}", ring.angle());
        Ok(vec![GcodeLine::synthetic(
            "G0",
            &[('A', Self::axis_value(ring)), ('F', settings.feedrate)],
            Some(&comment),
        )])
    }

    fn sync_arg(&self, ring: &Ring) -> Option<(char, f64)> {
        Some(('A', Self::axis_value(ring)))
    }
}

/// Ring driven by a second extruder in relative mode.
///
/// The moves leave tool 1 selected in relative extrusion mode; the caller
/// puts the print tool back.
#[derive(Debug, Clone, Copy, Default)]
pub struct ExtruderRing;

impl RingKinematics for ExtruderRing {
    fn name(&self) -> &'static str {
        "extruder"
    }

    fn setup_lines(&self, _ring: &Ring, settings: &RingSettings) -> Vec<GcodeLine> {
        vec![GcodeLine::synthetic(
            "M92",
            &[('T', f64::from(RING_TOOL)), ('E', settings.steps_per_degree())],
            Some(" Ring steps per degree"),
        )]
    }

    fn ring_move(
        &self,
        ring: &Ring,
        delta: Angle,
        settings: &RingSettings,
    ) -> Result<Vec<GcodeLine>> {
        let comment = format!(" Ring to {}", ring.angle());
        Ok(vec![
            GcodeLine::synthetic(&format!("T{}", RING_TOOL), &[], None),
            GcodeLine::synthetic("M83", &[], None),
            GcodeLine::synthetic(
                "G1",
                &[
                    ('E', delta.degrees() * ring.rotation_multiplier()),
                    ('F', settings.feedrate),
                ],
                Some(&comment),
            ),
        ])
    }
}

/// No ring motor: the print pauses and the operator moves the thread.
///
/// Shows where the thread goes with `M117`, then pauses with `M601`, or
/// with `pause_commands` when the firmware needs something else.
#[derive(Debug, Clone, Copy, Default)]
pub struct ManualRing;

impl ManualRing {
    fn pause_lines(settings: &RingSettings) -> Result<Vec<GcodeLine>> {
        if settings.pause_commands.is_empty() {
            return Ok(vec![GcodeLine::synthetic(
                "M601",
                &[],
                Some(" Pause for thread move"),
            )]);
        }
        let mut parser = GcodeParser::new();
        settings
            .pause_commands
            .iter()
            .map(|text| -> Result<GcodeLine> {
                let mut line = parser.parse(text, 0).map_err(|e| {
                    ConfigurationError::InvalidSetting {
                        key: "ring.pause_commands".to_string(),
                        reason: e.to_string(),
                    }
                })?;
                line.line_number = None;
                line.synthetic = true;
                Ok(line)
            })
            .collect()
    }
}

impl RingKinematics for ManualRing {
    fn name(&self) -> &'static str {
        "manual"
    }

    fn setup_lines(&self, _ring: &Ring, _settings: &RingSettings) -> Vec<GcodeLine> {
        Vec::new()
    }

    fn ring_move(
        &self,
        ring: &Ring,
        _delta: Angle,
        settings: &RingSettings,
    ) -> Result<Vec<GcodeLine>> {
        let mut message = GcodeLine::synthetic("M117", &[], None);
        message
            .args
            .push(GcodeArg::text(format!("Move thread to {}", ring.angle())));
        let mut lines = vec![message];
        lines.extend(Self::pause_lines(settings)?);
        Ok(lines)
    }

    fn follows_bed(&self) -> bool {
        false
    }
}

/// Adapter for the configured drive
pub fn kinematics_for(drive: RingDrive) -> &'static dyn RingKinematics {
    match drive {
        RingDrive::Axis => &AxisRing,
        RingDrive::Extruder => &ExtruderRing,
        RingDrive::Manual => &ManualRing,
    }
}
