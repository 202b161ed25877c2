//! Printer and bed state machine
//!
//! The printer state is a plain value: head position, extrusion totals,
//! ring, anchor and thread path. [`Printer::transition`] maps a state and a
//! gcode line to the next state plus the lines to emit in its place, which
//! may differ from the input when extrusion totals are renumbered, a modal
//! feedrate has to be restored, or the ring must move with the bed.

use serde::{Deserialize, Serialize};
use threadkit_core::{
    Angle, ConfigurationError, HalfLine, PlanningError, Point, Result, EPSILON,
};
use threadkit_gcode::{ExtrusionMode, GcodeLine};
use threadkit_settings::{CollisionAvoid, Config, RingDrive, RingSettings};
use tracing::{debug, trace, warn};

use crate::kinematics::{kinematics_for, RingKinematics, PRINT_TOOL};
use crate::ring::Ring;

/// Print head position; `None` until set by a move or home
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct Head {
    /// X position
    pub x: Option<f64>,
    /// Y position
    pub y: Option<f64>,
    /// Z position
    pub z: Option<f64>,
}

impl Head {
    fn homed() -> Self {
        Self {
            x: Some(0.0),
            y: Some(0.0),
            z: Some(0.0),
        }
    }

    /// XY position if both are known
    pub fn xy(&self) -> Option<Point> {
        Some(Point::new(self.x?, self.y?, self.z.unwrap_or(0.0)))
    }
}

/// Complete machine and thread state
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Printer {
    /// Head position
    pub head: Head,
    /// Running absolute E total of the print tool
    pub e_position: f64,
    /// Current extrusion mode
    pub extrusion_mode: ExtrusionMode,
    /// Selected tool
    pub tool: u8,
    /// Modal feedrate
    pub feedrate: Option<f64>,
    /// The thread carrier
    pub ring: Ring,
    /// Where the thread is fixed
    pub anchor: Point,
    /// From the anchor towards the ring
    pub thread_path: HalfLine,
    ring_settings: RingSettings,
    moves_y: bool,
}

impl Printer {
    /// Fresh state: ring at its home angle, thread tied to the bed anchor
    /// and leaving it at the configured initial angle.
    pub fn new(config: &Config) -> Self {
        let anchor = config.bed.anchor_point();
        let thread_path = HalfLine::from_angle(
            anchor,
            Angle::from_degrees(config.general.initial_thread_angle),
        );
        Self {
            head: Head::default(),
            e_position: 0.0,
            extrusion_mode: ExtrusionMode::default(),
            tool: PRINT_TOOL,
            feedrate: None,
            ring: Ring::from_settings(&config.ring),
            anchor,
            thread_path,
            ring_settings: config.ring.clone(),
            moves_y: config.bed.moves_y,
        }
    }

    /// Ring drive adapter
    pub fn kinematics(&self) -> &'static dyn RingKinematics {
        kinematics_for(self.ring_settings.drive)
    }

    /// Ring drive
    pub fn drive(&self) -> RingDrive {
        self.ring_settings.drive
    }

    /// Smallest ring rotation worth emitting
    pub fn min_move(&self) -> Angle {
        self.ring_settings.min_move()
    }

    /// Head XY position, if known
    pub fn head_xy(&self) -> Option<Point> {
        self.head.xy()
    }

    /// Firmware setup followed by the move that brings the ring from home
    /// onto the initial thread path.
    pub fn setup_lines(&mut self) -> Result<Vec<GcodeLine>> {
        let mut lines = self.kinematics().setup_lines(&self.ring, &self.ring_settings);
        lines.extend(self.align_ring()?);
        Ok(lines)
    }

    /// Next state after `line`, and the lines to emit for it
    pub fn transition(&self, line: &GcodeLine) -> Result<(Printer, Vec<GcodeLine>)> {
        let mut next = self.clone();
        let lines = next.apply(line)?;
        Ok((next, lines))
    }

    /// Run `line` through the state machine. On error the state is unchanged.
    pub fn execute(&mut self, line: &GcodeLine) -> Result<Vec<GcodeLine>> {
        let (next, lines) = self.transition(line)?;
        *self = next;
        Ok(lines)
    }

    /// Run several lines in order
    pub fn execute_all<'a, I>(&mut self, lines: I) -> Result<Vec<GcodeLine>>
    where
        I: IntoIterator<Item = &'a GcodeLine>,
    {
        let mut out = Vec::new();
        for line in lines {
            out.extend(self.execute(line)?);
        }
        Ok(out)
    }

    fn apply(&mut self, line: &GcodeLine) -> Result<Vec<GcodeLine>> {
        let Some(code) = line.code.as_deref() else {
            return Ok(vec![line.clone()]);
        };
        match code {
            "G28" => {
                self.head = Head::homed();
                if self.moves_y {
                    self.ring.set_bed_y(0.0);
                }
                Ok(vec![self.kinematics().home_line(line)])
            }
            "G92" => {
                self.set_axes(line);
                if let Some(e) = line.arg('E') {
                    self.e_position = e;
                }
                Ok(vec![line.clone()])
            }
            "M82" => {
                self.extrusion_mode = ExtrusionMode::Absolute;
                Ok(vec![line.clone()])
            }
            "M83" => {
                self.extrusion_mode = ExtrusionMode::Relative;
                Ok(vec![line.clone()])
            }
            "G0" | "G1" => self.apply_move(line),
            tool if tool.starts_with('T') => {
                if let Ok(n) = tool[1..].parse::<u8>() {
                    self.tool = n;
                }
                Ok(vec![line.clone()])
            }
            _ => Ok(vec![line.clone()]),
        }
    }

    fn apply_move(&mut self, line: &GcodeLine) -> Result<Vec<GcodeLine>> {
        let mut line = line.clone();
        let mut out = Vec::new();

        match line.arg('F') {
            Some(f) => self.feedrate = Some(f),
            None => {
                // reordering may have changed the modal feedrate
                if let Some(f) = line.feedrate {
                    if self.feedrate.map_or(true, |cur| (cur - f).abs() > EPSILON) {
                        line = line.with_arg('F', f);
                        self.feedrate = Some(f);
                    }
                }
            }
        }

        if let (Some(e), true) = (line.arg('E'), self.tool == PRINT_TOOL) {
            if line.is_xyextrude() && self.head_xy().is_none() {
                return Err(ConfigurationError::PositionUnknown {
                    line: line.construct(),
                }
                .into());
            }
            let relative = line.relative_extrude.unwrap_or(match self.extrusion_mode {
                ExtrusionMode::Absolute => e - self.e_position,
                ExtrusionMode::Relative => e,
            });
            self.e_position += relative;
            let emitted = match self.extrusion_mode {
                ExtrusionMode::Absolute => self.e_position,
                ExtrusionMode::Relative => relative,
            };
            if (emitted - e).abs() > 1e-9 {
                line = line.with_arg('E', emitted);
            }
        }

        if let Some(x) = line.arg('X') {
            let rules: Vec<CollisionAvoid> = self
                .ring_settings
                .collision_avoid
                .iter()
                .filter(|r| self.collides(r, x))
                .cloned()
                .collect();
            for rule in rules {
                let target = Angle::from_degrees(rule.move_ring_to);
                let delta = self.ring.angle().diff(target);
                debug!("Avoid head collision at X{} by moving ring to {}", x, target);
                out.extend(self.ring_move(delta)?);
            }
        }

        if let Some(y) = line.arg('Y') {
            let moved = self.head.y.map_or(true, |cur| (cur - y).abs() > EPSILON);
            if self.moves_y && moved {
                self.ring.set_bed_y(y);
                line = self.sync_ring(line, &mut out)?;
            }
        }

        self.set_axes(&line);
        out.push(line);
        Ok(out)
    }

    fn set_axes(&mut self, line: &GcodeLine) {
        if let Some(x) = line.arg('X') {
            self.head.x = Some(x);
        }
        if let Some(y) = line.arg('Y') {
            self.head.y = Some(y);
        }
        if let Some(z) = line.arg('Z') {
            self.head.z = Some(z);
        }
    }

    fn collides(&self, rule: &CollisionAvoid, x: f64) -> bool {
        let ring = self.ring.angle().degrees();
        rule.head_between[0] <= x
            && x <= rule.head_between[1]
            && rule.ring_between[0] <= ring
            && ring <= rule.ring_between[1]
    }

    /// Keep the thread on its path while the bed moves under the ring.
    /// Either attaches the ring motion to `line` or queues separate ring
    /// commands in `out`.
    fn sync_ring(&mut self, line: GcodeLine, out: &mut Vec<GcodeLine>) -> Result<GcodeLine> {
        let Some(delta) = self.ring.delta_for_path(&self.thread_path, self.min_move()) else {
            warn!("No ring intersection for thread {}", self.thread_path);
            return Ok(line);
        };
        if delta == Angle::ZERO {
            return Ok(line);
        }
        if !self.kinematics().follows_bed() {
            trace!("Ring cannot follow bed; thread drifts by {}", delta);
            return Ok(line);
        }
        match self.kinematics().sync_arg(&self.ring.rotated(delta)) {
            Some((letter, value)) => {
                self.ring.rotate_by(delta);
                trace!("Ring follows bed by {}", delta);
                Ok(line.with_arg(letter, value))
            }
            None => {
                out.extend(self.ring_move(delta)?);
                Ok(line)
            }
        }
    }

    /// Rotate the ring by `delta` and return the commands that do it.
    ///
    /// Tool and extrusion mode changed by the ring move are put back
    /// afterwards, re-establishing the E position when returning to
    /// absolute extrusion.
    pub fn ring_move(&mut self, delta: Angle) -> Result<Vec<GcodeLine>> {
        if delta == Angle::ZERO {
            return Ok(Vec::new());
        }
        self.ring.rotate_by(delta);
        let saved_tool = self.tool;
        let saved_mode = self.extrusion_mode;

        let mut out = Vec::new();
        for line in self
            .kinematics()
            .ring_move(&self.ring, delta, &self.ring_settings)?
        {
            out.extend(self.apply(&line)?);
        }
        if self.tool != saved_tool {
            let restore = GcodeLine::synthetic(&format!("T{}", saved_tool), &[], None);
            out.extend(self.apply(&restore)?);
        }
        if self.extrusion_mode != saved_mode {
            let code = match saved_mode {
                ExtrusionMode::Absolute => "M82",
                ExtrusionMode::Relative => "M83",
            };
            out.extend(self.apply(&GcodeLine::synthetic(code, &[], None))?);
            if saved_mode == ExtrusionMode::Absolute {
                let reset = GcodeLine::synthetic("G92", &[('E', self.e_position)], None);
                out.extend(self.apply(&reset)?);
            }
        }
        Ok(out)
    }

    /// Turn the ring so the thread leaves along the current thread path
    pub fn align_ring(&mut self) -> Result<Vec<GcodeLine>> {
        let delta = self
            .ring
            .delta_for_path(&self.thread_path, self.min_move())
            .ok_or_else(|| PlanningError::RingUnreachable {
                path: self.thread_path.clone(),
            })?;
        self.ring_move(delta)
    }

    /// Set the thread path and move the ring onto it
    pub fn set_thread_path(&mut self, path: HalfLine) -> Result<Vec<GcodeLine>> {
        if self.ring.delta_for_path(&path, self.min_move()).is_none() {
            return Err(PlanningError::RingUnreachable { path }.into());
        }
        debug!("Thread path {} -> {}", self.thread_path, path);
        self.thread_path = path;
        self.align_ring()
    }

    /// Aim the thread from the current anchor through `target`
    pub fn rotate_thread_to(&mut self, target: Point) -> Result<Vec<GcodeLine>> {
        let path = HalfLine::new(self.anchor, target)?;
        self.set_thread_path(path)
    }

    /// Fix the thread at a new anchor, keeping its direction
    pub fn move_thread_to(&mut self, anchor: Point) -> Result<()> {
        self.thread_path = HalfLine::from_vector(anchor, *self.thread_path.vector())?;
        self.anchor = anchor;
        Ok(())
    }

    /// Adopt the anchor and thread path of `other`, moving the ring as needed
    pub fn follow(&mut self, other: &Printer) -> Result<Vec<GcodeLine>> {
        self.anchor = other.anchor;
        if self.thread_path == other.thread_path {
            self.thread_path = other.thread_path.clone();
            return Ok(Vec::new());
        }
        self.set_thread_path(other.thread_path.clone())
    }
}

impl std::fmt::Display for Printer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let fmt_axis = |v: Option<f64>| v.map_or("?".to_string(), |v| format!("{:.3}", v));
        write!(
            f,
            "Printer(head=({}, {}, {}), e={:.5}, thread={}, ring={})",
            fmt_axis(self.head.x),
            fmt_axis(self.head.y),
            fmt_axis(self.head.z),
            self.e_position,
            self.thread_path,
            self.ring.angle()
        )
    }
}
