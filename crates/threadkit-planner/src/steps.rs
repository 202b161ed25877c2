//! Step sequencing and gcode reconstruction
//!
//! A layer is planned as a list of [`Step`]s. Each step is opened with
//! [`Steps::begin_step`], collects segments and thread moves, and is either
//! committed (freezing a snapshot of the printer) or abandoned (restoring the
//! printer and releasing its segments).

use threadkit_core::{Result, Segment, SegmentId, SegmentSet, SequencingError};
use threadkit_gcode::{GcodeLine, Layer, LayerGeometry};
use tracing::{debug, trace};

use crate::printer::Printer;

/// One committed unit of planned work
#[derive(Debug, Clone)]
pub struct Step {
    /// Position in the layer's step list
    pub number: usize,
    /// Human readable description
    pub name: String,
    /// Segments printed by this step, in the order they were added
    pub segments: Vec<SegmentId>,
    /// False if the step turned out to do nothing; skipped when rendering
    pub valid: bool,
    /// Printer state when the step was committed
    pub state: Printer,
}

#[derive(Debug)]
struct OpenStep {
    name: String,
    segments: Vec<SegmentId>,
    valid: bool,
    begin: Printer,
}

/// The steps of one layer together with the state they act on
#[derive(Debug)]
pub struct Steps {
    layer: Layer,
    geometry: LayerGeometry,
    printer: Printer,
    steps: Vec<Step>,
    open: Option<OpenStep>,
}

impl Steps {
    /// Start planning `layer` from `printer`'s state
    pub fn new(layer: Layer, geometry: LayerGeometry, printer: Printer) -> Self {
        Self {
            layer,
            geometry,
            printer,
            steps: Vec::new(),
            open: None,
        }
    }

    /// The layer being planned
    pub fn layer(&self) -> &Layer {
        &self.layer
    }

    /// Layer geometry
    pub fn geometry(&self) -> &LayerGeometry {
        &self.geometry
    }

    /// Layer segments, indexed by [`SegmentId`]
    pub fn segments(&self) -> &[Segment] {
        &self.geometry.segments
    }

    /// Committed steps
    pub fn steps(&self) -> &[Step] {
        &self.steps
    }

    /// Live planning state
    pub fn printer(&self) -> &Printer {
        &self.printer
    }

    /// Live planning state, mutable
    pub fn printer_mut(&mut self) -> &mut Printer {
        &mut self.printer
    }

    /// Printer and segments borrowed together for the planner
    pub fn planning_parts(&mut self) -> (&mut Printer, &[Segment]) {
        (&mut self.printer, &self.geometry.segments)
    }

    /// Final planning state, handed to the next layer
    pub fn into_printer(self) -> Printer {
        self.printer
    }

    /// Ids of segments not yet printed
    pub fn unprinted(&self) -> SegmentSet {
        self.segments()
            .iter()
            .enumerate()
            .filter(|(_, s)| !s.printed)
            .map(|(id, _)| id)
            .collect()
    }

    /// True if a step is open
    pub fn is_open(&self) -> bool {
        self.open.is_some()
    }

    /// Open a new step
    pub fn begin_step(&mut self, name: impl Into<String>) -> Result<()> {
        if let Some(open) = &self.open {
            return Err(SequencingError::StepAlreadyOpen {
                name: open.name.clone(),
            }
            .into());
        }
        let name = name.into();
        trace!("Begin step {}: {}", self.steps.len(), name);
        self.open = Some(OpenStep {
            name,
            segments: Vec::new(),
            valid: true,
            begin: self.printer.clone(),
        });
        Ok(())
    }

    /// Add segments to the open step. Segments already printed are skipped.
    /// Returns how many were added.
    pub fn add<I>(&mut self, ids: I) -> Result<usize>
    where
        I: IntoIterator<Item = SegmentId>,
    {
        let open = self.open.as_mut().ok_or(SequencingError::NoOpenStep)?;
        let mut added = 0;
        for id in ids {
            let Some(seg) = self.geometry.segments.get_mut(id) else {
                continue;
            };
            if seg.printed {
                continue;
            }
            seg.printed = true;
            open.segments.push(id);
            added += 1;
        }
        Ok(added)
    }

    /// Mark the open step as a no-op
    pub fn mark_invalid(&mut self) -> Result<()> {
        let open = self.open.as_mut().ok_or(SequencingError::NoOpenStep)?;
        open.valid = false;
        Ok(())
    }

    /// Close the open step, freezing a copy of the printer state
    pub fn commit_step(&mut self) -> Result<&Step> {
        let open = self.open.take().ok_or(SequencingError::NoOpenStep)?;
        let step = Step {
            number: self.steps.len(),
            name: open.name,
            segments: open.segments,
            valid: open.valid,
            state: self.printer.clone(),
        };
        debug!(
            "Layer {} step {}: {} ({} segments{})",
            self.layer.number,
            step.number,
            step.name,
            step.segments.len(),
            if step.valid { "" } else { ", invalid" }
        );
        self.steps.push(step);
        Ok(&self.steps[self.steps.len() - 1])
    }

    /// Drop the open step, restoring the printer and unmarking its segments
    pub fn abandon_step(&mut self) -> Result<()> {
        let open = self.open.take().ok_or(SequencingError::NoOpenStep)?;
        for id in &open.segments {
            if let Some(seg) = self.geometry.segments.get_mut(*id) {
                seg.printed = false;
            }
        }
        self.printer = open.begin;
        debug!("Abandoned step '{}'", open.name);
        Ok(())
    }

    /// Run `f` inside a step: committed if it succeeds, abandoned if not
    pub fn run_step<T, F>(&mut self, name: impl Into<String>, f: F) -> Result<T>
    where
        F: FnOnce(&mut Steps) -> Result<T>,
    {
        self.begin_step(name)?;
        match f(self) {
            Ok(value) => {
                self.commit_step()?;
                Ok(value)
            }
            Err(e) => {
                self.abandon_step()?;
                Err(e)
            }
        }
    }

    fn layer_line(&self, line_number: u32, step: usize) -> Result<&GcodeLine> {
        self.layer.line(line_number).ok_or_else(|| {
            SequencingError::SequencingGap {
                line_number,
                step,
            }
            .into()
        })
    }

    /// Rebuild the layer's gcode, running every line through `machine`.
    ///
    /// `machine` carries the real machine state across layers; it is
    /// separate from the planning state held here.
    pub fn gcode(&self, machine: &mut Printer) -> Result<Vec<GcodeLine>> {
        let mut out = Vec::new();
        let number = self.layer.number;

        for n in &self.geometry.preamble {
            let line = self.layer_line(*n, 0)?;
            out.extend(machine.execute(line)?);
        }

        for step in self.steps.iter().filter(|s| s.valid) {
            out.push(GcodeLine::comment_line(format!(
                " Layer {} step {}: {}",
                number, step.number, step.name
            )));
            if !step.segments.is_empty() {
                out.extend(self.step_segments(step, machine)?);
            }
            out.extend(machine.follow(&step.state)?);
        }

        for n in &self.geometry.postamble {
            let line = self.layer_line(*n, self.steps.len())?;
            out.extend(machine.execute(line)?);
        }
        Ok(out)
    }

    fn step_segments(&self, step: &Step, machine: &mut Printer) -> Result<Vec<GcodeLine>> {
        let mut out = Vec::new();
        let mut segments: Vec<&Segment> = step
            .segments
            .iter()
            .filter_map(|id| self.segments().get(*id))
            .collect();
        segments.sort_by(|a, b| {
            let (la, sa) = a.order_key();
            let (lb, sb) = b.order_key();
            la.cmp(&lb).then(sa.total_cmp(&sb))
        });

        for seg in segments {
            let Some((drawing, travel)) = seg.source_lines.split_last() else {
                return Err(SequencingError::MissingProvenance {
                    segment: seg.to_string(),
                }
                .into());
            };
            for n in travel {
                let line = self.layer_line(*n, step.number)?;
                out.extend(machine.execute(line)?);
            }

            let at_start = machine.head_xy().is_some_and(|p| p.xy_eq(seg.start()));
            if !at_start {
                let comment = format!(" Bridge to line {}", drawing);
                let bridge = GcodeLine::synthetic(
                    "G0",
                    &[('X', seg.start().x), ('Y', seg.start().y)],
                    Some(&comment),
                );
                debug!("Layer {}: bridging to {} before line {}", self.layer.number, seg.start(), drawing);
                out.extend(machine.execute(&bridge)?);
            }

            let mut line = self.layer_line(*drawing, step.number)?.clone();
            if seg.is_split() {
                line = line.with_arg('X', seg.end().x).with_arg('Y', seg.end().y);
            }
            line.relative_extrude = Some(seg.extrude_amount);
            out.extend(machine.execute(&line)?);
        }
        Ok(out)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use threadkit_gcode::GcodeFile;
    use threadkit_settings::Config;

    const LAYER: &str = "\
;LAYER:0
G0 Z0.2
G0 X0 Y0
G1 X10 Y0 E1
G1 X10 Y10 E2
G1 X20 Y10 E3";

    fn config() -> Config {
        let mut config = Config::default();
        config.bed.moves_y = false;
        config
    }

    fn steps() -> Steps {
        let file = GcodeFile::parse(LAYER).unwrap();
        let layer = file.layers.into_iter().next().unwrap();
        let geometry = layer.geometry(None).unwrap();
        Steps::new(layer, geometry, Printer::new(&config()))
    }

    #[test]
    fn test_begin_twice_fails() {
        let mut s = steps();
        s.begin_step("one").unwrap();
        let err = s.begin_step("two").unwrap_err();
        assert!(err.is_sequencing_error());
    }

    #[test]
    fn test_add_skips_printed() {
        let mut s = steps();
        s.begin_step("a").unwrap();
        assert_eq!(s.add([0, 1]).unwrap(), 2);
        s.commit_step().unwrap();
        s.begin_step("b").unwrap();
        assert_eq!(s.add([1, 2]).unwrap(), 1);
        let step = s.commit_step().unwrap();
        assert_eq!(step.segments, vec![2]);
        assert!(s.unprinted().is_empty());
    }

    #[test]
    fn test_abandon_restores() {
        let mut s = steps();
        let anchor = s.printer().anchor;
        s.begin_step("a").unwrap();
        s.add([0]).unwrap();
        s.printer_mut().move_thread_to(anchor.moved([1.0, 0.0, 0.0].into())).unwrap();
        s.abandon_step().unwrap();
        assert_eq!(s.printer().anchor, anchor);
        assert!(!s.segments()[0].printed);
        assert!(s.steps().is_empty());
    }

    #[test]
    fn test_snapshot_is_frozen() {
        let mut s = steps();
        s.begin_step("a").unwrap();
        s.commit_step().unwrap();
        let before = s.steps()[0].state.anchor;
        let moved = before.moved([5.0, 0.0, 0.0].into());
        s.printer_mut().move_thread_to(moved).unwrap();
        assert_eq!(s.steps()[0].state.anchor, before);
    }

    #[test]
    fn test_run_step_abandons_on_error() {
        let mut s = steps();
        let result: Result<()> = s.run_step("fails", |s| {
            s.add([0])?;
            Err(threadkit_core::Error::other("boom"))
        });
        assert!(result.is_err());
        assert!(!s.is_open());
        assert!(!s.segments()[0].printed);
    }

    #[test]
    fn test_gcode_in_order_without_bridges() {
        let mut s = steps();
        s.begin_step("print").unwrap();
        s.add([2, 0, 1]).unwrap();
        s.commit_step().unwrap();
        let mut machine = Printer::new(&config());
        let out = s.gcode(&mut machine).unwrap();
        assert!(out.iter().all(|l| !(l.synthetic && l.is_move())));
        let text: Vec<String> = out.iter().map(|l| l.construct()).collect();
        let pos = |t: &str| text.iter().position(|l| l == t).unwrap();
        assert!(pos("G1 X10 Y0 E1") < pos("G1 X10 Y10 E2"));
        assert!(pos("G1 X10 Y10 E2") < pos("G1 X20 Y10 E3"));
    }

    #[test]
    fn test_invalid_steps_not_rendered() {
        let mut s = steps();
        s.begin_step("nothing").unwrap();
        s.mark_invalid().unwrap();
        s.commit_step().unwrap();
        let mut machine = Printer::new(&config());
        let out = s.gcode(&mut machine).unwrap();
        assert!(out.iter().all(|l| !l.comment_text().is_some_and(|c| c.contains("nothing"))));
        assert_eq!(s.steps().len(), 1);
    }
}
