//! Layer router
//!
//! Plans every layer of a file against the thread route and renders the
//! result back to gcode.

use threadkit_core::{
    PlanningError, Point, PolyLine, Result, Segment, SegmentId, SegmentSet,
};
use threadkit_gcode::{GcodeFile, GcodeLine, Layer, LayerGeometry};
use threadkit_settings::Config;
use tracing::{debug, info};

use crate::avoid::AvoidancePlanner;
use crate::printer::Printer;
use crate::steps::Steps;
use crate::thread::{
    anchors, flatten_thread, geometry_snap, intersecting, intersecting_any, non_intersecting,
    split_at_anchors,
};

/// Plans and renders a threaded print
#[derive(Debug, Clone)]
pub struct Threader {
    config: Config,
    planner: AvoidancePlanner,
}

impl Threader {
    /// Threader for `config`, with the avoidance planner built from its
    /// general settings
    pub fn new(config: Config) -> Self {
        let planner = AvoidancePlanner::from_settings(&config.general);
        Self { config, planner }
    }

    /// Configuration the threader plans with
    pub fn config(&self) -> &Config {
        &self.config
    }

    /// Plan every layer of `file`. Each layer starts from the state the
    /// previous one left behind.
    pub fn route(&self, file: &GcodeFile, thread: &PolyLine) -> Result<Vec<Steps>> {
        let mut printer = Printer::new(&self.config);
        printer.align_ring()?;
        let mut start: Option<Point> = None;
        let mut layers = Vec::with_capacity(file.layers.len());

        for layer in &file.layers {
            let steps = self.route_layer(layer.clone(), start, printer, thread)?;
            start = steps.geometry().end_position;
            printer = steps.printer().clone();
            info!(
                "Layer {} at Z={:.3}: {} steps",
                steps.layer().number,
                steps.layer().z,
                steps.steps().iter().filter(|s| s.valid).count()
            );
            layers.push(steps);
        }
        Ok(layers)
    }

    /// Plan one layer.
    ///
    /// `start` is the head position after the previous layer, `printer` the
    /// planning state it ended in.
    pub fn route_layer(
        &self,
        layer: Layer,
        start: Option<Point>,
        mut printer: Printer,
        thread: &PolyLine,
    ) -> Result<Steps> {
        let pieces = flatten_thread(thread, layer.z, layer.height);
        if pieces.is_empty() || !layer.has_extrusion() {
            return self.route_unanchored(layer, start, printer);
        }

        let geometry = layer.geometry(start)?;
        printer.move_thread_to(printer.anchor.set_z(layer.z))?;
        let pieces = geometry_snap(&pieces, &geometry.segments)?;
        let anchor_points = anchors(&pieces);
        debug!(
            "Layer {}: {} thread pieces, anchors {:?}",
            layer.number,
            pieces.len(),
            anchor_points.iter().map(Point::to_string).collect::<Vec<_>>()
        );
        let segments = split_at_anchors(geometry.segments, &anchor_points)?;
        let geometry = LayerGeometry {
            segments,
            ..geometry
        };
        let mut steps = Steps::new(layer, geometry, printer);

        let clear = non_intersecting(&pieces, steps.segments());
        self.planner.avoid_and_print(&mut steps, clear, "")?;

        for (i, piece) in pieces.iter().enumerate() {
            if steps.unprinted().is_empty() {
                break;
            }
            let anchor = *piece.end();

            steps.run_step(format!("Move thread to overlap anchor at {}", anchor), |s| {
                let before = s.printer().thread_path.clone();
                if !s.printer().anchor.xy_eq(&anchor) {
                    s.printer_mut().rotate_thread_to(anchor)?;
                }
                if s.printer().thread_path == before {
                    s.mark_invalid()?;
                }
                Ok(())
            })?;

            let fixing: Vec<SegmentId> = steps
                .unprinted()
                .into_iter()
                .filter(|id| steps.segments()[*id].contains(&anchor))
                .collect();
            if fixing.is_empty() {
                return Err(PlanningError::NoAnchorSegment {
                    layer: steps.layer().number,
                    anchor,
                }
                .into());
            }
            steps.run_step(format!("Print {} segments to fix anchor", fixing.len()), |s| {
                s.add(fixing.iter().copied())?;
                s.printer_mut().move_thread_to(anchor)
            })?;

            let later = intersecting_any(&pieces[i + 1..], steps.segments());
            let unprinted = steps.unprinted();
            let to_print: SegmentSet = intersecting(piece, steps.segments())
                .into_iter()
                .filter(|id| unprinted.contains(id) && !later.contains(id))
                .collect();
            self.planner
                .avoid_and_print(&mut steps, to_print, &format!(" (piece {})", i))?;
        }

        let rest = steps.unprinted();
        self.planner.avoid_and_print(&mut steps, rest, " (remaining)")?;
        Ok(steps)
    }

    /// A layer the thread does not pass through: turn the thread clear of
    /// everything the layer draws, then print the layer as it is.
    fn route_unanchored(
        &self,
        layer: Layer,
        start: Option<Point>,
        printer: Printer,
    ) -> Result<Steps> {
        let extracted = layer.geometry(start)?;
        let geometry = LayerGeometry {
            preamble: Vec::new(),
            segments: Vec::new(),
            postamble: layer.lines.iter().filter_map(|l| l.line_number).collect(),
            end_position: extracted.end_position,
        };
        let edges = layer.extents().map(|(lo, hi)| extents_edges(lo, hi)).unwrap_or_default();
        let mut steps = Steps::new(layer, geometry, printer);

        if !edges.is_empty() {
            let planner = self.planner;
            steps.run_step("Avoid layer extents", |s| {
                let before = s.printer().thread_path.clone();
                planner.avoid_all(s.printer_mut(), &edges)?;
                if s.printer().thread_path == before {
                    s.mark_invalid()?;
                }
                Ok(())
            })?;
        }
        Ok(steps)
    }

    /// Whole output file: the file preamble, ring setup, each planned layer
    /// and the file postamble.
    pub fn render(&self, file: &GcodeFile, layers: &[Steps]) -> Result<String> {
        let mut machine = Printer::new(&self.config);
        let mut out = machine.execute_all(&file.preamble)?;
        out.extend(machine.setup_lines()?);
        for steps in layers {
            out.extend(steps.gcode(&mut machine)?);
        }
        out.extend(machine.execute_all(&file.postamble)?);

        let mut text = out
            .iter()
            .map(GcodeLine::construct)
            .collect::<Vec<_>>()
            .join("\n");
        text.push('\n');
        Ok(text)
    }
}

/// Edges of the rectangle spanned by `lo` and `hi`; a rectangle collapsed
/// to a line has one edge, one collapsed to a point has none.
fn extents_edges(lo: Point, hi: Point) -> Vec<Segment> {
    let mut corners: Vec<Point> = Vec::with_capacity(5);
    for c in [
        lo,
        Point::new(hi.x, lo.y, lo.z),
        hi,
        Point::new(lo.x, hi.y, lo.z),
    ] {
        if !corners.contains(&c) {
            corners.push(c);
        }
    }
    if corners.len() > 2 {
        corners.push(corners[0]);
    }
    corners
        .windows(2)
        .filter_map(|w| Segment::new(w[0], w[1]).ok())
        .collect()
}
