//! Print layers and their toolpath geometry

use serde::{Deserialize, Serialize};
use threadkit_core::{ConfigurationError, Error, GcodeError, Point, Result, Segment};
use tracing::debug;

use crate::gcode::{GcodeLine, SlicerFlavor};

/// One layer of the print
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Layer {
    /// Zero-based layer index
    pub number: usize,
    /// Nominal Z of the layer
    pub z: f64,
    /// Layer thickness
    pub height: f64,
    /// Lines in source order
    pub lines: Vec<GcodeLine>,
}

/// Geometry extracted from a layer.
///
/// Line numbers refer back into [`Layer::lines`].
#[derive(Debug, Clone, Default)]
pub struct LayerGeometry {
    /// Lines before the travel move leading to the first extrusion
    pub preamble: Vec<u32>,
    /// One segment per extruding XY move
    pub segments: Vec<Segment>,
    /// Lines after the last extrusion
    pub postamble: Vec<u32>,
    /// Head position after the layer
    pub end_position: Option<Point>,
}

impl Layer {
    /// Build a layer from its lines, reading Z and height from slicer
    /// comments or from the first Z move.
    pub fn from_lines(
        number: usize,
        lines: Vec<GcodeLine>,
        flavor: SlicerFlavor,
        prev_z: Option<f64>,
    ) -> std::result::Result<Self, GcodeError> {
        let comment_value = |prefix: &str| {
            lines.iter().find_map(|l| {
                if l.code.is_some() {
                    return None;
                }
                l.comment_text()?.strip_prefix(prefix)?.trim().parse::<f64>().ok()
            })
        };

        let (z, height) = match flavor {
            SlicerFlavor::Prusa => (comment_value("Z:"), comment_value("HEIGHT:")),
            _ => (None, None),
        };
        let z = z
            .or_else(|| lines.iter().filter(|l| l.is_move()).find_map(|l| l.arg('Z')))
            .or(prev_z)
            .ok_or_else(|| GcodeError::InvalidLayer {
                layer: number,
                reason: "no Z height".to_string(),
            })?;
        let height = height.unwrap_or_else(|| z - prev_z.unwrap_or(0.0));

        Ok(Self {
            number,
            z,
            height,
            lines,
        })
    }

    /// Line by source line number
    pub fn line(&self, line_number: u32) -> Option<&GcodeLine> {
        self.lines
            .binary_search_by_key(&Some(line_number), |l| l.line_number)
            .ok()
            .map(|idx| &self.lines[idx])
    }

    /// True if anything is printed in this layer
    pub fn has_extrusion(&self) -> bool {
        self.lines.iter().any(GcodeLine::is_xyextrude)
    }

    /// Bounding rectangle of all XY moves as (min, max) corners
    pub fn extents(&self) -> Option<(Point, Point)> {
        let mut bounds: Option<(Point, Point)> = None;
        for line in self.lines.iter().filter(|l| l.is_xymove()) {
            let (Some(x), Some(y)) = (line.arg('X'), line.arg('Y')) else {
                continue;
            };
            bounds = Some(match bounds {
                None => (Point::new(x, y, self.z), Point::new(x, y, self.z)),
                Some((lo, hi)) => (
                    Point::new(lo.x.min(x), lo.y.min(y), self.z),
                    Point::new(hi.x.max(x), hi.y.max(y), self.z),
                ),
            });
        }
        bounds
    }

    /// Extract segments with provenance.
    ///
    /// `start` is the head position carried over from the previous layer,
    /// needed only when the first extrusion is not preceded by a travel move.
    pub fn geometry(&self, start: Option<Point>) -> Result<LayerGeometry> {
        let numbered = |l: &GcodeLine| l.line_number;
        let start = start.map(|p| p.set_z(self.z));

        let Some(first_extrude) = self.lines.iter().position(GcodeLine::is_xyextrude) else {
            let end_position = self
                .lines
                .iter()
                .filter(|l| l.is_xymove())
                .try_fold(start, |pos, l| self.next_position(pos, l).map(Some))?;
            return Ok(LayerGeometry {
                preamble: self.lines.iter().filter_map(numbered).collect(),
                end_position,
                ..LayerGeometry::default()
            });
        };

        let body_start = self.lines[..first_extrude]
            .iter()
            .rposition(GcodeLine::is_xymove)
            .unwrap_or(first_extrude);

        let mut pos = start;
        for line in self.lines[..body_start].iter().filter(|l| l.is_xymove()) {
            pos = Some(self.next_position(pos, line)?);
        }

        let mut segments = Vec::new();
        let mut pending: Vec<u32> = Vec::new();
        for line in &self.lines[body_start..] {
            let Some(n) = line.line_number else {
                continue;
            };
            pending.push(n);
            if !line.is_xymove() {
                continue;
            }
            let next = self.next_position(pos, line)?;
            if line.is_xyextrude() {
                let from = pos.ok_or_else(|| position_unknown(line))?;
                if !from.xy_eq(&next) {
                    let seg = Segment::new(from, next)?
                        .with_extrusion(line.relative_extrude.unwrap_or(0.0))
                        .with_source_lines(std::mem::take(&mut pending));
                    segments.push(seg);
                }
            }
            pos = Some(next);
        }

        debug!(
            "Layer {}: {} segments, {} preamble, {} postamble lines",
            self.number,
            segments.len(),
            body_start,
            pending.len()
        );
        Ok(LayerGeometry {
            preamble: self.lines[..body_start].iter().filter_map(numbered).collect(),
            segments,
            postamble: pending,
            end_position: pos,
        })
    }

    fn next_position(&self, pos: Option<Point>, line: &GcodeLine) -> Result<Point> {
        let (x, y) = match (line.arg('X'), line.arg('Y'), pos) {
            (Some(x), Some(y), _) => (x, y),
            (Some(x), None, Some(p)) => (x, p.y),
            (None, Some(y), Some(p)) => (p.x, y),
            _ => return Err(position_unknown(line)),
        };
        let mut point = Point::new(x, y, self.z);
        if let Some(n) = line.line_number {
            point = point.with_line(n);
        }
        Ok(point)
    }
}

fn position_unknown(line: &GcodeLine) -> Error {
    ConfigurationError::PositionUnknown {
        line: line.construct(),
    }
    .into()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::gcode::GcodeFile;

    fn layer(text: &str) -> Layer {
        let file = GcodeFile::parse(text).unwrap();
        file.layers.into_iter().next().unwrap()
    }

    #[test]
    fn test_geometry_with_travel() {
        let l = layer(
            "\
;LAYER:0
G0 Z0.2
M106 S255
G0 X0 Y0
;TYPE:WALL
G1 X10 Y0 E1
G1 X10 Y10 E2
G0 X20 Y20
G1 X30 Y20 E3
M107",
        );
        let geom = l.geometry(None).unwrap();
        assert_eq!(geom.preamble, vec![1, 2, 3]);
        assert_eq!(geom.segments.len(), 3);
        assert_eq!(geom.segments[0].source_lines, vec![4, 5, 6]);
        assert_eq!(geom.segments[1].source_lines, vec![7]);
        assert_eq!(geom.segments[2].source_lines, vec![8, 9]);
        assert_eq!(*geom.segments[2].start(), Point::new(20.0, 20.0, 0.2));
        assert_eq!(geom.segments[2].extrude_amount, 1.0);
        assert_eq!(geom.postamble, vec![10]);
        assert_eq!(geom.end_position, Some(Point::new(30.0, 20.0, 0.2)));
    }

    #[test]
    fn test_geometry_needs_start_without_travel() {
        let l = layer(
            "\
;LAYER:0
G1 Z0.2
G1 X10 Y0 E1",
        );
        assert!(l
            .geometry(None)
            .unwrap_err()
            .is_configuration_error());
        let geom = l.geometry(Some(Point::new(0.0, 0.0, 0.0))).unwrap();
        assert_eq!(*geom.segments[0].start(), Point::new(0.0, 0.0, 0.2));
    }

    #[test]
    fn test_extents_and_line_lookup() {
        let l = layer(
            "\
;LAYER:0
G0 X-5 Y2 Z0.3
G1 X10 Y-3 E1",
        );
        let (lo, hi) = l.extents().unwrap();
        assert_eq!((lo.x, lo.y, hi.x, hi.y), (-5.0, -3.0, 10.0, 2.0));
        assert_eq!(l.line(3).unwrap().arg('X'), Some(10.0));
        assert!(l.line(99).is_none());
    }
}
