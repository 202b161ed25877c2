//! Toolpath segment with extrusion and provenance

use std::fmt;

use nalgebra::Vector3;
use serde::{Deserialize, Serialize};

use super::{intersection, Geometry, LineLike, Point, SegmentId, SegmentSet, EPSILON};
use crate::angle::Angle;
use crate::error::ConstructionError;

/// A straight toolpath segment.
///
/// `source_lines` lists the gcode line numbers needed to reproduce the move:
/// any travel or non-motion lines collected before it, followed by the line
/// that draws it. Pieces produced by [`Segment::split`] keep only the drawing
/// line, and `source_span` records which fraction of that line they cover.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Segment {
    start: Point,
    end: Point,
    /// Filament deposited along this segment (relative, mm of filament)
    pub extrude_amount: f64,
    /// Set once the segment has been scheduled for printing
    pub printed: bool,
    /// Source gcode line numbers, drawing line last
    pub source_lines: Vec<u32>,
    source_span: (f64, f64),
}

impl Segment {
    /// Create a segment; fails if the endpoints coincide
    pub fn new(start: Point, end: Point) -> Result<Self, ConstructionError> {
        if start == end {
            return Err(ConstructionError::DegenerateSegment { point: start });
        }
        Ok(Self {
            start,
            end,
            extrude_amount: 0.0,
            printed: false,
            source_lines: Vec::new(),
            source_span: (0.0, 1.0),
        })
    }

    /// Builder: set extrusion amount
    pub fn with_extrusion(mut self, amount: f64) -> Self {
        self.extrude_amount = amount;
        self
    }

    /// Builder: set source lines
    pub fn with_source_lines(mut self, lines: Vec<u32>) -> Self {
        self.source_lines = lines;
        self
    }

    /// Start point
    pub fn start(&self) -> &Point {
        &self.start
    }

    /// End point
    pub fn end(&self) -> &Point {
        &self.end
    }

    /// Whether material is deposited along this segment
    pub fn is_extrude(&self) -> bool {
        self.extrude_amount > 0.0
    }

    /// Length in 3D
    pub fn length(&self) -> f64 {
        self.start.distance(&self.end)
    }

    /// Direction angle in the XY plane
    pub fn angle(&self) -> Angle {
        Angle::atan2(self.end.y - self.start.y, self.end.x - self.start.x)
    }

    /// Line that draws this segment
    pub fn drawing_line(&self) -> Option<u32> {
        self.source_lines.last().copied()
    }

    /// Sort key reproducing original execution order
    pub fn order_key(&self) -> (u32, f64) {
        (
            self.source_lines.first().copied().unwrap_or(u32::MAX),
            self.source_span.0,
        )
    }

    /// True if this is a piece of a longer original move
    pub fn is_split(&self) -> bool {
        self.source_span != (0.0, 1.0)
    }

    /// Same endpoints as `other`
    pub fn same_geometry(&self, other: &Segment) -> bool {
        self.start == other.start && self.end == other.end
    }

    /// Copy with Z set on both endpoints
    pub fn set_z(&self, z: f64) -> Result<Segment, ConstructionError> {
        let mut seg = Segment::new(self.start.set_z(z), self.end.set_z(z))?;
        seg.copy_meta(self);
        Ok(seg)
    }

    /// Copy projected to Z = 0
    pub fn as2d(&self) -> Result<Segment, ConstructionError> {
        self.set_z(0.0)
    }

    /// Copy translated by `v`
    pub fn moved(&self, v: Vector3<f64>) -> Segment {
        let mut seg = self.clone();
        seg.start = self.start.moved(v);
        seg.end = self.end.moved(v);
        seg
    }

    /// Copy with new endpoints and the same extrusion density
    pub fn with_endpoints(&self, start: Point, end: Point) -> Result<Segment, ConstructionError> {
        let mut seg = Segment::new(start, end)?;
        seg.copy_meta(self);
        seg.extrude_amount = self.extrude_amount * seg.length() / self.length();
        Ok(seg)
    }

    fn copy_meta(&mut self, other: &Segment) {
        self.extrude_amount = other.extrude_amount;
        self.printed = other.printed;
        self.source_lines = other.source_lines.clone();
        self.source_span = other.source_span;
    }

    /// Point at fraction `t` of the way from start to end
    pub fn point_at(&self, t: f64) -> Point {
        self.start.lerp(&self.end, t)
    }

    /// Closest point on the segment to `point` (XY projection, clamped)
    pub fn closest_point(&self, point: &Point) -> Point {
        let t = self.project(point).clamp(0.0, 1.0);
        self.at(t)
    }

    /// Whether `point` lies on the segment
    pub fn contains(&self, point: &Point) -> bool {
        let t = self.project(point);
        self.in_range(t) && self.at(t).distance_2d(point) <= EPSILON
    }

    /// Intersection with another line-like primitive
    pub fn intersection<L: LineLike>(&self, other: &L) -> Option<Geometry> {
        intersection(self, other)
    }

    /// Ids of `others` this segment crosses or overlaps
    pub fn intersecting<'a, I>(&self, others: I) -> SegmentSet
    where
        I: IntoIterator<Item = (SegmentId, &'a Segment)>,
    {
        others
            .into_iter()
            .filter(|(_, other)| intersection(self, *other).is_some())
            .map(|(id, _)| id)
            .collect()
    }

    /// Split at a single point on the segment.
    ///
    /// Extrusion is divided in proportion to length. The second piece keeps
    /// only the drawing line as provenance.
    pub fn split_at(&self, location: &Point) -> Result<(Segment, Segment), ConstructionError> {
        if !self.contains(location) {
            return Err(ConstructionError::SplitOffSegment {
                location: *location,
                segment: self.to_string(),
            });
        }
        let frac = self.start.distance(location) / self.length();
        let split = self.start.lerp(&self.end, frac);

        let mut first = Segment::new(self.start, split)?;
        first.copy_meta(self);
        first.extrude_amount = self.extrude_amount * frac;

        let mut second = Segment::new(split, self.end)?;
        second.copy_meta(self);
        second.extrude_amount = self.extrude_amount - first.extrude_amount;
        second.source_lines = self.drawing_line().into_iter().collect();

        let (lo, hi) = self.source_span;
        let mid = lo + (hi - lo) * frac;
        first.source_span = (lo, mid);
        second.source_span = (mid, hi);

        Ok((first, second))
    }

    /// Split at several locations, returned in order from start to end.
    ///
    /// Locations coinciding with an endpoint or with each other are ignored.
    pub fn split(&self, locations: &[Point]) -> Result<Vec<Segment>, ConstructionError> {
        let mut locs: Vec<Point> = Vec::with_capacity(locations.len());
        for loc in locations {
            if !self.contains(loc) {
                return Err(ConstructionError::SplitOffSegment {
                    location: *loc,
                    segment: self.to_string(),
                });
            }
            if *loc != self.start && *loc != self.end && !locs.contains(loc) {
                locs.push(*loc);
            }
        }
        locs.sort_by(|a, b| {
            self.start
                .distance(a)
                .total_cmp(&self.start.distance(b))
        });

        let mut pieces = Vec::with_capacity(locs.len() + 1);
        let mut rest = self.clone();
        for loc in &locs {
            let (head, tail) = rest.split_at(loc)?;
            pieces.push(head);
            rest = tail;
        }
        pieces.push(rest);
        Ok(pieces)
    }
}

impl LineLike for Segment {
    fn origin(&self) -> Point {
        self.start
    }

    fn direction(&self) -> Vector3<f64> {
        self.start.vector_to(&self.end)
    }

    fn upper(&self) -> Option<f64> {
        Some(1.0)
    }
}

impl PartialEq for Segment {
    fn eq(&self, other: &Self) -> bool {
        self.same_geometry(other)
    }
}

impl fmt::Display for Segment {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}--{}", self.start, self.end)?;
        if let Some(line) = self.drawing_line() {
            write!(f, " @{}", line)?;
        }
        Ok(())
    }
}
