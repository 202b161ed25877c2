//! Connected chains of segments

use serde::{Deserialize, Serialize};

use super::{Point, Segment, EPSILON};
use crate::error::ConstructionError;

/// Sequence of connected segments, e.g. the thread route through a model.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct PolyLine {
    segments: Vec<Segment>,
}

impl PolyLine {
    /// Build from a list of points. Repeated consecutive points are skipped.
    ///
    /// With `monotonic_z`, any point lower than its predecessor is an error.
    pub fn from_points(points: &[Point], monotonic_z: bool) -> Result<Self, ConstructionError> {
        let mut segments = Vec::new();
        for (i, pair) in points.windows(2).enumerate() {
            if monotonic_z && pair[1].z < pair[0].z - EPSILON {
                return Err(ConstructionError::NonMonotonicZ { index: i + 1 });
            }
            if pair[0] == pair[1] {
                continue;
            }
            segments.push(Segment::new(pair[0], pair[1])?);
        }
        Ok(Self { segments })
    }

    /// Wrap existing segments
    pub fn from_segments(segments: Vec<Segment>) -> Self {
        Self { segments }
    }

    /// The segments
    pub fn segments(&self) -> &[Segment] {
        &self.segments
    }

    /// Consume into segments
    pub fn into_segments(self) -> Vec<Segment> {
        self.segments
    }

    /// Vertices in order
    pub fn points(&self) -> Vec<Point> {
        let mut points: Vec<Point> = self.segments.iter().map(|s| *s.start()).collect();
        if let Some(last) = self.segments.last() {
            points.push(*last.end());
        }
        points
    }

    /// Number of segments
    pub fn len(&self) -> usize {
        self.segments.len()
    }

    /// True if there are no segments
    pub fn is_empty(&self) -> bool {
        self.segments.is_empty()
    }

    /// Index of a segment with the same endpoints
    pub fn index(&self, segment: &Segment) -> Option<usize> {
        self.segments.iter().position(|s| s.same_geometry(segment))
    }

    /// Index of the first segment containing `point`
    pub fn find_segment(&self, point: &Point) -> Option<usize> {
        self.segments.iter().position(|s| s.contains(point))
    }

    /// Insert a segment at `index`
    pub fn insert(&mut self, index: usize, segment: Segment) {
        self.segments.insert(index, segment);
    }

    /// Remove the segment matching `segment`
    pub fn remove(&mut self, segment: &Segment) -> Result<Segment, ConstructionError> {
        let idx = self.require(segment)?;
        Ok(self.segments.remove(idx))
    }

    /// Replace `segment` with its pieces split at `locations`
    pub fn split(&mut self, segment: &Segment, locations: &[Point]) -> Result<usize, ConstructionError> {
        let idx = self.require(segment)?;
        let pieces = self.segments[idx].split(locations)?;
        let count = pieces.len();
        self.segments.splice(idx..=idx, pieces);
        Ok(count)
    }

    fn require(&self, segment: &Segment) -> Result<usize, ConstructionError> {
        self.index(segment)
            .ok_or_else(|| ConstructionError::SegmentNotFound {
                segment: segment.to_string(),
            })
    }
}

/// Merge consecutive collinear segments that join end to start.
pub fn combine_collinear(segments: &[Segment]) -> Vec<Segment> {
    let mut out: Vec<Segment> = Vec::with_capacity(segments.len());
    for seg in segments {
        if let Some(last) = out.last_mut() {
            if last.end() == seg.start() {
                let last_dir = last.start().vector_to(last.end());
                let seg_dir = seg.start().vector_to(seg.end());
                let cross = last_dir.cross(&seg_dir);
                if last_dir.dot(&seg_dir) > 0.0
                    && cross.norm() <= EPSILON * last_dir.norm() * seg_dir.norm()
                {
                    if let Ok(merged) = Segment::new(*last.start(), *seg.end()) {
                        let extrude = last.extrude_amount + seg.extrude_amount;
                        *last = merged.with_extrusion(extrude);
                        continue;
                    }
                }
            }
        }
        out.push(seg.clone());
    }
    out
}
