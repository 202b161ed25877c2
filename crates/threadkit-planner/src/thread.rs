//! Thread route operations for a single layer
//!
//! The thread is a 3D polyline through the model. For each layer the part
//! inside the layer's band is flattened onto the layer plane and snapped onto
//! the layer's toolpath, giving the pieces the layer router works with. The
//! end of each piece is an anchor: a point where printed plastic will hold
//! the thread down.

use threadkit_core::{
    combine_collinear, ConstructionError, Point, PolyLine, Segment, SegmentSet, EPSILON,
};
use tracing::trace;

/// The part of `thread` within `[z - height/2, z + height/2]`, flattened to
/// `z`, with vertical pieces dropped and collinear neighbours merged.
pub fn flatten_thread(thread: &PolyLine, z: f64, height: f64) -> Vec<Segment> {
    let lo = z - height / 2.0;
    let hi = z + height / 2.0;
    let mut pieces = Vec::new();

    for seg in thread.segments() {
        let (a, b) = (seg.start(), seg.end());
        if a.z.max(b.z) < lo - EPSILON || a.z.min(b.z) > hi + EPSILON {
            continue;
        }
        let (t0, t1) = if (b.z - a.z).abs() <= EPSILON {
            (0.0, 1.0)
        } else {
            let ta = (lo - a.z) / (b.z - a.z);
            let tb = (hi - a.z) / (b.z - a.z);
            (ta.min(tb).clamp(0.0, 1.0), ta.max(tb).clamp(0.0, 1.0))
        };
        let start = seg.point_at(t0).set_z(z);
        let end = seg.point_at(t1).set_z(z);
        if start.xy_eq(&end) {
            continue;
        }
        if let Ok(piece) = Segment::new(start, end) {
            pieces.push(piece);
        }
    }
    combine_collinear(&pieces)
}

/// Chain `pieces` end to start, snapping each end onto the closest point of
/// the closest layer segment. Pieces that collapse to a point are dropped.
pub fn geometry_snap(
    pieces: &[Segment],
    layer_segments: &[Segment],
) -> Result<Vec<Segment>, ConstructionError> {
    if layer_segments.is_empty() {
        return Ok(pieces.to_vec());
    }
    let snap = |p: &Point| -> Point {
        layer_segments
            .iter()
            .map(|s| s.closest_point(p))
            .min_by(|a, b| a.distance_2d(p).total_cmp(&b.distance_2d(p)))
            .map_or(*p, |c| c.set_z(p.z))
    };

    let mut out: Vec<Segment> = Vec::with_capacity(pieces.len());
    let mut prev_end: Option<Point> = None;
    for piece in pieces {
        let start = prev_end.unwrap_or_else(|| snap(piece.start()));
        let end = snap(piece.end());
        if start.xy_eq(&end) {
            trace!("Snapped piece {} collapsed at {}", piece, end);
            prev_end = Some(start);
            continue;
        }
        out.push(Segment::new(start, end)?);
        prev_end = Some(end);
    }
    Ok(out)
}

/// Anchor points: the end of each piece
pub fn anchors(pieces: &[Segment]) -> Vec<Point> {
    pieces.iter().map(|p| *p.end()).collect()
}

/// Ids of `segments` that `piece` crosses or overlaps
pub fn intersecting(piece: &Segment, segments: &[Segment]) -> SegmentSet {
    piece.intersecting(segments.iter().enumerate())
}

/// Ids of `segments` crossed by any of `pieces`
pub fn intersecting_any(pieces: &[Segment], segments: &[Segment]) -> SegmentSet {
    pieces
        .iter()
        .flat_map(|p| intersecting(p, segments))
        .collect()
}

/// Ids of `segments` none of `pieces` touch
pub fn non_intersecting(pieces: &[Segment], segments: &[Segment]) -> SegmentSet {
    let hit = intersecting_any(pieces, segments);
    (0..segments.len()).filter(|id| !hit.contains(id)).collect()
}

/// Split every segment holding more than one anchor midway between
/// consecutive anchors, so each anchor gets a segment of its own.
pub fn split_at_anchors(
    segments: Vec<Segment>,
    anchors: &[Point],
) -> Result<Vec<Segment>, ConstructionError> {
    let mut out = Vec::with_capacity(segments.len());
    for seg in segments {
        let mut held: Vec<Point> = Vec::new();
        for anchor in anchors.iter().filter(|a| seg.contains(a)) {
            if !held.contains(anchor) {
                held.push(*anchor);
            }
        }
        if held.len() < 2 {
            out.push(seg);
            continue;
        }
        held.sort_by(|a, b| {
            seg.start()
                .distance_2d(a)
                .total_cmp(&seg.start().distance_2d(b))
        });
        let mids: Vec<Point> = held
            .windows(2)
            .map(|w| seg.closest_point(&w[0].lerp(&w[1], 0.5)))
            .collect();
        trace!("Splitting {} between {} anchors", seg, held.len());
        out.extend(seg.split(&mids)?);
    }
    Ok(out)
}
