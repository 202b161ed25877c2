use std::collections::BTreeMap;

use threadkit_core::geometry::utils::{angsort, visibility};
use threadkit_core::{HalfLine, Point, Segment, SegmentId};

fn p(x: f64, y: f64) -> Point {
    Point::new(x, y, 0.0)
}

#[test]
fn test_visibility_sorted_by_residual_size() {
    let segs = [
        Segment::new(p(10.0, -5.0), p(10.0, 5.0)).unwrap(),
        Segment::new(p(12.0, -5.0), p(12.0, 5.0)).unwrap(),
    ];
    let map: BTreeMap<SegmentId, &Segment> = segs.iter().enumerate().collect();
    let cands = visibility(&p(0.0, 0.0), &map, 0.5).unwrap();
    assert_eq!(cands.len(), 8);
    for pair in cands.windows(2) {
        assert!(pair[0].residual.len() <= pair[1].residual.len());
    }
    assert!(cands[0].residual.is_empty());
}

#[test]
fn test_visibility_skips_endpoints_near_origin() {
    let seg = Segment::new(p(0.5, 0.0), p(10.0, 0.0)).unwrap();
    let map: BTreeMap<SegmentId, &Segment> = [(7, &seg)].into_iter().collect();
    let cands = visibility(&p(0.0, 0.0), &map, 1.0).unwrap();
    // only the far endpoint produces tangents
    assert_eq!(cands.len(), 2);
}

#[test]
fn test_angsort_candidates() {
    let h = HalfLine::new(p(0.0, 0.0), p(1.0, 0.0)).unwrap();
    let sorted = angsort(&[p(0.0, 1.0), p(1.0, 0.1), p(-1.0, 0.0)], &h);
    assert_eq!(sorted, vec![p(1.0, 0.1), p(0.0, 1.0), p(-1.0, 0.0)]);
}
