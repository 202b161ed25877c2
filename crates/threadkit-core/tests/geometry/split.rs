use proptest::prelude::*;
use threadkit_core::{Point, Segment};

proptest! {
    #[test]
    fn prop_split_conserves_extrusion(
        x1 in -100.0f64..100.0, y1 in -100.0f64..100.0,
        x2 in -100.0f64..100.0, y2 in -100.0f64..100.0,
        e in 0.001f64..10.0, t in 0.01f64..0.99,
    ) {
        let start = Point::new(x1, y1, 0.2);
        let end = Point::new(x2, y2, 0.2);
        prop_assume!(start.distance(&end) > 0.1);
        let seg = Segment::new(start, end).unwrap().with_extrusion(e).with_source_lines(vec![3]);
        let loc = start.lerp(&end, t);

        let (a, b) = seg.split_at(&loc).unwrap();
        prop_assert!((a.extrude_amount + b.extrude_amount - e).abs() < 1e-9);
        prop_assert_eq!(*a.start(), start);
        prop_assert_eq!(*b.end(), end);
        prop_assert_eq!(*a.end(), loc);
        prop_assert_eq!(*b.start(), loc);
        prop_assert!(b.is_split());
    }
}

#[test]
fn test_split_proportional() {
    let seg = Segment::new(Point::new(0.0, 0.0, 0.0), Point::new(0.0, 4.0, 0.0))
        .unwrap()
        .with_extrusion(0.8);
    let pieces = seg
        .split(&[Point::new(0.0, 1.0, 0.0), Point::new(0.0, 3.0, 0.0)])
        .unwrap();
    let amounts: Vec<f64> = pieces.iter().map(|s| s.extrude_amount).collect();
    assert!((amounts[0] - 0.2).abs() < 1e-12);
    assert!((amounts[1] - 0.4).abs() < 1e-12);
    assert!((amounts[2] - 0.2).abs() < 1e-12);
}
