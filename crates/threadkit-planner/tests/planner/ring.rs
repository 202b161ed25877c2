use proptest::prelude::*;
use threadkit_core::{Angle, HalfLine, Point};
use threadkit_planner::Ring;

proptest! {
    #[test]
    fn prop_point_angle_round_trip(deg in -720.0f64..720.0, cx in -50.0f64..50.0, cy in -50.0f64..50.0) {
        let ring = Ring::new(Point::new(cx, cy, 0.0), 93.0, Angle::ZERO);
        let angle = Angle::from_degrees(deg);
        let back = ring.point_to_angle(&ring.angle_to_point(angle));
        prop_assert!(back.diff(angle.normalized()).abs().degrees() < 1e-9);
    }

    #[test]
    fn prop_delta_puts_ring_on_path(start in 0.0f64..360.0, dir in 0.0f64..360.0) {
        let mut ring = Ring::new(Point::new(0.0, 0.0, 0.0), 93.0, Angle::from_degrees(start));
        let path = HalfLine::from_angle(Point::new(20.0, -10.0, 0.0), Angle::from_degrees(dir));
        let delta = ring.delta_for_path(&path, Angle::ZERO).unwrap();
        prop_assert!(delta.abs().degrees() <= 180.0 + 1e-9);
        ring.rotate_by(delta);
        prop_assert!(path.contains(&ring.point()));
    }
}
