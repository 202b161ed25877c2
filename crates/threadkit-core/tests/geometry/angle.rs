use proptest::prelude::*;
use threadkit_core::Angle;

proptest! {
    #[test]
    fn prop_degrees_round_trip(r in -1.0e4f64..1.0e4) {
        let a = Angle::from_radians(r);
        let b = Angle::from_degrees(a.degrees());
        prop_assert!((a.degrees() - b.degrees()).abs() < 1e-9);
    }

    #[test]
    fn prop_normalized_in_range(r in -1.0e4f64..1.0e4) {
        let n = Angle::from_radians(r).normalized().radians();
        prop_assert!((0.0..std::f64::consts::TAU).contains(&n));
    }

    #[test]
    fn prop_diff_is_shortest(a in -720.0f64..720.0, b in -720.0f64..720.0) {
        let d = Angle::from_degrees(a).diff(Angle::from_degrees(b)).degrees();
        prop_assert!(d > -180.0 - 1e-9 && d <= 180.0 + 1e-9);
        let back = Angle::from_degrees(a + d).normalized().degrees();
        let target = Angle::from_degrees(b).normalized().degrees();
        let gap = (back - target).abs();
        prop_assert!(gap < 1e-6 || (gap - 360.0).abs() < 1e-6);
    }
}

#[test]
fn test_arithmetic_in_radians() {
    let a = Angle::from_degrees(90.0) + Angle::from_degrees(45.0);
    assert!((a.degrees() - 135.0).abs() < 1e-9);
    let b = Angle::from_degrees(90.0) * 2.0 - Angle::from_degrees(30.0);
    assert!((b.degrees() - 150.0).abs() < 1e-9);
    assert!(Angle::from_degrees(10.0) < Angle::from_degrees(20.0));
}
