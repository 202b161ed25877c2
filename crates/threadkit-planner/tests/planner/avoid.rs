use proptest::prelude::*;
use threadkit_core::geometry::utils::too_close;
use threadkit_core::{HalfLine, Point, Segment, SegmentSet};
use threadkit_gcode::GcodeFile;
use threadkit_planner::{AvoidancePlanner, Printer, Steps};
use threadkit_settings::Config;

fn config(anchor: [f64; 3], center: [f64; 3], thread_angle: f64) -> Config {
    let mut config = Config::default();
    config.ring.center = center;
    config.bed.anchor = anchor;
    config.bed.moves_y = false;
    config.general.initial_thread_angle = thread_angle;
    config
}

const COLLINEAR: &str = "\
;LAYER:0
G0 Z0.2
G0 X0 Y10
G1 X10 Y10 E1
G1 X20 Y10 E2
G1 X30 Y10 E3";

fn collinear_steps(config: &Config) -> Steps {
    let file = GcodeFile::parse(COLLINEAR).unwrap();
    let layer = file.layers.into_iter().next().unwrap();
    let geometry = layer.geometry(None).unwrap();
    let mut printer = Printer::new(config);
    printer.align_ring().unwrap();
    Steps::new(layer, geometry, printer)
}

#[test]
fn test_collinear_middle_printed_last() {
    let config = config([15.0, 0.0, 0.0], [15.0, 0.0, 0.0], 90.0);
    let mut steps = collinear_steps(&config);
    assert_eq!(steps.segments().len(), 3);

    let planner = AvoidancePlanner::from_settings(&config.general);
    let rounds = planner
        .avoid_and_print(&mut steps, SegmentSet::from([0, 1, 2]), "")
        .unwrap();
    assert!(rounds <= 2);
    assert!(steps.unprinted().is_empty());

    let printing: Vec<&Vec<usize>> = steps
        .steps()
        .iter()
        .filter(|s| !s.segments.is_empty())
        .map(|s| &s.segments)
        .collect();
    assert_eq!(printing.last().unwrap().as_slice(), &[1]);
    assert!(printing[..printing.len() - 1].iter().all(|s| !s.contains(&1)));

    // the first avoid step did not need to move the thread
    assert!(!steps.steps()[0].valid);
    let middle = &steps.segments()[1];
    assert!(steps.printer().thread_path.intersection(middle).is_none());
}

#[test]
fn test_avoid_loop_bounded_by_max_iterations() {
    let mut config = config([15.0, 0.0, 0.0], [15.0, 0.0, 0.0], 90.0);
    config.general.max_avoid_iterations = 1;
    let mut steps = collinear_steps(&config);

    let planner = AvoidancePlanner::from_settings(&config.general);
    let err = planner
        .avoid_and_print(&mut steps, SegmentSet::from([0, 1, 2]), "")
        .unwrap_err();
    assert!(err.is_planning_error());
    let message = err.to_string();
    assert!(message.contains("did not converge after 1 iterations"));
    assert!(message.contains("anchor (15.000, 0.000, 0.000)"));
    assert!(message.contains("(10.000, 10.000, 0.200)--(20.000, 10.000, 0.200)"));

    // no step left open and the middle segment is still to print
    assert!(!steps.is_open());
    assert_eq!(steps.unprinted(), SegmentSet::from([1]));
    assert!(steps.steps().iter().all(|s| !s.segments.contains(&1)));
}

#[test]
fn test_single_segment_cleared_with_small_rotation() {
    let config = config([50.0, 0.0, 0.0], [0.0, 0.0, 0.0], 180.0);
    let mut printer = Printer::new(&config);
    printer.align_ring().unwrap();
    let segs = vec![Segment::new(Point::new(10.0, 0.0, 0.0), Point::new(10.0, 20.0, 0.0)).unwrap()];

    let residual = AvoidancePlanner::default()
        .thread_avoid(&mut printer, &segs, &SegmentSet::from([0]))
        .unwrap();
    assert!(residual.is_empty());
    let path = &printer.thread_path;
    assert!(path.intersection(&segs[0]).is_none());
    assert!(path.angle().diff(threadkit_core::Angle::from_degrees(180.0)).abs().degrees() < 2.0);
    assert!(path.contains(&printer.ring.point()));
}

fn segment_strategy() -> impl Strategy<Value = (f64, f64, f64, f64)> {
    (-40.0f64..40.0, -40.0f64..40.0, -40.0f64..40.0, -40.0f64..40.0)
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(128))]

    #[test]
    fn prop_thread_avoid_shrinks_and_clears(
        raw in prop::collection::vec(segment_strategy(), 2..5),
        angle in 0.0f64..360.0,
    ) {
        let anchor = Point::new(0.0, 0.0, 0.0);
        let planner = AvoidancePlanner::default();
        let mut segs = Vec::new();
        for (x1, y1, x2, y2) in raw {
            let seg = Segment::new(Point::new(x1, y1, 0.0), Point::new(x2, y2, 0.0));
            prop_assume!(seg.is_ok());
            let seg = seg.unwrap();
            prop_assume!(seg.length() > 0.5);
            prop_assume!(!too_close(&seg, &anchor, planner.avoid_by * 1.5));
            segs.push(seg);
        }
        let mut printer = Printer::new(&config([0.0, 0.0, 0.0], [0.0, 0.0, 0.0], angle));
        let avoid: SegmentSet = (0..segs.len()).collect();

        match planner.thread_avoid(&mut printer, &segs, &avoid) {
            Ok(residual) => {
                prop_assert!(residual.len() < avoid.len());
                prop_assert!(residual.is_subset(&avoid));
                let path: &HalfLine = &printer.thread_path;
                for id in avoid.difference(&residual) {
                    let seg = &segs[*id];
                    prop_assert!(path.intersecting([(*id, seg)]).is_empty());
                    for ep in [seg.start(), seg.end()] {
                        prop_assert!(!too_close(path, ep, planner.avoid_by));
                    }
                }
            }
            Err(e) => prop_assert!(e.is_planning_error()),
        }
    }
}
