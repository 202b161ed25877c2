use threadkit_core::{Point, PolyLine, Segment};
use threadkit_gcode::GcodeFile;
use threadkit_planner::Threader;
use threadkit_settings::Config;

const SQUARE: &str = "\
M82
G92 E0
G28
;LAYER:0
G0 Z0.2
G0 X40 Y40
G1 X60 Y40 E1
G1 X60 Y60 E2
G1 X40 Y60 E3
G1 X40 Y40 E4
;LAYER:1
G0 Z0.4
G1 X60 Y40 E5
G1 X60 Y60 E6
;TIME_ELAPSED:12.0
M104 S0
M84";

fn config() -> Config {
    let mut config = Config::default();
    config.ring.center = [50.0, 50.0, 0.0];
    config.bed.anchor = [0.0, 50.0, 0.0];
    config.bed.moves_y = false;
    config.general.initial_thread_angle = 180.0;
    config
}

fn thread() -> PolyLine {
    PolyLine::from_points(
        &[
            Point::new(0.0, 50.0, 0.0),
            Point::new(50.0, 40.0, 0.2),
            Point::new(50.0, 40.0, 10.0),
        ],
        true,
    )
    .unwrap()
}

#[test]
fn test_route_anchors_thread_in_first_layer() {
    let file = GcodeFile::parse(SQUARE).unwrap();
    let threader = Threader::new(config());
    let layers = threader.route(&file, &thread()).unwrap();
    assert_eq!(layers.len(), 2);

    let first = &layers[0];
    assert!(first.unprinted().is_empty());
    assert_eq!(first.printer().anchor, Point::new(50.0, 40.0, 0.2));
    assert!(first
        .steps()
        .iter()
        .any(|s| s.valid && s.name == "Print 1 segments to fix anchor"));

    // nothing of the thread is left above the first layer band
    let second = &layers[1];
    assert!(second.segments().is_empty());
    assert_eq!(second.steps().len(), 1);
}

#[test]
fn test_render_keeps_layers_and_renumbers_extrusion() {
    let file = GcodeFile::parse(SQUARE).unwrap();
    let threader = Threader::new(config());
    let layers = threader.route(&file, &thread()).unwrap();
    let text = threader.render(&file, &layers).unwrap();

    assert!(text.contains("G28 X Y Z"));
    assert!(text.contains("M92 A"));
    assert!(text.contains(";LAYER:0"));
    assert!(text.contains(";LAYER:1"));
    assert!(text.contains("Layer 0 step"));
    assert!(text.lines().any(|l| l.starts_with("G0 A")));
    assert!(text.trim_end().ends_with("M84"));

    let last_e = text
        .lines()
        .filter(|l| l.starts_with("G1"))
        .filter_map(|l| l.split_whitespace().find_map(|w| w.strip_prefix('E')))
        .last()
        .and_then(|e| e.parse::<f64>().ok())
        .unwrap();
    assert!((last_e - 6.0).abs() < 1e-6);
}

const OUTLINE: &str = "\
;LAYER:0
G0 Z0.2
G0 X40 Y40
G1 X60 Y40 E1
G1 X60 Y60 E2
G1 X40 Y60 E3
G1 X40 Y40 E4";

fn below_layer() -> PolyLine {
    PolyLine::from_points(&[Point::new(0.0, 50.0, 0.0), Point::new(0.0, 40.0, 0.0)], true)
        .unwrap()
}

fn outline_edges() -> Vec<Segment> {
    let corners = [(40.0, 40.0), (60.0, 40.0), (60.0, 60.0), (40.0, 60.0), (40.0, 40.0)];
    corners
        .windows(2)
        .map(|w| {
            Segment::new(Point::new(w[0].0, w[0].1, 0.0), Point::new(w[1].0, w[1].1, 0.0)).unwrap()
        })
        .collect()
}

#[test]
fn test_unanchored_layer_turns_thread_off_extents() {
    let file = GcodeFile::parse(OUTLINE).unwrap();
    let mut config = config();
    // straight through two opposite edges of the outline
    config.general.initial_thread_angle = 0.0;
    let threader = Threader::new(config);
    let layers = threader.route(&file, &below_layer()).unwrap();
    assert_eq!(layers.len(), 1);

    let layer = &layers[0];
    assert!(layer.segments().is_empty());
    assert_eq!(layer.steps().len(), 1);
    assert!(layer.steps()[0].valid);
    let path = &layer.printer().thread_path;
    for edge in outline_edges() {
        assert!(path.intersection(&edge).is_none(), "thread still crosses {}", edge);
    }

    let text = threader.render(&file, &layers).unwrap();
    assert!(text.lines().any(|l| l.starts_with("G0 A")));
    assert!(text.contains("G1 X40 Y40 E4"));
}

#[test]
fn test_unanchored_layer_bounded_by_max_iterations() {
    let file = GcodeFile::parse(OUTLINE).unwrap();
    let mut config = config();
    config.general.initial_thread_angle = 0.0;
    config.general.max_avoid_iterations = 1;
    let err = Threader::new(config)
        .route(&file, &below_layer())
        .unwrap_err();
    assert!(err.is_planning_error());
    assert!(err.to_string().contains("did not converge after 1 iterations"));
}
