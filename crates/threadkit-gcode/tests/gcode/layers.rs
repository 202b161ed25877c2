use threadkit_core::Point;
use threadkit_gcode::GcodeFile;

const TWO_LAYERS: &str = "\
M82
G92 E0
;LAYER_CHANGE
;Z:0.3
;HEIGHT:0.3
G1 Z0.3 F600
G1 X0 Y0 F6000
G1 X10 Y0 E0.5
G1 X10 Y10 E1.0
;LAYER_CHANGE
;Z:0.5
;HEIGHT:0.2
G1 Z0.5
G1 X0 Y10 E1.5
G1 X0 Y0 E2.0
G1 E1.2 F2400";

#[test]
fn test_carry_position_between_layers() {
    let file = GcodeFile::parse(TWO_LAYERS).unwrap();
    let first = file.layers[0].geometry(None).unwrap();
    assert_eq!(first.segments.len(), 2);
    let end = first.end_position.unwrap();
    assert_eq!(end, Point::new(10.0, 10.0, 0.3));

    let second = file.layers[1].geometry(Some(end)).unwrap();
    assert_eq!(second.segments.len(), 2);
    assert_eq!(*second.segments[0].start(), Point::new(10.0, 10.0, 0.5));
    assert_eq!(second.preamble, vec![10, 11, 12, 13]);
    assert_eq!(second.segments[0].source_lines, vec![14]);
    assert!((second.segments[1].extrude_amount - 0.5).abs() < 1e-12);
    // retraction after the last extrusion is postamble
    assert_eq!(second.postamble, vec![16]);
}

#[test]
fn test_layer_without_extrusion() {
    let file = GcodeFile::parse(
        "\
;LAYER:0
G0 Z1
G0 X5 Y5",
    )
    .unwrap();
    let geom = file.layers[0].geometry(None).unwrap();
    assert!(geom.segments.is_empty());
    assert_eq!(geom.preamble, vec![1, 2, 3]);
    assert_eq!(geom.end_position, Some(Point::new(5.0, 5.0, 1.0)));
}
