use proptest::prelude::*;
use threadkit_gcode::{GcodeFile, GcodeParser};

const SAMPLE: &str = "\
; generated by PrusaSlicer
M83 ; relative extrusion
G28 W ; home
;LAYER_CHANGE
;Z:0.2
;HEIGHT:0.2
G1 Z.2 F720
G1 X79.206 Y91.621 F7200
G1 X80.01 Y90.954 E.03251  ; perimeter
M117 Layer 1
;TYPE:Custom
M107";

#[test]
fn test_unmodified_lines_round_trip() {
    let file = GcodeFile::parse(SAMPLE).unwrap();
    let mut out: Vec<String> = file.preamble.iter().map(|l| l.construct()).collect();
    for layer in &file.layers {
        out.extend(layer.lines.iter().map(|l| l.construct()));
    }
    out.extend(file.postamble.iter().map(|l| l.construct()));
    assert_eq!(out.join("\n"), SAMPLE);
}

#[test]
fn test_line_numbers_are_one_based_and_contiguous() {
    let file = GcodeFile::parse(SAMPLE).unwrap();
    let numbers: Vec<u32> = file.layers[0]
        .lines
        .iter()
        .filter_map(|l| l.line_number)
        .collect();
    assert_eq!(numbers, (4..=10).collect::<Vec<u32>>());
}

proptest! {
    #[test]
    fn prop_parse_numeric_args(x in -500.0f64..500.0, y in -500.0f64..500.0) {
        let mut parser = GcodeParser::new();
        let text = format!("G1 X{} Y{}", x, y);
        let line = parser.parse(&text, 1).unwrap();
        prop_assert_eq!(line.arg('X'), Some(x));
        prop_assert_eq!(line.arg('Y'), Some(y));
    }
}
