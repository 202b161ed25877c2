use threadkit_gcode::{GcodeFile, GcodeLine};
use threadkit_planner::{Printer, Steps};
use threadkit_settings::Config;

/// Lines 5, 6, 20 and 21 draw the segments printed together; the moves on
/// lines 7 to 19 are printed elsewhere.
fn gapped_layer() -> String {
    let mut text = String::from(";LAYER:0\nG0 Z0.2\nG0 X0 Y0\nG1 X1 Y0 E0.1\n");
    for x in 2..=16 {
        text.push_str(&format!("G1 X{} Y0 E{:.1}\n", x, f64::from(x) * 0.1));
    }
    text.push_str("G1 X17 Y1 E1.7\nG1 X18 Y1 E1.8\n");
    text
}

fn config() -> Config {
    let mut config = Config::default();
    config.bed.moves_y = false;
    config
}

fn drawn_by(steps: &Steps, line: u32) -> usize {
    steps
        .segments()
        .iter()
        .position(|s| s.drawing_line() == Some(line))
        .unwrap()
}

#[test]
fn test_gap_bridged_once() {
    let file = GcodeFile::parse(&gapped_layer()).unwrap();
    let layer = file.layers.into_iter().next().unwrap();
    let geometry = layer.geometry(None).unwrap();
    let config = config();
    let mut steps = Steps::new(layer, geometry, Printer::new(&config));

    let first = drawn_by(&steps, 4);
    steps.run_step("start", |s| s.add([first])).unwrap();
    let gapped: Vec<usize> = [5, 6, 20, 21].iter().map(|l| drawn_by(&steps, *l)).collect();
    steps.run_step("gapped", |s| s.add(gapped.iter().copied())).unwrap();

    let mut machine = Printer::new(&config);
    let out = steps.gcode(&mut machine).unwrap();

    let bridges: Vec<(usize, &GcodeLine)> = out
        .iter()
        .enumerate()
        .filter(|(_, l)| l.synthetic && l.is_code("G0"))
        .collect();
    assert_eq!(bridges.len(), 1);
    let (at, bridge) = bridges[0];
    assert_eq!(bridge.line_number, None);
    assert_eq!(bridge.arg('X'), Some(16.0));
    assert_eq!(bridge.arg('Y'), Some(0.0));
    assert_eq!(out[at + 1].line_number, Some(20));

    // extrusion is renumbered to what was actually printed
    let last_e = out.iter().rev().find_map(|l| l.arg('E')).unwrap();
    assert!((last_e - 0.5).abs() < 1e-9);

    let real: Vec<u32> = out.iter().filter_map(|l| l.line_number).collect();
    assert!(!real.iter().any(|n| (7..=19).contains(n)));
}
