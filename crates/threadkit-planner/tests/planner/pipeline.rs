use std::path::{Path, PathBuf};

use tempfile::TempDir;
use threadkit_core::{Point, PolyLine};
use threadkit_gcode::GcodeFile;
use threadkit_planner::Threader;
use threadkit_settings::{Config, RingDrive};

const PRINT: &str = "\
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
;TIME_ELAPSED:5.0
M84";

fn write_config(dir: &Path) -> PathBuf {
    let mut config = Config::default();
    config.ring.center = [50.0, 50.0, 0.0];
    config.bed.anchor = [0.0, 50.0, 0.0];
    config.bed.moves_y = false;
    let path = dir.join("threadkit.toml");
    config.save_to_file(&path).unwrap();
    path
}

fn thread() -> PolyLine {
    PolyLine::from_points(
        &[
            Point::new(0.0, 50.0, 0.0),
            Point::new(50.0, 40.0, 0.2),
            Point::new(50.0, 40.0, 5.0),
        ],
        true,
    )
    .unwrap()
}

fn render(config: Config) -> String {
    let file = GcodeFile::parse(PRINT).unwrap();
    let threader = Threader::new(config);
    let layers = threader.route(&file, &thread()).unwrap();
    threader.render(&file, &layers).unwrap()
}

#[test]
fn test_config_file_to_output_file() {
    let dir = TempDir::new().unwrap();
    let config = Config::load_from_file(&write_config(dir.path())).unwrap();
    let text = render(config);

    let out = dir.path().join("out.gcode");
    std::fs::write(&out, &text).unwrap();
    let reparsed = GcodeFile::parse(&std::fs::read_to_string(&out).unwrap()).unwrap();
    assert_eq!(reparsed.layers.len(), 1);
    // every drawing move survives, plus bridges and ring moves
    let draws = reparsed.layers[0]
        .lines
        .iter()
        .filter(|l| l.is_xyextrude())
        .count();
    assert_eq!(draws, 4);
}

#[test]
fn test_extruder_drive_ring_moves() {
    let dir = TempDir::new().unwrap();
    let mut config = Config::load_from_file(&write_config(dir.path())).unwrap();
    config.ring.drive = RingDrive::Extruder;
    let text = render(config);

    assert!(!text.lines().any(|l| l.starts_with("G0 A")));
    assert!(text.lines().any(|l| l == "T1"));
    assert!(text.lines().any(|l| l.starts_with("M92 T1 E")));
}

#[test]
fn test_manual_drive_pauses_for_thread_moves() {
    let dir = TempDir::new().unwrap();
    let mut config = Config::load_from_file(&write_config(dir.path())).unwrap();
    config.ring.drive = RingDrive::Manual;
    config.ring.pause_commands = vec!["M25".to_string()];
    let text = render(config);

    assert!(!text.lines().any(|l| l.starts_with("G0 A") || l.starts_with("M92")));
    let lines: Vec<&str> = text.lines().collect();
    let prompts: Vec<usize> = lines
        .iter()
        .enumerate()
        .filter(|(_, l)| l.starts_with("M117 Move thread to "))
        .map(|(i, _)| i)
        .collect();
    assert!(!prompts.is_empty());
    for i in prompts {
        assert_eq!(lines[i + 1], "M25");
    }
}
