//! Whole-file parsing and layer splitting

use serde::{Deserialize, Serialize};
use threadkit_core::{GcodeError, EPSILON};
use tracing::{debug, info};

use super::command::GcodeLine;
use super::parser::GcodeParser;
use crate::layer::Layer;

/// Slicer that produced the file, which determines how layers are marked
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SlicerFlavor {
    /// PrusaSlicer / SuperSlicer: `;LAYER_CHANGE`, `;Z:`, `;HEIGHT:`
    Prusa,
    /// Cura: `;LAYER:n`
    Cura,
    /// No markers; layers start at Z changes
    Plain,
}

impl std::fmt::Display for SlicerFlavor {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Prusa => write!(f, "prusa"),
            Self::Cura => write!(f, "cura"),
            Self::Plain => write!(f, "plain"),
        }
    }
}

/// A parsed gcode file split into layers
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GcodeFile {
    /// Detected slicer
    pub flavor: SlicerFlavor,
    /// Lines before the first layer
    pub preamble: Vec<GcodeLine>,
    /// Print layers in order
    pub layers: Vec<Layer>,
    /// Lines after the last layer
    pub postamble: Vec<GcodeLine>,
}

impl GcodeFile {
    /// Parse gcode text
    pub fn parse(text: &str) -> Result<Self, GcodeError> {
        let mut parser = GcodeParser::new();
        let lines = text
            .lines()
            .enumerate()
            .map(|(i, l)| parser.parse(l, i as u32 + 1))
            .collect::<Result<Vec<_>, _>>()?;
        Self::from_lines(lines)
    }

    /// Split already parsed lines into preamble, layers and postamble
    pub fn from_lines(lines: Vec<GcodeLine>) -> Result<Self, GcodeError> {
        let flavor = detect_flavor(&lines);
        let starts = layer_starts(&lines, flavor);
        debug!("{} flavor, {} layer markers", flavor, starts.len());

        let Some(&first) = starts.first() else {
            return Ok(Self {
                flavor,
                preamble: lines,
                layers: Vec::new(),
                postamble: Vec::new(),
            });
        };

        let mut lines = lines;
        let postamble_at = postamble_start(&lines, flavor, starts[starts.len() - 1]);
        let postamble = postamble_at.map_or_else(Vec::new, |at| lines.split_off(at));
        let mut rest = lines.split_off(first);
        let preamble = lines;

        let mut chunks = Vec::with_capacity(starts.len());
        for window in starts.windows(2).rev() {
            chunks.push(rest.split_off(window[1] - first));
        }
        chunks.push(rest);
        chunks.reverse();

        let mut layers = Vec::with_capacity(chunks.len());
        let mut prev_z: Option<f64> = None;
        for (number, chunk) in chunks.into_iter().enumerate() {
            let layer = Layer::from_lines(number, chunk, flavor, prev_z)?;
            prev_z = Some(layer.z);
            layers.push(layer);
        }

        info!(
            "Parsed {} layers ({} preamble, {} postamble lines)",
            layers.len(),
            preamble.len(),
            postamble.len()
        );
        Ok(Self {
            flavor,
            preamble,
            layers,
            postamble,
        })
    }
}

fn is_marker(line: &GcodeLine, prefix: &str) -> bool {
    line.code.is_none() && line.comment_text().is_some_and(|c| c.starts_with(prefix))
}

fn detect_flavor(lines: &[GcodeLine]) -> SlicerFlavor {
    if lines.iter().any(|l| is_marker(l, "LAYER_CHANGE")) {
        SlicerFlavor::Prusa
    } else if lines.iter().any(|l| is_marker(l, "LAYER:")) {
        SlicerFlavor::Cura
    } else {
        SlicerFlavor::Plain
    }
}

fn layer_starts(lines: &[GcodeLine], flavor: SlicerFlavor) -> Vec<usize> {
    match flavor {
        SlicerFlavor::Prusa => marker_indices(lines, "LAYER_CHANGE"),
        SlicerFlavor::Cura => marker_indices(lines, "LAYER:"),
        SlicerFlavor::Plain => {
            let mut starts = Vec::new();
            let mut z: Option<f64> = None;
            let mut seen_extrude = false;
            for (i, line) in lines.iter().enumerate() {
                if !line.is_move() {
                    continue;
                }
                if let Some(nz) = line.arg('Z') {
                    // a rise only opens a layer once the previous one printed something
                    let rising = z.map_or(true, |z| nz > z + EPSILON);
                    if rising && (starts.is_empty() || seen_extrude) {
                        starts.push(i);
                        seen_extrude = false;
                    }
                    z = Some(nz);
                }
                if line.is_xyextrude() {
                    seen_extrude = true;
                }
            }
            starts
        }
    }
}

fn marker_indices(lines: &[GcodeLine], prefix: &str) -> Vec<usize> {
    lines
        .iter()
        .enumerate()
        .filter(|(_, l)| is_marker(l, prefix))
        .map(|(i, _)| i)
        .collect()
}

/// Index of the first postamble line, searched from the last layer start
fn postamble_start(lines: &[GcodeLine], flavor: SlicerFlavor, last_layer: usize) -> Option<usize> {
    let tail = &lines[last_layer..];
    let last_extrude = tail.iter().rposition(|l| l.is_xyextrude())?;
    let after = &tail[last_extrude..];
    let offset = match flavor {
        SlicerFlavor::Prusa => after.iter().position(|l| is_marker(l, "TYPE:Custom")),
        SlicerFlavor::Cura => after.iter().position(|l| is_marker(l, "TIME_ELAPSED:")).map(|i| i + 1),
        SlicerFlavor::Plain => None,
    }?;
    Some(last_layer + last_extrude + offset)
}

#[cfg(test)]
mod tests {
    use super::*;

    const PRUSA: &str = "\
M82
G92 E0
G28
;LAYER_CHANGE
;Z:0.2
;HEIGHT:0.2
G1 Z0.2 F720
G1 X10 Y10 F9000
G1 X20 Y10 E1.0
;LAYER_CHANGE
;Z:0.4
;HEIGHT:0.2
G1 Z0.4
G1 X20 Y20 E2.0
;TYPE:Custom
M104 S0
M84";

    #[test]
    fn test_prusa_layers() {
        let file = GcodeFile::parse(PRUSA).unwrap();
        assert_eq!(file.flavor, SlicerFlavor::Prusa);
        assert_eq!(file.preamble.len(), 3);
        assert_eq!(file.layers.len(), 2);
        assert_eq!(file.layers[0].z, 0.2);
        assert_eq!(file.layers[1].z, 0.4);
        assert_eq!(file.layers[1].height, 0.2);
        assert_eq!(file.postamble.len(), 3);
        assert_eq!(file.layers[1].lines.len(), 5);
    }

    #[test]
    fn test_cura_layers() {
        let text = "\
G28
;LAYER:0
G0 X0 Y0 Z0.3
G1 X5 Y0 E1
;LAYER:1
G0 Z0.5
G1 X5 Y5 E2
;TIME_ELAPSED:12
M84";
        let file = GcodeFile::parse(text).unwrap();
        assert_eq!(file.flavor, SlicerFlavor::Cura);
        assert_eq!(file.layers.len(), 2);
        assert_eq!(file.layers[0].z, 0.3);
        assert!((file.layers[1].height - 0.2).abs() < 1e-9);
        assert_eq!(file.postamble.len(), 1);
    }

    #[test]
    fn test_plain_layers() {
        let text = "\
G28
G1 Z0.2
G1 X0 Y0
G1 X5 Y0 E1
G1 Z0.4
G1 X5 Y5 E2";
        let file = GcodeFile::parse(text).unwrap();
        assert_eq!(file.flavor, SlicerFlavor::Plain);
        assert_eq!(file.preamble.len(), 1);
        assert_eq!(file.layers.len(), 2);
        assert_eq!(file.layers[1].z, 0.4);
    }

    #[test]
    fn test_no_layers() {
        let file = GcodeFile::parse("G28\nM84").unwrap();
        assert!(file.layers.is_empty());
        assert_eq!(file.preamble.len(), 2);
    }
}
