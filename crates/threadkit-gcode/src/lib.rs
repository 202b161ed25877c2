//! # threadkit-gcode
//!
//! Reads slicer output into layers and turns each layer's moves into
//! segments that remember which gcode lines produced them.

pub mod gcode;
pub mod layer;

pub use gcode::{
    format_number, ArgValue, ExtrusionMode, GcodeArg, GcodeFile, GcodeLine, GcodeParser,
    ParserState, SlicerFlavor,
};
pub use layer::{Layer, LayerGeometry};
