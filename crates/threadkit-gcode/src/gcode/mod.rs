//! G-Code handling
//!
//! This module provides:
//! - The line model ([`GcodeLine`]) with verbatim round-tripping
//! - A parser that annotates lines with extrusion deltas
//! - Whole-file splitting into preamble, layers and postamble

pub mod command;
pub mod file;
pub mod parser;

pub use command::*;
pub use file::*;
pub use parser::*;
