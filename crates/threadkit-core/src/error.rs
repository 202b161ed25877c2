//! Error handling for threadkit
//!
//! Provides the error kinds raised while routing a thread through a print:
//! - Construction errors (degenerate geometry)
//! - Planning errors (avoidance did not converge)
//! - Sequencing errors (step bookkeeping and gcode reconstruction)
//! - Configuration errors (printer state never established, bad settings)
//! - G-Code errors (parsing)
//!
//! All error types use `thiserror` for ergonomic error handling.

use std::fmt;

use thiserror::Error;

use crate::geometry::{HalfLine, Point, Segment};

/// Geometry construction error
///
/// Raised when geometric input is malformed. Never coerced silently.
#[derive(Error, Debug, Clone)]
pub enum ConstructionError {
    /// Segment endpoints coincide
    #[error("Degenerate segment: both endpoints at {point}")]
    DegenerateSegment {
        /// The shared endpoint.
        point: Point,
    },

    /// Direction vector has no length
    #[error("Zero-length direction from {origin}")]
    ZeroDirection {
        /// Origin of the half-line being built.
        origin: Point,
    },

    /// Tangent requested from a point inside the circle
    #[error("Point {point} is inside circle at {center} with radius {radius}")]
    PointInsideCircle {
        /// Circle center.
        center: Point,
        /// Circle radius.
        radius: f64,
        /// The offending point.
        point: Point,
    },

    /// Split location does not lie on the segment
    #[error("Split location {location} is not on segment {segment}")]
    SplitOffSegment {
        /// Requested split location.
        location: Point,
        /// The segment being split.
        segment: String,
    },

    /// Polyline points go down in Z
    #[error("Polyline is not monotonic in Z at point {index}")]
    NonMonotonicZ {
        /// Index of the first point lower than its predecessor.
        index: usize,
    },

    /// A referenced segment is not part of the polyline
    #[error("Segment {segment} not found in polyline")]
    SegmentNotFound {
        /// The missing segment.
        segment: String,
    },
}

/// Snapshot of planner state attached to planning failures.
#[derive(Debug, Clone)]
pub struct PlanningContext {
    /// Segments the thread had to avoid.
    pub segments: Vec<Segment>,
    /// Anchor of the thread at the time of failure.
    pub anchor: Point,
    /// The last attempted thread path.
    pub thread_path: HalfLine,
}

impl fmt::Display for PlanningContext {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "anchor {}, thread {}, segments [", self.anchor, self.thread_path)?;
        for (i, seg) in self.segments.iter().enumerate() {
            if i > 0 {
                write!(f, ", ")?;
            }
            write!(f, "{}", seg)?;
        }
        write!(f, "]")
    }
}

/// Avoidance planning error
///
/// Fatal for the layer being planned.
#[derive(Error, Debug, Clone)]
pub enum PlanningError {
    /// The avoid loop ran out of iterations
    #[error("Thread avoidance did not converge after {iterations} iterations: {context}")]
    Exhausted {
        /// Number of iterations performed.
        iterations: usize,
        /// Planner state at the last iteration.
        context: Box<PlanningContext>,
    },

    /// No visibility candidate reduces the avoid set
    #[error("No ring rotation improves on the avoid set: {context}")]
    NoImprovement {
        /// Planner state when the search failed.
        context: Box<PlanningContext>,
    },

    /// Thread path never reaches the ring circle
    #[error("Thread path {path} does not cross the ring")]
    RingUnreachable {
        /// The path that missed the ring.
        path: HalfLine,
    },

    /// A thread anchor has no layer segment to hold it
    #[error("No segment in layer {layer} contains anchor {anchor}")]
    NoAnchorSegment {
        /// Layer number.
        layer: usize,
        /// The unsupported anchor.
        anchor: Point,
    },
}

/// Step sequencing error
#[derive(Error, Debug, Clone)]
pub enum SequencingError {
    /// A gcode line referenced by a segment is missing from the layer
    #[error("Cannot locate line {line_number} needed by step {step}")]
    SequencingGap {
        /// The missing line number.
        line_number: u32,
        /// The step being rendered.
        step: usize,
    },

    /// A segment carries no source lines at all
    #[error("Segment {segment} has no source lines")]
    MissingProvenance {
        /// The segment without provenance.
        segment: String,
    },

    /// begin_step called while another step is open
    #[error("Step '{name}' is still open")]
    StepAlreadyOpen {
        /// Name of the open step.
        name: String,
    },

    /// commit/abandon called with no open step
    #[error("No step is open")]
    NoOpenStep,
}

/// Printer configuration error
#[derive(Error, Debug, Clone)]
pub enum ConfigurationError {
    /// A move needs a head position that was never set
    #[error("Head position unknown for line {line}")]
    PositionUnknown {
        /// The line that needed the position.
        line: String,
    },

    /// Invalid setting value
    #[error("Invalid setting '{key}': {reason}")]
    InvalidSetting {
        /// Setting name.
        key: String,
        /// Why the value is rejected.
        reason: String,
    },
}

/// G-Code error type
///
/// Represents errors related to G-Code parsing and layer extraction.
#[derive(Error, Debug, Clone)]
pub enum GcodeError {
    /// Invalid G-Code syntax
    #[error("Invalid syntax at line {line_number}: {reason}")]
    InvalidSyntax {
        /// The line number where the syntax error occurred.
        line_number: u32,
        /// The reason for the syntax error.
        reason: String,
    },

    /// Invalid parameter value
    #[error("Invalid parameter '{param}' at line {line_number}: {reason}")]
    InvalidParameter {
        /// The line number where the invalid parameter was found.
        line_number: u32,
        /// The parameter name.
        param: String,
        /// The reason the parameter is invalid.
        reason: String,
    },

    /// Layer metadata could not be determined
    #[error("Layer {layer}: {reason}")]
    InvalidLayer {
        /// Layer number.
        layer: usize,
        /// What is missing.
        reason: String,
    },
}

/// Main error type for threadkit
#[derive(Error, Debug)]
pub enum Error {
    /// Construction error
    #[error(transparent)]
    Construction(#[from] ConstructionError),

    /// Planning error
    #[error(transparent)]
    Planning(#[from] PlanningError),

    /// Sequencing error
    #[error(transparent)]
    Sequencing(#[from] SequencingError),

    /// Configuration error
    #[error(transparent)]
    Configuration(#[from] ConfigurationError),

    /// G-Code error
    #[error(transparent)]
    Gcode(#[from] GcodeError),

    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Other error
    #[error("{0}")]
    Other(String),
}

impl Error {
    /// Create an error from a string
    pub fn other(msg: impl Into<String>) -> Self {
        Error::Other(msg.into())
    }

    /// Check if this is a construction error
    pub fn is_construction_error(&self) -> bool {
        matches!(self, Error::Construction(_))
    }

    /// Check if this is a planning error
    pub fn is_planning_error(&self) -> bool {
        matches!(self, Error::Planning(_))
    }

    /// Check if this is a sequencing error
    pub fn is_sequencing_error(&self) -> bool {
        matches!(self, Error::Sequencing(_))
    }

    /// Check if this is a configuration error
    pub fn is_configuration_error(&self) -> bool {
        matches!(self, Error::Configuration(_))
    }

    /// Check if this is a G-Code error
    pub fn is_gcode_error(&self) -> bool {
        matches!(self, Error::Gcode(_))
    }
}

/// Result type for threadkit operations
pub type Result<T> = std::result::Result<T, Error>;
