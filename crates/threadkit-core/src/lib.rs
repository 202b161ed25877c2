//! # threadkit-core
//!
//! Foundation types for threadkit: angles, the geometry primitives the
//! thread planner reasons with, and the shared error types.

pub mod angle;
pub mod error;
pub mod geometry;

pub use angle::Angle;
pub use error::{
    ConfigurationError, ConstructionError, Error, GcodeError, PlanningContext, PlanningError,
    Result, SequencingError,
};
pub use geometry::{
    combine_collinear, intersection, Geometry, HalfLine, LineLike, Point, PointDistance,
    PolyLine, Segment, SegmentId, SegmentSet, EPSILON,
};
