//! # threadkit-planner
//!
//! Plans where the ring holding the thread has to be while each part of a
//! layer is printed, so the free thread never lies across plastic that is
//! still to be laid down, and rebuilds the gcode with the ring moves in
//! place.
//!
//! The pieces, bottom up:
//! - [`ring`] and [`kinematics`]: the ring and how a machine turns it
//! - [`printer`]: machine state as a pure transition over gcode lines
//! - [`steps`]: per-layer step list with snapshots and gcode rendering
//! - [`avoid`]: the thread avoidance planner
//! - [`thread`] and [`threader`]: thread route per layer and the router

pub mod avoid;
pub mod kinematics;
pub mod printer;
pub mod ring;
pub mod steps;
pub mod thread;
pub mod threader;

pub use avoid::AvoidancePlanner;
pub use kinematics::{
    kinematics_for, AxisRing, ExtruderRing, ManualRing, RingKinematics, PRINT_TOOL, RING_TOOL,
};
pub use printer::{Head, Printer};
pub use ring::Ring;
pub use steps::{Step, Steps};
pub use thread::{
    anchors, flatten_thread, geometry_snap, intersecting, intersecting_any, non_intersecting,
    split_at_anchors,
};
pub use threader::Threader;
