//! # threadkit
//!
//! Post-processes sliced FDM gcode so a continuous thread can be laid into
//! the print. A ring around the print head carries the free end of the
//! thread; before each part of a layer is printed the ring is turned so the
//! thread does not lie across plastic still to be deposited.
//!
//! ## Architecture
//!
//! threadkit is organized as a workspace with multiple crates:
//!
//! 1. **threadkit-core** - Angles, geometry primitives, error types
//! 2. **threadkit-gcode** - G-code parsing, layers, layer geometry
//! 3. **threadkit-settings** - Ring, bed and planner configuration
//! 4. **threadkit-planner** - Ring kinematics, printer state, avoidance
//!    planning, step sequencing and the layer router
//! 5. **threadkit** - Logging setup and the command line tool

pub use threadkit_core::{
    Angle, ConfigurationError, ConstructionError, Error, GcodeError, HalfLine, PlanningError,
    Point, PolyLine, Result, Segment, SequencingError,
};
pub use threadkit_gcode::{GcodeFile, GcodeLine, Layer};
pub use threadkit_planner::{AvoidancePlanner, Printer, Ring, Step, Steps, Threader};
pub use threadkit_settings::{Config, SettingsError};

/// Library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Build date (set at compile time)
pub const BUILD_DATE: &str = env!("BUILD_DATE");

/// Initialize logging
///
/// Console output filtered by `RUST_LOG`, defaulting to INFO, or DEBUG when
/// `verbose` is set.
pub fn init_logging(verbose: bool) -> anyhow::Result<()> {
    use tracing_subscriber::fmt;
    use tracing_subscriber::prelude::*;
    use tracing_subscriber::EnvFilter;

    let level = if verbose {
        tracing::Level::DEBUG
    } else {
        tracing::Level::INFO
    };
    let env_filter = EnvFilter::from_default_env().add_directive(level.into());

    let fmt_layer = fmt::layer()
        .with_writer(std::io::stderr)
        .with_target(true)
        .with_level(true)
        .with_line_number(true);

    tracing_subscriber::registry()
        .with(env_filter)
        .with(fmt_layer)
        .try_init()?;

    Ok(())
}

/// Read a thread route: a JSON array of `[x, y, z]` points
pub fn load_thread(text: &str) -> anyhow::Result<PolyLine> {
    let points: Vec<[f64; 3]> = serde_json::from_str(text)?;
    let points: Vec<Point> = points.into_iter().map(Point::from).collect();
    Ok(PolyLine::from_points(&points, true)?)
}
