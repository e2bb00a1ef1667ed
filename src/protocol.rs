//! Fixed geometry and addressing constants shared with the sensor driver.

// -- Parameter record --
pub const PARAMS_LEN: usize = 166;

// -- Receive buffer geometry --
pub const BUFFER_WIDTH: usize = 320;
pub const BUFFER_HEIGHT: usize = 320;
pub const BUFFER_LEN: usize = BUFFER_WIDTH * BUFFER_HEIGHT;

/// Only the top rows of the receive buffer carry distance samples.
pub const DEPTH_WIDTH: usize = 320;
pub const DEPTH_HEIGHT: usize = 160;

// -- Depth interpretation (millimeters) --
pub const MIN_VALID_DEPTH_MM: u16 = 100;
pub const MAX_VALID_DEPTH_MM: u16 = 8000;
/// Distance that maps to full colormap intensity.
pub const DEPTH_NORM_RANGE_MM: u32 = 8000;

/// Per-pixel projection scale for the point cloud. A calibration value for the
/// deployed optics; override through `SessionConfig`.
pub const DEFAULT_PROJECTION_SCALE: f64 = 0.003;

// -- UDP ports --
/// Local port the driver binds for its control interface.
pub const DEFAULT_CONTROL_PORT: u16 = 7256;
/// Port the sensor listens on for commands.
pub const DEFAULT_SENSOR_PORT: u16 = 7257;
