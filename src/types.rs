use std::fmt;

/// Lifecycle state of a [`DeviceSession`](crate::DeviceSession).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionState {
    /// No driver binding yet (or torn down by `destroy`).
    Uninitialized,
    /// Buffer and frame notifier are bound to the driver.
    Initialized,
    /// The driver's local UDP endpoint exists; no sensor link.
    InterfaceCreated,
    /// Handshake with the sensor completed.
    Connected,
    /// The sensor is delivering frames.
    Streaming,
}

impl SessionState {
    /// True once the sensor handshake has succeeded.
    pub fn is_connected(self) -> bool {
        matches!(self, SessionState::Connected | SessionState::Streaming)
    }
}

/// Why a parameter write was refused before reaching the driver.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RejectReason {
    /// `DataSensorIp` is 0.0.0.0; the sensor would become unreachable.
    ZeroSensorIp,
    /// `DataMacAddr` is all zero.
    ZeroMac,
}

impl fmt::Display for RejectReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RejectReason::ZeroSensorIp => f.write_str("sensor IP is 0.0.0.0"),
            RejectReason::ZeroMac => f.write_str("MAC address is all zero"),
        }
    }
}

/// A point in sensor space, in meters.
///
/// X grows to the right, Y up and the sensor looks down -Z.
#[repr(C)]
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Point3 {
    pub x: f32,
    pub y: f32,
    pub z: f32,
}

/// Colormapped depth field (320x160 RGBA). Pixels without a return are
/// fully transparent.
pub type DepthFrame = image::RgbaImage;

/// Points projected from one depth field, in row-major scan order.
pub type PointCloud = Vec<Point3>;

/// Artifacts produced from one frame-ready notification.
#[derive(Debug, Clone)]
pub struct Frame {
    /// Counts processed frames since the pipeline started, from 1.
    pub sequence: u64,
    pub depth: DepthFrame,
    pub points: PointCloud,
}
