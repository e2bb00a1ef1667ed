//! # ilidar - Rust SDK for iTFS network depth sensors
//!
//! Drives the vendor sensor driver and turns its frames into usable output:
//! - Host interface discovery on the sensor's subnet
//! - Session lifecycle (initialize, connect, start/stop, disconnect, destroy)
//! - Reading and writing the 166-byte parameter record, with a guard against
//!   writes that would strand the sensor
//! - A frame worker producing a colormapped depth image and a point cloud
//!
//! ## Quick Start
//! ```no_run
//! # #[cfg(feature = "native")]
//! # fn main() -> ilidar::Result<()> {
//! use ilidar::{DeviceSession, Frame, ReceiveBuffer, DEFAULT_SENSOR_PORT};
//! use ilidar::ffi::NativeDriver;
//! use std::net::Ipv4Addr;
//!
//! let (tx, rx) = crossbeam_channel::bounded::<Frame>(4);
//! let mut session = DeviceSession::new(NativeDriver::new()?);
//! session.initialize(ReceiveBuffer::new(), ilidar::frame::channel_sink(tx))?;
//! session.connect(Ipv4Addr::new(192, 168, 5, 200), DEFAULT_SENSOR_PORT)?;
//! session.start()?;
//!
//! let frame = rx.recv().unwrap();
//! println!("{} points", frame.points.len());
//! # Ok(())
//! # }
//! # #[cfg(not(feature = "native"))]
//! # fn main() {}
//! ```

pub mod error;
pub mod types;
pub mod protocol;
pub mod params;
pub mod net;
pub mod driver;
pub mod depth;
pub mod frame;
pub mod config;
pub mod device;
pub mod sim;
#[cfg(feature = "native")]
pub mod ffi;

pub use config::SessionConfig;
pub use device::DeviceSession;
pub use driver::{Driver, FrameNotifier, ReceiveBuffer};
pub use error::IlidarError;
pub use frame::{FramePipeline, FrameProcessor, FrameSink};
pub use net::NetworkEndpoint;
pub use params::ParameterRecord;
pub use protocol::{DEFAULT_CONTROL_PORT, DEFAULT_SENSOR_PORT};
pub use types::*;

/// Result type alias for ilidar operations.
pub type Result<T> = std::result::Result<T, IlidarError>;
