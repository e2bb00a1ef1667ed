use crate::config::SessionConfig;
use crate::driver::{Driver, FrameNotifier, ReceiveBuffer, Status, STATUS_OK};
use crate::frame::{FramePipeline, FrameSink};
use crate::net::{self, InterfaceSource, NetworkEndpoint, SystemInterfaces};
use crate::params::ParameterRecord;
use crate::protocol::PARAMS_LEN;
use crate::types::SessionState;
use crate::{IlidarError, Result};
use std::net::Ipv4Addr;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

/// Connection lifecycle and parameter I/O for one sensor.
///
/// ```text
/// Uninitialized --initialize--> Initialized --connect--> Connected <--stop-- Streaming
///                                                           |   \--start------^
///                        InterfaceCreated <--disconnect-----+
///                               \--connect--> Connected
/// ```
///
/// The first `connect` also creates the driver's host interface; it then
/// persists across `disconnect` until `destroy`.
///
/// `destroy` returns to `Uninitialized` from any state and is idempotent.
///
/// Operations take `&mut self`, so calls on one session are serialized by
/// the borrow checker. Only the frame path runs on other threads: the
/// driver posts signals through its [`FrameNotifier`] and the session's
/// [`FramePipeline`] worker consumes them.
pub struct DeviceSession<D: Driver> {
    driver: D,
    interfaces: Box<dyn InterfaceSource>,
    config: SessionConfig,
    state: SessionState,
    interface_created: bool,
    endpoint: Option<NetworkEndpoint>,
    /// Shared with the notifier and the frame worker.
    streaming: Arc<AtomicBool>,
    buffer: Option<ReceiveBuffer>,
    pipeline: Option<FramePipeline>,
}

impl<D: Driver> DeviceSession<D> {
    pub fn new(driver: D) -> Self {
        Self::with_config(driver, SessionConfig::default())
    }

    pub fn with_config(driver: D, config: SessionConfig) -> Self {
        Self {
            driver,
            interfaces: Box::new(SystemInterfaces),
            config,
            state: SessionState::Uninitialized,
            interface_created: false,
            endpoint: None,
            streaming: Arc::new(AtomicBool::new(false)),
            buffer: None,
            pipeline: None,
        }
    }

    /// Replace the host interface enumeration used by `connect`.
    pub fn with_interfaces(mut self, source: impl InterfaceSource + 'static) -> Self {
        self.interfaces = Box::new(source);
        self
    }

    pub fn state(&self) -> SessionState {
        self.state
    }

    /// Whether the driver's local interface exists.
    pub fn interface_created(&self) -> bool {
        self.interface_created
    }

    /// The host endpoint resolved when the interface was created.
    pub fn endpoint(&self) -> Option<NetworkEndpoint> {
        self.endpoint
    }

    pub fn config(&self) -> &SessionConfig {
        &self.config
    }

    pub fn driver(&self) -> &D {
        &self.driver
    }

    /// Frames delivered to the sink since `initialize`.
    pub fn frames_processed(&self) -> u64 {
        self.pipeline.as_ref().map_or(0, |p| p.processed())
    }

    /// Bind `buffer` and a frame notifier to the driver and start the frame
    /// worker that feeds `sink`.
    ///
    /// The buffer stays bound, unmoved, until `destroy`.
    pub fn initialize(&mut self, buffer: ReceiveBuffer, sink: impl FrameSink) -> Result<()> {
        if self.state != SessionState::Uninitialized {
            return Err(IlidarError::AlreadyInitialized);
        }

        log::info!("Initializing driver binding");

        let (signal_tx, signal_rx) = crossbeam_channel::bounded(1);
        self.streaming.store(false, Ordering::Release);
        let pipeline = FramePipeline::start(
            buffer.share(),
            signal_rx,
            self.streaming.clone(),
            Box::new(sink),
            self.config.projection_scale,
        )?;

        let notifier = FrameNotifier::new(signal_tx, self.streaming.clone());
        let status = self.driver.init(buffer.share(), notifier);
        if status != STATUS_OK {
            log::warn!("Driver init failed (status {})", status);
            pipeline.stop();
            return Err(IlidarError::InitFailed(status));
        }

        self.buffer = Some(buffer);
        self.pipeline = Some(pipeline);
        self.state = SessionState::Initialized;
        log::info!("  Done.");
        Ok(())
    }

    /// Connect to the sensor at `sensor_ip:port`.
    ///
    /// The first call also creates the driver's local interface on the host
    /// network that shares a subnet with the sensor; later calls reuse it.
    pub fn connect(&mut self, sensor_ip: Ipv4Addr, port: u16) -> Result<()> {
        match self.state {
            SessionState::Initialized | SessionState::InterfaceCreated => {}
            state => {
                return Err(IlidarError::InvalidState {
                    operation: "connect",
                    state,
                })
            }
        }

        if !self.interface_created {
            self.create_interface(sensor_ip)?;
        }

        log::info!("Connecting to sensor {}:{}", sensor_ip, port);
        let status = self.driver.connect(sensor_ip.octets(), port);
        if status != STATUS_OK {
            log::warn!("Connect to {} failed (status {})", sensor_ip, status);
            return Err(IlidarError::ConnectFailed(status));
        }

        self.state = SessionState::Connected;
        log::info!("  Connected.");
        Ok(())
    }

    fn create_interface(&mut self, sensor_ip: Ipv4Addr) -> Result<()> {
        log::info!("Auto-creating interface for sensor {}", sensor_ip);
        let endpoint = net::resolve_endpoint(self.interfaces.as_ref(), sensor_ip)?;

        let status = self.driver.create_interface(
            endpoint.broadcast.octets(),
            endpoint.host_ip.octets(),
            self.config.control_port,
        );
        if status != STATUS_OK {
            log::warn!("Interface creation failed (status {})", status);
            return Err(IlidarError::InterfaceCreateFailed(status));
        }

        log::info!(
            "  Interface created: host={} broadcast={} port={}",
            endpoint.host_ip,
            endpoint.broadcast,
            self.config.control_port
        );
        self.interface_created = true;
        self.endpoint = Some(endpoint);
        self.state = SessionState::InterfaceCreated;
        Ok(())
    }

    /// Read the sensor's active configuration.
    pub fn get_parameters(&mut self) -> Result<ParameterRecord> {
        self.require_connected("read parameters")?;

        let mut raw = [0u8; PARAMS_LEN];
        let status = self.driver.get_params(&mut raw);
        if status != STATUS_OK {
            log::warn!("Parameter read failed (status {})", status);
            return Err(IlidarError::ReadFailure(status));
        }
        ParameterRecord::decode(&raw)
    }

    /// Write a configuration to the sensor.
    ///
    /// Records with a zero sensor IP or zero MAC are refused without
    /// contacting the driver; nothing is retried.
    pub fn set_parameters(&mut self, record: &ParameterRecord) -> Result<()> {
        if let Err(reason) = record.check_writable() {
            log::warn!("Parameter write rejected: {}", reason);
            return Err(IlidarError::WriteRejected(reason));
        }
        self.require_connected("write parameters")?;

        let status = self.driver.set_params(&record.encode());
        if status != STATUS_OK {
            log::warn!("Parameter write failed (status {})", status);
            return Err(IlidarError::WriteFailure(status));
        }
        log::info!("Parameters written (sensor ip {})", record.sensor_ip());
        Ok(())
    }

    /// Persist the active configuration to the sensor's flash.
    pub fn store(&mut self) -> Result<()> {
        self.require_connected("store")?;
        let status = self.driver.store();
        check("store", status)
    }

    /// Lock the sensor's configuration against writes.
    pub fn lock(&mut self) -> Result<()> {
        self.require_connected("lock")?;
        let status = self.driver.lock();
        check("lock", status)
    }

    pub fn unlock(&mut self) -> Result<()> {
        self.require_connected("unlock")?;
        let status = self.driver.unlock();
        check("unlock", status)
    }

    /// Begin streaming. A no-op if already streaming.
    pub fn start(&mut self) -> Result<()> {
        match self.state {
            SessionState::Streaming => return Ok(()),
            SessionState::Connected => {}
            state => {
                return Err(IlidarError::InvalidState {
                    operation: "start",
                    state,
                })
            }
        }

        let status = self.driver.start();
        check("start", status)?;

        self.streaming.store(true, Ordering::Release);
        self.state = SessionState::Streaming;
        log::info!("Streaming started");
        Ok(())
    }

    /// Stop streaming. A no-op unless streaming.
    pub fn stop(&mut self) -> Result<()> {
        if self.state != SessionState::Streaming {
            return Ok(());
        }

        // Gate the frame path before the driver call so late frames are dropped.
        self.streaming.store(false, Ordering::Release);
        let status = self.driver.stop();
        if status != STATUS_OK {
            self.streaming.store(true, Ordering::Release);
            return check("stop", status);
        }

        self.state = SessionState::Connected;
        log::info!("Streaming stopped");
        Ok(())
    }

    /// Drop the sensor link, stopping first if needed. The host interface is
    /// kept for the next `connect`. A no-op when not connected.
    pub fn disconnect(&mut self) -> Result<()> {
        match self.state {
            SessionState::Streaming => self.stop()?,
            SessionState::Connected => {}
            _ => return Ok(()),
        }

        let status = self.driver.disconnect();
        check("disconnect", status)?;

        self.state = if self.interface_created {
            SessionState::InterfaceCreated
        } else {
            SessionState::Initialized
        };
        log::info!("Disconnected");
        Ok(())
    }

    /// Tear down the driver binding and release the buffer and frame worker.
    ///
    /// Safe from any state and idempotent. Local teardown always completes;
    /// a nonzero driver status is still reported afterwards. On that failure
    /// the driver keeps its share of the buffer, so memory it may still be
    /// writing into is never freed under it.
    pub fn destroy(&mut self) -> Result<()> {
        if self.state == SessionState::Uninitialized {
            self.interface_created = false;
            return Ok(());
        }

        self.streaming.store(false, Ordering::Release);
        let status = self.driver.destroy();

        if let Some(pipeline) = self.pipeline.take() {
            pipeline.stop();
        }
        self.buffer = None;
        self.endpoint = None;
        self.interface_created = false;
        self.state = SessionState::Uninitialized;

        if status != STATUS_OK {
            log::warn!("Driver destroy reported status {}", status);
        } else {
            log::info!("Session destroyed");
        }
        check("destroy", status)
    }

    fn require_connected(&self, operation: &'static str) -> Result<()> {
        if self.state.is_connected() {
            Ok(())
        } else {
            Err(IlidarError::InvalidState {
                operation,
                state: self.state,
            })
        }
    }
}

impl<D: Driver> Drop for DeviceSession<D> {
    fn drop(&mut self) {
        if let Err(e) = self.destroy() {
            log::warn!("Teardown on drop: {}", e);
        }
    }
}

fn check(command: &'static str, status: Status) -> Result<()> {
    if status == STATUS_OK {
        Ok(())
    } else {
        log::warn!("Driver {} failed (status {})", command, status);
        Err(IlidarError::CommandFailed { command, status })
    }
}
