//! In-memory driver for tests and demos without a sensor.

use crate::driver::{Driver, FrameNotifier, ReceiveBuffer, Status, STATUS_OK};
use crate::params::ParameterRecord;
use crate::protocol::PARAMS_LEN;
use parking_lot::Mutex;
use std::collections::HashMap;
use std::sync::Arc;

/// Driver entry points, as recorded by [`SimDriver`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum DriverOp {
    Init,
    CreateInterface,
    Connect,
    Disconnect,
    GetParams,
    SetParams,
    Store,
    Lock,
    Unlock,
    Start,
    Stop,
    Destroy,
}

/// Simulated driver.
///
/// Clones share state, so a test can keep one handle for inspection while
/// the session owns another. Every call is recorded; statuses can be forced
/// per operation with [`fail`](SimDriver::fail).
#[derive(Clone, Default)]
pub struct SimDriver {
    inner: Arc<Mutex<SimState>>,
}

struct SimState {
    calls: Vec<DriverOp>,
    statuses: HashMap<DriverOp, Status>,
    device_params: [u8; PARAMS_LEN],
    written_params: Option<[u8; PARAMS_LEN]>,
    interface: Option<([u8; 4], [u8; 4], u16)>,
    connected_to: Option<([u8; 4], u16)>,
    buffer: Option<ReceiveBuffer>,
    notifier: Option<FrameNotifier>,
}

impl Default for SimState {
    fn default() -> Self {
        Self {
            calls: Vec::new(),
            statuses: HashMap::new(),
            device_params: [0; PARAMS_LEN],
            written_params: None,
            interface: None,
            connected_to: None,
            buffer: None,
            notifier: None,
        }
    }
}

impl SimDriver {
    pub fn new() -> Self {
        Self::default()
    }

    /// Make `op` return `status` from now on (0 restores success).
    pub fn fail(&self, op: DriverOp, status: Status) {
        self.inner.lock().statuses.insert(op, status);
    }

    /// Contents returned by `get_params`.
    pub fn set_device_params(&self, record: &ParameterRecord) {
        self.inner.lock().device_params = record.encode();
    }

    pub fn calls(&self) -> Vec<DriverOp> {
        self.inner.lock().calls.clone()
    }

    pub fn count(&self, op: DriverOp) -> usize {
        self.inner.lock().calls.iter().filter(|&&c| c == op).count()
    }

    /// Last buffer accepted by `set_params`.
    pub fn written_params(&self) -> Option<[u8; PARAMS_LEN]> {
        self.inner.lock().written_params
    }

    /// `(broadcast_ip, host_ip, port)` of the created interface.
    pub fn interface(&self) -> Option<([u8; 4], [u8; 4], u16)> {
        self.inner.lock().interface
    }

    pub fn connected_to(&self) -> Option<([u8; 4], u16)> {
        self.inner.lock().connected_to
    }

    /// Whether a receive buffer is currently bound.
    pub fn is_bound(&self) -> bool {
        self.inner.lock().buffer.is_some()
    }

    /// Write `samples` into the bound buffer and post a frame-ready signal,
    /// as the real driver does from its receive thread. Returns false when
    /// nothing is bound.
    pub fn push_frame(&self, samples: &[u16]) -> bool {
        let state = self.inner.lock();
        match (&state.buffer, &state.notifier) {
            (Some(buffer), Some(notifier)) => {
                buffer.write_from(samples);
                notifier.notify();
                true
            }
            _ => false,
        }
    }

    fn record(&self, op: DriverOp) -> Status {
        let mut state = self.inner.lock();
        state.calls.push(op);
        state.statuses.get(&op).copied().unwrap_or(STATUS_OK)
    }
}

impl Driver for SimDriver {
    fn init(&mut self, buffer: ReceiveBuffer, notifier: FrameNotifier) -> Status {
        let status = self.record(DriverOp::Init);
        if status == STATUS_OK {
            let mut state = self.inner.lock();
            state.buffer = Some(buffer);
            state.notifier = Some(notifier);
        }
        status
    }

    fn create_interface(&mut self, broadcast_ip: [u8; 4], host_ip: [u8; 4], port: u16) -> Status {
        let status = self.record(DriverOp::CreateInterface);
        if status == STATUS_OK {
            self.inner.lock().interface = Some((broadcast_ip, host_ip, port));
        }
        status
    }

    fn connect(&mut self, sensor_ip: [u8; 4], port: u16) -> Status {
        let status = self.record(DriverOp::Connect);
        if status == STATUS_OK {
            self.inner.lock().connected_to = Some((sensor_ip, port));
        }
        status
    }

    fn disconnect(&mut self) -> Status {
        let status = self.record(DriverOp::Disconnect);
        if status == STATUS_OK {
            self.inner.lock().connected_to = None;
        }
        status
    }

    fn get_params(&mut self, buffer: &mut [u8; PARAMS_LEN]) -> Status {
        let status = self.record(DriverOp::GetParams);
        if status == STATUS_OK {
            *buffer = self.inner.lock().device_params;
        }
        status
    }

    fn set_params(&mut self, buffer: &[u8; PARAMS_LEN]) -> Status {
        let status = self.record(DriverOp::SetParams);
        if status == STATUS_OK {
            let mut state = self.inner.lock();
            state.written_params = Some(*buffer);
            state.device_params = *buffer;
        }
        status
    }

    fn store(&mut self) -> Status {
        self.record(DriverOp::Store)
    }

    fn lock(&mut self) -> Status {
        self.record(DriverOp::Lock)
    }

    fn unlock(&mut self) -> Status {
        self.record(DriverOp::Unlock)
    }

    fn start(&mut self) -> Status {
        self.record(DriverOp::Start)
    }

    fn stop(&mut self) -> Status {
        self.record(DriverOp::Stop)
    }

    fn destroy(&mut self) -> Status {
        let status = self.record(DriverOp::Destroy);
        let mut state = self.inner.lock();
        // A failed teardown leaves the receive path holding the buffer.
        if status == STATUS_OK {
            state.buffer = None;
        }
        state.notifier = None;
        state.interface = None;
        state.connected_to = None;
        status
    }
}
