//! The capability boundary to the sensor driver.
//!
//! The driver owns the network protocol. This crate only sees the small set
//! of calls below, each returning a C-style status (0 = success). The
//! production implementation is `ffi::NativeDriver` (feature `native`);
//! [`SimDriver`](crate::sim::SimDriver) stands in for it without hardware.

use crate::protocol::{BUFFER_LEN, BUFFER_WIDTH, DEPTH_HEIGHT, DEPTH_WIDTH, PARAMS_LEN};
use crossbeam_channel::{Sender, TrySendError};
use std::sync::atomic::{AtomicBool, AtomicU16, Ordering};
use std::sync::Arc;

/// Driver call result. Zero is success; any other value is a failure with
/// no further meaning.
pub type Status = i32;

pub const STATUS_OK: Status = 0;

/// The 320x320 grid of u16 millimeter samples the driver fills in place.
///
/// Allocated once and never resized. Samples are atomics so the driver
/// thread can overwrite frame N+1 while frame N is still being read: a
/// reader may see a mix of two frames, but never out-of-bounds or
/// undefined memory.
pub struct ReceiveBuffer {
    samples: Arc<[AtomicU16]>,
}

impl ReceiveBuffer {
    pub fn new() -> Self {
        Self {
            samples: (0..BUFFER_LEN).map(|_| AtomicU16::new(0)).collect(),
        }
    }

    /// Another handle to the same storage.
    pub(crate) fn share(&self) -> Self {
        Self {
            samples: Arc::clone(&self.samples),
        }
    }

    pub fn len(&self) -> usize {
        self.samples.len()
    }

    pub fn is_empty(&self) -> bool {
        self.samples.is_empty()
    }

    /// Base pointer for foreign drivers. `AtomicU16` has the same layout as
    /// `u16`; the pointee stays valid while any handle is alive.
    pub fn as_mut_ptr(&self) -> *mut u16 {
        self.samples.as_ptr() as *mut u16
    }

    pub fn load(&self, index: usize) -> u16 {
        self.samples[index].load(Ordering::Relaxed)
    }

    pub fn store(&self, index: usize, value: u16) {
        self.samples[index].store(value, Ordering::Relaxed);
    }

    /// Overwrite from the start of the buffer; excess input is ignored.
    pub fn write_from(&self, samples: &[u16]) {
        for (slot, &value) in self.samples.iter().zip(samples) {
            slot.store(value, Ordering::Relaxed);
        }
    }

    /// Copy the usable depth field (top 320x160 rows) into `out`.
    pub fn copy_depth_field(&self, out: &mut Vec<u16>) {
        out.clear();
        out.extend(
            self.samples[..DEPTH_HEIGHT * BUFFER_WIDTH]
                .chunks_exact(BUFFER_WIDTH)
                .flat_map(|row| row[..DEPTH_WIDTH].iter())
                .map(|s| s.load(Ordering::Relaxed)),
        );
    }
}

impl Default for ReceiveBuffer {
    fn default() -> Self {
        Self::new()
    }
}

/// Handle the driver uses to announce that the buffer holds a new frame.
///
/// Cheap to clone and safe to call from any thread. At most one
/// notification is ever pending: if the consumer has not picked up the last
/// one, a new signal is absorbed into it, since both point at the same
/// (newest) buffer contents. Signals outside streaming are dropped.
#[derive(Clone)]
pub struct FrameNotifier {
    signal: Sender<()>,
    streaming: Arc<AtomicBool>,
}

impl FrameNotifier {
    pub(crate) fn new(signal: Sender<()>, streaming: Arc<AtomicBool>) -> Self {
        Self { signal, streaming }
    }

    /// Post a frame-ready signal. Never blocks.
    pub fn notify(&self) {
        if !self.streaming.load(Ordering::Acquire) {
            log::trace!("Frame notification while not streaming, dropped");
            return;
        }
        match self.signal.try_send(()) {
            Ok(()) => {}
            Err(TrySendError::Full(())) => {
                log::trace!("Frame still pending, coalesced");
            }
            Err(TrySendError::Disconnected(())) => {
                log::trace!("Frame pipeline gone, notification dropped");
            }
        }
    }
}

/// Operations exposed by the sensor driver.
///
/// Calls may block until the driver's own timeout; there is no cancellation.
pub trait Driver: Send {
    /// Bind the receive buffer and frame notifier. The driver keeps both
    /// until [`destroy`](Driver::destroy).
    fn init(&mut self, buffer: ReceiveBuffer, notifier: FrameNotifier) -> Status;

    /// Create the local UDP endpoint on `host_ip:port`, using `broadcast_ip`
    /// for discovery.
    fn create_interface(&mut self, broadcast_ip: [u8; 4], host_ip: [u8; 4], port: u16) -> Status;

    fn connect(&mut self, sensor_ip: [u8; 4], port: u16) -> Status;

    fn disconnect(&mut self) -> Status;

    fn get_params(&mut self, buffer: &mut [u8; PARAMS_LEN]) -> Status;

    fn set_params(&mut self, buffer: &[u8; PARAMS_LEN]) -> Status;

    /// Persist the active configuration to the sensor's flash.
    fn store(&mut self) -> Status;

    fn lock(&mut self) -> Status;

    fn unlock(&mut self) -> Status;

    fn start(&mut self) -> Status;

    fn stop(&mut self) -> Status;

    /// Release the interface, buffer and notifier.
    fn destroy(&mut self) -> Status;
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::protocol::BUFFER_HEIGHT;

    #[test]
    fn test_buffer_geometry() {
        let buf = ReceiveBuffer::new();
        assert_eq!(buf.len(), BUFFER_WIDTH * BUFFER_HEIGHT);
        assert_eq!(buf.load(buf.len() - 1), 0);
    }

    #[test]
    fn test_shared_handles_see_writes() {
        let buf = ReceiveBuffer::new();
        let other = buf.share();
        other.store(5, 1234);
        assert_eq!(buf.load(5), 1234);
        assert_eq!(buf.as_mut_ptr(), other.as_mut_ptr());
    }

    #[test]
    fn test_copy_depth_field_takes_top_rows() {
        let buf = ReceiveBuffer::new();
        let data: Vec<u16> = (0..BUFFER_LEN).map(|i| (i / BUFFER_WIDTH) as u16).collect();
        buf.write_from(&data);

        let mut field = Vec::new();
        buf.copy_depth_field(&mut field);
        assert_eq!(field.len(), DEPTH_WIDTH * DEPTH_HEIGHT);
        assert_eq!(field[0], 0);
        assert_eq!(*field.last().unwrap(), (DEPTH_HEIGHT - 1) as u16);
    }

    #[test]
    fn test_notifier_gated_and_coalescing() {
        let (tx, rx) = crossbeam_channel::bounded(1);
        let streaming = Arc::new(AtomicBool::new(false));
        let notifier = FrameNotifier::new(tx, streaming.clone());

        notifier.notify();
        assert!(rx.try_recv().is_err());

        streaming.store(true, Ordering::Release);
        notifier.notify();
        notifier.notify();
        notifier.notify();
        assert!(rx.try_recv().is_ok());
        assert!(rx.try_recv().is_err());
    }
}
