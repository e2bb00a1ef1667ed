//! Binding to the vendor `libilidar` driver.
//!
//! The library keeps global state: one receive buffer, one callback, one
//! interface per process. Its callback carries no user-data pointer, so the
//! active [`FrameNotifier`] lives in a process-wide slot that the trampoline
//! reads. The slot is cleared on `destroy`; a callback that fires after that
//! finds it empty and does nothing.
//!
//! SAFETY for every `ilidar_*` call below: pointer arguments come from
//! fixed-size arrays or the bound [`ReceiveBuffer`], are valid for the length
//! the library reads or writes, and are not retained past the call except
//! for the receive buffer, which stays alive until `ilidar_destroy` succeeds.

use crate::driver::{Driver, FrameNotifier, ReceiveBuffer, Status};
use crate::protocol::PARAMS_LEN;
use crate::{IlidarError, Result};
use parking_lot::Mutex;
use std::ffi::{c_int, c_void};
use std::sync::atomic::{AtomicBool, Ordering};

type FrameCallback = extern "C" fn(*mut c_void);

#[cfg_attr(windows, link(name = "libilidar"))]
#[cfg_attr(not(windows), link(name = "ilidar"))]
extern "C" {
    fn ilidar_init(img_ptr: *mut u16, callback: FrameCallback) -> c_int;
    fn ilidar_create(dest_ip: *const u8, src_ip: *const u8, port: u16) -> c_int;
    fn ilidar_destroy() -> c_int;
    fn ilidar_connect(sensor_ip: *const u8, port: u16) -> c_int;
    fn ilidar_disconnect() -> c_int;
    fn ilidar_get_params(buffer: *mut u8) -> c_int;
    fn ilidar_set_params(buffer: *const u8) -> c_int;
    fn ilidar_store() -> c_int;
    fn ilidar_lock() -> c_int;
    fn ilidar_unlock() -> c_int;
    fn ilidar_start() -> c_int;
    fn ilidar_stop() -> c_int;
}

/// Notifier for the currently bound session, if any.
static FRAME_NOTIFIER: Mutex<Option<FrameNotifier>> = parking_lot::const_mutex(None);

/// Set while a `NativeDriver` exists.
static CLAIMED: AtomicBool = AtomicBool::new(false);

extern "C" fn on_frame(_img: *mut c_void) {
    // Runs on the driver's receive thread.
    if let Some(notifier) = FRAME_NOTIFIER.lock().as_ref() {
        notifier.notify();
    }
}

/// The production [`Driver`], backed by `libilidar`.
///
/// Only one may exist per process, matching the library's global state.
pub struct NativeDriver {
    /// Keeps the buffer the library writes into alive until `destroy`.
    buffer: Option<ReceiveBuffer>,
}

impl NativeDriver {
    pub fn new() -> Result<NativeDriver> {
        if CLAIMED.swap(true, Ordering::AcqRel) {
            return Err(IlidarError::DriverInUse);
        }
        Ok(NativeDriver { buffer: None })
    }
}

impl Drop for NativeDriver {
    fn drop(&mut self) {
        if self.buffer.is_some() {
            // The library must stop writing before the buffer is freed.
            let status = self.destroy();
            if status != 0 {
                log::warn!("ilidar_destroy on drop returned {}, leaking receive buffer", status);
                // The library may still write through `img_ptr`.
                std::mem::forget(self.buffer.take());
            }
        }
        CLAIMED.store(false, Ordering::Release);
    }
}

impl Driver for NativeDriver {
    fn init(&mut self, buffer: ReceiveBuffer, notifier: FrameNotifier) -> Status {
        *FRAME_NOTIFIER.lock() = Some(notifier);
        // SAFETY: the buffer holds BUFFER_LEN samples and is kept alive in
        // `self.buffer` until `ilidar_destroy` succeeds.
        let status = unsafe { ilidar_init(buffer.as_mut_ptr(), on_frame) };
        if status == 0 {
            self.buffer = Some(buffer);
        } else {
            FRAME_NOTIFIER.lock().take();
        }
        status
    }

    fn create_interface(&mut self, broadcast_ip: [u8; 4], host_ip: [u8; 4], port: u16) -> Status {
        // SAFETY: both addresses are 4-byte arrays read during the call.
        unsafe { ilidar_create(broadcast_ip.as_ptr(), host_ip.as_ptr(), port) }
    }

    fn connect(&mut self, sensor_ip: [u8; 4], port: u16) -> Status {
        // SAFETY: 4-byte address read during the call.
        unsafe { ilidar_connect(sensor_ip.as_ptr(), port) }
    }

    fn disconnect(&mut self) -> Status {
        unsafe { ilidar_disconnect() }
    }

    fn get_params(&mut self, buffer: &mut [u8; PARAMS_LEN]) -> Status {
        // SAFETY: the library writes exactly PARAMS_LEN bytes.
        unsafe { ilidar_get_params(buffer.as_mut_ptr()) }
    }

    fn set_params(&mut self, buffer: &[u8; PARAMS_LEN]) -> Status {
        // SAFETY: the library reads exactly PARAMS_LEN bytes.
        unsafe { ilidar_set_params(buffer.as_ptr()) }
    }

    fn store(&mut self) -> Status {
        unsafe { ilidar_store() }
    }

    fn lock(&mut self) -> Status {
        unsafe { ilidar_lock() }
    }

    fn unlock(&mut self) -> Status {
        unsafe { ilidar_unlock() }
    }

    fn start(&mut self) -> Status {
        unsafe { ilidar_start() }
    }

    fn stop(&mut self) -> Status {
        unsafe { ilidar_stop() }
    }

    fn destroy(&mut self) -> Status {
        let status = unsafe { ilidar_destroy() };
        FRAME_NOTIFIER.lock().take();
        if status == 0 {
            self.buffer = None;
        } else {
            // Teardown failed; the receive thread may still write into it.
            log::warn!("ilidar_destroy returned {}, receive buffer stays bound", status);
        }
        status
    }
}
