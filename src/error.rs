use std::net::Ipv4Addr;

use crate::types::{RejectReason, SessionState};

/// Errors that can occur when controlling an iTFS sensor.
///
/// Every variant is recoverable: the session stays usable and the caller
/// decides whether to retry, correct its input, or tear down.
#[derive(Debug, thiserror::Error)]
pub enum IlidarError {
    #[error("Parameter record truncated: need 166 bytes, got {len}")]
    DecodeTruncated { len: usize },

    #[error("Session already initialized")]
    AlreadyInitialized,

    #[error("Native driver already in use by another session")]
    DriverInUse,

    #[error("Driver init failed (status {0})")]
    InitFailed(i32),

    #[error("No host interface on the same subnet as {0}")]
    NetworkUnreachable(Ipv4Addr),

    #[error("Failed to enumerate host interfaces: {0}")]
    InterfaceEnumeration(#[source] std::io::Error),

    #[error("Driver interface creation failed (status {0})")]
    InterfaceCreateFailed(i32),

    #[error("Sensor connect failed (status {0})")]
    ConnectFailed(i32),

    #[error("Parameter read failed (status {0})")]
    ReadFailure(i32),

    #[error("Parameter write rejected: {0}")]
    WriteRejected(RejectReason),

    #[error("Parameter write failed (status {0})")]
    WriteFailure(i32),

    #[error("Driver {command} failed (status {status})")]
    CommandFailed { command: &'static str, status: i32 },

    #[error("Cannot {operation} while {state:?}")]
    InvalidState {
        operation: &'static str,
        state: SessionState,
    },

    #[error("Failed to spawn frame worker: {0}")]
    WorkerSpawn(#[source] std::io::Error),
}
