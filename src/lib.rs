//! Lock-free multi-producer, single-consumer message queues and a thin
//! logging facade built on top of them.
//!
//! Two interchangeable transports live in [`comms`]: a bounded, lossy,
//! wait-free ring buffer and an unbounded linked queue. [`logging`] pairs
//! either transport with a byte sink and a cooperative cancel token.

use std::fmt::Display;

use thiserror::Error;

pub mod comms;
pub mod logging;

/// Wrapper type for `std::io::Error`
#[derive(Debug, Error)]
pub struct IoError(std::io::Error);

impl PartialEq for IoError {
    fn eq(&self, other: &Self) -> bool {
        self.0.kind() == other.0.kind()
    }
}

impl Eq for IoError {}
impl Display for IoError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Error type for all primitives
#[derive(Debug, Error, PartialEq, Eq)]
pub enum FunnelError {
    #[error("Ring capacity must be a power of two no smaller than 2, got {0}")]
    InvalidCapacity(usize),
    #[error("I/O error while writing to the sink: {err}")]
    Io {
        #[from]
        err: IoError,
    },
}

impl From<std::io::Error> for FunnelError {
    fn from(err: std::io::Error) -> Self {
        FunnelError::Io { err: IoError(err) }
    }
}
