//! Thread-safe logging built directly on the crate's MPSC transports.
//!
//! The logger here is a deliberately thin composition: producers post owned
//! text from any thread, a single consumer drains the queue into a byte sink
//! until its cancel token fires.

pub mod logger;
