//! Multi-producer, single-consumer (MPSC) queue transports.
//!
//! This module provides two lock-free queues sharing one contract: the `ring`
//! submodule contains a bounded wait-free ring buffer that refuses messages
//! when full, while `linked` provides an unbounded Michael-Scott style queue
//! that allocates a node per message. Both accept any number of concurrent
//! producers and exactly one consumer thread.
pub mod linked;
pub mod ring;

/// Capability contract shared by both queue variants.
///
/// `try_push` may refuse a message and hands it back to the caller when it
/// does; `try_pull` must only ever be called from the single consumer thread.
pub trait MpscQueue<T> {
    /// Attempts to enqueue a value, returning it on refusal.
    fn try_push(&self, value: T) -> Result<(), T>;
    /// Dequeues the oldest available value, if any. Single consumer only.
    fn try_pull(&self) -> Option<T>;
}

/// Pads a value out to a full cache line so the producer and consumer
/// counters never share one.
#[repr(align(64))]
pub(crate) struct CachePadded<T> {
    pub(crate) value: T,
}

impl<T> CachePadded<T> {
    pub(crate) const fn new(value: T) -> Self {
        CachePadded { value }
    }
}
