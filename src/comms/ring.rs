//! Bounded, lossy, wait-free MPSC ring buffer.
//!
//! Producers draw a ticket with a single `fetch_add` and either publish into
//! the slot that ticket maps to or give up immediately; nobody ever spins
//! inside the queue. A per-slot token records whose turn the slot is, which
//! lets a producer tell "empty for my round" apart from "still holding the
//! previous round" after the counters wrap the ring many times over.

use std::cell::UnsafeCell;
use std::mem::MaybeUninit;
use std::sync::atomic::AtomicU64;
use std::sync::atomic::Ordering::{Acquire, Relaxed, Release};

use super::{CachePadded, MpscQueue};
use crate::FunnelError;

/// One ring slot.
///
/// The token is the single source of truth for the slot's state:
/// - `token == t`: empty, reserved for producer ticket `t`
/// - `token == t + 1`: holds an element awaiting the consumer
/// - `token == t + capacity`: empty again, reserved for the next round
struct Slot<T> {
    token: AtomicU64,
    value: UnsafeCell<MaybeUninit<T>>,
}

impl<T> Slot<T> {
    const fn new(token: u64) -> Self {
        Self {
            token: AtomicU64::new(token),
            value: UnsafeCell::new(MaybeUninit::uninit()),
        }
    }
}

/// Bounded lossy MPSC ring buffer.
///
/// Both sides are wait-free. A producer whose ticket finds its slot occupied
/// does not retry: the ticket is spent and the message comes straight back to
/// the caller. Capacity is fixed at construction and must be a power of two
/// no smaller than 2.
pub struct RingQueue<T> {
    slots: Box<[Slot<T>]>,
    mask: u64,
    /// Producer ticket counter. Monotonic, only the slot index wraps.
    head: CachePadded<AtomicU64>,
    /// Consumer position. Only the consumer thread advances it.
    tail: CachePadded<AtomicU64>,
}

impl<T> RingQueue<T> {
    /// Creates a ring with `capacity` slots.
    pub fn new(capacity: usize) -> Result<Self, FunnelError> {
        if capacity < 2 || !capacity.is_power_of_two() {
            return Err(FunnelError::InvalidCapacity(capacity));
        }
        let slots: Vec<Slot<T>> = (0..capacity as u64).map(Slot::new).collect();
        Ok(Self {
            slots: slots.into_boxed_slice(),
            mask: capacity as u64 - 1,
            head: CachePadded::new(AtomicU64::new(0)),
            tail: CachePadded::new(AtomicU64::new(0)),
        })
    }

    /// Fixed slot count of this ring.
    pub fn capacity(&self) -> usize {
        self.slots.len()
    }

    /// Attempts to enqueue a value.
    ///
    /// Draws a fresh ticket and publishes into its slot when the slot is free
    /// for this round. When the slot still holds the element from `capacity`
    /// tickets ago the value is handed back; the spent ticket is not
    /// re-issued.
    pub fn push(&self, value: T) -> Result<(), T> {
        let ticket = self.head.value.fetch_add(1, Relaxed);
        let slot = &self.slots[(ticket & self.mask) as usize];
        let token = slot.token.load(Acquire);
        if token != ticket {
            return Err(value);
        }
        // matching token means the consumer released this slot for exactly
        // this ticket, so we have exclusive write access
        unsafe {
            (*slot.value.get()).write(value);
        }
        slot.token.store(ticket.wrapping_add(1), Release);
        Ok(())
    }

    /// Dequeues the oldest element, if one is ready.
    ///
    /// Must only be called from the single consumer thread.
    pub fn try_pull(&self) -> Option<T> {
        let tail = self.tail.value.load(Relaxed);
        let slot = &self.slots[(tail & self.mask) as usize];
        let token = slot.token.load(Acquire);
        if token != tail.wrapping_add(1) {
            return None;
        }
        // token == tail + 1 means the producer finished publishing here
        let value = unsafe { (*slot.value.get()).assume_init_read() };
        slot.token
            .store(tail.wrapping_add(self.slots.len() as u64), Release);
        self.tail.value.store(tail.wrapping_add(1), Relaxed);
        Some(value)
    }
}

impl<T> MpscQueue<T> for RingQueue<T> {
    fn try_push(&self, value: T) -> Result<(), T> {
        self.push(value)
    }

    fn try_pull(&self) -> Option<T> {
        RingQueue::try_pull(self)
    }
}

impl<T> Drop for RingQueue<T> {
    fn drop(&mut self) {
        // drop whatever was published but never pulled; a refused ticket
        // leaves its slot token at `t`, which the filter skips
        let mut t = self.tail.value.load(Relaxed);
        let head = self.head.value.load(Relaxed);
        while t != head {
            let slot = &self.slots[(t & self.mask) as usize];
            if slot.token.load(Relaxed) == t.wrapping_add(1) {
                unsafe {
                    (*slot.value.get()).assume_init_drop();
                }
            }
            t = t.wrapping_add(1);
        }
    }
}

// SAFETY: slot contents are only touched by the producer or consumer that the
// token protocol hands the slot to; everything else is atomics. T itself
// crosses threads, so it must be Send.
unsafe impl<T: Send> Send for RingQueue<T> {}
unsafe impl<T: Send> Sync for RingQueue<T> {}
