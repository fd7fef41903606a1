//! Logger facade over the MPSC transports.

use std::hint;
use std::io::Write;
use std::sync::atomic::AtomicBool;
use std::sync::atomic::Ordering::{Acquire, Release};
use std::sync::Arc;

use crate::comms::linked::LinkedQueue;
use crate::comms::ring::RingQueue;
use crate::comms::MpscQueue;
use crate::FunnelError;

/// Default slot count for the bounded transport.
pub const DEFAULT_CAPACITY: usize = 16 * 1024 * 1024;

/// Cooperative cancellation handle.
///
/// Clones share one flag; once cancelled it stays cancelled.
#[derive(Clone, Debug, Default)]
pub struct CancelToken {
    flag: Arc<AtomicBool>,
}

impl CancelToken {
    pub fn new() -> Self {
        Self::default()
    }

    /// Requests cancellation.
    pub fn cancel(&self) {
        self.flag.store(true, Release);
    }

    /// True once `cancel` has been called on any clone.
    pub fn is_cancelled(&self) -> bool {
        self.flag.load(Acquire)
    }
}

/// Thread-safe logger over a pluggable MPSC transport.
///
/// Any number of threads may [`post`](Logger::post); exactly one thread
/// drives [`run`](Logger::run).
pub struct Logger<Q> {
    queue: Q,
}

impl Logger<RingQueue<String>> {
    /// Logger over the bounded ring transport.
    ///
    /// Size the capacity well above the expected backlog. `post` keeps
    /// retrying a full ring, and the ring never re-issues a refused ticket,
    /// so a ring that actually fills up stops delivering.
    pub fn bounded(capacity: usize) -> Result<Self, FunnelError> {
        Ok(Self::new(RingQueue::new(capacity)?))
    }
}

impl Logger<LinkedQueue<String>> {
    /// Logger over the unbounded linked transport.
    pub fn unbounded() -> Self {
        Self::new(LinkedQueue::new())
    }
}

impl<Q: MpscQueue<String>> Logger<Q> {
    /// Wraps an already-constructed transport.
    pub fn new(queue: Q) -> Self {
        Self { queue }
    }

    /// Queues a message, spinning until the transport accepts it.
    ///
    /// On the linked transport the first attempt always succeeds.
    pub fn post(&self, text: String) {
        let mut msg = text;
        while let Err(back) = self.queue.try_push(msg) {
            hint::spin_loop();
            msg = back;
        }
    }

    /// Drains messages into `sink` until `cancel` fires.
    ///
    /// Called from exactly one thread. The token is checked between drain
    /// cycles only: every message pulled before cancellation is observed gets
    /// written, anything still queued afterwards stays in the queue.
    pub fn run<W: Write>(&self, cancel: &CancelToken, sink: &mut W) -> Result<(), FunnelError> {
        while !cancel.is_cancelled() {
            while let Some(msg) = self.queue.try_pull() {
                sink.write_all(msg.as_bytes())?;
            }
        }
        Ok(())
    }
}

/// Writes `text` and a trailing newline to stdout and flushes, holding the
/// stdout lock for the whole write. Handy while debugging producer code.
pub fn print(text: &str) -> Result<(), FunnelError> {
    let mut out = std::io::stdout().lock();
    out.write_all(text.as_bytes())?;
    out.write_all(b"\n")?;
    out.flush()?;
    Ok(())
}
