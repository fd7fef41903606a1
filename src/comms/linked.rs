//! Unbounded MPSC linked queue with a dummy sentinel node.
//!
//! Producers race on a single atomic head exchange, then link their node
//! behind the previous tip. Between the exchange and the link the chain is
//! briefly broken from the consumer's side; the consumer reads the missing
//! link as "nothing yet" and picks the element up on a later poll.

use std::ptr::null_mut;
use std::sync::atomic::AtomicPtr;
use std::sync::atomic::Ordering::{AcqRel, Acquire, Relaxed, Release};

use super::MpscQueue;

struct Node<T> {
    next: AtomicPtr<Node<T>>,
    data: Option<T>,
}

impl<T> Node<T> {
    fn boxed(data: Option<T>) -> *mut Self {
        Box::into_raw(Box::new(Node {
            next: AtomicPtr::new(null_mut()),
            data,
        }))
    }
}

/// Unbounded MPSC queue in the Michael-Scott style.
///
/// `head` points at the newest node, `tail` at the oldest. The node under
/// `tail` is a spent sentinel; the logical content is the chain from
/// `tail.next` up to `head`. Exactly one thread may pull, clear, or drop the
/// queue.
pub struct LinkedQueue<T> {
    /// Newest node. Producers exchange this.
    head: AtomicPtr<Node<T>>,
    /// Oldest node, the sentinel. Consumer side only.
    tail: AtomicPtr<Node<T>>,
}

impl<T> LinkedQueue<T> {
    /// Creates an empty queue holding a single sentinel node.
    pub fn new() -> Self {
        let dummy = Node::boxed(None);
        Self {
            head: AtomicPtr::new(dummy),
            tail: AtomicPtr::new(dummy),
        }
    }

    /// Enqueues a value. Never refuses; allocates one node per call.
    pub fn push(&self, value: T) {
        let node = Node::boxed(Some(value));
        let prev_head = self.head.swap(node, AcqRel);
        // SAFETY: prev_head is the sentinel or an earlier pushed node. Its
        // `next` is still null, so the consumer cannot move past it and free
        // it before this store lands.
        unsafe {
            (*prev_head).next.store(node, Release);
        }
    }

    /// Dequeues the oldest value, if any. Single consumer only.
    pub fn pull(&self) -> Option<T> {
        let tail = self.tail.load(Relaxed);
        // SAFETY: tail always points at the live sentinel node.
        let next = unsafe { (*tail).next.load(Acquire) };
        if next.is_null() {
            return None;
        }
        // SAFETY: the acquire load above pairs with the producer's release
        // link, so the node behind `next` is fully constructed. Only this
        // thread takes payloads out.
        let value = unsafe { (*next).data.take() };
        self.tail.store(next, Release);
        // SAFETY: the old sentinel is unreachable from tail now, and
        // producers never revisit nodes they have already linked past.
        unsafe {
            drop(Box::from_raw(tail));
        }
        value
    }

    /// Discards everything queued, leaving the newest node as the sentinel.
    /// Single consumer only.
    pub fn clear(&self) {
        let mut tail = self.tail.load(Relaxed);
        loop {
            // SAFETY: tail is the live sentinel or a node we just advanced to.
            let next = unsafe { (*tail).next.load(Acquire) };
            if next.is_null() {
                break;
            }
            self.tail.store(next, Release);
            // SAFETY: detached and unreachable from the new tail; undelivered
            // payloads go down with their node.
            unsafe {
                drop(Box::from_raw(tail));
            }
            tail = next;
        }
    }
}

impl<T> Default for LinkedQueue<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T> MpscQueue<T> for LinkedQueue<T> {
    fn try_push(&self, value: T) -> Result<(), T> {
        self.push(value);
        Ok(())
    }

    fn try_pull(&self) -> Option<T> {
        self.pull()
    }
}

impl<T> Drop for LinkedQueue<T> {
    fn drop(&mut self) {
        self.clear();
        // SAFETY: after clear a single sentinel remains and nobody else can
        // reach the queue any more.
        unsafe {
            drop(Box::from_raw(self.tail.load(Relaxed)));
        }
    }
}

// SAFETY: producers only race on the atomic head exchange and the next link;
// the consumer alone advances tail and frees nodes it has moved past.
unsafe impl<T: Send> Send for LinkedQueue<T> {}
unsafe impl<T: Send> Sync for LinkedQueue<T> {}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;
    use std::thread;

    struct Counted(Arc<AtomicUsize>);

    impl Drop for Counted {
        fn drop(&mut self) {
            self.0.fetch_add(1, Ordering::Relaxed);
        }
    }

    #[test]
    fn pull_on_empty_returns_none() {
        let q = LinkedQueue::<String>::new();
        assert_eq!(q.pull(), None);
    }

    #[test]
    fn round_trips_in_order() {
        let q = LinkedQueue::new();
        for msg in ["x", "y", "z"] {
            q.push(msg.to_string());
        }
        for expected in ["x", "y", "z"] {
            assert_eq!(q.pull().as_deref(), Some(expected));
        }
        assert_eq!(q.pull(), None);
    }

    #[test]
    fn drain_then_clear_then_reuse() {
        let q = LinkedQueue::new();
        for msg in ["x", "y", "z"] {
            q.push(msg.to_string());
        }
        assert_eq!(q.pull().as_deref(), Some("x"));
        q.clear();
        assert_eq!(q.pull(), None);
        // the sentinel left behind still chains correctly
        q.push("w".to_string());
        assert_eq!(q.pull().as_deref(), Some("w"));
        assert_eq!(q.pull(), None);
    }

    #[test]
    fn payloads_drop_exactly_once() {
        let drops = Arc::new(AtomicUsize::new(0));
        let q = LinkedQueue::new();
        for _ in 0..5 {
            q.push(Counted(Arc::clone(&drops)));
        }
        // two delivered and dropped here, three freed by the queue itself
        drop(q.pull());
        drop(q.pull());
        assert_eq!(drops.load(Ordering::Relaxed), 2);
        drop(q);
        assert_eq!(drops.load(Ordering::Relaxed), 5);
    }

    #[test]
    fn single_producer_stream_is_strictly_ordered() {
        const MESSAGES: usize = 10_000;
        let q = Arc::new(LinkedQueue::new());

        let producer = {
            let q = Arc::clone(&q);
            thread::spawn(move || {
                for i in 0..MESSAGES {
                    q.push(i);
                }
            })
        };

        let mut expected = 0;
        while expected < MESSAGES {
            match q.pull() {
                Some(i) => {
                    assert_eq!(i, expected);
                    expected += 1;
                }
                None => thread::yield_now(),
            }
        }
        producer.join().unwrap();
        assert_eq!(q.pull(), None);
    }

    #[test]
    fn concurrent_producers_keep_their_own_order() {
        const PRODUCERS: usize = 4;
        const PER_PRODUCER: usize = 2500;
        let q = Arc::new(LinkedQueue::new());

        let mut handles = Vec::new();
        for p in 0..PRODUCERS {
            let q = Arc::clone(&q);
            handles.push(thread::spawn(move || {
                for i in 0..PER_PRODUCER {
                    q.push((p, i));
                }
            }));
        }

        let mut got = Vec::with_capacity(PRODUCERS * PER_PRODUCER);
        while got.len() < PRODUCERS * PER_PRODUCER {
            match q.pull() {
                Some(pair) => got.push(pair),
                None => thread::yield_now(),
            }
        }
        for h in handles {
            h.join().unwrap();
        }

        let mut next_seq = [0usize; PRODUCERS];
        for (p, i) in got {
            assert_eq!(i, next_seq[p], "producer {p} out of order");
            next_seq[p] += 1;
        }
        for n in next_seq {
            assert_eq!(n, PER_PRODUCER);
        }
    }
}
