//! Thread-safe byte FIFO shared between the pump and the consumer.
//!
//! The pump thread pushes every received payload; the consumer pops with an
//! optional deadline. A condition variable wakes blocked readers, so the
//! mutex guarding the bytes is never held across a wait.
//!
//! Besides data, the pump can [`interrupt`](ByteQueue::interrupt) a waiting
//! reader when the socket errors or closes. The interrupt carries no bytes;
//! it only lets a read return early instead of sitting out its timeout.

// ============================================================================
// Imports
// ============================================================================

use std::collections::VecDeque;
use std::time::Instant;

use parking_lot::{Condvar, Mutex};

// ============================================================================
// QueueState
// ============================================================================

/// Bytes plus the pending wake-up token, guarded together.
#[derive(Debug, Default)]
struct QueueState {
    bytes: VecDeque<u8>,
    /// Set by an error/close event, consumed by the next waiting read.
    interrupted: bool,
}

// ============================================================================
// ByteQueue
// ============================================================================

/// Unbounded FIFO of bytes with blocking-wait-on-empty semantics.
#[derive(Debug, Default)]
pub struct ByteQueue {
    state: Mutex<QueueState>,
    signal: Condvar,
}

impl ByteQueue {
    /// Creates an empty queue.
    #[inline]
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Appends `chunk` to the tail and wakes one waiting reader.
    ///
    /// Never blocks beyond the brief queue lock.
    pub fn push(&self, chunk: &[u8]) {
        if chunk.is_empty() {
            return;
        }
        self.state.lock().bytes.extend(chunk);
        self.signal.notify_one();
    }

    /// Wakes any waiting reader without enqueuing data.
    ///
    /// If nobody is waiting, the next blocking pop on an empty queue returns
    /// immediately with nothing.
    pub fn interrupt(&self) {
        self.state.lock().interrupted = true;
        self.signal.notify_all();
    }

    /// Removes up to `max` bytes, waiting until `deadline` if the queue is empty.
    ///
    /// Returns as soon as any bytes are present, without waiting to fill
    /// `max`. Returns an empty vector when the deadline passes or an
    /// interrupt arrives first.
    pub fn pop_until(&self, max: usize, deadline: Instant) -> Vec<u8> {
        self.pop_before(max, Some(deadline))
    }

    /// Same as [`pop_until`](Self::pop_until), but `None` waits with no
    /// deadline until bytes or an interrupt arrive.
    pub fn pop_before(&self, max: usize, deadline: Option<Instant>) -> Vec<u8> {
        let mut state = self.state.lock();

        while state.bytes.is_empty() && !state.interrupted {
            match deadline {
                Some(deadline) => {
                    if self.signal.wait_until(&mut state, deadline).timed_out() {
                        break;
                    }
                }
                None => self.signal.wait(&mut state),
            }
        }

        if state.bytes.is_empty() {
            state.interrupted = false;
            return Vec::new();
        }

        Self::take(&mut state.bytes, max)
    }

    /// Removes up to `max` bytes without waiting.
    pub fn pop_now(&self, max: usize) -> Vec<u8> {
        Self::take(&mut self.state.lock().bytes, max)
    }

    /// Discards all queued bytes and any pending interrupt.
    ///
    /// Used when a failed handshake abandons its socket.
    pub fn reset(&self) {
        let mut state = self.state.lock();
        state.bytes.clear();
        state.interrupted = false;
    }

    /// Returns the number of queued bytes.
    #[inline]
    #[must_use]
    pub fn len(&self) -> usize {
        self.state.lock().bytes.len()
    }

    /// Returns `true` if no bytes are queued.
    #[inline]
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.state.lock().bytes.is_empty()
    }

    fn take(bytes: &mut VecDeque<u8>, max: usize) -> Vec<u8> {
        let count = max.min(bytes.len());
        bytes.drain(..count).collect()
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    use std::sync::Arc;
    use std::thread;
    use std::time::Duration;

    use proptest::prelude::*;

    fn soon() -> Instant {
        Instant::now() + Duration::from_millis(50)
    }

    #[test]
    fn test_push_then_pop_returns_available_bytes() {
        let queue = ByteQueue::new();
        queue.push(b"abc");

        assert_eq!(queue.len(), 3);
        assert_eq!(queue.pop_until(10, soon()), b"abc");
        assert!(queue.is_empty());
    }

    #[test]
    fn test_pop_respects_max() {
        let queue = ByteQueue::new();
        queue.push(b"abcdef");

        assert_eq!(queue.pop_now(4), b"abcd");
        assert_eq!(queue.pop_now(4), b"ef");
        assert!(queue.pop_now(4).is_empty());
    }

    #[test]
    fn test_empty_push_is_ignored() {
        let queue = ByteQueue::new();
        queue.push(b"");
        assert!(queue.is_empty());
    }

    #[test]
    fn test_pop_until_times_out_on_empty_queue() {
        let queue = ByteQueue::new();
        let start = Instant::now();

        let data = queue.pop_until(8, Instant::now() + Duration::from_millis(100));

        assert!(data.is_empty());
        assert!(start.elapsed() >= Duration::from_millis(100));
        assert!(start.elapsed() < Duration::from_secs(2));
    }

    #[test]
    fn test_pop_until_wakes_on_push() {
        let queue = Arc::new(ByteQueue::new());
        let producer = Arc::clone(&queue);

        let handle = thread::spawn(move || {
            thread::sleep(Duration::from_millis(50));
            producer.push(b"hi");
        });

        let start = Instant::now();
        let data = queue.pop_until(8, Instant::now() + Duration::from_secs(5));
        handle.join().expect("producer thread");

        assert_eq!(data, b"hi");
        assert!(start.elapsed() < Duration::from_secs(2));
    }

    #[test]
    fn test_interrupt_releases_waiter_without_data() {
        let queue = Arc::new(ByteQueue::new());
        let producer = Arc::clone(&queue);

        let handle = thread::spawn(move || {
            thread::sleep(Duration::from_millis(50));
            producer.interrupt();
        });

        let start = Instant::now();
        let data = queue.pop_until(8, Instant::now() + Duration::from_secs(5));
        handle.join().expect("producer thread");

        assert!(data.is_empty());
        assert!(start.elapsed() < Duration::from_secs(2));
        assert!(queue.is_empty());
    }

    #[test]
    fn test_pop_without_deadline_waits_for_push() {
        let queue = Arc::new(ByteQueue::new());
        let producer = Arc::clone(&queue);

        let handle = thread::spawn(move || {
            thread::sleep(Duration::from_millis(50));
            producer.push(b"late");
        });

        let data = queue.pop_before(8, None);
        handle.join().expect("producer thread");

        assert_eq!(data, b"late");
    }

    #[test]
    fn test_pop_without_deadline_released_by_interrupt() {
        let queue = Arc::new(ByteQueue::new());
        let producer = Arc::clone(&queue);

        let handle = thread::spawn(move || {
            thread::sleep(Duration::from_millis(50));
            producer.interrupt();
        });

        let start = Instant::now();
        let data = queue.pop_before(8, None);
        handle.join().expect("producer thread");

        assert!(data.is_empty());
        assert!(start.elapsed() < Duration::from_secs(2));
    }

    #[test]
    fn test_interrupt_is_consumed_once() {
        let queue = ByteQueue::new();
        queue.interrupt();

        assert!(queue.pop_until(8, Instant::now() + Duration::from_secs(5)).is_empty());

        let start = Instant::now();
        assert!(queue.pop_until(8, Instant::now() + Duration::from_millis(80)).is_empty());
        assert!(start.elapsed() >= Duration::from_millis(80));
    }

    #[test]
    fn test_interrupt_does_not_hide_queued_data() {
        let queue = ByteQueue::new();
        queue.push(b"ok");
        queue.interrupt();

        assert_eq!(queue.pop_until(8, soon()), b"ok");
    }

    #[test]
    fn test_reset_clears_bytes_and_interrupt() {
        let queue = ByteQueue::new();
        queue.push(b"stale");
        queue.interrupt();
        queue.reset();

        assert!(queue.is_empty());
        let start = Instant::now();
        assert!(queue.pop_until(8, Instant::now() + Duration::from_millis(60)).is_empty());
        assert!(start.elapsed() >= Duration::from_millis(60));
    }

    proptest! {
        #[test]
        fn prop_fifo_order_is_preserved(
            chunks in prop::collection::vec(prop::collection::vec(any::<u8>(), 0..32), 0..16),
            read_size in 1usize..40,
        ) {
            let queue = ByteQueue::new();
            for chunk in &chunks {
                queue.push(chunk);
            }

            let expected: Vec<u8> = chunks.concat();
            prop_assert_eq!(queue.len(), expected.len());

            let mut drained = Vec::new();
            loop {
                let part = queue.pop_now(read_size);
                if part.is_empty() {
                    break;
                }
                prop_assert!(part.len() <= read_size);
                drained.extend(part);
            }

            prop_assert_eq!(drained, expected);
            prop_assert!(queue.is_empty());
        }
    }
}
