use std::collections::VecDeque;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Condvar, Mutex, MutexGuard, PoisonError};
use std::time::Duration;

use crate::event::KeyEvent;

/// Unbounded FIFO of pending key events shared by the producer and the
/// consumer loop.
///
/// Every push and pop happens under one mutex; the consumer never holds it
/// while dispatching, so producers are only ever delayed by another queue
/// operation.
#[derive(Debug, Default)]
pub struct EventBuffer {
    queue: Mutex<VecDeque<KeyEvent>>,
    available: Condvar,
    len: AtomicUsize,
}

impl EventBuffer {
    pub fn new() -> Self {
        Self::default()
    }

    /// Appends to the tail and wakes an idle consumer.
    pub fn enqueue(&self, event: KeyEvent) {
        {
            let mut queue = self.lock();
            queue.push_back(event);
            self.len.store(queue.len(), Ordering::Release);
        }
        self.available.notify_one();
    }

    /// Removes the head, if any.
    pub fn drain_one(&self) -> Option<KeyEvent> {
        let mut queue = self.lock();
        let event = queue.pop_front();
        self.len.store(queue.len(), Ordering::Release);
        event
    }

    /// Removes the head, waiting up to `timeout` for one to arrive.
    pub fn drain_timeout(&self, timeout: Duration) -> Option<KeyEvent> {
        let mut queue = self.lock();
        if queue.is_empty() {
            queue = self
                .available
                .wait_timeout(queue, timeout)
                .map(|(guard, _)| guard)
                .unwrap_or_else(|poisoned| poisoned.into_inner().0);
        }
        let event = queue.pop_front();
        self.len.store(queue.len(), Ordering::Release);
        event
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.len.load(Ordering::Acquire)
    }

    /// Drops every pending event and returns how many there were.
    pub fn clear(&self) -> usize {
        let mut queue = self.lock();
        let dropped = queue.len();
        queue.clear();
        self.len.store(0, Ordering::Release);
        dropped
    }

    /// Wakes any consumer blocked in [`EventBuffer::drain_timeout`].
    pub fn wake(&self) {
        self.available.notify_all();
    }

    fn lock(&self) -> MutexGuard<'_, VecDeque<KeyEvent>> {
        self.queue.lock().unwrap_or_else(PoisonError::into_inner)
    }
}
