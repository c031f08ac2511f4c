use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

use crate::event::{KeyEvent, RawKeyEvent};

use super::EventBuffer;

/// Receiver of raw key notifications from a capture source.
///
/// Called on the capture source's own thread; implementations must hand the
/// event off and return without blocking.
pub trait RawKeySink: Send + Sync {
    fn on_raw_key_event(&self, raw: RawKeyEvent);
}

/// Hands raw notifications over to the [`EventBuffer`].
#[derive(Debug, Clone)]
pub struct EventProducer {
    buffer: Arc<EventBuffer>,
    received: Arc<AtomicU64>,
}

impl EventProducer {
    pub fn new(buffer: Arc<EventBuffer>) -> Self {
        Self {
            buffer,
            received: Arc::new(AtomicU64::new(0)),
        }
    }

    /// Queues an already built event.
    #[inline]
    pub fn push(&self, event: KeyEvent) {
        self.buffer.enqueue(event);
        self.received.fetch_add(1, Ordering::Relaxed);
    }

    /// Total events handed to the buffer since creation.
    pub fn events_received(&self) -> u64 {
        self.received.load(Ordering::Relaxed)
    }
}

impl RawKeySink for EventProducer {
    #[inline]
    fn on_raw_key_event(&self, raw: RawKeyEvent) {
        self.push(KeyEvent::from(raw));
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::event::{KeyTransition, Modifiers};
    use std::thread;

    #[test]
    fn test_raw_event_lands_in_buffer() {
        let buffer = Arc::new(EventBuffer::new());
        let producer = EventProducer::new(Arc::clone(&buffer));

        producer.on_raw_key_event(RawKeyEvent::new(
            KeyTransition::Typed,
            0x41,
            30,
            Some('A'),
            Modifiers::SHIFT.mask(),
        ));

        assert_eq!(producer.events_received(), 1);
        let event = buffer.drain_one().expect("queued event");
        assert_eq!(event.transition(), KeyTransition::Typed);
        assert_eq!(event.character(), Some('A'));
        assert!(event.has_shift());
    }

    #[test]
    fn test_clones_share_counter_and_buffer() {
        let buffer = Arc::new(EventBuffer::new());
        let producer = EventProducer::new(Arc::clone(&buffer));

        let handles: Vec<_> = (0..4)
            .map(|t| {
                let producer = producer.clone();
                thread::spawn(move || {
                    for i in 0..100 {
                        producer.push(KeyEvent::new(
                            KeyTransition::Pressed,
                            t * 1000 + i,
                            0,
                            None,
                            Modifiers::empty(),
                        ));
                    }
                })
            })
            .collect();
        for handle in handles {
            handle.join().unwrap();
        }

        assert_eq!(producer.events_received(), 400);
        assert_eq!(buffer.len(), 400);
    }
}
