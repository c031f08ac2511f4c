//! The dispatcher contract and the slot holding the single bound dispatcher.

use std::sync::{Arc, PoisonError, RwLock, RwLockReadGuard, RwLockWriteGuard, TryLockError};
use std::thread;
use std::time::{Duration, Instant};

use crate::error::{InputError, Result};
use crate::event::KeyEvent;
use crate::lifecycle::ServiceState;

/// Sink for drained keyboard events.
///
/// `dispatch` runs on the consumer thread and blocks it: a slow dispatcher
/// delays every event queued behind the current one. Implementations must not
/// rebind the dispatcher from inside `dispatch`.
pub trait KeyboardDispatcher: Send + Sync {
    /// Handles one event. Errors are reported on the failure channel and do
    /// not stop the consumer loop.
    fn dispatch(&self, event: &KeyEvent) -> anyhow::Result<()>;

    /// `Undefined -> Running`. Any other starting state is an error.
    fn start(&self) -> Result<()>;

    fn state(&self) -> ServiceState;

    /// Stops the dispatcher because another one is taking its place.
    fn interrupt(&self) -> Result<()>;

    /// Stops the dispatcher because the input system is shutting down.
    fn terminate(&self) -> Result<()>;

    /// Periodic tick forwarded by [`crate::InputSystem::update`].
    fn update(&self, _elapsed: Duration) {}
}

/// Holds at most one bound dispatcher.
///
/// The consumer holds the read side for the whole `dispatch` call, so a
/// rebind waits for the in-flight event and the old dispatcher never sees
/// another event once [`DispatcherSlot::replace`] returns.
#[derive(Default)]
pub struct DispatcherSlot {
    bound: RwLock<Option<Arc<dyn KeyboardDispatcher>>>,
}

impl DispatcherSlot {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self) -> Option<Arc<dyn KeyboardDispatcher>> {
        self.read().clone()
    }

    pub fn is_bound(&self) -> bool {
        self.read().is_some()
    }

    /// Runs `f` with the bound dispatcher while blocking rebinds.
    pub fn with_bound<R>(&self, f: impl FnOnce(Option<&Arc<dyn KeyboardDispatcher>>) -> R) -> R {
        let guard = self.read();
        f(guard.as_ref())
    }

    /// Interrupts the current dispatcher, then binds `next`. If the interrupt
    /// fails the current dispatcher stays bound and `next` is dropped.
    pub fn replace(
        &self,
        next: Arc<dyn KeyboardDispatcher>,
    ) -> Result<Option<Arc<dyn KeyboardDispatcher>>> {
        let mut bound = self.write();
        if let Some(current) = bound.as_ref() {
            current.interrupt()?;
        }
        Ok(bound.replace(next))
    }

    /// Unbinds and returns the current dispatcher without touching its state.
    pub fn take(&self) -> Option<Arc<dyn KeyboardDispatcher>> {
        self.write().take()
    }

    /// Like [`DispatcherSlot::replace`], but gives up with `DispatcherBusy`
    /// when an in-flight `dispatch` does not return within `timeout`.
    pub fn replace_within(
        &self,
        next: Arc<dyn KeyboardDispatcher>,
        timeout: Duration,
    ) -> Result<Option<Arc<dyn KeyboardDispatcher>>> {
        let mut bound = self.write_within(timeout)?;
        if let Some(current) = bound.as_ref() {
            current.interrupt()?;
        }
        Ok(bound.replace(next))
    }

    /// Like [`DispatcherSlot::take`], bounded by `timeout`.
    pub fn take_within(&self, timeout: Duration) -> Result<Option<Arc<dyn KeyboardDispatcher>>> {
        Ok(self.write_within(timeout)?.take())
    }

    /// Returns `true` if `dispatcher` is the one currently bound.
    pub fn is_bound_to(&self, dispatcher: &Arc<dyn KeyboardDispatcher>) -> bool {
        self.read()
            .as_ref()
            .is_some_and(|bound| Arc::ptr_eq(bound, dispatcher))
    }

    fn read(&self) -> RwLockReadGuard<'_, Option<Arc<dyn KeyboardDispatcher>>> {
        self.bound.read().unwrap_or_else(PoisonError::into_inner)
    }

    fn write(&self) -> RwLockWriteGuard<'_, Option<Arc<dyn KeyboardDispatcher>>> {
        self.bound.write().unwrap_or_else(PoisonError::into_inner)
    }

    // try_write is polled since the consumer holds the read side for the
    // whole dispatch call
    fn write_within(
        &self,
        timeout: Duration,
    ) -> Result<RwLockWriteGuard<'_, Option<Arc<dyn KeyboardDispatcher>>>> {
        let deadline = Instant::now() + timeout;
        loop {
            match self.bound.try_write() {
                Ok(guard) => return Ok(guard),
                Err(TryLockError::Poisoned(poisoned)) => return Ok(poisoned.into_inner()),
                Err(TryLockError::WouldBlock) => {}
            }
            if Instant::now() >= deadline {
                return Err(InputError::DispatcherBusy(timeout.as_millis() as u64));
            }
            thread::yield_now();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::event::{KeyTransition, Modifiers};
    use crate::lifecycle::Lifecycle;
    use std::sync::atomic::{AtomicUsize, Ordering};

    struct Probe {
        lifecycle: Lifecycle,
        refuse_interrupt: bool,
        seen: AtomicUsize,
    }

    impl Probe {
        fn new(refuse_interrupt: bool) -> Arc<Self> {
            Arc::new(Self {
                lifecycle: Lifecycle::new(),
                refuse_interrupt,
                seen: AtomicUsize::new(0),
            })
        }
    }

    impl KeyboardDispatcher for Probe {
        fn dispatch(&self, _event: &KeyEvent) -> anyhow::Result<()> {
            self.seen.fetch_add(1, Ordering::SeqCst);
            Ok(())
        }

        fn start(&self) -> Result<()> {
            self.lifecycle.start()
        }

        fn state(&self) -> ServiceState {
            self.lifecycle.state()
        }

        fn interrupt(&self) -> Result<()> {
            if self.refuse_interrupt {
                return Err(InputError::Interrupt("busy".to_string()));
            }
            self.lifecycle.stop();
            Ok(())
        }

        fn terminate(&self) -> Result<()> {
            self.lifecycle.stop();
            Ok(())
        }
    }

    #[test]
    fn test_replace_interrupts_previous() {
        let slot = DispatcherSlot::new();
        let first = Probe::new(false);
        let second = Probe::new(false);

        assert!(slot.replace(first.clone()).unwrap().is_none());
        first.start().unwrap();

        let previous = slot.replace(second.clone()).unwrap();
        assert!(previous.is_some());
        assert_eq!(first.state(), ServiceState::Stopped);
        assert_eq!(second.state(), ServiceState::Undefined);
    }

    #[test]
    fn test_failed_interrupt_keeps_current() {
        let slot = DispatcherSlot::new();
        let stubborn = Probe::new(true);
        let next = Probe::new(false);

        slot.replace(stubborn.clone()).unwrap();
        let err = slot.replace(next).err().unwrap();
        assert!(matches!(err, InputError::Interrupt(_)));

        let event = KeyEvent::new(KeyTransition::Pressed, 65, 0, None, Modifiers::empty());
        slot.with_bound(|d| d.unwrap().dispatch(&event)).unwrap();
        assert_eq!(stubborn.seen.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn test_take_clears_slot() {
        let slot = DispatcherSlot::new();
        assert!(slot.take().is_none());
        slot.replace(Probe::new(false)).unwrap();
        assert!(slot.is_bound());
        assert!(slot.take().is_some());
        assert!(!slot.is_bound());
        assert!(slot.get().is_none());
    }

    #[test]
    fn test_bounded_rebind_gives_up_while_dispatch_is_in_flight() {
        let slot = Arc::new(DispatcherSlot::new());
        let first = Probe::new(false);
        first.start().unwrap();
        slot.replace(first.clone()).unwrap();

        let (entered_tx, entered_rx) = crossbeam_channel::bounded(1);
        let (release_tx, release_rx) = crossbeam_channel::bounded::<()>(1);
        let holder = {
            let slot = Arc::clone(&slot);
            thread::spawn(move || {
                slot.with_bound(|_| {
                    let _ = entered_tx.send(());
                    let _ = release_rx.recv_timeout(Duration::from_secs(5));
                })
            })
        };
        entered_rx.recv().unwrap();

        let started = Instant::now();
        let err = slot
            .replace_within(Probe::new(false), Duration::from_millis(20))
            .err()
            .unwrap();
        assert!(matches!(err, InputError::DispatcherBusy(20)));
        assert!(started.elapsed() < Duration::from_secs(1));
        assert!(matches!(
            slot.take_within(Duration::from_millis(20)),
            Err(InputError::DispatcherBusy(20))
        ));

        // nothing changed hands while busy
        assert_eq!(first.state(), ServiceState::Running);
        let bound: Arc<dyn KeyboardDispatcher> = first.clone();
        assert!(slot.is_bound_to(&bound));

        release_tx.send(()).unwrap();
        holder.join().unwrap();
        assert!(slot.take_within(Duration::from_secs(1)).unwrap().is_some());
        assert!(!slot.is_bound());
    }

    #[test]
    fn test_is_bound_to_compares_identity() {
        let slot = DispatcherSlot::new();
        let first: Arc<dyn KeyboardDispatcher> = Probe::new(false);
        let other: Arc<dyn KeyboardDispatcher> = Probe::new(false);
        assert!(!slot.is_bound_to(&first));

        slot.replace(Arc::clone(&first)).unwrap();
        assert!(slot.is_bound_to(&first));
        assert!(!slot.is_bound_to(&other));
    }
}
