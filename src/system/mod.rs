//! The input system: owns the pipeline and drives its lifecycle.
//!
//! An [`InputSystem`] is an ordinary value owned by the caller. It wires a
//! [`CaptureSource`] to the [`EventBuffer`] through an [`EventProducer`], runs
//! the [`ConsumerLoop`] and keeps the single bound [`KeyboardDispatcher`].


use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;

use crossbeam_channel::{Receiver, Sender};
use log::{debug, error, info, warn};

use crate::capture::{CaptureRegistration, CaptureSource};
use crate::config::InputConfig;
use crate::dispatcher::{DispatcherSlot, KeyboardDispatcher};
use crate::error::{InputError, Result};
use crate::lifecycle::{Service, ServiceState};
use crate::pipeline::{ConsumerLoop, DispatchFailure, EventBuffer, EventProducer, RawKeySink};

pub const SYSTEM_NAME: &str = "keyrelay.input";

/// Capacity of the dispatch failure channel. Reports beyond it are dropped.
const FAILURE_CHANNEL_CAPACITY: usize = 256;

/// Threads that only exist while the system is initialized.
struct Runtime {
    consumer: ConsumerLoop,
    registration: CaptureRegistration,
}

pub struct InputSystem {
    config: InputConfig,
    capture: Arc<dyn CaptureSource>,
    buffer: Arc<EventBuffer>,
    producer: EventProducer,
    slot: Arc<DispatcherSlot>,
    runtime: Mutex<Option<Runtime>>,
    failure_tx: Sender<DispatchFailure>,
    failure_rx: Receiver<DispatchFailure>,
    dispatched: Arc<AtomicU64>,
    stopped: AtomicBool,
}

impl InputSystem {
    pub fn new(config: InputConfig, capture: Arc<dyn CaptureSource>) -> Self {
        let buffer = Arc::new(EventBuffer::new());
        let producer = EventProducer::new(Arc::clone(&buffer));
        let (failure_tx, failure_rx) = crossbeam_channel::bounded(FAILURE_CHANNEL_CAPACITY);

        Self {
            config: config.validate(),
            capture,
            buffer,
            producer,
            slot: Arc::new(DispatcherSlot::new()),
            runtime: Mutex::new(None),
            failure_tx,
            failure_rx,
            dispatched: Arc::new(AtomicU64::new(0)),
            stopped: AtomicBool::new(false),
        }
    }

    pub fn system_name(&self) -> &'static str {
        SYSTEM_NAME
    }

    pub fn config(&self) -> &InputConfig {
        &self.config
    }

    /// Starts the bound dispatcher, the consumer loop and the capture
    /// registration.
    ///
    /// The dispatcher must be in `Undefined`. When a later step fails, the
    /// steps already done are rolled back and the dispatcher is terminated.
    pub fn initialize(&self) -> Result<()> {
        let mut runtime = self.lock_runtime();
        if runtime.is_some() {
            return Err(InputError::AlreadyInitialized);
        }

        let dispatcher = self.slot.get().ok_or(InputError::NoDispatcher)?;
        let state = dispatcher.state();
        if state != ServiceState::Undefined {
            return Err(InputError::InvalidState {
                expected: ServiceState::Undefined,
                actual: state,
            });
        }
        dispatcher
            .start()
            .map_err(|e| reclassify(e, InputError::DispatcherStart))?;
        debug!("dispatcher started");

        let consumer = match ConsumerLoop::spawn(
            Arc::clone(&self.buffer),
            Arc::clone(&self.slot),
            self.failure_tx.clone(),
            Arc::clone(&self.dispatched),
            self.config.idle_interval(),
        ) {
            Ok(consumer) => consumer,
            Err(e) => {
                terminate_quietly(dispatcher.as_ref());
                return Err(e);
            }
        };

        let sink: Arc<dyn RawKeySink> = Arc::new(self.producer.clone());
        let registration = match CaptureRegistration::start(
            Arc::clone(&self.capture),
            sink,
            self.config.capture_start_timeout(),
        ) {
            Ok(registration) => registration,
            Err(e) => {
                warn!("{} capture failed to register: {}", self.capture.name(), e);
                if let Err(stop_err) = consumer.stop(self.config.join_timeout()) {
                    error!("{}", stop_err);
                }
                terminate_quietly(dispatcher.as_ref());
                return Err(e);
            }
        };

        *runtime = Some(Runtime {
            consumer,
            registration,
        });
        self.stopped.store(false, Ordering::Release);
        info!("{} initialized ({} capture)", SYSTEM_NAME, self.capture.name());
        Ok(())
    }

    /// Terminates and unbinds the dispatcher, unregisters capture, stops the
    /// consumer loop and discards undelivered events.
    ///
    /// Every step runs even if an earlier one fails; the first failure is
    /// returned. No step waits longer than the join timeout, so a dispatcher
    /// stuck in `dispatch` yields `JoinTimeout` and stays bound, already
    /// terminated. Calling it again once everything is released is a no-op.
    pub fn shutdown(&self) -> Result<()> {
        let mut first_err: Option<InputError> = None;
        let join_timeout = self.config.join_timeout();

        let unbound = match self.slot.take_within(join_timeout) {
            Ok(taken) => {
                if let Some(dispatcher) = taken {
                    terminate_into(dispatcher.as_ref(), &mut first_err);
                }
                true
            }
            Err(e) => {
                warn!("{}, terminating it in place", e);
                if let Some(dispatcher) = self.slot.get() {
                    terminate_into(dispatcher.as_ref(), &mut first_err);
                }
                false
            }
        };

        let runtime = self.lock_runtime().take();
        if let Some(Runtime {
            consumer,
            registration,
        }) = runtime
        {
            if let Err(e) = registration.shutdown(join_timeout) {
                warn!("{} capture failed to unregister: {}", self.capture.name(), e);
                first_err.get_or_insert(e);
            }
            if let Err(e) = consumer.stop(join_timeout) {
                error!("{}", e);
                first_err.get_or_insert(e);
            }

            let discarded = self.buffer.clear();
            if discarded > 0 {
                debug!("discarded {} undelivered key events", discarded);
            }

            self.stopped.store(true, Ordering::Release);
            info!("{} shut down", SYSTEM_NAME);
        }

        if !unbound && let Err(e) = self.slot.take_within(join_timeout) {
            warn!("dispatcher left bound: {}", e);
            first_err.get_or_insert(e);
        }

        first_err.map_or(Ok(()), Err)
    }

    /// Forwards a periodic tick to the bound dispatcher.
    pub fn update(&self, elapsed: Duration) {
        if let Some(dispatcher) = self.slot.get() {
            dispatcher.update(elapsed);
        }
    }

    pub fn dispatcher(&self) -> Option<Arc<dyn KeyboardDispatcher>> {
        self.slot.get()
    }

    /// Binds `dispatcher`, interrupting the one currently bound.
    ///
    /// While the system is initialized a dispatcher still in `Undefined` is
    /// started before it is bound. If the interrupt fails, or an in-flight
    /// `dispatch` does not return within the join timeout, the previous
    /// dispatcher stays bound and `dispatcher` is not. Binding the dispatcher
    /// that is already bound changes nothing.
    pub fn set_dispatcher(&self, dispatcher: Arc<dyn KeyboardDispatcher>) -> Result<()> {
        // held so that initialize/shutdown cannot interleave with the rebind
        let runtime = self.lock_runtime();
        if self.slot.is_bound_to(&dispatcher) {
            debug!("dispatcher already bound");
            return Ok(());
        }
        if runtime.is_some() && dispatcher.state() == ServiceState::Undefined {
            dispatcher
                .start()
                .map_err(|e| reclassify(e, InputError::DispatcherStart))?;
        }

        match self
            .slot
            .replace_within(Arc::clone(&dispatcher), self.config.join_timeout())
        {
            Ok(Some(_)) => debug!("dispatcher rebound"),
            Ok(None) => debug!("dispatcher bound"),
            Err(e) => {
                if runtime.is_some() {
                    terminate_quietly(dispatcher.as_ref());
                }
                return Err(reclassify(e, InputError::Interrupt));
            }
        }
        Ok(())
    }

    /// Entry point for code that produces key events without a capture
    /// source.
    pub fn producer(&self) -> &EventProducer {
        &self.producer
    }

    /// Dispatch failures, panics and undelivered events, in the order they
    /// happened.
    pub fn failures(&self) -> &Receiver<DispatchFailure> {
        &self.failure_rx
    }

    pub fn is_initialized(&self) -> bool {
        self.lock_runtime().is_some()
    }

    pub fn events_dispatched(&self) -> u64 {
        self.dispatched.load(Ordering::Relaxed)
    }

    pub fn events_received(&self) -> u64 {
        self.producer.events_received()
    }

    pub fn pending_events(&self) -> usize {
        self.buffer.len()
    }

    fn lock_runtime(&self) -> MutexGuard<'_, Option<Runtime>> {
        self.runtime.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

impl Service for InputSystem {
    fn name(&self) -> &'static str {
        SYSTEM_NAME
    }

    fn start(&self) -> Result<()> {
        self.initialize()
    }

    fn stop(&self) -> Result<()> {
        self.shutdown()
    }

    fn update(&self, elapsed: Duration) {
        InputSystem::update(self, elapsed);
    }

    fn state(&self) -> ServiceState {
        if self.is_initialized() {
            ServiceState::Running
        } else if self.stopped.load(Ordering::Acquire) {
            ServiceState::Stopped
        } else {
            ServiceState::Undefined
        }
    }
}

impl Drop for InputSystem {
    fn drop(&mut self) {
        if let Err(e) = self.shutdown() {
            warn!("shutdown on drop failed: {}", e);
        }
    }
}

/// Keeps lifecycle and dispatcher-specific errors, wraps anything else.
fn reclassify(err: InputError, wrap: fn(String) -> InputError) -> InputError {
    match err {
        InputError::InvalidState { .. }
        | InputError::DispatcherStart(_)
        | InputError::Interrupt(_)
        | InputError::Terminate(_)
        | InputError::DispatcherBusy(_) => err,
        other => wrap(other.to_string()),
    }
}

fn terminate_into(dispatcher: &dyn KeyboardDispatcher, first_err: &mut Option<InputError>) {
    if let Err(e) = dispatcher.terminate() {
        warn!("dispatcher failed to terminate: {}", e);
        first_err.get_or_insert(reclassify(e, InputError::Terminate));
    }
}

fn terminate_quietly(dispatcher: &dyn KeyboardDispatcher) {
    if let Err(e) = dispatcher.terminate() {
        warn!("dispatcher failed to terminate during rollback: {}", e);
    }
}
