use std::fmt;
use std::panic::{self, AssertUnwindSafe};
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::thread::{self, JoinHandle};
use std::time::Duration;

use crossbeam_channel::{Receiver, RecvTimeoutError, Sender, TrySendError};
use log::{debug, warn};

use crate::dispatcher::DispatcherSlot;
use crate::error::{InputError, Result};
use crate::event::KeyEvent;
use crate::lifecycle::ServiceState;

use super::EventBuffer;

const THREAD_NAME: &str = "key_event_consumer";

/// An event the consumer loop could not deliver cleanly. Such events are not
/// counted as dispatched.
#[derive(Debug)]
pub enum DispatchFailure {
    /// The dispatcher returned an error.
    Failed { event: KeyEvent, error: anyhow::Error },
    /// The dispatcher panicked while handling the event.
    Panicked { event: KeyEvent, message: String },
    /// No running dispatcher was bound when the event was drained.
    Undelivered {
        event: KeyEvent,
        state: Option<ServiceState>,
    },
}

impl DispatchFailure {
    pub fn event(&self) -> &KeyEvent {
        match self {
            Self::Failed { event, .. }
            | Self::Panicked { event, .. }
            | Self::Undelivered { event, .. } => event,
        }
    }
}

impl fmt::Display for DispatchFailure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Failed { event, error } => write!(f, "dispatch of [{}] failed: {}", event, error),
            Self::Panicked { event, message } => {
                write!(f, "dispatcher panicked on [{}]: {}", event, message)
            }
            Self::Undelivered { event, state: None } => {
                write!(f, "[{}] dropped: no dispatcher bound", event)
            }
            Self::Undelivered {
                event,
                state: Some(state),
            } => write!(f, "[{}] dropped: dispatcher is {}", event, state),
        }
    }
}

/// Everything the loop thread needs, moved into it on spawn.
struct LoopContext {
    buffer: Arc<EventBuffer>,
    slot: Arc<DispatcherSlot>,
    failures: Sender<DispatchFailure>,
    dispatched: Arc<AtomicU64>,
    stop: Arc<AtomicBool>,
    idle: Duration,
}

/// Signals loop exit even if the thread unwinds.
struct ExitSignal(Sender<()>);

impl Drop for ExitSignal {
    fn drop(&mut self) {
        let _ = self.0.try_send(());
    }
}

/// Handle to the dedicated thread draining the [`EventBuffer`].
///
/// The loop forwards one event at a time, synchronously, to the bound
/// dispatcher and waits up to the idle interval when the buffer is empty. The
/// stop flag is checked after every idle wait and after every dispatch.
pub struct ConsumerLoop {
    stop: Arc<AtomicBool>,
    buffer: Arc<EventBuffer>,
    exited: Receiver<()>,
    handle: Option<JoinHandle<()>>,
}

impl ConsumerLoop {
    pub fn spawn(
        buffer: Arc<EventBuffer>,
        slot: Arc<DispatcherSlot>,
        failures: Sender<DispatchFailure>,
        dispatched: Arc<AtomicU64>,
        idle: Duration,
    ) -> Result<Self> {
        let stop = Arc::new(AtomicBool::new(false));
        let (exit_tx, exit_rx) = crossbeam_channel::bounded(1);

        let context = LoopContext {
            buffer: Arc::clone(&buffer),
            slot,
            failures,
            dispatched,
            stop: Arc::clone(&stop),
            idle,
        };

        let handle = thread::Builder::new()
            .name(THREAD_NAME.to_string())
            .spawn(move || {
                let _exit = ExitSignal(exit_tx);
                run(context);
            })
            .map_err(|source| InputError::Spawn {
                name: THREAD_NAME,
                source,
            })?;

        debug!("consumer loop started (idle {:?})", idle);

        Ok(Self {
            stop,
            buffer,
            exited: exit_rx,
            handle: Some(handle),
        })
    }

    pub fn is_finished(&self) -> bool {
        self.handle.as_ref().is_none_or(|h| h.is_finished())
    }

    /// Requests the loop to stop and joins it within `timeout`.
    ///
    /// On timeout the thread is detached; it still exits at its next
    /// checkpoint.
    pub fn stop(mut self, timeout: Duration) -> Result<()> {
        self.stop.store(true, Ordering::Release);
        self.buffer.wake();

        match self.exited.recv_timeout(timeout) {
            Ok(()) | Err(RecvTimeoutError::Disconnected) => {
                if let Some(handle) = self.handle.take() {
                    let _ = handle.join();
                }
                debug!("consumer loop stopped");
                Ok(())
            }
            Err(RecvTimeoutError::Timeout) => {
                self.handle.take();
                Err(InputError::JoinTimeout(
                    THREAD_NAME,
                    timeout.as_millis() as u64,
                ))
            }
        }
    }
}

impl Drop for ConsumerLoop {
    fn drop(&mut self) {
        self.stop.store(true, Ordering::Release);
        self.buffer.wake();
    }
}

fn run(context: LoopContext) {
    while !context.stop.load(Ordering::Acquire) {
        let Some(event) = context.buffer.drain_timeout(context.idle) else {
            continue;
        };
        deliver(&context, event);
    }
}

fn deliver(context: &LoopContext, event: KeyEvent) {
    let failure = context.slot.with_bound(|bound| {
        let Some(dispatcher) = bound else {
            return Some(DispatchFailure::Undelivered { event, state: None });
        };

        let state = dispatcher.state();
        if state != ServiceState::Running {
            return Some(DispatchFailure::Undelivered {
                event,
                state: Some(state),
            });
        }

        match panic::catch_unwind(AssertUnwindSafe(|| dispatcher.dispatch(&event))) {
            Ok(Ok(())) => {
                context.dispatched.fetch_add(1, Ordering::Relaxed);
                None
            }
            Ok(Err(error)) => Some(DispatchFailure::Failed { event, error }),
            Err(payload) => Some(DispatchFailure::Panicked {
                event,
                message: panic_message(payload.as_ref()),
            }),
        }
    });

    if let Some(failure) = failure {
        report(&context.failures, failure);
    }
}

fn report(failures: &Sender<DispatchFailure>, failure: DispatchFailure) {
    warn!("{}", failure);
    match failures.try_send(failure) {
        Ok(()) => {}
        Err(TrySendError::Full(dropped)) => {
            debug!("failure channel full, dropping report for [{}]", dropped.event());
        }
        Err(TrySendError::Disconnected(_)) => {}
    }
}

fn panic_message(payload: &(dyn std::any::Any + Send)) -> String {
    if let Some(msg) = payload.downcast_ref::<&str>() {
        (*msg).to_string()
    } else if let Some(msg) = payload.downcast_ref::<String>() {
        msg.clone()
    } else {
        "unknown panic".to_string()
    }
}
