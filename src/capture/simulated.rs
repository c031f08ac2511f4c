use std::sync::{Arc, Condvar, Mutex, MutexGuard, PoisonError};
use std::thread::{self, ThreadId};

use crate::error::{InputError, Result};
use crate::event::RawKeyEvent;
use crate::pipeline::RawKeySink;

use super::{CaptureReady, CaptureSource};

#[derive(Default)]
struct Registration {
    sink: Option<Arc<dyn RawKeySink>>,
    thread: Option<ThreadId>,
    end_requested: bool,
    registrations: usize,
    unregistrations: usize,
}

/// In-process capture source driven by [`SimulatedCapture::inject`].
///
/// Behaves like a native hook: `begin_capture` parks the registration thread
/// until `end_capture` is called, and injected events reach the sink on the
/// injecting thread.
#[derive(Default)]
pub struct SimulatedCapture {
    state: Mutex<Registration>,
    changed: Condvar,
    failure: Option<String>,
}

impl SimulatedCapture {
    pub fn new() -> Self {
        Self::default()
    }

    /// A source whose registration always fails with `reason`.
    pub fn failing(reason: impl Into<String>) -> Self {
        Self {
            failure: Some(reason.into()),
            ..Self::default()
        }
    }

    /// Delivers `raw` to the registered sink. Returns `false` when nothing is
    /// registered.
    pub fn inject(&self, raw: RawKeyEvent) -> bool {
        let sink = self.lock().sink.clone();
        match sink {
            Some(sink) => {
                sink.on_raw_key_event(raw);
                true
            }
            None => false,
        }
    }

    pub fn is_active(&self) -> bool {
        self.lock().sink.is_some()
    }

    /// Thread currently blocked in `begin_capture`.
    pub fn registration_thread(&self) -> Option<ThreadId> {
        self.lock().thread
    }

    pub fn registrations(&self) -> usize {
        self.lock().registrations
    }

    pub fn unregistrations(&self) -> usize {
        self.lock().unregistrations
    }

    fn lock(&self) -> MutexGuard<'_, Registration> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

impl CaptureSource for SimulatedCapture {
    fn name(&self) -> &'static str {
        "simulated"
    }

    fn begin_capture(&self, sink: Arc<dyn RawKeySink>, ready: CaptureReady) -> Result<()> {
        if let Some(reason) = &self.failure {
            return Err(InputError::Capture(reason.clone()));
        }

        let mut state = self.lock();
        if state.sink.is_some() {
            return Err(InputError::Capture("already registered".to_string()));
        }
        state.sink = Some(sink);
        state.thread = Some(thread::current().id());
        state.end_requested = false;
        state.registrations += 1;
        ready.notify();

        while !state.end_requested {
            state = self
                .changed
                .wait(state)
                .unwrap_or_else(PoisonError::into_inner);
        }

        state.sink = None;
        state.thread = None;
        Ok(())
    }

    fn end_capture(&self) -> Result<()> {
        let mut state = self.lock();
        if state.sink.is_none() || state.end_requested {
            return Ok(());
        }
        if state.thread == Some(thread::current().id()) {
            return Err(InputError::Capture(
                "end_capture called from the registration thread".to_string(),
            ));
        }
        state.end_requested = true;
        state.unregistrations += 1;
        drop(state);
        self.changed.notify_all();
        Ok(())
    }
}
