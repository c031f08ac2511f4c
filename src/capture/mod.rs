//! Capture sources: the external producers of raw key notifications.
//!
//! A capture source is registered on a dedicated thread, where
//! [`CaptureSource::begin_capture`] blocks until
//! [`CaptureSource::end_capture`] is called from a different thread. The
//! [`CaptureRegistration`] owns that thread.

mod simulated;
#[cfg(windows)]
pub mod windows;

use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::{Duration, Instant};

use crossbeam_channel::{Receiver, RecvTimeoutError, Sender};
use log::{debug, warn};

use crate::error::{InputError, Result};
use crate::pipeline::RawKeySink;

pub use simulated::SimulatedCapture;

const THREAD_NAME: &str = "key_capture_hook";
const REAPER_THREAD_NAME: &str = "key_capture_reaper";

/// Registration handshake given to [`CaptureSource::begin_capture`].
pub struct CaptureReady(Sender<Result<()>>);

impl CaptureReady {
    /// Reports that the source is registered and delivering events.
    pub fn notify(self) {
        let _ = self.0.try_send(Ok(()));
    }
}

/// An external source of raw key notifications.
pub trait CaptureSource: Send + Sync {
    fn name(&self) -> &'static str;

    /// Registers with the source and blocks the calling thread until
    /// `end_capture` is called from another thread. `ready` must be notified
    /// once events can flow; returning an error before that fails the
    /// registration.
    fn begin_capture(&self, sink: Arc<dyn RawKeySink>, ready: CaptureReady) -> Result<()>;

    /// Unregisters, releasing the thread blocked in `begin_capture`. Calling
    /// it while nothing is registered is a no-op.
    fn end_capture(&self) -> Result<()>;
}

/// The thread that keeps a capture source registered.
pub struct CaptureRegistration {
    source: Arc<dyn CaptureSource>,
    handle: Option<JoinHandle<()>>,
}

impl CaptureRegistration {
    /// Spawns the registration thread and waits up to `start_timeout` for the
    /// source to report that it is registered.
    pub fn start(
        source: Arc<dyn CaptureSource>,
        sink: Arc<dyn RawKeySink>,
        start_timeout: Duration,
    ) -> Result<Self> {
        let (ready_tx, ready_rx) = crossbeam_channel::bounded(1);
        let thread_source = Arc::clone(&source);

        let handle = thread::Builder::new()
            .name(THREAD_NAME.to_string())
            .spawn(move || {
                let ready = CaptureReady(ready_tx.clone());
                match thread_source.begin_capture(sink, ready) {
                    Ok(()) => debug!("{} capture ended", thread_source.name()),
                    Err(e) => {
                        warn!("{} capture failed: {}", thread_source.name(), e);
                        let _ = ready_tx.try_send(Err(e));
                    }
                }
            })
            .map_err(|source| InputError::Spawn {
                name: THREAD_NAME,
                source,
            })?;

        match ready_rx.recv_timeout(start_timeout) {
            Ok(Ok(())) => {
                debug!("{} capture registered", source.name());
                Ok(Self {
                    source,
                    handle: Some(handle),
                })
            }
            Ok(Err(e)) => {
                let _ = handle.join();
                Err(e)
            }
            Err(RecvTimeoutError::Timeout) => {
                warn!(
                    "{} capture did not register within {:?}",
                    source.name(),
                    start_timeout
                );
                let _ = source.end_capture();
                release_late(source, ready_rx, handle);
                Err(InputError::CaptureTimeout(start_timeout.as_millis() as u64))
            }
            Err(RecvTimeoutError::Disconnected) => {
                let _ = handle.join();
                Err(InputError::Capture(format!(
                    "{} exited without registering",
                    source.name()
                )))
            }
        }
    }

    pub fn source_name(&self) -> &'static str {
        self.source.name()
    }

    pub fn is_active(&self) -> bool {
        self.handle.as_ref().is_some_and(|h| !h.is_finished())
    }

    /// Unregisters from the calling thread and joins the registration thread
    /// within `join_timeout`.
    pub fn shutdown(mut self, join_timeout: Duration) -> Result<()> {
        self.source.end_capture()?;

        let Some(handle) = self.handle.take() else {
            return Ok(());
        };

        let deadline = Instant::now() + join_timeout;
        while !handle.is_finished() {
            if Instant::now() >= deadline {
                return Err(InputError::JoinTimeout(
                    THREAD_NAME,
                    join_timeout.as_millis() as u64,
                ));
            }
            thread::sleep(Duration::from_millis(1));
        }
        let _ = handle.join();
        debug!("{} capture unregistered", self.source.name());
        Ok(())
    }
}

/// Waits in the background for a registration that outlived its start
/// timeout and unregisters it as soon as it reports ready.
fn release_late(
    source: Arc<dyn CaptureSource>,
    ready_rx: Receiver<Result<()>>,
    handle: JoinHandle<()>,
) {
    let name = source.name();
    let reaper = thread::Builder::new()
        .name(REAPER_THREAD_NAME.to_string())
        .spawn(move || {
            if let Ok(Ok(())) = ready_rx.recv() {
                debug!("{} capture registered late, unregistering", source.name());
                if let Err(e) = source.end_capture() {
                    warn!("{} capture failed to unregister: {}", source.name(), e);
                    return;
                }
            }
            let _ = handle.join();
        });
    if let Err(e) = reaper {
        warn!("{} capture may stay registered: {}", name, e);
    }
}

impl Drop for CaptureRegistration {
    fn drop(&mut self) {
        if self.handle.is_some() {
            let _ = self.source.end_capture();
        }
    }
}
