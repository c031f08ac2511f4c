//! Error type shared by the whole input pipeline.

use crate::lifecycle::ServiceState;

/// How a failure is expected to be handled by the caller.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    /// The operation failed for an external reason; the caller decides what to do.
    Recoverable,
    /// The API was used out of order (wrong state, double initialize, ...).
    Programmer,
    /// The pipeline is no longer usable until it is initialized again.
    Fatal,
}

/// Failures surfaced by the input system, its dispatchers and capture sources.
#[derive(Debug, thiserror::Error)]
pub enum InputError {
    #[error("service is in state {actual}, expected {expected}")]
    InvalidState {
        expected: ServiceState,
        actual: ServiceState,
    },

    #[error("input system is already initialized")]
    AlreadyInitialized,

    #[error("no keyboard dispatcher is bound")]
    NoDispatcher,

    #[error("failed to start dispatcher: {0}")]
    DispatcherStart(String),

    #[error("failed to interrupt dispatcher: {0}")]
    Interrupt(String),

    #[error("failed to terminate dispatcher: {0}")]
    Terminate(String),

    #[error("dispatcher did not return from dispatch within {0} ms")]
    DispatcherBusy(u64),

    #[error("capture registration failed: {0}")]
    Capture(String),

    #[error("capture source did not register within {0} ms")]
    CaptureTimeout(u64),

    #[error("failed to spawn {name} thread: {source}")]
    Spawn {
        name: &'static str,
        #[source]
        source: std::io::Error,
    },

    #[error("{0} thread did not stop within {1} ms")]
    JoinTimeout(&'static str, u64),
}

impl InputError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            InputError::InvalidState { .. }
            | InputError::AlreadyInitialized
            | InputError::NoDispatcher => ErrorKind::Programmer,
            InputError::DispatcherStart(_)
            | InputError::Interrupt(_)
            | InputError::Terminate(_)
            | InputError::DispatcherBusy(_)
            | InputError::Capture(_)
            | InputError::CaptureTimeout(_) => ErrorKind::Recoverable,
            InputError::Spawn { .. } | InputError::JoinTimeout(..) => ErrorKind::Fatal,
        }
    }

    #[inline]
    pub fn is_programmer_error(&self) -> bool {
        self.kind() == ErrorKind::Programmer
    }
}

pub type Result<T, E = InputError> = std::result::Result<T, E>;
