//! Service states and the lock-free state machine shared by dispatchers and
//! the input system.

use std::fmt;
use std::sync::atomic::{AtomicU8, Ordering};
use std::time::Duration;

use crate::error::{InputError, Result};

/// Lifecycle state of a service.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum ServiceState {
    #[default]
    Undefined,
    Starting,
    Running,
    Stopping,
    Stopped,
}

impl ServiceState {
    /// Encodes the state for atomic storage.
    #[inline(always)]
    pub const fn to_u8(self) -> u8 {
        match self {
            Self::Undefined => 0,
            Self::Starting => 1,
            Self::Running => 2,
            Self::Stopping => 3,
            Self::Stopped => 4,
        }
    }

    /// Decodes a stored state; unknown values map to `Undefined`.
    #[inline(always)]
    pub const fn from_u8(val: u8) -> Self {
        match val {
            1 => Self::Starting,
            2 => Self::Running,
            3 => Self::Stopping,
            4 => Self::Stopped,
            _ => Self::Undefined,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Undefined => "UNDEFINED",
            Self::Starting => "STARTING",
            Self::Running => "RUNNING",
            Self::Stopping => "STOPPING",
            Self::Stopped => "STOPPED",
        }
    }
}

impl fmt::Display for ServiceState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Minimal service contract exposed to whatever owns the input subsystem.
pub trait Service {
    fn name(&self) -> &'static str;
    fn start(&self) -> Result<()>;
    fn stop(&self) -> Result<()>;
    fn update(&self, elapsed: Duration);
    fn state(&self) -> ServiceState;
}

/// Atomic `UNDEFINED -> RUNNING -> STOPPED` state machine.
///
/// `start` is only accepted from `Undefined`. Stopping is accepted from any
/// state and is idempotent once `Stopped` has been reached, so a dispatcher
/// that was never started can still be interrupted during rebinding.
#[derive(Debug, Default)]
pub struct Lifecycle {
    state: AtomicU8,
}

impl Lifecycle {
    pub const fn new() -> Self {
        Self {
            state: AtomicU8::new(0),
        }
    }

    #[inline(always)]
    pub fn state(&self) -> ServiceState {
        ServiceState::from_u8(self.state.load(Ordering::Acquire))
    }

    #[inline(always)]
    pub fn is_running(&self) -> bool {
        self.state() == ServiceState::Running
    }

    /// Claims the `Undefined -> Starting` transition. The caller finishes the
    /// start with [`Lifecycle::finish_start`] or [`Lifecycle::fail_start`].
    pub fn begin_start(&self) -> Result<()> {
        self.state
            .compare_exchange(
                ServiceState::Undefined.to_u8(),
                ServiceState::Starting.to_u8(),
                Ordering::AcqRel,
                Ordering::Acquire,
            )
            .map(|_| ())
            .map_err(|actual| InputError::InvalidState {
                expected: ServiceState::Undefined,
                actual: ServiceState::from_u8(actual),
            })
    }

    pub fn finish_start(&self) {
        self.state
            .store(ServiceState::Running.to_u8(), Ordering::Release);
    }

    pub fn fail_start(&self) {
        self.state
            .store(ServiceState::Stopped.to_u8(), Ordering::Release);
    }

    /// `Undefined -> Running` in one step.
    pub fn start(&self) -> Result<()> {
        self.begin_start()?;
        self.finish_start();
        Ok(())
    }

    /// Moves to `Stopping`. Returns `false` when the service was already
    /// stopped (or another caller is stopping it) and nothing is left to do.
    pub fn begin_stop(&self) -> bool {
        let mut current = self.state.load(Ordering::Acquire);
        loop {
            let state = ServiceState::from_u8(current);
            if matches!(state, ServiceState::Stopped | ServiceState::Stopping) {
                return false;
            }
            match self.state.compare_exchange_weak(
                current,
                ServiceState::Stopping.to_u8(),
                Ordering::AcqRel,
                Ordering::Acquire,
            ) {
                Ok(_) => return true,
                Err(actual) => current = actual,
            }
        }
    }

    pub fn finish_stop(&self) {
        self.state
            .store(ServiceState::Stopped.to_u8(), Ordering::Release);
    }

    /// Any state -> `Stopped`, idempotent.
    pub fn stop(&self) {
        if self.begin_stop() {
            self.finish_stop();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_state_round_trip_through_u8() {
        for state in [
            ServiceState::Undefined,
            ServiceState::Starting,
            ServiceState::Running,
            ServiceState::Stopping,
            ServiceState::Stopped,
        ] {
            assert_eq!(ServiceState::from_u8(state.to_u8()), state);
        }
        assert_eq!(ServiceState::from_u8(200), ServiceState::Undefined);
    }

    #[test]
    fn test_start_only_from_undefined() {
        let lifecycle = Lifecycle::new();
        assert_eq!(lifecycle.state(), ServiceState::Undefined);

        lifecycle.start().expect("first start");
        assert!(lifecycle.is_running());

        let err = lifecycle.start().unwrap_err();
        assert!(matches!(
            err,
            InputError::InvalidState {
                expected: ServiceState::Undefined,
                actual: ServiceState::Running
            }
        ));
    }

    #[test]
    fn test_stop_is_idempotent() {
        let lifecycle = Lifecycle::new();
        lifecycle.start().unwrap();

        assert!(lifecycle.begin_stop());
        assert_eq!(lifecycle.state(), ServiceState::Stopping);
        assert!(!lifecycle.begin_stop());
        lifecycle.finish_stop();

        lifecycle.stop();
        assert_eq!(lifecycle.state(), ServiceState::Stopped);
    }

    #[test]
    fn test_stopped_service_cannot_restart() {
        let lifecycle = Lifecycle::new();
        lifecycle.stop();
        assert_eq!(lifecycle.state(), ServiceState::Stopped);
        assert!(lifecycle.start().is_err());
    }

    #[test]
    fn test_failed_start_ends_stopped() {
        let lifecycle = Lifecycle::new();
        lifecycle.begin_start().unwrap();
        assert_eq!(lifecycle.state(), ServiceState::Starting);
        lifecycle.fail_start();
        assert_eq!(lifecycle.state(), ServiceState::Stopped);
    }
}
