//! Event data model: the consumable base event, key transitions and
//! time-bounded action events.

pub mod action;
pub mod key;
pub mod modifiers;

use std::fmt;
use std::sync::atomic::{AtomicBool, Ordering};

pub use action::{ActionEvent, ActionKind, ActionQueue};
pub use key::{KeyEvent, KeyTransition, RawKeyEvent};
pub use modifiers::Modifiers;

/// Event family.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Genre {
    /// Generic input actions (see [`ActionEvent`]).
    Input,
    /// Keyboard key transitions (see [`KeyEvent`]).
    Keyboard,
}

impl Genre {
    #[inline(always)]
    pub const fn id(self) -> u8 {
        match self {
            Self::Input => 1,
            Self::Keyboard => 2,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Input => "INPUT",
            Self::Keyboard => "KEYBOARD",
        }
    }
}

impl fmt::Display for Genre {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One-way consumption flag. Once set it is never cleared.
#[derive(Debug, Default)]
pub struct ConsumeFlag(AtomicBool);

impl ConsumeFlag {
    pub const fn new() -> Self {
        Self(AtomicBool::new(false))
    }

    /// Marks the flag consumed. Returns `true` only for the call that
    /// performed the transition.
    #[inline(always)]
    pub fn consume(&self) -> bool {
        !self.0.swap(true, Ordering::AcqRel)
    }

    #[inline(always)]
    pub fn is_consumed(&self) -> bool {
        self.0.load(Ordering::Acquire)
    }
}

impl Clone for ConsumeFlag {
    fn clone(&self) -> Self {
        Self(AtomicBool::new(self.is_consumed()))
    }
}

/// Common surface of every event: family, type code and consumption.
pub trait InputEvent {
    fn genre(&self) -> Genre;

    /// Family-specific type code.
    fn type_code(&self) -> u8;

    fn consumption(&self) -> &ConsumeFlag;

    /// Marks the event handled. Returns `true` if this call consumed it.
    #[inline]
    fn consume(&self) -> bool {
        self.consumption().consume()
    }

    #[inline]
    fn is_consumed(&self) -> bool {
        self.consumption().is_consumed()
    }
}
