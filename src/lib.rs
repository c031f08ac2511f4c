//! Keyboard event pipeline.
//!
//! Key notifications from a capture source are handed to an
//! [`EventProducer`], queued in an [`EventBuffer`] and delivered one at a time,
//! in order, to the single bound [`KeyboardDispatcher`] by a dedicated
//! consumer thread. [`InputSystem`] owns all of it and drives the lifecycle.

pub mod capture;
pub mod config;
pub mod dispatcher;
pub mod error;
pub mod event;
pub mod keys;
pub mod lifecycle;
pub mod listener;
pub mod pipeline;
pub mod system;
pub mod translate;

pub use capture::{CaptureReady, CaptureRegistration, CaptureSource, SimulatedCapture};
pub use config::InputConfig;
pub use dispatcher::{DispatcherSlot, KeyboardDispatcher};
pub use error::{ErrorKind, InputError, Result};
pub use event::{
    ActionEvent, ActionKind, ActionQueue, ConsumeFlag, Genre, InputEvent, KeyEvent, KeyTransition,
    Modifiers, RawKeyEvent,
};
pub use keys::Key;
pub use lifecycle::{Lifecycle, Service, ServiceState};
pub use listener::{KeyListener, ListenerDispatcher};
pub use pipeline::{ConsumerLoop, DispatchFailure, EventBuffer, EventProducer, RawKeySink};
pub use system::InputSystem;
pub use translate::KeyTranslator;
