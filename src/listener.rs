//! Routing of key events to per-transition listener callbacks.

use std::time::Duration;

use log::debug;

use crate::dispatcher::KeyboardDispatcher;
use crate::error::Result;
use crate::event::{ActionEvent, ActionKind, ActionQueue, KeyEvent, KeyTransition};
use crate::lifecycle::{Lifecycle, ServiceState};

pub const DEFAULT_ACTION_DURATION: Duration = Duration::from_millis(250);

/// Application callbacks, one per transition type. All run on the consumer
/// thread.
pub trait KeyListener: Send + Sync {
    fn key_typed(&self, event: &KeyEvent) -> anyhow::Result<()>;
    fn key_pressed(&self, event: &KeyEvent) -> anyhow::Result<()>;
    fn key_released(&self, event: &KeyEvent) -> anyhow::Result<()>;
}

/// A [`KeyboardDispatcher`] that forwards every event to a [`KeyListener`].
///
/// Each PRESSED event is also recorded as a `Key` [`ActionEvent`] carrying the
/// library key code, so application code can claim recent key activations
/// from [`ListenerDispatcher::actions`].
pub struct ListenerDispatcher<L> {
    listener: L,
    lifecycle: Lifecycle,
    actions: ActionQueue,
    action_duration: Duration,
}

impl<L: KeyListener> ListenerDispatcher<L> {
    pub fn new(listener: L) -> Self {
        Self::with_action_duration(listener, DEFAULT_ACTION_DURATION)
    }

    pub fn with_action_duration(listener: L, action_duration: Duration) -> Self {
        Self {
            listener,
            lifecycle: Lifecycle::new(),
            actions: ActionQueue::new(),
            action_duration,
        }
    }

    pub fn listener(&self) -> &L {
        &self.listener
    }

    pub fn actions(&self) -> &ActionQueue {
        &self.actions
    }

    pub fn action_duration(&self) -> Duration {
        self.action_duration
    }
}

impl<L: KeyListener> KeyboardDispatcher for ListenerDispatcher<L> {
    fn dispatch(&self, event: &KeyEvent) -> anyhow::Result<()> {
        match event.transition() {
            KeyTransition::Typed => self.listener.key_typed(event),
            KeyTransition::Pressed => {
                self.actions.push(ActionEvent::new(
                    ActionKind::Key,
                    event.library_key(),
                    self.action_duration,
                ));
                self.listener.key_pressed(event)
            }
            KeyTransition::Released => self.listener.key_released(event),
        }
    }

    fn start(&self) -> Result<()> {
        self.lifecycle.start()
    }

    fn state(&self) -> ServiceState {
        self.lifecycle.state()
    }

    fn interrupt(&self) -> Result<()> {
        self.lifecycle.stop();
        self.actions.clear();
        Ok(())
    }

    fn terminate(&self) -> Result<()> {
        self.lifecycle.stop();
        self.actions.clear();
        Ok(())
    }

    fn update(&self, _elapsed: Duration) {
        let removed = self.actions.prune();
        if removed > 0 {
            debug!("pruned {} stale key actions", removed);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::event::Modifiers;
    use std::sync::Mutex;

    #[derive(Default)]
    struct Journal {
        entries: Mutex<Vec<(&'static str, u32)>>,
    }

    impl KeyListener for Journal {
        fn key_typed(&self, event: &KeyEvent) -> anyhow::Result<()> {
            self.entries
                .lock()
                .unwrap()
                .push(("typed", event.virtual_key()));
            Ok(())
        }

        fn key_pressed(&self, event: &KeyEvent) -> anyhow::Result<()> {
            self.entries
                .lock()
                .unwrap()
                .push(("pressed", event.virtual_key()));
            Ok(())
        }

        fn key_released(&self, event: &KeyEvent) -> anyhow::Result<()> {
            if event.virtual_key() == 0x1B {
                anyhow::bail!("escape not allowed");
            }
            self.entries
                .lock()
                .unwrap()
                .push(("released", event.virtual_key()));
            Ok(())
        }
    }

    fn event(transition: KeyTransition, vk: u32, library_key: u32) -> KeyEvent {
        KeyEvent::new(transition, vk, library_key, None, Modifiers::empty())
    }

    #[test]
    fn test_routes_by_transition() {
        let dispatcher = ListenerDispatcher::new(Journal::default());
        dispatcher.start().unwrap();

        dispatcher
            .dispatch(&event(KeyTransition::Pressed, 65, 40))
            .unwrap();
        dispatcher
            .dispatch(&event(KeyTransition::Typed, 65, 40))
            .unwrap();
        dispatcher
            .dispatch(&event(KeyTransition::Released, 65, 40))
            .unwrap();

        assert_eq!(
            *dispatcher.listener().entries.lock().unwrap(),
            vec![("pressed", 65), ("typed", 65), ("released", 65)]
        );
    }

    #[test]
    fn test_listener_errors_propagate() {
        let dispatcher = ListenerDispatcher::new(Journal::default());
        let err = dispatcher
            .dispatch(&event(KeyTransition::Released, 0x1B, 4))
            .unwrap_err();
        assert_eq!(err.to_string(), "escape not allowed");
    }

    #[test]
    fn test_pressed_records_action() {
        let dispatcher = ListenerDispatcher::new(Journal::default());
        dispatcher
            .dispatch(&event(KeyTransition::Pressed, 65, 40))
            .unwrap();
        dispatcher
            .dispatch(&event(KeyTransition::Typed, 65, 40))
            .unwrap();

        assert_eq!(dispatcher.actions().len(), 1);
        assert!(dispatcher.actions().claim(40));
        assert!(!dispatcher.actions().claim(40));
    }

    #[test]
    fn test_update_prunes_expired_actions() {
        let dispatcher =
            ListenerDispatcher::with_action_duration(Journal::default(), Duration::ZERO);
        dispatcher
            .dispatch(&event(KeyTransition::Pressed, 65, 40))
            .unwrap();
        assert_eq!(dispatcher.actions().len(), 1);

        dispatcher.update(Duration::from_millis(16));
        assert!(dispatcher.actions().is_empty());
    }

    #[test]
    fn test_lifecycle() {
        let dispatcher = ListenerDispatcher::new(Journal::default());
        assert_eq!(dispatcher.state(), ServiceState::Undefined);
        dispatcher.start().unwrap();
        assert_eq!(dispatcher.state(), ServiceState::Running);
        assert!(dispatcher.start().is_err());

        dispatcher
            .dispatch(&event(KeyTransition::Pressed, 65, 40))
            .unwrap();
        dispatcher.interrupt().unwrap();
        assert_eq!(dispatcher.state(), ServiceState::Stopped);
        assert!(dispatcher.actions().is_empty());

        dispatcher.terminate().unwrap();
        assert_eq!(dispatcher.state(), ServiceState::Stopped);
    }
}
