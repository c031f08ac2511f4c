//! Time-bounded, one-shot action events.

use std::fmt;
use std::sync::{Mutex, PoisonError};
use std::time::{Duration, Instant};

use smallvec::SmallVec;

use super::{ConsumeFlag, Genre, InputEvent};

/// What kind of activation an [`ActionEvent`] stands for.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum ActionKind {
    #[default]
    Undefined,
    Key,
    Button,
}

impl ActionKind {
    #[inline(always)]
    pub const fn code(self) -> u8 {
        match self {
            Self::Undefined => 0,
            Self::Key => 1,
            Self::Button => 2,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Undefined => "UNDEFINED",
            Self::Key => "KEY",
            Self::Button => "BUTTON",
        }
    }
}

/// A detected action that can be claimed once while its window is open.
///
/// The event expires `duration` after creation. [`ActionEvent::claim`] checks
/// the code and the window and consumes the event in one atomic step, so at
/// most one caller ever gets `true`.
#[derive(Debug, Clone)]
pub struct ActionEvent {
    kind: ActionKind,
    code: u32,
    created_at: Instant,
    duration: Duration,
    consumed: ConsumeFlag,
}

impl ActionEvent {
    pub fn new(kind: ActionKind, code: u32, duration: Duration) -> Self {
        Self::created_at(kind, code, duration, Instant::now())
    }

    /// Builds an event with an explicit creation instant.
    pub fn created_at(kind: ActionKind, code: u32, duration: Duration, at: Instant) -> Self {
        Self {
            kind,
            code,
            created_at: at,
            duration,
            consumed: ConsumeFlag::new(),
        }
    }

    #[inline(always)]
    pub fn kind(&self) -> ActionKind {
        self.kind
    }

    #[inline(always)]
    pub fn code(&self) -> u32 {
        self.code
    }

    #[inline(always)]
    pub fn creation_instant(&self) -> Instant {
        self.created_at
    }

    #[inline(always)]
    pub fn duration(&self) -> Duration {
        self.duration
    }

    /// Claims the event if it carries `expected` and is still valid.
    pub fn claim(&self, expected: u32) -> bool {
        self.claim_at(expected, Instant::now())
    }

    pub fn claim_at(&self, expected: u32, now: Instant) -> bool {
        if self.code != expected || self.is_expired_at(now) {
            return false;
        }
        self.consumed.consume()
    }

    #[inline]
    pub fn is_expired(&self) -> bool {
        self.is_expired_at(Instant::now())
    }

    /// Expired once `now >= created_at + duration`.
    pub fn is_expired_at(&self, now: Instant) -> bool {
        now.saturating_duration_since(self.created_at) >= self.duration
    }

    #[inline]
    pub fn is_valid(&self) -> bool {
        self.is_valid_at(Instant::now())
    }

    pub fn is_valid_at(&self, now: Instant) -> bool {
        !self.is_consumed() && !self.is_expired_at(now)
    }
}

impl InputEvent for ActionEvent {
    fn genre(&self) -> Genre {
        Genre::Input
    }

    fn type_code(&self) -> u8 {
        self.kind.code()
    }

    fn consumption(&self) -> &ConsumeFlag {
        &self.consumed
    }
}

impl fmt::Display for ActionEvent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} {} code={} duration={}ms",
            self.genre(),
            self.kind.as_str(),
            self.code,
            self.duration.as_millis()
        )?;
        if self.is_consumed() {
            f.write_str(" consumed")?;
        }
        Ok(())
    }
}

/// Pending actions waiting to be claimed, oldest first.
#[derive(Debug, Default)]
pub struct ActionQueue {
    actions: Mutex<SmallVec<[ActionEvent; 8]>>,
}

impl ActionQueue {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&self, action: ActionEvent) {
        self.lock().push(action);
    }

    /// Claims the oldest valid action carrying `code`.
    pub fn claim(&self, code: u32) -> bool {
        self.claim_at(code, Instant::now())
    }

    pub fn claim_at(&self, code: u32, now: Instant) -> bool {
        self.lock().iter().any(|action| action.claim_at(code, now))
    }

    /// Drops consumed and expired actions. Returns how many were removed.
    pub fn prune(&self) -> usize {
        self.prune_at(Instant::now())
    }

    pub fn prune_at(&self, now: Instant) -> usize {
        let mut actions = self.lock();
        let before = actions.len();
        actions.retain(|action| action.is_valid_at(now));
        before - actions.len()
    }

    pub fn len(&self) -> usize {
        self.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.lock().is_empty()
    }

    pub fn clear(&self) {
        self.lock().clear();
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, SmallVec<[ActionEvent; 8]>> {
        self.actions.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;
    use std::thread;

    const D: Duration = Duration::from_millis(100);

    #[test]
    fn test_valid_inside_window() {
        let t0 = Instant::now();
        let action = ActionEvent::created_at(ActionKind::Key, 7, D, t0);
        assert!(action.is_valid_at(t0));
        assert!(action.is_valid_at(t0 + Duration::from_millis(99)));
        assert!(!action.is_expired_at(t0 + Duration::from_millis(99)));
    }

    #[test]
    fn test_expired_at_window_end() {
        let t0 = Instant::now();
        let action = ActionEvent::created_at(ActionKind::Key, 7, D, t0);
        assert!(action.is_expired_at(t0 + D));
        assert!(!action.is_valid_at(t0 + D));
        assert!(!action.is_valid_at(t0 + Duration::from_secs(5)));
    }

    #[test]
    fn test_claim_consumes_once() {
        let t0 = Instant::now();
        let action = ActionEvent::created_at(ActionKind::Button, 3, D, t0);

        assert!(!action.claim_at(4, t0));
        assert!(!action.is_consumed());

        assert!(action.claim_at(3, t0));
        assert!(action.is_consumed());
        assert!(!action.is_valid_at(t0));

        assert!(!action.claim_at(3, t0));
        assert!(!action.claim_at(4, t0));
    }

    #[test]
    fn test_expired_action_cannot_be_claimed() {
        let t0 = Instant::now();
        let action = ActionEvent::created_at(ActionKind::Key, 3, D, t0);
        assert!(!action.claim_at(3, t0 + D));
        assert!(!action.is_consumed());
    }

    #[test]
    fn test_concurrent_claims_have_single_winner() {
        let action = Arc::new(ActionEvent::new(ActionKind::Key, 9, Duration::from_secs(60)));
        let handles: Vec<_> = (0..8)
            .map(|_| {
                let action = Arc::clone(&action);
                thread::spawn(move || action.claim(9))
            })
            .collect();
        let winners = handles
            .into_iter()
            .map(|h| h.join().unwrap())
            .filter(|won| *won)
            .count();
        assert_eq!(winners, 1);
    }

    #[test]
    fn test_type_code_and_genre() {
        let action = ActionEvent::new(ActionKind::Button, 1, D);
        assert_eq!(action.genre(), Genre::Input);
        assert_eq!(action.type_code(), 2);
        assert_eq!(ActionKind::Undefined.code(), 0);
    }

    #[test]
    fn test_queue_claims_oldest_matching() {
        let t0 = Instant::now();
        let queue = ActionQueue::new();
        queue.push(ActionEvent::created_at(ActionKind::Key, 1, D, t0));
        queue.push(ActionEvent::created_at(ActionKind::Key, 2, D, t0));
        queue.push(ActionEvent::created_at(ActionKind::Key, 1, D, t0));

        assert!(queue.claim_at(1, t0));
        assert!(queue.claim_at(1, t0));
        assert!(!queue.claim_at(1, t0));
        assert!(queue.claim_at(2, t0));
        assert_eq!(queue.len(), 3);

        assert_eq!(queue.prune_at(t0), 3);
        assert!(queue.is_empty());
    }

    #[test]
    fn test_queue_prunes_expired() {
        let t0 = Instant::now();
        let queue = ActionQueue::new();
        queue.push(ActionEvent::created_at(ActionKind::Key, 1, D, t0));
        queue.push(ActionEvent::created_at(
            ActionKind::Key,
            2,
            Duration::from_secs(10),
            t0,
        ));

        assert_eq!(queue.prune_at(t0 + D), 1);
        assert_eq!(queue.len(), 1);
        assert!(!queue.claim_at(1, t0 + D));
        assert!(queue.claim_at(2, t0 + D));
    }
}
