//! Keyboard key-transition events.

use std::fmt;
use std::hash::{Hash, Hasher};

use super::{ConsumeFlag, Genre, InputEvent, Modifiers};

/// Phase of a key interaction.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum KeyTransition {
    /// A character was produced. Always accompanied by a `Pressed` event for
    /// the same activation.
    Typed,
    /// The key went down (repeats while held).
    Pressed,
    /// The key went up. Fires once per press cycle.
    Released,
}

impl KeyTransition {
    #[inline(always)]
    pub const fn code(self) -> u8 {
        match self {
            Self::Typed => 1,
            Self::Pressed => 2,
            Self::Released => 3,
        }
    }

    #[inline(always)]
    pub const fn from_code(code: u8) -> Option<Self> {
        match code {
            1 => Some(Self::Typed),
            2 => Some(Self::Pressed),
            3 => Some(Self::Released),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Typed => "TYPED",
            Self::Pressed => "PRESSED",
            Self::Released => "RELEASED",
        }
    }
}

impl fmt::Display for KeyTransition {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Notification as delivered by a capture source, before it becomes a
/// [`KeyEvent`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RawKeyEvent {
    pub transition: KeyTransition,
    pub virtual_key: u32,
    pub library_key: u32,
    pub character: Option<char>,
    pub modifier_mask: u8,
}

impl RawKeyEvent {
    pub fn new(
        transition: KeyTransition,
        virtual_key: u32,
        library_key: u32,
        character: Option<char>,
        modifier_mask: u8,
    ) -> Self {
        Self {
            transition,
            virtual_key,
            library_key,
            character,
            modifier_mask,
        }
    }
}

/// A key transition with the keyboard state at the time it happened.
///
/// Two key events are equal when their virtual key and modifiers are equal;
/// transition, library key and character are ignored.
#[derive(Debug, Clone)]
pub struct KeyEvent {
    transition: KeyTransition,
    virtual_key: u32,
    library_key: u32,
    character: Option<char>,
    modifiers: Modifiers,
    consumed: ConsumeFlag,
}

impl KeyEvent {
    pub fn new(
        transition: KeyTransition,
        virtual_key: u32,
        library_key: u32,
        character: Option<char>,
        modifiers: Modifiers,
    ) -> Self {
        Self {
            transition,
            virtual_key,
            library_key,
            character,
            modifiers,
            consumed: ConsumeFlag::new(),
        }
    }

    #[inline(always)]
    pub fn transition(&self) -> KeyTransition {
        self.transition
    }

    #[inline(always)]
    pub fn virtual_key(&self) -> u32 {
        self.virtual_key
    }

    /// Key code in the library's own enumeration (see [`crate::keys::Key`]).
    #[inline(always)]
    pub fn library_key(&self) -> u32 {
        self.library_key
    }

    /// Character for `Typed` events. Carries no meaning for other transitions.
    #[inline(always)]
    pub fn character(&self) -> Option<char> {
        self.character
    }

    #[inline(always)]
    pub fn modifiers(&self) -> Modifiers {
        self.modifiers
    }

    #[inline]
    pub fn has_shift(&self) -> bool {
        self.modifiers.has_shift()
    }

    #[inline]
    pub fn has_control(&self) -> bool {
        self.modifiers.has_control()
    }

    #[inline]
    pub fn has_alt(&self) -> bool {
        self.modifiers.has_alt()
    }

    #[inline]
    pub fn is_left(&self) -> bool {
        self.modifiers.is_left()
    }

    #[inline]
    pub fn is_right(&self) -> bool {
        self.modifiers.is_right()
    }

    /// `true` while the key is going or staying down.
    #[inline]
    pub fn is_transition(&self) -> bool {
        self.transition != KeyTransition::Released
    }
}

impl From<RawKeyEvent> for KeyEvent {
    fn from(raw: RawKeyEvent) -> Self {
        Self::new(
            raw.transition,
            raw.virtual_key,
            raw.library_key,
            raw.character,
            Modifiers::from_mask(raw.modifier_mask),
        )
    }
}

impl InputEvent for KeyEvent {
    fn genre(&self) -> Genre {
        Genre::Keyboard
    }

    fn type_code(&self) -> u8 {
        self.transition.code()
    }

    fn consumption(&self) -> &ConsumeFlag {
        &self.consumed
    }
}

impl PartialEq for KeyEvent {
    fn eq(&self, other: &Self) -> bool {
        self.virtual_key == other.virtual_key && self.modifiers == other.modifiers
    }
}

impl Eq for KeyEvent {}

impl Hash for KeyEvent {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.virtual_key.hash(state);
        self.modifiers.hash(state);
    }
}

impl fmt::Display for KeyEvent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} {} vk=0x{:02X} key={} modifiers={}",
            self.genre(),
            self.transition,
            self.virtual_key,
            self.library_key,
            self.modifiers
        )?;
        if let Some(ch) = self.character {
            write!(f, " char={:?}", ch)?;
        }
        if self.is_consumed() {
            f.write_str(" consumed")?;
        }
        Ok(())
    }
}
