//! Turns OS key-down / key-up notifications into [`RawKeyEvent`]s.
//!
//! The translator tracks which keys are held and the caps-lock toggle so that
//! every notification carries the modifier state at the time it happened.
//! Characters follow the ABNT2 layout.

use std::fmt;
use std::sync::atomic::{AtomicBool, Ordering};

use scc::HashSet;
use smallvec::SmallVec;

use crate::event::{KeyTransition, Modifiers, RawKeyEvent};
use crate::keys::{Key, vk};

/// At most a PRESSED and a TYPED event per notification.
pub type Translated = SmallVec<[RawKeyEvent; 2]>;

pub struct KeyTranslator {
    held: HashSet<u32>,
    caps_lock: AtomicBool,
}

impl Default for KeyTranslator {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for KeyTranslator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("KeyTranslator")
            .field("held", &self.held.len())
            .field("modifiers", &self.modifiers())
            .finish()
    }
}

impl KeyTranslator {
    pub fn new() -> Self {
        Self {
            held: HashSet::new(),
            caps_lock: AtomicBool::new(false),
        }
    }

    /// Translates one notification for `virtual_key`. `down` is true for
    /// key-down (including auto-repeat) and false for key-up.
    pub fn translate(&self, virtual_key: u32, down: bool) -> Translated {
        let mut out = Translated::new();
        let Some(key) = Key::from_virtual_key(virtual_key) else {
            return out;
        };
        let code = key.code();

        if down {
            let repeat = self.held.insert_sync(code).is_err();
            if key == Key::CapsLock && !repeat {
                self.caps_lock.fetch_xor(true, Ordering::AcqRel);
            }

            let modifiers = self.modifiers();
            out.push(RawKeyEvent::new(
                KeyTransition::Pressed,
                virtual_key,
                code,
                None,
                modifiers.mask(),
            ));
            if let Some(ch) = character(virtual_key, modifiers) {
                out.push(RawKeyEvent::new(
                    KeyTransition::Typed,
                    virtual_key,
                    code,
                    Some(ch),
                    modifiers.mask(),
                ));
            }
        } else {
            // modifiers are sampled before the key leaves the held set, so a
            // released SHIFT still reports SHIFT
            let modifiers = self.modifiers();
            if self.held.remove_sync(&code).is_none() {
                return out;
            }
            out.push(RawKeyEvent::new(
                KeyTransition::Released,
                virtual_key,
                code,
                None,
                modifiers.mask(),
            ));
        }
        out
    }

    /// Modifier state derived from the held keys and the caps-lock toggle.
    pub fn modifiers(&self) -> Modifiers {
        let mut modifiers = Modifiers::empty();
        if self.caps_lock.load(Ordering::Acquire) {
            modifiers |= Modifiers::CAPITAL;
        }

        let sides = [
            (Key::LeftShift, Modifiers::SHIFT | Modifiers::LEFT),
            (Key::RightShift, Modifiers::SHIFT | Modifiers::RIGHT),
            (Key::LeftControl, Modifiers::CONTROL | Modifiers::LEFT),
            (Key::RightControl, Modifiers::CONTROL | Modifiers::RIGHT),
            (Key::LeftAlt, Modifiers::ALT | Modifiers::LEFT),
            (Key::RightAlt, Modifiers::ALT | Modifiers::RIGHT),
        ];
        for (key, flags) in sides {
            if self.held.contains_sync(&key.code()) {
                modifiers |= flags;
            }
        }
        modifiers
    }

    pub fn is_held(&self, key: Key) -> bool {
        self.held.contains_sync(&key.code())
    }

    /// Forgets held keys and the caps-lock toggle.
    pub fn reset(&self) {
        self.held.clear_sync();
        self.caps_lock.store(false, Ordering::Release);
    }
}

/// Upper case when exactly one of caps-lock and shift is active.
fn case(modifiers: Modifiers, lower: char, upper: char) -> char {
    if modifiers.has_capital() != modifiers.has_shift() {
        upper
    } else {
        lower
    }
}

/// Shift selects `second`, shift with alt selects `third`.
fn alternative(
    modifiers: Modifiers,
    first: char,
    second: char,
    third: Option<char>,
) -> Option<char> {
    match (modifiers.has_shift(), modifiers.has_alt()) {
        (false, _) => Some(first),
        (true, false) => Some(second),
        (true, true) => third,
    }
}

const DIGIT_SHIFTED: [char; 10] = [')', '!', '@', '#', '$', '%', '¨', '&', '*', '('];
const DIGIT_THIRD: [Option<char>; 10] = [
    None,
    Some('¹'),
    Some('²'),
    Some('³'),
    Some('£'),
    Some('¢'),
    Some('¬'),
    None,
    None,
    None,
];

fn character(virtual_key: u32, modifiers: Modifiers) -> Option<char> {
    let ch = match virtual_key {
        vk::TAB => '\t',
        vk::RETURN => '\n',
        vk::SPACE => ' ',
        vk::DIGIT_0..=vk::DIGIT_9 => {
            let i = (virtual_key - vk::DIGIT_0) as usize;
            let base = char::from_digit(i as u32, 10)?;
            return alternative(modifiers, base, DIGIT_SHIFTED[i], DIGIT_THIRD[i]);
        }
        vk::A..=vk::Z => {
            let upper = char::from_u32(virtual_key)?;
            case(modifiers, upper.to_ascii_lowercase(), upper)
        }
        vk::NUMPAD0..=vk::NUMPAD9 => char::from_digit(virtual_key - vk::NUMPAD0, 10)?,
        vk::MULTIPLY => '*',
        vk::ADD => '+',
        vk::SEPARATOR => '.',
        vk::SUBTRACT => '-',
        vk::DECIMAL => ',',
        vk::DIVIDE => '/',
        vk::OEM_1 => case(modifiers, 'ç', 'Ç'),
        vk::OEM_PLUS => '+',
        vk::OEM_COMMA => ',',
        vk::OEM_MINUS => '-',
        vk::OEM_PERIOD => '.',
        vk::OEM_2 => return alternative(modifiers, ';', ':', None),
        vk::OEM_3 => return alternative(modifiers, '\'', '"', None),
        vk::OEM_4 => return alternative(modifiers, '´', '`', None),
        vk::OEM_5 => return alternative(modifiers, ']', '}', None),
        vk::OEM_6 => return alternative(modifiers, '[', '{', None),
        vk::OEM_7 => return alternative(modifiers, '~', '^', None),
        vk::ABNT_C1 => return alternative(modifiers, '/', '?', Some('#')),
        vk::OEM_102 => return alternative(modifiers, '\\', '|', Some('#')),
        _ => return None,
    };
    Some(ch)
}

#[cfg(test)]
mod tests {
    use super::*;

    mod vk {
        pub use crate::keys::vk::*;
        pub const B: u32 = 0x42;
    }

    fn transitions(events: &Translated) -> Vec<KeyTransition> {
        events.iter().map(|e| e.transition).collect()
    }

    #[test]
    fn test_letter_press_type_release() {
        let t = KeyTranslator::new();

        let down = t.translate(vk::A, true);
        assert_eq!(
            transitions(&down),
            vec![KeyTransition::Pressed, KeyTransition::Typed]
        );
        assert_eq!(down[0].character, None);
        assert_eq!(down[1].character, Some('a'));
        assert_eq!(down[1].library_key, Key::A.code());

        let up = t.translate(vk::A, false);
        assert_eq!(transitions(&up), vec![KeyTransition::Released]);
        assert_eq!(up[0].character, None);
    }

    #[test]
    fn test_release_fires_once_per_cycle() {
        let t = KeyTranslator::new();
        t.translate(vk::A, true);
        // auto-repeat
        assert_eq!(t.translate(vk::A, true).len(), 2);
        assert_eq!(t.translate(vk::A, false).len(), 1);
        assert!(t.translate(vk::A, false).is_empty());
    }

    #[test]
    fn test_shift_and_caps_lock_case() {
        let t = KeyTranslator::new();

        t.translate(vk::LSHIFT, true);
        assert_eq!(t.translate(vk::B, true)[1].character, Some('B'));
        t.translate(vk::B, false);

        let up = t.translate(vk::LSHIFT, false);
        assert!(Modifiers::from_mask(up[0].modifier_mask).has_shift());
        assert!(!t.modifiers().has_shift());

        t.translate(vk::CAPITAL, true);
        t.translate(vk::CAPITAL, false);
        assert!(t.modifiers().has_capital());
        assert_eq!(t.translate(vk::B, true)[1].character, Some('B'));
        t.translate(vk::B, false);

        t.translate(vk::RSHIFT, true);
        assert_eq!(t.translate(vk::B, true)[1].character, Some('b'));
    }

    #[test]
    fn test_caps_lock_ignores_auto_repeat() {
        let t = KeyTranslator::new();
        t.translate(vk::CAPITAL, true);
        t.translate(vk::CAPITAL, true);
        t.translate(vk::CAPITAL, false);
        assert!(t.modifiers().has_capital());

        t.translate(vk::CAPITAL, true);
        t.translate(vk::CAPITAL, false);
        assert!(!t.modifiers().has_capital());
    }

    #[test]
    fn test_modifier_sides() {
        let t = KeyTranslator::new();
        t.translate(vk::RCONTROL, true);
        let m = t.modifiers();
        assert!(m.has_control());
        assert!(m.is_right());
        assert!(!m.is_left());

        t.translate(vk::LMENU, true);
        let m = t.modifiers();
        assert!(m.has_alt());
        assert!(m.is_left());
        assert!(m.is_right());

        t.translate(vk::RCONTROL, false);
        assert!(!t.modifiers().is_right());
    }

    #[test]
    fn test_digit_alternatives() {
        let t = KeyTranslator::new();
        assert_eq!(t.translate(0x31, true)[1].character, Some('1'));
        t.translate(0x31, false);

        t.translate(vk::LSHIFT, true);
        assert_eq!(t.translate(0x36, true)[1].character, Some('¨'));
        t.translate(0x36, false);

        t.translate(vk::RMENU, true);
        assert_eq!(t.translate(0x32, true)[1].character, Some('²'));
        t.translate(0x32, false);

        // no third-level character on 7
        let seven = t.translate(0x37, true);
        assert_eq!(transitions(&seven), vec![KeyTransition::Pressed]);
    }

    #[test]
    fn test_fixed_characters() {
        let t = KeyTranslator::new();
        for (code, expected) in [
            (vk::TAB, '\t'),
            (vk::RETURN, '\n'),
            (vk::SPACE, ' '),
            (0x65, '5'),
            (vk::DECIMAL, ','),
            (vk::SEPARATOR, '.'),
            (vk::OEM_1, 'ç'),
            (vk::ABNT_C1, '/'),
            (vk::OEM_102, '\\'),
        ] {
            let down = t.translate(code, true);
            assert_eq!(down[1].character, Some(expected), "vk 0x{:02X}", code);
            t.translate(code, false);
        }
    }

    #[test]
    fn test_non_character_keys_only_press() {
        let t = KeyTranslator::new();
        assert_eq!(
            transitions(&t.translate(vk::F1, true)),
            vec![KeyTransition::Pressed]
        );
        assert_eq!(
            transitions(&t.translate(vk::ESCAPE, true)),
            vec![KeyTransition::Pressed]
        );
    }

    #[test]
    fn test_ignored_keys_produce_nothing() {
        let t = KeyTranslator::new();
        // volume up, browser back
        assert!(t.translate(0xAF, true).is_empty());
        assert!(t.translate(0xA6, true).is_empty());
        assert!(t.translate(0xAF, false).is_empty());
    }

    #[test]
    fn test_generic_shift_counts_as_left() {
        let t = KeyTranslator::new();
        t.translate(vk::SHIFT, true);
        assert!(t.is_held(Key::LeftShift));
        let m = t.modifiers();
        assert!(m.has_shift());
        assert!(m.is_left());
    }

    #[test]
    fn test_reset() {
        let t = KeyTranslator::new();
        t.translate(vk::CAPITAL, true);
        t.translate(vk::LSHIFT, true);
        t.reset();
        assert!(t.modifiers().is_empty());
        assert!(t.translate(vk::LSHIFT, false).is_empty());
    }
}
