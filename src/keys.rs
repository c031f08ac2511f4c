//! Library key enumeration and the virtual-key codes it is derived from.

/// Virtual-key codes as reported by low-level keyboard hooks.
pub mod vk {
    pub const BACK: u32 = 0x08;
    pub const TAB: u32 = 0x09;
    pub const RETURN: u32 = 0x0D;
    pub const SHIFT: u32 = 0x10;
    pub const CONTROL: u32 = 0x11;
    pub const MENU: u32 = 0x12;
    pub const PAUSE: u32 = 0x13;
    pub const CAPITAL: u32 = 0x14;
    pub const ESCAPE: u32 = 0x1B;
    pub const SPACE: u32 = 0x20;
    pub const PRIOR: u32 = 0x21;
    pub const NEXT: u32 = 0x22;
    pub const END: u32 = 0x23;
    pub const HOME: u32 = 0x24;
    pub const LEFT: u32 = 0x25;
    pub const UP: u32 = 0x26;
    pub const RIGHT: u32 = 0x27;
    pub const DOWN: u32 = 0x28;
    pub const SNAPSHOT: u32 = 0x2C;
    pub const INSERT: u32 = 0x2D;
    pub const DELETE: u32 = 0x2E;
    pub const DIGIT_0: u32 = 0x30;
    pub const DIGIT_9: u32 = 0x39;
    pub const A: u32 = 0x41;
    pub const Z: u32 = 0x5A;
    pub const LWIN: u32 = 0x5B;
    pub const RWIN: u32 = 0x5C;
    pub const APPS: u32 = 0x5D;
    pub const NUMPAD0: u32 = 0x60;
    pub const NUMPAD9: u32 = 0x69;
    pub const MULTIPLY: u32 = 0x6A;
    pub const ADD: u32 = 0x6B;
    pub const SEPARATOR: u32 = 0x6C;
    pub const SUBTRACT: u32 = 0x6D;
    pub const DECIMAL: u32 = 0x6E;
    pub const DIVIDE: u32 = 0x6F;
    pub const F1: u32 = 0x70;
    pub const F24: u32 = 0x87;
    pub const NUMLOCK: u32 = 0x90;
    pub const SCROLL: u32 = 0x91;
    pub const LSHIFT: u32 = 0xA0;
    pub const RSHIFT: u32 = 0xA1;
    pub const LCONTROL: u32 = 0xA2;
    pub const RCONTROL: u32 = 0xA3;
    pub const LMENU: u32 = 0xA4;
    pub const RMENU: u32 = 0xA5;
    pub const OEM_1: u32 = 0xBA;
    pub const OEM_PLUS: u32 = 0xBB;
    pub const OEM_COMMA: u32 = 0xBC;
    pub const OEM_MINUS: u32 = 0xBD;
    pub const OEM_PERIOD: u32 = 0xBE;
    pub const OEM_2: u32 = 0xBF;
    pub const OEM_3: u32 = 0xC0;
    pub const ABNT_C1: u32 = 0xC1;
    pub const OEM_4: u32 = 0xDB;
    pub const OEM_5: u32 = 0xDC;
    pub const OEM_6: u32 = 0xDD;
    pub const OEM_7: u32 = 0xDE;
    pub const OEM_102: u32 = 0xE2;
}

/// Keys known to the library. The discriminant is the library key code
/// carried by [`crate::KeyEvent::library_key`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(u32)]
pub enum Key {
    Backspace = 1,
    Tab,
    Enter,
    Escape,
    Space,
    PauseBreak,
    PageUp,
    PageDown,
    End,
    Home,
    Left,
    Up,
    Right,
    Down,
    PrintScreen,
    Insert,
    Delete,
    CapsLock,
    NumLock,
    ScrollLock,
    LeftShift,
    RightShift,
    LeftControl,
    RightControl,
    LeftAlt,
    RightAlt,
    LeftWindow,
    RightWindow,
    Applications,
    Digit0,
    Digit1,
    Digit2,
    Digit3,
    Digit4,
    Digit5,
    Digit6,
    Digit7,
    Digit8,
    Digit9,
    A,
    B,
    C,
    D,
    E,
    F,
    G,
    H,
    I,
    J,
    K,
    L,
    M,
    N,
    O,
    P,
    Q,
    R,
    S,
    T,
    U,
    V,
    W,
    X,
    Y,
    Z,
    Numpad0,
    Numpad1,
    Numpad2,
    Numpad3,
    Numpad4,
    Numpad5,
    Numpad6,
    Numpad7,
    Numpad8,
    Numpad9,
    Multiply,
    Add,
    Separator,
    Subtract,
    Decimal,
    Divide,
    F1,
    F2,
    F3,
    F4,
    F5,
    F6,
    F7,
    F8,
    F9,
    F10,
    F11,
    F12,
    F13,
    F14,
    F15,
    F16,
    F17,
    F18,
    F19,
    F20,
    F21,
    F22,
    F23,
    F24,
    Cedilla,
    Plus,
    Comma,
    Minus,
    Period,
    Colon,
    Quote,
    Acute,
    RightBracket,
    LeftBracket,
    Tilde,
    Slash,
    BackSlash,
}

const DIGITS: [Key; 10] = [
    Key::Digit0,
    Key::Digit1,
    Key::Digit2,
    Key::Digit3,
    Key::Digit4,
    Key::Digit5,
    Key::Digit6,
    Key::Digit7,
    Key::Digit8,
    Key::Digit9,
];

const LETTERS: [Key; 26] = [
    Key::A,
    Key::B,
    Key::C,
    Key::D,
    Key::E,
    Key::F,
    Key::G,
    Key::H,
    Key::I,
    Key::J,
    Key::K,
    Key::L,
    Key::M,
    Key::N,
    Key::O,
    Key::P,
    Key::Q,
    Key::R,
    Key::S,
    Key::T,
    Key::U,
    Key::V,
    Key::W,
    Key::X,
    Key::Y,
    Key::Z,
];

const NUMPAD: [Key; 10] = [
    Key::Numpad0,
    Key::Numpad1,
    Key::Numpad2,
    Key::Numpad3,
    Key::Numpad4,
    Key::Numpad5,
    Key::Numpad6,
    Key::Numpad7,
    Key::Numpad8,
    Key::Numpad9,
];

const FUNCTION: [Key; 24] = [
    Key::F1,
    Key::F2,
    Key::F3,
    Key::F4,
    Key::F5,
    Key::F6,
    Key::F7,
    Key::F8,
    Key::F9,
    Key::F10,
    Key::F11,
    Key::F12,
    Key::F13,
    Key::F14,
    Key::F15,
    Key::F16,
    Key::F17,
    Key::F18,
    Key::F19,
    Key::F20,
    Key::F21,
    Key::F22,
    Key::F23,
    Key::F24,
];

impl Key {
    #[inline(always)]
    pub const fn code(self) -> u32 {
        self as u32
    }

    /// Maps a virtual-key code to a library key. Keys the library does not
    /// report (media, browser, IME keys, ...) map to `None`.
    pub fn from_virtual_key(code: u32) -> Option<Key> {
        let key = match code {
            vk::BACK => Key::Backspace,
            vk::TAB => Key::Tab,
            vk::RETURN => Key::Enter,
            vk::SHIFT => Key::LeftShift,
            vk::CONTROL => Key::LeftControl,
            vk::MENU => Key::LeftAlt,
            vk::PAUSE => Key::PauseBreak,
            vk::CAPITAL => Key::CapsLock,
            vk::ESCAPE => Key::Escape,
            vk::SPACE => Key::Space,
            vk::PRIOR => Key::PageUp,
            vk::NEXT => Key::PageDown,
            vk::END => Key::End,
            vk::HOME => Key::Home,
            vk::LEFT => Key::Left,
            vk::UP => Key::Up,
            vk::RIGHT => Key::Right,
            vk::DOWN => Key::Down,
            vk::SNAPSHOT => Key::PrintScreen,
            vk::INSERT => Key::Insert,
            vk::DELETE => Key::Delete,
            vk::DIGIT_0..=vk::DIGIT_9 => DIGITS[(code - vk::DIGIT_0) as usize],
            vk::A..=vk::Z => LETTERS[(code - vk::A) as usize],
            vk::LWIN => Key::LeftWindow,
            vk::RWIN => Key::RightWindow,
            vk::APPS => Key::Applications,
            vk::NUMPAD0..=vk::NUMPAD9 => NUMPAD[(code - vk::NUMPAD0) as usize],
            vk::MULTIPLY => Key::Multiply,
            vk::ADD => Key::Add,
            vk::SEPARATOR => Key::Separator,
            vk::SUBTRACT => Key::Subtract,
            vk::DECIMAL => Key::Decimal,
            vk::DIVIDE => Key::Divide,
            vk::F1..=vk::F24 => FUNCTION[(code - vk::F1) as usize],
            vk::NUMLOCK => Key::NumLock,
            vk::SCROLL => Key::ScrollLock,
            vk::LSHIFT => Key::LeftShift,
            vk::RSHIFT => Key::RightShift,
            vk::LCONTROL => Key::LeftControl,
            vk::RCONTROL => Key::RightControl,
            vk::LMENU => Key::LeftAlt,
            vk::RMENU => Key::RightAlt,
            vk::OEM_1 => Key::Cedilla,
            vk::OEM_PLUS => Key::Plus,
            vk::OEM_COMMA => Key::Comma,
            vk::OEM_MINUS => Key::Minus,
            vk::OEM_PERIOD => Key::Period,
            vk::OEM_2 => Key::Colon,
            vk::OEM_3 => Key::Quote,
            vk::OEM_4 => Key::Acute,
            vk::OEM_5 => Key::RightBracket,
            vk::OEM_6 => Key::LeftBracket,
            vk::OEM_7 => Key::Tilde,
            vk::ABNT_C1 => Key::Slash,
            vk::OEM_102 => Key::BackSlash,
            _ => return None,
        };
        Some(key)
    }

    pub fn is_modifier(self) -> bool {
        matches!(
            self,
            Key::LeftShift
                | Key::RightShift
                | Key::LeftControl
                | Key::RightControl
                | Key::LeftAlt
                | Key::RightAlt
        )
    }
}
