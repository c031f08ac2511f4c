//! Keyboard modifier bit-set attached to every key event.

use std::fmt;

bitflags::bitflags! {
    /// Keyboard state at the moment of a key event.
    ///
    /// `LEFT`/`RIGHT` tell which side the held modifier keys are on; they are
    /// independent of which modifier is held.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
    pub struct Modifiers: u8 {
        const CAPITAL = 0x01;
        const LEFT    = 0x02;
        const RIGHT   = 0x04;
        const SHIFT   = 0x08;
        const CONTROL = 0x10;
        const ALT     = 0x20;
    }
}

impl Modifiers {
    /// Builds the set from a raw mask, dropping unknown bits.
    #[inline(always)]
    pub const fn from_mask(mask: u8) -> Self {
        Self::from_bits_truncate(mask)
    }

    #[inline(always)]
    pub const fn mask(self) -> u8 {
        self.bits()
    }

    #[inline(always)]
    pub fn has_shift(self) -> bool {
        self.contains(Self::SHIFT)
    }

    #[inline(always)]
    pub fn has_control(self) -> bool {
        self.contains(Self::CONTROL)
    }

    #[inline(always)]
    pub fn has_alt(self) -> bool {
        self.contains(Self::ALT)
    }

    #[inline(always)]
    pub fn has_capital(self) -> bool {
        self.contains(Self::CAPITAL)
    }

    #[inline(always)]
    pub fn is_left(self) -> bool {
        self.contains(Self::LEFT)
    }

    #[inline(always)]
    pub fn is_right(self) -> bool {
        self.contains(Self::RIGHT)
    }
}

impl Default for Modifiers {
    fn default() -> Self {
        Self::empty()
    }
}

impl fmt::Display for Modifiers {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.is_empty() {
            return f.write_str("NONE");
        }
        for (i, (name, _)) in self.iter_names().enumerate() {
            if i > 0 {
                f.write_str("|")?;
            }
            f.write_str(name)?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_bit_values() {
        assert_eq!(Modifiers::CAPITAL.mask(), 0x01);
        assert_eq!(Modifiers::LEFT.mask(), 0x02);
        assert_eq!(Modifiers::RIGHT.mask(), 0x04);
        assert_eq!(Modifiers::SHIFT.mask(), 0x08);
        assert_eq!(Modifiers::CONTROL.mask(), 0x10);
        assert_eq!(Modifiers::ALT.mask(), 0x20);
    }

    #[test]
    fn test_set_test_clear() {
        let mut mods = Modifiers::default();
        assert!(!mods.has_shift());

        mods.insert(Modifiers::SHIFT | Modifiers::LEFT);
        assert!(mods.has_shift());
        assert!(mods.is_left());
        assert!(!mods.is_right());

        mods.set(Modifiers::CONTROL, true);
        assert!(mods.has_control());

        mods.remove(Modifiers::SHIFT);
        assert!(!mods.has_shift());
        assert!(mods.is_left());
        assert_eq!(mods.mask(), 0x12);
    }

    #[test]
    fn test_from_mask_drops_unknown_bits() {
        let mods = Modifiers::from_mask(0xC9);
        assert_eq!(mods, Modifiers::CAPITAL | Modifiers::SHIFT);
    }

    #[test]
    fn test_display() {
        assert_eq!(Modifiers::empty().to_string(), "NONE");
        assert_eq!(
            (Modifiers::SHIFT | Modifiers::LEFT).to_string(),
            "LEFT|SHIFT"
        );
    }
}
