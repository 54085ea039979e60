//! Convenience bitwise operations for register decoding.

/// Simple check for particular bits being set or cleared.
pub trait BitFlags {
    fn is_set(&self, bit: u8) -> bool;
    fn is_clear(&self, bit: u8) -> bool;
}

/// Extraction of a contiguous bit field.
pub trait BitField {
    /// Returns `width` bits starting at `low`, shifted down to bit 0.
    fn field(&self, low: u8, width: u8) -> u32;
}

/// Blanket implementation for any types convertible to u32.
impl<U: Copy + Into<u32>> BitFlags for U {
    fn is_set(&self, bit: u8) -> bool {
        assert!(bit < 32);
        ((*self).into() & (1u32 << bit)) != 0
    }

    fn is_clear(&self, bit: u8) -> bool { !self.is_set(bit) }
}

impl<U: Copy + Into<u32>> BitField for U {
    fn field(&self, low: u8, width: u8) -> u32 {
        assert!(width > 0 && (low as u32 + width as u32) <= 32);
        let mask = if width == 32 { u32::MAX } else { (1u32 << width) - 1 };
        ((*self).into() >> low) & mask
    }
}
