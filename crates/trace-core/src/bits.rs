//! Bit-range accessors over 32-bit instruction words.
//!
//! Every decode table in the crate is expressed as `const` [`Field`] values,
//! so an out-of-range field is rejected while the table is being compiled
//! rather than when a word is read.

/// Inclusive bit range `lo..=hi` of a 32-bit container (bit 0 is the LSB).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Field {
    lo: u32,
    hi: u32,
}

impl Field {
    /// Creates a field covering bits `lo..=hi`.
    ///
    /// # Panics
    ///
    /// Panics when `hi > 31` or `lo > hi`. Used in a `const` item this is a
    /// compile-time error.
    #[must_use]
    pub const fn new(lo: u32, hi: u32) -> Self {
        assert!(hi < 32, "field end bit out of range");
        assert!(lo <= hi, "field start bit must not exceed end bit");
        Self { lo, hi }
    }

    /// Creates a single-bit field.
    #[must_use]
    pub const fn bit(index: u32) -> Self {
        Self::new(index, index)
    }

    /// Lowest bit index covered by this field.
    #[must_use]
    pub const fn lo(self) -> u32 {
        self.lo
    }

    /// Highest bit index covered by this field.
    #[must_use]
    pub const fn hi(self) -> u32 {
        self.hi
    }

    /// Number of bits covered by this field.
    #[must_use]
    pub const fn width(self) -> u32 {
        self.hi - self.lo + 1
    }

    /// Right-aligned mask of `width()` ones.
    #[must_use]
    pub const fn mask(self) -> u32 {
        if self.width() == 32 {
            u32::MAX
        } else {
            (1 << self.width()) - 1
        }
    }

    /// Extracts the unsigned value of this field.
    #[must_use]
    pub const fn get(self, word: u32) -> u32 {
        (word >> self.lo) & self.mask()
    }

    /// Extracts the value of this field sign-extended from bit `hi`.
    #[must_use]
    #[allow(clippy::cast_possible_wrap)]
    pub const fn get_signed(self, word: u32) -> i32 {
        let shift = 32 - self.width();
        ((self.get(word) << shift) as i32) >> shift
    }

    /// Returns `true` when any bit of the field is set.
    #[must_use]
    pub const fn is_set(self, word: u32) -> bool {
        self.get(word) != 0
    }

    /// Returns `word` with this field replaced by the low bits of `value`.
    #[must_use]
    pub const fn set(self, word: u32, value: u32) -> u32 {
        let mask = self.mask() << self.lo;
        (word & !mask) | ((value << self.lo) & mask)
    }
}
