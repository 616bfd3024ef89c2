//! Immutable field views over ARM and Thumb instruction words.
//!
//! Each view wraps the raw word and exposes only the fields of one encoding
//! shape. Views are constructed per decode call and never carry state.

mod arm;
mod thumb;

pub use arm::{
    Branch, Coprocessor, DataProcessing, ExceptionGenerating, LoadStore, LoadStoreMultiple,
    MiscLoadStore, Multiply, ShiftType, ShiftedRegister, StatusTransfer, BITS_27_20, BITS_27_24,
    BITS_27_25, BITS_27_26, BITS_7_4,
};
pub use thumb::ThumbInstruction;

/// Extended opcode key `(bits 27..20 << 4) | bits 7..4` used by the
/// miscellaneous and multiply decode tables.
#[must_use]
pub const fn extended_opcode(word: u32) -> u32 {
    (BITS_27_20.get(word) << 4) | BITS_7_4.get(word)
}

#[cfg(test)]
mod tests {
    use super::extended_opcode;

    #[test]
    fn extended_opcode_keys() {
        assert_eq!(extended_opcode(0xE12F_FF1E), 0x121);
        assert_eq!(extended_opcode(0xE12F_FF30), 0x123);
        assert_eq!(extended_opcode(0xE020_2091), 0x029);
        assert_eq!(extended_opcode(0xE120_0070), 0x127);
    }
}
