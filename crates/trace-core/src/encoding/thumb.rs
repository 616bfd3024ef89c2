//! Field view over 16-bit Thumb instruction words.

use crate::bits::Field;
use crate::condition::Condition;
use crate::register::Register;

const OPCODE_15_10: Field = Field::new(10, 15);
const OPCODE_9_6: Field = Field::new(6, 9);
const OPCODE_9_7: Field = Field::new(7, 9);
const RD: Field = Field::new(0, 2);
const RN: Field = Field::new(3, 5);
const RM: Field = Field::new(6, 8);
const RD_HIGH: Field = Field::new(8, 10);
const IMMED_3: Field = Field::new(6, 8);
const IMMED_5: Field = Field::new(6, 10);
const IMMED_7: Field = Field::new(0, 6);
const IMMED_8: Field = Field::new(0, 7);
const IMMED_11: Field = Field::new(0, 10);
const COND: Field = Field::new(8, 11);
const REGISTER_LIST: Field = Field::new(0, 7);
const BIT_9: Field = Field::bit(9);
const BIT_8: Field = Field::bit(8);
const H1: Field = Field::bit(7);
const H2: Field = Field::bit(6);

/// Thumb instruction word with the field set shared by all Thumb formats.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ThumbInstruction(u32);

impl ThumbInstruction {
    /// Wraps the low halfword of `word`.
    #[must_use]
    pub const fn new(word: u32) -> Self {
        Self(word & 0xFFFF)
    }

    /// Raw halfword.
    #[must_use]
    pub const fn word(self) -> u32 {
        self.0
    }

    /// Primary opcode, bits 15..10.
    #[must_use]
    pub const fn opcode_15_10(self) -> u32 {
        OPCODE_15_10.get(self.0)
    }

    /// ALU operation, bits 9..6.
    #[must_use]
    pub const fn opcode_9_6(self) -> u32 {
        OPCODE_9_6.get(self.0)
    }

    /// High-register operation, bits 9..7.
    #[must_use]
    pub const fn opcode_9_7(self) -> u32 {
        OPCODE_9_7.get(self.0)
    }

    /// Bit 9, the secondary opcode bit of several formats.
    #[must_use]
    pub const fn bit_9(self) -> bool {
        BIT_9.is_set(self.0)
    }

    /// Bit 8.
    #[must_use]
    pub const fn bit_8(self) -> bool {
        BIT_8.is_set(self.0)
    }

    /// Low register in bits 2..0.
    #[must_use]
    pub const fn rd(self) -> Register {
        Register::from_field(RD.get(self.0))
    }

    /// Low register in bits 5..3.
    #[must_use]
    pub const fn rn(self) -> Register {
        Register::from_field(RN.get(self.0))
    }

    /// Low register in bits 8..6.
    #[must_use]
    pub const fn rm(self) -> Register {
        Register::from_field(RM.get(self.0))
    }

    /// Low register in bits 10..8.
    #[must_use]
    pub const fn rd_high(self) -> Register {
        Register::from_field(RD_HIGH.get(self.0))
    }

    /// High-register destination `H1:Rd`.
    #[must_use]
    pub const fn hi_rd(self) -> Register {
        let high = if H1.is_set(self.0) { 8 } else { 0 };
        Register::from_field(RD.get(self.0) | high)
    }

    /// High-register source `H2:Rm` (bits 6..3).
    #[must_use]
    pub const fn hi_rm(self) -> Register {
        let high = if H2.is_set(self.0) { 8 } else { 0 };
        Register::from_field(RN.get(self.0) | high)
    }

    /// Three-bit immediate, bits 8..6.
    #[must_use]
    pub const fn immed_3(self) -> u32 {
        IMMED_3.get(self.0)
    }

    /// Five-bit immediate, bits 10..6.
    #[must_use]
    pub const fn immed_5(self) -> u32 {
        IMMED_5.get(self.0)
    }

    /// Seven-bit immediate, bits 6..0.
    #[must_use]
    pub const fn immed_7(self) -> u32 {
        IMMED_7.get(self.0)
    }

    /// Eight-bit immediate, bits 7..0.
    #[must_use]
    pub const fn immed_8(self) -> u32 {
        IMMED_8.get(self.0)
    }

    /// Unsigned eleven-bit immediate, bits 10..0.
    #[must_use]
    pub const fn immed_11(self) -> u32 {
        IMMED_11.get(self.0)
    }

    /// Signed eight-bit branch offset.
    #[must_use]
    pub const fn offset_8(self) -> i32 {
        IMMED_8.get_signed(self.0)
    }

    /// Signed eleven-bit branch offset.
    #[must_use]
    pub const fn offset_11(self) -> i32 {
        IMMED_11.get_signed(self.0)
    }

    /// Condition of a conditional branch.
    #[must_use]
    pub const fn cond(self) -> Condition {
        Condition::from_u4(COND.get(self.0))
    }

    /// Eight-bit low register list.
    #[must_use]
    #[allow(clippy::cast_possible_truncation)]
    pub const fn register_list(self) -> u16 {
        REGISTER_LIST.get(self.0) as u16
    }

    /// `R` bit of `PUSH`/`POP` (bit 8).
    #[must_use]
    pub const fn r(self) -> bool {
        BIT_8.is_set(self.0)
    }

    /// `true` for `POP {...}` (with or without `PC`).
    #[must_use]
    pub const fn is_pop(self) -> bool {
        self.opcode_15_10() == 0b10_1111 && !self.bit_9()
    }

    /// `true` for `BX Rm`.
    #[must_use]
    pub const fn is_bx(self) -> bool {
        self.opcode_15_10() == 0b01_0001 && self.opcode_9_7() == 0b110
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn high_register_operands() {
        let bx_lr = ThumbInstruction::new(0x4770);
        assert!(bx_lr.is_bx());
        assert_eq!(bx_lr.hi_rm(), Register::Lr);

        let bx_r3 = ThumbInstruction::new(0x4718);
        assert!(bx_r3.is_bx());
        assert_eq!(bx_r3.hi_rm(), Register::R3);

        let mov_r8_r0 = ThumbInstruction::new(0x4680);
        assert_eq!(mov_r8_r0.hi_rd(), Register::R8);
        assert_eq!(mov_r8_r0.hi_rm(), Register::R0);
    }

    #[test]
    fn pop_fields() {
        let pop = ThumbInstruction::new(0xBC10);
        assert!(pop.is_pop());
        assert!(!pop.r());
        assert_eq!(pop.register_list(), 0x10);

        let pop_pc = ThumbInstruction::new(0xBD01);
        assert!(pop_pc.is_pop());
        assert!(pop_pc.r());

        assert!(!ThumbInstruction::new(0xBE00).is_pop());
    }

    #[test]
    fn branch_offsets() {
        assert_eq!(ThumbInstruction::new(0xD0FE).offset_8(), -2);
        assert_eq!(ThumbInstruction::new(0xD0FE).cond(), Condition::Eq);
        assert_eq!(ThumbInstruction::new(0xE7FE).offset_11(), -2);
        assert_eq!(ThumbInstruction::new(0xE004).offset_11(), 4);
    }

    #[test]
    fn masks_to_halfword() {
        assert_eq!(ThumbInstruction::new(0xDEAD_4770).word(), 0x4770);
    }
}
