//! Shared operand renderers: shifter operands and memory addressing modes.

use crate::encoding::{DataProcessing, ShiftType, ShiftedRegister};
use crate::register::Register;

use super::format_immediate;
use super::format_signed_immediate;

/// Offset part of a memory operand.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Offset {
    /// Signed byte offset.
    Immediate(i32),
    /// Register added to or subtracted from the base.
    Register {
        /// Add (`+Rm`) or subtract (`-Rm`).
        add: bool,
        /// Offset register.
        rm: Register,
    },
    /// Shifted register added to or subtracted from the base.
    Scaled {
        /// Add (`+Rm`) or subtract (`-Rm`).
        add: bool,
        /// Offset register.
        rm: Register,
        /// Shift applied to `rm`.
        shift: ShiftType,
        /// Encoded five-bit shift amount.
        amount: u32,
    },
}

impl Offset {
    /// Builds an immediate offset from an add flag and a magnitude.
    #[must_use]
    #[allow(clippy::cast_possible_wrap)]
    pub const fn immediate(add: bool, magnitude: u32) -> Self {
        let value = magnitude as i32;
        Self::Immediate(if add { value } else { -value })
    }

    /// Builds a register or scaled-register offset from a shifted register view.
    #[must_use]
    pub const fn register(add: bool, operand: ShiftedRegister) -> Self {
        if operand.is_unshifted() {
            Self::Register {
                add,
                rm: operand.rm(),
            }
        } else {
            Self::Scaled {
                add,
                rm: operand.rm(),
                shift: operand.shift(),
                amount: operand.shift_imm(),
            }
        }
    }

    fn parts(self) -> Vec<String> {
        match self {
            Self::Immediate(value) => vec![format_signed_immediate(value)],
            Self::Register { add, rm } => vec![signed_register(add, rm)],
            Self::Scaled {
                add,
                rm,
                shift,
                amount,
            } => vec![signed_register(add, rm), shift_by_immediate(shift, amount)],
        }
    }
}

/// Where the offset is applied relative to the access.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Indexing {
    /// `[Rn, offset]`, base unchanged.
    Offset,
    /// `[Rn, offset]!`, base updated before the access.
    PreIndexed,
    /// `[Rn], offset`, base updated after the access.
    PostIndexed,
}

impl Indexing {
    /// Decodes the `P`/`W` bit pair; `None` for the post-indexed write-back
    /// combination, which has no valid rendering.
    #[must_use]
    pub const fn from_pw(p: bool, w: bool) -> Option<Self> {
        match (p, w) {
            (true, false) => Some(Self::Offset),
            (true, true) => Some(Self::PreIndexed),
            (false, false) => Some(Self::PostIndexed),
            (false, true) => None,
        }
    }
}

/// A complete memory operand.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Address {
    /// Base register.
    pub base: Register,
    /// Offset applied to the base.
    pub offset: Offset,
    /// Indexing flavour.
    pub indexing: Indexing,
}

impl Address {
    /// Renders the operand strings for this address.
    #[must_use]
    pub fn render(&self) -> Vec<String> {
        let base = self.base;
        match self.indexing {
            Indexing::Offset if self.offset == Offset::Immediate(0) => vec![format!("[{base}]")],
            Indexing::Offset => vec![format!("[{base}, {}]", self.offset.parts().join(", "))],
            Indexing::PreIndexed => {
                vec![format!("[{base}, {}]!", self.offset.parts().join(", "))]
            }
            Indexing::PostIndexed => {
                let mut parts = vec![format!("[{base}]")];
                parts.extend(self.offset.parts());
                parts
            }
        }
    }
}

fn signed_register(add: bool, rm: Register) -> String {
    format!("{}{rm}", if add { '+' } else { '-' })
}

/// Renders an immediate shift; `LSR`/`ASR #0` encode a shift by 32 and
/// `ROR #0` encodes `RRX`.
pub fn shift_by_immediate(shift: ShiftType, amount: u32) -> String {
    match (shift, amount) {
        (ShiftType::Ror, 0) => "RRX".to_string(),
        (ShiftType::Lsr | ShiftType::Asr, 0) => format!("{} #32", shift.mnemonic()),
        _ => format!("{} #{amount}", shift.mnemonic()),
    }
}

/// Renders the shifter operand of a data-processing instruction as one or
/// two operand strings.
pub fn shifter_operand(op: DataProcessing) -> Vec<String> {
    if op.immediate() {
        return vec![format_immediate(op.rotated_immediate())];
    }

    let shifter = op.shifter();
    let rm = shifter.rm().to_string();
    if shifter.register_shift() {
        return vec![rm, format!("{} {}", shifter.shift().mnemonic(), shifter.rs())];
    }
    if shifter.is_unshifted() {
        return vec![rm];
    }
    vec![rm, shift_by_immediate(shifter.shift(), shifter.shift_imm())]
}

#[cfg(test)]
mod tests {
    use super::*;

    fn address(offset: Offset, indexing: Indexing) -> Vec<String> {
        Address {
            base: Register::R0,
            offset,
            indexing,
        }
        .render()
    }

    #[test]
    fn immediate_offsets() {
        assert_eq!(
            address(Offset::Immediate(0x18), Indexing::Offset),
            ["[R0, #0x18]"]
        );
        assert_eq!(address(Offset::Immediate(0), Indexing::Offset), ["[R0]"]);
        assert_eq!(
            address(Offset::Immediate(-4), Indexing::PreIndexed),
            ["[R0, #-4]!"]
        );
        assert_eq!(
            address(Offset::Immediate(4), Indexing::PostIndexed),
            ["[R0]", "#4"]
        );
    }

    #[test]
    fn register_offsets() {
        let plus = Offset::Register {
            add: true,
            rm: Register::R3,
        };
        let minus = Offset::Register {
            add: false,
            rm: Register::R3,
        };
        assert_eq!(address(plus, Indexing::Offset), ["[R0, +R3]"]);
        assert_eq!(address(minus, Indexing::PreIndexed), ["[R0, -R3]!"]);
        assert_eq!(address(plus, Indexing::PostIndexed), ["[R0]", "+R3"]);
    }

    #[test]
    fn scaled_offsets() {
        let scaled = Offset::Scaled {
            add: true,
            rm: Register::R1,
            shift: ShiftType::Lsl,
            amount: 2,
        };
        assert_eq!(address(scaled, Indexing::Offset), ["[R0, +R1, LSL #2]"]);
        assert_eq!(address(scaled, Indexing::PreIndexed), ["[R0, +R1, LSL #2]!"]);
        assert_eq!(
            address(scaled, Indexing::PostIndexed),
            ["[R0]", "+R1", "LSL #2"]
        );
    }

    #[test]
    fn indexing_from_bits() {
        assert_eq!(Indexing::from_pw(true, false), Some(Indexing::Offset));
        assert_eq!(Indexing::from_pw(true, true), Some(Indexing::PreIndexed));
        assert_eq!(Indexing::from_pw(false, false), Some(Indexing::PostIndexed));
        assert_eq!(Indexing::from_pw(false, true), None);
    }

    #[test]
    fn immediate_shifts() {
        assert_eq!(shift_by_immediate(ShiftType::Lsr, 31), "LSR #31");
        assert_eq!(shift_by_immediate(ShiftType::Lsr, 0), "LSR #32");
        assert_eq!(shift_by_immediate(ShiftType::Asr, 0), "ASR #32");
        assert_eq!(shift_by_immediate(ShiftType::Ror, 0), "RRX");
        assert_eq!(shift_by_immediate(ShiftType::Ror, 8), "ROR #8");
    }

    #[test]
    fn shifter_operands() {
        assert_eq!(shifter_operand(DataProcessing::new(0xE3A0_0E3F)), ["#0x3F0"]);
        assert_eq!(shifter_operand(DataProcessing::new(0xE3A0_0FFC)), ["#0x3F0"]);
        assert_eq!(shifter_operand(DataProcessing::new(0xE1A0_0001)), ["R1"]);
        assert_eq!(
            shifter_operand(DataProcessing::new(0xE1A0_0271)),
            ["R1", "ROR R2"]
        );
        assert_eq!(
            shifter_operand(DataProcessing::new(0xE1A0_0061)),
            ["R1", "RRX"]
        );
    }
}
