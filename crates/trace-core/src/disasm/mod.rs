//! Instruction disassembly for ARM and Thumb encodings.
//!
//! The disassembler produces a mnemonic followed by an ordered list of
//! operand strings. Encodings outside the modelled subset yield the
//! single-element sentinel `"; unknown"` instead of an error.

mod arm;
mod operand;
mod thumb;

use std::fmt;

pub use arm::disassemble_arm;
pub use operand::{Address, Indexing, Offset};
pub use thumb::disassemble_thumb;

use crate::psr::is_thumb;

/// Sentinel emitted for encodings the disassembler does not recognise.
pub const UNKNOWN_INSTRUCTION: &str = "; unknown";
/// Sentinel emitted for addressing shapes that have no valid rendering.
pub const INVALID_ADDRESSING_MODE: &str = "; invalid addressing mode";

/// Mnemonic and operands of one disassembled instruction.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Deserialize, serde::Serialize))]
pub struct Disassembly {
    parts: Vec<String>,
}

impl Disassembly {
    pub(crate) fn new(mnemonic: impl Into<String>) -> Self {
        Self {
            parts: vec![mnemonic.into()],
        }
    }

    /// The `"; unknown"` sentinel.
    #[must_use]
    pub fn unknown() -> Self {
        Self::new(UNKNOWN_INSTRUCTION)
    }

    pub(crate) fn operand(mut self, operand: impl Into<String>) -> Self {
        self.parts.push(operand.into());
        self
    }

    pub(crate) fn operands_from(mut self, operands: impl IntoIterator<Item = String>) -> Self {
        self.parts.extend(operands);
        self
    }

    /// Instruction mnemonic including condition and flag suffixes.
    #[must_use]
    pub fn mnemonic(&self) -> &str {
        &self.parts[0]
    }

    /// Operand strings in assembly order.
    #[must_use]
    pub fn operands(&self) -> &[String] {
        &self.parts[1..]
    }

    /// Mnemonic followed by the operands.
    #[must_use]
    pub fn parts(&self) -> &[String] {
        &self.parts
    }

    /// Returns `true` for the unknown-instruction sentinel.
    #[must_use]
    pub fn is_unknown(&self) -> bool {
        self.parts.len() == 1 && self.parts[0] == UNKNOWN_INSTRUCTION
    }
}

impl fmt::Display for Disassembly {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.mnemonic())?;
        let operands = self.operands();
        if !operands.is_empty() {
            write!(f, " {}", operands.join(", "))?;
        }
        Ok(())
    }
}

/// Disassembles `word` in the instruction set selected by the CPSR T bit.
///
/// `pc` is the value the instruction reads from R15 (its address plus 8 in
/// ARM state, plus 4 in Thumb state); PC-relative targets are computed from it.
#[must_use]
pub fn disassemble(pc: u32, cpsr: u32, word: u32) -> Disassembly {
    if is_thumb(cpsr) {
        disassemble_thumb(pc, word)
    } else {
        disassemble_arm(pc, word)
    }
}

/// Formats an unsigned immediate: `#d` below 10, `#0xHEX` otherwise.
#[must_use]
pub fn format_immediate(value: u32) -> String {
    if value < 10 {
        format!("#{value}")
    } else {
        format!("#0x{value:X}")
    }
}

/// Formats a signed immediate with the [`format_immediate`] threshold
/// applied to its magnitude.
#[must_use]
pub fn format_signed_immediate(value: i32) -> String {
    let sign = if value < 0 { "-" } else { "" };
    let magnitude = value.unsigned_abs();
    if magnitude < 10 {
        format!("#{sign}{magnitude}")
    } else {
        format!("#{sign}0x{magnitude:X}")
    }
}

/// Formats a branch target address as `0xHEX`.
#[must_use]
pub fn format_target(address: u32) -> String {
    format!("0x{address:X}")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::psr::CPSR_T;

    #[test]
    fn immediate_threshold() {
        assert_eq!(format_immediate(0), "#0");
        assert_eq!(format_immediate(9), "#9");
        assert_eq!(format_immediate(10), "#0xA");
        assert_eq!(format_immediate(0x3F0), "#0x3F0");
        assert_eq!(format_immediate(u32::MAX), "#0xFFFFFFFF");
    }

    #[test]
    fn signed_immediate_threshold() {
        assert_eq!(format_signed_immediate(-4), "#-4");
        assert_eq!(format_signed_immediate(4), "#4");
        assert_eq!(format_signed_immediate(-16), "#-0x10");
        assert_eq!(format_signed_immediate(0x18), "#0x18");
        assert_eq!(format_signed_immediate(i32::MIN), "#-0x80000000");
    }

    #[test]
    fn display_joins_operands() {
        let dis = disassemble(0x0200_0008, 0, 0xE285_5001);
        assert_eq!(dis.to_string(), "ADD R5, R5, #1");
        assert_eq!(dis.mnemonic(), "ADD");
        assert_eq!(dis.operands(), ["R5", "R5", "#1"]);
        assert_eq!(disassemble(0x0200_0008, 0, 0xE1A0_0000).to_string(), "NOP");
    }

    #[test]
    fn dispatches_on_thumb_bit() {
        assert_eq!(disassemble(0x0200_0004, CPSR_T, 0x4770).parts(), ["BX", "LR"]);
        assert_eq!(disassemble(0x0200_0008, 0, 0xE12F_FF1E).parts(), ["BX", "LR"]);
    }

    #[test]
    fn unknown_sentinel() {
        let dis = Disassembly::unknown();
        assert!(dis.is_unknown());
        assert_eq!(dis.parts(), [UNKNOWN_INSTRUCTION]);
        assert!(dis.operands().is_empty());
    }
}
