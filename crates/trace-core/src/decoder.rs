//! Control-flow classification of ARM and Thumb instructions.
//!
//! Classification is a total function of the instruction word and the CPSR:
//! every input maps to exactly one [`InstructionType`], with
//! [`InstructionType::Other`] as the fallback.

use std::fmt;

use crate::condition::{Condition, COND};
use crate::encoding::{
    extended_opcode, Branch, DataProcessing, LoadStoreMultiple, ThumbInstruction, BITS_27_20,
    BITS_27_24, BITS_27_25, BITS_7_4,
};
use crate::psr::is_thumb;
use crate::register::Register;

/// Control-flow kind of a retired instruction.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Deserialize, serde::Serialize))]
pub enum InstructionType {
    /// Subroutine call.
    Call,
    /// Subroutine return.
    Ret,
    /// Return from exception.
    Rti,
    /// Unconditional direct jump.
    Jmp,
    /// Jump through a register or memory operand.
    JmpIndirect,
    /// Conditional jump, taken or not.
    Jcc,
    /// Software interrupt or breakpoint.
    Syscall,
    /// Anything without control-flow significance.
    Other,
}

impl InstructionType {
    /// All classification kinds.
    pub const ALL: [Self; 8] = [
        Self::Call,
        Self::Ret,
        Self::Rti,
        Self::Jmp,
        Self::JmpIndirect,
        Self::Jcc,
        Self::Syscall,
        Self::Other,
    ];

    /// Upper-case label used in listings.
    #[must_use]
    pub const fn label(self) -> &'static str {
        match self {
            Self::Call => "CALL",
            Self::Ret => "RET",
            Self::Rti => "RTI",
            Self::Jmp => "JMP",
            Self::JmpIndirect => "JMP_INDIRECT",
            Self::Jcc => "JCC",
            Self::Syscall => "SYSCALL",
            Self::Other => "OTHER",
        }
    }
}

impl fmt::Display for InstructionType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// Classifies `word` in the instruction set selected by the CPSR T bit.
#[must_use]
pub const fn classify(word: u32, cpsr: u32) -> InstructionType {
    if is_thumb(cpsr) {
        classify_thumb(word)
    } else {
        classify_arm(word, cpsr)
    }
}

const fn by_condition(passed: bool, taken: InstructionType) -> InstructionType {
    if passed {
        taken
    } else {
        InstructionType::Jcc
    }
}

/// Classifies a 32-bit ARM instruction.
#[must_use]
pub const fn classify_arm(word: u32, cpsr: u32) -> InstructionType {
    let cond = Condition::of_arm(word);
    let passed = cond.passed(cpsr);

    // SWI
    if BITS_27_24.get(word) == 0b1111 {
        return by_condition(passed, InstructionType::Syscall);
    }

    // BKPT
    if COND.get(word) == 0b1110 && BITS_27_20.get(word) == 0x12 && BITS_7_4.get(word) == 0b0111
    {
        return InstructionType::Syscall;
    }

    match BITS_27_25.get(word) {
        0b100 => {
            let op = LoadStoreMultiple::new(word);
            if op.l() {
                return if op.includes_pc() {
                    by_condition(passed, InstructionType::JmpIndirect)
                } else {
                    InstructionType::Other
                };
            }
        }
        0b101 => {
            if matches!(cond, Condition::Nv) {
                return InstructionType::Call;
            }
            return if Branch::new(word).l() && passed {
                InstructionType::Call
            } else if matches!(cond, Condition::Al) {
                InstructionType::Jmp
            } else {
                InstructionType::Jcc
            };
        }
        _ => {}
    }

    match BITS_27_20.get(word) {
        // SUB, SUBS (register and immediate)
        0b0000_0100 | 0b0000_0101 | 0b0010_0100 | 0b0010_0101 => {
            let op = DataProcessing::new(word);
            if !op.is_data_processing() || !matches!(op.rd(), Register::Pc) {
                return InstructionType::Other;
            }
            if matches!(op.rn(), Register::Lr) {
                return by_condition(passed, InstructionType::Rti);
            }
            return by_condition(passed, InstructionType::JmpIndirect);
        }
        // MOV, MOVS (register)
        0b0001_1010 | 0b0001_1011 => {
            let op = DataProcessing::new(word);
            if !op.is_data_processing() || !matches!(op.rd(), Register::Pc) {
                return InstructionType::Other;
            }
            if !passed {
                return InstructionType::Jcc;
            }
            let shifter = op.shifter();
            if shifter.is_unshifted() && matches!(shifter.rm(), Register::Lr) {
                return InstructionType::Ret;
            }
            return InstructionType::JmpIndirect;
        }
        _ => {}
    }

    match extended_opcode(word) {
        // BX, BXJ
        0x121 | 0x122 => {
            if !passed {
                return InstructionType::Jcc;
            }
            if matches!(DataProcessing::new(word).shifter().rm(), Register::Lr) {
                InstructionType::Ret
            } else if matches!(cond, Condition::Al) {
                InstructionType::Jmp
            } else {
                InstructionType::Jcc
            }
        }
        // BLX (register); a failed condition is not a branch
        0x123 => {
            if passed {
                InstructionType::Call
            } else {
                InstructionType::Other
            }
        }
        _ => {
            let op = DataProcessing::new(word);
            if op.is_data_processing() && !op.is_compare() && matches!(op.rd(), Register::Pc) {
                by_condition(passed, InstructionType::JmpIndirect)
            } else {
                InstructionType::Other
            }
        }
    }
}

/// Classifies a 16-bit Thumb instruction (only the low halfword is used).
#[must_use]
pub const fn classify_thumb(word: u32) -> InstructionType {
    let insn = ThumbInstruction::new(word);
    match insn.opcode_15_10() {
        0b11_0100..=0b11_0111 => match insn.cond() {
            Condition::Al => InstructionType::Jmp,
            Condition::Nv => InstructionType::Syscall,
            _ => InstructionType::Jcc,
        },
        0b11_1000 | 0b11_1001 => InstructionType::Jmp,
        0b10_1111 => {
            if insn.bit_9() && !insn.bit_8() {
                InstructionType::Syscall
            } else if !insn.bit_9() && insn.r() {
                InstructionType::Ret
            } else {
                InstructionType::Other
            }
        }
        0b11_1110 | 0b11_1111 | 0b11_1010 | 0b11_1011 => InstructionType::Call,
        0b01_0001 => match insn.opcode_9_7() {
            0b111 => InstructionType::Call,
            0b110 => {
                if matches!(insn.hi_rm(), Register::Lr) {
                    InstructionType::Ret
                } else {
                    InstructionType::JmpIndirect
                }
            }
            _ => InstructionType::Other,
        },
        _ => InstructionType::Other,
    }
}
