//! ARM condition codes and their evaluation against CPSR flags.

use crate::bits::Field;
use crate::psr::{CPSR_C, CPSR_N, CPSR_V, CPSR_Z};

/// Condition field of an ARM instruction (bits 31..28).
pub const COND: Field = Field::new(28, 31);

/// Four-bit ARM condition code.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Deserialize, serde::Serialize))]
#[repr(u8)]
pub enum Condition {
    /// Equal (`Z`).
    Eq = 0x0,
    /// Not equal (`!Z`).
    Ne = 0x1,
    /// Carry set, unsigned higher or same (`C`).
    Cs = 0x2,
    /// Carry clear, unsigned lower (`!C`).
    Cc = 0x3,
    /// Negative (`N`).
    Mi = 0x4,
    /// Positive or zero (`!N`).
    Pl = 0x5,
    /// Overflow (`V`).
    Vs = 0x6,
    /// No overflow (`!V`).
    Vc = 0x7,
    /// Unsigned higher (`C && !Z`).
    Hi = 0x8,
    /// Unsigned lower or same (`!C || Z`).
    Ls = 0x9,
    /// Signed greater or equal (`N == V`).
    Ge = 0xA,
    /// Signed less than (`N != V`).
    Lt = 0xB,
    /// Signed greater than (`!Z && N == V`).
    Gt = 0xC,
    /// Signed less or equal (`Z || N != V`).
    Le = 0xD,
    /// Always.
    Al = 0xE,
    /// Reserved encoding used by unconditional extension instructions.
    Nv = 0xF,
}

impl Condition {
    /// All sixteen condition codes in encoding order.
    pub const ALL: [Self; 16] = [
        Self::Eq,
        Self::Ne,
        Self::Cs,
        Self::Cc,
        Self::Mi,
        Self::Pl,
        Self::Vs,
        Self::Vc,
        Self::Hi,
        Self::Ls,
        Self::Ge,
        Self::Lt,
        Self::Gt,
        Self::Le,
        Self::Al,
        Self::Nv,
    ];

    /// Decodes the low four bits of `bits` into a condition code.
    #[must_use]
    pub const fn from_u4(bits: u32) -> Self {
        Self::ALL[(bits & 0xF) as usize]
    }

    /// Decodes the condition field of an ARM instruction word.
    #[must_use]
    pub const fn of_arm(word: u32) -> Self {
        Self::from_u4(COND.get(word))
    }

    /// Returns the raw four-bit encoding.
    #[must_use]
    pub const fn as_u4(self) -> u32 {
        self as u32
    }

    /// Evaluates this condition against the N/Z/C/V flags of `cpsr`.
    #[must_use]
    pub const fn passed(self, cpsr: u32) -> bool {
        let n = cpsr & CPSR_N != 0;
        let z = cpsr & CPSR_Z != 0;
        let c = cpsr & CPSR_C != 0;
        let v = cpsr & CPSR_V != 0;
        match self {
            Self::Eq => z,
            Self::Ne => !z,
            Self::Cs => c,
            Self::Cc => !c,
            Self::Mi => n,
            Self::Pl => !n,
            Self::Vs => v,
            Self::Vc => !v,
            Self::Hi => c && !z,
            Self::Ls => !c || z,
            Self::Ge => n == v,
            Self::Lt => n != v,
            Self::Gt => !z && n == v,
            Self::Le => z || n != v,
            Self::Al => true,
            Self::Nv => false,
        }
    }

    /// Mnemonic suffix for this condition; empty for `AL` and the reserved code.
    #[must_use]
    pub const fn extension(self) -> &'static str {
        match self {
            Self::Eq => "EQ",
            Self::Ne => "NE",
            Self::Cs => "CS",
            Self::Cc => "CC",
            Self::Mi => "MI",
            Self::Pl => "PL",
            Self::Vs => "VS",
            Self::Vc => "VC",
            Self::Hi => "HI",
            Self::Ls => "LS",
            Self::Ge => "GE",
            Self::Lt => "LT",
            Self::Gt => "GT",
            Self::Le => "LE",
            Self::Al | Self::Nv => "",
        }
    }
}

/// Evaluates the condition field of ARM `word` against `cpsr`.
#[must_use]
pub const fn condition_passed(word: u32, cpsr: u32) -> bool {
    Condition::of_arm(word).passed(cpsr)
}
