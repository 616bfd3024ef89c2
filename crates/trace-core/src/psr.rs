//! Program status register layout, processor modes and execution states.

use std::fmt;

use crate::bits::Field;

/// Negative flag.
pub const CPSR_N: u32 = 1 << 31;
/// Zero flag.
pub const CPSR_Z: u32 = 1 << 30;
/// Carry flag.
pub const CPSR_C: u32 = 1 << 29;
/// Overflow flag.
pub const CPSR_V: u32 = 1 << 28;
/// Sticky saturation flag.
pub const CPSR_Q: u32 = 1 << 27;
/// Jazelle state bit.
pub const CPSR_J: u32 = 1 << 24;
/// Data endianness bit.
pub const CPSR_E: u32 = 1 << 9;
/// Imprecise abort disable.
pub const CPSR_A: u32 = 1 << 8;
/// IRQ disable.
pub const CPSR_I: u32 = 1 << 7;
/// FIQ disable.
pub const CPSR_F: u32 = 1 << 6;
/// Thumb state bit.
pub const CPSR_T: u32 = 1 << 5;
/// SIMD greater-or-equal flags.
pub const CPSR_GE: Field = Field::new(16, 19);
/// Processor mode field.
pub const CPSR_MODE: Field = Field::new(0, 4);

/// Flag bits in display order, paired with their letters.
const FLAG_LETTERS: [(u32, char); 11] = [
    (CPSR_N, 'N'),
    (CPSR_Z, 'Z'),
    (CPSR_C, 'C'),
    (CPSR_V, 'V'),
    (CPSR_Q, 'Q'),
    (CPSR_J, 'J'),
    (CPSR_E, 'E'),
    (CPSR_A, 'A'),
    (CPSR_I, 'I'),
    (CPSR_F, 'F'),
    (CPSR_T, 'T'),
];

/// ARM processor mode encoded in CPSR bits 4..0.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Deserialize, serde::Serialize))]
pub enum ProcessorMode {
    /// `0b10000`.
    User,
    /// `0b10001`.
    Fiq,
    /// `0b10010`.
    Irq,
    /// `0b10011`.
    Supervisor,
    /// `0b10111`.
    Abort,
    /// `0b11011`.
    Undefined,
    /// `0b11111`.
    System,
    /// Any other encoding.
    Reserved,
}

impl ProcessorMode {
    /// Decodes the mode field of `cpsr`.
    #[must_use]
    pub const fn of(cpsr: u32) -> Self {
        match CPSR_MODE.get(cpsr) {
            0b10000 => Self::User,
            0b10001 => Self::Fiq,
            0b10010 => Self::Irq,
            0b10011 => Self::Supervisor,
            0b10111 => Self::Abort,
            0b11011 => Self::Undefined,
            0b11111 => Self::System,
            _ => Self::Reserved,
        }
    }

    /// Returns `true` for the two modes the scheduler runs in.
    #[must_use]
    pub const fn is_scheduler_mode(self) -> bool {
        matches!(self, Self::Supervisor | Self::Irq)
    }

    /// Display name of this mode.
    #[must_use]
    pub const fn name(self) -> &'static str {
        match self {
            Self::User => "User",
            Self::Fiq => "FIQ",
            Self::Irq => "IRQ",
            Self::Supervisor => "Supervisor",
            Self::Abort => "Abort",
            Self::Undefined => "Undefined",
            Self::System => "System",
            Self::Reserved => "RESERVED",
        }
    }
}

impl fmt::Display for ProcessorMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Instruction set state selected by the CPSR J and T bits.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Deserialize, serde::Serialize))]
pub enum ExecutionState {
    /// 32-bit ARM.
    Arm,
    /// 16-bit Thumb.
    Thumb,
    /// Java bytecode.
    Jazelle,
    /// J and T both set.
    Reserved,
}

impl ExecutionState {
    /// Decodes the J and T bits of `cpsr`.
    #[must_use]
    pub const fn of(cpsr: u32) -> Self {
        match (cpsr & CPSR_J != 0, cpsr & CPSR_T != 0) {
            (true, true) => Self::Reserved,
            (true, false) => Self::Jazelle,
            (false, true) => Self::Thumb,
            (false, false) => Self::Arm,
        }
    }

    /// Display name of this state.
    #[must_use]
    pub const fn name(self) -> &'static str {
        match self {
            Self::Arm => "ARM",
            Self::Thumb => "Thumb",
            Self::Jazelle => "Jazelle",
            Self::Reserved => "RESERVED",
        }
    }
}

impl fmt::Display for ExecutionState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Returns `true` when `cpsr` selects Thumb state.
#[must_use]
pub const fn is_thumb(cpsr: u32) -> bool {
    cpsr & CPSR_T != 0
}

/// Renders the `NZCVQJEAIFT` flag summary with `-` for clear bits.
#[must_use]
pub fn flag_summary(cpsr: u32) -> String {
    FLAG_LETTERS
        .iter()
        .map(|&(bit, letter)| if cpsr & bit != 0 { letter } else { '-' })
        .collect()
}
