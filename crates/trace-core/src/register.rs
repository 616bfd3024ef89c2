//! General-purpose register identifiers and register-list rendering.

use std::fmt;

/// Number of general-purpose registers visible in any processor mode.
pub const GENERAL_REGISTER_COUNT: usize = 16;

/// ARM general-purpose register identifier.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[cfg_attr(feature = "serde", derive(serde::Deserialize, serde::Serialize))]
#[repr(u8)]
pub enum Register {
    /// General register 0.
    R0 = 0,
    /// General register 1.
    R1 = 1,
    /// General register 2.
    R2 = 2,
    /// General register 3.
    R3 = 3,
    /// General register 4.
    R4 = 4,
    /// General register 5.
    R5 = 5,
    /// General register 6.
    R6 = 6,
    /// General register 7.
    R7 = 7,
    /// General register 8.
    R8 = 8,
    /// General register 9.
    R9 = 9,
    /// General register 10.
    R10 = 10,
    /// General register 11.
    R11 = 11,
    /// General register 12.
    R12 = 12,
    /// Stack pointer (R13).
    Sp = 13,
    /// Link register (R14).
    Lr = 14,
    /// Program counter (R15).
    Pc = 15,
}

impl Register {
    /// Ordered list of all general-purpose registers.
    pub const ALL: [Self; GENERAL_REGISTER_COUNT] = [
        Self::R0,
        Self::R1,
        Self::R2,
        Self::R3,
        Self::R4,
        Self::R5,
        Self::R6,
        Self::R7,
        Self::R8,
        Self::R9,
        Self::R10,
        Self::R11,
        Self::R12,
        Self::Sp,
        Self::Lr,
        Self::Pc,
    ];

    /// Decodes a register number; `None` above 15.
    #[must_use]
    pub const fn from_u4(bits: u32) -> Option<Self> {
        if bits < 16 {
            Some(Self::ALL[bits as usize])
        } else {
            None
        }
    }

    /// Decodes the low four bits of a register field.
    #[must_use]
    pub const fn from_field(bits: u32) -> Self {
        Self::ALL[(bits & 0xF) as usize]
    }

    /// Returns the array index for this register (`0..=15`).
    #[must_use]
    pub const fn index(self) -> usize {
        self as usize
    }

    /// Returns this register's bit in a 16-bit register mask.
    #[must_use]
    pub const fn mask_bit(self) -> u16 {
        1 << (self as u16)
    }

    /// Assembly name (`R0`..`R12`, `SP`, `LR`, `PC`).
    #[must_use]
    pub const fn name(self) -> &'static str {
        const NAMES: [&str; GENERAL_REGISTER_COUNT] = [
            "R0", "R1", "R2", "R3", "R4", "R5", "R6", "R7", "R8", "R9", "R10", "R11", "R12",
            "SP", "LR", "PC",
        ];
        NAMES[self as usize]
    }

    /// Parses a register name such as `r7`, `R07`, `sp` or `pc` (case-insensitive).
    #[must_use]
    pub fn parse(name: &str) -> Option<Self> {
        let lower = name.to_ascii_lowercase();
        match lower.as_str() {
            "sp" => return Some(Self::Sp),
            "lr" => return Some(Self::Lr),
            "pc" => return Some(Self::Pc),
            _ => {}
        }
        let digits = lower.strip_prefix('r')?;
        if digits.is_empty() || digits.len() > 2 || !digits.bytes().all(|b| b.is_ascii_digit()) {
            return None;
        }
        digits.parse::<u32>().ok().and_then(Self::from_u4)
    }
}

impl fmt::Display for Register {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Renders a register mask as `{R0-R3,R7,SP,LR,PC}`.
///
/// Runs of registers below `SP` collapse into `Rlo-Rhi`; `SP`, `LR` and `PC`
/// always appear as separate entries.
#[must_use]
pub fn format_register_list(mask: u16) -> String {
    let mut entries: Vec<String> = Vec::new();
    let mut index = 0usize;

    while index < Register::Sp.index() {
        if mask & (1 << index) == 0 {
            index += 1;
            continue;
        }

        let start = index;
        while index + 1 < Register::Sp.index() && mask & (1 << (index + 1)) != 0 {
            index += 1;
        }

        if start == index {
            entries.push(Register::ALL[start].name().to_string());
        } else {
            entries.push(format!(
                "{}-{}",
                Register::ALL[start].name(),
                Register::ALL[index].name()
            ));
        }
        index += 1;
    }

    for register in [Register::Sp, Register::Lr, Register::Pc] {
        if mask & register.mask_bit() != 0 {
            entries.push(register.name().to_string());
        }
    }

    format!("{{{}}}", entries.join(","))
}
