//! Field views over 32-bit ARM instruction words, one per encoding shape.

use crate::bits::Field;
use crate::condition::Condition;
use crate::register::Register;

/// Bits 27..25, the primary instruction class.
pub const BITS_27_25: Field = Field::new(25, 27);
/// Bits 27..24.
pub const BITS_27_24: Field = Field::new(24, 27);
/// Bits 27..26.
pub const BITS_27_26: Field = Field::new(26, 27);
/// Bits 27..20, the extended opcode byte.
pub const BITS_27_20: Field = Field::new(20, 27);
/// Bits 7..4, the secondary opcode nibble.
pub const BITS_7_4: Field = Field::new(4, 7);

const RN: Field = Field::new(16, 19);
const RD: Field = Field::new(12, 15);
const RS: Field = Field::new(8, 11);
const RM: Field = Field::new(0, 3);
const OPCODE: Field = Field::new(21, 24);
const SHIFT_IMM: Field = Field::new(7, 11);
const SHIFT: Field = Field::new(5, 6);
const ROTATE_IMM: Field = Field::new(8, 11);
const IMMED_8: Field = Field::new(0, 7);
const OFFSET_12: Field = Field::new(0, 11);
const IMMED_H: Field = Field::new(8, 11);
const IMMED_L: Field = Field::new(0, 3);
const REGISTER_LIST: Field = Field::new(0, 15);
const OFFSET_24: Field = Field::new(0, 23);
const IMMED_24: Field = Field::new(0, 23);
const BKPT_HIGH: Field = Field::new(8, 19);
const CP_NUM: Field = Field::new(8, 11);
const CP_OPCODE_1: Field = Field::new(20, 23);
const CP_OPCODE_1_TRANSFER: Field = Field::new(21, 23);
const CP_OPCODE_2: Field = Field::new(5, 7);
const CP_OPCODE_DOUBLE: Field = Field::new(4, 7);
const FIELD_MASK: Field = Field::new(16, 19);

const BIT_25: Field = Field::bit(25);
const BIT_24: Field = Field::bit(24);
const BIT_23: Field = Field::bit(23);
const BIT_22: Field = Field::bit(22);
const BIT_21: Field = Field::bit(21);
const BIT_20: Field = Field::bit(20);
const BIT_4: Field = Field::bit(4);

/// Operand shift applied to a register (bits 6..5).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ShiftType {
    /// Logical shift left.
    Lsl,
    /// Logical shift right.
    Lsr,
    /// Arithmetic shift right.
    Asr,
    /// Rotate right, or `RRX` with a zero amount.
    Ror,
}

impl ShiftType {
    /// Decodes a two-bit shift field.
    #[must_use]
    pub const fn from_u2(bits: u32) -> Self {
        match bits & 0b11 {
            0b00 => Self::Lsl,
            0b01 => Self::Lsr,
            0b10 => Self::Asr,
            _ => Self::Ror,
        }
    }

    /// Assembly mnemonic of the shift.
    #[must_use]
    pub const fn mnemonic(self) -> &'static str {
        match self {
            Self::Lsl => "LSL",
            Self::Lsr => "LSR",
            Self::Asr => "ASR",
            Self::Ror => "ROR",
        }
    }
}

/// Register operand with an optional shift, as used by data processing and
/// scaled load/store offsets.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ShiftedRegister(u32);

impl ShiftedRegister {
    /// Wraps a raw instruction word.
    #[must_use]
    pub const fn new(word: u32) -> Self {
        Self(word)
    }

    /// Shifted register `Rm`.
    #[must_use]
    pub const fn rm(self) -> Register {
        Register::from_field(RM.get(self.0))
    }

    /// Shift register `Rs`, meaningful when [`Self::register_shift`] is set.
    #[must_use]
    pub const fn rs(self) -> Register {
        Register::from_field(RS.get(self.0))
    }

    /// Shift kind.
    #[must_use]
    pub const fn shift(self) -> ShiftType {
        ShiftType::from_u2(SHIFT.get(self.0))
    }

    /// Five-bit immediate shift amount.
    #[must_use]
    pub const fn shift_imm(self) -> u32 {
        SHIFT_IMM.get(self.0)
    }

    /// `true` when the shift amount comes from `Rs` (bit 4).
    #[must_use]
    pub const fn register_shift(self) -> bool {
        BIT_4.is_set(self.0)
    }

    /// `true` when this is a plain `Rm` with no shift applied.
    #[must_use]
    pub const fn is_unshifted(self) -> bool {
        !self.register_shift() && SHIFT.get(self.0) == 0 && self.shift_imm() == 0
    }
}

/// Data-processing encoding (`cond 00 I opcode S Rn Rd shifter_operand`).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct DataProcessing(u32);

impl DataProcessing {
    /// Wraps a raw instruction word.
    #[must_use]
    pub const fn new(word: u32) -> Self {
        Self(word)
    }

    /// Condition field.
    #[must_use]
    pub const fn cond(self) -> Condition {
        Condition::of_arm(self.0)
    }

    /// Four-bit operation code (bits 24..21).
    #[must_use]
    pub const fn opcode(self) -> u32 {
        OPCODE.get(self.0)
    }

    /// Flags-update bit.
    #[must_use]
    pub const fn s(self) -> bool {
        BIT_20.is_set(self.0)
    }

    /// Immediate-operand bit (bit 25).
    #[must_use]
    pub const fn immediate(self) -> bool {
        BIT_25.is_set(self.0)
    }

    /// First operand register.
    #[must_use]
    pub const fn rn(self) -> Register {
        Register::from_field(RN.get(self.0))
    }

    /// Destination register.
    #[must_use]
    pub const fn rd(self) -> Register {
        Register::from_field(RD.get(self.0))
    }

    /// Register form of the shifter operand.
    #[must_use]
    pub const fn shifter(self) -> ShiftedRegister {
        ShiftedRegister::new(self.0)
    }

    /// Eight-bit immediate constant before rotation.
    #[must_use]
    pub const fn immed_8(self) -> u32 {
        IMMED_8.get(self.0)
    }

    /// Rotation field; the constant is rotated right by twice this value.
    #[must_use]
    pub const fn rotate_imm(self) -> u32 {
        ROTATE_IMM.get(self.0)
    }

    /// The rotated immediate constant.
    #[must_use]
    pub const fn rotated_immediate(self) -> u32 {
        self.immed_8().rotate_right(self.rotate_imm() * 2)
    }

    /// `true` for `TST`, `TEQ`, `CMP` and `CMN`, which do not write `Rd`.
    #[must_use]
    pub const fn is_compare(self) -> bool {
        matches!(self.opcode(), 0x8..=0xB)
    }

    /// `true` when the word is a genuine data-processing instruction rather
    /// than a multiply, extra load/store or miscellaneous encoding that
    /// shares bits 27..26 = `00`.
    #[must_use]
    pub const fn is_data_processing(self) -> bool {
        if BITS_27_26.get(self.0) != 0 {
            return false;
        }
        if !self.immediate() && BIT_4.is_set(self.0) && Field::bit(7).is_set(self.0) {
            return false;
        }
        !(self.is_compare() && !self.s())
    }
}

/// Load/store word or unsigned byte (`cond 01 I P U B W L Rn Rd offset`).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct LoadStore(u32);

impl LoadStore {
    /// Wraps a raw instruction word.
    #[must_use]
    pub const fn new(word: u32) -> Self {
        Self(word)
    }

    /// Condition field.
    #[must_use]
    pub const fn cond(self) -> Condition {
        Condition::of_arm(self.0)
    }

    /// Register-offset bit (bit 25); clear means 12-bit immediate offset.
    #[must_use]
    pub const fn register_offset(self) -> bool {
        BIT_25.is_set(self.0)
    }

    /// Pre-indexing bit.
    #[must_use]
    pub const fn p(self) -> bool {
        BIT_24.is_set(self.0)
    }

    /// Add-offset bit.
    #[must_use]
    pub const fn u(self) -> bool {
        BIT_23.is_set(self.0)
    }

    /// Byte-access bit.
    #[must_use]
    pub const fn b(self) -> bool {
        BIT_22.is_set(self.0)
    }

    /// Write-back bit (user-mode translation when `P` is clear).
    #[must_use]
    pub const fn w(self) -> bool {
        BIT_21.is_set(self.0)
    }

    /// Load bit.
    #[must_use]
    pub const fn l(self) -> bool {
        BIT_20.is_set(self.0)
    }

    /// Base register.
    #[must_use]
    pub const fn rn(self) -> Register {
        Register::from_field(RN.get(self.0))
    }

    /// Transfer register.
    #[must_use]
    pub const fn rd(self) -> Register {
        Register::from_field(RD.get(self.0))
    }

    /// Twelve-bit immediate offset.
    #[must_use]
    pub const fn offset_12(self) -> u32 {
        OFFSET_12.get(self.0)
    }

    /// Register form of the offset.
    #[must_use]
    pub const fn offset_register(self) -> ShiftedRegister {
        ShiftedRegister::new(self.0)
    }
}

/// Halfword, signed byte and doubleword load/store.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct MiscLoadStore(u32);

impl MiscLoadStore {
    /// Wraps a raw instruction word.
    #[must_use]
    pub const fn new(word: u32) -> Self {
        Self(word)
    }

    /// Condition field.
    #[must_use]
    pub const fn cond(self) -> Condition {
        Condition::of_arm(self.0)
    }

    /// Pre-indexing bit.
    #[must_use]
    pub const fn p(self) -> bool {
        BIT_24.is_set(self.0)
    }

    /// Add-offset bit.
    #[must_use]
    pub const fn u(self) -> bool {
        BIT_23.is_set(self.0)
    }

    /// Immediate-offset bit (bit 22).
    #[must_use]
    pub const fn i(self) -> bool {
        BIT_22.is_set(self.0)
    }

    /// Write-back bit.
    #[must_use]
    pub const fn w(self) -> bool {
        BIT_21.is_set(self.0)
    }

    /// Load bit.
    #[must_use]
    pub const fn l(self) -> bool {
        BIT_20.is_set(self.0)
    }

    /// Base register.
    #[must_use]
    pub const fn rn(self) -> Register {
        Register::from_field(RN.get(self.0))
    }

    /// Transfer register.
    #[must_use]
    pub const fn rd(self) -> Register {
        Register::from_field(RD.get(self.0))
    }

    /// Offset register for the register form.
    #[must_use]
    pub const fn rm(self) -> Register {
        Register::from_field(RM.get(self.0))
    }

    /// Split eight-bit immediate offset `immed_h:immed_l`.
    #[must_use]
    pub const fn offset_8(self) -> u32 {
        (IMMED_H.get(self.0) << 4) | IMMED_L.get(self.0)
    }
}

/// Load/store multiple (`cond 100 P U S W L Rn register_list`).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct LoadStoreMultiple(u32);

impl LoadStoreMultiple {
    /// Wraps a raw instruction word.
    #[must_use]
    pub const fn new(word: u32) -> Self {
        Self(word)
    }

    /// Condition field.
    #[must_use]
    pub const fn cond(self) -> Condition {
        Condition::of_arm(self.0)
    }

    /// Before bit.
    #[must_use]
    pub const fn p(self) -> bool {
        BIT_24.is_set(self.0)
    }

    /// Increment bit.
    #[must_use]
    pub const fn u(self) -> bool {
        BIT_23.is_set(self.0)
    }

    /// User-bank / CPSR-restore bit.
    #[must_use]
    pub const fn s(self) -> bool {
        BIT_22.is_set(self.0)
    }

    /// Write-back bit.
    #[must_use]
    pub const fn w(self) -> bool {
        BIT_21.is_set(self.0)
    }

    /// Load bit.
    #[must_use]
    pub const fn l(self) -> bool {
        BIT_20.is_set(self.0)
    }

    /// Base register.
    #[must_use]
    pub const fn rn(self) -> Register {
        Register::from_field(RN.get(self.0))
    }

    /// Sixteen-bit register list.
    #[must_use]
    #[allow(clippy::cast_possible_truncation)]
    pub const fn register_list(self) -> u16 {
        REGISTER_LIST.get(self.0) as u16
    }

    /// `true` when `PC` is in the register list.
    #[must_use]
    pub const fn includes_pc(self) -> bool {
        self.register_list() & Register::Pc.mask_bit() != 0
    }
}

/// Multiply and multiply-accumulate encodings.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Multiply(u32);

impl Multiply {
    /// Wraps a raw instruction word.
    #[must_use]
    pub const fn new(word: u32) -> Self {
        Self(word)
    }

    /// Destination register (bits 19..16); `RdHi` for long multiplies.
    #[must_use]
    pub const fn rd(self) -> Register {
        Register::from_field(RN.get(self.0))
    }

    /// Accumulate register (bits 15..12); `RdLo` for long multiplies.
    #[must_use]
    pub const fn rn(self) -> Register {
        Register::from_field(RD.get(self.0))
    }

    /// Second multiplicand.
    #[must_use]
    pub const fn rs(self) -> Register {
        Register::from_field(RS.get(self.0))
    }

    /// First multiplicand.
    #[must_use]
    pub const fn rm(self) -> Register {
        Register::from_field(RM.get(self.0))
    }
}

/// Coprocessor load/store, register transfer and data operations.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Coprocessor(u32);

impl Coprocessor {
    /// Wraps a raw instruction word.
    #[must_use]
    pub const fn new(word: u32) -> Self {
        Self(word)
    }

    /// Condition field.
    #[must_use]
    pub const fn cond(self) -> Condition {
        Condition::of_arm(self.0)
    }

    /// Coprocessor number.
    #[must_use]
    pub const fn cp_num(self) -> u32 {
        CP_NUM.get(self.0)
    }

    /// Coprocessor destination register (bits 15..12).
    #[must_use]
    pub const fn crd(self) -> u32 {
        RD.get(self.0)
    }

    /// Coprocessor first operand register (bits 19..16).
    #[must_use]
    pub const fn crn(self) -> u32 {
        RN.get(self.0)
    }

    /// Coprocessor second operand register (bits 3..0).
    #[must_use]
    pub const fn crm(self) -> u32 {
        RM.get(self.0)
    }

    /// ARM register of a register transfer (bits 15..12).
    #[must_use]
    pub const fn rd(self) -> Register {
        Register::from_field(RD.get(self.0))
    }

    /// Base register of a load/store, or second register of `MCRR`/`MRRC`.
    #[must_use]
    pub const fn rn(self) -> Register {
        Register::from_field(RN.get(self.0))
    }

    /// Four-bit `opcode_1` of `CDP`.
    #[must_use]
    pub const fn opcode_1(self) -> u32 {
        CP_OPCODE_1.get(self.0)
    }

    /// Three-bit `opcode_1` of `MCR`/`MRC`.
    #[must_use]
    pub const fn transfer_opcode_1(self) -> u32 {
        CP_OPCODE_1_TRANSFER.get(self.0)
    }

    /// Three-bit `opcode_2`.
    #[must_use]
    pub const fn opcode_2(self) -> u32 {
        CP_OPCODE_2.get(self.0)
    }

    /// Four-bit opcode of `MCRR`/`MRRC`.
    #[must_use]
    pub const fn double_opcode(self) -> u32 {
        CP_OPCODE_DOUBLE.get(self.0)
    }

    /// Word offset of a coprocessor load/store (or option for unindexed).
    #[must_use]
    pub const fn offset_8(self) -> u32 {
        IMMED_8.get(self.0)
    }

    /// Pre-indexing bit.
    #[must_use]
    pub const fn p(self) -> bool {
        BIT_24.is_set(self.0)
    }

    /// Add-offset bit.
    #[must_use]
    pub const fn u(self) -> bool {
        BIT_23.is_set(self.0)
    }

    /// Long-transfer bit (bit 22).
    #[must_use]
    pub const fn n(self) -> bool {
        BIT_22.is_set(self.0)
    }

    /// Write-back bit.
    #[must_use]
    pub const fn w(self) -> bool {
        BIT_21.is_set(self.0)
    }

    /// Load / coprocessor-to-ARM bit.
    #[must_use]
    pub const fn l(self) -> bool {
        BIT_20.is_set(self.0)
    }

    /// Register-transfer bit (bit 4); clear for `CDP`.
    #[must_use]
    pub const fn register_transfer(self) -> bool {
        BIT_4.is_set(self.0)
    }
}

/// Branch and branch-with-link (`cond 101 L offset_24`).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Branch(u32);

impl Branch {
    /// Wraps a raw instruction word.
    #[must_use]
    pub const fn new(word: u32) -> Self {
        Self(word)
    }

    /// Condition field.
    #[must_use]
    pub const fn cond(self) -> Condition {
        Condition::of_arm(self.0)
    }

    /// Link bit; the halfword bit `H` for `BLX` immediate.
    #[must_use]
    pub const fn l(self) -> bool {
        BIT_24.is_set(self.0)
    }

    /// Signed 24-bit word offset.
    #[must_use]
    pub const fn offset_24(self) -> i32 {
        OFFSET_24.get_signed(self.0)
    }

    /// Byte displacement from the PC value (`offset_24 << 2`, plus 2 for `BLX` with `H`).
    #[must_use]
    pub const fn displacement(self) -> i32 {
        let base = self.offset_24().wrapping_shl(2);
        if matches!(self.cond(), Condition::Nv) && self.l() {
            base.wrapping_add(2)
        } else {
            base
        }
    }
}

/// Software interrupt and breakpoint immediates.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ExceptionGenerating(u32);

impl ExceptionGenerating {
    /// Wraps a raw instruction word.
    #[must_use]
    pub const fn new(word: u32) -> Self {
        Self(word)
    }

    /// Condition field.
    #[must_use]
    pub const fn cond(self) -> Condition {
        Condition::of_arm(self.0)
    }

    /// `SWI` comment field.
    #[must_use]
    pub const fn immed_24(self) -> u32 {
        IMMED_24.get(self.0)
    }

    /// `BKPT` immediate `immed_h:immed_l`.
    #[must_use]
    pub const fn breakpoint_immediate(self) -> u32 {
        (BKPT_HIGH.get(self.0) << 4) | IMMED_L.get(self.0)
    }
}

/// `MRS`/`MSR` status register transfers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct StatusTransfer(u32);

impl StatusTransfer {
    /// Wraps a raw instruction word.
    #[must_use]
    pub const fn new(word: u32) -> Self {
        Self(word)
    }

    /// Condition field.
    #[must_use]
    pub const fn cond(self) -> Condition {
        Condition::of_arm(self.0)
    }

    /// `true` when the SPSR is addressed (bit 22).
    #[must_use]
    pub const fn spsr(self) -> bool {
        BIT_22.is_set(self.0)
    }

    /// Field mask bits 19..16 (`c`, `x`, `s`, `f` from low to high).
    #[must_use]
    pub const fn field_mask(self) -> u32 {
        FIELD_MASK.get(self.0)
    }

    /// Destination register of `MRS`.
    #[must_use]
    pub const fn rd(self) -> Register {
        Register::from_field(RD.get(self.0))
    }

    /// Source register of register-form `MSR`.
    #[must_use]
    pub const fn rm(self) -> Register {
        Register::from_field(RM.get(self.0))
    }

    /// Rotated immediate of immediate-form `MSR`.
    #[must_use]
    pub const fn rotated_immediate(self) -> u32 {
        DataProcessing::new(self.0).rotated_immediate()
    }
}
