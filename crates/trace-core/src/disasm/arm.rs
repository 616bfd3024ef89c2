//! ARM (32-bit) instruction disassembly.

use crate::condition::Condition;
use crate::encoding::{
    extended_opcode, Branch, Coprocessor, DataProcessing, ExceptionGenerating, LoadStore,
    LoadStoreMultiple, MiscLoadStore, Multiply, StatusTransfer, BITS_27_20, BITS_27_24,
    BITS_27_25, BITS_27_26, BITS_7_4,
};
use crate::register::{format_register_list, Register};

use super::operand::{shifter_operand, Address, Indexing, Offset};
use super::{format_immediate, format_target, Disassembly, INVALID_ADDRESSING_MODE};

/// `MOV R0, R0`, rendered as `NOP`.
const NOP_WORD: u32 = 0xE1A0_0000;

const DATA_PROCESSING_NAMES: [&str; 16] = [
    "AND", "EOR", "SUB", "RSB", "ADD", "ADC", "SBC", "RSC", "TST", "TEQ", "CMP", "CMN", "ORR",
    "MOV", "BIC", "MVN",
];

/// Disassembles a 32-bit ARM instruction. `pc` is the value read from R15.
#[must_use]
pub fn disassemble_arm(pc: u32, word: u32) -> Disassembly {
    if word == NOP_WORD {
        return Disassembly::new("NOP");
    }

    let cond = Condition::of_arm(word);
    let c = cond.extension();

    if is_preload(word) {
        return Disassembly::new("PLD").operands_from(load_store_address(LoadStore::new(word)));
    }

    match BITS_27_25.get(word) {
        0b000 => {
            if let Some(dis) = misc_load_store(word, c) {
                return dis;
            }
        }
        0b100 => return load_store_multiple(word, c),
        0b101 => return branch(pc, word, c),
        _ => {}
    }

    if matches!(BITS_27_20.get(word), 0xC4 | 0xC5) {
        return coprocessor_double_transfer(word);
    }
    if BITS_27_25.get(word) == 0b110 {
        return coprocessor_load_store(word);
    }

    match BITS_27_24.get(word) {
        0b1110 => return coprocessor_operation(word),
        0b1111 => {
            let op = ExceptionGenerating::new(word);
            return Disassembly::new(format!("SWI{c}")).operand(format!("#{}", op.immed_24()));
        }
        _ => {}
    }

    if matches!(cond, Condition::Al)
        && BITS_27_20.get(word) == 0x12
        && BITS_7_4.get(word) == 0b0111
    {
        let op = ExceptionGenerating::new(word);
        return Disassembly::new("BKPT").operand(format!("#{}", op.breakpoint_immediate()));
    }

    if let Some(dis) = miscellaneous(word, c) {
        return dis;
    }
    if let Some(dis) = status_transfer(word, c) {
        return dis;
    }

    match BITS_27_26.get(word) {
        0b00 => data_processing(word, c),
        0b01 => load_store(word, c),
        _ => Disassembly::unknown(),
    }
}

const fn is_preload(word: u32) -> bool {
    let op = LoadStore::new(word);
    matches!(op.cond(), Condition::Nv)
        && matches!(op.rd(), Register::Pc)
        && BITS_27_26.get(word) == 0b01
        && op.p()
        && BITS_27_20.get(word) & 0b111 == 0b101
}

fn misc_load_store(word: u32, c: &str) -> Option<Disassembly> {
    let op = MiscLoadStore::new(word);
    let mnemonic = match (BITS_7_4.get(word), op.l()) {
        (0b1011, true) => format!("LDR{c}H"),
        (0b1011, false) => format!("STR{c}H"),
        (0b1101, false) => format!("LDR{c}D"),
        (0b1101, true) => format!("LDR{c}SB"),
        (0b1111, true) => format!("LDR{c}SH"),
        (0b1111, false) => format!("STR{c}D"),
        _ => return None,
    };

    let offset = if op.i() {
        Offset::immediate(op.u(), op.offset_8())
    } else {
        Offset::Register {
            add: op.u(),
            rm: op.rm(),
        }
    };

    Some(
        Disassembly::new(mnemonic)
            .operand(op.rd().to_string())
            .operands_from(render_address(op.rn(), offset, op.p(), op.w())),
    )
}

fn render_address(
    base: Register,
    offset: Offset,
    p: bool,
    w: bool,
) -> Vec<String> {
    Indexing::from_pw(p, w).map_or_else(
        || vec![INVALID_ADDRESSING_MODE.to_string()],
        |indexing| {
            Address {
                base,
                offset,
                indexing,
            }
            .render()
        },
    )
}

/// Stack-style suffix from the `L`, `P` and `U` bits.
const fn stack_mode(l: bool, p: bool, u: bool) -> &'static str {
    match (l, p, u) {
        (true, false, false) | (false, true, true) => "FA",
        (true, false, true) | (false, true, false) => "FD",
        (true, true, false) | (false, false, true) => "EA",
        (true, true, true) | (false, false, false) => "ED",
    }
}

fn load_store_multiple(word: u32, c: &str) -> Disassembly {
    let op = LoadStoreMultiple::new(word);
    let name = if op.l() { "LDM" } else { "STM" };
    let mode = stack_mode(op.l(), op.p(), op.u());
    let base = if op.w() {
        format!("{}!", op.rn())
    } else {
        op.rn().to_string()
    };
    let mut list = format_register_list(op.register_list());
    if op.s() {
        list.push('^');
    }
    Disassembly::new(format!("{name}{c}{mode}"))
        .operand(base)
        .operand(list)
}

fn branch(pc: u32, word: u32, c: &str) -> Disassembly {
    let op = Branch::new(word);
    let target = format_target(pc.wrapping_add_signed(op.displacement()));
    if matches!(op.cond(), Condition::Nv) {
        return Disassembly::new("BLX").operand(target);
    }
    let link = if op.l() { "L" } else { "" };
    Disassembly::new(format!("B{link}{c}")).operand(target)
}

const fn coprocessor_suffix(op: Coprocessor) -> &'static str {
    if matches!(op.cond(), Condition::Nv) {
        "2"
    } else {
        op.cond().extension()
    }
}

fn coprocessor_double_transfer(word: u32) -> Disassembly {
    let op = Coprocessor::new(word);
    let name = if op.l() { "MRRC" } else { "MCRR" };
    Disassembly::new(format!("{name}{}", coprocessor_suffix(op)))
        .operand(format!("p{}", op.cp_num()))
        .operand(op.double_opcode().to_string())
        .operand(op.rd().to_string())
        .operand(op.rn().to_string())
        .operand(format!("c{}", op.crm()))
}

fn coprocessor_load_store(word: u32) -> Disassembly {
    let op = Coprocessor::new(word);
    let name = if op.l() { "LDC" } else { "STC" };
    let long = if op.n() { "L" } else { "" };
    let dis = Disassembly::new(format!("{name}{}{long}", coprocessor_suffix(op)))
        .operand(format!("p{}", op.cp_num()))
        .operand(format!("c{}", op.crd()));

    if !op.p() && !op.w() {
        if !op.u() {
            return dis.operand(INVALID_ADDRESSING_MODE);
        }
        return dis
            .operand(format!("[{}]", op.rn()))
            .operand(format!("{{{}}}", op.offset_8()));
    }

    let offset = Offset::immediate(op.u(), op.offset_8() * 4);
    dis.operands_from(render_address(op.rn(), offset, op.p(), op.w() && op.p()))
}

fn coprocessor_operation(word: u32) -> Disassembly {
    let op = Coprocessor::new(word);
    let suffix = coprocessor_suffix(op);
    let cp = format!("p{}", op.cp_num());

    if !op.register_transfer() {
        return Disassembly::new(format!("CDP{suffix}"))
            .operand(cp)
            .operand(op.opcode_1().to_string())
            .operand(format!("c{}", op.crd()))
            .operand(format!("c{}", op.crn()))
            .operand(format!("c{}", op.crm()))
            .operand(op.opcode_2().to_string());
    }

    let name = if op.l() { "MRC" } else { "MCR" };
    let dis = Disassembly::new(format!("{name}{suffix}"))
        .operand(cp)
        .operand(op.transfer_opcode_1().to_string())
        .operand(op.rd().to_string())
        .operand(format!("c{}", op.crn()))
        .operand(format!("c{}", op.crm()));
    if op.opcode_2() == 0 {
        dis
    } else {
        dis.operand(op.opcode_2().to_string())
    }
}

/// Operand layouts of the multiply and miscellaneous table.
enum Layout {
    /// `Rm`
    Rm,
    /// `Rd, Rm` with `Rd` in bits 15..12.
    RdRm,
    /// `Rd, Rm, Rn` with `Rd` in bits 15..12 (saturating arithmetic).
    Saturating,
    /// `Rd, Rm, Rs, Rn` with `Rd` in bits 19..16.
    Accumulate,
    /// `Rd, Rm, Rs` with `Rd` in bits 19..16.
    Product,
    /// `RdLo, RdHi, Rm, Rs`.
    Long,
    /// `Rd, Rm, [Rn]`.
    Swap,
}

fn miscellaneous(word: u32, c: &str) -> Option<Disassembly> {
    let (name, suffix, layout) = match extended_opcode(word) {
        0x121 => ("BX", "", Layout::Rm),
        0x122 => ("BXJ", "", Layout::Rm),
        0x123 => ("BLX", "", Layout::Rm),
        0x161 => ("CLZ", "", Layout::RdRm),
        0x009 => ("MUL", "", Layout::Product),
        0x019 => ("MUL", "S", Layout::Product),
        0x029 => ("MLA", "", Layout::Accumulate),
        0x039 => ("MLA", "S", Layout::Accumulate),
        0x089 => ("UMULL", "", Layout::Long),
        0x099 => ("UMULL", "S", Layout::Long),
        0x0A9 => ("UMLAL", "", Layout::Long),
        0x0B9 => ("UMLAL", "S", Layout::Long),
        0x0C9 => ("SMULL", "", Layout::Long),
        0x0D9 => ("SMULL", "S", Layout::Long),
        0x0E9 => ("SMLAL", "", Layout::Long),
        0x0F9 => ("SMLAL", "S", Layout::Long),
        0x105 => ("QADD", "", Layout::Saturating),
        0x125 => ("QSUB", "", Layout::Saturating),
        0x145 => ("QDADD", "", Layout::Saturating),
        0x165 => ("QDSUB", "", Layout::Saturating),
        0x108 => ("SMLABB", "", Layout::Accumulate),
        0x10A => ("SMLATB", "", Layout::Accumulate),
        0x10C => ("SMLABT", "", Layout::Accumulate),
        0x10E => ("SMLATT", "", Layout::Accumulate),
        0x128 => ("SMLAWB", "", Layout::Accumulate),
        0x12C => ("SMLAWT", "", Layout::Accumulate),
        0x12A => ("SMULWB", "", Layout::Product),
        0x12E => ("SMULWT", "", Layout::Product),
        0x148 => ("SMLALBB", "", Layout::Long),
        0x14A => ("SMLALTB", "", Layout::Long),
        0x14C => ("SMLALBT", "", Layout::Long),
        0x14E => ("SMLALTT", "", Layout::Long),
        0x168 => ("SMULBB", "", Layout::Product),
        0x16A => ("SMULTB", "", Layout::Product),
        0x16C => ("SMULBT", "", Layout::Product),
        0x16E => ("SMULTT", "", Layout::Product),
        0x109 => ("SWP", "", Layout::Swap),
        0x149 => ("SWP", "B", Layout::Swap),
        _ => return None,
    };

    let dp = DataProcessing::new(word);
    let mul = Multiply::new(word);
    let dis = Disassembly::new(format!("{name}{c}{suffix}"));

    Some(match layout {
        Layout::Rm => dis.operand(dp.shifter().rm().to_string()),
        Layout::RdRm => dis
            .operand(dp.rd().to_string())
            .operand(dp.shifter().rm().to_string()),
        Layout::Saturating => dis
            .operand(dp.rd().to_string())
            .operand(dp.shifter().rm().to_string())
            .operand(dp.rn().to_string()),
        Layout::Accumulate => dis
            .operand(mul.rd().to_string())
            .operand(mul.rm().to_string())
            .operand(mul.rs().to_string())
            .operand(mul.rn().to_string()),
        Layout::Product => dis
            .operand(mul.rd().to_string())
            .operand(mul.rm().to_string())
            .operand(mul.rs().to_string()),
        Layout::Long => dis
            .operand(mul.rn().to_string())
            .operand(mul.rd().to_string())
            .operand(mul.rm().to_string())
            .operand(mul.rs().to_string()),
        Layout::Swap => dis
            .operand(dp.rd().to_string())
            .operand(dp.shifter().rm().to_string())
            .operand(format!("[{}]", dp.rn())),
    })
}

fn psr_fields(op: StatusTransfer) -> String {
    let psr = if op.spsr() { "SPSR" } else { "CPSR" };
    let mask = op.field_mask();
    let mut fields = String::new();
    for (bit, letter) in [(0b1000, 'f'), (0b0100, 's'), (0b0010, 'x'), (0b0001, 'c')] {
        if mask & bit != 0 {
            fields.push(letter);
        }
    }
    format!("{psr}_{fields}")
}

fn status_transfer(word: u32, c: &str) -> Option<Disassembly> {
    let op = StatusTransfer::new(word);
    let register_form = BITS_7_4.get(word) == 0;
    match BITS_27_20.get(word) {
        0x32 | 0x36 => Some(
            Disassembly::new(format!("MSR{c}"))
                .operand(psr_fields(op))
                .operand(format_immediate(op.rotated_immediate())),
        ),
        0x12 | 0x16 if register_form => Some(
            Disassembly::new(format!("MSR{c}"))
                .operand(psr_fields(op))
                .operand(op.rm().to_string()),
        ),
        0x10 | 0x14 if register_form => Some(
            Disassembly::new(format!("MRS{c}"))
                .operand(op.rd().to_string())
                .operand(if op.spsr() { "SPSR" } else { "CPSR" }),
        ),
        _ => None,
    }
}

fn data_processing(word: u32, c: &str) -> Disassembly {
    let op = DataProcessing::new(word);
    if !op.is_data_processing() {
        return Disassembly::unknown();
    }

    let opcode = op.opcode();
    let name = DATA_PROCESSING_NAMES[opcode as usize];
    let s = if op.s() { "S" } else { "" };

    match opcode {
        0xF if op.immediate() => Disassembly::new(format!("MOV{s}{c}"))
            .operand(op.rd().to_string())
            .operand(format_immediate(!op.rotated_immediate())),
        0xD | 0xF => Disassembly::new(format!("{name}{s}{c}"))
            .operand(op.rd().to_string())
            .operands_from(shifter_operand(op)),
        0x8..=0xB => Disassembly::new(format!("{name}{c}"))
            .operand(op.rn().to_string())
            .operands_from(shifter_operand(op)),
        _ => Disassembly::new(format!("{name}{s}{c}"))
            .operand(op.rd().to_string())
            .operand(op.rn().to_string())
            .operands_from(shifter_operand(op)),
    }
}

fn load_store_address(op: LoadStore) -> Vec<String> {
    let offset = if op.register_offset() {
        if op.offset_register().register_shift() {
            return vec![INVALID_ADDRESSING_MODE.to_string()];
        }
        Offset::register(op.u(), op.offset_register())
    } else {
        Offset::immediate(op.u(), op.offset_12())
    };
    // P clear with W set selects the user-mode (T) variants, still post-indexed.
    render_address(op.rn(), offset, op.p(), op.w() && op.p())
}

fn load_store(word: u32, c: &str) -> Disassembly {
    let op = LoadStore::new(word);
    if op.register_offset() && op.offset_register().register_shift() {
        return Disassembly::unknown();
    }

    let name = if op.l() { "LDR" } else { "STR" };
    let byte = if op.b() { "B" } else { "" };
    let translate = if !op.p() && op.w() { "T" } else { "" };
    Disassembly::new(format!("{name}{c}{byte}{translate}"))
        .operand(op.rd().to_string())
        .operands_from(load_store_address(op))
}

#[cfg(test)]
mod tests {
    use super::*;

    const PC: u32 = 0x0200_0000 + 8;

    fn dis(word: u32) -> Vec<String> {
        disassemble_arm(PC, word).parts().to_vec()
    }

    #[test]
    fn data_processing_fixtures() {
        assert_eq!(dis(0xE356_0000), ["CMP", "R6", "#0"]);
        assert_eq!(dis(0xE3E0_5000), ["MOV", "R5", "#0xFFFFFFFF"]);
        assert_eq!(dis(0xE285_5001), ["ADD", "R5", "R5", "#1"]);
        assert_eq!(dis(0xE281_103C), ["ADD", "R1", "R1", "#0x3C"]);
        assert_eq!(dis(0xE261_1000), ["RSB", "R1", "R1", "#0"]);
        assert_eq!(dis(0xE1B0_1FA1), ["MOVS", "R1", "R1", "LSR #31"]);
        assert_eq!(dis(0x03A0_3000), ["MOVEQ", "R3", "#0"]);
        assert_eq!(dis(0xE211_1502), ["ANDS", "R1", "R1", "#0x800000"]);
        assert_eq!(dis(0xE200_0080), ["AND", "R0", "R0", "#0x80"]);
        assert_eq!(dis(0xE187_740C), ["ORR", "R7", "R7", "R12", "LSL #8"]);
        assert_eq!(dis(0xE131_0002), ["TEQ", "R1", "R2"]);
        assert_eq!(dis(0xE1A0_1231), ["MOV", "R1", "R1", "LSR R2"]);
    }

    #[test]
    fn nop() {
        assert_eq!(dis(0xE1A0_0000), ["NOP"]);
        assert_eq!(dis(0xE1A0_1001), ["MOV", "R1", "R1"]);
    }

    #[test]
    fn branch_and_exchange() {
        assert_eq!(dis(0xE12F_FF1E), ["BX", "LR"]);
        assert_eq!(dis(0xE12F_FF30), ["BLX", "R0"]);
        assert_eq!(dis(0x112F_FF13), ["BXNE", "R3"]);
    }

    #[test]
    fn breakpoints_and_swi() {
        assert_eq!(dis(0xE120_0070), ["BKPT", "#0"]);
        assert_eq!(dis(0xE120_027A), ["BKPT", "#42"]);
        assert_eq!(dis(0xEF00_0005), ["SWI", "#5"]);
        assert_eq!(dis(0x0F00_0010), ["SWIEQ", "#16"]);
    }

    #[test]
    fn status_registers() {
        assert_eq!(dis(0xE121_F001), ["MSR", "CPSR_c", "R1"]);
        assert_eq!(dis(0xE10F_1000), ["MRS", "R1", "CPSR"]);
        assert_eq!(dis(0xE14F_2000), ["MRS", "R2", "SPSR"]);
        assert_eq!(dis(0xE369_F01F), ["MSR", "SPSR_fc", "#0x1F"]);
    }

    #[test]
    fn coprocessor() {
        assert_eq!(dis(0xEE07_0F9A), ["MCR", "p15", "0", "R0", "c7", "c10", "4"]);
        assert_eq!(dis(0xEE11_0F10), ["MRC", "p15", "0", "R0", "c1", "c0"]);
        assert_eq!(dis(0xEE12_3446), ["CDP", "p4", "1", "c3", "c2", "c6", "2"]);
        assert_eq!(dis(0xED93_1402), ["LDC", "p4", "c1", "[R3, #8]"]);
        assert_eq!(dis(0xED33_1402), ["LDC", "p4", "c1", "[R3, #-8]!"]);
        assert_eq!(dis(0xECB3_1402), ["LDC", "p4", "c1", "[R3]", "#8"]);
        assert_eq!(dis(0xEC93_1402), ["LDC", "p4", "c1", "[R3]", "{2}"]);
        assert_eq!(dis(0xEDC3_1402), ["STCL", "p4", "c1", "[R3, #8]"]);
        assert_eq!(dis(0xEC41_2F13), ["MCRR", "p15", "1", "R2", "R1", "c3"]);
    }

    #[test]
    fn multiplies() {
        assert_eq!(dis(0xE020_2091), ["MLA", "R0", "R1", "R0", "R2"]);
        assert_eq!(dis(0xE000_0291), ["MUL", "R0", "R1", "R2"]);
        assert_eq!(dis(0xE010_0291), ["MULS", "R0", "R1", "R2"]);
        assert_eq!(dis(0xE0C1_0392), ["SMULL", "R0", "R1", "R2", "R3"]);
        assert_eq!(dis(0xE0A1_0392), ["UMLAL", "R0", "R1", "R2", "R3"]);
        assert_eq!(dis(0xE169_0281), ["SMULBB", "R9", "R1", "R2"]);
        assert_eq!(dis(0xE103_2051), ["QADD", "R2", "R1", "R3"]);
        assert_eq!(dis(0xE16F_1F12), ["CLZ", "R1", "R2"]);
    }

    #[test]
    fn swap() {
        assert_eq!(dis(0xE102_1093), ["SWP", "R1", "R3", "[R2]"]);
        assert_eq!(dis(0xE142_1093), ["SWPB", "R1", "R3", "[R2]"]);
        assert_eq!(dis(0x0142_1093), ["SWPEQB", "R1", "R3", "[R2]"]);
    }

    #[test]
    fn misc_load_store() {
        assert_eq!(dis(0xE1D0_C1B8), ["LDRH", "R12", "[R0, #0x18]"]);
        assert_eq!(dis(0xE1C0_00B0), ["STRH", "R0", "[R0]"]);
        assert_eq!(dis(0xE0D1_00D2), ["LDRSB", "R0", "[R1]", "#2"]);
        assert_eq!(dis(0xE191_00F2), ["LDRSH", "R0", "[R1, +R2]"]);
        assert_eq!(dis(0xE1E1_00F4), ["STRD", "R0", "[R1, #4]!"]);
        assert_eq!(dis(0x01C1_00D0), ["LDREQD", "R0", "[R1]"]);
    }

    #[test]
    fn load_store() {
        assert_eq!(dis(0xE591_0004), ["LDR", "R0", "[R1, #4]"]);
        assert_eq!(dis(0xE511_0004), ["LDR", "R0", "[R1, #-4]"]);
        assert_eq!(dis(0xE5B1_0004), ["LDR", "R0", "[R1, #4]!"]);
        assert_eq!(dis(0xE491_0004), ["LDR", "R0", "[R1]", "#4"]);
        assert_eq!(dis(0xE4B1_0004), ["LDRT", "R0", "[R1]", "#4"]);
        assert_eq!(dis(0xE4F1_0001), ["LDRBT", "R0", "[R1]", "#1"]);
        assert_eq!(dis(0xE5C1_0000), ["STRB", "R0", "[R1]"]);
        assert_eq!(dis(0xE791_0102), ["LDR", "R0", "[R1, +R2, LSL #2]"]);
        assert_eq!(dis(0xE711_0002), ["LDR", "R0", "[R1, -R2]"]);
        assert_eq!(dis(0xE691_0102), ["LDR", "R0", "[R1]", "+R2", "LSL #2"]);
        assert_eq!(dis(0xE49D_F004), ["LDR", "PC", "[SP]", "#4"]);
        assert_eq!(dis(0xE791_0112), ["; unknown"]);
    }

    #[test]
    fn preload() {
        assert_eq!(dis(0xF5D1_F020), ["PLD", "[R1, #0x20]"]);
    }

    #[test]
    fn load_store_multiple() {
        assert_eq!(dis(0xE8BD_8010), ["LDMFD", "SP!", "{R4,PC}"]);
        assert_eq!(dis(0xE92D_4010), ["STMFD", "SP!", "{R4,LR}"]);
        assert_eq!(dis(0xE9F1_7FFF), ["LDMED", "R1!", "{R0-R12,SP,LR}^"]);
        assert_eq!(dis(0xE881_7FFF), ["STMEA", "R1", "{R0-R12,SP,LR}"]);
        assert_eq!(dis(0xE8D0_0003), ["LDMFD", "R0", "{R0-R1}^"]);
        assert_eq!(dis(0x08BD_8010), ["LDMEQFD", "SP!", "{R4,PC}"]);
    }

    #[test]
    fn branches_use_pc_as_given() {
        assert_eq!(dis(0xEAFF_FFFE), ["B", "0x2000000"]);
        assert_eq!(dis(0xEB00_0010), ["BL", "0x2000048"]);
        assert_eq!(dis(0x1A00_0000), ["BNE", "0x2000008"]);
        assert_eq!(dis(0xFA00_0000), ["BLX", "0x2000008"]);
        assert_eq!(dis(0xFB00_0000), ["BLX", "0x200000A"]);
    }

    #[test]
    fn unknown_encodings() {
        assert_eq!(dis(0xE600_0010), ["; unknown"]);
        assert_eq!(dis(0xE060_0090), ["; unknown"]);
    }
}
