//! Thumb (16-bit) instruction disassembly.

use crate::condition::Condition;
use crate::encoding::ThumbInstruction;
use crate::register::{format_register_list, Register};

use super::operand::{Address, Indexing, Offset};
use super::{format_immediate, format_target, Disassembly};

const ALU_NAMES: [&str; 16] = [
    "AND", "EOR", "LSL", "LSR", "ASR", "ADC", "SBC", "ROR", "TST", "NEG", "CMP", "CMN", "ORR",
    "MUL", "BIC", "MVN",
];

/// Disassembles a 16-bit Thumb instruction. `pc` is the value read from R15.
#[must_use]
pub fn disassemble_thumb(pc: u32, word: u32) -> Disassembly {
    let op = ThumbInstruction::new(word);

    match op.opcode_15_10() {
        0b00_0000 | 0b00_0001 => shift_immediate("LSL", op),
        0b00_0010 | 0b00_0011 => shift_immediate("LSR", op),
        0b00_0100 | 0b00_0101 => shift_immediate("ASR", op),
        0b00_0110 => {
            let name = if op.bit_9() { "SUB" } else { "ADD" };
            Disassembly::new(name)
                .operand(op.rd().to_string())
                .operand(op.rn().to_string())
                .operand(op.rm().to_string())
        }
        0b00_0111 => add_sub_immediate(op),
        0b00_1000 | 0b00_1001 => immediate_8("MOV", op),
        0b00_1010 | 0b00_1011 => immediate_8("CMP", op),
        0b00_1100 | 0b00_1101 => immediate_8("ADD", op),
        0b00_1110 | 0b00_1111 => immediate_8("SUB", op),
        0b01_0000 => Disassembly::new(ALU_NAMES[op.opcode_9_6() as usize])
            .operand(op.rd().to_string())
            .operand(op.rn().to_string()),
        0b01_0001 => high_register(op),
        0b01_0010 | 0b01_0011 => Disassembly::new("LDR")
            .operand(op.rd_high().to_string())
            .operands_from(memory(Register::Pc, op.immed_8() * 4)),
        0b01_0100 => register_offset(if op.bit_9() { "STRH" } else { "STR" }, op),
        0b01_0101 => register_offset(if op.bit_9() { "LDRSB" } else { "STRB" }, op),
        0b01_0110 => register_offset(if op.bit_9() { "LDRH" } else { "LDR" }, op),
        0b01_0111 => register_offset(if op.bit_9() { "LDRSH" } else { "LDRB" }, op),
        0b01_1000 | 0b01_1001 => immediate_offset("STR", op, 4),
        0b01_1010 | 0b01_1011 => immediate_offset("LDR", op, 4),
        0b01_1100 | 0b01_1101 => immediate_offset("STRB", op, 1),
        0b01_1110 | 0b01_1111 => immediate_offset("LDRB", op, 1),
        0b10_0000 | 0b10_0001 => immediate_offset("STRH", op, 2),
        0b10_0010 | 0b10_0011 => immediate_offset("LDRH", op, 2),
        0b10_0100 | 0b10_0101 => Disassembly::new("STR")
            .operand(op.rd_high().to_string())
            .operands_from(memory(Register::Sp, op.immed_8() * 4)),
        0b10_0110 | 0b10_0111 => Disassembly::new("LDR")
            .operand(op.rd_high().to_string())
            .operands_from(memory(Register::Sp, op.immed_8() * 4)),
        0b10_1000 | 0b10_1001 => Disassembly::new("ADD")
            .operand(op.rd_high().to_string())
            .operand("PC")
            .operand(format_immediate(op.immed_8() * 4)),
        0b10_1010 | 0b10_1011 => Disassembly::new("ADD")
            .operand(op.rd_high().to_string())
            .operand("SP")
            .operand(format_immediate(op.immed_8() * 4)),
        0b10_1100 => match op.opcode_9_7() {
            0b000 => Disassembly::new("ADD")
                .operand("SP")
                .operand(format_immediate(op.immed_7() * 4)),
            0b001 => Disassembly::new("SUB")
                .operand("SP")
                .operand(format_immediate(op.immed_7() * 4)),
            _ => Disassembly::unknown(),
        },
        0b10_1101 if !op.bit_9() => {
            let mut list = op.register_list();
            if op.r() {
                list |= Register::Lr.mask_bit();
            }
            Disassembly::new("PUSH").operand(format_register_list(list))
        }
        0b10_1111 if !op.bit_9() => {
            let mut list = op.register_list();
            if op.r() {
                list |= Register::Pc.mask_bit();
            }
            Disassembly::new("POP").operand(format_register_list(list))
        }
        0b10_1111 if !op.bit_8() => {
            Disassembly::new("BKPT").operand(format!("#{}", op.immed_8()))
        }
        0b11_0000 | 0b11_0001 => multiple("STMIA", op),
        0b11_0010 | 0b11_0011 => multiple("LDMIA", op),
        0b11_0100..=0b11_0111 => {
            let cond = op.cond();
            if matches!(cond, Condition::Nv) {
                Disassembly::new("SWI").operand(format!("#{}", op.immed_8()))
            } else {
                let target = pc.wrapping_add_signed(op.offset_8().wrapping_shl(1));
                Disassembly::new(format!("B{}", cond.extension())).operand(format_target(target))
            }
        }
        0b11_1000 | 0b11_1001 => {
            let target = pc.wrapping_add_signed(op.offset_11().wrapping_shl(1));
            Disassembly::new("B").operand(format_target(target))
        }
        0b11_1010 | 0b11_1011 => {
            Disassembly::new("BLX(lo)").operand(format_immediate(op.immed_11() << 1))
        }
        0b11_1100 | 0b11_1101 => {
            let high = pc.wrapping_add_signed(op.offset_11().wrapping_shl(12));
            Disassembly::new("BL(hi)").operand(format_immediate(high))
        }
        0b11_1110 | 0b11_1111 => {
            Disassembly::new("BL(lo)").operand(format_immediate(op.immed_11() << 1))
        }
        _ => Disassembly::unknown(),
    }
}

fn memory(base: Register, offset: u32) -> Vec<String> {
    Address {
        base,
        offset: Offset::immediate(true, offset),
        indexing: Indexing::Offset,
    }
    .render()
}

fn shift_immediate(name: &str, op: ThumbInstruction) -> Disassembly {
    // LSR and ASR encode a shift by 32 as zero.
    let amount = match (name, op.immed_5()) {
        ("LSR" | "ASR", 0) => 32,
        (_, amount) => amount,
    };
    Disassembly::new(name)
        .operand(op.rd().to_string())
        .operand(op.rn().to_string())
        .operand(format_immediate(amount))
}

fn add_sub_immediate(op: ThumbInstruction) -> Disassembly {
    let immediate = op.immed_3();
    if !op.bit_9() && immediate == 0 {
        return Disassembly::new("MOV")
            .operand(op.rd().to_string())
            .operand(op.rn().to_string());
    }
    let name = if op.bit_9() { "SUB" } else { "ADD" };
    Disassembly::new(name)
        .operand(op.rd().to_string())
        .operand(op.rn().to_string())
        .operand(format_immediate(immediate))
}

fn immediate_8(name: &str, op: ThumbInstruction) -> Disassembly {
    Disassembly::new(name)
        .operand(op.rd_high().to_string())
        .operand(format_immediate(op.immed_8()))
}

fn high_register(op: ThumbInstruction) -> Disassembly {
    let rd = op.hi_rd().to_string();
    let rm = op.hi_rm().to_string();
    match op.opcode_9_7() {
        0b000 | 0b001 => Disassembly::new("ADD").operand(rd).operand(rm),
        0b010 | 0b011 => Disassembly::new("CMP").operand(rd).operand(rm),
        0b100 | 0b101 => Disassembly::new("CPY").operand(rd).operand(rm),
        0b110 => Disassembly::new("BX").operand(rm),
        _ => Disassembly::new("BLX").operand(rm),
    }
}

fn register_offset(name: &str, op: ThumbInstruction) -> Disassembly {
    let address = Address {
        base: op.rn(),
        offset: Offset::Register {
            add: true,
            rm: op.rm(),
        },
        indexing: Indexing::Offset,
    };
    Disassembly::new(name)
        .operand(op.rd().to_string())
        .operands_from(address.render())
}

fn immediate_offset(name: &str, op: ThumbInstruction, scale: u32) -> Disassembly {
    Disassembly::new(name)
        .operand(op.rd().to_string())
        .operands_from(memory(op.rn(), op.immed_5() * scale))
}

fn multiple(name: &str, op: ThumbInstruction) -> Disassembly {
    Disassembly::new(name)
        .operand(format!("{}!", op.rd_high()))
        .operand(format_register_list(op.register_list()))
}
