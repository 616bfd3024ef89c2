//! Decoder conformance suite: condition truth table, classification and
//! disassembly fixtures, and property coverage across processor modes.

#![allow(
    clippy::pedantic,
    clippy::nursery,
    clippy::cast_possible_truncation,
    clippy::cast_sign_loss
)]

use proptest::prelude::*;
use rstest::rstest;
#[cfg(feature = "serde")]
use serde as _;
use thiserror as _;
use trace_core::psr::{CPSR_C, CPSR_N, CPSR_T, CPSR_V, CPSR_Z};
use trace_core::{
    classify, disassemble, format_register_list, is_context_save, is_context_switch, Condition,
    CpuState, InstructionType, SchedulerSignatures,
};
use tracing as _;

const IRQ: u32 = 0x6000_00D2;

const MODES: [u32; 7] = [0x10, 0x11, 0x12, 0x13, 0x17, 0x1B, 0x1F];

fn flags(nzcv: u32) -> u32 {
    (nzcv & 0xF) << 28
}

fn expected(condition: Condition, cpsr: u32) -> bool {
    let n = cpsr & CPSR_N != 0;
    let z = cpsr & CPSR_Z != 0;
    let c = cpsr & CPSR_C != 0;
    let v = cpsr & CPSR_V != 0;
    match condition {
        Condition::Eq => z,
        Condition::Ne => !z,
        Condition::Cs => c,
        Condition::Cc => !c,
        Condition::Mi => n,
        Condition::Pl => !n,
        Condition::Vs => v,
        Condition::Vc => !v,
        Condition::Hi => c && !z,
        Condition::Ls => !c || z,
        Condition::Ge => n == v,
        Condition::Lt => n != v,
        Condition::Gt => !z && n == v,
        Condition::Le => z || n != v,
        Condition::Al => true,
        Condition::Nv => false,
    }
}

#[test]
fn condition_truth_table_covers_every_flag_combination() {
    for condition in Condition::ALL {
        for nzcv in 0..16 {
            let cpsr = flags(nzcv) | 0x1F;
            assert_eq!(
                condition.passed(cpsr),
                expected(condition, cpsr),
                "{condition:?} with NZCV={nzcv:04b}"
            );
            let word = (condition.as_u4() << 28) | 0x01A0_0000;
            assert_eq!(
                trace_core::condition_passed(word, cpsr),
                expected(condition, cpsr)
            );
        }
    }
}

#[test]
fn always_ignores_flags() {
    for nzcv in 0..16 {
        assert!(Condition::Al.passed(flags(nzcv)));
    }
}

#[rstest]
#[case(0xE356_0000, &["CMP", "R6", "#0"])]
#[case(0xE285_5001, &["ADD", "R5", "R5", "#1"])]
#[case(0xE1B0_1FA1, &["MOVS", "R1", "R1", "LSR #31"])]
#[case(0xE12F_FF1E, &["BX", "LR"])]
fn arm_disassembly_fixtures(#[case] word: u32, #[case] parts: &[&str]) {
    let disassembly = disassemble(0x0200_0000, 0x1F, word);
    assert_eq!(disassembly.parts(), parts);
}

#[rstest]
#[case(0xE25E_F004, 0, InstructionType::Rti)]
#[case(0xE12F_FF1E, 0x1F, InstructionType::Ret)]
#[case(0xEB00_0010, 0x1F, InstructionType::Call)]
#[case(0xEA00_0010, 0x1F, InstructionType::Jmp)]
#[case(0x0A00_0010, 0x1F, InstructionType::Jcc)]
#[case(0xEF00_0005, 0x1F, InstructionType::Syscall)]
#[case(0xE1A0_0000, 0x1F, InstructionType::Other)]
#[case(0x012F_FF30, 0x1F, InstructionType::Other)]
#[case(0x4770, 0x1F | CPSR_T, InstructionType::Ret)]
#[case(0xDF05, 0x1F | CPSR_T, InstructionType::Syscall)]
fn classification_fixtures(#[case] word: u32, #[case] cpsr: u32, #[case] kind: InstructionType) {
    assert_eq!(classify(word, cpsr), kind);
}

#[rstest]
#[case(0xFFFF, "{R0-R12,SP,LR,PC}")]
#[case(1 << 13, "{SP}")]
#[case(0b0000_0111_1111_1110, "{R1-R10}")]
fn register_list_fixtures(#[case] mask: u16, #[case] rendered: &str) {
    assert_eq!(format_register_list(mask), rendered);
}

#[rstest]
#[case(0xE82D_500F, false, false)]
#[case(0xE9F1_7FFF, true, false)]
#[case(0xE881_7FFF, false, true)]
#[case(0xE9E0_7FFC, false, true)]
fn scheduler_signature_fixtures(#[case] word: u32, #[case] switch: bool, #[case] save: bool) {
    let signatures = SchedulerSignatures::default();
    let state = CpuState::full([0; 16], IRQ, 0, word, 0, 0);
    assert_eq!(is_context_switch(&state, &signatures), switch);
    assert_eq!(is_context_save(&state, &signatures), save);
}

#[test]
fn one_register_delta_reads_through_zero_parent() {
    let parent = std::sync::Arc::new(CpuState::zero());
    let state = CpuState::delta(parent, 1 << 5, vec![0x1234], 0, 0xE1A0_0000, 1);
    assert_eq!(state.gpr(trace_core::Register::R5), 0x1234);
    assert_eq!(state.gpr(trace_core::Register::R0), 0);
    assert_eq!(state.cpsr(), 0);
}

proptest! {
    #[test]
    fn property_classify_is_total_in_every_mode(
        word in any::<u32>(),
        mode in prop::sample::select(MODES.to_vec()),
        nzcv in 0_u32..16,
        thumb in any::<bool>(),
    ) {
        let cpsr = flags(nzcv) | mode | if thumb { CPSR_T } else { 0 };
        let kind = classify(word, cpsr);
        prop_assert!(InstructionType::ALL.contains(&kind));
    }

    #[test]
    fn property_disassemble_is_pure(pc in any::<u32>(), cpsr in any::<u32>(), word in any::<u32>()) {
        let first = disassemble(pc, cpsr, word);
        let second = disassemble(pc, cpsr, word);
        prop_assert_eq!(first.parts(), second.parts());
        prop_assert_eq!(first.to_string(), second.to_string());
    }

    #[test]
    fn property_register_lists_are_braced(mask in any::<u16>()) {
        let rendered = format_register_list(mask);
        prop_assert!(rendered.starts_with('{'), "assertion failed: rendered.starts_with('{{')");
        prop_assert!(rendered.ends_with('}'), "assertion failed: rendered.ends_with('}}')");
        prop_assert_eq!(rendered == "{}", mask == 0);
    }
}
