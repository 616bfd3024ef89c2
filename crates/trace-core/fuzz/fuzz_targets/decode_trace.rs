#![no_main]

use libfuzzer_sys::fuzz_target;
use trace_core::psr::CPSR_T;
use trace_core::{classify, disassemble, format_register_list, TraceReader};

fuzz_target!(|data: &[u8]| {
    if data.len() >= 8 {
        let word = u32::from_le_bytes([data[0], data[1], data[2], data[3]]);
        let pc = u32::from_le_bytes([data[4], data[5], data[6], data[7]]);
        for cpsr in [0x1F, 0x1F | CPSR_T] {
            let _ = classify(word, cpsr);
            let _ = disassemble(pc, cpsr, word).to_string();
        }
        let _ = format_register_list(word as u16);
    }

    for event in TraceReader::new(data) {
        match event {
            Ok(event) => {
                let _ = event.to_string();
            }
            Err(_) => break,
        }
    }
});
