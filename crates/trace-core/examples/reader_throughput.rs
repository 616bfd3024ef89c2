//! Throughput harness for the trace reader.
//!
//! Builds synthetic traces in memory and measures how fast they decode.
//!
//! ## Usage
//!
//! ```sh
//! cargo run -p trace-core --release --example reader_throughput
//! ```
//!
//! ## Workloads
//!
//! - `steps`: single-register deltas only
//! - `mixed`: deltas interleaved with memory and device accesses
//! - `render`: `steps` plus classification and disassembly of every step

#![allow(clippy::pedantic)]

use proptest as _;
use rstest as _;
#[cfg(feature = "serde")]
use serde as _;
use thiserror as _;
use tracing as _;

use std::time::{Duration, Instant};

use trace_core::{AccessKind, AccessSize, Event, StepRecord, TraceReader, TraceWriter};

const STEPS: u64 = 1_000_000;
const USR: u32 = 0x6000_0010;

/// ARM words cycled through by the synthetic program.
const PROGRAM: [u32; 6] = [
    0xE3A0_0001, // MOV R0, #1
    0xE280_0001, // ADD R0, R0, #1
    0xE590_1004, // LDR R1, [R0, #4]
    0xE350_000A, // CMP R0, #10
    0x1AFF_FFFB, // BNE
    0xE12F_FF1E, // BX LR
];

fn build_trace(with_accesses: bool) -> Vec<u8> {
    let mut writer = TraceWriter::new(Vec::new());
    let mut pc = 0x0200_0008_u32;
    for step in 0..STEPS {
        let code = PROGRAM[(step % PROGRAM.len() as u64) as usize];
        let record = if step == 0 {
            StepRecord {
                cpsr: Some(USR),
                mask: 0xFFFF,
                code,
                step,
                values: (0..16).map(|r| if r == 15 { pc } else { r }).collect(),
            }
        } else {
            StepRecord {
                cpsr: None,
                mask: 0x8001,
                code,
                step,
                values: vec![step as u32, pc],
            }
        };
        writer.step(&record).expect("in-memory write");
        if with_accesses && step % 4 == 0 {
            writer
                .access(AccessKind::Read, AccessSize::Word, 0x0200_1000, step as u32)
                .expect("in-memory write");
            writer
                .access(AccessKind::Write, AccessSize::Halfword, 0x0400_0000, 0x0001)
                .expect("in-memory write");
        }
        pc = pc.wrapping_add(4);
    }
    writer.into_inner()
}

#[derive(Debug, Clone, Copy)]
struct BenchmarkResult {
    name: &'static str,
    events: u64,
    bytes: usize,
    elapsed: Duration,
}

fn run(name: &'static str, trace: &[u8], render: bool) -> BenchmarkResult {
    let start = Instant::now();
    let mut events = 0u64;
    let mut rendered = 0usize;
    for event in TraceReader::new(trace) {
        let event = event.expect("synthetic trace decodes");
        if render {
            if let Event::Step(step) = &event {
                rendered += step.classification().label().len();
                rendered += step.disassembly().parts().len();
            }
        }
        events += 1;
    }
    std::hint::black_box(rendered);
    BenchmarkResult {
        name,
        events,
        bytes: trace.len(),
        elapsed: start.elapsed(),
    }
}

fn format_number(n: f64) -> String {
    if n >= 1_000_000.0 {
        format!("{:.2}M", n / 1_000_000.0)
    } else if n >= 1_000.0 {
        format!("{:.2}K", n / 1_000.0)
    } else {
        format!("{:.2}", n)
    }
}

fn main() {
    let plain = build_trace(false);
    let mixed = build_trace(true);

    let results = [
        run("steps", &plain, false),
        run("mixed", &mixed, false),
        run("render", &plain, true),
    ];

    println!(
        "{:10} {:>12} {:>12} {:>12}",
        "workload", "events", "events/sec", "MB/sec"
    );
    for result in results {
        let secs = result.elapsed.as_secs_f64();
        println!(
            "{:10} {:>12} {:>12} {:>12.1}",
            result.name,
            result.events,
            format_number(result.events as f64 / secs),
            result.bytes as f64 / secs / 1_000_000.0
        );
    }
}
