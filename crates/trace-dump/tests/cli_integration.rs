//! Integration tests for the trace-dump CLI.

use std::fs;
use std::path::{Path, PathBuf};
use std::process::Command;

use trace_core::{AccessKind, AccessSize, StepRecord, TraceWriter};
use tracing as _;
use tracing_subscriber as _;

const USR: u32 = 0x6000_0010;

fn binary_path() -> PathBuf {
    PathBuf::from(env!("CARGO_BIN_EXE_trace-dump"))
}

fn create_trace(dir: &Path, name: &str, build: impl FnOnce(&mut TraceWriter<Vec<u8>>)) -> PathBuf {
    let mut writer = TraceWriter::new(Vec::new());
    build(&mut writer);
    let path = dir.join(name);
    fs::write(&path, writer.into_inner()).unwrap();
    path
}

fn sample_trace(writer: &mut TraceWriter<Vec<u8>>) {
    writer
        .step(&StepRecord {
            cpsr: Some(USR),
            mask: 0x8000,
            code: 0xE356_0000,
            step: 0,
            values: vec![0x0200_0008],
        })
        .unwrap();
    writer
        .access(AccessKind::Write, AccessSize::Word, 0x0400_0000, 0x0001_0000)
        .unwrap();
    writer
        .step(&StepRecord {
            cpsr: None,
            mask: 0x8000,
            code: 0xE12F_FF1E,
            step: 1,
            values: vec![0x0200_000C],
        })
        .unwrap();
}

fn stdout_lines(output: &std::process::Output) -> Vec<String> {
    String::from_utf8(output.stdout.clone())
        .unwrap()
        .lines()
        .map(str::to_string)
        .collect()
}

#[test]
fn dump_prints_prologue_and_records() {
    let temp_dir = tempfile::tempdir().unwrap();
    let trace = create_trace(temp_dir.path(), "sample.trace", sample_trace);

    let output = Command::new(binary_path())
        .args(["dump", trace.to_str().unwrap()])
        .output()
        .expect("failed to run trace-dump");

    assert!(output.status.success());
    let lines = stdout_lines(&output);
    assert_eq!(lines.len(), 19);
    assert!(lines[0].starts_with("mmap 0x01000000-"));
    assert!(lines[15].starts_with("devices: 6 devices"));
    assert_eq!(lines[16], "[0] 02000008 OTHER        CMP R6, #0");
    assert!(lines[17].contains("DISPCNT"));
    assert_eq!(lines[18], "[0] 0200000c RET          BX LR");
}

#[test]
fn dump_steps_only_with_limit() {
    let temp_dir = tempfile::tempdir().unwrap();
    let trace = create_trace(temp_dir.path(), "sample.trace", sample_trace);

    let output = Command::new(binary_path())
        .args(["dump", trace.to_str().unwrap(), "--steps-only", "-n", "1"])
        .output()
        .expect("failed to run trace-dump");

    assert!(output.status.success());
    assert_eq!(
        stdout_lines(&output),
        ["[0] 02000008 OTHER        CMP R6, #0"]
    );
}

#[test]
fn dump_json_emits_one_object_per_event() {
    let temp_dir = tempfile::tempdir().unwrap();
    let trace = create_trace(temp_dir.path(), "sample.trace", sample_trace);

    let output = Command::new(binary_path())
        .args(["dump", trace.to_str().unwrap(), "--json", "--no-devices"])
        .output()
        .expect("failed to run trace-dump");

    assert!(output.status.success());
    let records: Vec<serde_json::Value> = stdout_lines(&output)
        .iter()
        .map(|line| serde_json::from_str(line).unwrap())
        .collect();
    assert_eq!(records.len(), 19);
    assert_eq!(records[0]["type"], "memory_map");
    assert_eq!(records[15]["type"], "device_definition");
    assert_eq!(records[16]["type"], "step");
    assert_eq!(records[16]["step"]["disassembly"], "CMP R6, #0");
    assert_eq!(records[17]["type"], "memory_access");
    assert_eq!(records[17]["address"], 0x0400_0000);
    assert_eq!(records[18]["step"]["classification"], "Ret");
}

#[test]
fn dump_reports_corruption_after_partial_output() {
    let temp_dir = tempfile::tempdir().unwrap();
    let trace = create_trace(temp_dir.path(), "corrupt.trace", |writer| {
        sample_trace(writer);
        writer.raw_tag(0x0A).unwrap();
    });

    let output = Command::new(binary_path())
        .args(["dump", trace.to_str().unwrap(), "--steps-only"])
        .output()
        .expect("failed to run trace-dump");

    assert_eq!(output.status.code(), Some(1));
    assert_eq!(stdout_lines(&output).len(), 2);
    let stderr = String::from_utf8(output.stderr).unwrap();
    assert!(stderr.contains("unknown record tag 0x0a at offset 53"));
}

#[test]
fn dump_missing_file_fails() {
    let temp_dir = tempfile::tempdir().unwrap();
    let missing = temp_dir.path().join("missing.trace");

    let output = Command::new(binary_path())
        .args(["dump", missing.to_str().unwrap()])
        .output()
        .expect("failed to run trace-dump");

    assert_eq!(output.status.code(), Some(1));
    let stderr = String::from_utf8(output.stderr).unwrap();
    assert!(stderr.contains("failed to open"));
}

#[test]
fn disasm_prints_listing() {
    let output = Command::new(binary_path())
        .args(["disasm", "E3560000", "0xE2855001", "--address", "0x02000000"])
        .output()
        .expect("failed to run trace-dump");

    assert!(output.status.success());
    assert_eq!(
        stdout_lines(&output),
        [
            "02000000: e3560000 OTHER        CMP R6, #0",
            "02000004: e2855001 OTHER        ADD R5, R5, #1",
        ]
    );
}

#[test]
fn help_flag_prints_usage() {
    let output = Command::new(binary_path())
        .arg("--help")
        .output()
        .expect("failed to run trace-dump");

    assert!(output.status.success());
    let stdout = String::from_utf8(output.stdout).unwrap();
    assert!(stdout.contains("Usage: trace-dump"));
}

#[test]
fn unknown_command_fails() {
    let output = Command::new(binary_path())
        .arg("replay")
        .output()
        .expect("failed to run trace-dump");

    assert_eq!(output.status.code(), Some(1));
    let stderr = String::from_utf8(output.stderr).unwrap();
    assert!(stderr.contains("unknown command: replay"));
}
