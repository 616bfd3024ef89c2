//! CLI entry point for the ARM9 trace dumper binary.

use std::env;
use std::ffi::OsString;
use std::fs::File;
use std::io::{self, BufReader, BufWriter, Read, Write};
use std::path::PathBuf;

use serde_json::json;
#[cfg(test)]
use tempfile as _;
use trace_core::psr::CPSR_T;
use trace_core::{
    classify, disassemble, is_thumb, Event, ExecutionState, ReaderConfig, TraceReader,
    DEFAULT_FULL_STATE_INTERVAL,
};
use tracing::{debug, info};
use tracing_subscriber::EnvFilter;

const USAGE_TEXT: &str = "\
Usage: trace-dump <command> [options]

Commands:
  dump   <trace> [options]     Decode a trace file and print its events
  disasm <word>... [options]   Classify and disassemble instruction words

Dump options:
  -n, --limit <count>    Stop after printing <count> events
  -s, --steps-only       Print step events only
      --state            Print the CPU state after every step
      --json             Print one JSON object per event
      --no-devices       Report device-register accesses as memory accesses
      --no-threads       Disable context-switch inference
      --interval <n>     Steps between full-state snapshots (default: 5000)
  -v, --verbose          Log reader diagnostics to stderr

Disasm options:
  -t, --thumb            Decode Thumb halfwords
  -a, --address <hex>    Address of the first word (default: 0)
      --cpsr <hex>       CPSR used for condition evaluation (default: 0x1f)
      --json             Print one JSON object per word

  -h, --help             Show this help message

Use `-` as <trace> to read from standard input. RUST_LOG overrides the
log filter.

Examples:
  trace-dump dump boot.trace --limit 100
  trace-dump dump boot.trace --steps-only --json
  trace-dump disasm E3560000 E2855001
  trace-dump disasm 0x4770 --thumb --address 0x02000100
";

/// CPSR used by `disasm` when none is given: System mode, flags clear.
const DEFAULT_CPSR: u32 = 0x1F;

#[derive(Debug, PartialEq, Eq)]
enum Command {
    Dump(DumpArgs),
    Disasm(DisasmArgs),
}

#[derive(Debug, PartialEq, Eq)]
struct DumpArgs {
    input: PathBuf,
    limit: Option<u64>,
    steps_only: bool,
    state: bool,
    json: bool,
    map_devices: bool,
    infer_threads: bool,
    interval: u32,
    verbose: bool,
}

#[derive(Debug, PartialEq, Eq)]
struct DisasmArgs {
    words: Vec<u32>,
    thumb: bool,
    address: u32,
    cpsr: Option<u32>,
    json: bool,
}

#[derive(Debug)]
enum ParseResult {
    Command(Command),
    Help,
}

fn parse_args(mut args: impl Iterator<Item = OsString>) -> Result<ParseResult, String> {
    let first = args.next().ok_or_else(|| "missing command".to_string())?;

    if first == "--help" || first == "-h" {
        return Ok(ParseResult::Help);
    }

    let command_str = first.to_string_lossy().to_string();

    match command_str.as_str() {
        "dump" => parse_dump_args(args)
            .map(Command::Dump)
            .map(ParseResult::Command),
        "disasm" => parse_disasm_args(args)
            .map(Command::Disasm)
            .map(ParseResult::Command),
        other => Err(format!("unknown command: {other}")),
    }
}

fn option_value(
    args: &mut impl Iterator<Item = OsString>,
    name: &OsString,
) -> Result<String, String> {
    args.next()
        .map(|value| value.to_string_lossy().to_string())
        .ok_or_else(|| format!("missing value for {}", name.to_string_lossy()))
}

#[allow(clippy::while_let_on_iterator)]
fn parse_dump_args(mut args: impl Iterator<Item = OsString>) -> Result<DumpArgs, String> {
    let mut input: Option<PathBuf> = None;
    let mut dump = DumpArgs {
        input: PathBuf::new(),
        limit: None,
        steps_only: false,
        state: false,
        json: false,
        map_devices: true,
        infer_threads: true,
        interval: DEFAULT_FULL_STATE_INTERVAL,
        verbose: false,
    };

    while let Some(arg) = args.next() {
        if arg == "--help" || arg == "-h" {
            return Err(USAGE_TEXT.to_string());
        }

        if arg == "-n" || arg == "--limit" {
            let value = option_value(&mut args, &arg)?;
            let limit = value
                .parse::<u64>()
                .map_err(|_| format!("invalid event count: {value}"))?;
            dump.limit = Some(limit);
            continue;
        }

        if arg == "--interval" {
            let value = option_value(&mut args, &arg)?;
            dump.interval = value
                .parse::<u32>()
                .ok()
                .filter(|interval| *interval > 0)
                .ok_or_else(|| format!("invalid full-state interval: {value}"))?;
            continue;
        }

        let flag = arg.to_string_lossy().to_string();
        match flag.as_str() {
            "-s" | "--steps-only" => dump.steps_only = true,
            "--state" => dump.state = true,
            "--json" => dump.json = true,
            "--no-devices" => dump.map_devices = false,
            "--no-threads" => dump.infer_threads = false,
            "-v" | "--verbose" => dump.verbose = true,
            other if other.starts_with('-') && other != "-" => {
                return Err(format!("unknown option: {other}"));
            }
            _ => {
                if input.is_some() {
                    return Err("multiple input paths provided".to_string());
                }
                input = Some(PathBuf::from(arg));
            }
        }
    }

    dump.input = input.ok_or_else(|| "missing trace path".to_string())?;
    Ok(dump)
}

#[allow(clippy::while_let_on_iterator)]
fn parse_disasm_args(mut args: impl Iterator<Item = OsString>) -> Result<DisasmArgs, String> {
    let mut disasm = DisasmArgs {
        words: Vec::new(),
        thumb: false,
        address: 0,
        cpsr: None,
        json: false,
    };

    while let Some(arg) = args.next() {
        if arg == "--help" || arg == "-h" {
            return Err(USAGE_TEXT.to_string());
        }

        if arg == "-a" || arg == "--address" {
            disasm.address = parse_hex(&option_value(&mut args, &arg)?)?;
            continue;
        }

        if arg == "--cpsr" {
            disasm.cpsr = Some(parse_hex(&option_value(&mut args, &arg)?)?);
            continue;
        }

        match arg.to_string_lossy().as_ref() {
            "-t" | "--thumb" => disasm.thumb = true,
            "--json" => disasm.json = true,
            other if other.starts_with('-') => {
                return Err(format!("unknown option: {other}"));
            }
            word => disasm.words.push(parse_hex(word)?),
        }
    }

    if disasm.words.is_empty() {
        return Err("missing instruction word".to_string());
    }
    if disasm.thumb {
        if let Some(word) = disasm.words.iter().find(|word| **word > 0xFFFF) {
            return Err(format!("Thumb instruction wider than 16 bits: 0x{word:x}"));
        }
    }
    Ok(disasm)
}

fn parse_hex(text: &str) -> Result<u32, String> {
    let digits = text
        .strip_prefix("0x")
        .or_else(|| text.strip_prefix("0X"))
        .unwrap_or(text)
        .replace('_', "");
    u32::from_str_radix(&digits, 16).map_err(|_| format!("invalid hex value: {text}"))
}

fn init_logging(verbose: bool) {
    let default = if verbose { "trace_core=debug,info" } else { "warn" };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default));
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(io::stderr)
        .with_target(false)
        .try_init();
}

fn open_input(args: &DumpArgs) -> io::Result<Box<dyn Read>> {
    if args.input.as_os_str() == "-" {
        return Ok(Box::new(io::stdin().lock()));
    }
    Ok(Box::new(BufReader::new(File::open(&args.input)?)))
}

fn run_dump(args: &DumpArgs) -> Result<(), i32> {
    init_logging(args.verbose);

    let input = open_input(args).map_err(|e| {
        eprintln!("error: failed to open {}: {e}", args.input.display());
        1
    })?;
    let config = ReaderConfig::default()
        .with_full_state_interval(args.interval)
        .with_map_devices(args.map_devices)
        .with_infer_threads(args.infer_threads);
    debug!(?config, "reader configuration");

    let mut reader = TraceReader::with_config(input, config).map_err(|e| {
        eprintln!("error: {e}");
        1
    })?;

    let stdout = io::stdout();
    let mut out = BufWriter::new(stdout.lock());
    let mut printed: u64 = 0;
    let mut failure = None;

    for event in reader.by_ref() {
        if args.limit.is_some_and(|limit| printed >= limit) {
            break;
        }
        let event = match event {
            Ok(event) => event,
            Err(e) => {
                failure = Some(e);
                break;
            }
        };
        if args.steps_only && event.as_step().is_none() {
            continue;
        }
        if let Err(e) = write_event(&mut out, &event, args) {
            eprintln!("error: failed to write output: {e}");
            return Err(1);
        }
        printed += 1;
    }

    if let Err(e) = out.flush() {
        eprintln!("error: failed to write output: {e}");
        return Err(1);
    }
    info!(
        events = printed,
        offset = reader.offset(),
        threads = reader.threads().len(),
        "trace decoded"
    );

    match failure {
        Some(e) => {
            eprintln!("error: {e}");
            Err(1)
        }
        None => Ok(()),
    }
}

fn write_event(out: &mut impl Write, event: &Event, args: &DumpArgs) -> io::Result<()> {
    if args.json {
        serde_json::to_writer(&mut *out, event)?;
        return writeln!(out);
    }

    match event {
        Event::MemoryMap(_) | Event::DeviceDefinition(_) => writeln!(out, "{event}")?,
        _ => writeln!(out, "[{}] {event}", event.tid())?,
    }
    if args.state {
        if let Some(step) = event.as_step() {
            writeln!(out, "{}", step.state)?;
        }
    }
    Ok(())
}

fn run_disasm(args: &DisasmArgs) -> Result<(), i32> {
    let stdout = io::stdout();
    let mut out = BufWriter::new(stdout.lock());
    write_disassembly(&mut out, args)
        .and_then(|()| out.flush())
        .map_err(|e| {
            eprintln!("error: failed to write output: {e}");
            1
        })
}

fn write_disassembly(out: &mut impl Write, args: &DisasmArgs) -> io::Result<()> {
    let mut cpsr = args.cpsr.unwrap_or(DEFAULT_CPSR);
    if args.thumb {
        cpsr |= CPSR_T;
    }
    let state = ExecutionState::of(cpsr);
    let (size, bias) = if is_thumb(cpsr) { (2, 4) } else { (4, 8) };

    let mut address = args.address;
    for &word in &args.words {
        let kind = classify(word, cpsr);
        let disassembly = disassemble(address.wrapping_add(bias), cpsr, word);
        if args.json {
            let record = json!({
                "address": address,
                "word": word,
                "state": state.name(),
                "classification": kind,
                "parts": disassembly.parts(),
            });
            serde_json::to_writer(&mut *out, &record)?;
            writeln!(out)?;
        } else if size == 2 {
            writeln!(out, "{address:08x}: {word:04x}     {:<12} {disassembly}", kind.label())?;
        } else {
            writeln!(out, "{address:08x}: {word:08x} {:<12} {disassembly}", kind.label())?;
        }
        address = address.wrapping_add(size);
    }
    Ok(())
}

fn main() {
    let exit_code = match parse_args(env::args_os().skip(1)) {
        Ok(ParseResult::Help) => {
            println!("{USAGE_TEXT}");
            0
        }
        Ok(ParseResult::Command(Command::Dump(args))) => match run_dump(&args) {
            Ok(()) => 0,
            Err(code) => code,
        },
        Ok(ParseResult::Command(Command::Disasm(args))) => match run_disasm(&args) {
            Ok(()) => 0,
            Err(code) => code,
        },
        Err(error) => {
            if error.starts_with("Usage:") {
                println!("{error}");
            } else {
                eprintln!("error: {error}");
                eprintln!("{USAGE_TEXT}");
            }
            1
        }
    };

    std::process::exit(exit_code);
}
