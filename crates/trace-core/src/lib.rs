//! Decoder for ARMv5TE (ARM946E-S) execution traces.
//!
//! The crate classifies and disassembles ARM and Thumb instructions,
//! rebuilds delta-compressed CPU state from step records, and reads the
//! binary trace format into an ordered stream of [`Event`]s with inferred
//! thread identity.

/// Const-constructible instruction bit fields.
pub mod bits;
pub use bits::Field;

/// Condition codes and their evaluation against the CPSR.
pub mod condition;
pub use condition::{condition_passed, Condition};

/// Program status register layout, modes and flag rendering.
pub mod psr;
pub use psr::{flag_summary, is_thumb, ExecutionState, ProcessorMode};

/// General-purpose register identifiers and register-list formatting.
pub mod register;
pub use register::{format_register_list, Register, GENERAL_REGISTER_COUNT};

/// Immutable ARM and Thumb encoding views.
pub mod encoding;

/// Control-flow classification of instructions.
pub mod decoder;
pub use decoder::{classify, classify_arm, classify_thumb, InstructionType};

/// ARM and Thumb disassembler.
pub mod disasm;
pub use disasm::{disassemble, disassemble_arm, disassemble_thumb, Disassembly};

/// ARM9 memory map and access descriptors.
pub mod memory;
pub use memory::{
    decode_memory_region, AccessKind, AccessSize, MemoryRegion, Protection, RegionDescriptor,
    MEMORY_MAP,
};

/// Delta-compressed CPU state chain.
pub mod state;
pub use state::{CpuState, NodeKind, StateSnapshot};

/// Little-endian record framing and trace encoder.
pub mod wire;
pub use wire::{RecordTag, StepRecord, TraceWriter, WireReader};

/// Device catalog and geometry-engine commands.
pub mod device;
pub use device::{
    Arm9Devices, Device, DeviceCatalog, DeviceDefinition, DeviceInfo, DeviceKind,
    GeometryCommand, RegisterInfo, RegisterSpec,
};

/// Trace events.
pub mod event;
pub use event::{
    ContextSwitchEvent, DeviceRegisterEvent, Event, GeometryEvent, InterruptEvent,
    MemoryAccessEvent, MemoryDumpEvent, StepEvent,
};

/// Reader configuration.
pub mod config;
pub use config::{
    ConfigError, MaskPattern, ReaderConfig, SchedulerSignatures, DEFAULT_FULL_STATE_INTERVAL,
};

/// Scheduler signature matching and thread identity.
pub mod scheduler;
pub use scheduler::{
    is_context_save, is_context_switch, scheduler_op, thread_handle, SchedulerOp, ThreadMap,
};

/// Trace decoding errors.
pub mod error;
pub use error::TraceError;

/// Trace event reader.
pub mod reader;
pub use reader::TraceReader;

#[cfg(test)]
use proptest as _;
#[cfg(test)]
use rstest as _;
