//! Events produced by the trace reader.

use std::fmt;
use std::sync::Arc;

use crate::decoder::{classify, InstructionType};
use crate::device::{Device, DeviceDefinition, GeometryCommand};
use crate::disasm::{disassemble, Disassembly};
use crate::memory::{AccessKind, AccessSize, RegionDescriptor};
use crate::scheduler::SchedulerOp;
use crate::state::CpuState;

/// One retired instruction.
#[derive(Debug, Clone)]
pub struct StepEvent {
    /// Register state after the step.
    pub state: Arc<CpuState>,
    /// Classification forced by the reader's return inference.
    pub type_override: Option<InstructionType>,
    /// Scheduler role detected for this step.
    pub scheduler: Option<SchedulerOp>,
}

impl StepEvent {
    /// Wraps a state with no override.
    #[must_use]
    pub const fn new(state: Arc<CpuState>) -> Self {
        Self {
            state,
            type_override: None,
            scheduler: None,
        }
    }

    /// Control-flow classification, honouring the override.
    #[must_use]
    pub fn classification(&self) -> InstructionType {
        self.type_override
            .unwrap_or_else(|| classify(self.state.code(), self.state.cpsr()))
    }

    /// Disassembly of the executed instruction.
    #[must_use]
    pub fn disassembly(&self) -> Disassembly {
        disassemble(self.state.pc(), self.state.cpsr(), self.state.code())
    }

    /// Instruction bytes as fetched.
    #[must_use]
    pub fn machine_code(&self) -> Vec<u8> {
        self.state.machine_code()
    }

    /// Program counter.
    #[must_use]
    pub fn pc(&self) -> u32 {
        self.state.pc()
    }

    /// Step index.
    #[must_use]
    pub fn step(&self) -> u64 {
        self.state.step()
    }
}

/// Plain memory read or write.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MemoryAccessEvent {
    /// Bus address.
    pub address: u32,
    /// Value transferred, zero-extended.
    pub value: u32,
    /// Access width.
    pub size: AccessSize,
    /// Direction.
    pub kind: AccessKind,
    /// Thread id.
    pub tid: u32,
}

/// Block of memory contents.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MemoryDumpEvent {
    /// Start address.
    pub address: u32,
    /// Bytes starting at `address`.
    pub data: Vec<u8>,
    /// Thread id.
    pub tid: u32,
}

/// Interrupt taken after a step.
#[derive(Debug, Clone)]
pub struct InterruptEvent {
    /// Step preceding the interrupt, `None` before the first step.
    pub step: Option<StepEvent>,
    /// Thread id.
    pub tid: u32,
}

/// Access to a known device register.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DeviceRegisterEvent {
    /// Owning device.
    pub device: Device,
    /// Register id within the device.
    pub register: u32,
    /// Register name.
    pub name: &'static str,
    /// Bus address.
    pub address: u32,
    /// Value transferred.
    pub value: u32,
    /// Direction.
    pub kind: AccessKind,
    /// Thread id.
    pub tid: u32,
}

/// Geometry-engine command.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct GeometryEvent {
    /// Decoded command.
    pub command: GeometryCommand,
    /// Thread id.
    pub tid: u32,
}

/// Inferred thread switch.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ContextSwitchEvent {
    /// Id of the thread about to run.
    pub thread: u32,
    /// Stack pointer identifying that thread.
    pub handle: u32,
    /// Switch was triggered from IRQ mode.
    pub preempt: bool,
    /// Thread id of the switching thread.
    pub tid: u32,
}

/// Decoded trace event.
#[derive(Debug, Clone)]
pub enum Event {
    /// Memory region announcement.
    MemoryMap(RegionDescriptor),
    /// Device and register announcement.
    DeviceDefinition(DeviceDefinition),
    /// Retired instruction.
    Step(StepEvent),
    /// Memory read or write.
    MemoryAccess(MemoryAccessEvent),
    /// Memory contents.
    MemoryDump(MemoryDumpEvent),
    /// Interrupt entry.
    Interrupt(InterruptEvent),
    /// Device register access.
    DeviceRegister(DeviceRegisterEvent),
    /// Geometry-engine command.
    Geometry(GeometryEvent),
    /// Thread switch.
    ContextSwitch(ContextSwitchEvent),
}

impl Event {
    /// Thread id the event is attributed to.
    #[must_use]
    pub fn tid(&self) -> u32 {
        match self {
            Self::MemoryMap(_) | Self::DeviceDefinition(_) => 0,
            Self::Step(step) => step.state.tid(),
            Self::MemoryAccess(access) => access.tid,
            Self::MemoryDump(dump) => dump.tid,
            Self::Interrupt(interrupt) => interrupt.tid,
            Self::DeviceRegister(access) => access.tid,
            Self::Geometry(geometry) => geometry.tid,
            Self::ContextSwitch(switch) => switch.tid,
        }
    }

    /// Short lowercase name of the variant.
    #[must_use]
    pub const fn kind(&self) -> &'static str {
        match self {
            Self::MemoryMap(_) => "mmap",
            Self::DeviceDefinition(_) => "devices",
            Self::Step(_) => "step",
            Self::MemoryAccess(_) => "memory",
            Self::MemoryDump(_) => "dump",
            Self::Interrupt(_) => "interrupt",
            Self::DeviceRegister(_) => "device",
            Self::Geometry(_) => "geometry",
            Self::ContextSwitch(_) => "context-switch",
        }
    }

    /// Step payload, if this is a step.
    #[must_use]
    pub const fn as_step(&self) -> Option<&StepEvent> {
        match self {
            Self::Step(step) => Some(step),
            _ => None,
        }
    }
}

impl fmt::Display for Event {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::MemoryMap(region) => write!(
                f,
                "mmap 0x{:08x}-0x{:08x} {} {}",
                region.start, region.end, region.protection, region.region
            ),
            Self::DeviceDefinition(definition) => write!(
                f,
                "devices: {} devices, {} registers",
                definition.devices.len(),
                definition.register_count()
            ),
            Self::Step(step) => write!(
                f,
                "{:08x} {:<12} {}",
                step.pc(),
                step.classification().label(),
                step.disassembly()
            ),
            Self::MemoryAccess(access) => write!(
                f,
                "{} {}-bit [0x{:08x}] = 0x{:x}",
                access.kind,
                access.size.bits(),
                access.address,
                access.value
            ),
            Self::MemoryDump(dump) => write!(
                f,
                "dump [0x{:08x}] {} bytes",
                dump.address,
                dump.data.len()
            ),
            Self::Interrupt(_) => f.write_str("IRQ"),
            Self::DeviceRegister(access) => write!(
                f,
                "{} {} {} = 0x{:x}",
                access.device, access.kind, access.name, access.value
            ),
            Self::Geometry(geometry) => write!(f, "{}", geometry.command),
            Self::ContextSwitch(switch) => {
                write!(
                    f,
                    "Context switch: execute thread {} [0x{:x}",
                    switch.thread, switch.handle
                )?;
                if switch.preempt {
                    f.write_str(", IRQ")?;
                }
                f.write_str("]")
            }
        }
    }
}

#[cfg(feature = "serde")]
mod serialize {
    use serde::{Serialize, Serializer};

    use super::{Event, StepEvent};
    use crate::decoder::InstructionType;
    use crate::device::{DeviceDefinition, GeometryCommand};
    use crate::memory::{AccessKind, RegionDescriptor};
    use crate::scheduler::SchedulerOp;
    use crate::state::StateSnapshot;

    #[derive(Serialize)]
    struct StepRecord {
        classification: InstructionType,
        disassembly: String,
        machine_code: Vec<u8>,
        scheduler: Option<SchedulerOp>,
        state: StateSnapshot,
    }

    impl From<&StepEvent> for StepRecord {
        fn from(step: &StepEvent) -> Self {
            Self {
                classification: step.classification(),
                disassembly: step.disassembly().to_string(),
                machine_code: step.machine_code(),
                scheduler: step.scheduler,
                state: step.state.snapshot(),
            }
        }
    }

    #[derive(Serialize)]
    #[serde(tag = "type", rename_all = "snake_case")]
    enum EventRecord<'a> {
        MemoryMap {
            region: &'a RegionDescriptor,
        },
        DeviceDefinition {
            definition: &'a DeviceDefinition,
        },
        Step {
            tid: u32,
            step: StepRecord,
        },
        MemoryAccess {
            tid: u32,
            address: u32,
            value: u32,
            bits: u32,
            kind: AccessKind,
        },
        MemoryDump {
            tid: u32,
            address: u32,
            data: &'a [u8],
        },
        Interrupt {
            tid: u32,
            step: Option<u64>,
        },
        DeviceRegister {
            tid: u32,
            device: u32,
            register: u32,
            name: &'a str,
            address: u32,
            value: u32,
            kind: AccessKind,
        },
        Geometry {
            tid: u32,
            command: GeometryCommand,
            message: String,
        },
        ContextSwitch {
            tid: u32,
            thread: u32,
            handle: u32,
            preempt: bool,
        },
    }

    impl Serialize for Event {
        fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
            let tid = self.tid();
            let record = match self {
                Self::MemoryMap(region) => EventRecord::MemoryMap { region },
                Self::DeviceDefinition(definition) => EventRecord::DeviceDefinition { definition },
                Self::Step(step) => EventRecord::Step {
                    tid,
                    step: StepRecord::from(step),
                },
                Self::MemoryAccess(access) => EventRecord::MemoryAccess {
                    tid,
                    address: access.address,
                    value: access.value,
                    bits: access.size.bits(),
                    kind: access.kind,
                },
                Self::MemoryDump(dump) => EventRecord::MemoryDump {
                    tid,
                    address: dump.address,
                    data: &dump.data,
                },
                Self::Interrupt(interrupt) => EventRecord::Interrupt {
                    tid,
                    step: interrupt.step.as_ref().map(StepEvent::step),
                },
                Self::DeviceRegister(access) => EventRecord::DeviceRegister {
                    tid,
                    device: access.device.id(),
                    register: access.register,
                    name: access.name,
                    address: access.address,
                    value: access.value,
                    kind: access.kind,
                },
                Self::Geometry(geometry) => EventRecord::Geometry {
                    tid,
                    command: geometry.command,
                    message: geometry.command.to_string(),
                },
                Self::ContextSwitch(switch) => EventRecord::ContextSwitch {
                    tid,
                    thread: switch.thread,
                    handle: switch.handle,
                    preempt: switch.preempt,
                },
            };
            record.serialize(serializer)
        }
    }
}
