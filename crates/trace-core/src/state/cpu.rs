//! Delta-compressed CPU state nodes.

use std::fmt;
use std::io::{self, Read};
use std::mem;
use std::sync::Arc;

use crate::condition::condition_passed;
use crate::psr::{flag_summary, is_thumb, ExecutionState, ProcessorMode};
use crate::register::{Register, GENERAL_REGISTER_COUNT};
use crate::wire::{WireReader, STEP_CONTROL_CPSR};

/// Shape of a state node, i.e. which registers it overrides.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Deserialize, serde::Serialize))]
pub enum NodeKind {
    /// Chain terminator with every register zero.
    Zero,
    /// All sixteen registers stored inline.
    Full,
    /// No register override.
    Null,
    /// `PC` only.
    Pc,
    /// One register other than `PC`.
    Register,
    /// One register other than `PC`, plus `PC`.
    RegisterPc,
    /// Arbitrary register mask.
    Masked,
}

#[derive(Debug)]
enum Node {
    Zero,
    Full {
        gpr: [u32; GENERAL_REGISTER_COUNT],
    },
    Null {
        parent: Arc<CpuState>,
    },
    Pc {
        parent: Arc<CpuState>,
        pc: u32,
    },
    Register {
        parent: Arc<CpuState>,
        reg: Register,
        value: u32,
    },
    RegisterPc {
        parent: Arc<CpuState>,
        reg: Register,
        value: u32,
        pc: u32,
    },
    Masked {
        parent: Arc<CpuState>,
        mask: u16,
        values: Box<[u32]>,
    },
}

impl Node {
    const fn kind(&self) -> NodeKind {
        match self {
            Self::Zero => NodeKind::Zero,
            Self::Full { .. } => NodeKind::Full,
            Self::Null { .. } => NodeKind::Null,
            Self::Pc { .. } => NodeKind::Pc,
            Self::Register { .. } => NodeKind::Register,
            Self::RegisterPc { .. } => NodeKind::RegisterPc,
            Self::Masked { .. } => NodeKind::Masked,
        }
    }

    const fn parent(&self) -> Option<&Arc<CpuState>> {
        match self {
            Self::Zero | Self::Full { .. } => None,
            Self::Null { parent }
            | Self::Pc { parent, .. }
            | Self::Register { parent, .. }
            | Self::RegisterPc { parent, .. }
            | Self::Masked { parent, .. } => Some(parent),
        }
    }

    /// Value of `reg` when this node overrides it.
    fn own(&self, reg: Register) -> Option<u32> {
        match self {
            Self::Zero => Some(0),
            Self::Full { gpr } => Some(gpr[reg.index()]),
            Self::Null { .. } => None,
            Self::Pc { pc, .. } => (reg == Register::Pc).then_some(*pc),
            Self::Register { reg: own, value, .. } => (reg == *own).then_some(*value),
            Self::RegisterPc {
                reg: own, value, pc, ..
            } => {
                if reg == Register::Pc {
                    Some(*pc)
                } else {
                    (reg == *own).then_some(*value)
                }
            }
            Self::Masked { mask, values, .. } => {
                let bit = reg.mask_bit();
                if mask & bit == 0 {
                    return None;
                }
                let slot = (mask & (bit - 1)).count_ones() as usize;
                values.get(slot).copied()
            }
        }
    }

    fn take_parent(&mut self) -> Option<Arc<CpuState>> {
        match mem::replace(self, Self::Zero) {
            Self::Zero | Self::Full { .. } => None,
            Self::Null { parent }
            | Self::Pc { parent, .. }
            | Self::Register { parent, .. }
            | Self::RegisterPc { parent, .. }
            | Self::Masked { parent, .. } => Some(parent),
        }
    }
}

/// Architectural ARM9 register state after one trace step.
///
/// Each node stores the status registers, the executed instruction word,
/// the step index and the owning thread id directly. General-purpose
/// registers are either stored inline (full and zero nodes) or inherited
/// from a shared parent with a small set of overrides. Nodes are immutable
/// once built, so holding an `Arc<CpuState>` keeps a consistent snapshot
/// alive regardless of what the reader does afterwards.
#[derive(Debug)]
pub struct CpuState {
    cpsr: u32,
    spsr: u32,
    code: u32,
    step: u64,
    tid: u32,
    node: Node,
}

impl CpuState {
    /// Chain terminator: all registers zero, thread 0.
    #[must_use]
    pub const fn zero() -> Self {
        Self {
            cpsr: 0,
            spsr: 0,
            code: 0,
            step: 0,
            tid: 0,
            node: Node::Zero,
        }
    }

    /// Builds a full-state node from explicit values.
    #[must_use]
    pub const fn full(
        gpr: [u32; GENERAL_REGISTER_COUNT],
        cpsr: u32,
        spsr: u32,
        code: u32,
        step: u64,
        tid: u32,
    ) -> Self {
        Self {
            cpsr,
            spsr,
            code,
            step,
            tid,
            node: Node::Full { gpr },
        }
    }

    /// Materializes `state` into a full node attributed to thread `tid`.
    #[must_use]
    pub fn full_copy(state: &Self, tid: u32) -> Self {
        Self::full(
            state.registers(),
            state.cpsr,
            state.spsr,
            state.code,
            state.step,
            tid,
        )
    }

    /// Reads one step-record body and builds the most compact node on top
    /// of `parent`.
    ///
    /// The record's CPSR is inherited from the parent when the control byte
    /// does not announce one. The SPSR is not carried by step records and
    /// is always zero; the thread id is inherited from the parent.
    ///
    /// # Errors
    ///
    /// Propagates read failures, including [`io::ErrorKind::UnexpectedEof`]
    /// for a truncated record.
    pub fn decode<R: Read>(parent: Arc<Self>, reader: &mut WireReader<R>) -> io::Result<Self> {
        let control = reader.read_u8()?;
        let mask = reader.read_u16()?;
        let code = reader.read_u32()?;
        let step = reader.read_u64()?;
        let cpsr = if control & STEP_CONTROL_CPSR != 0 {
            reader.read_u32()?
        } else {
            parent.cpsr
        };
        let values = (0..mask.count_ones())
            .map(|_| reader.read_u32())
            .collect::<io::Result<Vec<u32>>>()?;

        Ok(Self::delta(parent, mask, values, cpsr, code, step))
    }

    /// Builds a delta node overriding the registers in `mask` with `values`
    /// (ascending register order).
    ///
    /// Missing trailing values read as zero.
    #[must_use]
    pub fn delta(
        parent: Arc<Self>,
        mask: u16,
        values: Vec<u32>,
        cpsr: u32,
        code: u32,
        step: u64,
    ) -> Self {
        let tid = parent.tid;
        let first = values.first().copied().unwrap_or(0);
        let second = values.get(1).copied().unwrap_or(0);
        let pc_bit = Register::Pc.mask_bit();

        let node = match mask.count_ones() {
            0 => Node::Null { parent },
            1 if mask == pc_bit => Node::Pc {
                parent,
                pc: first,
            },
            1 => Node::Register {
                parent,
                reg: lowest_register(mask),
                value: first,
            },
            2 if mask & pc_bit != 0 => Node::RegisterPc {
                parent,
                reg: lowest_register(mask),
                value: first,
                pc: second,
            },
            _ => {
                let mut values = values;
                values.resize(mask.count_ones() as usize, 0);
                Node::Masked {
                    parent,
                    mask,
                    values: values.into_boxed_slice(),
                }
            }
        };

        Self {
            cpsr,
            spsr: 0,
            code,
            step,
            tid,
            node,
        }
    }

    /// Node shape.
    #[must_use]
    pub const fn kind(&self) -> NodeKind {
        self.node.kind()
    }

    /// Parent node, `None` for full and zero nodes.
    #[must_use]
    pub const fn parent(&self) -> Option<&Arc<Self>> {
        self.node.parent()
    }

    /// Number of parent links up to the terminating full or zero node.
    #[must_use]
    pub fn depth(&self) -> usize {
        let mut depth = 0;
        let mut node = self;
        while let Some(parent) = node.node.parent() {
            depth += 1;
            node = parent;
        }
        depth
    }

    /// Value of general-purpose register `reg`.
    #[must_use]
    pub fn gpr(&self, reg: Register) -> u32 {
        let mut node = self;
        loop {
            if let Some(value) = node.node.own(reg) {
                return value;
            }
            match node.node.parent() {
                Some(parent) => node = parent,
                None => return 0,
            }
        }
    }

    /// All sixteen general-purpose registers.
    #[must_use]
    pub fn registers(&self) -> [u32; GENERAL_REGISTER_COUNT] {
        Register::ALL.map(|reg| self.gpr(reg))
    }

    /// Program counter.
    #[must_use]
    pub fn pc(&self) -> u32 {
        self.gpr(Register::Pc)
    }

    /// Stack pointer.
    #[must_use]
    pub fn sp(&self) -> u32 {
        self.gpr(Register::Sp)
    }

    /// Link register.
    #[must_use]
    pub fn lr(&self) -> u32 {
        self.gpr(Register::Lr)
    }

    /// Current program status register.
    #[must_use]
    pub const fn cpsr(&self) -> u32 {
        self.cpsr
    }

    /// Saved program status register.
    #[must_use]
    pub const fn spsr(&self) -> u32 {
        self.spsr
    }

    /// Instruction word executed by this step.
    #[must_use]
    pub const fn code(&self) -> u32 {
        self.code
    }

    /// Step index.
    #[must_use]
    pub const fn step(&self) -> u64 {
        self.step
    }

    /// Thread id this state is attributed to.
    #[must_use]
    pub const fn tid(&self) -> u32 {
        self.tid
    }

    /// Processor mode selected by the CPSR.
    #[must_use]
    pub const fn mode(&self) -> ProcessorMode {
        ProcessorMode::of(self.cpsr)
    }

    /// Instruction set state selected by the CPSR.
    #[must_use]
    pub const fn execution_state(&self) -> ExecutionState {
        ExecutionState::of(self.cpsr)
    }

    /// Returns `true` when the step executed in Thumb state.
    #[must_use]
    pub const fn is_thumb(&self) -> bool {
        is_thumb(self.cpsr)
    }

    /// Evaluates the condition of the executed ARM word against the CPSR.
    #[must_use]
    pub const fn condition_passed(&self) -> bool {
        condition_passed(self.code, self.cpsr)
    }

    /// Register value by name: `r0`..`r15`, `sp`, `lr`, `pc`, `cpsr` or
    /// `spsr`, case-insensitive.
    #[must_use]
    pub fn register_by_name(&self, name: &str) -> Option<u32> {
        if name.eq_ignore_ascii_case("cpsr") {
            Some(self.cpsr)
        } else if name.eq_ignore_ascii_case("spsr") {
            Some(self.spsr)
        } else {
            Register::parse(name).map(|reg| self.gpr(reg))
        }
    }

    /// Little-endian bytes of the executed instruction.
    #[must_use]
    pub fn machine_code(&self) -> Vec<u8> {
        let bytes = self.code.to_le_bytes();
        let len = if self.is_thumb() { 2 } else { 4 };
        bytes[..len].to_vec()
    }

    /// Flat copy suitable for serialization.
    #[must_use]
    pub fn snapshot(&self) -> StateSnapshot {
        StateSnapshot {
            gpr: self.registers(),
            cpsr: self.cpsr,
            spsr: self.spsr,
            code: self.code,
            step: self.step,
            tid: self.tid,
        }
    }
}

impl Default for CpuState {
    fn default() -> Self {
        Self::zero()
    }
}

impl Drop for CpuState {
    fn drop(&mut self) {
        let mut next = self.node.take_parent();
        while let Some(parent) = next {
            next = match Arc::try_unwrap(parent) {
                Ok(mut state) => state.node.take_parent(),
                Err(_) => None,
            };
        }
    }
}

impl fmt::Display for CpuState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let gpr = self.registers();
        for (index, values) in gpr.chunks(4).enumerate() {
            let line = values
                .iter()
                .enumerate()
                .map(|(column, value)| format!("R{:02}={value:08x}", index * 4 + column))
                .collect::<Vec<_>>()
                .join(" ");
            writeln!(f, "{line}")?;
        }
        writeln!(
            f,
            "CPSR {:08x} [{}] Mode: {} / {}",
            self.cpsr,
            flag_summary(self.cpsr),
            self.mode(),
            self.execution_state()
        )
    }
}

/// Flattened register state.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Deserialize, serde::Serialize))]
pub struct StateSnapshot {
    /// General-purpose registers `R0..R15`.
    pub gpr: [u32; GENERAL_REGISTER_COUNT],
    /// Current program status register.
    pub cpsr: u32,
    /// Saved program status register.
    pub spsr: u32,
    /// Instruction word.
    pub code: u32,
    /// Step index.
    pub step: u64,
    /// Thread id.
    pub tid: u32,
}

const fn lowest_register(mask: u16) -> Register {
    Register::from_field(mask.trailing_zeros())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::psr::CPSR_T;
    use crate::wire::{StepRecord, TraceWriter};

    fn encode(record: &StepRecord) -> Vec<u8> {
        let mut writer = TraceWriter::new(Vec::new());
        writer.step(record).expect("encode");
        // Drop the tag byte; `decode` reads the record body only.
        writer.into_inner().split_off(1)
    }

    fn decode(parent: &Arc<CpuState>, record: &StepRecord) -> CpuState {
        let bytes = encode(record);
        let mut reader = WireReader::new(bytes.as_slice());
        let state = CpuState::decode(Arc::clone(parent), &mut reader).expect("decode");
        assert_eq!(reader.offset(), bytes.len() as u64, "record fully consumed");
        state
    }

    fn base() -> Arc<CpuState> {
        let mut gpr = [0; GENERAL_REGISTER_COUNT];
        for (index, slot) in gpr.iter_mut().enumerate() {
            *slot = 0x100 + index as u32;
        }
        Arc::new(CpuState::full(gpr, 0x6000_001F, 0x10, 0xE1A0_0000, 10, 4))
    }

    fn record(mask: u16, values: Vec<u32>, cpsr: Option<u32>) -> StepRecord {
        StepRecord {
            cpsr,
            mask,
            code: 0xE3A0_0001,
            step: 11,
            values,
        }
    }

    #[test]
    fn null_delta_inherits_everything_but_spsr() {
        let parent = base();
        let state = decode(&parent, &record(0, vec![], None));
        assert_eq!(state.kind(), NodeKind::Null);
        assert_eq!(state.registers(), parent.registers());
        assert_eq!(state.cpsr(), 0x6000_001F);
        assert_eq!(state.spsr(), 0);
        assert_eq!(state.tid(), 4);
        assert_eq!(state.step(), 11);
        assert_eq!(state.code(), 0xE3A0_0001);
    }

    #[test]
    fn pc_only_delta() {
        let parent = base();
        let state = decode(&parent, &record(0x8000, vec![0x0200_0000], Some(0x13)));
        assert_eq!(state.kind(), NodeKind::Pc);
        assert_eq!(state.pc(), 0x0200_0000);
        assert_eq!(state.sp(), 0x10D);
        assert_eq!(state.cpsr(), 0x13);
    }

    #[test]
    fn single_register_delta() {
        let parent = base();
        let state = decode(&parent, &record(1 << 3, vec![0xDEAD], None));
        assert_eq!(state.kind(), NodeKind::Register);
        assert_eq!(state.gpr(Register::R3), 0xDEAD);
        assert_eq!(state.gpr(Register::R2), 0x102);
        assert_eq!(state.pc(), 0x10F);
    }

    #[test]
    fn register_plus_pc_delta_orders_register_first() {
        let parent = base();
        let state = decode(&parent, &record(0x8000 | (1 << 14), vec![0xAAAA, 0xBBBB], None));
        assert_eq!(state.kind(), NodeKind::RegisterPc);
        assert_eq!(state.lr(), 0xAAAA);
        assert_eq!(state.pc(), 0xBBBB);
        assert_eq!(state.sp(), 0x10D);
    }

    #[test]
    fn masked_delta_uses_dense_values() {
        let parent = base();
        let state = decode(&parent, &record(0b1010_0001, vec![1, 5, 7], None));
        assert_eq!(state.kind(), NodeKind::Masked);
        assert_eq!(state.gpr(Register::R0), 1);
        assert_eq!(state.gpr(Register::R5), 5);
        assert_eq!(state.gpr(Register::R7), 7);
        assert_eq!(state.gpr(Register::R6), 0x106);

        let two_without_pc = decode(&parent, &record(0b11, vec![9, 8], None));
        assert_eq!(two_without_pc.kind(), NodeKind::Masked);
        assert_eq!(two_without_pc.gpr(Register::R1), 8);
    }

    #[test]
    fn decode_leaves_parent_untouched() {
        let parent = base();
        let before = parent.snapshot();
        let _child = decode(&parent, &record(0xFFFF, (0..16).collect(), Some(0)));
        assert_eq!(parent.snapshot(), before);
    }

    #[test]
    fn truncated_body_is_unexpected_eof() {
        let mut bytes = encode(&record(0b11, vec![1, 2], None));
        bytes.truncate(bytes.len() - 2);
        let mut reader = WireReader::new(bytes.as_slice());
        let error = CpuState::decode(base(), &mut reader).expect_err("short");
        assert_eq!(error.kind(), io::ErrorKind::UnexpectedEof);
    }

    #[test]
    fn zero_state_reads_zero() {
        let zero = CpuState::zero();
        assert_eq!(zero.kind(), NodeKind::Zero);
        assert_eq!(zero.registers(), [0; GENERAL_REGISTER_COUNT]);
        assert_eq!(zero.depth(), 0);
    }

    #[test]
    fn full_copy_flattens_and_retags() {
        let mut head = base();
        for step in 0..10 {
            head = Arc::new(CpuState::delta(head, 1, vec![step], 0x1F, 0, u64::from(step)));
        }
        assert_eq!(head.depth(), 10);
        let copy = CpuState::full_copy(&head, 9);
        assert_eq!(copy.kind(), NodeKind::Full);
        assert_eq!(copy.depth(), 0);
        assert_eq!(copy.tid(), 9);
        assert_eq!(copy.registers(), head.registers());
        assert_eq!(copy.gpr(Register::R0), 9);
    }

    #[test]
    fn long_chains_drop_without_recursion() {
        let mut head = Arc::new(CpuState::zero());
        for step in 0..200_000_u64 {
            head = Arc::new(CpuState::delta(head, 0, Vec::new(), 0, 0, step));
        }
        assert_eq!(head.depth(), 200_000);
        drop(head);
    }

    #[test]
    fn shared_parents_survive_child_drop() {
        let parent = base();
        let child = CpuState::delta(Arc::clone(&parent), 1, vec![7], 0, 0, 0);
        drop(child);
        assert_eq!(parent.gpr(Register::R0), 0x100);
        assert_eq!(Arc::strong_count(&parent), 1);
    }

    #[test]
    fn named_lookup() {
        let state = base();
        assert_eq!(state.register_by_name("r0"), Some(0x100));
        assert_eq!(state.register_by_name("R07"), Some(0x107));
        assert_eq!(state.register_by_name("r13"), Some(0x10D));
        assert_eq!(state.register_by_name("SP"), Some(0x10D));
        assert_eq!(state.register_by_name("lr"), Some(0x10E));
        assert_eq!(state.register_by_name("Pc"), Some(0x10F));
        assert_eq!(state.register_by_name("CPSR"), Some(0x6000_001F));
        assert_eq!(state.register_by_name("spsr"), Some(0x10));
        assert_eq!(state.register_by_name("r16"), None);
        assert_eq!(state.register_by_name("fp"), None);
    }

    #[test]
    fn machine_code_width_follows_state() {
        let arm = CpuState::full([0; 16], 0x1F, 0, 0xE1A0_0000, 0, 0);
        assert_eq!(arm.machine_code(), [0x00, 0x00, 0xA0, 0xE1]);
        let thumb = CpuState::full([0; 16], 0x1F | CPSR_T, 0, 0x4770, 0, 0);
        assert_eq!(thumb.machine_code(), [0x70, 0x47]);
    }

    #[test]
    fn display_dumps_registers_and_status() {
        let rendered = base().to_string();
        let lines: Vec<&str> = rendered.lines().collect();
        assert_eq!(
            lines[0],
            "R00=00000100 R01=00000101 R02=00000102 R03=00000103"
        );
        assert_eq!(
            lines[3],
            "R12=0000010c R13=0000010d R14=0000010e R15=0000010f"
        );
        assert_eq!(lines[4], "CPSR 6000001f [-ZC--------] Mode: System / ARM");
        assert_eq!(lines.len(), 5);
    }
}
