//! Pull-based trace event reader.
//!
//! [`TraceReader`] announces the fixed memory map and the device catalog,
//! then turns each record of the stream into one or more [`Event`]s while
//! rebuilding CPU state and inferring thread identity.

use std::collections::VecDeque;
use std::io::Read;
use std::iter::FusedIterator;
use std::sync::Arc;

use tracing::{debug, trace, warn};

use crate::config::ReaderConfig;
use crate::decoder::InstructionType;
use crate::device::{Arm9Devices, DeviceCatalog};
use crate::encoding::ThumbInstruction;
use crate::error::TraceError;
use crate::event::{
    ContextSwitchEvent, Event, InterruptEvent, MemoryAccessEvent, MemoryDumpEvent, StepEvent,
};
use crate::memory::{AccessKind, AccessSize, MEMORY_MAP};
use crate::psr::ProcessorMode;
use crate::scheduler::{scheduler_op, thread_handle, SchedulerOp, ThreadMap};
use crate::state::CpuState;
use crate::wire::{RecordTag, WireReader};

/// Context switch detected but not yet attributed to a thread.
#[derive(Debug, Clone, Copy)]
struct PendingSwitch {
    preempt: bool,
    tid: u32,
}

/// Decoder of the binary ARM9 trace format.
#[derive(Debug)]
pub struct TraceReader<R, C = Arm9Devices> {
    input: WireReader<R>,
    config: ReaderConfig,
    catalog: C,
    prologue: usize,
    head: Arc<CpuState>,
    steps_since_full: u32,
    last_step: Option<StepEvent>,
    last_irq: Option<Arc<CpuState>>,
    pending: Option<PendingSwitch>,
    threads: ThreadMap,
    current_tid: u32,
    output: VecDeque<Event>,
    failed: bool,
}

impl<R: Read> TraceReader<R> {
    /// Creates a reader with the default configuration and ARM9 devices.
    pub fn new(input: R) -> Self {
        Self::build(input, ReaderConfig::default(), Arm9Devices)
    }

    /// Creates a reader with a custom configuration.
    ///
    /// # Errors
    ///
    /// Returns [`TraceError::Config`] when the configuration is invalid.
    pub fn with_config(input: R, config: ReaderConfig) -> Result<Self, TraceError> {
        Self::with_catalog(input, config, Arm9Devices)
    }
}

impl<R: Read, C: DeviceCatalog> TraceReader<R, C> {
    /// Creates a reader with a custom configuration and device catalog.
    ///
    /// # Errors
    ///
    /// Returns [`TraceError::Config`] when the configuration is invalid.
    pub fn with_catalog(input: R, config: ReaderConfig, catalog: C) -> Result<Self, TraceError> {
        config.validate()?;
        Ok(Self::build(input, config, catalog))
    }

    fn build(input: R, config: ReaderConfig, catalog: C) -> Self {
        Self {
            input: WireReader::new(input),
            config,
            catalog,
            prologue: 0,
            head: Arc::new(CpuState::zero()),
            steps_since_full: 0,
            last_step: None,
            last_irq: None,
            pending: None,
            threads: ThreadMap::new(),
            current_tid: 0,
            output: VecDeque::new(),
            failed: false,
        }
    }

    /// Active configuration.
    #[must_use]
    pub const fn config(&self) -> &ReaderConfig {
        &self.config
    }

    /// Threads resolved so far.
    #[must_use]
    pub const fn threads(&self) -> &ThreadMap {
        &self.threads
    }

    /// Id of the thread currently running.
    #[must_use]
    pub const fn current_tid(&self) -> u32 {
        self.current_tid
    }

    /// Bytes consumed from the stream.
    #[must_use]
    pub const fn offset(&self) -> u64 {
        self.input.offset()
    }

    /// Most recent state.
    #[must_use]
    pub const fn head(&self) -> &Arc<CpuState> {
        &self.head
    }

    /// Produces the next event, or `Ok(None)` at the end of the stream.
    ///
    /// # Errors
    ///
    /// Returns [`TraceError::UnknownRecord`] for an unrecognised tag,
    /// [`TraceError::Truncated`] when the stream ends inside a record, and
    /// [`TraceError::Io`] for other read failures.
    pub fn next_event(&mut self) -> Result<Option<Event>, TraceError> {
        if let Some(event) = self.output.pop_front() {
            return Ok(Some(event));
        }
        if let Some(event) = self.next_prologue_event() {
            return Ok(Some(event));
        }

        let offset = self.input.offset();
        let Some(tag) = self.input.read_tag()? else {
            return Ok(None);
        };
        trace!(tag, offset, "record");

        match RecordTag::from_u8(tag) {
            Some(RecordTag::Step) => self.read_step(offset)?,
            Some(RecordTag::Dump) => self.read_dump(offset)?,
            Some(RecordTag::Interrupt) => self.output.push_back(Event::Interrupt(InterruptEvent {
                step: self.last_step.clone(),
                tid: self.current_tid,
            })),
            Some(access) => match access.access() {
                Some((size, kind)) => self.read_access(tag, offset, size, kind)?,
                None => return Err(unknown_record(tag, offset)),
            },
            None => return Err(unknown_record(tag, offset)),
        }

        Ok(self.output.pop_front())
    }

    fn next_prologue_event(&mut self) -> Option<Event> {
        let index = self.prologue;
        if index > MEMORY_MAP.len() {
            return None;
        }
        self.prologue += 1;
        match MEMORY_MAP.get(index) {
            Some(region) => Some(Event::MemoryMap(*region)),
            None => Some(Event::DeviceDefinition(self.catalog.definition())),
        }
    }

    fn read_step(&mut self, offset: u64) -> Result<(), TraceError> {
        let tag = RecordTag::Step as u8;
        let decoded = CpuState::decode(Arc::clone(&self.head), &mut self.input)
            .map_err(|error| record_error(error, tag, offset))?;
        let mut state = Arc::new(decoded);

        self.steps_since_full += 1;
        if self.steps_since_full >= self.config.full_state_interval {
            debug!(step = state.step(), "materializing full state");
            state = Arc::new(CpuState::full_copy(&state, state.tid()));
            self.steps_since_full = 0;
        }

        let mut resolved_switch = false;
        let mut scheduler = None;
        if self.config.infer_threads {
            if state.mode() == ProcessorMode::Irq && self.head.mode() != ProcessorMode::Irq {
                self.last_irq = Some(Arc::clone(&state));
            }
            resolved_switch = self.resolve_pending(&state);
            if self.current_tid == 0
                && self.pending.is_none()
                && !state.mode().is_scheduler_mode()
            {
                self.threads.seed_initial(state.sp());
            }
            if state.tid() != self.current_tid {
                state = Arc::new(CpuState::full_copy(&state, self.current_tid));
            }
            scheduler = self.detect_scheduler(&state);
        }

        let mut step = StepEvent::new(state);
        step.scheduler = scheduler;
        if self.is_thumb_return(&step.state) {
            step.type_override = Some(InstructionType::Ret);
        }
        if resolved_switch && step.classification() == InstructionType::Ret {
            step.type_override = Some(InstructionType::Other);
        }

        self.head = Arc::clone(&step.state);
        self.last_step = Some(step.clone());
        self.output.push_back(Event::Step(step));
        Ok(())
    }

    /// Emits the pending switch when `state` runs outside Supervisor mode;
    /// returns `true` when one was emitted.
    ///
    /// A switch restored from Supervisor mode that is interrupted before the
    /// new thread runs resolves on the IRQ entry. A switch detected in IRQ
    /// mode waits until IRQ mode is left.
    fn resolve_pending(&mut self, state: &CpuState) -> bool {
        let Some(pending) = self.pending else {
            return false;
        };
        match state.mode() {
            ProcessorMode::Supervisor => return false,
            ProcessorMode::Irq if pending.preempt => return false,
            _ => {}
        }
        let Some(handle) = thread_handle(state, self.last_irq.as_deref()) else {
            return false;
        };
        self.pending = None;

        let thread = self.threads.resolve(handle);
        debug!(thread, handle, preempt = pending.preempt, "context switch resolved");
        self.output
            .push_back(Event::ContextSwitch(ContextSwitchEvent {
                thread,
                handle,
                preempt: pending.preempt,
                tid: pending.tid,
            }));
        self.current_tid = thread;
        true
    }

    fn detect_scheduler(&mut self, state: &Arc<CpuState>) -> Option<SchedulerOp> {
        let mode = state.mode();
        let op = scheduler_op(state, &self.config.scheduler);
        if op == Some(SchedulerOp::Restore) {
            let preempt = mode == ProcessorMode::Irq;
            debug!(step = state.step(), preempt, "context switch detected");
            self.pending = Some(PendingSwitch {
                preempt,
                tid: self.current_tid,
            });
        }
        op
    }

    /// Thumb `POP` without `PC` followed by `BX` through a popped register.
    fn is_thumb_return(&self, state: &CpuState) -> bool {
        let Some(previous) = &self.last_step else {
            return false;
        };
        if !state.is_thumb() || !previous.state.is_thumb() {
            return false;
        }
        let pop = ThumbInstruction::new(previous.state.code());
        let bx = ThumbInstruction::new(state.code());
        pop.is_pop() && !pop.r() && bx.is_bx() && pop.register_list() & bx.hi_rm().mask_bit() != 0
    }

    fn read_access(
        &mut self,
        tag: u8,
        offset: u64,
        size: AccessSize,
        kind: AccessKind,
    ) -> Result<(), TraceError> {
        let value = self
            .input
            .read_sized(size)
            .map_err(|error| record_error(error, tag, offset))?;
        let address = self
            .input
            .read_u32()
            .map_err(|error| record_error(error, tag, offset))?;

        let mapped = if self.config.map_devices {
            self.catalog
                .map_access(address, value, kind, self.current_tid)
        } else {
            None
        };
        let event = mapped.unwrap_or(Event::MemoryAccess(MemoryAccessEvent {
            address,
            value,
            size,
            kind,
            tid: self.current_tid,
        }));
        self.output.push_back(event);
        Ok(())
    }

    fn read_dump(&mut self, offset: u64) -> Result<(), TraceError> {
        let tag = RecordTag::Dump as u8;
        let address = self
            .input
            .read_u32()
            .map_err(|error| record_error(error, tag, offset))?;
        let len = self
            .input
            .read_u32()
            .map_err(|error| record_error(error, tag, offset))?;
        let data = self
            .input
            .read_bytes(len)
            .map_err(|error| record_error(error, tag, offset))?;
        self.output.push_back(Event::MemoryDump(MemoryDumpEvent {
            address,
            data,
            tid: self.current_tid,
        }));
        Ok(())
    }
}

fn unknown_record(tag: u8, offset: u64) -> TraceError {
    warn!(tag, offset, "unknown record tag");
    TraceError::UnknownRecord { tag, offset }
}

fn record_error(error: std::io::Error, tag: u8, offset: u64) -> TraceError {
    let error = TraceError::from_record(error, tag, offset);
    if matches!(error, TraceError::Truncated { .. }) {
        warn!(tag, offset, "trace ends inside a record");
    }
    error
}

impl<R: Read, C: DeviceCatalog> Iterator for TraceReader<R, C> {
    type Item = Result<Event, TraceError>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.failed {
            return None;
        }
        match self.next_event() {
            Ok(event) => event.map(Ok),
            Err(error) => {
                self.failed = true;
                Some(Err(error))
            }
        }
    }
}

impl<R: Read, C: DeviceCatalog> FusedIterator for TraceReader<R, C> {}
