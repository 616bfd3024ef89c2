//! Thread inference from scheduler instruction signatures.
//!
//! The signatures match the register save and restore sequences of one
//! particular operating-system scheduler. They are heuristics over raw
//! instruction bits, which is why they live in [`SchedulerSignatures`]
//! rather than in the classifier.

use std::collections::HashMap;

use crate::config::SchedulerSignatures;
use crate::psr::ProcessorMode;
use crate::state::CpuState;

/// Scheduler role of a step.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Deserialize, serde::Serialize))]
pub enum SchedulerOp {
    /// Current thread's registers are saved.
    Save,
    /// Another thread's registers are restored.
    Restore,
}

/// Returns `true` when `state` restores a thread context.
#[must_use]
pub fn is_context_switch(state: &CpuState, signatures: &SchedulerSignatures) -> bool {
    let pattern = match state.mode() {
        ProcessorMode::Supervisor => signatures.supervisor_restore,
        ProcessorMode::Irq => signatures.irq_restore,
        _ => return false,
    };
    pattern.matches(state.code()) && state.condition_passed()
}

/// Returns `true` when `state` saves a thread context.
#[must_use]
pub fn is_context_save(state: &CpuState, signatures: &SchedulerSignatures) -> bool {
    signatures
        .saves
        .iter()
        .any(|pattern| pattern.matches(state.code()))
        && state.condition_passed()
}

/// Scheduler role of `state`, restore taking precedence.
#[must_use]
pub fn scheduler_op(state: &CpuState, signatures: &SchedulerSignatures) -> Option<SchedulerOp> {
    if is_context_switch(state, signatures) {
        Some(SchedulerOp::Restore)
    } else if is_context_save(state, signatures) {
        Some(SchedulerOp::Save)
    } else {
        None
    }
}

/// Stack pointer identifying the running thread.
///
/// Supervisor mode has no handle. In IRQ mode the handle is the stack
/// pointer of the last step seen in IRQ mode, if any.
#[must_use]
pub fn thread_handle(state: &CpuState, last_irq: Option<&CpuState>) -> Option<u32> {
    match state.mode() {
        ProcessorMode::Supervisor => None,
        ProcessorMode::Irq => last_irq.map(CpuState::sp),
        _ => Some(state.sp()),
    }
}

/// Thread handle to sequential thread id.
///
/// Id 0 is the thread running when the trace starts; its handle is recorded
/// with [`ThreadMap::seed_initial`] once observed. Other handles are
/// numbered from 1 in order of first appearance.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ThreadMap {
    initial: Option<u32>,
    ids: HashMap<u32, u32>,
    next: u32,
}

impl Default for ThreadMap {
    fn default() -> Self {
        Self {
            initial: None,
            ids: HashMap::new(),
            next: 1,
        }
    }
}

impl ThreadMap {
    /// Creates an empty map.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Records `handle` as thread 0 unless the initial thread is already
    /// known or `handle` has been assigned another id.
    pub fn seed_initial(&mut self, handle: u32) {
        if self.initial.is_none() && !self.ids.contains_key(&handle) {
            self.initial = Some(handle);
        }
    }

    /// Handle of the thread running at trace start, once observed.
    #[must_use]
    pub const fn initial(&self) -> Option<u32> {
        self.initial
    }

    /// Returns the id of `handle`, assigning the next free one on first use.
    pub fn resolve(&mut self, handle: u32) -> u32 {
        if self.initial == Some(handle) {
            return 0;
        }
        let next = &mut self.next;
        *self.ids.entry(handle).or_insert_with(|| {
            let id = *next;
            *next = next.saturating_add(1);
            id
        })
    }

    /// Id previously assigned to `handle`.
    #[must_use]
    pub fn get(&self, handle: u32) -> Option<u32> {
        if self.initial == Some(handle) {
            return Some(0);
        }
        self.ids.get(&handle).copied()
    }

    /// Number of known threads, excluding the initial one.
    #[must_use]
    pub fn len(&self) -> usize {
        self.ids.len()
    }

    /// Returns `true` before the first resolved handle.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.ids.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const IRQ: u32 = 0x6000_00D2;
    const SVC: u32 = 0x6000_00D3;
    const USR: u32 = 0x6000_0010;

    fn state(code: u32, cpsr: u32, sp: u32) -> CpuState {
        let mut gpr = [0; 16];
        gpr[13] = sp;
        CpuState::full(gpr, cpsr, 0, code, 0, 0)
    }

    #[test]
    fn irq_push_is_not_a_switch() {
        let signatures = SchedulerSignatures::default();
        assert!(!is_context_switch(&state(0xE82D_500F, IRQ, 0), &signatures));
    }

    #[test]
    fn irq_restore_is_a_switch() {
        let signatures = SchedulerSignatures::default();
        let restore = state(0xE9F1_7FFF, IRQ, 0);
        assert!(is_context_switch(&restore, &signatures));
        assert_eq!(
            scheduler_op(&restore, &signatures),
            Some(SchedulerOp::Restore)
        );
    }

    #[test]
    fn supervisor_restore_uses_its_own_signature() {
        let signatures = SchedulerSignatures::default();
        assert!(is_context_switch(&state(0xE8D0_7FFF, SVC, 0), &signatures));
        assert!(!is_context_switch(&state(0xE8D0_7FFF, USR, 0), &signatures));
    }

    #[test]
    fn failing_condition_suppresses_detection() {
        let signatures = SchedulerSignatures::default();
        // EQ with Z clear.
        assert!(!is_context_switch(&state(0x09F1_7FFF, 0x2000_00D2, 0), &signatures));
        assert!(!is_context_save(&state(0x0881_7FFF, 0x2000_00D2, 0), &signatures));
    }

    #[test]
    fn context_saves() {
        let signatures = SchedulerSignatures::default();
        let save = state(0xE881_7FFF, IRQ, 0);
        assert!(is_context_save(&save, &signatures));
        assert_eq!(scheduler_op(&save, &signatures), Some(SchedulerOp::Save));
        assert!(is_context_save(&state(0xE9E0_7FFC, IRQ, 0), &signatures));
        assert_eq!(
            scheduler_op(&state(0xE1A0_0000, IRQ, 0), &signatures),
            None
        );
    }

    #[test]
    fn handles_follow_mode() {
        let irq = state(0, IRQ, 0x0300_0000);
        assert_eq!(thread_handle(&state(0, SVC, 1), Some(&irq)), None);
        assert_eq!(thread_handle(&state(0, IRQ, 1), Some(&irq)), Some(0x0300_0000));
        assert_eq!(thread_handle(&state(0, IRQ, 1), None), None);
        assert_eq!(thread_handle(&state(0, USR, 0x2FE0), Some(&irq)), Some(0x2FE0));
    }

    #[test]
    fn thread_ids_are_sequential_and_stable() {
        let mut threads = ThreadMap::new();
        assert!(threads.is_empty());
        assert_eq!(threads.resolve(0x2FE0), 1);
        assert_eq!(threads.resolve(0x3FE0), 2);
        assert_eq!(threads.resolve(0x2FE0), 1);
        assert_eq!(threads.get(0x3FE0), Some(2));
        assert_eq!(threads.get(0x4FE0), None);
        assert_eq!(threads.len(), 2);
    }

    #[test]
    fn initial_thread_keeps_id_zero() {
        let mut threads = ThreadMap::new();
        threads.seed_initial(0x2FE0);
        threads.seed_initial(0x3FE0);
        assert_eq!(threads.initial(), Some(0x2FE0));
        assert_eq!(threads.resolve(0x3FE0), 1);
        assert_eq!(threads.resolve(0x2FE0), 0);
        assert_eq!(threads.get(0x2FE0), Some(0));
        assert_eq!(threads.len(), 1);
    }

    #[test]
    fn seeding_ignores_known_handles() {
        let mut threads = ThreadMap::new();
        assert_eq!(threads.resolve(0x3FE0), 1);
        threads.seed_initial(0x3FE0);
        assert_eq!(threads.initial(), None);
        assert_eq!(threads.resolve(0x3FE0), 1);
    }
}
