//! CPU state reconstructed from step records.

/// Delta-compressed state chain.
pub mod cpu;

pub use cpu::{CpuState, NodeKind, StateSnapshot};
