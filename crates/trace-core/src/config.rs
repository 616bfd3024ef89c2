//! Reader configuration.

use thiserror::Error;

/// Default number of step records between full-state snapshots.
pub const DEFAULT_FULL_STATE_INTERVAL: u32 = 5_000;

/// Instruction-word signature: `word & mask == value`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Deserialize, serde::Serialize))]
pub struct MaskPattern {
    /// Bits that take part in the comparison.
    pub mask: u32,
    /// Expected value of the masked bits.
    pub value: u32,
}

impl MaskPattern {
    /// Builds a pattern.
    #[must_use]
    pub const fn new(mask: u32, value: u32) -> Self {
        Self { mask, value }
    }

    /// Returns `true` when `word` carries this signature.
    #[must_use]
    pub const fn matches(self, word: u32) -> bool {
        word & self.mask == self.value
    }
}

/// Instruction signatures of the scheduler's register save and restore
/// sequences.
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Deserialize, serde::Serialize))]
pub struct SchedulerSignatures {
    /// Restore of `R0-R12, LR, PC` executed in Supervisor mode.
    pub supervisor_restore: MaskPattern,
    /// Restore executed in IRQ mode.
    pub irq_restore: MaskPattern,
    /// Register save sequences, any of which flags a context save.
    pub saves: Vec<MaskPattern>,
}

impl Default for SchedulerSignatures {
    fn default() -> Self {
        Self {
            supervisor_restore: MaskPattern::new(0x0E70_FFFF, 0x0850_7FFF),
            irq_restore: MaskPattern::new(0x0E50_7FFF, 0x0850_7FFF),
            saves: vec![
                MaskPattern::new(0x0E50_FFFF, 0x0800_7FFF),
                // Preemptive variant storing R0-R1 separately.
                MaskPattern::new(0x0E50_FFFC, 0x0840_7FFC),
            ],
        }
    }
}

/// Runtime options of [`crate::TraceReader`].
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Deserialize, serde::Serialize))]
#[cfg_attr(feature = "serde", serde(default))]
pub struct ReaderConfig {
    /// Step records between full-state snapshots; must be non-zero.
    pub full_state_interval: u32,
    /// Scheduler signatures used for thread inference.
    pub scheduler: SchedulerSignatures,
    /// Infer context switches and per-thread ids.
    pub infer_threads: bool,
    /// Replace accesses to known device registers with device events.
    pub map_devices: bool,
}

impl Default for ReaderConfig {
    fn default() -> Self {
        Self {
            full_state_interval: DEFAULT_FULL_STATE_INTERVAL,
            scheduler: SchedulerSignatures::default(),
            infer_threads: true,
            map_devices: true,
        }
    }
}

impl ReaderConfig {
    /// Sets the full-state interval.
    #[must_use]
    pub const fn with_full_state_interval(mut self, interval: u32) -> Self {
        self.full_state_interval = interval;
        self
    }

    /// Replaces the scheduler signatures.
    #[must_use]
    pub fn with_scheduler(mut self, scheduler: SchedulerSignatures) -> Self {
        self.scheduler = scheduler;
        self
    }

    /// Enables or disables thread inference.
    #[must_use]
    pub const fn with_infer_threads(mut self, enabled: bool) -> Self {
        self.infer_threads = enabled;
        self
    }

    /// Enables or disables device-register mapping.
    #[must_use]
    pub const fn with_map_devices(mut self, enabled: bool) -> Self {
        self.map_devices = enabled;
        self
    }

    /// Checks the configuration for values the reader cannot work with.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::ZeroFullStateInterval`] when the interval is 0.
    pub const fn validate(&self) -> Result<(), ConfigError> {
        if self.full_state_interval == 0 {
            return Err(ConfigError::ZeroFullStateInterval);
        }
        Ok(())
    }
}

/// Invalid reader configuration.
#[derive(Debug, Clone, Copy, Error, PartialEq, Eq)]
pub enum ConfigError {
    /// The full-state interval must be at least one step.
    #[error("full-state interval must be non-zero")]
    ZeroFullStateInterval,
}
