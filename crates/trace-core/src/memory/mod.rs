//! ARM9 address-space layout and recorded memory access shapes.

/// Access widths and directions.
pub mod access;
/// Fixed memory-region map.
pub mod map;

pub use access::{AccessKind, AccessSize};
pub use map::{decode_memory_region, MemoryRegion, Protection, RegionDescriptor, MEMORY_MAP};
