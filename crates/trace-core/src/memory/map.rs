//! Fixed ARM9 memory-region map announced at the start of every trace.

use std::fmt;

const KIB: u32 = 1024;
const MIB: u32 = 1024 * KIB;

/// Inclusive end address of a region of `size` bytes starting at `start`.
const fn end_of(start: u32, size: u32) -> u32 {
    start + (size - 1)
}

/// Named address region of the ARM9 bus.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Deserialize, serde::Serialize))]
pub enum MemoryRegion {
    /// Instruction tightly-coupled memory.
    Itcm,
    /// Main memory.
    MainMemory,
    /// Data tightly-coupled memory.
    Dtcm,
    /// Shared work RAM window.
    SharedWork,
    /// Memory-mapped I/O ports.
    IoPorts,
    /// Standard BG/OBJ palettes.
    StandardPalettes,
    /// Engine A background VRAM.
    VramEngineABg,
    /// Engine B background VRAM.
    VramEngineBBg,
    /// Engine A object VRAM.
    VramEngineAObj,
    /// Engine B object VRAM.
    VramEngineBObj,
    /// LCDC-mapped VRAM.
    VramLcd,
    /// Object attribute memory.
    Oam,
    /// GBA slot ROM.
    GbaSlotRom,
    /// GBA slot RAM.
    GbaSlotRam,
    /// ARM9 BIOS.
    Bios,
}

impl MemoryRegion {
    /// Returns the inclusive bounds for this region.
    #[must_use]
    pub const fn bounds(self) -> (u32, u32) {
        match self {
            Self::Itcm => (0x0100_0000, end_of(0x0100_0000, 32 * KIB)),
            Self::MainMemory => (0x0200_0000, end_of(0x0200_0000, 4 * MIB)),
            Self::Dtcm => (0x027C_0000, end_of(0x027C_0000, 16 * KIB)),
            Self::SharedWork => (0x027F_F000, end_of(0x027F_F000, 4 * KIB)),
            Self::IoPorts => (0x0400_0000, 0x04FF_FFFF),
            Self::StandardPalettes => (0x0500_0000, end_of(0x0500_0000, 2 * KIB)),
            Self::VramEngineABg => (0x0600_0000, end_of(0x0600_0000, 512 * KIB)),
            Self::VramEngineBBg => (0x0620_0000, end_of(0x0620_0000, 128 * KIB)),
            Self::VramEngineAObj => (0x0640_0000, end_of(0x0640_0000, 256 * KIB)),
            Self::VramEngineBObj => (0x0660_0000, end_of(0x0660_0000, 128 * KIB)),
            Self::VramLcd => (0x0680_0000, end_of(0x0680_0000, 656 * KIB)),
            Self::Oam => (0x0700_0000, end_of(0x0700_0000, 2 * KIB)),
            Self::GbaSlotRom => (0x0800_0000, end_of(0x0800_0000, 32 * MIB)),
            Self::GbaSlotRam => (0x0A00_0000, end_of(0x0A00_0000, 64 * KIB)),
            Self::Bios => (0xFFFF_0000, end_of(0xFFFF_0000, 32 * KIB)),
        }
    }

    /// Display name announced in the memory-map event.
    #[must_use]
    pub const fn name(self) -> &'static str {
        match self {
            Self::Itcm => "ITCM",
            Self::MainMemory => "Main Memory",
            Self::Dtcm => "DTCM",
            Self::SharedWork => "Shared Work",
            Self::IoPorts => "I/O Ports",
            Self::StandardPalettes => "Standard Palettes",
            Self::VramEngineABg => "VRAM Engine A (BG)",
            Self::VramEngineBBg => "VRAM Engine B (BG)",
            Self::VramEngineAObj => "VRAM Engine A (OBJ)",
            Self::VramEngineBObj => "VRAM Engine B (OBJ)",
            Self::VramLcd => "VRAM (LCD)",
            Self::Oam => "OAM",
            Self::GbaSlotRom => "GBA Slot ROM",
            Self::GbaSlotRam => "GBA Slot RAM",
            Self::Bios => "BIOS",
        }
    }

    /// Returns `true` when `addr` belongs to this region.
    #[must_use]
    pub const fn contains(self, addr: u32) -> bool {
        let (start, end) = self.bounds();
        addr >= start && addr <= end
    }

    /// Returns the canonical descriptor for this region.
    #[must_use]
    pub const fn descriptor(self) -> RegionDescriptor {
        let (start, end) = self.bounds();
        RegionDescriptor {
            region: self,
            start,
            end,
            protection: Protection::RWX,
        }
    }
}

impl fmt::Display for MemoryRegion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Access permissions of a mapped region.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Deserialize, serde::Serialize))]
pub struct Protection {
    /// Readable.
    pub read: bool,
    /// Writable.
    pub write: bool,
    /// Executable.
    pub execute: bool,
}

impl Protection {
    /// Read, write and execute.
    pub const RWX: Self = Self {
        read: true,
        write: true,
        execute: true,
    };
}

impl fmt::Display for Protection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let flag = |set: bool, c: char| if set { c } else { '-' };
        write!(
            f,
            "{}{}{}",
            flag(self.read, 'r'),
            flag(self.write, 'w'),
            flag(self.execute, 'x')
        )
    }
}

/// Region descriptor carried by a memory-map announcement.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Deserialize, serde::Serialize))]
pub struct RegionDescriptor {
    /// Region classification.
    pub region: MemoryRegion,
    /// Inclusive start address.
    pub start: u32,
    /// Inclusive end address.
    pub end: u32,
    /// Access permissions.
    pub protection: Protection,
}

impl RegionDescriptor {
    /// Size of the region in bytes.
    #[must_use]
    pub const fn size(&self) -> u64 {
        self.end as u64 - self.start as u64 + 1
    }
}

/// Fixed region layout in announcement order.
pub const MEMORY_MAP: [RegionDescriptor; 15] = [
    MemoryRegion::Itcm.descriptor(),
    MemoryRegion::MainMemory.descriptor(),
    MemoryRegion::Dtcm.descriptor(),
    MemoryRegion::SharedWork.descriptor(),
    MemoryRegion::IoPorts.descriptor(),
    MemoryRegion::StandardPalettes.descriptor(),
    MemoryRegion::VramEngineABg.descriptor(),
    MemoryRegion::VramEngineBBg.descriptor(),
    MemoryRegion::VramEngineAObj.descriptor(),
    MemoryRegion::VramEngineBObj.descriptor(),
    MemoryRegion::VramLcd.descriptor(),
    MemoryRegion::Oam.descriptor(),
    MemoryRegion::GbaSlotRom.descriptor(),
    MemoryRegion::GbaSlotRam.descriptor(),
    MemoryRegion::Bios.descriptor(),
];

const _: () = assert_memory_map_layout();

const fn assert_memory_map_layout() {
    let mut index = 0;
    while index < MEMORY_MAP.len() {
        let descriptor = MEMORY_MAP[index];
        assert!(
            descriptor.start <= descriptor.end,
            "region start cannot be greater than end"
        );

        if index > 0 {
            let previous = MEMORY_MAP[index - 1];
            assert!(
                previous.end < descriptor.start,
                "regions must be ascending and disjoint"
            );
        }

        index += 1;
    }
}

/// Returns the region containing `addr`, if any.
#[must_use]
pub fn decode_memory_region(addr: u32) -> Option<MemoryRegion> {
    MEMORY_MAP
        .iter()
        .find(|descriptor| descriptor.region.contains(addr))
        .map(|descriptor| descriptor.region)
}
