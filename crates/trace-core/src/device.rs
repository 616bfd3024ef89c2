//! ARM9 device catalog: register addresses, device definitions and the
//! mapping of raw memory accesses to device events.

use std::fmt;

use crate::event::{DeviceRegisterEvent, Event, GeometryEvent};
use crate::memory::AccessKind;

/// Hardware block owning a group of registers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Deserialize, serde::Serialize))]
pub enum Device {
    /// ARM946E-S core.
    Cpu,
    /// Memory controller.
    MemoryControl,
    /// 2D video engine.
    Video,
    /// Display capture unit.
    VideoCapture,
    /// 3D rendering engine.
    RenderingEngine,
    /// 3D geometry engine.
    GeometryEngine,
}

impl Device {
    /// Devices in id order.
    pub const ALL: [Self; 6] = [
        Self::Cpu,
        Self::MemoryControl,
        Self::Video,
        Self::VideoCapture,
        Self::RenderingEngine,
        Self::GeometryEngine,
    ];

    /// Numeric device id.
    #[must_use]
    pub const fn id(self) -> u32 {
        self as u32
    }

    /// Decodes a numeric device id.
    #[must_use]
    pub const fn from_id(id: u32) -> Option<Self> {
        match id {
            0 => Some(Self::Cpu),
            1 => Some(Self::MemoryControl),
            2 => Some(Self::Video),
            3 => Some(Self::VideoCapture),
            4 => Some(Self::RenderingEngine),
            5 => Some(Self::GeometryEngine),
            _ => None,
        }
    }

    /// Display name.
    #[must_use]
    pub const fn name(self) -> &'static str {
        match self {
            Self::Cpu => "ARM946E-S",
            Self::MemoryControl => "Memory Control",
            Self::Video => "Video",
            Self::VideoCapture => "Video Capture",
            Self::RenderingEngine => "Rendering Engine",
            Self::GeometryEngine => "Geometry Engine",
        }
    }

    /// Broad device category.
    #[must_use]
    pub const fn kind(self) -> DeviceKind {
        match self {
            Self::Cpu => DeviceKind::Processor,
            Self::MemoryControl => DeviceKind::Memory,
            Self::Video | Self::VideoCapture => DeviceKind::Display,
            Self::RenderingEngine | Self::GeometryEngine => DeviceKind::Graphics,
        }
    }
}

impl fmt::Display for Device {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Device category announced in the device definition.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Deserialize, serde::Serialize))]
pub enum DeviceKind {
    /// CPU core.
    Processor,
    /// Memory controller.
    Memory,
    /// 2D display hardware.
    Display,
    /// 3D graphics hardware.
    Graphics,
}

/// Static description of one memory-mapped device register.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct RegisterSpec {
    /// Owning device.
    pub device: Device,
    /// Register id, unique within the device.
    pub id: u32,
    /// Register name.
    pub name: &'static str,
    /// Bus address.
    pub address: u32,
    /// Register only produces events when written.
    pub write_only: bool,
}

const fn register(device: Device, id: u32, name: &'static str, address: u32) -> RegisterSpec {
    RegisterSpec {
        device,
        id,
        name,
        address,
        write_only: false,
    }
}

const fn write_only(device: Device, id: u32, name: &'static str, address: u32) -> RegisterSpec {
    RegisterSpec {
        device,
        id,
        name,
        address,
        write_only: true,
    }
}

/// Geometry-engine command register ids.
pub mod geometry {
    /// Buffer swap command.
    pub const SWAP_BUFFERS: u32 = 35;
    /// Viewport command.
    pub const VIEWPORT: u32 = 36;
    /// Command FIFO.
    pub const GXFIFO: u32 = 40;
}

/// Rendering-engine register ids.
pub mod rendering {
    /// 3D display control.
    pub const DISP3DCNT: u32 = 0;
    /// Clear depth for 1-dot polygons.
    pub const DISP_1DOT_DEPTH: u32 = 2;
    /// Alpha-test comparison value.
    pub const ALPHA_TEST_REF: u32 = 10;
}

/// Registers recognised by [`Arm9Devices`], in announcement order.
pub const ARM9_REGISTERS: [RegisterSpec; 17] = [
    register(Device::MemoryControl, 0, "EXMEMCNT", 0x0400_0204),
    register(Device::MemoryControl, 1, "WRAMCNT", 0x0400_0247),
    register(Device::MemoryControl, 4, "VRAMCNT_A", 0x0400_0240),
    register(Device::MemoryControl, 5, "VRAMCNT_B", 0x0400_0241),
    register(Device::MemoryControl, 6, "VRAMCNT_C", 0x0400_0242),
    register(Device::MemoryControl, 7, "VRAMCNT_D", 0x0400_0243),
    register(Device::MemoryControl, 8, "VRAMCNT_E", 0x0400_0244),
    register(Device::MemoryControl, 9, "VRAMCNT_F", 0x0400_0245),
    register(Device::MemoryControl, 10, "VRAMCNT_G", 0x0400_0246),
    register(Device::MemoryControl, 11, "VRAMCNT_H", 0x0400_0248),
    register(Device::MemoryControl, 12, "VRAMCNT_I", 0x0400_0249),
    register(Device::Video, 0, "MASTER_BRIGHT", 0x0400_006C),
    register(Device::Video, 1, "DISPCNT", 0x0400_0000),
    register(Device::VideoCapture, 0, "DISPCAPCNT", 0x0400_0064),
    register(Device::VideoCapture, 1, "DISP_MMEM_FIFO", 0x0400_0068),
    register(Device::RenderingEngine, rendering::DISP3DCNT, "DISP3DCNT", 0x0400_0060),
    register(Device::GeometryEngine, geometry::GXFIFO, "GXFIFO", 0x0400_0400),
];

/// Registers announced in the definition but never mapped to events.
pub const ARM9_ANNOUNCED_REGISTERS: [RegisterSpec; 2] = [
    register(
        Device::RenderingEngine,
        rendering::DISP_1DOT_DEPTH,
        "DISP_1DOT_DEPTH",
        0x0400_0610,
    ),
    register(
        Device::RenderingEngine,
        rendering::ALPHA_TEST_REF,
        "ALPHA_TEST_REF",
        0x0400_0340,
    ),
];

/// Write-only geometry command registers.
pub const ARM9_GEOMETRY_COMMANDS: [RegisterSpec; 2] = [
    write_only(
        Device::GeometryEngine,
        geometry::SWAP_BUFFERS,
        "SWAP_BUFFERS",
        0x0400_0540,
    ),
    write_only(Device::GeometryEngine, geometry::VIEWPORT, "VIEWPORT", 0x0400_0580),
];

const REGISTER_TABLE_LEN: usize =
    ARM9_REGISTERS.len() + ARM9_ANNOUNCED_REGISTERS.len() + ARM9_GEOMETRY_COMMANDS.len();

const _: () = assert_unique_addresses();

const fn assert_unique_addresses() {
    let mut outer = 0;
    while outer < REGISTER_TABLE_LEN {
        let mut inner = outer + 1;
        while inner < REGISTER_TABLE_LEN {
            assert!(
                spec_at(outer).address != spec_at(inner).address,
                "device register addresses must be unique"
            );
            inner += 1;
        }
        outer += 1;
    }
}

const fn spec_at(index: usize) -> RegisterSpec {
    let announced = ARM9_REGISTERS.len();
    let geometry = announced + ARM9_ANNOUNCED_REGISTERS.len();
    if index < announced {
        ARM9_REGISTERS[index]
    } else if index < geometry {
        ARM9_ANNOUNCED_REGISTERS[index - announced]
    } else {
        ARM9_GEOMETRY_COMMANDS[index - geometry]
    }
}

/// One device in a device definition.
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Deserialize, serde::Serialize))]
pub struct DeviceInfo {
    /// Numeric device id.
    pub id: u32,
    /// Display name.
    pub name: String,
    /// Device category.
    pub kind: DeviceKind,
    /// Registers owned by the device.
    pub registers: Vec<RegisterInfo>,
}

/// One register in a device definition.
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Deserialize, serde::Serialize))]
pub struct RegisterInfo {
    /// Register id within the device.
    pub id: u32,
    /// Register name.
    pub name: String,
    /// Bus address.
    pub address: u32,
}

/// Devices and registers announced at the start of a trace.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Deserialize, serde::Serialize))]
pub struct DeviceDefinition {
    /// Devices in id order.
    pub devices: Vec<DeviceInfo>,
}

impl DeviceDefinition {
    /// Total number of registers across all devices.
    #[must_use]
    pub fn register_count(&self) -> usize {
        self.devices.iter().map(|device| device.registers.len()).sum()
    }

    /// Looks up a register by bus address.
    #[must_use]
    pub fn register_at(&self, address: u32) -> Option<(&DeviceInfo, &RegisterInfo)> {
        self.devices.iter().find_map(|device| {
            device
                .registers
                .iter()
                .find(|register| register.address == address)
                .map(|register| (device, register))
        })
    }
}

/// Decoded geometry-engine command.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Deserialize, serde::Serialize))]
pub enum GeometryCommand {
    /// End of frame; selects sorting and depth-buffer modes for the next one.
    SwapBuffers {
        /// Translucent polygons are Y-sorted manually.
        manual_sort: bool,
        /// Depth buffering uses W values instead of Z values.
        w_buffering: bool,
    },
    /// Viewport rectangle.
    Viewport {
        /// Left edge.
        x1: u8,
        /// Bottom edge.
        y1: u8,
        /// Right edge.
        x2: u8,
        /// Top edge.
        y2: u8,
    },
}

impl GeometryCommand {
    /// Decodes a write of `value` to geometry command register `id`.
    #[must_use]
    pub const fn decode(id: u32, value: u32) -> Option<Self> {
        match id {
            geometry::SWAP_BUFFERS => Some(Self::SwapBuffers {
                manual_sort: value & 1 != 0,
                w_buffering: value & 2 != 0,
            }),
            geometry::VIEWPORT => {
                let [x1, y1, x2, y2] = value.to_le_bytes();
                Some(Self::Viewport { x1, y1, x2, y2 })
            }
            _ => None,
        }
    }

    /// Register id of this command.
    #[must_use]
    pub const fn register(self) -> u32 {
        match self {
            Self::SwapBuffers { .. } => geometry::SWAP_BUFFERS,
            Self::Viewport { .. } => geometry::VIEWPORT,
        }
    }
}

impl fmt::Display for GeometryCommand {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match *self {
            Self::SwapBuffers {
                manual_sort,
                w_buffering,
            } => write!(
                f,
                "SWAP_BUFFERS [Y-sorting: {}, depth buffering: {}]",
                if manual_sort { "manual-sort" } else { "auto-sort" },
                if w_buffering { "W-value" } else { "Z-value" }
            ),
            Self::Viewport { x1, y1, x2, y2 } => {
                write!(f, "VIEWPORT [X1 = {x1}, Y1 = {y1}, X2 = {x2}, Y2 = {y2}]")
            }
        }
    }
}

/// Source of device knowledge for the trace reader.
pub trait DeviceCatalog {
    /// Devices and registers announced in the trace prologue.
    fn definition(&self) -> DeviceDefinition;

    /// Maps a raw memory access to a device event, or `None` when the
    /// address is not a known device register.
    fn map_access(&self, address: u32, value: u32, kind: AccessKind, tid: u32) -> Option<Event>;
}

/// Device catalog of the ARM9 side of the Nintendo DS.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Arm9Devices;

impl Arm9Devices {
    /// Looks up a register or geometry command by bus address.
    #[must_use]
    pub fn lookup(address: u32) -> Option<RegisterSpec> {
        ARM9_REGISTERS
            .iter()
            .chain(ARM9_GEOMETRY_COMMANDS.iter())
            .find(|spec| spec.address == address)
            .copied()
    }
}

impl DeviceCatalog for Arm9Devices {
    fn definition(&self) -> DeviceDefinition {
        let devices = Device::ALL
            .iter()
            .map(|&device| DeviceInfo {
                id: device.id(),
                name: device.name().to_string(),
                kind: device.kind(),
                registers: ARM9_REGISTERS
                    .iter()
                    .chain(ARM9_ANNOUNCED_REGISTERS.iter())
                    .chain(ARM9_GEOMETRY_COMMANDS.iter())
                    .filter(|spec| spec.device == device)
                    .map(|spec| RegisterInfo {
                        id: spec.id,
                        name: spec.name.to_string(),
                        address: spec.address,
                    })
                    .collect(),
            })
            .collect();
        DeviceDefinition { devices }
    }

    fn map_access(&self, address: u32, value: u32, kind: AccessKind, tid: u32) -> Option<Event> {
        let spec = Self::lookup(address)?;
        if spec.write_only {
            if !kind.is_write() {
                return None;
            }
            return GeometryCommand::decode(spec.id, value)
                .map(|command| Event::Geometry(GeometryEvent { command, tid }));
        }
        Some(Event::DeviceRegister(DeviceRegisterEvent {
            device: spec.device,
            register: spec.id,
            name: spec.name,
            address,
            value,
            kind,
            tid,
        }))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn devices_have_stable_ids_and_names() {
        let expected = [
            (0, "ARM946E-S"),
            (1, "Memory Control"),
            (2, "Video"),
            (3, "Video Capture"),
            (4, "Rendering Engine"),
            (5, "Geometry Engine"),
        ];
        for (device, (id, name)) in Device::ALL.iter().zip(expected) {
            assert_eq!(device.id(), id);
            assert_eq!(device.name(), name);
            assert_eq!(Device::from_id(id), Some(*device));
        }
        assert_eq!(Device::from_id(6), None);
    }

    #[test]
    fn lookup_covers_memory_control_block() {
        let names: Vec<&str> = (0x0400_0240..=0x0400_0249)
            .map(|address| Arm9Devices::lookup(address).map_or("-", |spec| spec.name))
            .collect();
        assert_eq!(
            names,
            [
                "VRAMCNT_A",
                "VRAMCNT_B",
                "VRAMCNT_C",
                "VRAMCNT_D",
                "VRAMCNT_E",
                "VRAMCNT_F",
                "VRAMCNT_G",
                "WRAMCNT",
                "VRAMCNT_H",
                "VRAMCNT_I",
            ]
        );
        assert_eq!(Arm9Devices::lookup(0x0400_0204).map(|spec| spec.id), Some(0));
        assert_eq!(Arm9Devices::lookup(0x0400_0340), None);
    }

    #[test]
    fn definition_groups_registers_by_device() {
        let definition = Arm9Devices.definition();
        assert_eq!(definition.devices.len(), 6);
        assert!(definition.devices[0].registers.is_empty());
        assert_eq!(definition.devices[1].registers.len(), 11);
        assert_eq!(definition.devices[5].registers.len(), 3);
        assert_eq!(definition.register_count(), 21);

        let (device, register) = definition.register_at(0x0400_0060).expect("DISP3DCNT");
        assert_eq!(device.name, "Rendering Engine");
        assert_eq!(device.kind, DeviceKind::Graphics);
        assert_eq!(register.name, "DISP3DCNT");
    }

    #[test]
    fn announced_registers_are_defined_but_not_mapped() {
        let definition = Arm9Devices.definition();
        let rendering: Vec<(u32, &str, u32)> = definition.devices[4]
            .registers
            .iter()
            .map(|register| (register.id, register.name.as_str(), register.address))
            .collect();
        assert_eq!(
            rendering,
            [
                (0, "DISP3DCNT", 0x0400_0060),
                (2, "DISP_1DOT_DEPTH", 0x0400_0610),
                (10, "ALPHA_TEST_REF", 0x0400_0340),
            ]
        );
        for address in [0x0400_0610, 0x0400_0340] {
            assert!(Arm9Devices
                .map_access(address, 1, AccessKind::Write, 0)
                .is_none());
        }
    }

    #[test]
    fn plain_registers_map_reads_and_writes() {
        for kind in [AccessKind::Read, AccessKind::Write] {
            let event = Arm9Devices
                .map_access(0x0400_0000, 0x0001_0000, kind, 2)
                .expect("DISPCNT");
            let Event::DeviceRegister(access) = event else {
                panic!("expected device register event");
            };
            assert_eq!(access.device, Device::Video);
            assert_eq!(access.register, 1);
            assert_eq!(access.kind, kind);
            assert_eq!(access.tid, 2);
        }
    }

    #[test]
    fn geometry_commands_map_writes_only() {
        assert!(Arm9Devices
            .map_access(0x0400_0540, 3, AccessKind::Read, 0)
            .is_none());
        let event = Arm9Devices
            .map_access(0x0400_0540, 1, AccessKind::Write, 0)
            .expect("swap");
        assert_eq!(
            event.to_string(),
            "SWAP_BUFFERS [Y-sorting: manual-sort, depth buffering: Z-value]"
        );
    }

    #[test]
    fn unknown_addresses_do_not_map() {
        assert!(Arm9Devices
            .map_access(0x0200_0000, 0, AccessKind::Write, 0)
            .is_none());
    }

    #[test]
    fn geometry_messages() {
        let swap = GeometryCommand::decode(geometry::SWAP_BUFFERS, 2).expect("swap");
        assert_eq!(
            swap.to_string(),
            "SWAP_BUFFERS [Y-sorting: auto-sort, depth buffering: W-value]"
        );
        let viewport = GeometryCommand::decode(geometry::VIEWPORT, 0xBFFF_0000).expect("viewport");
        assert_eq!(
            viewport.to_string(),
            "VIEWPORT [X1 = 0, Y1 = 0, X2 = 255, Y2 = 191]"
        );
        assert_eq!(viewport.register(), geometry::VIEWPORT);
        assert_eq!(GeometryCommand::decode(geometry::GXFIFO, 0), None);
    }
}
