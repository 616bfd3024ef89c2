//! Little-endian record framing of the binary trace format.
//!
//! A trace is a sequence of records, each introduced by a one-byte
//! [`RecordTag`]. [`WireReader`] tracks the byte offset so corruption can be
//! reported precisely; [`TraceWriter`] produces the same framing.

use std::io::{self, ErrorKind, Read, Write};

use crate::memory::{AccessKind, AccessSize};

/// Control-byte bit announcing an explicit CPSR in a step record.
pub const STEP_CONTROL_CPSR: u8 = 1 << 0;

/// One-byte record tag.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(u8)]
pub enum RecordTag {
    /// Obsolete step layout; rejected by the reader.
    LegacyStep = 0,
    /// CPU step.
    Step = 1,
    /// 8-bit read.
    Read8 = 2,
    /// 16-bit read.
    Read16 = 3,
    /// 32-bit read.
    Read32 = 4,
    /// 8-bit write.
    Write8 = 5,
    /// 16-bit write.
    Write16 = 6,
    /// 32-bit write.
    Write32 = 7,
    /// Memory dump.
    Dump = 8,
    /// Interrupt entry.
    Interrupt = 9,
}

impl RecordTag {
    /// Decodes a raw tag byte.
    #[must_use]
    pub const fn from_u8(tag: u8) -> Option<Self> {
        match tag {
            0 => Some(Self::LegacyStep),
            1 => Some(Self::Step),
            2 => Some(Self::Read8),
            3 => Some(Self::Read16),
            4 => Some(Self::Read32),
            5 => Some(Self::Write8),
            6 => Some(Self::Write16),
            7 => Some(Self::Write32),
            8 => Some(Self::Dump),
            9 => Some(Self::Interrupt),
            _ => None,
        }
    }

    /// Width and direction of a memory-access record.
    #[must_use]
    pub const fn access(self) -> Option<(AccessSize, AccessKind)> {
        match self {
            Self::Read8 => Some((AccessSize::Byte, AccessKind::Read)),
            Self::Read16 => Some((AccessSize::Halfword, AccessKind::Read)),
            Self::Read32 => Some((AccessSize::Word, AccessKind::Read)),
            Self::Write8 => Some((AccessSize::Byte, AccessKind::Write)),
            Self::Write16 => Some((AccessSize::Halfword, AccessKind::Write)),
            Self::Write32 => Some((AccessSize::Word, AccessKind::Write)),
            Self::LegacyStep | Self::Step | Self::Dump | Self::Interrupt => None,
        }
    }

    /// Tag of the memory-access record for `size` and `kind`.
    #[must_use]
    pub const fn for_access(size: AccessSize, kind: AccessKind) -> Self {
        match (kind, size) {
            (AccessKind::Read, AccessSize::Byte) => Self::Read8,
            (AccessKind::Read, AccessSize::Halfword) => Self::Read16,
            (AccessKind::Read, AccessSize::Word) => Self::Read32,
            (AccessKind::Write, AccessSize::Byte) => Self::Write8,
            (AccessKind::Write, AccessSize::Halfword) => Self::Write16,
            (AccessKind::Write, AccessSize::Word) => Self::Write32,
        }
    }
}

/// Offset-tracking little-endian reader.
#[derive(Debug)]
pub struct WireReader<R> {
    inner: R,
    offset: u64,
}

impl<R: Read> WireReader<R> {
    /// Wraps a byte source positioned at offset zero.
    pub const fn new(inner: R) -> Self {
        Self { inner, offset: 0 }
    }

    /// Number of bytes consumed so far.
    #[must_use]
    pub const fn offset(&self) -> u64 {
        self.offset
    }

    /// Reads the next tag byte; `Ok(None)` when the source ends cleanly
    /// before it.
    ///
    /// # Errors
    ///
    /// Propagates I/O failures of the underlying source.
    pub fn read_tag(&mut self) -> io::Result<Option<u8>> {
        let mut byte = [0_u8; 1];
        loop {
            match self.inner.read(&mut byte) {
                Ok(0) => return Ok(None),
                Ok(_) => {
                    self.offset += 1;
                    return Ok(Some(byte[0]));
                }
                Err(error) if error.kind() == ErrorKind::Interrupted => {}
                Err(error) => return Err(error),
            }
        }
    }

    fn read_array<const N: usize>(&mut self) -> io::Result<[u8; N]> {
        let mut bytes = [0_u8; N];
        self.inner.read_exact(&mut bytes)?;
        self.offset += N as u64;
        Ok(bytes)
    }

    /// Reads one byte.
    ///
    /// # Errors
    ///
    /// Returns [`ErrorKind::UnexpectedEof`] when the source is exhausted.
    pub fn read_u8(&mut self) -> io::Result<u8> {
        Ok(self.read_array::<1>()?[0])
    }

    /// Reads a little-endian `u16`.
    ///
    /// # Errors
    ///
    /// Returns [`ErrorKind::UnexpectedEof`] when the source is exhausted.
    pub fn read_u16(&mut self) -> io::Result<u16> {
        self.read_array().map(u16::from_le_bytes)
    }

    /// Reads a little-endian `u32`.
    ///
    /// # Errors
    ///
    /// Returns [`ErrorKind::UnexpectedEof`] when the source is exhausted.
    pub fn read_u32(&mut self) -> io::Result<u32> {
        self.read_array().map(u32::from_le_bytes)
    }

    /// Reads a little-endian `u64`.
    ///
    /// # Errors
    ///
    /// Returns [`ErrorKind::UnexpectedEof`] when the source is exhausted.
    pub fn read_u64(&mut self) -> io::Result<u64> {
        self.read_array().map(u64::from_le_bytes)
    }

    /// Reads a zero-extended value of the given access width.
    ///
    /// # Errors
    ///
    /// Returns [`ErrorKind::UnexpectedEof`] when the source is exhausted.
    pub fn read_sized(&mut self, size: AccessSize) -> io::Result<u32> {
        match size {
            AccessSize::Byte => self.read_u8().map(u32::from),
            AccessSize::Halfword => self.read_u16().map(u32::from),
            AccessSize::Word => self.read_u32(),
        }
    }

    /// Reads exactly `len` bytes.
    ///
    /// The buffer grows as data arrives, so a corrupt length cannot force a
    /// large up-front allocation.
    ///
    /// # Errors
    ///
    /// Returns [`ErrorKind::UnexpectedEof`] when fewer than `len` bytes remain.
    pub fn read_bytes(&mut self, len: u32) -> io::Result<Vec<u8>> {
        let mut data = Vec::new();
        let read = (&mut self.inner)
            .take(u64::from(len))
            .read_to_end(&mut data)?;
        self.offset += read as u64;
        if data.len() == len as usize {
            Ok(data)
        } else {
            Err(io::Error::from(ErrorKind::UnexpectedEof))
        }
    }
}

/// Register values of one step record.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StepRecord {
    /// Explicit CPSR; `None` inherits the parent's.
    pub cpsr: Option<u32>,
    /// Register override mask, bit `i` for register `i`.
    pub mask: u16,
    /// Raw instruction word.
    pub code: u32,
    /// Step index.
    pub step: u64,
    /// One value per set mask bit, ascending register order.
    pub values: Vec<u32>,
}

/// Encoder producing the framing understood by the trace reader.
#[derive(Debug)]
pub struct TraceWriter<W> {
    inner: W,
}

impl<W: Write> TraceWriter<W> {
    /// Wraps a byte sink.
    pub const fn new(inner: W) -> Self {
        Self { inner }
    }

    /// Returns the underlying sink.
    pub fn into_inner(self) -> W {
        self.inner
    }

    /// Writes a step record.
    ///
    /// # Errors
    ///
    /// Returns [`ErrorKind::InvalidInput`] when the number of values does not
    /// match the mask population, and propagates sink failures.
    pub fn step(&mut self, record: &StepRecord) -> io::Result<()> {
        if record.values.len() != record.mask.count_ones() as usize {
            return Err(io::Error::new(
                ErrorKind::InvalidInput,
                "step values must match register mask population",
            ));
        }
        let control = if record.cpsr.is_some() {
            STEP_CONTROL_CPSR
        } else {
            0
        };
        self.inner.write_all(&[RecordTag::Step as u8, control])?;
        self.inner.write_all(&record.mask.to_le_bytes())?;
        self.inner.write_all(&record.code.to_le_bytes())?;
        self.inner.write_all(&record.step.to_le_bytes())?;
        if let Some(cpsr) = record.cpsr {
            self.inner.write_all(&cpsr.to_le_bytes())?;
        }
        for value in &record.values {
            self.inner.write_all(&value.to_le_bytes())?;
        }
        Ok(())
    }

    /// Writes a memory-access record; `value` is truncated to the access width.
    ///
    /// # Errors
    ///
    /// Propagates sink failures.
    #[allow(clippy::cast_possible_truncation)]
    pub fn access(
        &mut self,
        kind: AccessKind,
        size: AccessSize,
        address: u32,
        value: u32,
    ) -> io::Result<()> {
        self.inner
            .write_all(&[RecordTag::for_access(size, kind) as u8])?;
        match size {
            AccessSize::Byte => self.inner.write_all(&[value as u8])?,
            AccessSize::Halfword => self.inner.write_all(&(value as u16).to_le_bytes())?,
            AccessSize::Word => self.inner.write_all(&value.to_le_bytes())?,
        }
        self.inner.write_all(&address.to_le_bytes())
    }

    /// Writes a memory-dump record.
    ///
    /// # Errors
    ///
    /// Returns [`ErrorKind::InvalidInput`] for blobs longer than `u32::MAX`
    /// bytes, and propagates sink failures.
    pub fn dump(&mut self, address: u32, data: &[u8]) -> io::Result<()> {
        let len = u32::try_from(data.len())
            .map_err(|_| io::Error::new(ErrorKind::InvalidInput, "dump too large"))?;
        self.inner.write_all(&[RecordTag::Dump as u8])?;
        self.inner.write_all(&address.to_le_bytes())?;
        self.inner.write_all(&len.to_le_bytes())?;
        self.inner.write_all(data)
    }

    /// Writes an interrupt record.
    ///
    /// # Errors
    ///
    /// Propagates sink failures.
    pub fn interrupt(&mut self) -> io::Result<()> {
        self.inner.write_all(&[RecordTag::Interrupt as u8])
    }

    /// Writes a raw tag byte without a body.
    ///
    /// # Errors
    ///
    /// Propagates sink failures.
    pub fn raw_tag(&mut self, tag: u8) -> io::Result<()> {
        self.inner.write_all(&[tag])
    }

    /// Flushes the sink.
    ///
    /// # Errors
    ///
    /// Propagates sink failures.
    pub fn flush(&mut self) -> io::Result<()> {
        self.inner.flush()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn tags_roundtrip_through_bytes() {
        for raw in 0_u8..=9 {
            let tag = RecordTag::from_u8(raw).expect("tag in range");
            assert_eq!(tag as u8, raw);
        }
        assert_eq!(RecordTag::from_u8(10), None);
        assert_eq!(RecordTag::from_u8(0xFF), None);
    }

    #[test]
    fn access_tags_pair_with_widths() {
        assert_eq!(
            RecordTag::Write16.access(),
            Some((AccessSize::Halfword, AccessKind::Write))
        );
        assert_eq!(RecordTag::Step.access(), None);
        assert_eq!(
            RecordTag::for_access(AccessSize::Byte, AccessKind::Read),
            RecordTag::Read8
        );
    }

    #[test]
    fn reader_tracks_offset_and_endianness() {
        let bytes = [0x01, 0x34, 0x12, 0x78, 0x56, 0x34, 0x12, 0xAA];
        let mut reader = WireReader::new(&bytes[..]);
        assert_eq!(reader.read_tag().expect("tag"), Some(1));
        assert_eq!(reader.read_u16().expect("u16"), 0x1234);
        assert_eq!(reader.read_u32().expect("u32"), 0x1234_5678);
        assert_eq!(reader.offset(), 7);
        assert_eq!(reader.read_sized(AccessSize::Byte).expect("u8"), 0xAA);
        assert_eq!(reader.read_tag().expect("eof"), None);
        assert_eq!(reader.offset(), 8);
    }

    #[test]
    fn short_reads_are_unexpected_eof() {
        let mut reader = WireReader::new(&[0x01, 0x02][..]);
        let error = reader.read_u32().expect_err("truncated");
        assert_eq!(error.kind(), ErrorKind::UnexpectedEof);

        let mut reader = WireReader::new(&[0x01, 0x02][..]);
        let error = reader.read_bytes(3).expect_err("truncated");
        assert_eq!(error.kind(), ErrorKind::UnexpectedEof);
    }

    #[test]
    fn writer_emits_step_framing() {
        let mut writer = TraceWriter::new(Vec::new());
        writer
            .step(&StepRecord {
                cpsr: Some(0x1F),
                mask: 1 << 15,
                code: 0xE1A0_0000,
                step: 7,
                values: vec![0x0200_0008],
            })
            .expect("write");
        let bytes = writer.into_inner();
        assert_eq!(bytes[0], RecordTag::Step as u8);
        assert_eq!(bytes[1], STEP_CONTROL_CPSR);
        assert_eq!(&bytes[2..4], &0x8000_u16.to_le_bytes());
        assert_eq!(&bytes[4..8], &0xE1A0_0000_u32.to_le_bytes());
        assert_eq!(&bytes[8..16], &7_u64.to_le_bytes());
        assert_eq!(&bytes[16..20], &0x1F_u32.to_le_bytes());
        assert_eq!(&bytes[20..24], &0x0200_0008_u32.to_le_bytes());
        assert_eq!(bytes.len(), 24);
    }

    #[test]
    fn writer_rejects_mismatched_values() {
        let mut writer = TraceWriter::new(Vec::new());
        let error = writer
            .step(&StepRecord {
                cpsr: None,
                mask: 0b11,
                code: 0,
                step: 0,
                values: vec![1],
            })
            .expect_err("mismatch");
        assert_eq!(error.kind(), ErrorKind::InvalidInput);
    }

    #[test]
    fn writer_emits_access_value_before_address() {
        let mut writer = TraceWriter::new(Vec::new());
        writer
            .access(AccessKind::Write, AccessSize::Halfword, 0x0400_0540, 0x1_0003)
            .expect("write");
        assert_eq!(
            writer.into_inner(),
            [6, 0x03, 0x00, 0x40, 0x05, 0x00, 0x04]
        );
    }
}
