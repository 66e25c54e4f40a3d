//! Backend contract consumed by typed views and the search engine.
//!
//! A backend is the emulated machine's address space. Bus-mapped accesses go
//! through the emulated address bus and may have side effects (hardware
//! registers that count reads, bank-select latches). Raw accesses address
//! the underlying storage directly, optionally selecting a bank/segment, and
//! never perturb emulated state. The split is visible in the receiver types:
//! bus reads take `&mut self`, raw reads take `&self`.

use std::ops::Range;

use crate::search::scan::{rescan_records, scan_blocks};
use crate::{AccessWidth, MemoryFlags, SearchKind};

/// Segment identifier meaning "non-segmented / resolve through the bus map".
pub const UNSEGMENTED: i32 = -1;

/// Access rights of one memory block, as seen by search eligibility filters.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Deserialize, serde::Serialize))]
pub struct BlockAccess {
    /// Block contents can be read by the emulated CPU.
    pub readable: bool,
    /// Block contents can be written by the emulated CPU.
    pub writable: bool,
}

impl BlockAccess {
    /// ROM-like block.
    pub const READ_ONLY: Self = Self {
        readable: true,
        writable: false,
    };
    /// Write-only latch block.
    pub const WRITE_ONLY: Self = Self {
        readable: false,
        writable: true,
    };
    /// RAM-like block.
    pub const READ_WRITE: Self = Self {
        readable: true,
        writable: true,
    };
}

/// Descriptor of one contiguous block on the emulated bus.
///
/// A block may carry a banked window `[segment_start, end)` whose contents
/// depend on the selected segment; `[start, segment_start)` is fixed.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Deserialize, serde::Serialize))]
pub struct MemoryBlock {
    /// Backend-assigned identifier.
    pub id: u32,
    /// Short human-readable name (`"wram"`, `"cart"`).
    pub name: String,
    /// Inclusive bus start address.
    pub start: u32,
    /// Exclusive bus end address.
    pub end: u32,
    /// Start of the banked window; equals `end` for unbanked blocks.
    pub segment_start: u32,
    /// Number of banks behind the window; `0` or `1` for unbanked blocks.
    pub segments: u32,
    /// Access rights.
    pub access: BlockAccess,
}

impl MemoryBlock {
    /// Bus-visible length in bytes.
    #[must_use]
    pub const fn len(&self) -> u32 {
        self.end.saturating_sub(self.start)
    }

    /// Returns `true` for zero-length blocks.
    #[must_use]
    pub const fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Returns `true` when `address` is mapped by this block.
    #[must_use]
    pub const fn contains(&self, address: u32) -> bool {
        address >= self.start && address < self.end
    }

    /// Returns `true` when the block exposes more than one bank.
    #[must_use]
    pub const fn is_banked(&self) -> bool {
        self.segments > 1 && self.segment_start < self.end
    }

    /// Returns `true` when `address` falls inside the banked window.
    #[must_use]
    pub const fn in_window(&self, address: u32) -> bool {
        self.is_banked() && address >= self.segment_start && address < self.end
    }

    /// Address ranges to visit during a scan, paired with the segment used
    /// to read them: the fixed part once unsegmented, the banked window once
    /// per segment.
    #[must_use]
    pub fn scan_windows(&self) -> Vec<(Range<u32>, i32)> {
        if !self.is_banked() {
            return vec![(self.start..self.end, UNSEGMENTED)];
        }
        let mut windows = Vec::with_capacity(self.segments as usize + 1);
        if self.segment_start > self.start {
            windows.push((self.start..self.segment_start, UNSEGMENTED));
        }
        for segment in 0..self.segments {
            if let Ok(segment) = i32::try_from(segment) {
                windows.push((self.segment_start..self.end, segment));
            }
        }
        windows
    }
}

/// Untyped result record exchanged with a backend's search primitives.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Deserialize, serde::Serialize))]
pub struct SearchRecord {
    /// Absolute bus address of the match.
    pub address: u32,
    /// Segment the match was read through, or [`UNSEGMENTED`].
    pub segment: i32,
    /// Type tag; see [`SearchRecord::TAG_INT`] and friends.
    pub type_tag: u8,
    /// Byte width of an integer match or byte length of a string match.
    pub width: u32,
    /// Scale divisor: displayed value is raw value times divisor.
    pub divisor: u32,
}

impl SearchRecord {
    /// Integer match found by an explicit-width search.
    pub const TAG_INT: u8 = 0x01;
    /// Integer match found by a guessing search.
    pub const TAG_GUESS: u8 = 0x02;
    /// Byte-pattern match.
    pub const TAG_STRING: u8 = 0x03;
}

/// Resolved predicate parameters handed to a backend search primitive.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SearchParams {
    /// Search mode of an initial scan.
    pub kind: SearchKind,
    /// Block eligibility filter.
    pub flags: MemoryFlags,
    /// Integer readings of the target; empty when the target is not numeric.
    pub ints: Vec<i64>,
    /// Byte pattern of the target.
    pub pattern: Vec<u8>,
    /// Divisors tried by guessing scans.
    pub divisors: Vec<u32>,
    /// Absolute bus range results must fall into.
    pub region: Range<u64>,
}

/// The emulated address space a memory space is layered over.
pub trait AddressSpace {
    /// Bus-mapped 8-bit read. May have side effects.
    fn bus_read8(&mut self, address: u32) -> u8;
    /// Bus-mapped 16-bit read. May have side effects.
    fn bus_read16(&mut self, address: u32) -> u16;
    /// Bus-mapped 32-bit read. May have side effects.
    fn bus_read32(&mut self, address: u32) -> u32;
    /// Bus-mapped 8-bit write.
    fn bus_write8(&mut self, address: u32, value: u8);
    /// Bus-mapped 16-bit write.
    fn bus_write16(&mut self, address: u32, value: u16);
    /// Bus-mapped 32-bit write.
    fn bus_write32(&mut self, address: u32, value: u32);

    /// Side-effect-free 8-bit read through `segment`.
    fn raw_read8(&self, address: u32, segment: i32) -> u8;
    /// Side-effect-free 8-bit write through `segment`.
    fn raw_write8(&mut self, address: u32, segment: i32, value: u8);

    /// Side-effect-free little-endian 16-bit read through `segment`.
    fn raw_read16(&self, address: u32, segment: i32) -> u16 {
        u16::from_le_bytes([
            self.raw_read8(address, segment),
            self.raw_read8(address.wrapping_add(1), segment),
        ])
    }

    /// Side-effect-free little-endian 32-bit read through `segment`.
    fn raw_read32(&self, address: u32, segment: i32) -> u32 {
        u32::from_le_bytes([
            self.raw_read8(address, segment),
            self.raw_read8(address.wrapping_add(1), segment),
            self.raw_read8(address.wrapping_add(2), segment),
            self.raw_read8(address.wrapping_add(3), segment),
        ])
    }

    /// Side-effect-free little-endian 16-bit write through `segment`.
    fn raw_write16(&mut self, address: u32, segment: i32, value: u16) {
        for (offset, byte) in (0_u32..).zip(value.to_le_bytes()) {
            self.raw_write8(address.wrapping_add(offset), segment, byte);
        }
    }

    /// Side-effect-free little-endian 32-bit write through `segment`.
    fn raw_write32(&mut self, address: u32, segment: i32, value: u32) {
        for (offset, byte) in (0_u32..).zip(value.to_le_bytes()) {
            self.raw_write8(address.wrapping_add(offset), segment, byte);
        }
    }

    /// Memory map consulted by the default search primitives.
    fn blocks(&self) -> &[MemoryBlock];

    /// Initial scan over every eligible block, capped at `limit` records.
    fn scan(&self, params: &SearchParams, limit: usize) -> Vec<SearchRecord> {
        scan_blocks(self, params, limit)
    }

    /// Narrowing scan: re-validates `prior` against the current target.
    fn rescan(&self, params: &SearchParams, prior: &[SearchRecord]) -> Vec<SearchRecord> {
        rescan_records(self, params, prior)
    }
}

/// Dispatches a bus-mapped read of `width` and widens the raw bits.
pub fn bus_read<B: AddressSpace + ?Sized>(backend: &mut B, width: AccessWidth, address: u32) -> u32 {
    match width {
        AccessWidth::Byte => u32::from(backend.bus_read8(address)),
        AccessWidth::Half => u32::from(backend.bus_read16(address)),
        AccessWidth::Word => backend.bus_read32(address),
    }
}

/// Dispatches a bus-mapped write of `width`; `bits` must already be masked.
#[allow(clippy::cast_possible_truncation)]
pub fn bus_write<B: AddressSpace + ?Sized>(
    backend: &mut B,
    width: AccessWidth,
    address: u32,
    bits: u32,
) {
    match width {
        AccessWidth::Byte => backend.bus_write8(address, bits as u8),
        AccessWidth::Half => backend.bus_write16(address, bits as u16),
        AccessWidth::Word => backend.bus_write32(address, bits),
    }
}

/// Dispatches a raw read of `width` through `segment`.
pub fn raw_read<B: AddressSpace + ?Sized>(
    backend: &B,
    width: AccessWidth,
    address: u32,
    segment: i32,
) -> u32 {
    match width {
        AccessWidth::Byte => u32::from(backend.raw_read8(address, segment)),
        AccessWidth::Half => u32::from(backend.raw_read16(address, segment)),
        AccessWidth::Word => backend.raw_read32(address, segment),
    }
}

/// Dispatches a raw write of `width` through `segment`; `bits` must already be masked.
#[allow(clippy::cast_possible_truncation)]
pub fn raw_write<B: AddressSpace + ?Sized>(
    backend: &mut B,
    width: AccessWidth,
    address: u32,
    segment: i32,
    bits: u32,
) {
    match width {
        AccessWidth::Byte => backend.raw_write8(address, segment, bits as u8),
        AccessWidth::Half => backend.raw_write16(address, segment, bits as u16),
        AccessWidth::Word => backend.raw_write32(address, segment, bits),
    }
}

#[cfg(test)]
mod tests {
    use super::{BlockAccess, MemoryBlock, UNSEGMENTED};

    fn block(start: u32, end: u32, segment_start: u32, segments: u32) -> MemoryBlock {
        MemoryBlock {
            id: 0,
            name: "test".into(),
            start,
            end,
            segment_start,
            segments,
            access: BlockAccess::READ_WRITE,
        }
    }

    #[test]
    fn unbanked_block_scans_once_unsegmented() {
        let block = block(0x100, 0x200, 0x200, 0);
        assert!(!block.is_banked());
        assert_eq!(block.len(), 0x100);
        assert_eq!(block.scan_windows(), vec![(0x100..0x200, UNSEGMENTED)]);
    }

    #[test]
    fn banked_block_scans_fixed_part_then_each_segment() {
        let block = block(0x4000, 0x8000, 0x6000, 3);
        assert!(block.is_banked());
        assert!(block.in_window(0x6000));
        assert!(!block.in_window(0x5FFF));
        assert_eq!(
            block.scan_windows(),
            vec![
                (0x4000..0x6000, UNSEGMENTED),
                (0x6000..0x8000, 0),
                (0x6000..0x8000, 1),
                (0x6000..0x8000, 2),
            ]
        );
    }

    #[test]
    fn fully_banked_block_has_no_fixed_window() {
        let block = block(0x0, 0x10, 0x0, 2);
        assert_eq!(block.scan_windows(), vec![(0x0..0x10, 0), (0x0..0x10, 1)]);
    }
}
