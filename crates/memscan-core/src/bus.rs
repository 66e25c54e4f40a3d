//! Reference banked-bus backend.
//!
//! [`BankedBus`] models a little-endian machine bus assembled from owned
//! byte blocks. Blocks may carry a banked window whose contents depend on
//! the active bank, and single-byte I/O registers may sit anywhere on the
//! bus. Register reads and bank switches are the side effects that make the
//! bus/raw split observable.

use tracing::{debug, trace};

use crate::{AddressSpace, BlockAccess, MemoryBlock, UNSEGMENTED};

/// Behaviour of one memory-mapped I/O register.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Deserialize, serde::Serialize))]
pub enum RegisterKind {
    /// Returns its latch and then increments it on every bus read. A bus
    /// write reloads the latch.
    ReadCounter,
    /// A bus write selects the active bank of block `block`, modulo its
    /// bank count.
    BankSelect {
        /// Identifier of the block whose window is switched.
        block: u32,
    },
}

/// A single-byte register mapped at `address`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Deserialize, serde::Serialize))]
pub struct IoRegister {
    /// Bus address of the register.
    pub address: u32,
    /// Register behaviour.
    pub kind: RegisterKind,
    /// Current latch value.
    pub value: u8,
}

#[derive(Debug, Clone)]
struct BlockStorage {
    fixed: Vec<u8>,
    banks: Vec<Vec<u8>>,
    active: u32,
}

/// Little-endian emulated bus over owned, optionally banked, byte blocks.
///
/// Unmapped bus reads return zero and unmapped writes are dropped. Bus
/// writes to non-writable blocks are ignored, while raw writes always land.
#[derive(Debug, Clone, Default)]
pub struct BankedBus {
    blocks: Vec<MemoryBlock>,
    storage: Vec<BlockStorage>,
    registers: Vec<IoRegister>,
}

impl BankedBus {
    /// Starts an empty bus description.
    #[must_use]
    pub fn builder() -> BankedBusBuilder {
        BankedBusBuilder::default()
    }

    /// A single read/write block named `ram` at address `0`, backed by
    /// `bytes`.
    #[must_use]
    pub fn flat(bytes: Vec<u8>) -> Self {
        Self::builder()
            .block("ram", 0, bytes, BlockAccess::READ_WRITE)
            .build()
    }

    /// Contents of the fixed (unbanked) part of block `id`.
    #[must_use]
    pub fn block_contents(&self, id: u32) -> Option<&[u8]> {
        let index = self.blocks.iter().position(|block| block.id == id)?;
        Some(self.storage[index].fixed.as_slice())
    }

    /// Active bank of block `id`, or `None` for unknown or unbanked blocks.
    #[must_use]
    pub fn active_bank(&self, id: u32) -> Option<u32> {
        let index = self.blocks.iter().position(|block| block.id == id)?;
        self.blocks[index]
            .is_banked()
            .then_some(self.storage[index].active)
    }

    /// Switches block `id` to `bank`, modulo its bank count. Returns `false`
    /// when the block is unknown or unbanked.
    pub fn select_bank(&mut self, id: u32, bank: u32) -> bool {
        let Some(index) = self.blocks.iter().position(|block| block.id == id) else {
            return false;
        };
        let block = &self.blocks[index];
        if !block.is_banked() {
            return false;
        }
        let bank = bank % block.segments;
        debug!(block = %block.name, bank, "bank selected");
        self.storage[index].active = bank;
        true
    }

    /// Current latch of the register at `address`, read without side
    /// effects.
    #[must_use]
    pub fn register_value(&self, address: u32) -> Option<u8> {
        self.register_index(address)
            .map(|index| self.registers[index].value)
    }

    fn register_index(&self, address: u32) -> Option<usize> {
        self.registers
            .iter()
            .position(|register| register.address == address)
    }

    fn block_index(&self, address: u32) -> Option<usize> {
        self.blocks.iter().position(|block| block.contains(address))
    }

    /// Resolves `address` to a storage cell. `segment` selects the bank for
    /// banked windows; a negative segment means the active bank.
    fn cell(&self, index: usize, address: u32, segment: i32) -> Option<(usize, Option<usize>)> {
        let block = &self.blocks[index];
        if block.in_window(address) {
            let bank = u32::try_from(segment).unwrap_or(self.storage[index].active);
            if bank >= block.segments {
                return None;
            }
            let offset = (address - block.segment_start) as usize;
            Some((offset, Some(bank as usize)))
        } else {
            Some(((address - block.start) as usize, None))
        }
    }

    fn load(&self, index: usize, address: u32, segment: i32) -> u8 {
        let storage = &self.storage[index];
        match self.cell(index, address, segment) {
            Some((offset, Some(bank))) => storage.banks[bank].get(offset).copied().unwrap_or(0),
            Some((offset, None)) => storage.fixed.get(offset).copied().unwrap_or(0),
            None => 0,
        }
    }

    fn store(&mut self, index: usize, address: u32, segment: i32, value: u8) {
        let cell = self.cell(index, address, segment);
        let storage = &mut self.storage[index];
        let slot = match cell {
            Some((offset, Some(bank))) => storage.banks[bank].get_mut(offset),
            Some((offset, None)) => storage.fixed.get_mut(offset),
            None => None,
        };
        if let Some(slot) = slot {
            *slot = value;
        }
    }
}

impl AddressSpace for BankedBus {
    fn bus_read8(&mut self, address: u32) -> u8 {
        if let Some(index) = self.register_index(address) {
            let register = &mut self.registers[index];
            let value = register.value;
            if register.kind == RegisterKind::ReadCounter {
                register.value = value.wrapping_add(1);
            }
            trace!(address, value, "register read");
            return value;
        }
        match self.block_index(address) {
            Some(index) if self.blocks[index].access.readable => {
                self.load(index, address, UNSEGMENTED)
            }
            _ => 0,
        }
    }

    fn bus_read16(&mut self, address: u32) -> u16 {
        u16::from_le_bytes([
            self.bus_read8(address),
            self.bus_read8(address.wrapping_add(1)),
        ])
    }

    fn bus_read32(&mut self, address: u32) -> u32 {
        u32::from_le_bytes([
            self.bus_read8(address),
            self.bus_read8(address.wrapping_add(1)),
            self.bus_read8(address.wrapping_add(2)),
            self.bus_read8(address.wrapping_add(3)),
        ])
    }

    fn bus_write8(&mut self, address: u32, value: u8) {
        if let Some(index) = self.register_index(address) {
            self.registers[index].value = value;
            if let RegisterKind::BankSelect { block } = self.registers[index].kind {
                self.select_bank(block, u32::from(value));
            }
            return;
        }
        match self.block_index(address) {
            Some(index) if self.blocks[index].access.writable => {
                self.store(index, address, UNSEGMENTED, value);
            }
            Some(index) => {
                trace!(
                    block = %self.blocks[index].name,
                    address,
                    "write to read-only block dropped"
                );
            }
            None => {}
        }
    }

    fn bus_write16(&mut self, address: u32, value: u16) {
        for (offset, byte) in (0_u32..).zip(value.to_le_bytes()) {
            self.bus_write8(address.wrapping_add(offset), byte);
        }
    }

    fn bus_write32(&mut self, address: u32, value: u32) {
        for (offset, byte) in (0_u32..).zip(value.to_le_bytes()) {
            self.bus_write8(address.wrapping_add(offset), byte);
        }
    }

    fn raw_read8(&self, address: u32, segment: i32) -> u8 {
        if let Some(value) = self.register_value(address) {
            return value;
        }
        self.block_index(address)
            .map_or(0, |index| self.load(index, address, segment))
    }

    fn raw_write8(&mut self, address: u32, segment: i32, value: u8) {
        if let Some(index) = self.register_index(address) {
            self.registers[index].value = value;
            return;
        }
        if let Some(index) = self.block_index(address) {
            self.store(index, address, segment, value);
        }
    }

    fn blocks(&self) -> &[MemoryBlock] {
        &self.blocks
    }
}

/// Incremental description of a [`BankedBus`].
///
/// Blocks receive sequential identifiers in insertion order, starting at
/// `0`. When blocks overlap, the first one added wins.
#[derive(Debug, Clone, Default)]
pub struct BankedBusBuilder {
    bus: BankedBus,
}

impl BankedBusBuilder {
    fn next_id(&self) -> u32 {
        u32::try_from(self.bus.blocks.len()).unwrap_or(u32::MAX)
    }

    /// Adds an unbanked block at `start` initialised from `contents`.
    #[must_use]
    pub fn block(
        mut self,
        name: &str,
        start: u32,
        contents: Vec<u8>,
        access: BlockAccess,
    ) -> Self {
        let len = u32::try_from(contents.len()).unwrap_or(u32::MAX);
        let end = start.saturating_add(len);
        let block = MemoryBlock {
            id: self.next_id(),
            name: name.to_owned(),
            start,
            end,
            segment_start: end,
            segments: 0,
            access,
        };
        self.bus.blocks.push(block);
        self.bus.storage.push(BlockStorage {
            fixed: contents,
            banks: Vec::new(),
            active: 0,
        });
        self
    }

    /// Adds a zero-filled block of `fixed_len` fixed bytes followed by a
    /// `window_len`-byte window backed by `segments` banks. Bank `0` starts
    /// active.
    #[must_use]
    pub fn banked_block(
        mut self,
        name: &str,
        start: u32,
        fixed_len: u32,
        window_len: u32,
        segments: u32,
        access: BlockAccess,
    ) -> Self {
        let segment_start = start.saturating_add(fixed_len);
        let end = segment_start.saturating_add(window_len);
        let block = MemoryBlock {
            id: self.next_id(),
            name: name.to_owned(),
            start,
            end,
            segment_start,
            segments,
            access,
        };
        let window = (end - segment_start) as usize;
        self.bus.blocks.push(block);
        self.bus.storage.push(BlockStorage {
            fixed: vec![0; (segment_start - start) as usize],
            banks: (0..segments).map(|_| vec![0; window]).collect(),
            active: 0,
        });
        self
    }

    /// Maps a register at `address` with a zero latch. Registers shadow
    /// any block at the same address.
    #[must_use]
    pub fn register(mut self, address: u32, kind: RegisterKind) -> Self {
        self.bus.registers.push(IoRegister {
            address,
            kind,
            value: 0,
        });
        self
    }

    /// Finishes the description.
    #[must_use]
    pub fn build(self) -> BankedBus {
        self.bus
    }
}

#[cfg(test)]
mod tests {
    use super::{BankedBus, RegisterKind};
    use crate::{AddressSpace, BlockAccess, UNSEGMENTED};

    fn cartridge() -> BankedBus {
        BankedBus::builder()
            .block("rom", 0x0000, vec![0x11; 0x100], BlockAccess::READ_ONLY)
            .banked_block("cart", 0x1000, 0x10, 0x10, 4, BlockAccess::READ_WRITE)
            .register(0x2000, RegisterKind::ReadCounter)
            .register(0x2001, RegisterKind::BankSelect { block: 1 })
            .build()
    }

    #[test]
    fn flat_bus_is_one_read_write_block() {
        let bus = BankedBus::flat(vec![1, 2, 3, 4]);
        let blocks = bus.blocks();
        assert_eq!(blocks.len(), 1);
        assert_eq!((blocks[0].start, blocks[0].end), (0, 4));
        assert_eq!(blocks[0].access, BlockAccess::READ_WRITE);
        assert_eq!(bus.raw_read32(0, UNSEGMENTED), 0x0403_0201);
    }

    #[test]
    fn read_counter_advances_on_bus_reads_only() {
        let mut bus = cartridge();
        assert_eq!(bus.raw_read8(0x2000, UNSEGMENTED), 0);
        assert_eq!(bus.raw_read8(0x2000, UNSEGMENTED), 0);
        assert_eq!(bus.bus_read8(0x2000), 0);
        assert_eq!(bus.bus_read8(0x2000), 1);
        assert_eq!(bus.register_value(0x2000), Some(2));
        bus.bus_write8(0x2000, 0x40);
        assert_eq!(bus.bus_read8(0x2000), 0x40);
    }

    #[test]
    fn rom_ignores_bus_writes_but_takes_raw_writes() {
        let mut bus = cartridge();
        bus.bus_write8(0x10, 0xAA);
        assert_eq!(bus.bus_read8(0x10), 0x11);
        bus.raw_write8(0x10, UNSEGMENTED, 0xAA);
        assert_eq!(bus.bus_read8(0x10), 0xAA);
    }

    #[test]
    fn bank_select_register_switches_the_window() {
        let mut bus = cartridge();
        for bank in 0..4_i32 {
            bus.raw_write8(0x1010, bank, 0xB0 + u8::try_from(bank).expect("small"));
        }
        assert_eq!(bus.bus_read8(0x1010), 0xB0);
        bus.bus_write8(0x2001, 2);
        assert_eq!(bus.active_bank(1), Some(2));
        assert_eq!(bus.bus_read8(0x1010), 0xB2);
        assert_eq!(bus.raw_read8(0x1010, 3), 0xB3);
        assert_eq!(bus.raw_read8(0x1010, UNSEGMENTED), 0xB2);
        bus.bus_write8(0x2001, 5);
        assert_eq!(bus.active_bank(1), Some(1));
    }

    #[test]
    fn fixed_part_of_banked_block_ignores_segment() {
        let mut bus = cartridge();
        bus.bus_write8(0x1004, 0x5A);
        assert_eq!(bus.raw_read8(0x1004, 3), 0x5A);
        assert_eq!(bus.raw_read8(0x1004, UNSEGMENTED), 0x5A);
    }

    #[test]
    fn unmapped_addresses_read_as_zero() {
        let mut bus = cartridge();
        bus.bus_write8(0x9000, 0xFF);
        assert_eq!(bus.bus_read8(0x9000), 0);
        assert_eq!(bus.raw_read8(0x1010, 9), 0);
        assert_eq!(bus.active_bank(0), None);
        assert!(!bus.select_bank(7, 0));
    }

    #[test]
    fn wide_bus_accesses_are_little_endian() {
        let mut bus = BankedBus::flat(vec![0; 8]);
        bus.bus_write32(0, 0x1234_5678);
        assert_eq!(bus.bus_read16(0), 0x5678);
        assert_eq!(bus.bus_read16(2), 0x1234);
        assert_eq!(
            bus.block_contents(0),
            Some(&[0x78, 0x56, 0x34, 0x12, 0, 0, 0, 0][..])
        );
    }
}
