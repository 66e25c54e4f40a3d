//! Bounds-checked fixed-width views over a backend region.

use std::iter::StepBy;
use std::ops::{Range, RangeFull};

use crate::backend::{bus_read, bus_write, raw_read, raw_write};
use crate::{AccessWidth, AddressSpace, MemoryFault, Signedness};

/// Half-open slice request with Python-style optional bounds.
///
/// Missing `start` means `0`, missing `stop` means `size - width`, missing
/// `step` means the view width (packed, non-overlapping scalars).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct SliceRange {
    /// Inclusive start offset.
    pub start: Option<i64>,
    /// Exclusive stop offset.
    pub stop: Option<i64>,
    /// Distance between consecutive offsets.
    pub step: Option<i64>,
}

impl SliceRange {
    /// Slice with every bound defaulted.
    #[must_use]
    pub const fn full() -> Self {
        Self {
            start: None,
            stop: None,
            step: None,
        }
    }

    /// Slice over `start..stop` with the default step.
    #[must_use]
    pub const fn new(start: i64, stop: i64) -> Self {
        Self {
            start: Some(start),
            stop: Some(stop),
            step: None,
        }
    }

    /// Overrides the step.
    #[must_use]
    pub const fn step(mut self, step: i64) -> Self {
        self.step = Some(step);
        self
    }
}

impl From<Range<i64>> for SliceRange {
    fn from(range: Range<i64>) -> Self {
        Self::new(range.start, range.end)
    }
}

impl From<RangeFull> for SliceRange {
    fn from(_: RangeFull) -> Self {
        Self::full()
    }
}

/// Restartable sequence of view offsets computed from a [`SliceRange`].
pub type SliceOffsets = StepBy<Range<i64>>;

/// A fixed-width, signed or unsigned accessor over `[base, base + size)`.
///
/// Views hold no bytes: every access is dispatched live to the backend
/// passed in, because backend state may change between accesses.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct TypedView {
    width: AccessWidth,
    signedness: Signedness,
    size: usize,
    base: u32,
}

impl TypedView {
    /// Creates a view from a signedness token (`u`, `unsigned`, `i`, `s`, `signed`).
    ///
    /// # Errors
    ///
    /// Returns a configuration fault for an unrecognized token or a region
    /// narrower than `width`.
    pub fn new(
        width: AccessWidth,
        size: usize,
        base: u32,
        sign: &str,
    ) -> Result<Self, MemoryFault> {
        Self::with_signedness(width, size, base, Signedness::parse(sign)?)
    }

    /// Creates a view with an already-resolved signedness.
    ///
    /// # Errors
    ///
    /// Returns [`MemoryFault::RegionTooSmall`] when `size < width`, and
    /// [`MemoryFault::RegionWrapsAround`] when `base + size` runs past the
    /// end of the 32-bit bus.
    pub fn with_signedness(
        width: AccessWidth,
        size: usize,
        base: u32,
        signedness: Signedness,
    ) -> Result<Self, MemoryFault> {
        if size < usize::from(width.bytes()) {
            return Err(MemoryFault::RegionTooSmall {
                size,
                width: width.bytes(),
            });
        }
        let end = u64::try_from(size)
            .map_or(u64::MAX, |size| u64::from(base).saturating_add(size));
        if end > 1 << 32 {
            return Err(MemoryFault::RegionWrapsAround { base, size });
        }
        Ok(Self {
            width,
            signedness,
            size,
            base,
        })
    }

    /// Logical extent in bytes.
    #[must_use]
    pub const fn len(&self) -> usize {
        self.size
    }

    /// Returns `true` for a zero-byte extent.
    #[must_use]
    pub const fn is_empty(&self) -> bool {
        self.size == 0
    }

    /// Access width.
    #[must_use]
    pub const fn width(&self) -> AccessWidth {
        self.width
    }

    /// Interpretation applied on read.
    #[must_use]
    pub const fn signedness(&self) -> Signedness {
        self.signedness
    }

    /// Bus offset added to every logical address.
    #[must_use]
    pub const fn base(&self) -> u32 {
        self.base
    }

    /// Write mask, `2^(8*width) - 1`.
    #[must_use]
    pub const fn mask(&self) -> u32 {
        self.width.mask()
    }

    fn size_i64(&self) -> i64 {
        i64::try_from(self.size).unwrap_or(i64::MAX)
    }

    fn check_range(&self, start: i64, stop: i64) -> Result<(), MemoryFault> {
        let size = self.size_i64();
        if start < 0 || stop < 0 || start >= size || stop > size {
            return Err(MemoryFault::AddressOutOfRange {
                start,
                stop,
                size: self.size,
            });
        }
        Ok(())
    }

    /// Validates `[address, address + width)` and returns the bus address.
    fn bus_address(&self, address: i64) -> Result<u32, MemoryFault> {
        let stop = address.saturating_add(i64::from(self.width.bytes()));
        self.check_range(address, stop)?;
        let offset = u32::try_from(address).map_err(|_| MemoryFault::AddressOutOfRange {
            start: address,
            stop,
            size: self.size,
        })?;
        Ok(self.base.wrapping_add(offset))
    }

    /// Resolves a slice request into its offsets after bounds-checking it.
    ///
    /// The returned iterator is `Clone`, so the sequence can be restarted.
    ///
    /// # Errors
    ///
    /// Returns a range fault when the bounds fall outside the view, the
    /// last element would run past the end of the view, or the step is not
    /// positive.
    #[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
    pub fn offsets(&self, range: SliceRange) -> Result<SliceOffsets, MemoryFault> {
        let width = i64::from(self.width.bytes());
        let start = range.start.unwrap_or(0);
        let stop = range.stop.unwrap_or(self.size_i64() - width);
        let step = range.step.unwrap_or(width);
        if step <= 0 {
            return Err(MemoryFault::InvalidStep { step });
        }
        self.check_range(start, stop)?;
        if stop > start {
            let last = start + (stop - start - 1) / step * step;
            if last + width > self.size_i64() {
                return Err(MemoryFault::AddressOutOfRange {
                    start: last,
                    stop: last + width,
                    size: self.size,
                });
            }
        }
        Ok((start..stop).step_by(step as usize))
    }

    #[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
    const fn offset_to_bus(&self, offset: i64) -> u32 {
        self.base.wrapping_add(offset as u32)
    }

    /// Bus-mapped scalar read.
    ///
    /// # Errors
    ///
    /// Returns [`MemoryFault::AddressOutOfRange`] when
    /// `[address, address + width)` is not inside `[0, size)`.
    pub fn read<B: AddressSpace + ?Sized>(
        &self,
        backend: &mut B,
        address: i64,
    ) -> Result<i64, MemoryFault> {
        let bus = self.bus_address(address)?;
        let raw = bus_read(backend, self.width, bus);
        Ok(self.signedness.interpret(self.width, raw))
    }

    /// Bus-mapped scalar write of `value & mask`.
    ///
    /// # Errors
    ///
    /// Returns [`MemoryFault::AddressOutOfRange`] when
    /// `[address, address + width)` is not inside `[0, size)`.
    pub fn write<B: AddressSpace + ?Sized>(
        &self,
        backend: &mut B,
        address: i64,
        value: i64,
    ) -> Result<(), MemoryFault> {
        let bus = self.bus_address(address)?;
        bus_write(backend, self.width, bus, self.width.truncate(value));
        Ok(())
    }

    /// Lazy bus-mapped slice read; one backend read per yielded scalar.
    ///
    /// # Errors
    ///
    /// Returns a range fault when the slice bounds are invalid.
    pub fn read_slice<'b, B: AddressSpace + ?Sized>(
        &self,
        backend: &'b mut B,
        range: SliceRange,
    ) -> Result<ViewSlice<'b, B>, MemoryFault> {
        let offsets = self.offsets(range)?;
        Ok(ViewSlice {
            backend,
            view: *self,
            offsets,
        })
    }

    /// Bus-mapped slice write; `values[i]` lands at the `i`-th slice offset.
    ///
    /// # Errors
    ///
    /// Returns a range fault when the slice bounds are invalid or `values`
    /// does not supply exactly one value per offset. Nothing is written on
    /// error.
    pub fn write_slice<B: AddressSpace + ?Sized>(
        &self,
        backend: &mut B,
        range: SliceRange,
        values: &[i64],
    ) -> Result<(), MemoryFault> {
        let offsets = self.offsets(range)?;
        let expected = offsets.clone().count();
        if expected != values.len() {
            return Err(MemoryFault::SliceLengthMismatch {
                expected,
                actual: values.len(),
            });
        }
        for (offset, value) in offsets.zip(values) {
            bus_write(
                backend,
                self.width,
                self.offset_to_bus(offset),
                self.width.truncate(*value),
            );
        }
        Ok(())
    }

    /// Side-effect-free read through `segment` (`-1` for unsegmented).
    ///
    /// # Errors
    ///
    /// Returns [`MemoryFault::AddressOutOfRange`] exactly as [`Self::read`].
    pub fn raw_read<B: AddressSpace + ?Sized>(
        &self,
        backend: &B,
        address: i64,
        segment: i32,
    ) -> Result<i64, MemoryFault> {
        let bus = self.bus_address(address)?;
        let raw = raw_read(backend, self.width, bus, segment);
        Ok(self.signedness.interpret(self.width, raw))
    }

    /// Side-effect-free write of `value & mask` through `segment`.
    ///
    /// # Errors
    ///
    /// Returns [`MemoryFault::AddressOutOfRange`] exactly as [`Self::write`].
    pub fn raw_write<B: AddressSpace + ?Sized>(
        &self,
        backend: &mut B,
        address: i64,
        value: i64,
        segment: i32,
    ) -> Result<(), MemoryFault> {
        let bus = self.bus_address(address)?;
        raw_write(backend, self.width, bus, segment, self.width.truncate(value));
        Ok(())
    }
}

/// Lazy, finite sequence of scalars produced by [`TypedView::read_slice`].
///
/// Reads are issued as the iterator advances; dropping it early issues no
/// further reads.
#[derive(Debug)]
pub struct ViewSlice<'b, B: ?Sized> {
    backend: &'b mut B,
    view: TypedView,
    offsets: SliceOffsets,
}

impl<B: ?Sized> ViewSlice<'_, B> {
    /// Offsets not yet read, as a restartable sequence.
    #[must_use]
    pub fn remaining_offsets(&self) -> SliceOffsets {
        self.offsets.clone()
    }
}

impl<B: AddressSpace + ?Sized> Iterator for ViewSlice<'_, B> {
    type Item = i64;

    fn next(&mut self) -> Option<Self::Item> {
        let offset = self.offsets.next()?;
        let raw = bus_read(
            &mut *self.backend,
            self.view.width,
            self.view.offset_to_bus(offset),
        );
        Some(self.view.signedness.interpret(self.view.width, raw))
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        self.offsets.size_hint()
    }
}
