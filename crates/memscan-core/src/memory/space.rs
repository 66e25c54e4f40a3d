//! Six typed views over one backend region, plus byte-level indexing.

use crate::{
    AccessWidth, AddressSpace, MemoryFault, SearchConfig, SearchQuery, SearchTarget, Signedness,
    SliceRange, TypedView, ViewKind, ViewSlice,
};

/// A `(base, size)` region of a backend exposed through six typed views.
///
/// The memory space owns its backend; dropping the space drops the backend.
/// Hosts that share one emulated machine across threads must serialize all
/// access to it, since bus reads mutate backend state.
#[derive(Debug)]
pub struct MemorySpace<B> {
    backend: B,
    size: usize,
    base: u32,
    views: [TypedView; 6],
    config: SearchConfig,
}

impl<B: AddressSpace> MemorySpace<B> {
    /// Creates a memory space with the default search configuration.
    ///
    /// # Errors
    ///
    /// Returns [`MemoryFault::RegionTooSmall`] when `size` cannot hold a
    /// 32-bit view, and [`MemoryFault::RegionWrapsAround`] when the region
    /// runs past the end of the bus.
    pub fn new(backend: B, size: usize, base: u32) -> Result<Self, MemoryFault> {
        Self::with_config(backend, size, base, SearchConfig::default())
    }

    /// Creates a memory space with an explicit search configuration.
    ///
    /// # Errors
    ///
    /// Returns [`MemoryFault::RegionTooSmall`] when `size` cannot hold a
    /// 32-bit view, and [`MemoryFault::RegionWrapsAround`] when the region
    /// runs past the end of the bus.
    pub fn with_config(
        backend: B,
        size: usize,
        base: u32,
        config: SearchConfig,
    ) -> Result<Self, MemoryFault> {
        let view = |kind: ViewKind| {
            TypedView::with_signedness(kind.width(), size, base, kind.signedness())
        };
        let views = [
            view(ViewKind::U8)?,
            view(ViewKind::U16)?,
            view(ViewKind::U32)?,
            view(ViewKind::S8)?,
            view(ViewKind::S16)?,
            view(ViewKind::S32)?,
        ];
        Ok(Self {
            backend,
            size,
            base,
            views,
            config,
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

    /// Bus offset of logical address `0`.
    #[must_use]
    pub const fn base(&self) -> u32 {
        self.base
    }

    /// Search configuration.
    #[must_use]
    pub const fn config(&self) -> &SearchConfig {
        &self.config
    }

    /// Shared access to the backend.
    #[must_use]
    pub const fn backend(&self) -> &B {
        &self.backend
    }

    /// Exclusive access to the backend, e.g. to step the emulated machine.
    pub fn backend_mut(&mut self) -> &mut B {
        &mut self.backend
    }

    /// Releases the backend.
    pub fn into_backend(self) -> B {
        self.backend
    }

    /// Returns the view for `kind`.
    #[must_use]
    pub const fn view(&self, kind: ViewKind) -> TypedView {
        self.views[kind.index()]
    }

    /// Returns the view for a width/signedness pair.
    #[must_use]
    pub const fn view_of(&self, width: AccessWidth, signedness: Signedness) -> TypedView {
        let kind = match (width, signedness) {
            (AccessWidth::Byte, Signedness::Unsigned) => ViewKind::U8,
            (AccessWidth::Half, Signedness::Unsigned) => ViewKind::U16,
            (AccessWidth::Word, Signedness::Unsigned) => ViewKind::U32,
            (AccessWidth::Byte, Signedness::Signed) => ViewKind::S8,
            (AccessWidth::Half, Signedness::Signed) => ViewKind::S16,
            (AccessWidth::Word, Signedness::Signed) => ViewKind::S32,
        };
        self.view(kind)
    }

    /// Unsigned 8-bit view.
    #[must_use]
    pub const fn u8(&self) -> TypedView {
        self.view(ViewKind::U8)
    }

    /// Unsigned 16-bit view.
    #[must_use]
    pub const fn u16(&self) -> TypedView {
        self.view(ViewKind::U16)
    }

    /// Unsigned 32-bit view.
    #[must_use]
    pub const fn u32(&self) -> TypedView {
        self.view(ViewKind::U32)
    }

    /// Signed 8-bit view.
    #[must_use]
    pub const fn s8(&self) -> TypedView {
        self.view(ViewKind::S8)
    }

    /// Signed 16-bit view.
    #[must_use]
    pub const fn s16(&self) -> TypedView {
        self.view(ViewKind::S16)
    }

    /// Signed 32-bit view.
    #[must_use]
    pub const fn s32(&self) -> TypedView {
        self.view(ViewKind::S32)
    }

    /// Bus-mapped scalar read through the `kind` view.
    ///
    /// # Errors
    ///
    /// Returns a range fault for out-of-bounds addresses.
    pub fn read(&mut self, kind: ViewKind, address: i64) -> Result<i64, MemoryFault> {
        self.view(kind).read(&mut self.backend, address)
    }

    /// Bus-mapped masked scalar write through the `kind` view.
    ///
    /// # Errors
    ///
    /// Returns a range fault for out-of-bounds addresses.
    pub fn write(&mut self, kind: ViewKind, address: i64, value: i64) -> Result<(), MemoryFault> {
        self.view(kind).write(&mut self.backend, address, value)
    }

    /// Lazy bus-mapped slice read through the `kind` view.
    ///
    /// # Errors
    ///
    /// Returns a range fault for invalid slice bounds.
    pub fn read_slice(
        &mut self,
        kind: ViewKind,
        range: impl Into<SliceRange>,
    ) -> Result<ViewSlice<'_, B>, MemoryFault> {
        let view = self.view(kind);
        view.read_slice(&mut self.backend, range.into())
    }

    /// Bus-mapped slice write through the `kind` view.
    ///
    /// # Errors
    ///
    /// Returns a range fault for invalid slice bounds or a value count that
    /// does not match the slice.
    pub fn write_slice(
        &mut self,
        kind: ViewKind,
        range: impl Into<SliceRange>,
        values: &[i64],
    ) -> Result<(), MemoryFault> {
        self.view(kind)
            .write_slice(&mut self.backend, range.into(), values)
    }

    /// Side-effect-free read through `segment`.
    ///
    /// # Errors
    ///
    /// Returns a range fault for out-of-bounds addresses.
    pub fn raw_read(&self, kind: ViewKind, address: i64, segment: i32) -> Result<i64, MemoryFault> {
        self.view(kind).raw_read(&self.backend, address, segment)
    }

    /// Side-effect-free masked write through `segment`.
    ///
    /// # Errors
    ///
    /// Returns a range fault for out-of-bounds addresses.
    pub fn raw_write(
        &mut self,
        kind: ViewKind,
        address: i64,
        value: i64,
        segment: i32,
    ) -> Result<(), MemoryFault> {
        self.view(kind)
            .raw_write(&mut self.backend, address, value, segment)
    }

    /// Byte at `address`, read through the bus.
    ///
    /// # Errors
    ///
    /// Returns a range fault for out-of-bounds addresses.
    #[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
    pub fn get(&mut self, address: i64) -> Result<u8, MemoryFault> {
        self.read(ViewKind::U8, address).map(|value| value as u8)
    }

    /// Owned copy of the bytes covered by `range`, read through the bus.
    ///
    /// Mutating the returned buffer does not touch the backend.
    ///
    /// # Errors
    ///
    /// Returns a range fault for invalid slice bounds.
    #[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
    pub fn get_bytes(&mut self, range: impl Into<SliceRange>) -> Result<Vec<u8>, MemoryFault> {
        Ok(self
            .read_slice(ViewKind::U8, range)?
            .map(|value| value as u8)
            .collect())
    }

    /// Writes the low byte of `value` at `address` through the bus.
    ///
    /// # Errors
    ///
    /// Returns a range fault for out-of-bounds addresses.
    pub fn set(&mut self, address: i64, value: i64) -> Result<(), MemoryFault> {
        self.write(ViewKind::U8, address, value)
    }

    /// Starts a query for `target` using this space's configured defaults.
    #[must_use]
    pub fn query(&self, target: impl Into<SearchTarget>) -> SearchQuery {
        SearchQuery::new(target, self.config.default_limit).with_flags(self.config.default_flags)
    }
}
