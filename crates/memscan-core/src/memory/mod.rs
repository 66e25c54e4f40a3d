//! Typed views and the memory space that aggregates them.

/// Memory space aggregation and byte-level indexing.
pub mod space;
/// Bounds-checked fixed-width views and lazy slices.
pub mod view;

pub use space::MemorySpace;
pub use view::{SliceOffsets, SliceRange, TypedView, ViewSlice};
