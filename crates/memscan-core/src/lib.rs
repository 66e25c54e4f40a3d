//! Typed memory views and incremental value search over an emulated
//! address bus.

/// Fault taxonomy for views, memory spaces, and search.
pub mod fault;
pub use fault::{FaultClass, MemoryFault};

/// Access widths, signedness, and view kinds.
pub mod width;
pub use width::{AccessWidth, Signedness, ViewKind};

/// Backend contract: bus/raw accessors, block map, and search primitives.
pub mod backend;
pub use backend::{
    AddressSpace, BlockAccess, MemoryBlock, SearchParams, SearchRecord, UNSEGMENTED,
};

/// Reference banked-bus backend with side-effecting I/O registers.
pub mod bus;
pub use bus::{BankedBus, BankedBusBuilder, IoRegister, RegisterKind};

/// Search defaults carried by a memory space.
pub mod config;
pub use config::{SearchConfig, DEFAULT_GUESS_DIVISORS, DEFAULT_SEARCH_LIMIT};

/// Typed views and memory-space aggregation.
pub mod memory;
pub use memory::{MemorySpace, SliceOffsets, SliceRange, TypedView, ViewSlice};

/// Initial and narrowing value search.
pub mod search;
pub use search::{
    parse_int, MemoryFlags, ResultKind, SearchKind, SearchQuery, SearchResult, SearchTarget,
};

#[cfg(test)]
use proptest as _;
