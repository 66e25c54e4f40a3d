//! Value search: query parameters, scan algorithms, and typed results.

/// Initial and narrowing search entry point on [`crate::MemorySpace`].
pub mod engine;
/// Search modes, targets, and eligibility flags.
pub mod params;
/// Typed search results.
pub mod result;
/// Reference scan and narrowing algorithms over a block map.
pub mod scan;

pub use params::{parse_int, MemoryFlags, SearchKind, SearchQuery, SearchTarget};
pub use result::{ResultKind, SearchResult};
pub use scan::{rescan_records, scan_blocks};
