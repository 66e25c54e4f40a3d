//! Reference scan and narrowing algorithms over a backend's block map.
//!
//! Every read here goes through the raw path so that a search never
//! perturbs emulated state.

use std::collections::HashSet;
use std::ops::Range;

use tracing::trace;

use crate::backend::raw_read;
use crate::{AccessWidth, AddressSpace, SearchKind, SearchParams, SearchRecord};

struct Collector {
    records: Vec<SearchRecord>,
    seen: HashSet<SearchRecord>,
    limit: usize,
}

impl Collector {
    fn new(limit: usize) -> Self {
        Self {
            records: Vec::new(),
            seen: HashSet::new(),
            limit,
        }
    }

    fn is_full(&self) -> bool {
        self.records.len() >= self.limit
    }

    fn push(&mut self, record: SearchRecord) {
        if !self.is_full() && self.seen.insert(record) {
            self.records.push(record);
        }
    }
}

/// Returns the raw bits `candidate` must have at `width` when stored scaled
/// down by `divisor`, or `None` when it cannot be stored that way.
fn stored_bits(candidate: i64, width: AccessWidth, divisor: u32) -> Option<u32> {
    let divisor = i64::from(divisor);
    if divisor == 0 || candidate % divisor != 0 {
        return None;
    }
    let stored = candidate / divisor;
    width.fits(stored).then_some(width.truncate(stored))
}

fn clamp(window: &Range<u32>, region: &Range<u64>) -> Option<Range<u32>> {
    let start = u64::from(window.start).max(region.start);
    let end = u64::from(window.end).min(region.end);
    if start >= end {
        return None;
    }
    Some(u32::try_from(start).ok()?..u32::try_from(end).ok()?)
}

fn aligned_addresses(window: Range<u32>, width: AccessWidth) -> impl Iterator<Item = u32> {
    let step = u32::from(width.bytes());
    let first = window.start.checked_next_multiple_of(step).unwrap_or(window.end);
    let last = window.end;
    (first..last)
        .step_by(step as usize)
        .filter(move |address| address.checked_add(step).is_some_and(|end| end <= last))
}

fn scan_int<S: AddressSpace + ?Sized>(
    space: &S,
    window: &Range<u32>,
    segment: i32,
    targets: &[(AccessWidth, u32, u32)],
    type_tag: u8,
    out: &mut Collector,
) {
    for width in AccessWidth::ALL {
        let wanted: Vec<(u32, u32)> = targets
            .iter()
            .filter(|(w, _, _)| *w == width)
            .map(|(_, bits, divisor)| (*bits, *divisor))
            .collect();
        if wanted.is_empty() {
            continue;
        }
        for address in aligned_addresses(window.clone(), width) {
            if out.is_full() {
                return;
            }
            let raw = raw_read(space, width, address, segment);
            for (bits, divisor) in &wanted {
                if raw == *bits {
                    out.push(SearchRecord {
                        address,
                        segment,
                        type_tag,
                        width: u32::from(width.bytes()),
                        divisor: *divisor,
                    });
                }
            }
        }
    }
}

fn bytes_match<S: AddressSpace + ?Sized>(
    space: &S,
    address: u32,
    segment: i32,
    pattern: &[u8],
) -> bool {
    (0_u32..)
        .zip(pattern)
        .all(|(offset, byte)| space.raw_read8(address.wrapping_add(offset), segment) == *byte)
}

fn scan_string<S: AddressSpace + ?Sized>(
    space: &S,
    window: &Range<u32>,
    segment: i32,
    pattern: &[u8],
    out: &mut Collector,
) {
    let Ok(len) = u32::try_from(pattern.len()) else {
        return;
    };
    if len == 0 || window.end - window.start < len {
        return;
    }
    for address in window.start..=(window.end - len) {
        if out.is_full() {
            return;
        }
        if bytes_match(space, address, segment, pattern) {
            out.push(SearchRecord {
                address,
                segment,
                type_tag: SearchRecord::TAG_STRING,
                width: len,
                divisor: 1,
            });
        }
    }
}

/// Expands resolved parameters into `(width, stored bits, divisor)` triples.
fn int_targets(params: &SearchParams) -> Vec<(AccessWidth, u32, u32)> {
    let mut targets = Vec::new();
    match params.kind {
        SearchKind::ExplicitInt(width) => {
            for candidate in &params.ints {
                if let Some(bits) = stored_bits(*candidate, width, 1) {
                    targets.push((width, bits, 1));
                }
            }
        }
        SearchKind::Guess => {
            for candidate in &params.ints {
                for width in AccessWidth::ALL {
                    for divisor in &params.divisors {
                        if let Some(bits) = stored_bits(*candidate, width, *divisor) {
                            targets.push((width, bits, *divisor));
                        }
                    }
                }
            }
        }
        SearchKind::StringMatch => {}
    }
    targets
}

/// Initial scan over every block admitted by `params.flags`, in map order,
/// stopping once `limit` records have been collected.
pub fn scan_blocks<S: AddressSpace + ?Sized>(
    space: &S,
    params: &SearchParams,
    limit: usize,
) -> Vec<SearchRecord> {
    let mut out = Collector::new(limit);
    let targets = int_targets(params);
    let type_tag = match params.kind {
        SearchKind::Guess => SearchRecord::TAG_GUESS,
        SearchKind::ExplicitInt(_) | SearchKind::StringMatch => SearchRecord::TAG_INT,
    };

    for block in space.blocks() {
        if out.is_full() {
            break;
        }
        if !params.flags.admits(block.access) {
            continue;
        }
        for (window, segment) in block.scan_windows() {
            let Some(window) = clamp(&window, &params.region) else {
                continue;
            };
            trace!(
                block = %block.name,
                start = window.start,
                end = window.end,
                segment,
                "scanning window"
            );
            match params.kind {
                SearchKind::StringMatch => {
                    scan_string(space, &window, segment, &params.pattern, &mut out);
                }
                SearchKind::ExplicitInt(_) | SearchKind::Guess => {
                    scan_int(space, &window, segment, &targets, type_tag, &mut out);
                }
            }
        }
    }

    out.records
}

/// Re-reads each prior record through its own width and segment and keeps
/// those that still equal the target. Never adds records.
pub fn rescan_records<S: AddressSpace + ?Sized>(
    space: &S,
    params: &SearchParams,
    prior: &[SearchRecord],
) -> Vec<SearchRecord> {
    prior
        .iter()
        .filter(|record| still_matches(space, params, record))
        .copied()
        .collect()
}

fn still_matches<S: AddressSpace + ?Sized>(
    space: &S,
    params: &SearchParams,
    record: &SearchRecord,
) -> bool {
    match record.type_tag {
        SearchRecord::TAG_INT | SearchRecord::TAG_GUESS => {
            let Some(width) = AccessWidth::from_bytes(record.width) else {
                return false;
            };
            let raw = raw_read(space, width, record.address, record.segment);
            params
                .ints
                .iter()
                .any(|candidate| stored_bits(*candidate, width, record.divisor) == Some(raw))
        }
        SearchRecord::TAG_STRING => {
            usize::try_from(record.width).is_ok_and(|len| len == params.pattern.len())
                && bytes_match(space, record.address, record.segment, &params.pattern)
        }
        _ => false,
    }
}
