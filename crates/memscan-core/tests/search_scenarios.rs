//! End-to-end view and search scenarios over a flat 16-byte region.
//!
//! These tests drive the public API the way a tracking session would: poke
//! a value, scan, change the value, narrow.

#![allow(
    clippy::pedantic,
    clippy::nursery,
    clippy::cast_possible_truncation,
    clippy::cast_sign_loss
)]

use memscan_core::{
    AccessWidth, BankedBus, FaultClass, MemoryFault, MemorySpace, ResultKind, SearchConfig,
    SearchKind, SearchQuery, SearchResult, TypedView, ViewKind, UNSEGMENTED,
};
use proptest as _;
use rstest::rstest;
#[cfg(feature = "serde")]
use serde as _;
use thiserror as _;
use tracing as _;

fn region() -> MemorySpace<BankedBus> {
    MemorySpace::with_config(BankedBus::flat(vec![0; 16]), 16, 0, SearchConfig::exact())
        .expect("valid region")
}

fn int8(target: i64) -> SearchQuery {
    SearchQuery::new(target, 10).with_kind(SearchKind::ExplicitInt(AccessWidth::Byte))
}

#[test]
fn scan_finds_single_byte_match() {
    let mut space = region();
    space.write(ViewKind::U8, 5, 0x2A).expect("in range");

    let results = space.search(&int8(42), &[]).expect("scan");

    assert_eq!(results.len(), 1);
    assert_eq!(results[0].address(), 5);
    assert_eq!(results[0].segment(), UNSEGMENTED);
    assert_eq!(results[0].divisor(), 1);
    assert_eq!(results[0].kind(), ResultKind::Int(AccessWidth::Byte));
    assert_eq!(results[0].value(&space), Ok(42));
}

#[test]
fn narrowing_drops_changed_value() {
    let mut space = region();
    space.write(ViewKind::U8, 5, 0x2A).expect("in range");
    let first = space.search(&int8(42), &[]).expect("scan");

    space.write(ViewKind::U8, 5, 0x2B).expect("in range");
    let second = space.search(&int8(42), &first).expect("narrow");

    assert!(second.is_empty());
}

#[test]
fn narrowing_follows_a_tracked_value() {
    let mut space = region();
    space.set(3, 10).expect("in range");
    space.set(9, 10).expect("in range");
    let first = space.search(&int8(10), &[]).expect("scan");
    assert_eq!(first.len(), 2);

    space.set(3, 11).expect("in range");
    let second = space.search(&int8(11), &first).expect("narrow");
    assert_eq!(second.len(), 1);
    assert_eq!(second[0].address(), 3);

    space.set(9, 11).expect("in range");
    let third = space.search(&int8(11), &second).expect("narrow");
    assert_eq!(third, second);
}

#[test]
fn bogus_signedness_is_rejected_before_any_access() {
    let fault = TypedView::new(AccessWidth::Byte, 16, 0, "bogus").expect_err("bogus sign");
    assert_eq!(fault.class(), FaultClass::Configuration);
    assert_eq!(fault.to_string(), "invalid sign type: 'bogus'");
}

#[test]
fn string_result_has_no_scalar_value() {
    let mut space = region();
    for (offset, byte) in b"LIFE".iter().enumerate() {
        space.set(offset as i64 + 2, i64::from(*byte)).expect("in range");
    }
    let query = SearchQuery::new("LIFE", 10).with_kind(SearchKind::StringMatch);
    let results = space.search(&query, &[]).expect("scan");
    assert_eq!(results.len(), 1);
    assert_eq!(results[0].address(), 2);

    let read = results[0].value(&space).expect_err("string result");
    assert_eq!(read.class(), FaultClass::TypeMismatch);
    let write = results[0].set_value(&mut space, 1).expect_err("string result");
    assert_eq!(write.class(), FaultClass::TypeMismatch);

    let still = space.search(&query, &results).expect("narrow");
    assert_eq!(still, results);
    space.set(5, i64::from(b'T')).expect("in range");
    assert!(space.search(&query, &results).expect("narrow").is_empty());
}

#[rstest]
#[case(AccessWidth::Half, 0x1234)]
#[case(AccessWidth::Word, 0x5678_1234)]
fn wider_matches_are_aligned(#[case] width: AccessWidth, #[case] target: i64) {
    let mut space = region();
    space.write(ViewKind::U32, 4, 0x5678_1234).expect("in range");
    // Same byte sequence again, starting at an odd address.
    for (offset, byte) in [(9, 0x34), (10, 0x12), (11, 0x78), (12, 0x56)] {
        space.set(offset, byte).expect("in range");
    }

    let query = SearchQuery::new(target, 10).with_kind(SearchKind::ExplicitInt(width));
    let found: Vec<u32> = space
        .search(&query, &[])
        .expect("scan")
        .iter()
        .map(SearchResult::address)
        .collect();
    assert_eq!(found, vec![4]);
}

#[test]
fn negative_target_matches_twos_complement_bits() {
    let mut space = region();
    space.write(ViewKind::S16, 10, -2).expect("in range");
    let query = SearchQuery::new(-2, 10).with_kind(SearchKind::ExplicitInt(AccessWidth::Half));
    let found = space.search(&query, &[]).expect("scan");
    assert_eq!(found.len(), 1);
    assert_eq!(found[0].address(), 10);
    assert_eq!(found[0].value(&space), Ok(0xFFFE));
}

#[test]
fn guess_finds_scaled_values_with_divisor() {
    let mut space = MemorySpace::new(BankedBus::flat(vec![0; 16]), 16, 0).expect("valid region");
    space.set(7, 25).expect("in range");

    let query = space.query(100);
    let results = space.search(&query, &[]).expect("scan");
    let scaled: Vec<&SearchResult> = results
        .iter()
        .filter(|result| result.address() == 7 && result.divisor() == 4)
        .collect();
    assert_eq!(scaled.len(), 1);
    assert_eq!(scaled[0].kind(), ResultKind::Guessed(AccessWidth::Byte));
    assert_eq!(scaled[0].value(&space), Ok(100));

    scaled[0].set_value(&mut space, 103).expect("scalar result");
    assert_eq!(space.get(7), Ok(25));
    scaled[0].set_value(&mut space, 120).expect("scalar result");
    assert_eq!(space.get(7), Ok(30));
}

#[test]
fn guess_tries_hexadecimal_reading_of_text() {
    let mut space = region();
    space.set(12, 0x10).expect("in range");
    let results = space.search(&space.query("10"), &[]).expect("scan");
    assert!(results.iter().any(|result| {
        result.address() == 12 && result.kind() == ResultKind::Guessed(AccessWidth::Byte)
    }));
}

#[test]
fn out_of_range_access_is_a_range_fault() {
    let mut space = region();
    let fault = space.read(ViewKind::U32, 13).expect_err("past the end");
    assert!(matches!(
        fault,
        MemoryFault::AddressOutOfRange {
            start: 13,
            stop: 17,
            size: 16
        }
    ));
    assert!(space.read(ViewKind::U8, -1).expect_err("negative").is_range());
}

#[test]
fn empty_candidate_list_restarts_the_scan() {
    let mut space = region();
    space.write(ViewKind::U8, 5, 42).expect("in range");
    let found = space.search(&int8(42), &[]).expect("scan");
    space.write(ViewKind::U8, 5, 43).expect("in range");
    space.write(ViewKind::U8, 9, 42).expect("in range");

    let narrowed = space.search(&int8(42), &found).expect("narrow");
    assert!(narrowed.is_empty());

    let restarted = space.search(&int8(42), &narrowed).expect("scan");
    let addresses: Vec<u32> = restarted.iter().map(SearchResult::address).collect();
    assert_eq!(addresses, vec![9]);
}
