#![no_main]

use libfuzzer_sys::fuzz_target;
use memscan_core::{
    AccessWidth, BankedBus, BlockAccess, MemoryFlags, MemorySpace, RegisterKind, SearchKind,
    SearchQuery, SliceRange, ViewKind,
};

const KINDS: [SearchKind; 5] = [
    SearchKind::ExplicitInt(AccessWidth::Byte),
    SearchKind::ExplicitInt(AccessWidth::Half),
    SearchKind::ExplicitInt(AccessWidth::Word),
    SearchKind::Guess,
    SearchKind::StringMatch,
];

fuzz_target!(|data: &[u8]| {
    if data.len() < 12 {
        return;
    }

    let (header, image) = data.split_at(12);
    let bus = BankedBus::builder()
        .block("ram", 0, image.to_vec(), BlockAccess::READ_WRITE)
        .banked_block("bank", 0x1_0000, 8, 8, 3, BlockAccess::READ_WRITE)
        .register(0x2_0000, RegisterKind::BankSelect { block: 1 })
        .build();
    let size = usize::from(header[0]).max(4);
    let Ok(mut space) = MemorySpace::new(bus, size, u32::from(header[1])) else {
        return;
    };

    let kind = ViewKind::ALL[usize::from(header[2]) % ViewKind::ALL.len()];
    let address = i64::from(i8::from_le_bytes([header[3]]));
    let value = i64::from(i32::from_le_bytes([header[4], header[5], header[6], header[7]]));
    let _ = space.write(kind, address, value);
    let _ = space.read(kind, address);
    let _ = space.raw_read(kind, address, i32::from(header[8] % 4) - 1);

    let range = SliceRange::new(address, address + i64::from(header[8]))
        .step(i64::from(header[9] % 8) - 1);
    if let Ok(slice) = space.read_slice(kind, range) {
        let _ = slice.count();
    }

    let flags = match header[10] % 3 {
        0 => MemoryFlags::Read,
        1 => MemoryFlags::Write,
        _ => MemoryFlags::ReadWrite,
    };
    let query = SearchQuery::new(value, 64)
        .with_kind(KINDS[usize::from(header[11]) % KINDS.len()])
        .with_flags(flags);
    if let Ok(first) = space.search(&query, &[]) {
        assert!(first.len() <= 64);
        let _ = space.write(kind, address, value.wrapping_add(1));
        if let Ok(second) = space.search(&query, &first) {
            assert!(second.len() <= first.len());
            for result in &second {
                let _ = result.value(&space);
            }
        }
    }
});
