//! L1 cache tests: LRU ordering, dirty write-back through the sink, and
//! range eviction.

use moss_core::mem::L1Cache;

/// Sink that records every (address, value) written back.
fn collecting_sink(log: &mut Vec<(u32, u32)>) -> impl FnMut(u32, u32) + '_ {
    |addr, value| log.push((addr, value))
}

#[test]
fn miss_then_hit() {
    let mut cache = L1Cache::new(4);
    let mut log = Vec::new();
    assert_eq!(cache.lookup(0x40), None);
    cache.insert(0x40, 7, &mut collecting_sink(&mut log));
    assert_eq!(cache.lookup(0x40), Some(7));
    assert!(log.is_empty());
}

#[test]
fn capacity_evicts_least_recently_used() {
    let mut cache = L1Cache::new(2);
    let mut log = Vec::new();
    cache.insert(0x00, 1, &mut collecting_sink(&mut log));
    cache.insert(0x04, 2, &mut collecting_sink(&mut log));
    // Touch 0x00 so 0x04 becomes the LRU entry.
    assert_eq!(cache.lookup(0x00), Some(1));
    cache.insert(0x08, 3, &mut collecting_sink(&mut log));

    assert!(cache.contains(0x00));
    assert!(!cache.contains(0x04));
    assert!(cache.contains(0x08));
}

#[test]
fn clean_eviction_skips_the_sink() {
    let mut cache = L1Cache::new(1);
    let mut log = Vec::new();
    cache.insert(0x00, 1, &mut collecting_sink(&mut log));
    cache.insert(0x04, 2, &mut collecting_sink(&mut log));
    assert!(log.is_empty());
}

#[test]
fn dirty_eviction_writes_back_through_the_sink() {
    let mut cache = L1Cache::new(1);
    let mut log = Vec::new();
    cache.insert(0x00, 1, &mut collecting_sink(&mut log));
    cache.update(0x00, 99);
    cache.insert(0x04, 2, &mut collecting_sink(&mut log));
    assert_eq!(log, vec![(0x00, 99)]);
}

#[test]
fn update_misses_are_ignored() {
    let mut cache = L1Cache::new(2);
    cache.update(0x40, 5);
    assert_eq!(cache.lookup(0x40), None);
    assert!(cache.is_empty());
}

#[test]
fn update_refreshes_lru_position() {
    let mut cache = L1Cache::new(2);
    let mut log = Vec::new();
    cache.insert(0x00, 1, &mut collecting_sink(&mut log));
    cache.insert(0x04, 2, &mut collecting_sink(&mut log));
    cache.update(0x00, 10);
    cache.insert(0x08, 3, &mut collecting_sink(&mut log));

    // 0x04 was least recently touched.
    assert!(cache.contains(0x00));
    assert!(!cache.contains(0x04));
    // The dirty survivor kept its updated value.
    assert_eq!(cache.lookup(0x00), Some(10));
}

#[test]
fn evict_range_flushes_dirty_entries() {
    let mut cache = L1Cache::new(8);
    let mut log = Vec::new();
    cache.insert(0x00, 1, &mut collecting_sink(&mut log));
    cache.insert(0x04, 2, &mut collecting_sink(&mut log));
    cache.insert(0x20, 3, &mut collecting_sink(&mut log));
    cache.update(0x04, 42);

    cache.evict_range(0x00, 32, &mut collecting_sink(&mut log));

    assert!(!cache.contains(0x00));
    assert!(!cache.contains(0x04));
    assert!(cache.contains(0x20));
    assert_eq!(log, vec![(0x04, 42)]);
}

#[test]
fn len_tracks_residency() {
    let mut cache = L1Cache::new(4);
    let mut log = Vec::new();
    assert!(cache.is_empty());
    cache.insert(0x00, 1, &mut collecting_sink(&mut log));
    cache.insert(0x04, 2, &mut collecting_sink(&mut log));
    assert_eq!(cache.len(), 2);
}
