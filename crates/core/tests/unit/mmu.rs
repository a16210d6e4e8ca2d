//! Memory manager tests: translation, lazy allocation, accounting
//! invariants, page boundaries, and the swap round trip.

use std::sync::atomic::Ordering::Relaxed;
use std::sync::Arc;

use moss_core::mem::{MemoryManager, PAGE_SIZE};
use moss_core::process::{MemWeights, Pcb};

use crate::common::harness::{init_logging, mem_config};

fn bed(main_bytes: u32, secondary_bytes: u32) -> (MemoryManager, Arc<Pcb>) {
    init_logging();
    let mut mmu = MemoryManager::new(&mem_config(main_bytes, secondary_bytes));
    let pcb = Arc::new(Pcb::new(1, "mem", "mem.json", 0, 20, MemWeights::default()));
    mmu.register_process(Arc::clone(&pcb));
    (mmu, pcb)
}

#[test]
fn write_then_read_round_trips() {
    let (mut mmu, pcb) = bed(4096, 16384);
    mmu.write(100, 0xdead_beef, &pcb);
    assert_eq!(mmu.read(100, &pcb), 0xdead_beef);
}

#[test]
fn unmapped_read_returns_zero_and_allocates_nothing() {
    let (mut mmu, pcb) = bed(4096, 16384);
    let free_before = mmu.free_frames();
    assert_eq!(mmu.read(64, &pcb), 0);
    assert_eq!(mmu.free_frames(), free_before);
    assert!(pcb.page_table.lock().unwrap().is_empty());
    assert_eq!(pcb.mem_reads.load(Relaxed), 1);
}

#[test]
fn write_is_the_only_lazy_allocation_path() {
    let (mut mmu, pcb) = bed(4096, 16384);
    mmu.read(0, &pcb);
    assert_eq!(mmu.free_frames(), mmu.num_frames());
    mmu.write(0, 1, &pcb);
    assert_eq!(mmu.free_frames(), mmu.num_frames() - 1);
}

#[test]
fn page_boundary_allocates_exactly_one_new_frame() {
    let (mut mmu, pcb) = bed(4096, 16384);
    mmu.write(0, 1, &pcb);
    let after_first = mmu.free_frames();

    // Last byte of page 0: no new frame.
    mmu.write(31, 2, &pcb);
    assert_eq!(mmu.free_frames(), after_first);

    // First byte of page 1: exactly one new frame.
    mmu.write(32, 3, &pcb);
    assert_eq!(mmu.free_frames(), after_first - 1);
}

#[test]
fn read_and_write_counters_stay_consistent() {
    let (mut mmu, pcb) = bed(4096, 16384);
    mmu.write(0, 10, &pcb);
    mmu.write(4, 11, &pcb);
    mmu.read(0, &pcb);
    mmu.read(4, &pcb);
    mmu.read(64, &pcb); // unmapped

    assert_eq!(
        pcb.mem_reads.load(Relaxed) + pcb.mem_writes.load(Relaxed),
        pcb.mem_accesses_total.load(Relaxed)
    );
    assert_eq!(
        pcb.cache_hits.load(Relaxed) + pcb.cache_misses.load(Relaxed),
        pcb.cache_mem_accesses.load(Relaxed)
    );
}

#[test]
fn cached_read_is_a_hit() {
    let (mut mmu, pcb) = bed(4096, 16384);
    mmu.write(8, 5, &pcb);
    let misses = pcb.cache_misses.load(Relaxed);
    let hits = pcb.cache_hits.load(Relaxed);
    mmu.read(8, &pcb);
    assert_eq!(pcb.cache_misses.load(Relaxed), misses);
    assert_eq!(pcb.cache_hits.load(Relaxed), hits + 1);
}

#[test]
fn memory_cycles_use_the_process_weights() {
    let (mut mmu, pcb) = bed(4096, 16384);
    // First write: one primary access plus one cache access.
    mmu.write(0, 1, &pcb);
    assert_eq!(
        pcb.memory_cycles.load(Relaxed),
        pcb.weights.primary + pcb.weights.cache
    );
}

#[test]
fn writeback_routes_by_main_limit() {
    let (mut mmu, _pcb) = bed(192, 8192);
    mmu.writeback(8, 0x11);
    mmu.writeback(192 + 4, 0x22);
    assert_eq!(mmu.peek_main(2), 0x11);
    assert_eq!(mmu.peek_secondary(1), 0x22);
}

#[test]
fn swap_round_trip_preserves_page_contents() {
    // 192 bytes of main memory: six frames.
    let (mut mmu, pcb) = bed(192, 8192);
    assert_eq!(mmu.num_frames(), 6);

    // Fill all six frames, then touch a seventh page.
    for page in 0..7u32 {
        mmu.write(page * PAGE_SIZE, 100 + page, &pcb);
    }

    // Page 0 was the FIFO victim.
    assert!(pcb.frame_for(0).is_none());
    assert_eq!(mmu.swap_entries().len(), 1);
    assert_eq!(mmu.swap_entries()[0].0, (pcb.pid, 0));

    // Reading it back swaps it in with its original contents.
    assert_eq!(mmu.read(0, &pcb), 100);
    assert!(pcb.frame_for(0).is_some());
    assert!(!mmu.swap_entries().iter().any(|(k, _)| *k == (pcb.pid, 0)));
    assert!(pcb.secondary_mem_accesses.load(Relaxed) > 0 || pcb.primary_mem_accesses.load(Relaxed) > 0);
}

#[test]
fn swap_keeps_owner_and_swap_tables_disjoint() {
    let (mut mmu, pcb) = bed(192, 8192);
    for page in 0..9u32 {
        mmu.write(page * PAGE_SIZE, page, &pcb);
    }

    let swapped: Vec<(u32, u32)> = mmu.swap_entries().iter().map(|(k, _)| *k).collect();
    for frame in 0..mmu.num_frames() {
        if let Some(owner) = mmu.frame_owner(frame) {
            assert!(
                !swapped.contains(&owner),
                "frame owner {:?} also present in the swap table",
                owner
            );
        }
    }
}

#[test]
fn page_table_agrees_with_frame_owners() {
    let (mut mmu, pcb) = bed(192, 8192);
    for page in 0..8u32 {
        mmu.write(page * PAGE_SIZE, page, &pcb);
    }

    let table = pcb.page_table.lock().unwrap().clone();
    for (page, frame) in table {
        assert_eq!(
            mmu.frame_owner(frame as usize),
            Some((pcb.pid, page)),
            "frame {} should be owned by (pid {}, page {})",
            frame,
            pcb.pid,
            page
        );
    }
}

#[test]
fn swapped_frames_never_serve_stale_cache_entries() {
    let (mut mmu, pcb) = bed(192, 8192);
    // Write distinct values into every page, forcing continuous reuse.
    for page in 0..12u32 {
        mmu.write(page * PAGE_SIZE + 4, 1000 + page, &pcb);
    }
    // Every page reads back its own value, whichever frame it sits in now.
    for page in 0..12u32 {
        assert_eq!(mmu.read(page * PAGE_SIZE + 4, &pcb), 1000 + page);
    }
}

#[test]
fn two_processes_do_not_share_pages() {
    init_logging();
    let mut mmu = MemoryManager::new(&mem_config(4096, 16384));
    let a = Arc::new(Pcb::new(1, "a", "a.json", 0, 20, MemWeights::default()));
    let b = Arc::new(Pcb::new(2, "b", "b.json", 0, 20, MemWeights::default()));
    mmu.register_process(Arc::clone(&a));
    mmu.register_process(Arc::clone(&b));

    mmu.write(0, 111, &a);
    mmu.write(0, 222, &b);
    assert_eq!(mmu.read(0, &a), 111);
    assert_eq!(mmu.read(0, &b), 222);
}
