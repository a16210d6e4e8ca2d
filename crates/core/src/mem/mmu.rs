//! Memory manager.
//!
//! The manager owns the whole memory hierarchy and is the only component
//! the CPU talks to. It provides:
//! 1. **Translation:** Virtual byte addresses are split into a 32-byte page
//!    and an offset; mappings come from the per-process page table, then
//!    from swap, then from lazy allocation (writes only). Reads of pages
//!    that were never written fault and are served as zero.
//! 2. **Paging and swap:** Frames are allocated first-free; when none is
//!    free a FIFO victim pointer selects a frame to spill, eight words at a
//!    time, into the swap area at the tail of the secondary store.
//! 3. **Caching:** Every access goes through the write-back L1 cache; dirty
//!    victims are written to the right backing store through an eviction
//!    sink, so the cache never holds a reference back into the manager.
//! 4. **Accounting:** Per-tier access counts and weighted memory cycles are
//!    charged to the accessing process.
//!
//! The manager is shared across cores behind a single mutex owned by the
//! caller; one lock covers translation, the stores, the cache, and all
//! paging structures.

use std::collections::HashMap;
use std::sync::atomic::Ordering::Relaxed;
use std::sync::Arc;

use log::debug;

use super::cache::L1Cache;
use super::store::WordStore;
use crate::common::AccessError;
use crate::config::MemoryConfig;
use crate::process::Pcb;

/// Page size in bytes.
pub const PAGE_SIZE: u32 = 32;

/// Words per page.
pub const WORDS_PER_PAGE: u32 = PAGE_SIZE / 4;

/// One main-memory frame slot.
#[derive(Clone, Copy, Debug, Default)]
struct FrameSlot {
    used: bool,
    /// Owning (pid, virtual page) while occupied.
    owner: Option<(u32, u32)>,
}

/// The memory manager.
pub struct MemoryManager {
    main: WordStore,
    secondary: WordStore,
    cache: L1Cache,
    /// Main memory size in bytes; physical addresses at or past this route
    /// to the secondary store.
    main_limit: u32,
    frames: Vec<FrameSlot>,
    /// FIFO victim pointer, advanced modulo the frame count.
    victim_ptr: usize,
    /// Global swap table: (pid, virtual page) to secondary word address.
    swap_table: HashMap<(u32, u32), u32>,
    /// Tail of the swap area, in secondary words.
    next_swap_word: u32,
    /// Known processes, for page-table maintenance during eviction.
    processes: HashMap<u32, Arc<Pcb>>,
}

impl MemoryManager {
    /// Creates a manager with the configured store sizes and cache capacity.
    pub fn new(cfg: &MemoryConfig) -> Self {
        let num_frames = (cfg.main_bytes / PAGE_SIZE) as usize;
        Self {
            main: WordStore::new((cfg.main_bytes / 4) as usize),
            secondary: WordStore::new((cfg.secondary_bytes / 4) as usize),
            cache: L1Cache::new(cfg.cache_capacity),
            main_limit: cfg.main_bytes,
            frames: vec![FrameSlot::default(); num_frames],
            victim_ptr: 0,
            swap_table: HashMap::new(),
            next_swap_word: 0,
            processes: HashMap::new(),
        }
    }

    /// Registers a process so its page table can be maintained when one of
    /// its frames is chosen as a swap victim.
    pub fn register_process(&mut self, pcb: Arc<Pcb>) {
        self.processes.insert(pcb.pid, pcb);
    }

    /// Reads the 32-bit word at virtual byte address `vaddr`.
    ///
    /// An unmapped read is served as zero and allocates nothing. Accounting
    /// covers the read itself, the cache lookup, and the tier that served a
    /// miss, weighted by the process's `MemWeights`.
    pub fn read(&mut self, vaddr: u32, pcb: &Pcb) -> u32 {
        pcb.mem_accesses_total.fetch_add(1, Relaxed);
        pcb.mem_reads.fetch_add(1, Relaxed);

        let phys = match self.translate(vaddr, pcb, false) {
            Ok(p) => p,
            Err(err) => {
                debug!("mmu: pid {}: {} served as zero", pcb.pid, err);
                return 0;
            }
        };

        if let Some(value) = self.cache.lookup(phys) {
            pcb.cache_mem_accesses.fetch_add(1, Relaxed);
            pcb.memory_cycles.fetch_add(pcb.weights.cache, Relaxed);
            pcb.record_cache(true);
            return value;
        }

        pcb.cache_mem_accesses.fetch_add(1, Relaxed);
        pcb.record_cache(false);

        let value = if phys < self.main_limit {
            pcb.primary_mem_accesses.fetch_add(1, Relaxed);
            pcb.memory_cycles.fetch_add(pcb.weights.primary, Relaxed);
            self.main.read_word((phys / 4) as usize)
        } else {
            pcb.secondary_mem_accesses.fetch_add(1, Relaxed);
            pcb.memory_cycles.fetch_add(pcb.weights.secondary, Relaxed);
            self.secondary
                .read_word(((phys - self.main_limit) / 4) as usize)
        };

        let (cache, main, secondary, limit) = self.split();
        cache.insert(phys, value, &mut |a, v| route_write(main, secondary, limit, a, v));
        value
    }

    /// Writes `value` at virtual byte address `vaddr`.
    ///
    /// The first write to a page allocates its frame lazily. The value is
    /// written through to the backing store and mirrored into the cache:
    /// resident entries are updated in place and marked dirty, absent ones
    /// are inserted clean.
    pub fn write(&mut self, vaddr: u32, value: u32, pcb: &Pcb) {
        pcb.mem_accesses_total.fetch_add(1, Relaxed);
        pcb.mem_writes.fetch_add(1, Relaxed);

        let phys = match self.translate(vaddr, pcb, true) {
            Ok(p) => p,
            Err(_) => return,
        };

        if phys < self.main_limit {
            pcb.primary_mem_accesses.fetch_add(1, Relaxed);
            pcb.memory_cycles.fetch_add(pcb.weights.primary, Relaxed);
            self.main.write_word((phys / 4) as usize, value);
        } else {
            pcb.secondary_mem_accesses.fetch_add(1, Relaxed);
            pcb.memory_cycles.fetch_add(pcb.weights.secondary, Relaxed);
            self.secondary
                .write_word(((phys - self.main_limit) / 4) as usize, value);
        }

        if self.cache.contains(phys) {
            self.cache.update(phys, value);
            pcb.record_cache(true);
        } else {
            pcb.record_cache(false);
            let (cache, main, secondary, limit) = self.split();
            cache.insert(phys, value, &mut |a, v| route_write(main, secondary, limit, a, v));
        }
        pcb.cache_mem_accesses.fetch_add(1, Relaxed);
        pcb.memory_cycles.fetch_add(pcb.weights.cache, Relaxed);
    }

    /// Write-back entry point for dirty cache evictions.
    ///
    /// Routes a physical byte address to the right backing store.
    pub fn writeback(&mut self, phys: u32, value: u32) {
        route_write(&mut self.main, &mut self.secondary, self.main_limit, phys, value);
    }

    /// Translates a virtual byte address for `pcb`.
    ///
    /// Resolution order: page table, swap (pulling the page back in), lazy
    /// allocation when `is_write`, otherwise an `UnmappedRead` fault.
    pub fn translate(&mut self, vaddr: u32, pcb: &Pcb, is_write: bool) -> Result<u32, AccessError> {
        let page = vaddr / PAGE_SIZE;
        let offset = vaddr % PAGE_SIZE;

        if let Some(frame) = pcb.frame_for(page) {
            return Ok(frame * PAGE_SIZE + offset);
        }

        if let Some(disk) = self.swap_table.get(&(pcb.pid, page)).copied() {
            let frame = self.acquire_frame();
            self.swap_table.remove(&(pcb.pid, page));
            self.swap_in(disk, frame);
            self.frames[frame].owner = Some((pcb.pid, page));
            pcb.map_page(page, frame as u32);
            debug!(
                "mmu: pid {}: page {} swapped in from word {} to frame {}",
                pcb.pid, page, disk, frame
            );
            return Ok(frame as u32 * PAGE_SIZE + offset);
        }

        if is_write {
            let frame = self.acquire_frame();
            self.frames[frame].owner = Some((pcb.pid, page));
            pcb.map_page(page, frame as u32);
            debug!("mmu: pid {}: allocated frame {} for page {}", pcb.pid, frame, page);
            return Ok(frame as u32 * PAGE_SIZE + offset);
        }

        Err(AccessError::UnmappedRead(vaddr))
    }

    /// Number of frames in main memory.
    pub fn num_frames(&self) -> usize {
        self.frames.len()
    }

    /// Number of frames currently free.
    pub fn free_frames(&self) -> usize {
        self.frames.iter().filter(|f| !f.used).count()
    }

    /// Owner of `frame`, if occupied.
    pub fn frame_owner(&self, frame: usize) -> Option<(u32, u32)> {
        self.frames.get(frame).and_then(|f| f.owner)
    }

    /// Snapshot of the swap table.
    pub fn swap_entries(&self) -> Vec<((u32, u32), u32)> {
        self.swap_table.iter().map(|(&k, &v)| (k, v)).collect()
    }

    /// Number of resident cache entries.
    pub fn cache_len(&self) -> usize {
        self.cache.len()
    }

    /// Main memory size in bytes.
    pub fn main_limit(&self) -> u32 {
        self.main_limit
    }

    /// Direct view of a main-memory word, bypassing the cache.
    pub fn peek_main(&self, word: usize) -> u32 {
        self.main.read_word(word)
    }

    /// Direct view of a secondary-memory word, bypassing the cache.
    pub fn peek_secondary(&self, word: usize) -> u32 {
        self.secondary.read_word(word)
    }

    /// First free frame, or a FIFO-selected victim after spilling it.
    fn acquire_frame(&mut self) -> usize {
        if let Some(i) = self.frames.iter().position(|f| !f.used) {
            self.frames[i].used = true;
            return i;
        }
        self.swap_out()
    }

    /// Vacates one frame, chosen by the FIFO victim pointer.
    ///
    /// An owned victim has its eight words appended to the swap area, its
    /// swap-table entry recorded, and its mapping removed from the owner's
    /// page table. Cache entries covering the frame are flushed out first
    /// so the reused physical range cannot serve the old page's words.
    ///
    /// # Panics
    ///
    /// Panics when the swap area cannot hold another page. With a secondary
    /// store sized for the workload this cannot occur; a mis-sized one is a
    /// configuration fault worth stopping on.
    fn swap_out(&mut self) -> usize {
        let victim = self.victim_ptr;
        self.victim_ptr = (victim + 1) % self.frames.len();

        let Some((pid, page)) = self.frames[victim].owner else {
            self.frames[victim].used = true;
            return victim;
        };

        if (self.next_swap_word + WORDS_PER_PAGE) as usize > self.secondary.len() {
            panic!(
                "swap area exhausted: cannot spill frame {} (pid {}, page {})",
                victim, pid, page
            );
        }

        let base = victim as u32 * PAGE_SIZE;
        let (cache, main, secondary, limit) = self.split();
        cache.evict_range(base, PAGE_SIZE, &mut |a, v| {
            route_write(main, secondary, limit, a, v)
        });

        for k in 0..WORDS_PER_PAGE {
            let word = self.main.read_word((victim as u32 * WORDS_PER_PAGE + k) as usize);
            self.secondary
                .write_word((self.next_swap_word + k) as usize, word);
        }
        self.swap_table.insert((pid, page), self.next_swap_word);
        self.next_swap_word += WORDS_PER_PAGE;

        if let Some(owner) = self.processes.get(&pid) {
            owner.unmap_page(page);
        }
        self.frames[victim].owner = None;
        self.frames[victim].used = true;

        debug!("mmu: pid {}: page {} swapped out of frame {}", pid, page, victim);
        victim
    }

    /// Copies eight words back from the swap area into `frame`.
    fn swap_in(&mut self, disk_word: u32, frame: usize) {
        for k in 0..WORDS_PER_PAGE {
            let word = self.secondary.read_word((disk_word + k) as usize);
            self.main
                .write_word((frame as u32 * WORDS_PER_PAGE + k) as usize, word);
        }
    }

    /// Split borrow for eviction sinks: the cache alongside both stores.
    fn split(&mut self) -> (&mut L1Cache, &mut WordStore, &mut WordStore, u32) {
        (
            &mut self.cache,
            &mut self.main,
            &mut self.secondary,
            self.main_limit,
        )
    }
}

/// Routes a physical byte address to the store that backs it.
fn route_write(main: &mut WordStore, secondary: &mut WordStore, limit: u32, phys: u32, value: u32) {
    if phys < limit {
        main.write_word((phys / 4) as usize, value);
    } else {
        secondary.write_word(((phys - limit) / 4) as usize, value);
    }
}
