//! Process control block.
//!
//! The PCB is the unit of scheduling and accounting. It holds the process
//! identity, its register bank and page table, and a set of atomic metric
//! counters every subsystem increments as the process moves through the
//! machine. A PCB is shared across threads as `Arc<Pcb>`; at any instant it
//! is referenced from exactly one of the ready queue, a running core, the
//! blocked list, or the finished set, with transitions mediated by the
//! scheduler and the I/O manager.

use std::collections::HashMap;
use std::sync::atomic::Ordering::Relaxed;
use std::sync::atomic::{AtomicBool, AtomicU32, AtomicU64, AtomicU8};
use std::sync::Mutex;

use crate::common::RegisterBank;
use crate::config::MemWeightsConfig;

/// Process lifecycle states.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[repr(u8)]
pub enum ProcessState {
    Ready = 0,
    Running = 1,
    Blocked = 2,
    Finished = 3,
}

impl ProcessState {
    fn from_u8(v: u8) -> Self {
        match v {
            0 => ProcessState::Ready,
            1 => ProcessState::Running,
            2 => ProcessState::Blocked,
            _ => ProcessState::Finished,
        }
    }
}

/// Memory cycles charged per access to each tier, copied per process.
#[derive(Clone, Copy, Debug)]
pub struct MemWeights {
    pub cache: u64,
    pub primary: u64,
    pub secondary: u64,
}

impl Default for MemWeights {
    fn default() -> Self {
        Self {
            cache: 1,
            primary: 5,
            secondary: 10,
        }
    }
}

impl From<MemWeightsConfig> for MemWeights {
    fn from(cfg: MemWeightsConfig) -> Self {
        Self {
            cache: cfg.cache,
            primary: cfg.primary,
            secondary: cfg.secondary,
        }
    }
}

/// Process control block.
///
/// All counters are plain atomic increments; no invariant spans more than
/// one counter within a single update.
#[derive(Debug)]
pub struct Pcb {
    /// Process id.
    pub pid: u32,
    /// Human-readable name.
    pub name: String,
    /// Path of the program file this process was loaded from.
    pub program_path: String,
    /// Quantum in pipeline cycles.
    pub quantum: u32,
    /// Priority; higher values are stronger.
    pub priority: i32,
    /// Loaded instruction count; shortest-job ordering key.
    pub burst_time: AtomicU32,
    /// Per-process memory access weights.
    pub weights: MemWeights,

    state: AtomicU8,
    /// Full register bank; locked by the core running the process.
    pub registers: Mutex<RegisterBank>,
    /// Virtual page number to frame index.
    pub page_table: Mutex<HashMap<u32, u32>>,

    /// Pipeline clock ticks consumed.
    pub pipeline_cycles: AtomicU64,
    /// Stage function invocations, including bubbles.
    pub stage_invocations: AtomicU64,
    /// Memory reads issued to the manager.
    pub mem_reads: AtomicU64,
    /// Memory writes issued to the manager.
    pub mem_writes: AtomicU64,
    /// Reads plus writes.
    pub mem_accesses_total: AtomicU64,
    /// Cache hits.
    pub cache_hits: AtomicU64,
    /// Cache misses.
    pub cache_misses: AtomicU64,
    /// Cache lookups (hits plus misses).
    pub cache_mem_accesses: AtomicU64,
    /// Main-memory accesses.
    pub primary_mem_accesses: AtomicU64,
    /// Secondary-memory accesses.
    pub secondary_mem_accesses: AtomicU64,
    /// Weighted memory cycles.
    pub memory_cycles: AtomicU64,
    /// Milliseconds spent in simulated I/O service.
    pub io_cycles: AtomicU64,

    /// Logical time the process entered the system.
    pub arrival_time: AtomicU64,
    /// Logical time the process was first dispatched.
    pub first_start_time: AtomicU64,
    /// Logical time the process finished.
    pub finish_time: AtomicU64,
    /// Logical time of the most recent ready-queue admission.
    pub last_ready_in: AtomicU64,
    /// Cycles spent actually running on a core.
    pub cpu_time: AtomicU64,
    /// Cycles spent waiting in the ready queue.
    pub waiting_time: AtomicU64,

    started: AtomicBool,
    trace: Mutex<Vec<String>>,
}

impl Pcb {
    /// Creates a fresh Ready PCB with zeroed registers and counters.
    pub fn new(
        pid: u32,
        name: impl Into<String>,
        program_path: impl Into<String>,
        priority: i32,
        quantum: u32,
        weights: MemWeights,
    ) -> Self {
        Self {
            pid,
            name: name.into(),
            program_path: program_path.into(),
            quantum,
            priority,
            burst_time: AtomicU32::new(0),
            weights,
            state: AtomicU8::new(ProcessState::Ready as u8),
            registers: Mutex::new(RegisterBank::new()),
            page_table: Mutex::new(HashMap::new()),
            pipeline_cycles: AtomicU64::new(0),
            stage_invocations: AtomicU64::new(0),
            mem_reads: AtomicU64::new(0),
            mem_writes: AtomicU64::new(0),
            mem_accesses_total: AtomicU64::new(0),
            cache_hits: AtomicU64::new(0),
            cache_misses: AtomicU64::new(0),
            cache_mem_accesses: AtomicU64::new(0),
            primary_mem_accesses: AtomicU64::new(0),
            secondary_mem_accesses: AtomicU64::new(0),
            memory_cycles: AtomicU64::new(0),
            io_cycles: AtomicU64::new(0),
            arrival_time: AtomicU64::new(0),
            first_start_time: AtomicU64::new(0),
            finish_time: AtomicU64::new(0),
            last_ready_in: AtomicU64::new(0),
            cpu_time: AtomicU64::new(0),
            waiting_time: AtomicU64::new(0),
            started: AtomicBool::new(false),
            trace: Mutex::new(Vec::new()),
        }
    }

    /// Current lifecycle state.
    pub fn state(&self) -> ProcessState {
        ProcessState::from_u8(self.state.load(Relaxed))
    }

    /// Transitions to `state`.
    pub fn set_state(&self, state: ProcessState) {
        self.state.store(state as u8, Relaxed);
    }

    /// Marks the first dispatch; returns true exactly once.
    pub fn mark_started(&self) -> bool {
        !self.started.swap(true, Relaxed)
    }

    /// Installs a page-table mapping.
    pub fn map_page(&self, page: u32, frame: u32) {
        self.page_table.lock().unwrap().insert(page, frame);
    }

    /// Removes a page-table mapping.
    pub fn unmap_page(&self, page: u32) {
        self.page_table.lock().unwrap().remove(&page);
    }

    /// Looks up the frame holding `page`, if mapped.
    pub fn frame_for(&self, page: u32) -> Option<u32> {
        self.page_table.lock().unwrap().get(&page).copied()
    }

    /// Accounts one cache lookup outcome.
    pub fn record_cache(&self, hit: bool) {
        if hit {
            self.cache_hits.fetch_add(1, Relaxed);
        } else {
            self.cache_misses.fetch_add(1, Relaxed);
        }
    }

    /// Appends a line to the operation trace.
    pub fn push_trace(&self, line: String) {
        self.trace.lock().unwrap().push(line);
    }

    /// Snapshot of the operation trace.
    pub fn trace_lines(&self) -> Vec<String> {
        self.trace.lock().unwrap().clone()
    }
}
