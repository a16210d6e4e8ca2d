//! Test harness.
//!
//! `TestBed` wires a real memory manager to a single PCB so programs can be
//! hand-assembled into memory and run to completion through the actual
//! pipeline, without the threaded orchestrator.

use std::sync::{Arc, Mutex};

use moss_core::config::{MemWeightsConfig, MemoryConfig};
use moss_core::core::pipeline;
use moss_core::io::IoRequest;
use moss_core::mem::MemoryManager;
use moss_core::process::{MemWeights, Pcb, ProcessState};

/// Initializes test logging once; safe to call from every test.
pub fn init_logging() {
    let _ = env_logger::builder().is_test(true).try_init();
}

/// Memory configuration with the given store sizes.
pub fn mem_config(main_bytes: u32, secondary_bytes: u32) -> MemoryConfig {
    MemoryConfig {
        main_bytes,
        secondary_bytes,
        cache_capacity: 16,
        weights: MemWeightsConfig::default(),
    }
}

/// A memory manager plus one process, ready to run programs.
pub struct TestBed {
    pub mmu: Mutex<MemoryManager>,
    pub pcb: Arc<Pcb>,
}

impl TestBed {
    /// A bed with comfortable memory and a quantum large enough that short
    /// programs finish in one dispatch.
    pub fn new() -> Self {
        Self::with_config(mem_config(4096, 16384), 1000)
    }

    /// A bed with explicit memory sizes and quantum.
    pub fn with_config(cfg: MemoryConfig, quantum: u32) -> Self {
        init_logging();
        let mut mmu = MemoryManager::new(&cfg);
        let pcb = Arc::new(Pcb::new(1, "test", "test.json", 0, quantum, MemWeights::default()));
        mmu.register_process(Arc::clone(&pcb));
        Self {
            mmu: Mutex::new(mmu),
            pcb,
        }
    }

    /// Writes a program at byte address 0 and points the PC at it.
    pub fn load_words(&self, words: &[u32]) {
        let mut mmu = self.mmu.lock().unwrap();
        for (i, &w) in words.iter().enumerate() {
            mmu.write(i as u32 * 4, w, &self.pcb);
        }
        drop(mmu);
        self.pcb.registers.lock().unwrap().pc = 0;
    }

    /// Runs quanta until the process finishes, collecting I/O requests.
    ///
    /// Prints do not block (no print lock), so print-carrying programs run
    /// to their end sentinel.
    pub fn run(&self) -> Vec<IoRequest> {
        let mut requests = Vec::new();
        for _ in 0..10_000 {
            pipeline::run_quantum(&self.pcb, &self.mmu, &mut requests, false);
            if self.pcb.state() == ProcessState::Finished {
                return requests;
            }
        }
        panic!("program did not reach the end sentinel");
    }

    /// Runs a single quantum with the print lock held.
    pub fn run_one_quantum_locked(&self) -> Vec<IoRequest> {
        let mut requests = Vec::new();
        pipeline::run_quantum(&self.pcb, &self.mmu, &mut requests, true);
        requests
    }

    /// Value of a general register.
    pub fn reg(&self, idx: u8) -> u32 {
        self.pcb.registers.lock().unwrap().read(idx)
    }

    /// Current PC.
    pub fn pc(&self) -> u32 {
        self.pcb.registers.lock().unwrap().pc
    }
}
