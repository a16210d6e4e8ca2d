//! Multi-core operating-system simulator library.
//!
//! This crate implements a batch-oriented multi-core OS simulator with the following:
//! 1. **Core:** Five-stage pipeline (fetch, decode, execute, memory, writeback) with
//!    RAW-hazard bubbles and branch flushing, plus the ALU and register bank.
//! 2. **Memory:** Virtual-to-physical translation, lazy frame allocation, FIFO swap,
//!    and a write-back L1 cache over word-addressable main and secondary stores.
//! 3. **ISA:** A MIPS-like 32-bit instruction set (decode tables, ABI names, encoders).
//! 4. **Scheduling:** A policy-driven ready queue (FCFS, SJN, RR, Priority) feeding
//!    per-core worker threads with logical clocks.
//! 5. **I/O:** A device manager thread with blocking semantics for console prints.
//! 6. **Simulation:** JSON batch/program loaders, the orchestrator, and metric reports.

/// Common types (errors, the register bank).
pub mod common;
/// Simulator configuration (defaults, hierarchical config structures).
pub mod config;
/// CPU core (ALU, five-stage pipeline).
pub mod core;
/// Device manager and I/O request queue.
pub mod io;
/// Instruction set (opcodes, ABI register names, decoder, encoder).
pub mod isa;
/// Memory hierarchy (word stores, L1 cache, memory manager).
pub mod mem;
/// Process control block and per-process accounting.
pub mod process;
/// Policy-driven ready queue.
pub mod sched;
/// Batch loading, orchestration, and report writers.
pub mod sim;
/// Per-process and system-wide metric collection and printing.
pub mod stats;

/// Root configuration type; use `Config::default()` or deserialize from JSON.
pub use crate::config::Config;
/// Memory manager; owns main memory, secondary memory, cache, and page tables.
pub use crate::mem::MemoryManager;
/// Process control block, the unit of scheduling and accounting.
pub use crate::process::Pcb;
/// Scheduling policy selector.
pub use crate::sched::Policy;
