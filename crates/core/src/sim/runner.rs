//! Orchestrator.
//!
//! Seeds the scheduler from a parsed batch, spawns the core workers and the
//! I/O worker, joins everything, and aggregates the system report. Each
//! core worker owns a logical clock and a busy-time counter:
//!
//! 1. Pull the next PCB from the scheduler at the core's clock.
//! 2. Run one quantum through the pipeline and forward raised I/O requests.
//! 3. Advance the clock and busy counter by the cycles actually used.
//! 4. Redispatch by post-run state: blocked processes register with the I/O
//!    manager and join the blocked list, finished ones stamp their finish
//!    time, everything else is re-admitted (preemptive) or pushed back to
//!    the queue head (non-preemptive).
//!
//! The I/O worker polls the blocked list and re-admits processes the I/O
//! manager has marked Ready. All loops terminate once every process has
//! finished.

use std::path::Path;
use std::sync::atomic::Ordering::Relaxed;
use std::sync::atomic::{AtomicU64, AtomicUsize};
use std::sync::{Arc, Mutex};
use std::thread;
use std::time::Duration;

use log::{debug, error, info};

use super::loader::{self, LoadError};
use super::report;
use crate::config::Config;
use crate::core::pipeline;
use crate::io::IoManager;
use crate::mem::MemoryManager;
use crate::process::{Pcb, ProcessState};
use crate::sched::{Policy, Scheduler};
use crate::stats::SystemReport;

/// Sleep between scheduler polls when a core finds no ready process.
const CORE_RETRY: Duration = Duration::from_millis(1);

/// Sleep between blocked-list sweeps of the I/O worker.
const IO_POLL: Duration = Duration::from_millis(5);

/// Runs one batch under `policy` and returns the aggregated report.
///
/// Report files are written under the configured output directory; file
/// write failures are logged without failing the run.
pub fn run_batch(
    config: &Config,
    policy: Policy,
    batch_path: &Path,
) -> Result<SystemReport, LoadError> {
    let output_dir = Path::new(&config.system.output_dir).to_path_buf();

    let mmu = Arc::new(Mutex::new(MemoryManager::new(&config.memory)));
    let io = Arc::new(IoManager::new(config.io.clone(), &output_dir));
    let scheduler = Arc::new(Scheduler::new(policy));

    let processes = loader::load_batch(batch_path, &mmu, config)?;
    let total = processes.len();
    info!("runner: {} processes admitted under {}", total, policy.label());
    for pcb in &processes {
        pcb.arrival_time.store(0, Relaxed);
        scheduler.admit(Arc::clone(pcb), 0);
    }

    let num_cores = config.system.num_cores.max(1);
    let core_clock: Arc<Vec<AtomicU64>> =
        Arc::new((0..num_cores).map(|_| AtomicU64::new(0)).collect());
    let core_busy: Arc<Vec<AtomicU64>> =
        Arc::new((0..num_cores).map(|_| AtomicU64::new(0)).collect());
    let finished = Arc::new(AtomicUsize::new(0));
    let blocked: Arc<Mutex<Vec<Arc<Pcb>>>> = Arc::new(Mutex::new(Vec::new()));

    let mut handles = Vec::with_capacity(num_cores);
    for id in 0..num_cores {
        let scheduler = Arc::clone(&scheduler);
        let mmu = Arc::clone(&mmu);
        let io = Arc::clone(&io);
        let blocked = Arc::clone(&blocked);
        let finished = Arc::clone(&finished);
        let clock = Arc::clone(&core_clock);
        let busy = Arc::clone(&core_busy);
        handles.push(thread::spawn(move || {
            core_worker(
                id, &scheduler, &mmu, &io, &blocked, &finished, total, &clock, &busy,
            );
        }));
    }

    let io_handle = {
        let scheduler = Arc::clone(&scheduler);
        let blocked = Arc::clone(&blocked);
        let finished = Arc::clone(&finished);
        let clock = Arc::clone(&core_clock);
        thread::spawn(move || io_worker(&scheduler, &blocked, &finished, total, &clock))
    };

    for handle in handles {
        let _ = handle.join();
    }
    let _ = io_handle.join();
    io.shutdown();

    let clocks: Vec<u64> = core_clock.iter().map(|c| c.load(Relaxed)).collect();
    let busys: Vec<u64> = core_busy.iter().map(|c| c.load(Relaxed)).collect();
    let report = SystemReport::build(policy, &processes, &clocks, &busys);

    if let Err(e) = report::write_all(&output_dir, &report, &processes) {
        error!("runner: could not write report files: {}", e);
    }
    Ok(report)
}

/// One core's dispatch loop.
#[allow(clippy::too_many_arguments)]
fn core_worker(
    id: usize,
    scheduler: &Scheduler,
    mmu: &Mutex<MemoryManager>,
    io: &IoManager,
    blocked: &Mutex<Vec<Arc<Pcb>>>,
    finished: &AtomicUsize,
    total: usize,
    clock: &[AtomicU64],
    busy: &[AtomicU64],
) {
    while finished.load(Relaxed) < total {
        let now = clock[id].load(Relaxed);
        let Some(pcb) = scheduler.next(now) else {
            thread::sleep(CORE_RETRY);
            continue;
        };

        debug!(
            "core {}: dispatch pid {} ({}), quantum {}",
            id, pcb.pid, pcb.name, pcb.quantum
        );
        let before = pcb.pipeline_cycles.load(Relaxed);
        let mut requests = Vec::new();
        pipeline::run_quantum(&pcb, mmu, &mut requests, true);
        for req in requests {
            io.enqueue_request(req);
        }

        let used = pcb.pipeline_cycles.load(Relaxed).saturating_sub(before);
        pcb.cpu_time.fetch_add(used, Relaxed);
        busy[id].fetch_add(used, Relaxed);
        clock[id].fetch_add(used, Relaxed);

        match pcb.state() {
            ProcessState::Blocked => {
                debug!("core {}: pid {} blocked on I/O", id, pcb.pid);
                io.register_waiting(Arc::clone(&pcb));
                blocked.lock().unwrap().push(pcb);
            }
            ProcessState::Finished => {
                let at = clock[id].load(Relaxed);
                pcb.finish_time.store(at, Relaxed);
                info!("core {}: pid {} finished at {}", id, pcb.pid, at);
                finished.fetch_add(1, Relaxed);
            }
            _ => {
                if scheduler.policy().is_preemptive() {
                    debug!("core {}: pid {} quantum expired, re-admitted", id, pcb.pid);
                    scheduler.admit(pcb, clock[id].load(Relaxed));
                } else {
                    pcb.set_state(ProcessState::Running);
                    scheduler.push_front(pcb);
                }
            }
        }
    }
    debug!("core {}: all processes finished", id);
}

/// Moves unblocked processes back into the ready queue.
fn io_worker(
    scheduler: &Scheduler,
    blocked: &Mutex<Vec<Arc<Pcb>>>,
    finished: &AtomicUsize,
    total: usize,
    clock: &[AtomicU64],
) {
    debug!("io worker: started");
    while finished.load(Relaxed) < total {
        thread::sleep(IO_POLL);
        let now = clock.iter().map(|c| c.load(Relaxed)).max().unwrap_or(0);

        let mut list = blocked.lock().unwrap();
        let mut i = 0;
        while i < list.len() {
            if list[i].state() == ProcessState::Ready {
                let pcb = list.remove(i);
                debug!("io worker: pid {} unblocked", pcb.pid);
                scheduler.admit(pcb, now);
            } else {
                i += 1;
            }
        }
    }
    debug!("io worker: finished");
}
