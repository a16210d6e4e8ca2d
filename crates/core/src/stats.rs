//! Simulation statistics collection and reporting.
//!
//! This module derives per-process and system-wide metrics after a run. It
//! provides:
//! 1. **Process snapshots:** Turnaround, waiting, CPU and I/O time, plus the
//!    raw pipeline and memory counters captured from each PCB.
//! 2. **System aggregates:** Total simulated time, average waiting and
//!    turnaround, CPU utilisation, throughput, and efficiency.
//! 3. **Reporting:** A formatted console dump of both levels.

use std::sync::atomic::Ordering::Relaxed;
use std::sync::Arc;

use crate::process::{Pcb, ProcessState};
use crate::sched::Policy;

/// Metrics of one finished process.
#[derive(Clone, Debug)]
pub struct ProcessSnapshot {
    pub pid: u32,
    pub name: String,
    pub finished: bool,
    /// Cycles spent in the ready queue, from queue-boundary accounting.
    pub waiting_time: u64,
    /// `finish_time - arrival_time`.
    pub turnaround: u64,
    pub cpu_time: u64,
    /// Milliseconds of simulated I/O service.
    pub io_ms: u64,
    pub first_start: u64,
    pub finish: u64,
    pub pipeline_cycles: u64,
    pub stage_invocations: u64,
    pub memory_cycles: u64,
    pub mem_reads: u64,
    pub mem_writes: u64,
    pub mem_accesses_total: u64,
    pub cache_hits: u64,
    pub cache_misses: u64,
    pub cache_mem_accesses: u64,
    pub primary_mem_accesses: u64,
    pub secondary_mem_accesses: u64,
}

impl ProcessSnapshot {
    /// Captures the counters of `pcb`.
    pub fn capture(pcb: &Pcb) -> Self {
        let arrival = pcb.arrival_time.load(Relaxed);
        let finish = pcb.finish_time.load(Relaxed);
        Self {
            pid: pcb.pid,
            name: pcb.name.clone(),
            finished: pcb.state() == ProcessState::Finished,
            waiting_time: pcb.waiting_time.load(Relaxed),
            turnaround: finish.saturating_sub(arrival),
            cpu_time: pcb.cpu_time.load(Relaxed),
            io_ms: pcb.io_cycles.load(Relaxed),
            first_start: pcb.first_start_time.load(Relaxed),
            finish,
            pipeline_cycles: pcb.pipeline_cycles.load(Relaxed),
            stage_invocations: pcb.stage_invocations.load(Relaxed),
            memory_cycles: pcb.memory_cycles.load(Relaxed),
            mem_reads: pcb.mem_reads.load(Relaxed),
            mem_writes: pcb.mem_writes.load(Relaxed),
            mem_accesses_total: pcb.mem_accesses_total.load(Relaxed),
            cache_hits: pcb.cache_hits.load(Relaxed),
            cache_misses: pcb.cache_misses.load(Relaxed),
            cache_mem_accesses: pcb.cache_mem_accesses.load(Relaxed),
            primary_mem_accesses: pcb.primary_mem_accesses.load(Relaxed),
            secondary_mem_accesses: pcb.secondary_mem_accesses.load(Relaxed),
        }
    }
}

/// System-wide metrics of one policy run.
#[derive(Clone, Debug)]
pub struct SystemReport {
    /// Label of the policy the run used.
    pub policy: &'static str,
    pub process_count: usize,
    /// Largest per-core logical clock at shutdown.
    pub total_simulation: u64,
    /// Mean of `max(0, turnaround - cpu_time - io_ms)` over all processes.
    pub avg_waiting: f64,
    pub avg_turnaround: f64,
    /// Busy cycles over available cycles across all cores.
    pub cpu_utilisation: f64,
    /// Finished processes per simulated cycle.
    pub throughput: f64,
    /// Ideal parallel time over actual time.
    pub efficiency: f64,
    pub processes: Vec<ProcessSnapshot>,
}

impl SystemReport {
    /// Aggregates the run from the final PCBs and per-core counters.
    pub fn build(
        policy: Policy,
        processes: &[Arc<Pcb>],
        core_clock: &[u64],
        core_busy: &[u64],
    ) -> Self {
        let snapshots: Vec<ProcessSnapshot> =
            processes.iter().map(|p| ProcessSnapshot::capture(p)).collect();
        let n = snapshots.len().max(1) as f64;
        let cores = core_clock.len().max(1) as f64;

        let total_simulation = core_clock.iter().copied().max().unwrap_or(0);
        let span = total_simulation.max(1) as f64;

        let total_waiting: u64 = snapshots
            .iter()
            .map(|p| p.turnaround.saturating_sub(p.cpu_time).saturating_sub(p.io_ms))
            .sum();
        let total_turnaround: u64 = snapshots.iter().map(|p| p.turnaround).sum();
        let total_cpu: u64 = snapshots.iter().map(|p| p.cpu_time).sum();
        let total_busy: u64 = core_busy.iter().sum();

        Self {
            policy: policy.label(),
            process_count: snapshots.len(),
            total_simulation,
            avg_waiting: total_waiting as f64 / n,
            avg_turnaround: total_turnaround as f64 / n,
            cpu_utilisation: total_busy as f64 / (span * cores),
            throughput: snapshots.len() as f64 / span,
            efficiency: (total_cpu as f64 / cores) / span,
            processes: snapshots,
        }
    }

    /// Prints the report to stdout.
    pub fn print(&self) {
        println!("\n==========================================================");
        println!("SYSTEM METRICS ({})", self.policy);
        println!("==========================================================");
        println!("processes                {}", self.process_count);
        println!("total_simulation         {}", self.total_simulation);
        println!("avg_waiting              {:.2}", self.avg_waiting);
        println!("avg_turnaround           {:.2}", self.avg_turnaround);
        println!("cpu_utilisation          {:.2}%", self.cpu_utilisation * 100.0);
        println!("throughput               {:.4} proc/cycle", self.throughput);
        println!("efficiency               {:.2}%", self.efficiency * 100.0);
        println!("----------------------------------------------------------");
        for p in &self.processes {
            println!(
                "  pid {:<4} wait={:<8} turnaround={:<8} cpu={:<8} start={:<6} end={:<6} {}",
                p.pid,
                p.waiting_time,
                p.turnaround,
                p.cpu_time,
                p.first_start,
                p.finish,
                if p.finished { "finished" } else { "incomplete" },
            );
        }
        println!("==========================================================");
    }
}
