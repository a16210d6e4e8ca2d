//! Report file writers.
//!
//! Three files per run, all under the output directory:
//! - `metricas/metricas_<POLICY>.dat`: the aggregate system metrics.
//! - `resultados/resultados.dat`: cumulative per-process summaries.
//! - `resultados/output_<pid>.dat`: register dump and operation trace of
//!   one process.

use std::fs::{self, File};
use std::io::{self, Write};
use std::path::Path;
use std::sync::atomic::Ordering::Relaxed;
use std::sync::Arc;

use crate::process::Pcb;
use crate::stats::SystemReport;

/// Writes every report file for a finished run.
pub fn write_all(
    output_dir: &Path,
    report: &SystemReport,
    processes: &[Arc<Pcb>],
) -> io::Result<()> {
    write_system_report(output_dir, report)?;
    write_process_reports(output_dir, processes)?;
    Ok(())
}

/// Writes `metricas/metricas_<POLICY>.dat`.
pub fn write_system_report(output_dir: &Path, report: &SystemReport) -> io::Result<()> {
    let dir = output_dir.join("metricas");
    fs::create_dir_all(&dir)?;
    let mut f = File::create(dir.join(format!("metricas_{}.dat", report.policy)))?;

    writeln!(f, "==== METRICS FOR POLICY {} ====", report.policy)?;
    writeln!(f)?;
    writeln!(f, "processes:          {}", report.process_count)?;
    writeln!(f, "total simulation:   {}", report.total_simulation)?;
    writeln!(f, "avg waiting:        {:.2}", report.avg_waiting)?;
    writeln!(f, "avg turnaround:     {:.2}", report.avg_turnaround)?;
    writeln!(f, "cpu utilisation:    {:.2}%", report.cpu_utilisation * 100.0)?;
    writeln!(f, "throughput:         {:.4} proc/cycle", report.throughput)?;
    writeln!(f, "efficiency:         {:.2}%", report.efficiency * 100.0)?;
    writeln!(f)?;
    writeln!(f, "---- per-process ----")?;
    for p in &report.processes {
        writeln!(
            f,
            "PID {} | wait={} | turnaround={} | cpu={} | start={} | end={}",
            p.pid, p.waiting_time, p.turnaround, p.cpu_time, p.first_start, p.finish
        )?;
    }
    Ok(())
}

/// Writes `resultados/resultados.dat` and one `output_<pid>.dat` each.
pub fn write_process_reports(output_dir: &Path, processes: &[Arc<Pcb>]) -> io::Result<()> {
    let dir = output_dir.join("resultados");
    fs::create_dir_all(&dir)?;

    let mut summary = File::options()
        .create(true)
        .append(true)
        .open(dir.join("resultados.dat"))?;

    for pcb in processes {
        writeln!(summary, "=== Execution results (PID: {}) ===", pcb.pid)?;
        writeln!(summary, "name: {}", pcb.name)?;
        writeln!(summary, "quantum: {}", pcb.quantum)?;
        writeln!(summary, "priority: {}", pcb.priority)?;
        writeln!(summary, "pipeline cycles: {}", pcb.pipeline_cycles.load(Relaxed))?;
        writeln!(summary, "memory cycles: {}", pcb.memory_cycles.load(Relaxed))?;
        writeln!(summary, "cache hits: {}", pcb.cache_hits.load(Relaxed))?;
        writeln!(summary, "cache misses: {}", pcb.cache_misses.load(Relaxed))?;
        writeln!(summary, "io milliseconds: {}", pcb.io_cycles.load(Relaxed))?;
        writeln!(summary, "--------------------------------")?;

        let mut out = File::create(dir.join(format!("output_{}.dat", pcb.pid)))?;
        writeln!(out, "=== Program output (PID {}) ===", pcb.pid)?;
        writeln!(out, "registers:")?;
        write!(out, "{}", pcb.registers.lock().unwrap().dump())?;
        writeln!(out)?;
        writeln!(out, "=== Executed operations ===")?;
        let lines = pcb.trace_lines();
        if lines.is_empty() {
            writeln!(out, "(no operations recorded)")?;
        } else {
            for line in lines {
                writeln!(out, "{}", line)?;
            }
        }
        writeln!(out, "=== End of recorded operations ===")?;
    }
    Ok(())
}
