//! I/O manager.
//!
//! Serves three simulated devices (printer, disk, console print) through a
//! single FIFO request queue drained by one manager thread. Each manager
//! iteration:
//!
//! 1. Probabilistically marks the printer or disk as requesting work.
//! 2. Pairs the head of the waiting list with a requesting device, creating
//!    a request with a cost drawn uniformly from the configured steps.
//! 3. Dequeues one pending request, sleeps for its cost, charges the cost
//!    to the owning process, appends a service record, and marks the
//!    process Ready.
//!
//! Between two processes serviced for the same device, the earlier
//! registrant finishes first; there is no fairness guarantee across
//! devices. Waiting, request, and device state live under independent
//! mutexes. Shutdown is an atomic flag polled once per iteration.

use std::collections::VecDeque;
use std::fs::{self, File};
use std::io::Write;
use std::path::Path;
use std::sync::atomic::Ordering::Relaxed;
use std::sync::atomic::AtomicBool;
use std::sync::{Arc, Mutex};
use std::thread::{self, JoinHandle};
use std::time::Duration;

use log::{error, info};

use crate::config::IoConfig;
use crate::process::{Pcb, ProcessState};

/// Simulated device kinds.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum DeviceOp {
    /// Print job on the shared printer.
    Printer,
    /// Block read from the disk.
    Disk,
    /// Console print of a computed value.
    PrintValue,
}

impl DeviceOp {
    fn describe(self) -> &'static str {
        match self {
            DeviceOp::Printer => "printing document",
            DeviceOp::Disk => "reading from disk",
            DeviceOp::PrintValue => "printing value",
        }
    }
}

/// One pending I/O request.
pub struct IoRequest {
    /// Owning process; marked Ready once the request completes.
    pub process: Arc<Pcb>,
    /// Device kind.
    pub op: DeviceOp,
    /// Human-readable payload for the service record.
    pub message: String,
    /// Simulated cost in milliseconds; 0 lets the manager draw one.
    pub cost_ms: u64,
}

#[derive(Default)]
struct DeviceStates {
    printer_requesting: bool,
    disk_requesting: bool,
}

struct LogFiles {
    result: File,
    metrics: File,
}

struct Shared {
    waiting: Mutex<VecDeque<Arc<Pcb>>>,
    requests: Mutex<VecDeque<IoRequest>>,
    devices: Mutex<DeviceStates>,
    shutdown: AtomicBool,
    cfg: IoConfig,
    files: Mutex<Option<LogFiles>>,
}

/// The device manager. Owns one background thread for its whole lifetime.
pub struct IoManager {
    shared: Arc<Shared>,
    handle: Mutex<Option<JoinHandle<()>>>,
}

impl IoManager {
    /// Starts the manager thread.
    ///
    /// Service records go to `result.dat` and `io_metrics.dat` under
    /// `output_dir`. When the files cannot be opened the manager still
    /// runs and the records are dropped.
    pub fn new(cfg: IoConfig, output_dir: &Path) -> Self {
        let files = open_logs(output_dir);
        let shared = Arc::new(Shared {
            waiting: Mutex::new(VecDeque::new()),
            requests: Mutex::new(VecDeque::new()),
            devices: Mutex::new(DeviceStates::default()),
            shutdown: AtomicBool::new(false),
            cfg,
            files: Mutex::new(files),
        });
        let thread_shared = Arc::clone(&shared);
        let handle = thread::spawn(move || manager_loop(thread_shared));
        info!("io: manager thread started");
        Self {
            shared,
            handle: Mutex::new(Some(handle)),
        }
    }

    /// Enqueues a process that has blocked on I/O.
    pub fn register_waiting(&self, pcb: Arc<Pcb>) {
        self.shared.waiting.lock().unwrap().push_back(pcb);
    }

    /// Enqueues a ready-made request, as raised by PRINT.
    pub fn enqueue_request(&self, req: IoRequest) {
        self.shared.requests.lock().unwrap().push_back(req);
    }

    /// Pending request count.
    pub fn pending_requests(&self) -> usize {
        self.shared.requests.lock().unwrap().len()
    }

    /// Stops and joins the manager thread. Idempotent.
    pub fn shutdown(&self) {
        self.shared.shutdown.store(true, Relaxed);
        if let Some(handle) = self.handle.lock().unwrap().take() {
            let _ = handle.join();
            info!("io: manager thread stopped");
        }
    }
}

impl Drop for IoManager {
    fn drop(&mut self) {
        self.shutdown();
    }
}

fn open_logs(output_dir: &Path) -> Option<LogFiles> {
    if let Err(e) = fs::create_dir_all(output_dir) {
        error!("io: could not create {}: {}", output_dir.display(), e);
        return None;
    }
    let result = File::options()
        .create(true)
        .append(true)
        .open(output_dir.join("result.dat"));
    let metrics = File::options()
        .create(true)
        .append(true)
        .open(output_dir.join("io_metrics.dat"));
    match (result, metrics) {
        (Ok(result), Ok(metrics)) => Some(LogFiles { result, metrics }),
        (r, m) => {
            if let Err(e) = r.and(m) {
                error!("io: could not open service record files: {}", e);
            }
            None
        }
    }
}

fn manager_loop(shared: Arc<Shared>) {
    // Xorshift state; any odd seed works.
    let mut rng: u64 = 0x9e37_79b9_7f4a_7c15;
    let mut roll = |bound: u64| -> u64 {
        rng ^= rng << 13;
        rng ^= rng >> 7;
        rng ^= rng << 17;
        rng % bound.max(1)
    };

    while !shared.shutdown.load(Relaxed) {
        // Devices raise requests probabilistically.
        {
            let mut devices = shared.devices.lock().unwrap();
            if roll(100) < shared.cfg.printer_percent as u64 {
                devices.printer_requesting = true;
            }
            if roll(100) < shared.cfg.disk_percent as u64 {
                devices.disk_requesting = true;
            }
        }

        // Pair the oldest still-blocked waiter with a requesting device.
        let paired = {
            let mut waiting = shared.waiting.lock().unwrap();
            let mut devices = shared.devices.lock().unwrap();
            let mut paired = None;
            if devices.printer_requesting || devices.disk_requesting {
                while let Some(pcb) = waiting.pop_front() {
                    if pcb.state() == ProcessState::Blocked {
                        let op = if devices.printer_requesting {
                            devices.printer_requesting = false;
                            DeviceOp::Printer
                        } else {
                            devices.disk_requesting = false;
                            DeviceOp::Disk
                        };
                        let cost = draw_cost(&shared.cfg.cost_steps_ms, &mut roll);
                        paired = Some(IoRequest {
                            message: op.describe().to_string(),
                            process: pcb,
                            op,
                            cost_ms: cost,
                        });
                        break;
                    }
                }
            }
            paired
        };
        if let Some(req) = paired {
            shared.requests.lock().unwrap().push_back(req);
        }

        // Serve one request.
        let next = shared.requests.lock().unwrap().pop_front();
        match next {
            Some(mut req) => {
                if req.cost_ms == 0 {
                    req.cost_ms = draw_cost(&shared.cfg.cost_steps_ms, &mut roll);
                }
                thread::sleep(Duration::from_millis(req.cost_ms));
                req.process.io_cycles.fetch_add(req.cost_ms, Relaxed);
                record(&shared, &req);
                // A process that reached its end sentinel stays finished.
                if req.process.state() != ProcessState::Finished {
                    req.process.set_state(ProcessState::Ready);
                }
            }
            None => thread::sleep(Duration::from_millis(shared.cfg.poll_idle_ms)),
        }
    }
}

/// Uniform draw from the configured cost steps; 100 ms when none are set.
fn draw_cost(steps: &[u64], roll: &mut impl FnMut(u64) -> u64) -> u64 {
    if steps.is_empty() {
        100
    } else {
        steps[roll(steps.len() as u64) as usize]
    }
}

fn record(shared: &Shared, req: &IoRequest) {
    let mut files = shared.files.lock().unwrap();
    if let Some(files) = files.as_mut() {
        let _ = writeln!(files.result, "PID {} : {}", req.process.pid, req.message);
        let _ = writeln!(
            files.metrics,
            "PID {} op={:?} cost={}ms",
            req.process.pid, req.op, req.cost_ms
        );
    }
}
