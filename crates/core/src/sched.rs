//! Policy-driven ready queue.
//!
//! The scheduler keeps a double-ended queue of PCB references behind one
//! mutex. Admission order depends on the active policy:
//!
//! | Policy   | Admission order                                | Preemptive |
//! |----------|------------------------------------------------|------------|
//! | FCFS     | append                                         | no         |
//! | SJN      | append, stable sort ascending by burst time    | no         |
//! | RR       | append                                         | yes        |
//! | Priority | append, stable sort descending by priority     | policy-level only |
//!
//! Sorting is stable, so admission order breaks ties. Waiting-time and
//! first-dispatch bookkeeping happen at the queue boundary: `admit` stamps
//! the ready-in time, `next` charges the wait and marks the first start.

use std::collections::VecDeque;
use std::sync::atomic::Ordering::Relaxed;
use std::sync::{Arc, Mutex};

use serde::Deserialize;

use crate::process::{Pcb, ProcessState};

/// Scheduling policy selector.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Policy {
    /// First come, first served.
    #[serde(alias = "Fcfs")]
    Fcfs,
    /// Shortest job next, ordered by burst time.
    #[serde(alias = "Sjn")]
    Sjn,
    /// Round robin with quantum preemption.
    #[default]
    #[serde(alias = "Rr", rename = "RR")]
    RoundRobin,
    /// Highest priority value first.
    #[serde(alias = "Priority")]
    Priority,
}

impl Policy {
    /// Whether quantum expiry sends the process back through `admit`.
    pub fn is_preemptive(self) -> bool {
        matches!(self, Policy::RoundRobin)
    }

    /// Upper-case label used in report file names.
    pub fn label(self) -> &'static str {
        match self {
            Policy::Fcfs => "FCFS",
            Policy::Sjn => "SJN",
            Policy::RoundRobin => "RR",
            Policy::Priority => "PRIORITY",
        }
    }
}

struct Inner {
    queue: VecDeque<Arc<Pcb>>,
    policy: Policy,
}

/// Thread-safe ready queue.
pub struct Scheduler {
    inner: Mutex<Inner>,
}

impl Scheduler {
    /// Creates an empty ready queue under `policy`.
    pub fn new(policy: Policy) -> Self {
        Self {
            inner: Mutex::new(Inner {
                queue: VecDeque::new(),
                policy,
            }),
        }
    }

    /// Active policy.
    pub fn policy(&self) -> Policy {
        self.inner.lock().unwrap().policy
    }

    /// Admits `pcb` to the ready queue at logical time `now`.
    ///
    /// The process becomes Ready, its ready-in time is stamped, and the
    /// queue is re-sorted when the policy requires an order.
    pub fn admit(&self, pcb: Arc<Pcb>, now: u64) {
        let mut inner = self.inner.lock().unwrap();
        pcb.set_state(ProcessState::Ready);
        pcb.last_ready_in.store(now, Relaxed);
        inner.queue.push_back(pcb);
        resort(&mut inner);
    }

    /// Pops the next process at logical time `now`, if any.
    ///
    /// Charges `now - last_ready_in` to the process's waiting time, records
    /// the first dispatch, and marks the process Running.
    pub fn next(&self, now: u64) -> Option<Arc<Pcb>> {
        let mut inner = self.inner.lock().unwrap();
        let pcb = inner.queue.pop_front()?;
        // A pushed-front process is still Running and owes no wait.
        if pcb.state() == ProcessState::Ready {
            let waited = now.saturating_sub(pcb.last_ready_in.load(Relaxed));
            pcb.waiting_time.fetch_add(waited, Relaxed);
        }
        if pcb.mark_started() {
            pcb.first_start_time.store(now, Relaxed);
        }
        pcb.set_state(ProcessState::Running);
        Some(pcb)
    }

    /// Puts `pcb` at the head of the queue without re-admission.
    ///
    /// Used by non-preemptive policies to let a process continue after a
    /// quantum without charging wait time.
    pub fn push_front(&self, pcb: Arc<Pcb>) {
        self.inner.lock().unwrap().queue.push_front(pcb);
    }

    /// Whether any process is ready.
    pub fn has_work(&self) -> bool {
        !self.inner.lock().unwrap().queue.is_empty()
    }

    /// Switches the policy and re-sorts the queue under the new order.
    pub fn set_policy(&self, policy: Policy) {
        let mut inner = self.inner.lock().unwrap();
        inner.policy = policy;
        resort(&mut inner);
    }

    /// Number of queued processes.
    pub fn len(&self) -> usize {
        self.inner.lock().unwrap().queue.len()
    }

    /// Whether the queue is empty.
    pub fn is_empty(&self) -> bool {
        self.inner.lock().unwrap().queue.is_empty()
    }
}

fn resort(inner: &mut Inner) {
    match inner.policy {
        Policy::Sjn => inner
            .queue
            .make_contiguous()
            .sort_by_key(|p| p.burst_time.load(Relaxed)),
        Policy::Priority => inner
            .queue
            .make_contiguous()
            .sort_by_key(|p| std::cmp::Reverse(p.priority)),
        Policy::Fcfs | Policy::RoundRobin => {}
    }
}
