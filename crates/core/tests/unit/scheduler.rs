//! Scheduler tests: policy ordering, stable tie-breaks, waiting-time
//! accounting, and the continue-without-readmission path.

use std::sync::atomic::Ordering::Relaxed;
use std::sync::Arc;

use moss_core::process::{MemWeights, Pcb, ProcessState};
use moss_core::sched::{Policy, Scheduler};

fn pcb(pid: u32, priority: i32, burst: u32) -> Arc<Pcb> {
    let p = Arc::new(Pcb::new(pid, format!("p{}", pid), "p.json", priority, 20, MemWeights::default()));
    p.burst_time.store(burst, Relaxed);
    p
}

#[test]
fn fcfs_dispatches_in_admission_order() {
    let s = Scheduler::new(Policy::Fcfs);
    s.admit(pcb(1, 0, 10), 0);
    s.admit(pcb(2, 0, 5), 0);
    s.admit(pcb(3, 0, 1), 0);

    assert_eq!(s.next(0).unwrap().pid, 1);
    assert_eq!(s.next(0).unwrap().pid, 2);
    assert_eq!(s.next(0).unwrap().pid, 3);
    assert!(s.next(0).is_none());
}

#[test]
fn sjn_orders_by_burst_time() {
    let s = Scheduler::new(Policy::Sjn);
    s.admit(pcb(1, 0, 30), 0);
    s.admit(pcb(2, 0, 10), 0);
    s.admit(pcb(3, 0, 20), 0);

    assert_eq!(s.next(0).unwrap().pid, 2);
    assert_eq!(s.next(0).unwrap().pid, 3);
    assert_eq!(s.next(0).unwrap().pid, 1);
}

#[test]
fn sjn_ties_break_by_admission_order() {
    let s = Scheduler::new(Policy::Sjn);
    s.admit(pcb(1, 0, 10), 0);
    s.admit(pcb(2, 0, 10), 0);
    s.admit(pcb(3, 0, 10), 0);

    assert_eq!(s.next(0).unwrap().pid, 1);
    assert_eq!(s.next(0).unwrap().pid, 2);
    assert_eq!(s.next(0).unwrap().pid, 3);
}

#[test]
fn priority_orders_descending() {
    let s = Scheduler::new(Policy::Priority);
    s.admit(pcb(1, 1, 0), 0);
    s.admit(pcb(2, 9, 0), 0);
    s.admit(pcb(3, 5, 0), 0);

    assert_eq!(s.next(0).unwrap().pid, 2);
    assert_eq!(s.next(0).unwrap().pid, 3);
    assert_eq!(s.next(0).unwrap().pid, 1);
}

#[test]
fn priority_ties_break_by_admission_order() {
    let s = Scheduler::new(Policy::Priority);
    s.admit(pcb(1, 5, 0), 0);
    s.admit(pcb(2, 5, 0), 0);

    assert_eq!(s.next(0).unwrap().pid, 1);
    assert_eq!(s.next(0).unwrap().pid, 2);
}

#[test]
fn only_round_robin_is_preemptive() {
    assert!(Policy::RoundRobin.is_preemptive());
    assert!(!Policy::Fcfs.is_preemptive());
    assert!(!Policy::Sjn.is_preemptive());
    assert!(!Policy::Priority.is_preemptive());
}

#[test]
fn admission_and_dispatch_drive_the_state_machine() {
    let s = Scheduler::new(Policy::RoundRobin);
    let p = pcb(1, 0, 0);
    s.admit(Arc::clone(&p), 0);
    assert_eq!(p.state(), ProcessState::Ready);
    assert_eq!(s.len(), 1);

    let got = s.next(10).unwrap();
    assert_eq!(got.state(), ProcessState::Running);
    assert!(s.is_empty());
}

#[test]
fn next_charges_waiting_time_since_admission() {
    let s = Scheduler::new(Policy::Fcfs);
    let p = pcb(1, 0, 0);
    s.admit(Arc::clone(&p), 100);
    let _ = s.next(130).unwrap();
    assert_eq!(p.waiting_time.load(Relaxed), 30);
}

#[test]
fn first_start_is_recorded_exactly_once() {
    let s = Scheduler::new(Policy::RoundRobin);
    let p = pcb(1, 0, 0);
    s.admit(Arc::clone(&p), 0);
    let got = s.next(7).unwrap();
    assert_eq!(p.first_start_time.load(Relaxed), 7);

    s.admit(got, 20);
    let _ = s.next(50).unwrap();
    assert_eq!(p.first_start_time.load(Relaxed), 7);
}

#[test]
fn push_front_continues_without_wait_charge() {
    let s = Scheduler::new(Policy::Fcfs);
    let p = pcb(1, 0, 0);
    s.admit(Arc::clone(&p), 0);
    let got = s.next(0).unwrap();

    got.set_state(ProcessState::Running);
    s.push_front(Arc::clone(&got));
    let waited = p.waiting_time.load(Relaxed);
    let again = s.next(500).unwrap();

    assert_eq!(again.pid, 1);
    assert_eq!(p.waiting_time.load(Relaxed), waited);
}

#[test]
fn push_front_takes_priority_over_the_queue() {
    let s = Scheduler::new(Policy::Fcfs);
    s.admit(pcb(1, 0, 0), 0);
    s.admit(pcb(2, 0, 0), 0);
    let first = s.next(0).unwrap();

    first.set_state(ProcessState::Running);
    s.push_front(first);
    assert_eq!(s.next(0).unwrap().pid, 1);
    assert_eq!(s.next(0).unwrap().pid, 2);
}

#[test]
fn set_policy_resorts_the_queue() {
    let s = Scheduler::new(Policy::Fcfs);
    s.admit(pcb(1, 1, 30), 0);
    s.admit(pcb(2, 9, 10), 0);

    s.set_policy(Policy::Priority);
    assert_eq!(s.next(0).unwrap().pid, 2);
}

#[test]
fn no_duplicate_entries_after_admit_and_next() {
    let s = Scheduler::new(Policy::RoundRobin);
    let p = pcb(1, 0, 0);
    s.admit(Arc::clone(&p), 0);
    let _ = s.next(0).unwrap();
    assert!(s.is_empty());
    assert!(!s.has_work());
}
