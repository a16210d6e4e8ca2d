//! Loader tests: JSON program assembly, labels, addressing forms, batch
//! handling, and loader error policy.

use std::fs;
use std::path::Path;
use std::sync::atomic::Ordering::Relaxed;

use moss_core::config::Config;
use moss_core::process::ProcessState;
use moss_core::sim::loader::{self, LoadError};

use crate::common::builder::{T0, T1, T2};
use crate::common::harness::TestBed;

fn write_file(dir: &Path, name: &str, content: &str) -> std::path::PathBuf {
    let path = dir.join(name);
    fs::write(&path, content).unwrap();
    path
}

/// Loads a program into a fresh bed and runs it to the end sentinel.
fn load_and_run(program: &str) -> TestBed {
    let dir = tempfile::tempdir().unwrap();
    let path = write_file(dir.path(), "prog.json", program);
    let bed = TestBed::new();
    loader::load_program(&path, &bed.mmu, &bed.pcb, 0).unwrap();
    bed.run();
    bed
}

#[test]
fn data_object_form_feeds_labelled_loads() {
    let bed = load_and_run(
        r#"{
            "data": { "x": 7 },
            "program": [
                { "instruction": "lw", "rt": "$t0", "base": "x" },
                { "instruction": "addi", "rs": "$t0", "rt": "$t1", "immediate": 1 },
                { "instruction": "end" }
            ]
        }"#,
    );
    assert_eq!(bed.reg(T0), 7);
    assert_eq!(bed.reg(T1), 8);
}

#[test]
fn data_array_form_places_consecutive_words() {
    let bed = load_and_run(
        r#"{
            "data": [
                { "label": "vec", "value": [10, 20, 30] }
            ],
            "program": [
                { "instruction": "lw", "rt": "$t0", "base": "vec" },
                { "instruction": "lw", "rt": "$t1", "base": "vec", "offset": 4 },
                { "instruction": "lw", "rt": "$t2", "base": "vec", "offset": 8 },
                { "instruction": "end" }
            ]
        }"#,
    );
    assert_eq!(bed.reg(T0), 10);
    assert_eq!(bed.reg(T1), 20);
    assert_eq!(bed.reg(T2), 30);
}

#[test]
fn hex_string_values_are_accepted() {
    let bed = load_and_run(
        r#"{
            "data": { "x": "0x2a" },
            "program": [
                { "instruction": "lw", "rt": "$t0", "base": "x" },
                { "instruction": "end" }
            ]
        }"#,
    );
    assert_eq!(bed.reg(T0), 42);
}

#[test]
fn branch_label_is_a_target_when_label1_is_absent() {
    // The branch skips the li $t0, 9.
    let bed = load_and_run(
        r#"{
            "program": [
                { "instruction": "li", "rt": "$t0", "immediate": 3 },
                { "instruction": "beq", "rs": "$t0", "rt": "$t0", "label": "out" },
                { "instruction": "li", "rt": "$t0", "immediate": 9 },
                { "instruction": "li", "rt": "$t0", "immediate": 42, "label": "out" },
                { "instruction": "end" }
            ]
        }"#,
    );
    assert_eq!(bed.reg(T0), 42);
}

#[test]
fn branch_label1_frees_label_to_define_a_symbol() {
    // Here `label` on the branch defines a symbol and `label1` names the
    // target.
    let bed = load_and_run(
        r#"{
            "program": [
                { "instruction": "li", "rt": "$t0", "immediate": 1 },
                { "instruction": "bne", "rs": "$t0", "rt": "$zero",
                  "label": "loop_head", "label1": "done" },
                { "instruction": "li", "rt": "$t1", "immediate": 9 },
                { "instruction": "li", "rt": "$t1", "immediate": 5, "label": "done" },
                { "instruction": "end" }
            ]
        }"#,
    );
    assert_eq!(bed.reg(T1), 5);
}

#[test]
fn jump_accepts_a_hex_address() {
    let bed = load_and_run(
        r#"{
            "program": [
                { "instruction": "j", "address": "0xc" },
                { "instruction": "li", "rt": "$t0", "immediate": 9 },
                { "instruction": "end" },
                { "instruction": "li", "rt": "$t0", "immediate": 5 },
                { "instruction": "end" }
            ]
        }"#,
    );
    assert_eq!(bed.reg(T0), 5);
}

#[test]
fn offset_base_address_form_is_parsed() {
    let bed = load_and_run(
        r#"{
            "program": [
                { "instruction": "li", "rt": "$t0", "immediate": 33 },
                { "instruction": "sw", "rt": "$t0", "addr": "100($zero)" },
                { "instruction": "lw", "rt": "$t1", "addr": "100($zero)" },
                { "instruction": "end" }
            ]
        }"#,
    );
    assert_eq!(bed.reg(T1), 33);
}

#[test]
fn start_label_sets_the_entry_point() {
    let bed = load_and_run(
        r#"{
            "program": [
                { "instruction": "li", "rt": "$t0", "immediate": 9 },
                { "instruction": "li", "rt": "$t1", "immediate": 4, "label": "start" },
                { "instruction": "end" }
            ]
        }"#,
    );
    // Execution began at the labelled instruction, skipping the first li.
    assert_eq!(bed.reg(T0), 0);
    assert_eq!(bed.reg(T1), 4);
}

#[test]
fn burst_time_counts_instructions() {
    let dir = tempfile::tempdir().unwrap();
    let path = write_file(
        dir.path(),
        "prog.json",
        r#"{
            "program": [
                { "instruction": "li", "rt": "$t0", "immediate": 1 },
                { "instruction": "li", "rt": "$t1", "immediate": 2 },
                { "instruction": "end" }
            ]
        }"#,
    );
    let bed = TestBed::new();
    loader::load_program(&path, &bed.mmu, &bed.pcb, 0).unwrap();
    assert_eq!(bed.pcb.burst_time.load(Relaxed), 3);
}

#[test]
fn unknown_mnemonic_aborts_the_program() {
    let dir = tempfile::tempdir().unwrap();
    let path = write_file(
        dir.path(),
        "prog.json",
        r#"{ "program": [ { "instruction": "frobnicate" } ] }"#,
    );
    let bed = TestBed::new();
    let err = loader::load_program(&path, &bed.mmu, &bed.pcb, 0).unwrap_err();
    assert!(matches!(err, LoadError::UnknownInstruction(_)));
}

#[test]
fn unknown_register_aborts_the_program() {
    let dir = tempfile::tempdir().unwrap();
    let path = write_file(
        dir.path(),
        "prog.json",
        r#"{ "program": [ { "instruction": "li", "rt": "$bogus", "immediate": 1 } ] }"#,
    );
    let bed = TestBed::new();
    let err = loader::load_program(&path, &bed.mmu, &bed.pcb, 0).unwrap_err();
    assert!(matches!(err, LoadError::UnknownRegister(_)));
}

#[test]
fn unknown_branch_label_aborts_the_program() {
    let dir = tempfile::tempdir().unwrap();
    let path = write_file(
        dir.path(),
        "prog.json",
        r#"{ "program": [
            { "instruction": "beq", "rs": "$t0", "rt": "$t0", "label1": "nowhere" },
            { "instruction": "end" }
        ] }"#,
    );
    let bed = TestBed::new();
    let err = loader::load_program(&path, &bed.mmu, &bed.pcb, 0).unwrap_err();
    assert!(matches!(err, LoadError::UnknownLabel(_)));
}

#[test]
fn missing_batch_file_is_fatal() {
    let bed = TestBed::new();
    let err = loader::load_batch(
        Path::new("/nonexistent/batch.json"),
        &bed.mmu,
        &Config::default(),
    )
    .unwrap_err();
    assert!(matches!(err, LoadError::Io { .. }));
}

#[test]
fn broken_process_entries_are_skipped() {
    let dir = tempfile::tempdir().unwrap();
    write_file(
        dir.path(),
        "good.json",
        r#"{ "pid": 1, "name": "good", "program_path": "prog.json", "priority": 2 }"#,
    );
    write_file(dir.path(), "bad.json", r#"{ "not": "a manifest" }"#);
    write_file(
        dir.path(),
        "prog.json",
        r#"{ "program": [ { "instruction": "end" } ] }"#,
    );
    let batch = write_file(
        dir.path(),
        "batch.json",
        r#"{ "processes": ["good.json", "bad.json", "missing.json"] }"#,
    );

    let bed = TestBed::new();
    let loaded = loader::load_batch(&batch, &bed.mmu, &Config::default()).unwrap();
    assert_eq!(loaded.len(), 1);
    assert_eq!(loaded[0].pid, 1);
    assert_eq!(loaded[0].name, "good");
    assert_eq!(loaded[0].priority, 2);
    assert_eq!(loaded[0].state(), ProcessState::Ready);
}

#[test]
fn all_broken_entries_yield_an_empty_batch_error() {
    let dir = tempfile::tempdir().unwrap();
    let batch = write_file(
        dir.path(),
        "batch.json",
        r#"{ "processes": ["missing.json"] }"#,
    );
    let bed = TestBed::new();
    let err = loader::load_batch(&batch, &bed.mmu, &Config::default()).unwrap_err();
    assert!(matches!(err, LoadError::EmptyBatch(_)));
}
