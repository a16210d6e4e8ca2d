//! Pipeline engine.
//!
//! Runs one process on one core for up to its quantum. Each clock tick
//! drives the five stages over the latch history, later stages first, so
//! every stage observes the previous tick's values:
//!
//! 1. Write-back for the latch at `counter - 4`.
//! 2. Memory access for `counter - 3`.
//! 3. Execute for `counter - 2` (taken branches redirect the PC and poison
//!    the most recently fetched latch).
//! 4. Decode for `counter - 1` (RAW conflicts rewrite the slot to a bubble
//!    and roll the PC back).
//! 5. Fetch of a new latch, while the program has not ended.
//!
//! When the quantum expires or the end sentinel is fetched, fetching stops
//! and a drain counter lets the four in-flight instructions complete.

use std::sync::atomic::Ordering::Relaxed;
use std::sync::{Arc, Mutex, MutexGuard};

use log::{error, trace};

use super::hazards;
use super::latch::Latch;
use crate::common::RegisterBank;
use crate::core::alu::{Alu, AluOp};
use crate::io::{DeviceOp, IoRequest};
use crate::isa::{self, abi, Mnemonic, END_SENTINEL};
use crate::mem::MemoryManager;
use crate::process::{Pcb, ProcessState};

/// PC threshold beyond which a fetched zero word is treated as a runaway.
const RUNAWAY_PC: u32 = 10_000;

/// Stage count; also the initial value of the drain counter.
const PIPELINE_DEPTH: u32 = 5;

/// Runs `pcb` for up to one quantum of pipeline cycles.
///
/// Console print requests raised during the run are appended to `requests`;
/// with `print_lock` set, a print also blocks the process and ends the
/// quantum. On return the PCB state is `Finished` when the end sentinel was
/// reached, `Blocked` after a locked print, and unchanged otherwise.
pub fn run_quantum(
    pcb: &Arc<Pcb>,
    mmu: &Mutex<MemoryManager>,
    requests: &mut Vec<IoRequest>,
    print_lock: bool,
) {
    let regs = pcb.registers.lock().unwrap();
    let mut run = QuantumRun {
        pcb,
        mmu,
        requests,
        print_lock,
        regs,
        slots: Vec::new(),
        counter: 0,
        drain: PIPELINE_DEPTH,
        end_program: false,
        end_execution: false,
    };
    run.execute_loop();

    if run.end_program {
        pcb.set_state(ProcessState::Finished);
    }
}

/// State of one quantum invocation.
struct QuantumRun<'a> {
    pcb: &'a Arc<Pcb>,
    mmu: &'a Mutex<MemoryManager>,
    requests: &'a mut Vec<IoRequest>,
    print_lock: bool,
    regs: MutexGuard<'a, RegisterBank>,
    /// Latch history; grows by one per fetch tick.
    slots: Vec<Latch>,
    counter: usize,
    drain: u32,
    end_program: bool,
    end_execution: bool,
}

impl QuantumRun<'_> {
    fn execute_loop(&mut self) {
        let quantum = self.pcb.quantum;
        let mut clock: u32 = 0;

        while self.drain > 0 {
            if self.counter >= 4 && self.drain >= 1 {
                self.write_back(self.counter - 4);
            }
            if self.counter >= 3 && self.drain >= 2 {
                self.memory_access(self.counter - 3);
            }
            if self.counter >= 2 && self.drain >= 3 {
                self.execute(self.counter - 2);
            }
            if self.counter >= 1 && self.drain >= 4 {
                self.decode(self.counter - 1);
            }
            if self.drain == PIPELINE_DEPTH {
                self.slots.push(Latch::default());
                self.fetch();
            }

            self.counter += 1;
            clock += 1;
            self.pcb.pipeline_cycles.fetch_add(1, Relaxed);

            if clock >= quantum || self.end_program {
                self.end_execution = true;
            }
            if self.end_execution {
                self.drain -= 1;
            }
        }
    }

    fn stage_tick(&self) {
        self.pcb.stage_invocations.fetch_add(1, Relaxed);
    }

    fn fetch(&mut self) {
        self.stage_tick();
        self.regs.mar = self.regs.pc;
        let word = self.mmu.lock().unwrap().read(self.regs.mar, self.pcb);
        self.regs.ir = word;

        if word == 0 && self.regs.pc > RUNAWAY_PC {
            error!(
                "pid {}: pc drifted into empty memory at {:#x}, forcing termination",
                self.pcb.pid, self.regs.pc
            );
            self.end_program = true;
            return;
        }
        if word == END_SENTINEL {
            self.end_program = true;
            return;
        }
        self.regs.pc = self.regs.pc.wrapping_add(4);
    }

    fn decode(&mut self, idx: usize) {
        self.stage_tick();
        let d = isa::decode(self.regs.ir);
        trace!(
            "pid {} decode raw={:#010x} op={:?}",
            self.pcb.pid,
            d.raw,
            d.op
        );
        self.slots[idx] = Latch {
            d,
            link: self.regs.pc,
        };
        if d.op.is_inert() {
            return;
        }

        if hazards::raw_conflict(&self.slots, idx) {
            self.slots[idx].poison();
            self.regs.pc = self.regs.pc.wrapping_sub(4);
        }
    }

    fn execute(&mut self, idx: usize) {
        self.stage_tick();
        let latch = self.slots[idx];
        match latch.d.op {
            Mnemonic::Addi
            | Mnemonic::Addiu
            | Mnemonic::Andi
            | Mnemonic::Slti
            | Mnemonic::Lui
            | Mnemonic::Li => self.exec_immediate(latch),
            Mnemonic::Add | Mnemonic::Sub | Mnemonic::Mult | Mnemonic::Div => {
                self.exec_arith(latch)
            }
            Mnemonic::Beq
            | Mnemonic::Bne
            | Mnemonic::Bgt
            | Mnemonic::Blt
            | Mnemonic::J
            | Mnemonic::Jal => self.exec_branch(latch),
            Mnemonic::Print => self.exec_print(latch),
            _ => {}
        }
    }

    fn exec_immediate(&mut self, latch: Latch) {
        let d = latch.d;
        let a = self.regs.read(d.rs) as i32;
        let (value, line) = match d.op {
            Mnemonic::Addi | Mnemonic::Addiu => {
                let out = Alu::execute(AluOp::Add, a, d.imm);
                (
                    out.value,
                    format!(
                        "[IMM] {} {} = {}({}) + {} -> {}",
                        d.op.name(),
                        abi::name(d.rt),
                        abi::name(d.rs),
                        a,
                        d.imm,
                        out.value
                    ),
                )
            }
            Mnemonic::Andi => {
                let out = Alu::execute(AluOp::And, a, d.uimm() as i32);
                (
                    out.value,
                    format!(
                        "[IMM] andi {} = {}({:#x}) & {:#x} -> {:#x}",
                        abi::name(d.rt),
                        abi::name(d.rs),
                        a,
                        d.uimm(),
                        out.value
                    ),
                )
            }
            Mnemonic::Slti => {
                let value = (a < d.imm) as i32;
                (
                    value,
                    format!(
                        "[IMM] slti {} = ({}({}) < {}) -> {}",
                        abi::name(d.rt),
                        abi::name(d.rs),
                        a,
                        d.imm,
                        value
                    ),
                )
            }
            Mnemonic::Lui => {
                let value = (d.uimm() << 16) as i32;
                (
                    value,
                    format!(
                        "[IMM] lui {} = ({:#x} << 16) -> {:#x}",
                        abi::name(d.rt),
                        d.uimm(),
                        value
                    ),
                )
            }
            Mnemonic::Li => (
                d.imm,
                format!("[IMM] li {} = {}", abi::name(d.rt), d.imm),
            ),
            _ => return,
        };
        self.regs.write(d.rt, value as u32);
        self.pcb.push_trace(line);
    }

    fn exec_arith(&mut self, latch: Latch) {
        let d = latch.d;
        let a = self.regs.read(d.rs) as i32;
        let b = self.regs.read(d.rt) as i32;
        let (op, sym) = match d.op {
            Mnemonic::Add => (AluOp::Add, '+'),
            Mnemonic::Sub => (AluOp::Sub, '-'),
            Mnemonic::Mult => (AluOp::Mul, '*'),
            Mnemonic::Div => (AluOp::Div, '/'),
            _ => return,
        };
        let out = Alu::execute(op, a, b);
        self.regs.write(d.rd, out.value as u32);
        self.pcb.push_trace(format!(
            "[ARITH] {} {} = {}({}) {} {}({}) -> {}",
            d.op.name(),
            abi::name(d.rd),
            abi::name(d.rs),
            a,
            sym,
            abi::name(d.rt),
            b,
            out.value
        ));
    }

    fn exec_branch(&mut self, latch: Latch) {
        let d = latch.d;
        let a = self.regs.read(d.rs) as i32;
        let b = self.regs.read(d.rt) as i32;
        let taken = match d.op {
            Mnemonic::Beq => Alu::execute(AluOp::Beq, a, b).taken,
            Mnemonic::Bne => Alu::execute(AluOp::Bne, a, b).taken,
            Mnemonic::Blt => Alu::execute(AluOp::Blt, a, b).taken,
            Mnemonic::Bgt => Alu::execute(AluOp::Bgt, a, b).taken,
            Mnemonic::J | Mnemonic::Jal => true,
            _ => false,
        };
        if !taken {
            return;
        }

        if d.op == Mnemonic::Jal {
            self.regs.write(abi::REG_RA, latch.link);
        }

        let target = match d.op {
            Mnemonic::J | Mnemonic::Jal => d.target,
            _ => d.uimm(),
        };
        self.pcb.push_trace(format!(
            "[BRANCH] {} taken, pc {:#x} -> {:#x}",
            d.op.name(),
            self.regs.pc,
            target
        ));
        self.regs.pc = target;

        // Flush the instruction fetched down the fall-through path.
        if self.counter >= 1 && self.counter - 1 < self.slots.len() {
            self.slots[self.counter - 1].poison();
        }
        self.regs.ir = 0;
    }

    fn exec_print(&mut self, latch: Latch) {
        let d = latch.d;
        // The memory-addressed variant runs in the memory stage instead.
        if d.rt == 0 && d.uimm() != 0 {
            return;
        }
        let value = self.regs.read(d.rt) as i32;
        self.pcb.push_trace(format!(
            "[PRINT] {} value={}",
            abi::name(d.rt),
            value
        ));
        self.requests.push(IoRequest {
            process: Arc::clone(self.pcb),
            op: DeviceOp::PrintValue,
            message: value.to_string(),
            cost_ms: 0,
        });
        if self.print_lock {
            self.pcb.set_state(ProcessState::Blocked);
            self.end_execution = true;
        }
    }

    fn memory_access(&mut self, idx: usize) {
        self.stage_tick();
        let d = self.slots[idx].d;
        match d.op {
            Mnemonic::Lw => {
                let addr = d.uimm();
                let value = self.mmu.lock().unwrap().read(addr, self.pcb);
                self.regs.write(d.rt, value);
                self.pcb.push_trace(format!(
                    "[MEM] lw addr={} value={} -> {}",
                    addr,
                    value as i32,
                    abi::name(d.rt)
                ));
            }
            Mnemonic::Li => {
                self.regs.write(d.rt, d.imm as u32);
            }
            Mnemonic::Print if d.rt == 0 && d.uimm() != 0 => {
                let addr = d.uimm();
                let value = self.mmu.lock().unwrap().read(addr, self.pcb);
                self.pcb.push_trace(format!(
                    "[PRINT] mem addr={} value={}",
                    addr, value as i32
                ));
                self.requests.push(IoRequest {
                    process: Arc::clone(self.pcb),
                    op: DeviceOp::PrintValue,
                    message: (value as i32).to_string(),
                    cost_ms: 0,
                });
                if self.print_lock {
                    self.pcb.set_state(ProcessState::Blocked);
                    self.end_execution = true;
                }
            }
            _ => {}
        }
    }

    fn write_back(&mut self, idx: usize) {
        self.stage_tick();
        let d = self.slots[idx].d;
        if d.op == Mnemonic::Sw {
            let addr = d.uimm();
            let value = self.regs.read(d.rt);
            self.mmu.lock().unwrap().write(addr, value, self.pcb);
            self.pcb.push_trace(format!(
                "[WB] sw addr={} value={} from {}",
                addr,
                value as i32,
                abi::name(d.rt)
            ));
        }
    }
}
