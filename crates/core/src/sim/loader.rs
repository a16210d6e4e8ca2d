//! Batch, process, and program loaders.
//!
//! Three JSON layers feed a simulation:
//! 1. **Batch manifest:** `{ "processes": ["proc1.json", ...] }`; entries are
//!    resolved relative to the batch file. A malformed process entry is
//!    reported and skipped; a missing batch is fatal.
//! 2. **Process manifest:** `{ "pid", "name", "program_path", "priority" }`.
//!    The quantum is assigned by the OS, not the manifest.
//! 3. **Program file:** a `data` section (labelled words) and a `program`
//!    section (instruction records). Programs are assembled in two passes:
//!    labels first, then encoding, with data and instruction words written
//!    through the memory manager at increasing byte addresses.
//!
//! A `label` on an instruction defines a symbol at that instruction's byte
//! address, except on a branch without `label1`, where `label` names the
//! branch target instead.

use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::atomic::Ordering::Relaxed;
use std::sync::{Arc, Mutex};

use log::{error, info};
use serde::Deserialize;
use serde_json::Value;
use thiserror::Error;

use crate::config::Config;
use crate::isa::encode::{i_type, j_type, r_type, END_SENTINEL};
use crate::isa::opcodes::*;
use crate::isa::abi;
use crate::mem::MemoryManager;
use crate::process::Pcb;

/// Loader failures.
#[derive(Debug, Error)]
pub enum LoadError {
    #[error("could not open {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },
    #[error("malformed JSON in {path}: {source}")]
    Json {
        path: String,
        #[source]
        source: serde_json::Error,
    },
    #[error("{path}: {message}")]
    Shape { path: String, message: String },
    #[error("unknown instruction '{0}'")]
    UnknownInstruction(String),
    #[error("unknown register '{0}'")]
    UnknownRegister(String),
    #[error("unknown label '{0}'")]
    UnknownLabel(String),
    #[error("invalid immediate '{0}'")]
    BadImmediate(String),
    #[error("invalid address expression '{0}'")]
    BadAddress(String),
    #[error("no runnable processes in {0}")]
    EmptyBatch(String),
}

/// Batch manifest: the list of process manifest files.
#[derive(Debug, Deserialize)]
pub struct BatchManifest {
    pub processes: Vec<String>,
}

/// Per-process manifest.
#[derive(Debug, Deserialize)]
pub struct ProcessManifest {
    pub pid: u32,
    pub name: String,
    pub program_path: String,
    #[serde(default)]
    pub priority: i32,
}

/// Loads a batch: every runnable process, programs written into memory.
///
/// Processes that fail to load are reported and skipped. Returns an error
/// when the batch itself cannot be read or no process survives.
pub fn load_batch(
    batch_path: &Path,
    mmu: &Mutex<MemoryManager>,
    config: &Config,
) -> Result<Vec<Arc<Pcb>>, LoadError> {
    let manifest: BatchManifest = read_json_as(batch_path)?;
    let dir = batch_path.parent().unwrap_or_else(|| Path::new("."));

    let mut out = Vec::new();
    for entry in &manifest.processes {
        let path = resolve(dir, entry);
        match load_process(&path, mmu, config) {
            Ok(pcb) => {
                info!("loader: pid {} ({}) ready", pcb.pid, pcb.name);
                out.push(pcb);
            }
            Err(e) => error!("loader: skipping {}: {}", path.display(), e),
        }
    }

    if out.is_empty() {
        return Err(LoadError::EmptyBatch(batch_path.display().to_string()));
    }
    Ok(out)
}

/// Loads one process manifest and its program.
pub fn load_process(
    manifest_path: &Path,
    mmu: &Mutex<MemoryManager>,
    config: &Config,
) -> Result<Arc<Pcb>, LoadError> {
    let manifest: ProcessManifest = read_json_as(manifest_path)?;
    if manifest.program_path.is_empty() {
        return Err(LoadError::Shape {
            path: manifest_path.display().to_string(),
            message: "empty program_path".into(),
        });
    }

    let pcb = Arc::new(Pcb::new(
        manifest.pid,
        manifest.name,
        manifest.program_path.clone(),
        manifest.priority,
        config.system.quantum,
        config.memory.weights.into(),
    ));
    mmu.lock().unwrap().register_process(Arc::clone(&pcb));

    let dir = manifest_path.parent().unwrap_or_else(|| Path::new("."));
    let program = resolve(dir, &manifest.program_path);
    load_program(&program, mmu, &pcb, 0)?;
    Ok(pcb)
}

/// Loads a program file for `pcb`, starting at byte address `start_addr`.
///
/// Returns the first byte address past the loaded image.
pub fn load_program(
    path: &Path,
    mmu: &Mutex<MemoryManager>,
    pcb: &Arc<Pcb>,
    start_addr: u32,
) -> Result<u32, LoadError> {
    let json = read_json(path)?;
    let mut data_map = HashMap::new();

    let mut addr = start_addr;
    if let Some(data) = json.get("data") {
        addr = parse_data(data, mmu, pcb, addr, &mut data_map, path)?;
    }
    if let Some(program) = json.get("program") {
        addr = parse_program(program, mmu, pcb, addr, &data_map, path)?;
    }
    Ok(addr)
}

/// Places the data section and records its labels.
fn parse_data(
    value: &Value,
    mmu: &Mutex<MemoryManager>,
    pcb: &Arc<Pcb>,
    mut addr: u32,
    data_map: &mut HashMap<String, u32>,
    path: &Path,
) -> Result<u32, LoadError> {
    let mut place = |label: Option<&str>, val: &Value, addr: &mut u32| -> Result<(), LoadError> {
        if let Some(label) = label {
            data_map.insert(label.to_string(), *addr);
        }
        let words: Vec<u32> = match val {
            Value::Array(items) => items
                .iter()
                .map(parse_word)
                .collect::<Result<_, _>>()?,
            other => vec![parse_word(other)?],
        };
        for w in words {
            mmu.lock().unwrap().write(*addr, w, pcb);
            *addr += 4;
        }
        Ok(())
    };

    match value {
        Value::Object(map) => {
            for (key, val) in map {
                place(Some(key.as_str()), val, &mut addr)?;
            }
        }
        Value::Array(items) => {
            for item in items {
                let label = item.get("label").and_then(Value::as_str);
                let val = item.get("value").ok_or_else(|| LoadError::Shape {
                    path: path.display().to_string(),
                    message: "data record without 'value'".into(),
                })?;
                place(label, val, &mut addr)?;
            }
        }
        _ => {
            return Err(LoadError::Shape {
                path: path.display().to_string(),
                message: "'data' must be an object or an array".into(),
            })
        }
    }
    Ok(addr)
}

/// Assembles the program section in two passes.
fn parse_program(
    value: &Value,
    mmu: &Mutex<MemoryManager>,
    pcb: &Arc<Pcb>,
    start: u32,
    data_map: &HashMap<String, u32>,
    path: &Path,
) -> Result<u32, LoadError> {
    let Some(nodes) = value.as_array() else {
        return Ok(start);
    };

    // Pass 1: collect label definitions and size the program.
    let mut label_map: HashMap<String, u32> = HashMap::new();
    let mut addr = start;
    for node in nodes {
        let Some(mnem) = node.get("instruction").and_then(Value::as_str) else {
            continue;
        };
        let mnem = mnem.to_ascii_lowercase();
        let is_branch = matches!(mnem.as_str(), "j" | "jal" | "beq" | "bne" | "bgt" | "blt");
        if let Some(label) = node.get("label").and_then(Value::as_str) {
            let defines = !is_branch || node.get("label1").is_some();
            if defines {
                label_map.insert(label.to_string(), addr);
            }
        }
        addr += 4;
    }

    pcb.burst_time.store((addr - start) / 4, Relaxed);
    let pc = label_map.get("start").copied().unwrap_or(start);
    pcb.registers.lock().unwrap().pc = pc;
    info!(
        "loader: pid {}: {} instructions at {:#x}, pc={:#x}",
        pcb.pid,
        (addr - start) / 4,
        start,
        pc
    );

    // Pass 2: encode and place.
    let mut cur = start;
    for node in nodes {
        if node.get("instruction").is_none() {
            continue;
        }
        let word = encode_record(node, data_map, &label_map, path)?;
        mmu.lock().unwrap().write(cur, word, pcb);
        cur += 4;
    }
    Ok(cur)
}

/// Encodes one instruction record into a 32-bit word.
fn encode_record(
    node: &Value,
    data_map: &HashMap<String, u32>,
    label_map: &HashMap<String, u32>,
    path: &Path,
) -> Result<u32, LoadError> {
    let mnem = node
        .get("instruction")
        .and_then(Value::as_str)
        .unwrap_or("")
        .to_ascii_lowercase();

    match mnem.as_str() {
        "end" => Ok(END_SENTINEL),
        "print" => {
            // Bare print; the value variant carries `rt`.
            if node.get("rt").is_some() {
                Ok(i_type(OP_PRINT, 0, reg_field(node, "rt")?, 0))
            } else {
                Ok(i_type(OP_PRINT, 0, 0, 0))
            }
        }
        "add" | "sub" | "mult" | "div" => {
            let funct = match mnem.as_str() {
                "add" => FUNCT_ADD,
                "sub" => FUNCT_SUB,
                "mult" => FUNCT_MULT,
                _ => FUNCT_DIV,
            };
            Ok(r_type(
                reg_field(node, "rs")?,
                reg_field(node, "rt")?,
                reg_field(node, "rd")?,
                shamt_field(node)?,
                funct,
            ))
        }
        "li" => Ok(i_type(
            OP_LI,
            0,
            reg_field(node, "rt")?,
            imm_field(node, "immediate")? as u16,
        )),
        "lui" => Ok(i_type(
            OP_LUI,
            0,
            reg_field(node, "rt")?,
            imm_field(node, "immediate")? as u16,
        )),
        "addi" | "addiu" | "andi" | "slti" => {
            let op = match mnem.as_str() {
                "addi" => OP_ADDI,
                "addiu" => OP_ADDIU,
                "andi" => OP_ANDI,
                _ => OP_SLTI,
            };
            Ok(i_type(
                op,
                reg_field(node, "rs")?,
                reg_field(node, "rt")?,
                imm_field(node, "immediate")? as u16,
            ))
        }
        "lw" | "sw" => {
            let op = if mnem == "lw" { OP_LW } else { OP_SW };
            let rt = reg_field(node, "rt")?;
            let (rs, imm) = load_store_address(node, data_map)?;
            Ok(i_type(op, rs, rt, imm as u16))
        }
        "beq" | "bne" | "bgt" | "blt" => {
            let op = match mnem.as_str() {
                "beq" => OP_BEQ,
                "bne" => OP_BNE,
                "bgt" => OP_BGT,
                _ => OP_BLT,
            };
            let rs = reg_field(node, "rs")?;
            let rt = reg_field(node, "rt")?;
            let imm = branch_target(node, label_map)?;
            Ok(i_type(op, rs, rt, imm as u16))
        }
        "j" | "jal" => {
            let op = if mnem == "j" { OP_J } else { OP_JAL };
            Ok(j_type(op, jump_target(node, label_map)?))
        }
        "" => Err(LoadError::Shape {
            path: path.display().to_string(),
            message: "instruction record without 'instruction'".into(),
        }),
        other => Err(LoadError::UnknownInstruction(other.to_string())),
    }
}

/// `addr: "off(base)"`, `baseReg` + `offset`, or data-label `base` + `offset`.
fn load_store_address(
    node: &Value,
    data_map: &HashMap<String, u32>,
) -> Result<(u8, i32), LoadError> {
    if let Some(expr) = node.get("addr").and_then(Value::as_str) {
        return parse_offset_base(expr);
    }
    if let Some(base) = node.get("baseReg").and_then(Value::as_str) {
        let rs = reg_code(base)?;
        let imm = match node.get("offset") {
            Some(v) => parse_immediate(v)?,
            None => 0,
        };
        return Ok((rs, imm));
    }
    if let Some(label) = node.get("base").and_then(Value::as_str) {
        let base = *data_map
            .get(label)
            .ok_or_else(|| LoadError::UnknownLabel(label.to_string()))?;
        let offset = match node.get("offset") {
            Some(v) => parse_immediate(v)?,
            None => 0,
        };
        return Ok((0, (base as i32 + offset) & 0xffff));
    }
    Err(LoadError::BadAddress(
        "lw/sw needs 'addr', 'baseReg', or 'base'".into(),
    ))
}

/// Branch target: `label1` (preferred), `label`, or a literal `offset`.
fn branch_target(node: &Value, label_map: &HashMap<String, u32>) -> Result<i32, LoadError> {
    let target = node
        .get("label1")
        .or_else(|| node.get("label"))
        .and_then(Value::as_str);
    if let Some(name) = target {
        let addr = label_map
            .get(name)
            .ok_or_else(|| LoadError::UnknownLabel(name.to_string()))?;
        return Ok(*addr as i32);
    }
    if let Some(v) = node.get("offset") {
        return parse_immediate(v);
    }
    Err(LoadError::BadAddress(
        "branch needs a target 'label'/'label1' or 'offset'".into(),
    ))
}

/// Jump target: `label`, `label1`, or a literal `address` (int or `"0x.."`).
fn jump_target(node: &Value, label_map: &HashMap<String, u32>) -> Result<u32, LoadError> {
    let target = node
        .get("label1")
        .or_else(|| node.get("label"))
        .and_then(Value::as_str);
    if let Some(name) = target {
        let addr = label_map
            .get(name)
            .ok_or_else(|| LoadError::UnknownLabel(name.to_string()))?;
        return Ok(*addr & 0x03ff_ffff);
    }
    if let Some(v) = node.get("address") {
        return Ok(parse_word(v)? & 0x03ff_ffff);
    }
    Err(LoadError::BadAddress(
        "jump needs 'label', 'label1', or 'address'".into(),
    ))
}

fn reg_field(node: &Value, field: &str) -> Result<u8, LoadError> {
    let name = node
        .get(field)
        .and_then(Value::as_str)
        .ok_or_else(|| LoadError::UnknownRegister(format!("missing '{}'", field)))?;
    reg_code(name)
}

fn reg_code(name: &str) -> Result<u8, LoadError> {
    abi::index_of(name).ok_or_else(|| LoadError::UnknownRegister(name.to_string()))
}

fn shamt_field(node: &Value) -> Result<u8, LoadError> {
    match node.get("shamt") {
        Some(v) => Ok(parse_immediate(v)? as u8),
        None => Ok(0),
    }
}

fn imm_field(node: &Value, field: &str) -> Result<i32, LoadError> {
    let v = node
        .get(field)
        .ok_or_else(|| LoadError::BadImmediate(format!("missing '{}'", field)))?;
    parse_immediate(v)
}

/// Parses an immediate: an integer, or a decimal / `0x` string.
fn parse_immediate(v: &Value) -> Result<i32, LoadError> {
    match v {
        Value::Number(n) => n
            .as_i64()
            .map(|i| i as i32)
            .ok_or_else(|| LoadError::BadImmediate(n.to_string())),
        Value::String(s) => {
            let t = s.trim().to_ascii_lowercase();
            if let Some(hex) = t.strip_prefix("0x") {
                i64::from_str_radix(hex, 16)
                    .map(|i| i as i32)
                    .map_err(|_| LoadError::BadImmediate(s.clone()))
            } else {
                t.parse::<i64>()
                    .map(|i| i as i32)
                    .map_err(|_| LoadError::BadImmediate(s.clone()))
            }
        }
        other => Err(LoadError::BadImmediate(other.to_string())),
    }
}

/// Parses a 32-bit data word with the same literal forms as immediates.
fn parse_word(v: &Value) -> Result<u32, LoadError> {
    parse_immediate(v).map(|i| i as u32)
}

/// Parses the `"offset(base)"` address form.
fn parse_offset_base(expr: &str) -> Result<(u8, i32), LoadError> {
    let open = expr.find('(');
    let close = expr.rfind(')');
    let (Some(open), Some(close)) = (open, close) else {
        return Err(LoadError::BadAddress(expr.to_string()));
    };
    if close <= open + 1 {
        return Err(LoadError::BadAddress(expr.to_string()));
    }
    let offset = expr[..open]
        .trim()
        .parse::<i32>()
        .map_err(|_| LoadError::BadAddress(expr.to_string()))?;
    let base = reg_code(expr[open + 1..close].trim())?;
    Ok((base, offset))
}

fn resolve(dir: &Path, entry: &str) -> PathBuf {
    let p = Path::new(entry);
    if p.is_absolute() {
        p.to_path_buf()
    } else {
        dir.join(p)
    }
}

fn read_json(path: &Path) -> Result<Value, LoadError> {
    let text = fs::read_to_string(path).map_err(|source| LoadError::Io {
        path: path.display().to_string(),
        source,
    })?;
    serde_json::from_str(&text).map_err(|source| LoadError::Json {
        path: path.display().to_string(),
        source,
    })
}

fn read_json_as<T: serde::de::DeserializeOwned>(path: &Path) -> Result<T, LoadError> {
    let value = read_json(path)?;
    serde_json::from_value(value).map_err(|source| LoadError::Json {
        path: path.display().to_string(),
        source,
    })
}
