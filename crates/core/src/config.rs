//! Configuration system for the simulator.
//!
//! This module defines all configuration structures used to parameterize a
//! simulation run. It provides:
//! 1. **Defaults:** Baseline constants (memory sizes, core count, quantum, I/O model).
//! 2. **Structures:** Hierarchical config for system, memory, and I/O settings.
//!
//! Configuration is supplied as JSON (`Config` implements `Deserialize`) or built
//! with `Config::default()` for the CLI.

use serde::Deserialize;

/// Default configuration constants for the simulator.
///
/// These values define the baseline machine when not explicitly overridden
/// in a JSON configuration file.
mod defaults {
    /// Number of simulated CPU cores (worker threads).
    pub const NUM_CORES: usize = 4;

    /// Quantum assigned to every process, in pipeline cycles.
    pub const QUANTUM: u32 = 20;

    /// Main memory size in bytes.
    ///
    /// Must be a multiple of the page size; `num_frames = MAIN_BYTES / 32`.
    pub const MAIN_BYTES: u32 = 4096;

    /// Secondary memory size in bytes.
    ///
    /// The secondary store doubles as the swap area, so it must be large
    /// enough to absorb every page the main memory cannot hold.
    pub const SECONDARY_BYTES: u32 = 16384;

    /// L1 cache capacity in entries (one 32-bit word each).
    pub const CACHE_CAPACITY: usize = 16;

    /// Memory cycles charged per cache access.
    pub const WEIGHT_CACHE: u64 = 1;

    /// Memory cycles charged per main-memory access.
    pub const WEIGHT_PRIMARY: u64 = 5;

    /// Memory cycles charged per secondary-memory access.
    pub const WEIGHT_SECONDARY: u64 = 10;

    /// Probability (percent per manager tick) that the printer raises a request.
    pub const PRINTER_PERCENT: u32 = 1;

    /// Probability (percent per manager tick) that the disk raises a request.
    pub const DISK_PERCENT: u32 = 2;

    /// Idle sleep of the device manager thread, in milliseconds.
    pub const IO_POLL_IDLE_MS: u64 = 20;

    /// Directory all report files are written under.
    pub const OUTPUT_DIR: &str = "output";
}

/// Root configuration structure containing all simulator settings.
///
/// # Examples
///
/// Creating a default configuration:
///
/// ```
/// use moss_core::config::Config;
///
/// let config = Config::default();
/// assert_eq!(config.system.num_cores, 4);
/// assert_eq!(config.memory.main_bytes, 4096);
/// ```
///
/// Deserializing from JSON:
///
/// ```
/// use moss_core::config::Config;
///
/// let json = r#"{
///     "system": { "num_cores": 1, "quantum": 50 },
///     "memory": { "main_bytes": 192, "secondary_bytes": 8192 },
///     "io": { "printer_percent": 5 }
/// }"#;
///
/// let config: Config = serde_json::from_str(json).unwrap();
/// assert_eq!(config.system.num_cores, 1);
/// assert_eq!(config.memory.main_bytes, 192);
/// assert_eq!(config.io.printer_percent, 5);
/// ```
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Core count, quantum, and output location.
    pub system: SystemConfig,
    /// Memory hierarchy sizes and access weights.
    pub memory: MemoryConfig,
    /// Device manager model.
    pub io: IoConfig,
}

/// Core count, quantum, and output settings.
#[derive(Debug, Clone, Deserialize)]
pub struct SystemConfig {
    /// Number of core worker threads.
    #[serde(default = "SystemConfig::default_num_cores")]
    pub num_cores: usize,

    /// Quantum in pipeline cycles, assigned by the OS to every process.
    #[serde(default = "SystemConfig::default_quantum")]
    pub quantum: u32,

    /// Directory report files are written under.
    #[serde(default = "SystemConfig::default_output_dir")]
    pub output_dir: String,
}

impl SystemConfig {
    /// Returns the default core count.
    fn default_num_cores() -> usize {
        defaults::NUM_CORES
    }

    /// Returns the default quantum in cycles.
    fn default_quantum() -> u32 {
        defaults::QUANTUM
    }

    /// Returns the default output directory.
    fn default_output_dir() -> String {
        defaults::OUTPUT_DIR.to_string()
    }
}

impl Default for SystemConfig {
    fn default() -> Self {
        Self {
            num_cores: defaults::NUM_CORES,
            quantum: defaults::QUANTUM,
            output_dir: defaults::OUTPUT_DIR.to_string(),
        }
    }
}

/// Memory hierarchy configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct MemoryConfig {
    /// Main memory size in bytes (a multiple of the 32-byte page size).
    #[serde(default = "MemoryConfig::default_main_bytes")]
    pub main_bytes: u32,

    /// Secondary memory size in bytes.
    #[serde(default = "MemoryConfig::default_secondary_bytes")]
    pub secondary_bytes: u32,

    /// L1 cache capacity in entries.
    #[serde(default = "MemoryConfig::default_cache_capacity")]
    pub cache_capacity: usize,

    /// Per-process memory access weights.
    #[serde(default)]
    pub weights: MemWeightsConfig,
}

impl MemoryConfig {
    /// Returns the default main memory size in bytes.
    fn default_main_bytes() -> u32 {
        defaults::MAIN_BYTES
    }

    /// Returns the default secondary memory size in bytes.
    fn default_secondary_bytes() -> u32 {
        defaults::SECONDARY_BYTES
    }

    /// Returns the default cache capacity in entries.
    fn default_cache_capacity() -> usize {
        defaults::CACHE_CAPACITY
    }
}

impl Default for MemoryConfig {
    fn default() -> Self {
        Self {
            main_bytes: defaults::MAIN_BYTES,
            secondary_bytes: defaults::SECONDARY_BYTES,
            cache_capacity: defaults::CACHE_CAPACITY,
            weights: MemWeightsConfig::default(),
        }
    }
}

/// Memory cycle weights charged per access tier.
///
/// Weights are copied into every loaded process, so differently
/// parameterized processes can model differing memory hardware.
#[derive(Debug, Clone, Copy, Deserialize)]
pub struct MemWeightsConfig {
    /// Cycles per cache access.
    #[serde(default = "MemWeightsConfig::default_cache")]
    pub cache: u64,

    /// Cycles per main-memory access.
    #[serde(default = "MemWeightsConfig::default_primary")]
    pub primary: u64,

    /// Cycles per secondary-memory access.
    #[serde(default = "MemWeightsConfig::default_secondary")]
    pub secondary: u64,
}

impl MemWeightsConfig {
    /// Returns the default cache access weight.
    fn default_cache() -> u64 {
        defaults::WEIGHT_CACHE
    }

    /// Returns the default main-memory access weight.
    fn default_primary() -> u64 {
        defaults::WEIGHT_PRIMARY
    }

    /// Returns the default secondary-memory access weight.
    fn default_secondary() -> u64 {
        defaults::WEIGHT_SECONDARY
    }
}

impl Default for MemWeightsConfig {
    fn default() -> Self {
        Self {
            cache: defaults::WEIGHT_CACHE,
            primary: defaults::WEIGHT_PRIMARY,
            secondary: defaults::WEIGHT_SECONDARY,
        }
    }
}

/// Device manager configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct IoConfig {
    /// Percent chance per manager tick that the printer raises a request.
    #[serde(default = "IoConfig::default_printer_percent")]
    pub printer_percent: u32,

    /// Percent chance per manager tick that the disk raises a request.
    #[serde(default = "IoConfig::default_disk_percent")]
    pub disk_percent: u32,

    /// Candidate simulated request costs in milliseconds, drawn uniformly.
    #[serde(default = "IoConfig::default_cost_steps")]
    pub cost_steps_ms: Vec<u64>,

    /// Manager thread idle sleep in milliseconds.
    #[serde(default = "IoConfig::default_poll_idle")]
    pub poll_idle_ms: u64,
}

impl IoConfig {
    /// Returns the default printer request probability in percent.
    fn default_printer_percent() -> u32 {
        defaults::PRINTER_PERCENT
    }

    /// Returns the default disk request probability in percent.
    fn default_disk_percent() -> u32 {
        defaults::DISK_PERCENT
    }

    /// Returns the default candidate request costs in milliseconds.
    fn default_cost_steps() -> Vec<u64> {
        vec![100, 200, 300]
    }

    /// Returns the default manager idle sleep in milliseconds.
    fn default_poll_idle() -> u64 {
        defaults::IO_POLL_IDLE_MS
    }
}

impl Default for IoConfig {
    fn default() -> Self {
        Self {
            printer_percent: defaults::PRINTER_PERCENT,
            disk_percent: defaults::DISK_PERCENT,
            cost_steps_ms: Self::default_cost_steps(),
            poll_idle_ms: defaults::IO_POLL_IDLE_MS,
        }
    }
}
