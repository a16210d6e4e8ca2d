//! Multi-core OS simulator CLI.
//!
//! This binary provides a single entry point for all simulation modes. It performs:
//! 1. **Direct run:** Execute a batch under one scheduling policy.
//! 2. **Menu:** The interactive policy menu, re-running the batch until exit.
//! 3. **Config:** Optional JSON config file; built-in defaults otherwise.

use clap::{Parser, Subcommand, ValueEnum};
use std::io::{self, BufRead, Write};
use std::path::{Path, PathBuf};
use std::{fs, process};

use moss_core::sched::Policy;
use moss_core::sim;
use moss_core::Config;

#[derive(Parser, Debug)]
#[command(
    name = "moss",
    author,
    version,
    about = "Multi-core OS simulator",
    long_about = "Run a batch of MIPS-like programs through the multi-core simulator.\n\nExamples:\n  moss run --batch batch.json --policy rr\n  moss menu --batch batch.json\n  moss batch.json"
)]
struct Cli {
    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Run the batch once under one scheduling policy.
    Run {
        /// Batch manifest listing the process files.
        #[arg(short, long)]
        batch: PathBuf,

        /// Scheduling policy.
        #[arg(short, long, value_enum, default_value = "rr")]
        policy: PolicyArg,

        /// JSON configuration file (defaults apply when omitted).
        #[arg(short, long)]
        config: Option<PathBuf>,
    },

    /// Interactive policy menu over one batch.
    Menu {
        /// Batch manifest listing the process files.
        #[arg(short, long)]
        batch: PathBuf,

        /// JSON configuration file (defaults apply when omitted).
        #[arg(short, long)]
        config: Option<PathBuf>,
    },
}

/// Policy selector for the command line.
#[derive(Clone, Copy, Debug, ValueEnum)]
enum PolicyArg {
    Fcfs,
    Sjn,
    Rr,
    Priority,
}

impl From<PolicyArg> for Policy {
    fn from(p: PolicyArg) -> Self {
        match p {
            PolicyArg::Fcfs => Policy::Fcfs,
            PolicyArg::Sjn => Policy::Sjn,
            PolicyArg::Rr => Policy::RoundRobin,
            PolicyArg::Priority => Policy::Priority,
        }
    }
}

fn main() {
    env_logger::init();
    let cli = Cli::parse();

    match cli.command {
        Some(Commands::Run {
            batch,
            policy,
            config,
        }) => {
            let config = load_config(config.as_deref());
            run_once(&config, policy.into(), &batch);
        }
        Some(Commands::Menu { batch, config }) => {
            let config = load_config(config.as_deref());
            run_menu(&config, &batch);
        }
        None => {
            let args: Vec<String> = std::env::args().skip(1).collect();
            if let Some(first) = args.first() {
                if first.ends_with(".json") {
                    let config = load_config(None);
                    run_menu(&config, Path::new(first));
                    return;
                }
            }
            eprintln!("moss — pass a subcommand or a batch file");
            eprintln!();
            eprintln!("  moss run -b <batch> -p <policy>   Single run");
            eprintln!("  moss menu -b <batch>              Interactive policy menu");
            eprintln!("  moss <batch.json>                 Same, shorthand");
            eprintln!();
            eprintln!("  moss --help  for full options");
            process::exit(1);
        }
    }
}

/// Loads the JSON config file, or the defaults when none is given.
fn load_config(path: Option<&Path>) -> Config {
    let Some(path) = path else {
        return Config::default();
    };
    let text = fs::read_to_string(path).unwrap_or_else(|e| {
        eprintln!("error: could not read config {}: {}", path.display(), e);
        process::exit(1);
    });
    serde_json::from_str(&text).unwrap_or_else(|e| {
        eprintln!("error: malformed config {}: {}", path.display(), e);
        process::exit(1);
    })
}

/// Runs the batch once and prints the system report.
fn run_once(config: &Config, policy: Policy, batch: &Path) {
    println!(
        "[*] policy {} | {} cores | quantum {}",
        policy.label(),
        config.system.num_cores,
        config.system.quantum
    );
    match sim::run_batch(config, policy, batch) {
        Ok(report) => report.print(),
        Err(e) => {
            eprintln!("error: {}", e);
            process::exit(1);
        }
    }
}

/// The interactive menu: pick a policy, run, repeat until exit.
fn run_menu(config: &Config, batch: &Path) {
    let stdin = io::stdin();
    loop {
        println!();
        println!("=== MULTI-CORE SCHEDULER MENU ===");
        println!("Choose a scheduling policy:");
        println!("0 - FCFS");
        println!("1 - SJN");
        println!("2 - Round Robin");
        println!("3 - Priority");
        println!("9 - Exit");
        print!("Option: ");
        let _ = io::stdout().flush();

        let choice = match read_number(&stdin) {
            Input::Eof => {
                println!("Leaving the simulator.");
                return;
            }
            Input::Invalid => {
                println!("Invalid option, try again.");
                continue;
            }
            Input::Number(n) => n,
        };

        let policy = match choice {
            0 => Policy::Fcfs,
            1 => Policy::Sjn,
            2 => Policy::RoundRobin,
            3 => Policy::Priority,
            9 => {
                println!("Leaving the simulator.");
                return;
            }
            _ => {
                println!("Invalid option, try again.");
                continue;
            }
        };

        run_once(config, policy, batch);

        print!("\nRun another policy? (1 = yes, 0 = exit): ");
        let _ = io::stdout().flush();
        if !matches!(read_number(&stdin), Input::Number(1)) {
            println!("Bye.");
            return;
        }
    }
}

/// One line of menu input.
enum Input {
    Eof,
    Invalid,
    Number(i64),
}

/// Reads one integer from a line of stdin.
fn read_number(stdin: &io::Stdin) -> Input {
    let mut line = String::new();
    match stdin.lock().read_line(&mut line) {
        Ok(0) | Err(_) => Input::Eof,
        Ok(_) => match line.trim().parse() {
            Ok(n) => Input::Number(n),
            Err(_) => Input::Invalid,
        },
    }
}
