//! Command-line front end for the corebench harness.

use std::io::{self, Write};
use std::path::PathBuf;
use std::process::ExitCode;

use clap::{Parser, ValueEnum};
use log::error;

use corebench::clock::DefaultClock;
use corebench::report::{print_report, write_json_report, JsonReport};
use corebench::{harness, HarnessConfig, Workload, NUM_ROUNDS};

#[derive(Debug, Clone, Copy, ValueEnum)]
enum WorkloadArg {
    /// Rendezvous ping-pong against a core-local responder (2 ops/round)
    Ipc,
    /// Direct kernel call (1 op/round)
    Syscall,
}

#[derive(Debug, Parser)]
#[command(
    name = "corebench",
    about = "Per-core synchronous call round-trip latency benchmark"
)]
struct Cli {
    /// Workload the callers run on every core
    #[arg(long, value_enum, default_value_t = WorkloadArg::Ipc)]
    workload: WorkloadArg,

    /// Calls per caller in the timed loop
    #[arg(long, default_value_t = NUM_ROUNDS)]
    rounds: u64,

    /// Skip thread placement (loses core-local measurement semantics)
    #[arg(long)]
    no_pin: bool,

    /// Also write a JSON report to this path
    #[arg(long)]
    json: Option<PathBuf>,
}

fn main() -> ExitCode {
    env_logger::init();
    let cli = Cli::parse();

    let cfg = HarnessConfig {
        workload: match cli.workload {
            WorkloadArg::Ipc => Workload::Ipc,
            WorkloadArg::Syscall => Workload::Syscall,
        },
        rounds: cli.rounds,
        pin: !cli.no_pin,
    };

    let reports = match harness::run::<DefaultClock>(&cfg) {
        Ok(reports) => reports,
        Err(e) => {
            error!("{e}");
            return ExitCode::FAILURE;
        }
    };

    let mut stdout = io::stdout().lock();
    for report in &reports {
        if print_report(&mut stdout, report).is_err() {
            return ExitCode::FAILURE;
        }
    }
    let _ = stdout.flush();

    if let Some(path) = cli.json {
        let workload = match cfg.workload {
            Workload::Ipc => "ipc",
            Workload::Syscall => "syscall",
        };
        let json = JsonReport::new(workload, cfg.rounds, &reports);
        if let Err(e) = write_json_report(&path, &json) {
            error!("{e}");
            return ExitCode::FAILURE;
        }
    }

    ExitCode::SUCCESS
}
