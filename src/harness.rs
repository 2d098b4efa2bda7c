//! Pair spawning and run orchestration.
//!
//! Per core the spawner creates a pinned responder, confirms it reached
//! its receive loop with one blocking handshake call, then creates the
//! pinned caller holding the responder's endpoint handle. The
//! responder-then-caller order is strict within a pair; pairs themselves
//! run concurrently once created. After every pair exists the start gate
//! is released exactly once, and teardown joins each caller before its
//! responder is disconnected.

use std::process;
use std::sync::Arc;
use std::thread::{self, JoinHandle};

use log::{error, info, warn};

use crate::clock::Clock;
use crate::error::Error;
use crate::gate::{CompletionGate, StartGate};
use crate::rendezvous::endpoint;
use crate::topology::{self, CoreId, OsSched};
use crate::worker::{run_caller, run_responder, CallTarget, CoreReport};
use crate::NUM_ROUNDS;

/// Which workload the callers run.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Workload {
    /// Rendezvous ping-pong against a core-local responder.
    Ipc,
    /// Direct kernel call, no responder.
    Syscall,
}

/// Harness configuration. The clock backend is not here on purpose; it
/// is a build-time choice (see [`crate::clock::DefaultClock`]).
#[derive(Debug, Clone)]
pub struct HarnessConfig {
    pub workload: Workload,
    /// Calls each caller issues back-to-back in its timed loop.
    pub rounds: u64,
    /// Pin workers to their cores. Disable only where affinity is
    /// unavailable; un-pinned pairs lose core-local semantics.
    pub pin: bool,
}

impl Default for HarnessConfig {
    fn default() -> Self {
        Self {
            workload: Workload::Ipc,
            rounds: NUM_ROUNDS,
            pin: true,
        }
    }
}

/// One spawned measurement unit: a caller and, for the IPC workload, its
/// paired responder on the same core.
struct Pair {
    core: CoreId,
    caller: JoinHandle<CoreReport>,
    responder: Option<JoinHandle<()>>,
}

fn place_or_die(core: CoreId) {
    if let Err(e) = crate::platform::pin_current_thread(core) {
        // An un-pinned pair invalidates core-local latency semantics;
        // treat this as an unrecoverable environment problem.
        error!("failed to place worker on CPU {core}: {e}");
        process::exit(1);
    }
}

fn spawn_pair<C: Clock>(
    cfg: &HarnessConfig,
    core: CoreId,
    start: &Arc<StartGate>,
    completion: &Arc<CompletionGate>,
) -> Result<Pair, Error> {
    let pin = cfg.pin;

    // Responder first, so the caller's endpoint is live before it runs.
    let (target, responder) = match cfg.workload {
        Workload::Ipc => {
            let (caller_h, responder_h) = endpoint(core as u64);
            let handle = thread::Builder::new()
                .name(format!("responder-{core}"))
                .spawn(move || {
                    if pin {
                        place_or_die(core);
                    }
                    run_responder(responder_h);
                })
                .map_err(|e| Error::Spawn {
                    role: "responder",
                    cpu: core,
                    source: e,
                })?;

            // Readiness handshake: returns once the responder is parked
            // in its receive loop.
            if let Err(e) = caller_h.call() {
                warn!("error syncing with responder on CPU {core}: {e}");
            }

            (CallTarget::Rendezvous(caller_h), Some(handle))
        }
        Workload::Syscall => (CallTarget::Kernel, None),
    };

    let rounds = cfg.rounds;
    let start = Arc::clone(start);
    let completion = Arc::clone(completion);
    let caller = thread::Builder::new()
        .name(format!("caller-{core}"))
        .spawn(move || {
            if pin {
                place_or_die(core);
            }
            run_caller::<C>(target, core, rounds, &start, &completion)
        })
        .map_err(|e| Error::Spawn {
            role: "caller",
            cpu: core,
            source: e,
        })?;

    Ok(Pair {
        core,
        caller,
        responder,
    })
}

/// Run the benchmark on an explicit core set. Produces one report per
/// core, in core order. An empty set completes immediately.
pub fn run_on<C: Clock>(cfg: &HarnessConfig, cores: &[CoreId]) -> Result<Vec<CoreReport>, Error> {
    let start = Arc::new(StartGate::new());
    let completion = Arc::new(CompletionGate::new(cores.len()));

    let mut pairs = Vec::with_capacity(cores.len());
    for &core in cores {
        pairs.push(spawn_pair::<C>(cfg, core, &start, &completion)?);
    }

    start.release();

    let mut reports = Vec::with_capacity(pairs.len());
    for pair in pairs {
        let report = pair
            .caller
            .join()
            .map_err(|_| Error::Join(format!("caller-{}", pair.core)))?;

        // The caller thread dropped its endpoint handle on return, which
        // disconnects the responder out of its blocking wait.
        if let Some(responder) = pair.responder {
            responder
                .join()
                .map_err(|_| Error::Join(format!("responder-{}", pair.core)))?;
        }

        reports.push(report);
    }

    Ok(reports)
}

/// Enumerate the host's cores and run the benchmark on all of them.
pub fn run<C: Clock>(cfg: &HarnessConfig) -> Result<Vec<CoreReport>, Error> {
    let sched = OsSched;
    let budget = topology::count(&sched) as usize;

    let mut cores = Vec::with_capacity(budget);
    topology::enumerate(&sched, |core| {
        if cores.len() >= budget {
            warn!("CPU {core} showed up late! Ignoring...");
        } else {
            cores.push(core);
        }
    });

    info!(
        "Found {} CPUs. Measuring core-local {} latency on all of them.",
        cores.len(),
        match cfg.workload {
            Workload::Ipc => "IPC",
            Workload::Syscall => "syscall",
        }
    );

    run_on::<C>(cfg, &cores)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clock::WallClock;

    fn quick_cfg(workload: Workload) -> HarnessConfig {
        HarnessConfig {
            workload,
            rounds: 100,
            pin: false,
        }
    }

    #[test]
    fn syscall_workload_spawns_callers_only() {
        let reports = run_on::<WallClock>(&quick_cfg(Workload::Syscall), &[0, 1]).unwrap();
        assert_eq!(reports.len(), 2);
        for r in &reports {
            assert_eq!(r.factor, 1);
            assert_eq!(r.ops(), 100);
        }
    }

    #[test]
    fn reports_preserve_core_order() {
        let cores = [5, 2, 9];
        let reports = run_on::<WallClock>(&quick_cfg(Workload::Ipc), &cores).unwrap();
        let reported: Vec<_> = reports.iter().map(|r| r.core).collect();
        assert_eq!(reported, cores);
    }
}
