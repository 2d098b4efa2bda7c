//! Caller and responder halves of a measurement pair.
//!
//! The responder answers one readiness handshake and then serves replies
//! forever; it never terminates itself and is torn down from outside via
//! endpoint disconnect once its caller has finished. The caller waits on
//! the start gate, runs the fixed round budget back-to-back, and signals
//! the completion gate. In-loop errors are logged and the round still
//! counts; this is a latency benchmark, not a correctness test.

use log::warn;
use serde::Serialize;

use crate::clock::{diff, Clock};
use crate::gate::{CompletionGate, StartGate};
use crate::platform;
use crate::rendezvous::{CallError, CallerHandle, ResponderHandle};
use crate::topology::CoreId;

/// What a caller hammers during its timed loop.
pub enum CallTarget {
    /// Full call+reply exchange with a core-local responder. One round
    /// counts as two operations.
    Rendezvous(CallerHandle),
    /// Direct kernel call. One round is one operation.
    Kernel,
}

impl CallTarget {
    pub fn call(&self) -> Result<(), CallError> {
        match self {
            CallTarget::Rendezvous(handle) => handle.call(),
            CallTarget::Kernel => platform::direct_call(),
        }
    }

    /// Operations per round.
    pub fn factor(&self) -> u64 {
        match self {
            CallTarget::Rendezvous(_) => 2,
            CallTarget::Kernel => 1,
        }
    }

    pub fn op_name(&self) -> &'static str {
        match self {
            CallTarget::Rendezvous(_) => "IPC",
            CallTarget::Kernel => "syscall",
        }
    }
}

/// One counter slot's interval length over the timed loop.
#[derive(Debug, Clone, Serialize)]
pub struct SlotDelta {
    pub unit: &'static str,
    pub value: u64,
}

/// Per-core measurement summary handed to the reporter.
#[derive(Debug, Clone, Serialize)]
pub struct CoreReport {
    pub core: CoreId,
    pub rounds: u64,
    pub factor: u64,
    pub op: &'static str,
    pub deltas: Vec<SlotDelta>,
}

impl CoreReport {
    /// Total operations measured (`rounds * factor`).
    pub fn ops(&self) -> u64 {
        self.rounds * self.factor
    }
}

/// Caller body: gate in, measure `rounds` back-to-back calls, gate out.
pub fn run_caller<C: Clock>(
    target: CallTarget,
    core: CoreId,
    rounds: u64,
    start: &StartGate,
    completion: &CompletionGate,
) -> CoreReport {
    start.wait();

    let clock = C::default();
    clock.prepare();

    let t_start = clock.sample();
    clock.sync();
    for _ in 0..rounds {
        if let Err(e) = target.call() {
            warn!("CPU {core}: call error in timed loop: {e}");
        }
    }
    clock.sync();
    let t_end = clock.sample();

    let deltas = (0..C::SLOTS)
        .map(|slot| SlotDelta {
            unit: C::unit(slot),
            value: diff(t_start, t_end, slot),
        })
        .collect();

    completion.arrive();

    CoreReport {
        core,
        rounds,
        factor: target.factor(),
        op: target.op_name(),
        deltas,
    }
}

/// Responder body: one blocking wait completes the readiness handshake
/// with the spawner, then reply-and-wait forever. Transient errors are
/// logged and the loop continues; a disconnect ends it.
pub fn run_responder(handle: ResponderHandle) {
    match handle.wait() {
        Ok(_label) => {}
        Err(CallError::Disconnected) => return,
        Err(e) => warn!("responder: error on first wait: {e}"),
    }

    loop {
        match handle.reply_and_wait() {
            Ok(_label) => {}
            Err(CallError::Disconnected) => return,
            Err(e) => warn!("responder: error in reply+wait: {e}"),
        }
    }
}
