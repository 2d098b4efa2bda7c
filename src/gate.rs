//! Spin-wait start and completion gates.
//!
//! Both gates busy-poll on purpose: a futex or condvar wake-up would put
//! scheduler latency inside the first measured round. The original
//! protocol multiplexed one flag as start gate and completion gate; here
//! the two phases are separate, explicitly typed state machines so the
//! temporal disjointness is no longer an implicit invariant.
//!
//! Hot path rules: atomics only, no locks, no allocation.

use std::hint;
use std::sync::atomic::{AtomicU32, AtomicUsize, Ordering};

const WAITING: u32 = 0;
const RELEASED: u32 = 1;

/// Gate every caller spins on before its timed loop.
#[derive(Debug)]
pub struct StartGate {
    state: AtomicU32,
}

impl StartGate {
    pub fn new() -> Self {
        Self {
            state: AtomicU32::new(WAITING),
        }
    }

    /// Busy-poll until the orchestrator releases the gate.
    pub fn wait(&self) {
        while self.state.load(Ordering::Acquire) == WAITING {
            hint::spin_loop();
        }
    }

    /// Single-writer transition. Call once, after every pair is
    /// constructed and placed; responder readiness is guaranteed by the
    /// spawn handshake, not by this gate.
    pub fn release(&self) {
        self.state.store(RELEASED, Ordering::Release);
    }

    pub fn is_released(&self) -> bool {
        self.state.load(Ordering::Acquire) == RELEASED
    }
}

impl Default for StartGate {
    fn default() -> Self {
        Self::new()
    }
}

const PENDING: u32 = 0;
const DONE: u32 = 1;

/// Gate that flips once the last worker has finished.
#[derive(Debug)]
pub struct CompletionGate {
    remaining: AtomicUsize,
    state: AtomicU32,
}

impl CompletionGate {
    /// `n` is the number of workers that will call [`arrive`](Self::arrive).
    /// Zero workers constructs the gate already done, so an empty run
    /// completes instead of waiting forever.
    pub fn new(n: usize) -> Self {
        Self {
            remaining: AtomicUsize::new(n),
            state: AtomicU32::new(if n == 0 { DONE } else { PENDING }),
        }
    }

    /// Mark the calling worker finished. The worker that takes the count
    /// to zero performs the sole `Pending -> Done` transition; every
    /// other worker spins until it observes it. Returns whether this
    /// caller was the one that flipped the gate.
    pub fn arrive(&self) -> bool {
        let prev = self.remaining.fetch_sub(1, Ordering::AcqRel);
        debug_assert!(prev > 0, "arrive() called more often than new(n) allows");
        if prev == 1 {
            self.state.store(DONE, Ordering::Release);
            true
        } else {
            self.wait_done();
            false
        }
    }

    /// Busy-poll until every worker has arrived.
    pub fn wait_done(&self) {
        while self.state.load(Ordering::Acquire) == PENDING {
            hint::spin_loop();
        }
    }

    pub fn is_done(&self) -> bool {
        self.state.load(Ordering::Acquire) == DONE
    }
}
