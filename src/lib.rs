//! # corebench
//!
//! Micro-benchmark harness measuring round-trip latency of a synchronous
//! rendezvous call ("call"/"reply") on one or many processor cores
//! simultaneously.
//!
//! ## Architecture
//!
//! - [`topology`]: bitmap-window core enumeration behind a scheduler trait
//! - [`clock`]: pluggable counter backends, selected per build
//! - [`gate`]: spin-wait start and completion gates
//! - [`rendezvous`]: the synchronous endpoint primitive
//! - [`worker`]: caller timed loop and responder reply loop
//! - [`harness`]: per-core pair spawning, release, join and teardown
//! - [`report`]: stdout metric lines and JSON output
//!
//! ## Methodology
//!
//! Every worker is an OS thread pinned 1:1 to its core; pinned threads
//! never migrate. All waiting on the hot path is either a blocking
//! rendezvous or a deliberate busy-spin, so scheduler wake-up latency
//! never sits inside a measured interval. No timeouts anywhere: a hung
//! partner hangs the run, which is acceptable in a controlled benchmark
//! environment.

pub mod clock;
pub mod error;
pub mod gate;
pub mod harness;
pub mod platform;
pub mod rendezvous;
pub mod report;
pub mod topology;
pub mod worker;

pub use clock::{diff, Clock, DefaultClock, Reading, WallClock};
pub use error::Error;
pub use gate::{CompletionGate, StartGate};
pub use harness::{run, run_on, HarnessConfig, Workload};
pub use topology::{core_set, count, enumerate, CoreId, CpuMap, OsSched};
pub use worker::{CoreReport, SlotDelta};

/// Rounds each caller issues back-to-back in its timed loop.
pub const NUM_ROUNDS: u64 = 300_000;
