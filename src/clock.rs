//! High-resolution measurement backends.
//!
//! Provides:
//! - RDTSC-based cycle counting for x86_64
//! - A three-slot backend sampling cycles, wall time and thread cputime
//! - Wall-clock fallback for other platforms
//!
//! A backend is a [`Clock`]: `prepare()` once per measuring thread,
//! `sync()` immediately before and after the timed region, `sample()` at
//! the region boundaries. Readings are per-slot monotonic within one
//! thread's measurement window but not comparable across cores or
//! backends. The backend (and with it the slot count) is a build-time
//! choice via [`DefaultClock`], never a runtime decision.

/// Upper bound on counter slots across all backends.
pub const MAX_SLOTS: usize = 3;

/// One capture of the backend's counter tuple.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Reading {
    slots: [u64; MAX_SLOTS],
}

impl Reading {
    pub fn slot(&self, i: usize) -> u64 {
        self.slots[i]
    }
}

/// A counter backend with a fixed number of slots.
pub trait Clock: Default + Send + Sync + 'static {
    /// Number of counter slots this backend fills.
    const SLOTS: usize;

    /// Unit name reported for a slot (e.g. "cpu-cycles", "ns").
    fn unit(slot: usize) -> &'static str;

    /// One-time per-thread setup; call before the first [`sample`](Clock::sample).
    fn prepare(&self) {}

    /// Serialization point around a measurement boundary. No-op on
    /// backends whose reads are already ordered.
    fn sync(&self) {}

    /// Capture the current counter tuple.
    fn sample(&self) -> Reading;
}

/// Per-slot interval length. Wraps if `end` was sampled before `start`.
pub fn diff(start: Reading, end: Reading, slot: usize) -> u64 {
    end.slots[slot].wrapping_sub(start.slots[slot])
}

#[cfg(unix)]
fn clock_ns(id: libc::clockid_t) -> u64 {
    let mut ts = libc::timespec {
        tv_sec: 0,
        tv_nsec: 0,
    };
    let rc = unsafe { libc::clock_gettime(id, &mut ts) };
    if rc != 0 {
        return 0;
    }
    ts.tv_sec as u64 * 1_000_000_000 + ts.tv_nsec as u64
}

/// Cycle counter via RDTSC. On modern CPUs with constant_tsc this is
/// monotonic for the lifetime of a pinned thread.
#[cfg(target_arch = "x86_64")]
#[derive(Debug, Default, Clone, Copy)]
pub struct TscClock;

#[cfg(target_arch = "x86_64")]
impl Clock for TscClock {
    const SLOTS: usize = 1;

    fn unit(_slot: usize) -> &'static str {
        "cpu-cycles"
    }

    fn sync(&self) {
        unsafe {
            core::arch::x86_64::_mm_mfence();
            core::arch::x86_64::_mm_lfence();
        }
    }

    fn sample(&self) -> Reading {
        let mut r = Reading::default();
        r.slots[0] = unsafe { core::arch::x86_64::_rdtsc() };
        r
    }
}

/// Monotonic wall-clock nanoseconds. The portable fallback backend.
#[derive(Debug, Default, Clone, Copy)]
pub struct WallClock;

impl Clock for WallClock {
    const SLOTS: usize = 1;

    fn unit(_slot: usize) -> &'static str {
        "ns"
    }

    fn sync(&self) {
        std::sync::atomic::fence(std::sync::atomic::Ordering::SeqCst);
    }

    #[cfg(unix)]
    fn sample(&self) -> Reading {
        let mut r = Reading::default();
        r.slots[0] = clock_ns(libc::CLOCK_MONOTONIC);
        r
    }

    #[cfg(not(unix))]
    fn sample(&self) -> Reading {
        let mut r = Reading::default();
        r.slots[0] = std::time::SystemTime::now()
            .duration_since(std::time::UNIX_EPOCH)
            .map(|d| d.as_nanos() as u64)
            .unwrap_or(0);
        r
    }
}

/// Three-slot backend: TSC cycles, monotonic wall ns, per-thread cputime
/// ns. All three are unprivileged and per-slot monotonic; cputime vs.
/// wall time makes involuntary preemption during the loop visible.
#[cfg(all(target_arch = "x86_64", target_os = "linux"))]
#[derive(Debug, Default, Clone, Copy)]
pub struct MultiClock;

#[cfg(all(target_arch = "x86_64", target_os = "linux"))]
impl Clock for MultiClock {
    const SLOTS: usize = 3;

    fn unit(slot: usize) -> &'static str {
        match slot {
            0 => "cpu-cycles",
            1 => "ns",
            _ => "cpu-ns",
        }
    }

    fn prepare(&self) {
        // Fault in the vDSO paths so the first timed sample pays no
        // one-time cost.
        let _ = self.sample();
    }

    fn sync(&self) {
        unsafe {
            core::arch::x86_64::_mm_mfence();
            core::arch::x86_64::_mm_lfence();
        }
    }

    fn sample(&self) -> Reading {
        let mut r = Reading::default();
        r.slots[0] = unsafe { core::arch::x86_64::_rdtsc() };
        r.slots[1] = clock_ns(libc::CLOCK_MONOTONIC);
        r.slots[2] = clock_ns(libc::CLOCK_THREAD_CPUTIME_ID);
        r
    }
}

/// The backend this build measures with.
#[cfg(target_arch = "x86_64")]
pub type DefaultClock = TscClock;

#[cfg(not(target_arch = "x86_64"))]
pub type DefaultClock = WallClock;

#[cfg(test)]
mod tests {
    use super::*;

    fn ordered_samples<C: Clock>() -> (Reading, Reading) {
        let clock = C::default();
        clock.prepare();
        clock.sync();
        let start = clock.sample();
        // A little work between samples.
        let mut acc = 0u64;
        for i in 0..1000 {
            acc = acc.wrapping_add(std::hint::black_box(i));
        }
        std::hint::black_box(acc);
        let end = clock.sample();
        clock.sync();
        (start, end)
    }

    #[test]
    fn wall_clock_diff_ordered() {
        let (start, end) = ordered_samples::<WallClock>();
        assert!(end.slot(0) >= start.slot(0));
        // Bounded by resolution, never wrapping backwards.
        assert!(diff(start, end, 0) < 1_000_000_000);
    }

    #[test]
    fn wall_clock_double_sample_small() {
        let clock = WallClock;
        let a = clock.sample();
        let b = clock.sample();
        assert!(b.slot(0) >= a.slot(0));
        assert!(diff(a, b, 0) < 10_000_000);
    }

    #[test]
    fn default_clock_slots_named() {
        for slot in 0..DefaultClock::SLOTS {
            assert!(!DefaultClock::unit(slot).is_empty());
        }
        assert!(DefaultClock::SLOTS <= MAX_SLOTS);
    }

    #[cfg(target_arch = "x86_64")]
    #[test]
    fn tsc_monotonic_within_thread() {
        let (start, end) = ordered_samples::<TscClock>();
        assert!(end.slot(0) >= start.slot(0));
    }

    #[cfg(all(target_arch = "x86_64", target_os = "linux"))]
    #[test]
    fn multi_clock_all_slots_advance() {
        let clock = MultiClock;
        clock.prepare();
        let a = clock.sample();
        let mut acc = 0u64;
        for i in 0..100_000u64 {
            acc = acc.wrapping_add(std::hint::black_box(i));
        }
        std::hint::black_box(acc);
        let b = clock.sample();
        for slot in 0..MultiClock::SLOTS {
            assert!(b.slot(slot) >= a.slot(slot), "slot {slot} went backwards");
        }
    }
}
