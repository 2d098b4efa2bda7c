//! CPU topology enumeration.
//!
//! The scheduler is queried window by window: each [`SchedInfo`] covers
//! cores `[offset, offset + MAP_BITS)` as an affinity bitmap plus the
//! highest core index the scheduler knows about. Enumeration walks the
//! windows in ascending order, so callbacks fire exactly once per core,
//! ascending, with gaps allowed in the mask.

use log::warn;

use crate::error::Error;

/// Width of one affinity bitmap window.
pub const MAP_BITS: u32 = u64::BITS;

/// Identifier of one schedulable execution unit. Not assumed contiguous.
pub type CoreId = u32;

/// One window of the scheduler's core map.
#[derive(Debug, Clone, Copy)]
pub struct SchedInfo {
    /// Total number of cores known to the scheduler (walk bound).
    pub max_cpu: u32,
    /// Affinity bits for cores `offset .. offset + MAP_BITS`.
    pub map: u64,
}

/// Source of scheduler core maps.
pub trait CpuMap {
    fn info(&self, offset: u32) -> Result<SchedInfo, Error>;
}

/// Invoke `cb(core_id)` once for every core the scheduler reports, in
/// ascending order. A failed query logs and ends the walk early; the
/// cores seen so far are "some cores responded", not a topology
/// guarantee.
pub fn enumerate<M: CpuMap>(sched: &M, mut cb: impl FnMut(CoreId)) {
    let mut offset = 0;
    loop {
        let info = match sched.info(offset) {
            Ok(info) => info,
            Err(e) => {
                warn!("CPU enumeration aborted at offset {offset}: {e}");
                return;
            }
        };

        for bit in 0..MAP_BITS {
            if info.map & (1u64 << bit) != 0 {
                cb(offset + bit);
            }
        }

        offset += MAP_BITS;
        if offset >= info.max_cpu {
            break;
        }
    }
}

/// Number of cores [`enumerate`] would visit.
pub fn count<M: CpuMap>(sched: &M) -> u32 {
    let mut num = 0;
    enumerate(sched, |_| num += 1);
    num
}

/// Collect the enumerated cores into an owned set.
pub fn core_set<M: CpuMap>(sched: &M) -> Vec<CoreId> {
    let mut cores = Vec::new();
    enumerate(sched, |core| cores.push(core));
    cores
}

/// Scheduler backend of the host OS.
#[derive(Debug, Default, Clone, Copy)]
pub struct OsSched;

#[cfg(target_os = "linux")]
impl CpuMap for OsSched {
    fn info(&self, offset: u32) -> Result<SchedInfo, Error> {
        use std::mem;

        let max_cpu = unsafe { libc::sysconf(libc::_SC_NPROCESSORS_CONF) };
        if max_cpu < 0 {
            return Err(Error::Topology(format!(
                "sysconf(_SC_NPROCESSORS_CONF): {}",
                std::io::Error::last_os_error()
            )));
        }

        let mut set: libc::cpu_set_t = unsafe { mem::zeroed() };
        let rc = unsafe {
            libc::sched_getaffinity(0, mem::size_of::<libc::cpu_set_t>(), &mut set)
        };
        if rc != 0 {
            return Err(Error::Topology(format!(
                "sched_getaffinity: {}",
                std::io::Error::last_os_error()
            )));
        }

        let mut map = 0u64;
        for bit in 0..MAP_BITS {
            let cpu = offset + bit;
            if (cpu as libc::c_long) < max_cpu && unsafe { libc::CPU_ISSET(cpu as usize, &set) } {
                map |= 1u64 << bit;
            }
        }

        Ok(SchedInfo {
            max_cpu: max_cpu as u32,
            map,
        })
    }
}

#[cfg(not(target_os = "linux"))]
impl CpuMap for OsSched {
    fn info(&self, offset: u32) -> Result<SchedInfo, Error> {
        // No affinity mask to consult; report the first `n` ids as present.
        let n = std::thread::available_parallelism()
            .map_err(|e| Error::Topology(e.to_string()))?
            .get() as u32;

        let mut map = 0u64;
        for bit in 0..MAP_BITS {
            if offset + bit < n {
                map |= 1u64 << bit;
            }
        }

        Ok(SchedInfo { max_cpu: n, map })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    /// Scheduler stub serving a fixed list of bitmap windows.
    struct FakeSched {
        windows: Vec<u64>,
        max_cpu: u32,
        fail_from: Option<u32>,
    }

    impl CpuMap for FakeSched {
        fn info(&self, offset: u32) -> Result<SchedInfo, Error> {
            if let Some(fail) = self.fail_from {
                if offset >= fail {
                    return Err(Error::Topology("injected".into()));
                }
            }
            let idx = (offset / MAP_BITS) as usize;
            Ok(SchedInfo {
                max_cpu: self.max_cpu,
                map: self.windows.get(idx).copied().unwrap_or(0),
            })
        }
    }

    #[test]
    fn visits_each_core_once_ascending() {
        // Gappy mask across two windows: 0, 2, 5 and 64, 70.
        let sched = FakeSched {
            windows: vec![0b100101, 0b1000001],
            max_cpu: 80,
            fail_from: None,
        };
        let mut seen = Vec::new();
        enumerate(&sched, |core| seen.push(core));
        assert_eq!(seen, vec![0, 2, 5, 64, 70]);
        assert!(seen.windows(2).all(|w| w[0] < w[1]));
    }

    #[test]
    fn count_matches_enumeration() {
        let sched = FakeSched {
            windows: vec![u64::MAX, 0b1111],
            max_cpu: 68,
            fail_from: None,
        };
        assert_eq!(count(&sched), 68);
        assert_eq!(core_set(&sched).len(), 68);
    }

    #[test]
    fn query_failure_yields_partial_set() {
        let sched = FakeSched {
            windows: vec![0b11, 0b11],
            max_cpu: 128,
            fail_from: Some(64),
        };
        // Second window errors; only the first window's cores show up.
        assert_eq!(core_set(&sched), vec![0, 1]);
    }

    #[test]
    fn empty_mask_is_an_empty_set() {
        let sched = FakeSched {
            windows: vec![0],
            max_cpu: 4,
            fail_from: None,
        };
        assert_eq!(count(&sched), 0);
        assert!(core_set(&sched).is_empty());
    }

    #[test]
    fn os_sched_reports_at_least_one_core() {
        let cores = core_set(&OsSched);
        assert!(!cores.is_empty());
        assert!(cores.windows(2).all(|w| w[0] < w[1]));
    }
}
