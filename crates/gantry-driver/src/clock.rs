//! Process timing
//!
//! The driver times each event with a [`ProcessClock`]. The default
//! [`ResourceClock`] reports real time plus the process's user and system
//! CPU time.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::ops::AddAssign;
use std::time::{Duration, Instant};

/// Real, user and system time at one instant, or the difference of two
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CpuTimes {
    pub real: Duration,
    pub user: Duration,
    pub system: Duration,
}

impl CpuTimes {
    /// Time elapsed since `earlier`, never negative
    pub fn since(&self, earlier: &CpuTimes) -> CpuTimes {
        CpuTimes {
            real: self.real.saturating_sub(earlier.real),
            user: self.user.saturating_sub(earlier.user),
            system: self.system.saturating_sub(earlier.system),
        }
    }
}

impl AddAssign for CpuTimes {
    fn add_assign(&mut self, rhs: Self) {
        self.real += rhs.real;
        self.user += rhs.user;
        self.system += rhs.system;
    }
}

impl fmt::Display for CpuTimes {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "User={:.3}s Real={:.3}s Sys={:.3}s",
            self.user.as_secs_f64(),
            self.real.as_secs_f64(),
            self.system.as_secs_f64()
        )
    }
}

/// Source of process times
pub trait ProcessClock {
    fn now(&self) -> CpuTimes;
}

/// Process clock backed by the operating system's resource accounting
///
/// Real time comes from a monotonic [`Instant`]. User and system time are
/// the CPU time consumed so far by the whole process, read with
/// `getrusage(RUSAGE_SELF)` on unix. Where that is unavailable they read
/// as zero.
#[derive(Debug, Clone, Copy)]
pub struct ResourceClock {
    origin: Instant,
}

impl ResourceClock {
    pub fn new() -> Self {
        Self {
            origin: Instant::now(),
        }
    }
}

impl Default for ResourceClock {
    fn default() -> Self {
        Self::new()
    }
}

impl ProcessClock for ResourceClock {
    fn now(&self) -> CpuTimes {
        let (user, system) = cpu_usage();
        CpuTimes {
            real: self.origin.elapsed(),
            user,
            system,
        }
    }
}

#[cfg(unix)]
fn cpu_usage() -> (Duration, Duration) {
    use nix::sys::resource::{getrusage, UsageWho};
    use nix::sys::time::TimeVal;

    fn duration(tv: TimeVal) -> Duration {
        Duration::from_secs(tv.tv_sec().max(0) as u64)
            + Duration::from_micros(tv.tv_usec().max(0) as u64)
    }

    match getrusage(UsageWho::RUSAGE_SELF) {
        Ok(usage) => (duration(usage.user_time()), duration(usage.system_time())),
        Err(err) => {
            tracing::warn!(error = %err, "getrusage failed; CPU time not recorded");
            (Duration::ZERO, Duration::ZERO)
        }
    }
}

#[cfg(not(unix))]
fn cpu_usage() -> (Duration, Duration) {
    (Duration::ZERO, Duration::ZERO)
}
