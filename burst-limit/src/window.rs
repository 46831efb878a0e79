//! Window bookkeeping shared by the limiter's lock-free and locked paths.
//!
//! Timestamps are nanoseconds since the limiter's clock anchor. All
//! comparisons wrap, so a window start computed as `begin - 2 * interval`
//! near the anchor still orders correctly against `now`.

use std::time::Duration;

/// Largest interval accepted, in nanoseconds. Keeps `2 * interval` well
/// inside the signed range the wrapping comparisons rely on.
pub(crate) const MAX_INTERVAL_NS: u64 = 1 << 62;

/// Converts a configured interval to clamped nanoseconds. `0` means disabled.
pub(crate) fn interval_ns(interval: Duration) -> u64 {
    u64::try_from(interval.as_nanos())
        .unwrap_or(u64::MAX)
        .min(MAX_INTERVAL_NS)
}

/// `a` is strictly earlier than `b`.
#[inline]
pub(crate) fn time_before(a: u64, b: u64) -> bool {
    (a.wrapping_sub(b) as i64) < 0
}

/// `a` is strictly later than `b`.
#[inline]
pub(crate) fn time_after(a: u64, b: u64) -> bool {
    time_before(b, a)
}

/// `now` lies within one interval either side of `begin`.
#[inline]
pub(crate) fn is_current(now: u64, begin: u64, interval: u64) -> bool {
    time_before(begin.wrapping_sub(interval), now)
        && time_before(now, begin.wrapping_add(interval))
}

/// The window starting at `begin` was opened ahead of time by the caller
/// that exhausted the previous one, and has not started yet.
#[inline]
pub(crate) fn is_pending(now: u64, begin: u64, interval: u64) -> bool {
    time_before(begin.wrapping_sub(2 * interval), now) && time_before(now, begin)
}

/// An exhausted counter still applies to `now`: either its window is
/// current or the next one is pending.
#[inline]
pub(crate) fn is_exhausted_window(now: u64, begin: u64, interval: u64) -> bool {
    time_before(begin.wrapping_sub(2 * interval), now)
        && time_before(now, begin.wrapping_add(interval))
}

/// The admission counter together with the epoch of the window it counts.
///
/// Both halves live in one `AtomicU64` so that a decrement can only succeed
/// against the window the caller validated.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) struct Quota {
    pub(crate) epoch: u32,
    pub(crate) remaining: i32,
}

impl Quota {
    pub(crate) fn new(epoch: u32, remaining: i32) -> Self {
        Self { epoch, remaining }
    }

    #[inline]
    pub(crate) fn pack(self) -> u64 {
        (u64::from(self.epoch) << 32) | u64::from(self.remaining as u32)
    }

    #[inline]
    pub(crate) fn unpack(word: u64) -> Self {
        Self {
            epoch: (word >> 32) as u32,
            remaining: word as u32 as i32,
        }
    }

    /// One admission taken from this window.
    #[inline]
    pub(crate) fn take(self) -> Self {
        Self {
            remaining: self.remaining - 1,
            ..self
        }
    }

    /// The next window's quota. Also used to invalidate the current one.
    pub(crate) fn next(self, remaining: i32) -> Self {
        Self {
            epoch: self.epoch.wrapping_add(1),
            remaining,
        }
    }
}
