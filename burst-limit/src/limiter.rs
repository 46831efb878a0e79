use std::fmt::Debug;
use std::sync::atomic::AtomicBool;
use std::sync::atomic::AtomicI32;
use std::sync::atomic::AtomicU32;
use std::sync::atomic::AtomicU64;
use std::sync::atomic::Ordering;
use std::time::Duration;

use parking_lot::Mutex;
use parking_lot::MutexGuard;
use quanta::Clock;
use quanta::Instant;

use crate::RateLimitConfig;
use crate::report::LogReporter;
use crate::report::Reporter;
use crate::report::ReporterName;
use crate::window::Quota;
use crate::window::interval_ns;
use crate::window::is_current;
use crate::window::is_exhausted_window;
use crate::window::is_pending;
use crate::window::time_after;
use crate::window::time_before;

/// A fixed-window limiter admitting at most `burst` events per `interval`.
///
/// Most decisions are lock-free: configuration is read with relaxed loads,
/// rejections only bump an atomic counter, and admissions decrement a packed
/// `(epoch, remaining)` word with a compare-and-swap. A short lock is taken
/// only to open a new window.
///
/// Field discipline:
///
/// * `burst`, `interval_ns`, `report_on_release`, `missed`: atomic only.
/// * `quota`: decremented by CAS outside the lock, replaced only under it.
/// * `window_start`, `initialized`: written only under the lock, read
///   lock-free with `Acquire`.
pub struct RateLimiter<R = LogReporter> {
    burst: AtomicI32,
    interval_ns: AtomicU64,
    quota: AtomicU64,
    /// Nanoseconds since `anchor`.
    window_start: AtomicU64,
    initialized: AtomicBool,
    report_on_release: AtomicBool,
    missed: AtomicU32,
    lock: Mutex<()>,
    clock: Clock,
    anchor: Instant,
    reporter: R,
}

/// Outcome of a check that found the quota already used up.
enum Exhausted {
    Limited,
    Admitted,
    /// Another caller opened a window while we waited for the lock.
    Retry,
}

impl RateLimiter {
    /// Creates a limiter admitting `burst` events per `interval`.
    ///
    /// A `burst` of zero or less, or a zero `interval`, creates a disabled
    /// limiter which admits everything until [`configure`](Self::configure)
    /// enables it.
    pub fn new(burst: i32, interval: Duration) -> Self {
        Self::with_clock(burst, interval, Clock::new())
    }

    /// Creates a limiter reading time from `clock`.
    ///
    /// Pass a clock from `quanta::Clock::mock()` to drive windows by hand.
    pub fn with_clock(burst: i32, interval: Duration, clock: Clock) -> Self {
        let anchor = clock.now();
        Self {
            burst: AtomicI32::new(burst),
            interval_ns: AtomicU64::new(interval_ns(interval)),
            quota: AtomicU64::new(Quota::new(0, burst).pack()),
            window_start: AtomicU64::new(0),
            initialized: AtomicBool::new(false),
            report_on_release: AtomicBool::new(false),
            missed: AtomicU32::new(0),
            lock: Mutex::new(()),
            clock,
            anchor,
            reporter: LogReporter,
        }
    }

    pub fn from_config(config: &RateLimitConfig) -> Self {
        let limiter = Self::new(config.burst, config.interval);
        limiter.set_report_on_release(config.report_on_release);
        limiter
    }
}

impl Default for RateLimiter {
    fn default() -> Self {
        Self::from_config(&RateLimitConfig::default())
    }
}

impl<R: Reporter> RateLimiter<R> {
    /// Replaces the reporter that receives suppressed counts.
    pub fn with_reporter<T: Reporter>(self, reporter: T) -> RateLimiter<T> {
        let Self {
            burst,
            interval_ns,
            quota,
            window_start,
            initialized,
            report_on_release,
            missed,
            lock,
            clock,
            anchor,
            reporter: _,
        } = self;

        RateLimiter {
            burst,
            interval_ns,
            quota,
            window_start,
            initialized,
            report_on_release,
            missed,
            lock,
            clock,
            anchor,
            reporter,
        }
    }

    /// Decides whether one event may proceed.
    ///
    /// Returns `true` if the event is admitted and `false` if it is
    /// suppressed. `label` has no effect on the decision; it is passed to the
    /// reporter when an admission drains a nonzero suppressed count.
    ///
    /// Never waits unless this call has to open the next window, in which
    /// case it holds the lock for a constant amount of work.
    pub fn allow(&self, label: &str) -> bool {
        let burst = self.burst.load(Ordering::Relaxed);
        let interval = self.interval_ns.load(Ordering::Relaxed);

        if burst <= 0 || interval == 0 {
            self.clear_window();
            return true;
        }

        let mut now = self.now();
        loop {
            let quota = Quota::unpack(self.quota.load(Ordering::Acquire));
            if quota.remaining <= 0 {
                match self.exhausted(now, interval) {
                    Exhausted::Limited => return self.limited(),
                    Exhausted::Admitted => return self.admitted(label),
                    Exhausted::Retry => {
                        now = self.now();
                        continue;
                    }
                }
            }

            let (begin, initialized) = self.current_window(now);
            if initialized && is_pending(now, begin, interval) {
                return self.limited();
            }

            let taken = quota.take();
            if self
                .quota
                .compare_exchange_weak(
                    quota.pack(),
                    taken.pack(),
                    Ordering::AcqRel,
                    Ordering::Relaxed,
                )
                .is_err()
            {
                continue;
            }

            if taken.remaining > 0 {
                if initialized && is_current(now, begin, interval) {
                    return self.admitted(label);
                }
                // Quota left but the window went stale. Whoever holds the
                // lock is already opening a new one.
                if let Some(guard) = self.lock.try_lock() {
                    self.refresh_window(guard, now);
                }
                return self.admitted(label);
            }

            // We took the last admission, so opening the next window is ours.
            let guard = self.lock.lock();
            if Quota::unpack(self.quota.load(Ordering::Relaxed)).epoch == taken.epoch {
                self.roll_over(guard);
            } else {
                drop(guard);
            }
            return self.admitted(label);
        }
    }

    /// Updates the quota policy.
    ///
    /// Safe to call while other threads are inside [`allow`](Self::allow).
    /// The new burst and interval apply from the next window; disabling
    /// values apply immediately.
    pub fn configure(&self, burst: i32, interval: Duration) {
        self.burst.store(burst, Ordering::Relaxed);
        self.interval_ns
            .store(interval_ns(interval), Ordering::Relaxed);
    }

    pub fn burst(&self) -> i32 {
        self.burst.load(Ordering::Relaxed)
    }

    pub fn interval(&self) -> Duration {
        Duration::from_nanos(self.interval_ns.load(Ordering::Relaxed))
    }

    /// When set, suppressed counts are kept until [`flush`](Self::flush)
    /// instead of being reported by the next admission.
    pub fn set_report_on_release(&self, report_on_release: bool) {
        self.report_on_release
            .store(report_on_release, Ordering::Relaxed);
    }

    pub fn report_on_release(&self) -> bool {
        self.report_on_release.load(Ordering::Relaxed)
    }

    /// Number of events suppressed since the last report or reset.
    pub fn missed(&self) -> u32 {
        self.missed.load(Ordering::Relaxed)
    }

    /// Zeroes the suppressed count without reporting it. Returns the old count.
    pub fn reset_missed(&self) -> u32 {
        self.missed.swap(0, Ordering::Relaxed)
    }

    /// Reports and zeroes any outstanding suppressed count.
    ///
    /// This is how a limiter with [`report_on_release`](Self::set_report_on_release)
    /// set gets its count out, typically when its owner shuts down. Returns
    /// the count that was reported, which may be zero.
    pub fn flush(&self, label: &str) -> u32 {
        self.report(label)
    }

    /// Sets a new interval and starts over: the next call opens a fresh
    /// window with the full burst and the suppressed count is discarded.
    pub fn reset_interval(&self, interval: Duration) {
        let _guard = self.lock.lock();
        self.interval_ns
            .store(interval_ns(interval), Ordering::Relaxed);
        self.initialized.store(false, Ordering::Relaxed);
        let burst = self.burst.load(Ordering::Relaxed);
        let quota = Quota::unpack(self.quota.load(Ordering::Relaxed)).next(burst);
        self.quota.store(quota.pack(), Ordering::Release);
        self.missed.store(0, Ordering::Relaxed);
    }

    fn now(&self) -> u64 {
        self.clock.now().duration_since(self.anchor).as_nanos() as u64
    }

    /// Start of the window `now` is checked against, and whether it is
    /// committed. Claims an uninitialized limiter if the lock is free;
    /// otherwise the tentative start `now` is used.
    fn current_window(&self, now: u64) -> (u64, bool) {
        if self.initialized.load(Ordering::Acquire) {
            return (self.window_start.load(Ordering::Acquire), true);
        }

        let Some(_guard) = self.lock.try_lock() else {
            return (now, false);
        };
        if self.initialized.load(Ordering::Relaxed) {
            return (self.window_start.load(Ordering::Relaxed), true);
        }
        self.window_start.store(now, Ordering::Release);
        self.initialized.store(true, Ordering::Release);
        (now, true)
    }

    /// The counter is used up. It only means "limited" while its window is
    /// current or pending; a stale counter gets a new window instead.
    ///
    /// Opening that window waits for the lock, as the last admission does.
    fn exhausted(&self, now: u64, interval: u64) -> Exhausted {
        if self.initialized.load(Ordering::Acquire)
            && is_exhausted_window(now, self.window_start.load(Ordering::Acquire), interval)
        {
            return Exhausted::Limited;
        }

        let guard = self.lock.lock();
        if Quota::unpack(self.quota.load(Ordering::Relaxed)).remaining > 0 {
            return Exhausted::Retry;
        }
        let interval = self.interval_ns.load(Ordering::Relaxed);
        if interval != 0
            && self.initialized.load(Ordering::Relaxed)
            && is_exhausted_window(
                self.now(),
                self.window_start.load(Ordering::Relaxed),
                interval,
            )
        {
            return Exhausted::Limited;
        }

        self.roll_over(guard);
        Exhausted::Admitted
    }

    /// Quota remained but `now` fell outside the window. Re-checks under the
    /// lock in case another caller got there first.
    fn refresh_window(&self, guard: MutexGuard<'_, ()>, now: u64) {
        let interval = self.interval_ns.load(Ordering::Relaxed);
        if interval == 0
            || (self.initialized.load(Ordering::Relaxed)
                && is_current(now, self.window_start.load(Ordering::Relaxed), interval))
        {
            return;
        }
        self.roll_over(guard);
    }

    /// Opens the next window. The caller's own admission is charged to the
    /// new window when `now` falls inside it.
    fn roll_over(&self, guard: MutexGuard<'_, ()>) {
        let interval = self.interval_ns.load(Ordering::Relaxed);
        let burst = self.burst.load(Ordering::Relaxed);
        let now = self.now();
        let begin = self.window_start.load(Ordering::Relaxed);

        let fresh = interval == 0
            || !self.initialized.load(Ordering::Relaxed)
            || time_after(now, begin.wrapping_add(interval))
            || time_after(begin.wrapping_sub(interval), now);
        let begin = if fresh {
            now
        } else {
            begin.wrapping_add(interval)
        };
        let delta = if !time_before(now, begin) && time_before(now, begin.wrapping_add(interval)) {
            -1
        } else {
            0
        };

        // Invalidate first: a caller that sees the new start will fail its
        // CAS against the old epoch.
        let quota = Quota::unpack(self.quota.load(Ordering::Relaxed)).next(0);
        self.quota.store(quota.pack(), Ordering::Relaxed);
        self.window_start.store(begin, Ordering::Release);
        self.initialized.store(true, Ordering::Release);
        self.quota.store(
            Quota::new(quota.epoch, burst.saturating_add(delta)).pack(),
            Ordering::Release,
        );
        drop(guard);

        tracing::debug!(
            window_start_ns = begin,
            burst,
            fresh,
            "opened rate limit window"
        );
    }

    /// Best effort: forget the window so re-enabling starts a fresh one.
    fn clear_window(&self) {
        if !self.initialized.load(Ordering::Relaxed) {
            return;
        }
        let Some(_guard) = self.lock.try_lock() else {
            return;
        };
        if self.initialized.load(Ordering::Relaxed) {
            self.initialized.store(false, Ordering::Relaxed);
            let quota = Quota::unpack(self.quota.load(Ordering::Relaxed)).next(0);
            self.quota.store(quota.pack(), Ordering::Release);
        }
    }

    fn limited(&self) -> bool {
        self.missed.fetch_add(1, Ordering::Relaxed);
        false
    }

    fn admitted(&self, label: &str) -> bool {
        if !self.report_on_release.load(Ordering::Relaxed)
            && self.missed.load(Ordering::Relaxed) != 0
        {
            self.report(label);
        }
        true
    }

    fn report(&self, label: &str) -> u32 {
        let missed = self.missed.swap(0, Ordering::Relaxed);
        if missed != 0 {
            self.reporter.suppressed(label, missed);
        }
        missed
    }

    #[cfg(test)]
    pub(crate) fn remaining(&self) -> i32 {
        Quota::unpack(self.quota.load(Ordering::Acquire)).remaining
    }

    #[cfg(test)]
    pub(crate) fn window_start_ns(&self) -> Option<u64> {
        self.initialized
            .load(Ordering::Acquire)
            .then(|| self.window_start.load(Ordering::Acquire))
    }
}

impl<R: Reporter> Debug for RateLimiter<R> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let quota = Quota::unpack(self.quota.load(Ordering::Relaxed));
        f.debug_struct("RateLimiter")
            .field("burst", &self.burst())
            .field("interval", &self.interval())
            .field("remaining", &quota.remaining)
            .field("window_start", &self.window_start.load(Ordering::Relaxed))
            .field("initialized", &self.initialized.load(Ordering::Relaxed))
            .field("missed", &self.missed())
            .field("reporter", &ReporterName(&self.reporter))
            .finish_non_exhaustive()
    }
}
