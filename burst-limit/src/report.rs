use std::fmt::Debug;

/// Receives the number of events a limiter suppressed since its last report.
///
/// Reporters are invoked from whichever caller's `allow` or `flush` drains the
/// suppressed count, never while the limiter's lock is held. A reporter may
/// therefore log through a path guarded by the same limiter.
pub trait Reporter: Send + Sync {
    /// Called with the caller-supplied label and a nonzero suppressed count.
    fn suppressed(&self, label: &str, count: u32);
}

impl<F> Reporter for F
where
    F: Fn(&str, u32) + Send + Sync,
{
    fn suppressed(&self, label: &str, count: u32) {
        self(label, count)
    }
}

/// The default reporter. Emits a `tracing` warning per report.
#[derive(Debug, Default, Clone, Copy)]
pub struct LogReporter;

impl Reporter for LogReporter {
    fn suppressed(&self, label: &str, count: u32) {
        tracing::warn!(label, suppressed = count, "{label}: {count} callbacks suppressed");
    }
}

/// A reporter that discards every report.
#[derive(Debug, Default, Clone, Copy)]
pub struct Silent;

impl Reporter for Silent {
    fn suppressed(&self, _label: &str, _count: u32) {}
}

/// Lets a `RateLimiter` derive `Debug` without requiring it of closures.
pub(crate) struct ReporterName<'a, R: ?Sized>(pub(crate) &'a R);

impl<R: ?Sized> Debug for ReporterName<'_, R> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(std::any::type_name::<R>())
    }
}
