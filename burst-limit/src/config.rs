use std::str::FromStr;
use std::time::Duration;

use crate::ConfigError;

/// Default window length: five seconds.
pub const DEFAULT_INTERVAL: Duration = Duration::from_secs(5);

/// Default number of admissions per window.
pub const DEFAULT_BURST: i32 = 10;

/// Quota policy for a [`RateLimiter`](crate::RateLimiter).
///
/// A `burst` of zero or less, or a zero `interval`, disables limiting: every
/// event is admitted.
///
/// Parses from `<burst>/<interval>` where the interval uses `humantime`
/// syntax:
///
/// ```rust
/// use std::time::Duration;
/// use burst_limit::RateLimitConfig;
///
/// let config: RateLimitConfig = "10/5s".parse().unwrap();
/// assert_eq!(config.burst, 10);
/// assert_eq!(config.interval, Duration::from_secs(5));
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RateLimitConfig {
    /// Maximum admissions per window.
    pub burst: i32,
    /// Window length.
    pub interval: Duration,
    /// Defer suppressed-count reports until [`RateLimiter::flush`](crate::RateLimiter::flush).
    pub report_on_release: bool,
}

impl RateLimitConfig {
    pub fn new(burst: i32, interval: Duration) -> Self {
        Self {
            burst,
            interval,
            report_on_release: false,
        }
    }

    pub fn with_report_on_release(mut self, report_on_release: bool) -> Self {
        self.report_on_release = report_on_release;
        self
    }

    /// Whether this policy limits anything at all.
    pub fn is_enabled(&self) -> bool {
        self.burst > 0 && !self.interval.is_zero()
    }
}

impl Default for RateLimitConfig {
    fn default() -> Self {
        Self::new(DEFAULT_BURST, DEFAULT_INTERVAL)
    }
}

impl FromStr for RateLimitConfig {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let (burst, interval) = s
            .split_once('/')
            .ok_or_else(|| ConfigError::MissingSeparator(s.to_string()))?;

        let burst = burst.trim();
        let burst = burst.parse().map_err(|source| ConfigError::InvalidBurst {
            value: burst.to_string(),
            source,
        })?;

        let interval = interval.trim();
        let interval =
            humantime::parse_duration(interval).map_err(|source| ConfigError::InvalidInterval {
                value: interval.to_string(),
                source,
            })?;

        Ok(Self::new(burst, interval))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn it_parses_burst_and_interval() {
        let config: RateLimitConfig = "100 / 1m 30s".parse().unwrap();
        assert_eq!(config.burst, 100);
        assert_eq!(config.interval, Duration::from_secs(90));
        assert!(!config.report_on_release);
        assert!(config.is_enabled());
    }

    #[test]
    fn test_disabled_configurations_parse() {
        let config: RateLimitConfig = "0/5s".parse().unwrap();
        assert!(!config.is_enabled());

        let config: RateLimitConfig = "-1/5s".parse().unwrap();
        assert_eq!(config.burst, -1);
        assert!(!config.is_enabled());

        let config: RateLimitConfig = "10/0s".parse().unwrap();
        assert!(!config.is_enabled());
    }

    #[test]
    fn test_parse_errors() {
        assert!(matches!(
            "10".parse::<RateLimitConfig>(),
            Err(ConfigError::MissingSeparator(s)) if s == "10"
        ));
        assert!(matches!(
            "ten/5s".parse::<RateLimitConfig>(),
            Err(ConfigError::InvalidBurst { value, .. }) if value == "ten"
        ));
        assert!(matches!(
            "10/soon".parse::<RateLimitConfig>(),
            Err(ConfigError::InvalidInterval { value, .. }) if value == "soon"
        ));
    }

    #[test]
    fn test_error_messages() {
        let err = "10".parse::<RateLimitConfig>().unwrap_err();
        assert_eq!(err.to_string(), "expected `<burst>/<interval>`, got `10`");

        let err = "x/5s".parse::<RateLimitConfig>().unwrap_err();
        assert!(err.to_string().starts_with("invalid burst `x`"));
    }

    #[test]
    fn test_defaults() {
        let config = RateLimitConfig::default();
        assert_eq!(config.burst, DEFAULT_BURST);
        assert_eq!(config.interval, DEFAULT_INTERVAL);

        let config = config.with_report_on_release(true);
        assert!(config.report_on_release);
    }
}
