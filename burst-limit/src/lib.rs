//! # burst-limit
//!
//! `burst-limit` guards hot call sites, such as logging or error reporting
//! paths, with a fixed-window quota: at most `burst` events are admitted per
//! `interval`, and the rest are counted and reported as suppressed.
//!
//! ## Core Philosophy
//!
//! A limiter in front of a logging path is called from everywhere, often at
//! the worst possible moment. `burst-limit` keeps the decision lock-free:
//! configuration is read with relaxed loads, rejections bump an atomic
//! counter, and admissions take a compare-and-swap on a packed
//! `(epoch, remaining)` word. A short `parking_lot` lock is held only while
//! the next window is opened, and callers that cannot wait for it never do.
//!
//! ## Key Concepts
//!
//! * **Window**: `[window_start, window_start + interval)`, admitting at most
//!   `burst` events.
//! * **Rollover**: opening the next window. Consecutive windows keep their
//!   phase; after an idle period the new window starts at the current time.
//! * **Disabled**: a `burst <= 0` or zero `interval` admits everything.
//!   Re-enabling always starts a fresh window.
//! * **Reporting**: suppressed events are counted and handed to a
//!   [`Reporter`] with the caller's label, either by the next admission or
//!   on an explicit [`RateLimiter::flush`].
//!
//! ## Example
//!
//! ```rust
//! use burst_limit::RateLimiter;
//! use std::time::Duration;
//!
//! let limiter = RateLimiter::new(3, Duration::from_secs(1));
//!
//! let admitted = (0..5).filter(|_| limiter.allow("example")).count();
//! assert_eq!(admitted, 3);
//! assert_eq!(limiter.missed(), 2);
//! ```

mod config;
mod error;
mod limiter;
mod report;
mod window;


pub use config::DEFAULT_BURST;
pub use config::DEFAULT_INTERVAL;
pub use config::RateLimitConfig;
pub use error::ConfigError;
pub use limiter::RateLimiter;
pub use report::LogReporter;
pub use report::Reporter;
pub use report::Silent;
