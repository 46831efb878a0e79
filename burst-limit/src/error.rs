/// Errors produced while parsing a [`RateLimitConfig`](crate::RateLimitConfig).
#[derive(Debug, Clone, thiserror::Error)]
pub enum ConfigError {
    /// The input did not have the `<burst>/<interval>` shape.
    #[error("expected `<burst>/<interval>`, got `{0}`")]
    MissingSeparator(String),

    /// The burst was not a valid integer.
    #[error("invalid burst `{value}`: {source}")]
    InvalidBurst {
        value: String,
        #[source]
        source: std::num::ParseIntError,
    },

    /// The interval was not a valid `humantime` duration, e.g. `5s` or `1m 30s`.
    #[error("invalid interval `{value}`: {source}")]
    InvalidInterval {
        value: String,
        #[source]
        source: humantime::DurationError,
    },
}
