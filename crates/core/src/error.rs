//! Error Handling Module
//!
//! Configuration errors surfaced when constructing schedulers. Map
//! operations themselves are total: invalid TTLs and missing values are
//! unrepresentable in the API, and benign concurrent races inside the
//! schedulers are absorbed rather than surfaced.

use thiserror::Error;

/// Errors raised synchronously by scheduler constructors.
#[derive(Error, Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConfigError {
    /// The drain interval of an [`IntervalScheduler`](crate::IntervalScheduler)
    /// must be strictly positive.
    #[error("drain interval must be greater than zero")]
    ZeroInterval,
}

/// Convenience alias for constructor results.
pub type Result<T> = std::result::Result<T, ConfigError>;
