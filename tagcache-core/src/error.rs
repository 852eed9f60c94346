use thiserror::Error;

/// Errors surfaced by the caching core.
///
/// Conditions that have a defined boolean outcome (inserting a key that is
/// already present, an unrecognized configuration property) are not errors and
/// never show up here.
#[derive(Debug, Error)]
pub enum Error {
    /// A stored value was requested under a type it was not stored as.
    #[error("value stored under `{key}` is not a `{expected}`")]
    TypeMismatch { key: String, expected: &'static str },

    /// A decrement or removal would take a counter field below zero.
    #[error("counter `{counter}` underflow on `{operation}`")]
    CounterUnderflow {
        counter: String,
        operation: &'static str,
    },

    /// An addition would take a counter field past its maximum.
    #[error("counter `{counter}` overflow on `{operation}`")]
    CounterOverflow {
        counter: String,
        operation: &'static str,
    },

    /// A refresher was configured with a zero period.
    #[error("refresh period must be greater than zero")]
    InvalidPeriod,

    /// The background refresh thread could not be started.
    #[error("failed to spawn refresher thread: {0}")]
    Spawn(#[from] std::io::Error),

    /// Counter reports could not be serialized.
    #[error("failed to serialize counter reports: {0}")]
    Serialize(#[from] serde_json::Error),
}

impl Error {
    pub(crate) fn type_mismatch<T: ?Sized>(key: &str) -> Self {
        Self::TypeMismatch {
            key: key.to_string(),
            expected: std::any::type_name::<T>(),
        }
    }

    #[cfg_attr(not(feature = "stats"), allow(dead_code))]
    pub(crate) fn underflow(counter: &str, operation: &'static str) -> Self {
        Self::CounterUnderflow {
            counter: counter.to_string(),
            operation,
        }
    }

    #[cfg_attr(not(feature = "stats"), allow(dead_code))]
    pub(crate) fn overflow(counter: &str, operation: &'static str) -> Self {
        Self::CounterOverflow {
            counter: counter.to_string(),
            operation,
        }
    }
}

/// Result alias used throughout the crate.
pub type Result<T> = std::result::Result<T, Error>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_type_mismatch_message() {
        let err = Error::type_mismatch::<u32>("request:user");
        assert_eq!(
            err.to_string(),
            "value stored under `request:user` is not a `u32`"
        );
    }

    #[test]
    fn test_underflow_message() {
        let err = Error::underflow("threads", "dec");
        assert_eq!(err.to_string(), "counter `threads` underflow on `dec`");
    }
}
