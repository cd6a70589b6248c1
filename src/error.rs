//! Error types for the swarm core.
//!
//! Only two things can go wrong: a configuration that cannot produce a
//! valid population, and an out-of-range particle index. The tick itself
//! has no failure mode.

use thiserror::Error;

/// Result type alias for core operations
pub type Result<T> = std::result::Result<T, SimError>;

#[derive(Error, Debug, Clone, PartialEq)]
pub enum SimError {
    /// Parameters that cannot start a simulation. Fatal at initialization.
    #[error("invalid configuration: {0}")]
    InvalidConfiguration(String),

    /// A particle index past the end of the store. Indicates a caller bug.
    #[error("particle index {index} out of range (population {len})")]
    IndexOutOfRange { index: usize, len: usize },
}

impl SimError {
    pub fn invalid(msg: impl Into<String>) -> Self {
        SimError::InvalidConfiguration(msg.into())
    }

    /// True for errors raised by validation rather than by misuse of the API.
    pub fn is_configuration(&self) -> bool {
        matches!(self, SimError::InvalidConfiguration(_))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn messages_name_the_problem() {
        let err = SimError::IndexOutOfRange { index: 9, len: 4 };
        assert_eq!(err.to_string(), "particle index 9 out of range (population 4)");
        let err = SimError::invalid("n < 2");
        assert_eq!(err.to_string(), "invalid configuration: n < 2");
        assert!(err.is_configuration());
    }
}
