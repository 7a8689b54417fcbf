//! Error type shared by construction, evaluation and the universe lifecycle.
//!
//! Every variant is a caller-correctable usage error: evaluation is pure
//! computation, so nothing here is retried or recovered internally.

use thiserror::Error;

/// Errors raised by random-variable evaluation and universe management.
///
/// # Examples
/// ```
/// use nanoppl_core::Error;
///
/// let err = Error::InvalidSample { expected: 3, found: 2 };
/// assert_eq!(
///     err.to_string(),
///     "sample has dimension 2 but the universe has 3 slots"
/// );
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum Error {
    /// The variable was created before its universe was restarted.
    #[error("random variable was invalidated by a universe restart")]
    InvalidRandomVariable,

    /// The sample dimension does not match the universe slot count.
    #[error("sample has dimension {found} but the universe has {expected} slots")]
    InvalidSample {
        /// Current slot count of the universe
        expected: usize,
        /// Dimension of the supplied sample
        found: usize,
    },

    /// A random value was used where a concrete boolean is required.
    #[error("a random value cannot be used where a boolean is required; evaluate it first")]
    BooleanCoercion,

    /// Two array operands of different length were combined.
    #[error("cannot broadcast arrays of length {left} and {right}")]
    ShapeMismatch {
        /// Length of the left operand
        left: usize,
        /// Length of the right operand
        right: usize,
    },

    /// A lifted function received the wrong number of positional arguments.
    #[error("`{function}` takes {expected} argument(s), got {found}")]
    Arity {
        /// Function name
        function: String,
        /// Expected positional argument count
        expected: usize,
        /// Supplied positional argument count
        found: usize,
    },

    /// A lifted function did not receive a required named argument.
    #[error("`{function}` is missing the named argument `{name}`")]
    MissingArgument {
        /// Function name
        function: String,
        /// Name of the missing argument
        name: String,
    },

    /// Operands from two different universes were combined.
    #[error("random variables from different universes cannot be combined")]
    UniverseMismatch,

    /// The snapshot predates the last restart of the universe.
    #[error("snapshot from epoch {snapshot} cannot be loaded into epoch {current}")]
    StaleSnapshot {
        /// Epoch recorded in the snapshot
        snapshot: u64,
        /// Current epoch of the universe
        current: u64,
    },

    /// Loading the snapshot would re-issue slots owned by live variables.
    #[error("snapshot covers {snapshot} slots but {current} are already allocated")]
    SnapshotConflict {
        /// Slot count recorded in the snapshot
        snapshot: usize,
        /// Current slot count of the universe
        current: usize,
    },
}

/// Result alias used throughout the crate.
pub type Result<T> = std::result::Result<T, Error>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_display_messages() {
        assert_eq!(
            Error::InvalidRandomVariable.to_string(),
            "random variable was invalidated by a universe restart"
        );
        assert_eq!(
            Error::Arity {
                function: "exp".to_string(),
                expected: 1,
                found: 2
            }
            .to_string(),
            "`exp` takes 1 argument(s), got 2"
        );
        assert_eq!(
            Error::SnapshotConflict {
                snapshot: 1,
                current: 4
            }
            .to_string(),
            "snapshot covers 1 slots but 4 are already allocated"
        );
    }

    #[test]
    fn test_error_is_std_error() {
        fn assert_error<E: std::error::Error>(_: &E) {}
        assert_error(&Error::BooleanCoercion);
    }
}
