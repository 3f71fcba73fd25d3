//! Errors for challenge generation, verification, and search.

use thiserror::Error;

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum PowError {
    #[error("negative difficulty {0} is not allowed")]
    NegativeDifficulty(i32),

    #[error("nonce of {len} bytes exceeds the {max}-byte search space")]
    NonceTooLong { len: usize, max: usize },

    #[error("hash does not meet difficulty {0}")]
    InvalidSolution(u32),

    #[error("no valid nonce within the search bound")]
    SearchExhausted,
}
