//! Protocol error types.

use thiserror::Error;

use crate::wire::MessageKind;

/// Failures at the framing layer.
#[derive(Debug, Error)]
pub enum FrameError {
    #[error("frame of {len} bytes exceeds the {max}-byte limit")]
    TooLarge { len: usize, max: usize },

    #[error("frame I/O failed: {0}")]
    Io(#[from] std::io::Error),
}

/// Failures while decoding a frame body into a typed message.
#[derive(Debug, Error)]
pub enum WireError {
    #[error("unknown message kind {0}")]
    UnknownKind(i32),

    #[error("unexpected message kind: expected {expected:?}, got {actual:?}")]
    UnexpectedKind {
        expected: MessageKind,
        actual: MessageKind,
    },

    #[error("malformed payload: {0}")]
    Decode(#[from] prost::DecodeError),
}
