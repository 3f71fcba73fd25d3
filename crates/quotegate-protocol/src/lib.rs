//! # Quotegate Wire Protocol
//!
//! Everything that crosses the TCP connection lives here:
//!
//! - **Framing:** `LEN (4 bytes, big-endian) || BODY` with a hard size cap
//!   ([`MAX_FRAME_SIZE`]). Framing neither interprets nor alters bodies.
//! - **Wire schema:** Protocol Buffers-compatible message envelopes. Every
//!   frame body is one [`Message`] whose payload is a serialized
//!   [`Challenge`], [`Solution`], [`Quote`], or [`ErrorReply`].
//!
//! A conversation is exactly one round trip: server sends `CHALLENGE`,
//! client answers `SOLUTION`, server replies `QUOTE` or `ERROR` and closes.

pub mod error;
pub mod framing;
pub mod wire;

pub use error::{FrameError, WireError};
pub use framing::{decode_buffered, read_frame, write_frame, MAX_FRAME_SIZE};
pub use wire::{Challenge, ErrorReply, Message, MessageKind, Quote, Solution, CURVE_NAME};
