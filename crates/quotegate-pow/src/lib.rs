//! # Proof-of-Work Engine
//!
//! A hash-preimage puzzle keyed by an elliptic-curve point: a nonce `N`
//! solves the challenge `(Qx, Qy, difficulty)` iff
//!
//! ```text
//! SHA-256( min_be(Qx) || min_be(Qy) || N )
//! ```
//!
//! has at least `difficulty` leading zero bits, where `min_be` is the
//! minimal big-endian encoding (no leading zero bytes; zero is empty).
//!
//! The point is `k * G` on P-256 for a scalar `k` drawn fresh per
//! challenge from a cryptographic RNG. The curve arithmetic does not
//! participate in verification; the point is server-bound, non-repeating
//! challenge material that the hash input is keyed on.

mod challenge;
mod error;

pub use challenge::{leading_zero_bits, Challenge, MAX_NONCE_BYTES};
pub use error::PowError;
