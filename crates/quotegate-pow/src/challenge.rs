//! Challenge generation, verification, and the client-side search.

use p256::elliptic_curve::sec1::ToEncodedPoint;
use p256::{NonZeroScalar, ProjectivePoint};
use rand::rngs::OsRng;
use sha2::{Digest, Sha256};

use quotegate_protocol::wire;

use crate::error::PowError;

/// Longest accepted nonce; bounds the search space to 64 bits.
pub const MAX_NONCE_BYTES: usize = 8;

/// A proof-of-work challenge: a fresh point on P-256 plus the required
/// number of leading zero hash bits.
///
/// Coordinates are held in minimal big-endian form, which is exactly what
/// goes on the wire and into the hash input.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Challenge {
    qx: Vec<u8>,
    qy: Vec<u8>,
    difficulty: u32,
}

impl Challenge {
    /// Generate a fresh challenge at the given difficulty.
    ///
    /// Samples `k` uniformly from `[1, n-1]` and uses the affine
    /// coordinates of `k * G` as the challenge point. The scalar is
    /// dropped on return and never cached, so challenge material cannot
    /// repeat across connections.
    pub fn generate(difficulty: i32) -> Result<Self, PowError> {
        if difficulty < 0 {
            return Err(PowError::NegativeDifficulty(difficulty));
        }

        let k = NonZeroScalar::random(&mut OsRng);
        let point = (ProjectivePoint::GENERATOR * *k).to_affine();
        let encoded = point.to_encoded_point(false);

        // k is nonzero and G has prime order, so the point is never the
        // identity and both coordinates are present.
        let qx = minimal_be(encoded.x().expect("non-identity point has x"));
        let qy = minimal_be(encoded.y().expect("uncompressed encoding has y"));

        Ok(Self {
            qx,
            qy,
            difficulty: difficulty as u32,
        })
    }

    /// Challenge point x coordinate, minimal big-endian.
    pub fn qx(&self) -> &[u8] {
        &self.qx
    }

    /// Challenge point y coordinate, minimal big-endian.
    pub fn qy(&self) -> &[u8] {
        &self.qy
    }

    /// Required count of leading zero hash bits.
    pub fn difficulty(&self) -> u32 {
        self.difficulty
    }

    /// Check a candidate nonce against the puzzle predicate.
    ///
    /// The challenge point is trusted as-is; the server verifies only its
    /// own freshly generated points, so there is no on-curve re-check
    /// here.
    pub fn verify(&self, nonce: &[u8]) -> Result<(), PowError> {
        if nonce.len() > MAX_NONCE_BYTES {
            return Err(PowError::NonceTooLong {
                len: nonce.len(),
                max: MAX_NONCE_BYTES,
            });
        }

        if leading_zero_bits(&self.hash_nonce(nonce)) >= self.difficulty {
            Ok(())
        } else {
            Err(PowError::InvalidSolution(self.difficulty))
        }
    }

    /// Search nonces `0, 1, 2, ...` in minimal big-endian form and return
    /// the first that satisfies the predicate.
    ///
    /// Bounded to the full 64-bit space; see [`Challenge::solve_bounded`]
    /// for an explicit cap.
    pub fn solve(&self) -> Result<Vec<u8>, PowError> {
        self.solve_bounded(u64::MAX)
    }

    /// [`Challenge::solve`] trying at most `max_attempts` nonces.
    pub fn solve_bounded(&self, max_attempts: u64) -> Result<Vec<u8>, PowError> {
        let mut input = Vec::with_capacity(self.qx.len() + self.qy.len() + MAX_NONCE_BYTES);
        input.extend_from_slice(&self.qx);
        input.extend_from_slice(&self.qy);
        let base = input.len();

        let mut nonce: u64 = 0;
        loop {
            let bytes = minimal_be(&nonce.to_be_bytes());
            input.truncate(base);
            input.extend_from_slice(&bytes);

            if leading_zero_bits(&Sha256::digest(&input)) >= self.difficulty {
                return Ok(bytes);
            }

            nonce = match nonce.checked_add(1) {
                Some(next) if next < max_attempts => next,
                _ => return Err(PowError::SearchExhausted),
            };
        }
    }

    fn hash_nonce(&self, nonce: &[u8]) -> [u8; 32] {
        let mut hasher = Sha256::new();
        hasher.update(&self.qx);
        hasher.update(&self.qy);
        hasher.update(nonce);
        hasher.finalize().into()
    }
}

impl From<&Challenge> for wire::Challenge {
    fn from(challenge: &Challenge) -> Self {
        Self {
            qx: challenge.qx.clone(),
            qy: challenge.qy.clone(),
            curve: wire::CURVE_NAME.to_string(),
            difficulty: challenge.difficulty as i32,
        }
    }
}

impl TryFrom<wire::Challenge> for Challenge {
    type Error = PowError;

    /// Coordinates are re-minimalized so that a peer sending padded
    /// encodings still hashes the same input as everyone else.
    fn try_from(challenge: wire::Challenge) -> Result<Self, PowError> {
        if challenge.difficulty < 0 {
            return Err(PowError::NegativeDifficulty(challenge.difficulty));
        }
        Ok(Self {
            qx: minimal_be(&challenge.qx),
            qy: minimal_be(&challenge.qy),
            difficulty: challenge.difficulty as u32,
        })
    }
}

/// Minimal big-endian form: leading zero bytes stripped, zero is empty.
fn minimal_be(bytes: &[u8]) -> Vec<u8> {
    let first = bytes.iter().position(|&b| b != 0).unwrap_or(bytes.len());
    bytes[first..].to_vec()
}

/// Count leading zero bits, most-significant bit of byte 0 first.
pub fn leading_zero_bits(hash: &[u8]) -> u32 {
    let mut bits = 0;
    for &byte in hash {
        if byte == 0 {
            bits += 8;
        } else {
            bits += byte.leading_zeros();
            break;
        }
    }
    bits
}

#[cfg(test)]
mod tests {
    use super::*;
    use p256::elliptic_curve::sec1::FromEncodedPoint;
    use p256::{AffinePoint, EncodedPoint, FieldBytes};
    use proptest::prelude::*;

    fn left_pad32(bytes: &[u8]) -> [u8; 32] {
        assert!(bytes.len() <= 32);
        let mut out = [0u8; 32];
        out[32 - bytes.len()..].copy_from_slice(bytes);
        out
    }

    fn point_is_on_curve(challenge: &Challenge) -> bool {
        let x = FieldBytes::from(left_pad32(challenge.qx()));
        let y = FieldBytes::from(left_pad32(challenge.qy()));
        let encoded = EncodedPoint::from_affine_coordinates(&x, &y, false);
        AffinePoint::from_encoded_point(&encoded).is_some().into()
    }

    #[test]
    fn test_generate_rejects_negative_difficulty() {
        assert_eq!(
            Challenge::generate(-1),
            Err(PowError::NegativeDifficulty(-1))
        );
    }

    #[test]
    fn test_generated_point_satisfies_curve_equation() {
        for _ in 0..8 {
            let challenge = Challenge::generate(1).unwrap();
            assert!(point_is_on_curve(&challenge));
        }
    }

    #[test]
    fn test_generated_coordinates_are_minimal() {
        let challenge = Challenge::generate(0).unwrap();
        assert_ne!(challenge.qx().first(), Some(&0));
        assert_ne!(challenge.qy().first(), Some(&0));
    }

    #[test]
    fn test_challenges_are_fresh() {
        let a = Challenge::generate(1).unwrap();
        let b = Challenge::generate(1).unwrap();
        assert_ne!((a.qx(), a.qy()), (b.qx(), b.qy()));
    }

    #[test]
    fn test_solve_then_verify_across_difficulties() {
        for difficulty in 0..=12 {
            let challenge = Challenge::generate(difficulty).unwrap();
            let nonce = challenge.solve().unwrap();
            assert!(
                challenge.verify(&nonce).is_ok(),
                "difficulty {difficulty} solution rejected"
            );
            // The search returns minimal encodings only.
            assert_ne!(nonce.first(), Some(&0));
        }
    }

    #[test]
    fn test_zero_difficulty_accepts_anything() {
        let challenge = Challenge::generate(0).unwrap();
        assert!(challenge.verify(b"").is_ok());
        assert!(challenge.verify(&[0xFF; 8]).is_ok());
        // The empty nonce is the minimal encoding of zero and is the
        // first candidate the search tries.
        assert_eq!(challenge.solve().unwrap(), Vec::<u8>::new());
    }

    #[test]
    fn test_impossible_difficulty_exhausts_bounded_search() {
        let challenge = Challenge::generate(256).unwrap();
        assert_eq!(
            challenge.solve_bounded(1024),
            Err(PowError::SearchExhausted)
        );
    }

    #[test]
    fn test_oversized_nonce_rejected() {
        let challenge = Challenge::generate(0).unwrap();
        let err = challenge.verify(&[1u8; 9]).unwrap_err();
        assert_eq!(err, PowError::NonceTooLong { len: 9, max: 8 });
    }

    #[test]
    fn test_wire_round_trip() {
        let challenge = Challenge::generate(7).unwrap();
        let over_the_wire = wire::Challenge::from(&challenge);
        assert_eq!(over_the_wire.curve, wire::CURVE_NAME);

        let back = Challenge::try_from(over_the_wire).unwrap();
        assert_eq!(back, challenge);
    }

    #[test]
    fn test_wire_decode_rejects_negative_difficulty() {
        let bad = wire::Challenge {
            qx: vec![1],
            qy: vec![2],
            curve: wire::CURVE_NAME.to_string(),
            difficulty: -3,
        };
        assert_eq!(
            Challenge::try_from(bad),
            Err(PowError::NegativeDifficulty(-3))
        );
    }

    #[test]
    fn test_wire_decode_strips_padded_coordinates() {
        let padded = wire::Challenge {
            qx: vec![0, 0, 5],
            qy: vec![0, 9],
            curve: wire::CURVE_NAME.to_string(),
            difficulty: 0,
        };
        let challenge = Challenge::try_from(padded).unwrap();
        assert_eq!(challenge.qx(), &[5]);
        assert_eq!(challenge.qy(), &[9]);
    }

    #[test]
    fn test_leading_zero_bits_counting() {
        assert_eq!(leading_zero_bits(&[0x80]), 0);
        assert_eq!(leading_zero_bits(&[0x0F]), 4);
        assert_eq!(leading_zero_bits(&[0x00, 0x0F]), 12);
        assert_eq!(leading_zero_bits(&[0x00; 32]), 256);
        assert_eq!(leading_zero_bits(&[]), 0);
    }

    proptest! {
        // Verification must agree with the raw hash predicate for any
        // nonce in the accepted range.
        #[test]
        fn test_verify_matches_hash_predicate(
            nonce in proptest::collection::vec(any::<u8>(), 0..=8),
            difficulty in 0i32..=20,
        ) {
            let challenge = Challenge::generate(difficulty).unwrap();

            let mut input = challenge.qx().to_vec();
            input.extend_from_slice(challenge.qy());
            input.extend_from_slice(&nonce);
            let expected = leading_zero_bits(&Sha256::digest(&input)) >= difficulty as u32;

            prop_assert_eq!(challenge.verify(&nonce).is_ok(), expected);
        }

        #[test]
        fn test_minimal_be_never_has_leading_zero(bytes in proptest::collection::vec(any::<u8>(), 0..16)) {
            let minimal = minimal_be(&bytes);
            prop_assert_ne!(minimal.first(), Some(&0u8));
        }
    }
}
