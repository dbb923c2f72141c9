//! Hashed embedding — maps arbitrary text into a fixed-width signed vector
//! without any model weights, the same trick `glasswally`'s RFH worker uses,
//! generalized from a fixed 512-dim bit vector to a configurable signed
//! hashed-index embedding.

use sha2::{Digest, Sha256};

use crate::text::tokenize;

pub const DEFAULT_DIM: usize = 256;

/// Hashes a single token into (dimension index, sign).
///
/// Takes the first 8 bytes of the token's SHA-256 digest as a big-endian
/// u64: the low bits (mod `dim`) select the index, and the top bit picks
/// the sign. This gives a sparse random projection that's stable across
/// runs without needing a stored hash table.
fn token_hash(token: &str, dim: usize) -> (usize, f64) {
    let digest = Sha256::digest(token.as_bytes());
    let raw = u64::from_be_bytes(digest[..8].try_into().unwrap());
    let index = (raw % dim as u64) as usize;
    let sign = if (raw >> 63) & 1 == 1 { -1.0 } else { 1.0 };
    (index, sign)
}

/// Embeds a piece of text into a unit-norm vector of length `dim`.
pub fn embed_text(text: &str, dim: usize) -> Vec<f64> {
    let mut vec = vec![0.0f64; dim];
    for token in tokenize(text) {
        let (index, sign) = token_hash(&token, dim);
        vec[index] += sign;
    }

    let norm = vec.iter().map(|v| v * v).sum::<f64>().sqrt();
    if norm > 0.0 {
        for v in vec.iter_mut() {
            *v /= norm;
        }
    }
    vec
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn embed_text_is_unit_norm_when_nonempty() {
        let vec = embed_text("some risky sounding phrase", 64);
        let norm = vec.iter().map(|v| v * v).sum::<f64>().sqrt();
        assert!((norm - 1.0).abs() < 1e-9);
    }

    #[test]
    fn embed_text_is_zero_vector_for_empty_text() {
        let vec = embed_text("   ", 32);
        assert!(vec.iter().all(|v| *v == 0.0));
    }

    #[test]
    fn embed_text_is_deterministic() {
        let a = embed_text("repeat this exact phrase", 128);
        let b = embed_text("repeat this exact phrase", 128);
        assert_eq!(a, b);
    }

    #[test]
    fn token_hash_index_is_within_bounds() {
        for token in ["alpha", "beta", "gamma-delta", "x"] {
            let (index, _) = token_hash(token, 37);
            assert!(index < 37);
        }
    }
}
