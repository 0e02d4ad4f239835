//! Hashing primitive for the forestry: blake2b-256.
//!
//! Every digest in the structure (value hashes, node hashes, Merkle inner
//! nodes) is produced by [`digest`] or [`digest_concat`]. The two must agree
//! byte for byte with each other, so all preimage assembly happens here.
use alloy_primitives::B256;
use blake2::{digest::consts::U32, Blake2b, Digest};

/// blake2b parameterized to a 32-byte output.
type Blake2b256 = Blake2b<U32>;

/// Computes the blake2b-256 digest of `bytes`.
pub fn digest(bytes: &[u8]) -> B256 {
    B256::from_slice(&Blake2b256::digest(bytes))
}

/// Computes the blake2b-256 digest of the concatenation of `parts`.
///
/// Equivalent to digesting one contiguous buffer, without allocating it.
pub fn digest_concat<'a>(parts: impl IntoIterator<Item = &'a [u8]>) -> B256 {
    let mut hasher = Blake2b256::new();
    for part in parts {
        hasher.update(part);
    }
    B256::from_slice(&hasher.finalize())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::constant::DIGEST_LENGTH;

    #[test]
    fn digest_is_32_bytes_and_deterministic() {
        let d = digest(b"apple");
        assert_eq!(d.len(), DIGEST_LENGTH);
        assert_eq!(d, digest(b"apple"));
        assert_ne!(d, digest(b"apricot"));
    }

    #[test]
    fn concat_matches_contiguous_digest() {
        let contiguous = digest(b"hello world");
        assert_eq!(digest_concat([b"hello".as_slice(), b" world"]), contiguous);
        assert_eq!(
            digest_concat([b"hello ".as_slice(), b"", b"world"]),
            contiguous
        );
    }

    #[test]
    fn empty_input_is_hashable() {
        let no_parts: [&[u8]; 0] = [];
        assert_eq!(digest(&[]), digest_concat(no_parts));
    }
}
