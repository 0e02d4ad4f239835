//! Constants that determine the shape of the forestry.
use alloy_primitives::B256;

/// Byte length of every digest produced by [`crate::hash::digest`].
pub const DIGEST_LENGTH: usize = 32;

/// Number of nibbles in a key path. Paths are the full hexadecimal
/// expansion of a digest, so this is always `2 * DIGEST_LENGTH`.
pub const PATH_LENGTH: usize = 2 * DIGEST_LENGTH;

/// Branch factor of the trie. One child slot per nibble value.
pub const TRIE_WIDTH: usize = 16;

/// Depth of the binary Merkle tree aggregating the children of a branch.
/// `2^MERKLE_DEPTH == TRIE_WIDTH`.
pub const MERKLE_DEPTH: usize = 4;

/// Hash of the empty trie, and the padding digest for empty Merkle slots.
pub const NULL_HASH: B256 = B256::ZERO;
