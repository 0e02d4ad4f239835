//! The trie component of the forestry: node representation, mutation with
//! bottom-up rehashing, and proof generation by walking key paths.

pub mod display;
pub mod node;
#[allow(clippy::module_inception)]
pub mod trie;

use alloy_primitives::B256;
use std::fmt::Debug;
use thiserror::Error;

/// Errors from trie operations over a storage backend with error type `E`.
#[derive(Debug, Error)]
pub enum TrieError<E: Debug> {
    /// The key is already present; `insert` never overwrites.
    #[error("key already present in the trie")]
    AlreadyPresent,
    /// The key is not present in the trie.
    #[error("key not present in the trie")]
    NotPresent,
    /// A child reference pointed at a hash the store does not hold.
    #[error("node {0} missing from the store")]
    MissingNode(B256),
    /// The storage backend failed.
    #[error("storage backend error: {0:?}")]
    Store(E),
}
