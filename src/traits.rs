//! Storage trait consumed by the trie.
use crate::trie::node::Node;
use alloy_primitives::B256;
use std::fmt::Debug;

/// Content-addressed node storage.
///
/// The trie writes every node it creates under the node's own hash and
/// recalls nodes by hash while descending through unresolved child
/// references. Stored nodes are opaque to the backend: whatever is handed to
/// [`Store::set`] comes back verbatim from [`Store::get`].
///
/// The core assumes single-writer semantics; serializing concurrent
/// mutations is the caller's concern.
pub trait Store {
    /// Custom trait's error type.
    type Error: Debug + Send;

    /// Fetch the node indexed under `hash`, if any.
    fn get(&self, hash: &B256) -> Result<Option<Node>, Self::Error>;

    /// Index `node` under `hash`.
    fn set(&self, hash: B256, node: Node) -> Result<(), Self::Error>;

    /// Drop the entry indexed under `hash`. Unknown hashes are a no-op.
    fn delete(&self, hash: &B256) -> Result<(), Self::Error>;
}
