//! In-memory storage backend for the forestry.
//!
//! This module provides [`MemStore`], a simple in-memory backend
//! implementing the [`Store`] trait over a hash-indexed node map.
//!
//! # Note
//!
//! `MemStore` is not an implementation of the forestry itself, only the
//! key-value storage underneath it. The trie logic lives in the `trie` and
//! `proof` modules and works against any [`Store`].
//!
//! # Usage
//!
//! `MemStore` is primarily intended for unit and integration testing,
//! development, and as a reference implementation of the storage trait. For
//! durability, back the trait with a database instead.
//!
//! # Thread Safety
//!
//! All operations are thread-safe through the use of [`RwLock`] for
//! interior mutability.
use crate::{traits::Store, trie::node::Node};
use alloy_primitives::B256;
use rustc_hash::FxHashMap;
use std::{convert::Infallible, sync::RwLock};

/// In-memory [`Store`] backend.
///
/// Nodes are kept in an [`FxHashMap`] keyed by their content hash; the keys
/// are already uniformly distributed digests, so no further hashing quality
/// is needed from the map.
#[derive(Debug, Default)]
pub struct MemStore {
    nodes: RwLock<FxHashMap<B256, Node>>,
}

impl Clone for MemStore {
    fn clone(&self) -> Self {
        Self {
            nodes: RwLock::new(self.nodes.read().expect("store lock poisoned").clone()),
        }
    }
}

impl MemStore {
    /// Creates a new empty `MemStore`.
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of nodes currently indexed.
    pub fn len(&self) -> usize {
        self.nodes.read().expect("store lock poisoned").len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Whether a node is indexed under `hash`.
    pub fn contains(&self, hash: &B256) -> bool {
        self.nodes
            .read()
            .expect("store lock poisoned")
            .contains_key(hash)
    }
}

impl Store for MemStore {
    type Error = Infallible;

    fn get(&self, hash: &B256) -> Result<Option<Node>, Self::Error> {
        Ok(self
            .nodes
            .read()
            .expect("store lock poisoned")
            .get(hash)
            .cloned())
    }

    fn set(&self, hash: B256, node: Node) -> Result<(), Self::Error> {
        self.nodes
            .write()
            .expect("store lock poisoned")
            .insert(hash, node);
        Ok(())
    }

    fn delete(&self, hash: &B256) -> Result<(), Self::Error> {
        self.nodes
            .write()
            .expect("store lock poisoned")
            .remove(hash);
        Ok(())
    }
}
