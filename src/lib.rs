#![doc = include_str!("../README.md")]

pub mod constant;
pub mod hash;
pub mod merkle;
pub mod nibbles;
pub use nibbles::Nibbles;
pub mod traits;
pub use traits::Store;
pub mod mem_store;
pub use mem_store::MemStore;
pub mod trie;
pub use trie::{node::Node, trie::Trie, TrieError};
pub mod proof;
pub use proof::{Proof, ProofError, Step};

#[cfg(test)]
mod fuzz;

#[cfg(test)]
mod tests {
    use super::*;
    use crate::constant::NULL_HASH;

    #[test]
    /// A simple end-to-end test demonstrating the complete workflow.
    fn basic_integration_test() -> Result<(), Box<dyn std::error::Error>> {
        // Build a trie over an in-memory store.
        let store = MemStore::new();
        let mut trie = Trie::new(store);
        assert_eq!(trie.hash(), NULL_HASH);

        trie.insert(b"apple", b"red")?;
        trie.insert(b"apricot", b"orange")?;
        trie.insert(b"banana", b"yellow")?;
        let root = trie.hash();

        // Read values back.
        assert_eq!(trie.get(b"banana")?, Some(b"yellow".as_slice()));
        assert_eq!(trie.get(b"durian")?, None);

        // Alice proves membership of a pair; the proof travels as JSON.
        let proof = trie.prove(b"apple")?;
        let wire = serde_json::to_string(&proof.to_json()?)?;

        // Bob verifies against the root he trusts, without the trie.
        let received = Proof::from_json(b"apple", Some(b"red".to_vec()), serde_json::from_str(&wire)?)?;
        assert_eq!(received.verify(true)?, root);

        // The same proof doubles as a deletion check: without the element it
        // must reproduce the root of the remaining trie.
        let without_apple = received.verify(false)?;
        trie.delete(b"apple")?;
        assert_eq!(trie.hash(), without_apple);

        // Reopen the trie from its store by root hash alone.
        let mut reopened = Trie::open(trie.store().clone(), trie.hash())?;
        assert_eq!(reopened.size(), 2);
        assert_eq!(reopened.get(b"banana")?, Some(b"yellow".as_slice()));

        Ok(())
    }
}
