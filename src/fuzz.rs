//! End-to-end randomized checks of the forestry against a reference oracle.
//!
//! Drives long operation sequences over a bounded key pool and validates,
//! after every round:
//!
//! - **State consistency**: lookups, sizes, and rejected operations match a
//!   `BTreeMap` oracle;
//! - **Hash consistency**: the incrementally maintained root equals the root
//!   of a trie rebuilt from scratch from the oracle's contents;
//! - **Proof consistency**: a membership proof for a random present key
//!   verifies to the root with the element and to the root of the remainder
//!   without it, including after the trie is reopened from its store.
use crate::{constant::NULL_HASH, MemStore, Trie, TrieError};
use rand::{rngs::StdRng, Rng, SeedableRng};
use std::collections::BTreeMap;

/// A state modification picked by the fuzzer.
///
/// Operations reference keys via indices into a pre-generated pool, so the
/// sequence explores collisions (duplicate inserts, deletes of absent keys)
/// instead of wandering through an unbounded key space.
#[derive(Debug, Clone)]
enum Operation {
    Insert(usize),
    Delete(usize),
}

fn rebuild(oracle: &BTreeMap<Vec<u8>, Vec<u8>>) -> Trie<MemStore> {
    Trie::from_list(
        MemStore::new(),
        oracle.iter().map(|(k, v)| (k.clone(), v.clone())),
    )
    .expect("oracle keys are unique")
}

fn oracle_without(oracle: &BTreeMap<Vec<u8>, Vec<u8>>, key: &[u8]) -> Trie<MemStore> {
    Trie::from_list(
        MemStore::new(),
        oracle
            .iter()
            .filter(|(k, _)| k.as_slice() != key)
            .map(|(k, v)| (k.clone(), v.clone())),
    )
    .expect("oracle keys are unique")
}

fn e2e_oracle_test(seed: u64, rounds: usize) {
    const POOL_SIZE: usize = 24;
    let pool: Vec<Vec<u8>> = (0..POOL_SIZE)
        .map(|i| format!("key_{i:03x}").into_bytes())
        .collect();

    let mut rng = StdRng::seed_from_u64(seed);
    let mut trie = Trie::new(MemStore::new());
    let mut oracle: BTreeMap<Vec<u8>, Vec<u8>> = BTreeMap::new();

    for round in 0..rounds {
        let op = if rng.gen_bool(0.6) {
            Operation::Insert(rng.gen_range(0..POOL_SIZE))
        } else {
            Operation::Delete(rng.gen_range(0..POOL_SIZE))
        };

        let root_before = trie.hash();
        match op {
            Operation::Insert(i) => {
                let key = &pool[i];
                let value = format!("value_{round}").into_bytes();
                if oracle.contains_key(key) {
                    assert!(
                        matches!(trie.insert(key, &value), Err(TrieError::AlreadyPresent)),
                        "duplicate insert must be rejected"
                    );
                    assert_eq!(trie.hash(), root_before, "rejected insert must not mutate");
                } else {
                    trie.insert(key, &value).expect("fresh insert");
                    oracle.insert(key.clone(), value);
                }
            }
            Operation::Delete(i) => {
                let key = &pool[i];
                if oracle.remove(key).is_some() {
                    trie.delete(key).expect("present delete");
                } else {
                    assert!(
                        matches!(trie.delete(key), Err(TrieError::NotPresent)),
                        "absent delete must be rejected"
                    );
                    assert_eq!(trie.hash(), root_before, "rejected delete must not mutate");
                }
            }
        }

        // State consistency against the oracle.
        assert_eq!(trie.size(), oracle.len());
        assert_eq!(trie.is_empty(), oracle.is_empty());
        let probe = &pool[rng.gen_range(0..POOL_SIZE)];
        assert_eq!(
            trie.get(probe).expect("lookup"),
            oracle.get(probe).map(Vec::as_slice),
            "lookup mismatch for {probe:?}"
        );

        // Hash consistency: incremental maintenance equals from-scratch
        // construction over the same content.
        let root = trie.hash();
        assert_eq!(rebuild(&oracle).hash(), root, "round {round} root diverged");

        // Proof consistency for a random present key, in both modes.
        if let Some((key, value)) = oracle.iter().nth(rng.gen_range(0..oracle.len().max(1))) {
            let proof = trie.prove(key).expect("member must be provable");
            assert_eq!(proof.value(), Some(value.as_slice()));
            assert_eq!(proof.verify(true).expect("inclusion"), root);
            assert_eq!(
                proof.verify(false).expect("exclusion"),
                oracle_without(&oracle, key).hash(),
                "exclusion root for {key:?}"
            );
        }
    }

    // A trie reopened from the populated store is indistinguishable.
    let mut reopened = Trie::open(trie.store().clone(), trie.hash()).expect("reopen");
    assert_eq!(reopened.size(), oracle.len());
    for (key, value) in &oracle {
        assert_eq!(reopened.get(key).expect("lookup"), Some(value.as_slice()));
        let proof = reopened.prove(key).expect("provable after reopen");
        assert_eq!(proof.verify(true).expect("inclusion"), trie.hash());
    }

    // Drain everything: branch collapses must fold the trie back to the
    // null root and leave the store empty.
    let remaining: Vec<Vec<u8>> = oracle.keys().cloned().collect();
    for key in remaining {
        trie.delete(&key).expect("drain");
        oracle.remove(&key);
        assert_eq!(trie.size(), oracle.len());
    }
    assert!(trie.is_empty());
    assert_eq!(trie.hash(), NULL_HASH);
    assert_eq!(trie.store().len(), 0);
}

#[test]
fn oracle_run_small() {
    e2e_oracle_test(0xf0e57, 150);
}

#[test]
fn oracle_run_long() {
    // A different seed and enough rounds that most pool keys are inserted,
    // deleted, and reinserted with fresh values along the way.
    e2e_oracle_test(0xdead, 400);
}
