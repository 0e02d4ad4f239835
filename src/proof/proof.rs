//! Membership proofs and their dual-mode verification.
use crate::{
    constant::NULL_HASH,
    hash::digest,
    merkle,
    nibbles::Nibbles,
    proof::{ProofError, Step},
    trie::node::{branch_hash, leaf_hash},
};
use alloy_primitives::B256;

/// A compact proof about one key.
///
/// Produced by walking a trie; consumed by verifiers holding nothing but a
/// root digest. [`Proof::verify`] recomputes a root in one of two modes and
/// the caller compares it against the root it trusts:
///
/// - `verify(true)`: the root of the trie *containing* `(key, value)`;
/// - `verify(false)`: the root of the trie *without* the key.
///
/// Checking an insertion (or, reversed, a deletion) of `(key, value)` takes
/// one proof against the post-insert trie: `verify(false)` must equal the
/// old root and `verify(true)` the new one.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Proof {
    /// Full path of the proven key.
    path: Nibbles,
    /// The proven value, when the proof was produced over a trie that
    /// contains the key.
    value: Option<Vec<u8>>,
    /// Neighbor evidence, outermost branch first.
    steps: Vec<Step>,
}

impl Proof {
    pub(crate) fn new(path: Nibbles, value: Option<Vec<u8>>, steps: Vec<Step>) -> Self {
        Self { path, value, steps }
    }

    /// Assembles a proof received from elsewhere: the proven key, the value
    /// claimed for it (if any), and the steps.
    pub fn from_parts(key: &[u8], value: Option<Vec<u8>>, steps: Vec<Step>) -> Self {
        Self::new(Nibbles::key_path(key), value, steps)
    }

    /// Reassembles a proof from its JSON step list.
    pub fn from_json(
        key: &[u8],
        value: Option<Vec<u8>>,
        steps: serde_json::Value,
    ) -> serde_json::Result<Self> {
        Ok(Self::from_parts(key, value, serde_json::from_value(steps)?))
    }

    /// The step list in its interchange form.
    pub fn to_json(&self) -> serde_json::Result<serde_json::Value> {
        serde_json::to_value(&self.steps)
    }

    pub fn steps(&self) -> &[Step] {
        &self.steps
    }

    /// The value carried in the proof payload, if any.
    pub fn value(&self) -> Option<&[u8]> {
        self.value.as_deref()
    }

    /// Recomputes the root this proof commits to.
    ///
    /// With `with_element`, the proven pair is folded in at the end of the
    /// path and the result is the root of the trie that contains it. Without
    /// it, the innermost step collapses as if the key had never been
    /// inserted, and the result is the root of the trie without the key. In
    /// particular, a proof with no steps verifies to [`NULL_HASH`], the
    /// empty trie.
    pub fn verify(&self, with_element: bool) -> Result<B256, ProofError> {
        Ok(self.rewind(0, 0, with_element)?.unwrap_or(NULL_HASH))
    }

    /// Rebuilds the sub-root at `cursor` from the steps at `index..`.
    ///
    /// Returns `None` only past the innermost step of an exclusion proof,
    /// where the proven leaf would have been.
    fn rewind(
        &self,
        cursor: usize,
        index: usize,
        with_element: bool,
    ) -> Result<Option<B256>, ProofError> {
        let Some(step) = self.steps.get(index) else {
            if !with_element {
                return Ok(None);
            }
            let value = self.value.as_ref().ok_or(ProofError::MissingValue)?;
            return Ok(Some(leaf_hash(&self.path[cursor..], &digest(value))));
        };
        let is_last = index + 1 == self.steps.len();
        let next_cursor = cursor
            .checked_add(step.skip())
            .and_then(|c| c.checked_add(1))
            .filter(|c| *c <= self.path.len())
            .ok_or(ProofError::PathOverrun { cursor })?;

        let me = self.rewind(next_cursor, index + 1, with_element)?;
        let prefix = &self.path[cursor..next_cursor - 1];
        let branch_nibble = self.path[next_cursor - 1];

        match step {
            Step::Branch { neighbors, .. } => {
                let root = merkle::proof_root(branch_nibble, me.unwrap_or(NULL_HASH), neighbors);
                Ok(Some(branch_hash(prefix, &root)))
            }
            Step::Fork { neighbor, .. } => {
                if neighbor.nibble >= 16 {
                    return Err(ProofError::InvalidNibble { nibble: neighbor.nibble });
                }
                if !with_element && is_last {
                    // The branch loses our leaf and collapses: the neighbor
                    // absorbs the skipped nibbles and its branch nibble, and
                    // its own hash becomes the sub-root here.
                    let mut collapsed = Nibbles::from(prefix);
                    collapsed.push(neighbor.nibble);
                    collapsed.extend_from_slice(&neighbor.prefix);
                    return Ok(Some(branch_hash(&collapsed, &neighbor.root)));
                }
                if neighbor.nibble == branch_nibble {
                    return Err(ProofError::NeighborClash { nibble: neighbor.nibble });
                }
                // `me` is absent only at the innermost step of an exclusion
                // proof, which the arm above already handled.
                let me = me.unwrap_or(NULL_HASH);
                let neighbor_value = branch_hash(&neighbor.prefix, &neighbor.root);
                let root = merkle::pair_root(branch_nibble, me, neighbor.nibble, neighbor_value);
                Ok(Some(branch_hash(prefix, &root)))
            }
            Step::Leaf { neighbor, .. } => {
                let neighbor_path = Nibbles::unpack(neighbor.key.as_slice());
                if neighbor_path[..cursor] != self.path[..cursor] {
                    return Err(ProofError::DivergentNeighbor);
                }
                if !with_element && is_last {
                    // Without our leaf the branch collapses into the
                    // neighbor leaf, whose suffix then reaches back to the
                    // current cursor.
                    return Ok(Some(leaf_hash(&neighbor_path[cursor..], &neighbor.value)));
                }
                let neighbor_nibble = neighbor_path[next_cursor - 1];
                if neighbor_nibble == branch_nibble {
                    return Err(ProofError::NeighborClash { nibble: neighbor_nibble });
                }
                let me = me.unwrap_or(NULL_HASH);
                let neighbor_leaf = leaf_hash(&neighbor_path[next_cursor..], &neighbor.value);
                let root = merkle::pair_root(branch_nibble, me, neighbor_nibble, neighbor_leaf);
                Ok(Some(branch_hash(prefix, &root)))
            }
        }
    }
}
