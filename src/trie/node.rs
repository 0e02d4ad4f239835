//! Trie node representation: leaves, branches, and child slots.
//!
//! Nodes are a tagged enum rather than anything dynamic: a structural change
//! (leaf split, branch collapse) replaces the variant through the parent's
//! child slot. Every node caches its own hash at construction, so rehashing
//! after a mutation is a matter of rebuilding the nodes along one path.
use crate::{
    constant::{NULL_HASH, TRIE_WIDTH},
    hash::{digest, digest_concat},
    merkle,
    nibbles::{self, Nibbles},
};
use alloy_primitives::B256;
use serde::{Deserialize, Serialize};

/// Hash of a leaf: the packed path suffix followed by the value digest.
pub fn leaf_hash(suffix: &[u8], value_hash: &B256) -> B256 {
    digest_concat([nibbles::pack(suffix).as_slice(), value_hash.as_slice()])
}

/// Hash of a branch: the packed prefix followed by the children Merkle root.
pub fn branch_hash(prefix: &[u8], merkle_root: &B256) -> B256 {
    digest_concat([nibbles::pack(prefix).as_slice(), merkle_root.as_slice()])
}

/// A node of the forestry.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum Node {
    /// Terminal node holding an actual key/value pair.
    Leaf(Leaf),
    /// Sixteen-way fork. Always has at least two occupied slots.
    Branch(Branch),
}

/// One of the sixteen child slots of a [`Branch`].
///
/// A slot is either vacant, an in-memory node, or an unresolved reference
/// into the store. References are what branches carry in their stored form;
/// descent materializes them back into nodes on demand. A reference still
/// knows its hash, so Merkle roots never require materialization.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum Child {
    #[default]
    Empty,
    Node(Box<Node>),
    Ref(B256),
}

/// Terminal node: the original key and value plus the path nibbles that were
/// still unconsumed when descent reached it.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Leaf {
    pub(crate) prefix: Nibbles,
    pub(crate) key: Vec<u8>,
    pub(crate) value: Vec<u8>,
    hash: B256,
}

/// Internal node: a shared prefix and a fixed 16-slot child frame. The slot
/// index is the nibble at which sub-paths diverge, so the frame is an array,
/// never a map.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Branch {
    pub(crate) prefix: Nibbles,
    pub(crate) children: Box<[Child; TRIE_WIDTH]>,
    pub(crate) size: usize,
    hash: B256,
}

impl Child {
    pub fn is_empty(&self) -> bool {
        matches!(self, Child::Empty)
    }

    /// Hash of the occupant, `None` for a vacant slot.
    pub fn hash(&self) -> Option<B256> {
        match self {
            Child::Empty => None,
            Child::Node(node) => Some(node.hash()),
            Child::Ref(hash) => Some(*hash),
        }
    }
}

impl Leaf {
    pub(crate) fn new(prefix: Nibbles, key: Vec<u8>, value: Vec<u8>) -> Self {
        let hash = leaf_hash(&prefix, &digest(&value));
        Self { prefix, key, value, hash }
    }

    pub fn hash(&self) -> B256 {
        self.hash
    }

    pub fn key(&self) -> &[u8] {
        &self.key
    }

    pub fn value(&self) -> &[u8] {
        &self.value
    }

    /// Rebuilds this leaf under a different suffix, rehashing.
    pub(crate) fn with_prefix(self, prefix: Nibbles) -> Self {
        Self::new(prefix, self.key, self.value)
    }
}

impl Branch {
    pub(crate) fn new(prefix: Nibbles, children: Box<[Child; TRIE_WIDTH]>, size: usize) -> Self {
        let mut branch = Self { prefix, children, size, hash: NULL_HASH };
        branch.rehash();
        branch
    }

    pub fn hash(&self) -> B256 {
        self.hash
    }

    /// Root of the Merkle tree over the child slots.
    pub fn merkle_root(&self) -> B256 {
        merkle::root(&self.child_hashes())
    }

    /// Child hashes in slot order, vacant slots as [`NULL_HASH`].
    pub fn child_hashes(&self) -> [B256; TRIE_WIDTH] {
        std::array::from_fn(|slot| self.children[slot].hash().unwrap_or(NULL_HASH))
    }

    /// Slots currently holding a child.
    pub(crate) fn occupied_slots(&self) -> impl Iterator<Item = u8> + '_ {
        self.children
            .iter()
            .enumerate()
            .filter(|(_, child)| !child.is_empty())
            .map(|(slot, _)| slot as u8)
    }

    /// Recomputes the cached hash after a slot or prefix change.
    pub(crate) fn rehash(&mut self) {
        debug_assert!(
            self.occupied_slots().count() >= 2,
            "branch must keep at least two children"
        );
        self.hash = branch_hash(&self.prefix, &self.merkle_root());
    }

    /// Rebuilds this branch under a different prefix, rehashing.
    pub(crate) fn with_prefix(self, prefix: Nibbles) -> Self {
        Self::new(prefix, self.children, self.size)
    }

    /// Stored form: children demoted to hash references. Cheap regardless of
    /// how much of the sub-trie is held in memory.
    pub(crate) fn to_stored(&self) -> Node {
        let children = std::array::from_fn(|slot| match self.children[slot].hash() {
            Some(hash) => Child::Ref(hash),
            None => Child::Empty,
        });
        Node::Branch(Branch {
            prefix: self.prefix.clone(),
            children: Box::new(children),
            size: self.size,
            hash: self.hash,
        })
    }
}

impl Node {
    pub(crate) fn leaf(prefix: Nibbles, key: Vec<u8>, value: Vec<u8>) -> Self {
        Node::Leaf(Leaf::new(prefix, key, value))
    }

    pub fn hash(&self) -> B256 {
        match self {
            Node::Leaf(leaf) => leaf.hash(),
            Node::Branch(branch) => branch.hash(),
        }
    }

    /// Number of key/value pairs under this node.
    pub fn size(&self) -> usize {
        match self {
            Node::Leaf(_) => 1,
            Node::Branch(branch) => branch.size,
        }
    }

    /// Path nibbles this node consumes below its parent's branch point.
    pub fn prefix(&self) -> &Nibbles {
        match self {
            Node::Leaf(leaf) => &leaf.prefix,
            Node::Branch(branch) => &branch.prefix,
        }
    }

    /// The form handed to the store: branches carry their children as hash
    /// references so every node is indexed exactly once.
    pub(crate) fn to_stored(&self) -> Node {
        match self {
            Node::Leaf(leaf) => Node::Leaf(leaf.clone()),
            Node::Branch(branch) => branch.to_stored(),
        }
    }
}

/// A key/value pair tagged with its full path, ready for batch construction.
pub(crate) type PathedItem = (Nibbles, Vec<u8>, Vec<u8>);

/// Builds a sub-trie from items whose paths agree on the first `depth`
/// nibbles. Items must carry pairwise distinct paths.
pub(crate) fn build_subtrie(items: Vec<PathedItem>, depth: usize) -> Child {
    match items.len() {
        0 => return Child::Empty,
        1 => {
            let (path, key, value) = items.into_iter().next().expect("one item");
            let prefix = Nibbles::from(&path[depth..]);
            return Child::Node(Box::new(Node::leaf(prefix, key, value)));
        }
        _ => {}
    }

    // Shared prefix of all remaining suffixes, then one bucket per nibble
    // right after it. At least two buckets are non-empty, by definition of
    // the shared prefix.
    let first = &items[0].0[depth..];
    let mut shared = first.len();
    for (path, _, _) in &items[1..] {
        shared = shared.min(nibbles::common_prefix_len(first, &path[depth..]));
    }
    debug_assert!(shared < first.len(), "duplicate paths in batch");
    let prefix = Nibbles::from(&items[0].0[depth..depth + shared]);

    let mut buckets: [Vec<PathedItem>; TRIE_WIDTH] = Default::default();
    let fork = depth + shared;
    for item in items {
        buckets[item.0[fork] as usize].push(item);
    }

    let size: usize = buckets.iter().map(Vec::len).sum();
    let children = std::array::from_fn(|slot| {
        build_subtrie(std::mem::take(&mut buckets[slot]), fork + 1)
    });
    Child::Node(Box::new(Node::Branch(Branch::new(
        prefix,
        Box::new(children),
        size,
    ))))
}
