//! The forestry trie over a content-addressed store.
//!
//! All mutation is in place through the tagged [`Node`] representation:
//! descent materializes unresolved child references from the store, the
//! change happens at the terminal node, and the unwind rehashes every
//! ancestor. Store writes are collected along the way and issued only after
//! the whole operation has succeeded, children strictly before parents, as a
//! `delete(old_hash)` / `set(new_hash)` pair per rehashed node.
use crate::{
    constant::{NULL_HASH, TRIE_WIDTH},
    hash::digest,
    merkle,
    mem_store::MemStore,
    nibbles::{self, Nibbles},
    proof::{ForkNeighbor, LeafNeighbor, Proof, Step},
    traits::Store,
    trie::{
        node::{self, Branch, Child, Leaf, Node, PathedItem},
        TrieError,
    },
};
use alloy_primitives::B256;

/// An authenticated key/value trie.
///
/// Keys are located by the hex expansion of their digest, values are stored
/// at the leaves. The root hash commits to the entire content; the empty
/// trie is [`NULL_HASH`].
#[derive(Debug)]
pub struct Trie<S = MemStore> {
    store: S,
    root: Option<Node>,
}

/// A pending store write, recorded bottom-up during mutation.
enum StoreOp {
    Delete(B256),
    Set(B256, Node),
}

/// Outcome of removing a key from a sub-trie.
enum Removal {
    /// The node itself was the removed leaf; the caller clears its slot.
    Detach,
    /// The node absorbed the removal and has already rehashed.
    Updated,
}

impl<S: Store> Trie<S> {
    /// Creates an empty trie over `store`.
    pub fn new(store: S) -> Self {
        Self { store, root: None }
    }

    /// Builds a trie from a batch of key/value pairs by recursive
    /// common-prefix factoring, then indexes every node in the store.
    ///
    /// The result is identical, hash for hash, to inserting the pairs one at
    /// a time in any order. Duplicate keys are rejected with
    /// [`TrieError::AlreadyPresent`].
    pub fn from_list<K, V, I>(store: S, pairs: I) -> Result<Self, TrieError<S::Error>>
    where
        I: IntoIterator<Item = (K, V)>,
        K: AsRef<[u8]>,
        V: AsRef<[u8]>,
    {
        let mut items: Vec<PathedItem> = pairs
            .into_iter()
            .map(|(key, value)| {
                let key = key.as_ref().to_vec();
                let value = value.as_ref().to_vec();
                (Nibbles::key_path(&key), key, value)
            })
            .collect();
        items.sort_by(|a, b| a.0.cmp(&b.0));
        if items.windows(2).any(|pair| pair[0].0 == pair[1].0) {
            return Err(TrieError::AlreadyPresent);
        }

        let root = match node::build_subtrie(items, 0) {
            Child::Node(root) => Some(*root),
            _ => None,
        };
        let trie = Self { store, root };
        let mut ops = Vec::new();
        if let Some(root) = &trie.root {
            collect_sets(root, &mut ops);
        }
        trie.apply(ops)?;
        Ok(trie)
    }

    /// Rehydrates a trie from a populated store by its root hash.
    ///
    /// The root node is fetched eagerly; descendants stay unresolved
    /// references until an operation walks through them.
    pub fn open(store: S, root: B256) -> Result<Self, TrieError<S::Error>> {
        if root == NULL_HASH {
            return Ok(Self::new(store));
        }
        let node = store
            .get(&root)
            .map_err(TrieError::Store)?
            .ok_or(TrieError::MissingNode(root))?;
        Ok(Self { store, root: Some(node) })
    }

    /// Inserts a key/value pair, rehashing every ancestor of the change.
    ///
    /// Fails with [`TrieError::AlreadyPresent`] if the key's path is already
    /// bound, leaving the trie and the store untouched.
    pub fn insert(&mut self, key: &[u8], value: &[u8]) -> Result<(), TrieError<S::Error>> {
        let path = Nibbles::key_path(key);
        let mut ops = Vec::new();
        match self.root {
            Some(ref mut root) => insert_at(&self.store, root, &path, 0, key, value, &mut ops)?,
            None => {
                let leaf = Node::leaf(path, key.to_vec(), value.to_vec());
                ops.push(StoreOp::Set(leaf.hash(), leaf.to_stored()));
                self.root = Some(leaf);
            }
        }
        self.apply(ops)
    }

    /// Removes a key, restoring branch minimality on the way up: a branch
    /// left with a single child collapses into that child.
    ///
    /// Fails with [`TrieError::NotPresent`] if the key is absent, leaving
    /// the trie and the store untouched.
    pub fn delete(&mut self, key: &[u8]) -> Result<(), TrieError<S::Error>> {
        let path = Nibbles::key_path(key);
        let mut ops = Vec::new();
        let root = self.root.as_mut().ok_or(TrieError::NotPresent)?;
        if let Removal::Detach = remove_at(&self.store, root, &path, 0, &mut ops)? {
            self.root = None;
        }
        self.apply(ops)
    }

    /// Looks up the value bound to `key`. Absent keys are `Ok(None)`.
    pub fn get(&mut self, key: &[u8]) -> Result<Option<&[u8]>, TrieError<S::Error>> {
        let path = Nibbles::key_path(key);
        match self.root.as_mut() {
            None => Ok(None),
            Some(root) => {
                Ok(lookup_at(&self.store, root, &path, 0)?.map(|leaf| leaf.value()))
            }
        }
    }

    /// Produces a membership proof for `key`.
    ///
    /// Fails with [`TrieError::NotPresent`] if the key is absent.
    pub fn prove(&mut self, key: &[u8]) -> Result<Proof, TrieError<S::Error>> {
        let path = Nibbles::key_path(key);
        let root = self.root.as_mut().ok_or(TrieError::NotPresent)?;
        let mut steps = Vec::new();
        let value = walk(&self.store, root, &path, 0, &mut steps)?;
        Ok(Proof::new(path, Some(value), steps))
    }

    /// The sub-trie anchored at an explicit nibble path, if any.
    pub fn child_at(&mut self, nibbles: &[u8]) -> Result<Option<&Node>, TrieError<S::Error>> {
        match self.root.as_mut() {
            None => Ok(None),
            Some(root) => child_at_node(&self.store, root, nibbles),
        }
    }

    /// Flushes recorded writes. Called only once an operation has fully
    /// succeeded in memory, so a failing backend never observes a
    /// half-mutated trie.
    fn apply(&self, ops: Vec<StoreOp>) -> Result<(), TrieError<S::Error>> {
        for op in ops {
            match op {
                StoreOp::Delete(hash) => self.store.delete(&hash).map_err(TrieError::Store)?,
                StoreOp::Set(hash, node) => {
                    self.store.set(hash, node).map_err(TrieError::Store)?
                }
            }
        }
        Ok(())
    }
}

impl<S> Trie<S> {
    /// Root digest committing to the whole content.
    pub fn hash(&self) -> B256 {
        self.root.as_ref().map(Node::hash).unwrap_or(NULL_HASH)
    }

    /// Number of key/value pairs.
    pub fn size(&self) -> usize {
        self.root.as_ref().map(Node::size).unwrap_or(0)
    }

    pub fn is_empty(&self) -> bool {
        self.root.is_none()
    }

    /// The storage backend this trie reads and writes.
    pub fn store(&self) -> &S {
        &self.store
    }

    /// The root node, if the trie is non-empty.
    pub fn root(&self) -> Option<&Node> {
        self.root.as_ref()
    }
}

impl Default for Trie<MemStore> {
    fn default() -> Self {
        Self::new(MemStore::new())
    }
}

/// Resolves a child slot to its node, loading a reference from the store if
/// needed. `None` means the slot is vacant.
fn materialize<'a, S: Store>(
    store: &S,
    child: &'a mut Child,
) -> Result<Option<&'a mut Node>, TrieError<S::Error>> {
    if let Child::Ref(hash) = child {
        let hash = *hash;
        let node = store
            .get(&hash)
            .map_err(TrieError::Store)?
            .ok_or(TrieError::MissingNode(hash))?;
        *child = Child::Node(Box::new(node));
    }
    match child {
        Child::Empty => Ok(None),
        Child::Node(node) => Ok(Some(node)),
        Child::Ref(_) => unreachable!("reference was just resolved"),
    }
}

/// Records `set` operations for every in-memory node of a freshly built
/// sub-trie, children before parents.
fn collect_sets(node: &Node, ops: &mut Vec<StoreOp>) {
    if let Node::Branch(branch) = node {
        for child in branch.children.iter() {
            if let Child::Node(child) = child {
                collect_sets(child, ops);
            }
        }
    }
    ops.push(StoreOp::Set(node.hash(), node.to_stored()));
}

fn insert_at<S: Store>(
    store: &S,
    node: &mut Node,
    path: &Nibbles,
    depth: usize,
    key: &[u8],
    value: &[u8],
    ops: &mut Vec<StoreOp>,
) -> Result<(), TrieError<S::Error>> {
    let suffix = &path[depth..];
    match node {
        Node::Leaf(leaf) => {
            let shared = nibbles::common_prefix_len(&leaf.prefix, suffix);
            if shared == leaf.prefix.len() {
                // Suffixes have equal length, so a full match means the same
                // 64-nibble path: the key is already bound.
                return Err(TrieError::AlreadyPresent);
            }

            // Split: push the existing leaf one level down and branch on the
            // first nibble past the shared run.
            let old_hash = leaf.hash();
            let old_slot = leaf.prefix[shared];
            let new_slot = suffix[shared];
            let moved = Leaf::new(
                Nibbles::from(&leaf.prefix[shared + 1..]),
                std::mem::take(&mut leaf.key),
                std::mem::take(&mut leaf.value),
            );
            let added = Node::leaf(
                Nibbles::from(&suffix[shared + 1..]),
                key.to_vec(),
                value.to_vec(),
            );
            let moved = Node::Leaf(moved);
            ops.push(StoreOp::Delete(old_hash));
            ops.push(StoreOp::Set(moved.hash(), moved.to_stored()));
            ops.push(StoreOp::Set(added.hash(), added.to_stored()));

            let mut frame: [Child; TRIE_WIDTH] = Default::default();
            frame[old_slot as usize] = Child::Node(Box::new(moved));
            frame[new_slot as usize] = Child::Node(Box::new(added));
            *node = Node::Branch(Branch::new(
                Nibbles::from(&suffix[..shared]),
                Box::new(frame),
                2,
            ));
            ops.push(StoreOp::Set(node.hash(), node.to_stored()));
            Ok(())
        }
        Node::Branch(branch) => {
            let shared = nibbles::common_prefix_len(&branch.prefix, suffix);
            if shared < branch.prefix.len() {
                // Split: the new path diverges inside this branch's prefix,
                // so the whole branch moves one level down.
                let old_hash = branch.hash();
                let old_slot = branch.prefix[shared];
                let new_slot = suffix[shared];
                let size = branch.size;
                let moved_prefix = Nibbles::from(&branch.prefix[shared + 1..]);
                let children =
                    std::mem::replace(&mut branch.children, Box::new(Default::default()));
                let moved = Node::Branch(Branch::new(moved_prefix, children, size));
                let added = Node::leaf(
                    Nibbles::from(&suffix[shared + 1..]),
                    key.to_vec(),
                    value.to_vec(),
                );
                ops.push(StoreOp::Delete(old_hash));
                ops.push(StoreOp::Set(moved.hash(), moved.to_stored()));
                ops.push(StoreOp::Set(added.hash(), added.to_stored()));

                let mut frame: [Child; TRIE_WIDTH] = Default::default();
                frame[old_slot as usize] = Child::Node(Box::new(moved));
                frame[new_slot as usize] = Child::Node(Box::new(added));
                *node = Node::Branch(Branch::new(
                    Nibbles::from(&suffix[..shared]),
                    Box::new(frame),
                    size + 1,
                ));
                ops.push(StoreOp::Set(node.hash(), node.to_stored()));
                return Ok(());
            }

            // Descend one nibble past the prefix.
            let slot = suffix[shared] as usize;
            let child_depth = depth + shared + 1;
            let old_hash = branch.hash();
            if branch.children[slot].is_empty() {
                let added = Node::leaf(
                    Nibbles::from(&path[child_depth..]),
                    key.to_vec(),
                    value.to_vec(),
                );
                ops.push(StoreOp::Set(added.hash(), added.to_stored()));
                branch.children[slot] = Child::Node(Box::new(added));
            } else {
                let Some(child) = materialize(store, &mut branch.children[slot])? else {
                    unreachable!("slot checked occupied");
                };
                insert_at(store, child, path, child_depth, key, value, ops)?;
            }
            branch.size += 1;
            branch.rehash();
            ops.push(StoreOp::Delete(old_hash));
            ops.push(StoreOp::Set(branch.hash(), branch.to_stored()));
            Ok(())
        }
    }
}

fn remove_at<S: Store>(
    store: &S,
    node: &mut Node,
    path: &Nibbles,
    depth: usize,
    ops: &mut Vec<StoreOp>,
) -> Result<Removal, TrieError<S::Error>> {
    match node {
        Node::Leaf(leaf) => {
            if *leaf.prefix == path[depth..] {
                ops.push(StoreOp::Delete(leaf.hash()));
                Ok(Removal::Detach)
            } else {
                Err(TrieError::NotPresent)
            }
        }
        Node::Branch(branch) => {
            let suffix = &path[depth..];
            let shared = nibbles::common_prefix_len(&branch.prefix, suffix);
            if shared < branch.prefix.len() {
                return Err(TrieError::NotPresent);
            }
            let slot = suffix[shared] as usize;
            let child_depth = depth + shared + 1;

            // If this branch could drop to a single child, load that child
            // now: a collapse needs its prefix, and all store reads must
            // precede the first mutation.
            let occupied: Vec<usize> = branch.occupied_slots().map(usize::from).collect();
            if let [a, b] = occupied[..] {
                let other = if a == slot { b } else { a };
                materialize(store, &mut branch.children[other])?;
            }

            let old_hash = branch.hash();
            let removal = match materialize(store, &mut branch.children[slot])? {
                None => return Err(TrieError::NotPresent),
                Some(child) => remove_at(store, child, path, child_depth, ops)?,
            };
            if let Removal::Detach = removal {
                branch.children[slot] = Child::Empty;
            }
            branch.size -= 1;
            ops.push(StoreOp::Delete(old_hash));

            let occupied: Vec<usize> = branch.occupied_slots().map(usize::from).collect();
            if let [survivor_slot] = occupied[..] {
                // Collapse: the surviving child absorbs this branch's prefix
                // and its own branch nibble.
                let Child::Node(survivor) = std::mem::take(&mut branch.children[survivor_slot])
                else {
                    unreachable!("survivor was materialized before the removal");
                };
                let mut prefix = branch.prefix.clone();
                prefix.push(survivor_slot as u8);
                prefix.extend_from_slice(survivor.prefix());
                ops.push(StoreOp::Delete(survivor.hash()));
                let merged = match *survivor {
                    Node::Leaf(leaf) => Node::Leaf(leaf.with_prefix(prefix)),
                    Node::Branch(sub) => Node::Branch(sub.with_prefix(prefix)),
                };
                ops.push(StoreOp::Set(merged.hash(), merged.to_stored()));
                *node = merged;
            } else {
                branch.rehash();
                ops.push(StoreOp::Set(branch.hash(), branch.to_stored()));
            }
            Ok(Removal::Updated)
        }
    }
}

fn lookup_at<'a, S: Store>(
    store: &S,
    node: &'a mut Node,
    path: &Nibbles,
    depth: usize,
) -> Result<Option<&'a Leaf>, TrieError<S::Error>> {
    match node {
        Node::Leaf(leaf) => Ok((*leaf.prefix == path[depth..]).then_some(&*leaf)),
        Node::Branch(branch) => {
            let suffix = &path[depth..];
            let shared = nibbles::common_prefix_len(&branch.prefix, suffix);
            if shared < branch.prefix.len() {
                return Ok(None);
            }
            let slot = suffix[shared] as usize;
            match materialize(store, &mut branch.children[slot])? {
                None => Ok(None),
                Some(child) => lookup_at(store, child, path, depth + shared + 1),
            }
        }
    }
}

/// Descends along `path` collecting one proof step per branch, outermost
/// first, and returns the terminal leaf's value.
fn walk<S: Store>(
    store: &S,
    node: &mut Node,
    path: &Nibbles,
    depth: usize,
    steps: &mut Vec<Step>,
) -> Result<Vec<u8>, TrieError<S::Error>> {
    let suffix = &path[depth..];
    match node {
        Node::Leaf(leaf) => {
            if *leaf.prefix == *suffix {
                Ok(leaf.value.clone())
            } else {
                Err(TrieError::NotPresent)
            }
        }
        Node::Branch(branch) => {
            let shared = nibbles::common_prefix_len(&branch.prefix, suffix);
            if shared < branch.prefix.len() {
                return Err(TrieError::NotPresent);
            }
            let slot = suffix[shared];

            // Summarize the siblings at this level. A lone sibling is spelled
            // out (its own Merkle path would mostly be null padding); anything
            // more gets the four sibling digests of our slot.
            let siblings: Vec<u8> = branch.occupied_slots().filter(|s| *s != slot).collect();
            let step = if let [sibling_slot] = siblings[..] {
                let Some(sibling) = materialize(store, &mut branch.children[sibling_slot as usize])?
                else {
                    unreachable!("sibling slot is occupied");
                };
                match sibling {
                    Node::Leaf(leaf) => Step::Leaf {
                        skip: shared,
                        neighbor: LeafNeighbor {
                            key: digest(&leaf.key),
                            value: digest(&leaf.value),
                        },
                    },
                    Node::Branch(sibling) => Step::Fork {
                        skip: shared,
                        neighbor: ForkNeighbor {
                            nibble: sibling_slot,
                            prefix: sibling.prefix.clone(),
                            root: sibling.merkle_root(),
                        },
                    },
                }
            } else {
                Step::Branch {
                    skip: shared,
                    neighbors: merkle::neighbors(&branch.child_hashes(), slot),
                }
            };
            steps.push(step);

            match materialize(store, &mut branch.children[slot as usize])? {
                None => Err(TrieError::NotPresent),
                Some(child) => walk(store, child, path, depth + shared + 1, steps),
            }
        }
    }
}

fn child_at_node<'a, S: Store>(
    store: &S,
    node: &'a mut Node,
    target: &[u8],
) -> Result<Option<&'a Node>, TrieError<S::Error>> {
    let plen = {
        let prefix = node.prefix();
        if target.len() <= prefix.len() {
            return Ok(prefix.starts_with(target).then_some(&*node));
        }
        if !target.starts_with(prefix) {
            return Ok(None);
        }
        prefix.len()
    };
    let slot = target[plen] as usize;
    let rest = &target[plen + 1..];
    match node {
        Node::Leaf(_) => Ok(None),
        Node::Branch(branch) => match materialize(store, &mut branch.children[slot])? {
            None => Ok(None),
            Some(child) => child_at_node(store, child, rest),
        },
    }
}
