//! Sparse Merkle aggregation of the 16 children of a branch.
//!
//! A branch does not hash its children by concatenation; it folds them
//! through a balanced binary Merkle tree of depth [`MERKLE_DEPTH`], padding
//! empty slots with [`NULL_HASH`]. Membership of one child is then provable
//! with four sibling digests instead of fifteen child hashes, which is what
//! keeps proofs compact.
use crate::{
    constant::{MERKLE_DEPTH, NULL_HASH, TRIE_WIDTH},
    hash::digest_concat,
};
use alloy_primitives::B256;

/// Inner node: the digest of the two sub-roots, empty ones read as null.
fn h(left: B256, right: B256) -> B256 {
    digest_concat([left.as_slice(), right.as_slice()])
}

/// Root of the Merkle tree over all 16 slots.
pub fn root(children: &[B256; TRIE_WIDTH]) -> B256 {
    let mut level = children.to_vec();
    for _ in 0..MERKLE_DEPTH {
        level = level.chunks_exact(2).map(|pair| h(pair[0], pair[1])).collect();
    }
    level[0]
}

/// Root of a frame holding exactly two occupants.
///
/// Used when rebuilding a branch from a proof step that describes a single
/// neighbor: our own sub-root and the neighbor's digest are placed at their
/// slots and everything else stays null.
pub fn pair_root(slot_a: u8, a: B256, slot_b: u8, b: B256) -> B256 {
    debug_assert_ne!(slot_a, slot_b, "occupants share a slot");
    let mut frame = [NULL_HASH; TRIE_WIDTH];
    frame[slot_a as usize] = a;
    frame[slot_b as usize] = b;
    root(&frame)
}

/// The four sibling digests proving the occupant of `slot`, farthest level
/// first: `[0]` is the root of the opposite half, `[3]` the adjacent slot.
pub fn neighbors(children: &[B256; TRIE_WIDTH], slot: u8) -> [B256; 4] {
    let i = slot as usize;
    let l16 = children;
    let l8: [B256; 8] = std::array::from_fn(|k| h(l16[2 * k], l16[2 * k + 1]));
    let l4: [B256; 4] = std::array::from_fn(|k| h(l8[2 * k], l8[2 * k + 1]));
    let l2: [B256; 2] = std::array::from_fn(|k| h(l4[2 * k], l4[2 * k + 1]));
    [l2[(i >> 3) ^ 1], l4[(i >> 2) ^ 1], l8[(i >> 1) ^ 1], l16[i ^ 1]]
}

/// Recomputes the Merkle root from one slot's sub-root `m` and its four
/// sibling digests, spelled out per slot so each formula can be audited
/// against the tree layout.
pub fn proof_root(slot: u8, m: B256, neighbors: &[B256; 4]) -> B256 {
    let [l1, l2, l3, l4] = *neighbors;
    match slot {
        0x0 => h(h(h(h(m, l4), l3), l2), l1),
        0x1 => h(h(h(h(l4, m), l3), l2), l1),
        0x2 => h(h(h(l3, h(m, l4)), l2), l1),
        0x3 => h(h(h(l3, h(l4, m)), l2), l1),
        0x4 => h(h(l2, h(h(m, l4), l3)), l1),
        0x5 => h(h(l2, h(h(l4, m), l3)), l1),
        0x6 => h(h(l2, h(l3, h(m, l4))), l1),
        0x7 => h(h(l2, h(l3, h(l4, m))), l1),
        0x8 => h(l1, h(h(h(m, l4), l3), l2)),
        0x9 => h(l1, h(h(h(l4, m), l3), l2)),
        0xa => h(l1, h(h(l3, h(m, l4)), l2)),
        0xb => h(l1, h(h(l3, h(l4, m)), l2)),
        0xc => h(l1, h(l2, h(h(m, l4), l3))),
        0xd => h(l1, h(l2, h(h(l4, m), l3))),
        0xe => h(l1, h(l2, h(l3, h(m, l4)))),
        0xf => h(l1, h(l2, h(l3, h(l4, m)))),
        _ => unreachable!("slot out of range"),
    }
}
