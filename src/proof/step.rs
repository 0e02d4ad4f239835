//! Proof steps: per-branch neighbor evidence collected while walking a path.
use crate::{constant::DIGEST_LENGTH, nibbles::Nibbles};
use alloy_primitives::B256;
use serde::{de, Deserialize, Deserializer, Serialize, Serializer};

/// Evidence for one branch level along a proven path.
///
/// The serialized form tags variants with `"branch"`, `"fork"` and `"leaf"`
/// and carries digests as unprefixed lowercase hex. The string tags exist
/// strictly for interchange; in memory a step is only ever this enum.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum Step {
    /// The branch held two or more siblings besides us: the four sibling
    /// digests of our own slot in the sparse Merkle tree, farthest first.
    Branch {
        /// Length of the branch's prefix, not counting the branch nibble.
        skip: usize,
        #[serde(
            serialize_with = "serialize_neighbors",
            deserialize_with = "deserialize_neighbors"
        )]
        neighbors: [B256; 4],
    },
    /// Exactly one sibling and it is itself a branch.
    Fork {
        skip: usize,
        neighbor: ForkNeighbor,
    },
    /// Exactly one sibling and it is a leaf.
    Leaf {
        skip: usize,
        neighbor: LeafNeighbor,
    },
}

impl Step {
    /// Length of the step's branch prefix, excluding the branch nibble.
    pub fn skip(&self) -> usize {
        match self {
            Step::Branch { skip, .. } | Step::Fork { skip, .. } | Step::Leaf { skip, .. } => *skip,
        }
    }
}

/// A lone branch sibling, described by position and identity instead of a
/// mostly-null Merkle path.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ForkNeighbor {
    /// Slot the neighbor occupies at the shared branch.
    pub nibble: u8,
    /// The neighbor's own prefix nibbles. Kept as nibbles end to end: one
    /// hex character each on the wire, so odd lengths survive.
    pub prefix: Nibbles,
    /// Merkle root over the neighbor's children.
    #[serde(serialize_with = "serialize_hash", deserialize_with = "deserialize_hash")]
    pub root: B256,
}

/// A lone leaf sibling. Its position and suffix are recoverable from the
/// key digest, so that and the value digest describe it completely.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct LeafNeighbor {
    /// Digest of the neighbor's key; its hex expansion is the neighbor's
    /// full path.
    #[serde(serialize_with = "serialize_hash", deserialize_with = "deserialize_hash")]
    pub key: B256,
    /// Digest of the neighbor's value.
    #[serde(serialize_with = "serialize_hash", deserialize_with = "deserialize_hash")]
    pub value: B256,
}

fn serialize_hash<S: Serializer>(hash: &B256, serializer: S) -> Result<S::Ok, S::Error> {
    serializer.serialize_str(&hex::encode(hash))
}

fn deserialize_hash<'de, D: Deserializer<'de>>(deserializer: D) -> Result<B256, D::Error> {
    let text = String::deserialize(deserializer)?;
    let bytes = hex::decode(&text).map_err(de::Error::custom)?;
    if bytes.len() != DIGEST_LENGTH {
        return Err(de::Error::custom(format!(
            "expected {DIGEST_LENGTH} digest bytes, got {}",
            bytes.len()
        )));
    }
    Ok(B256::from_slice(&bytes))
}

fn serialize_neighbors<S: Serializer>(
    neighbors: &[B256; 4],
    serializer: S,
) -> Result<S::Ok, S::Error> {
    let mut bytes = Vec::with_capacity(4 * DIGEST_LENGTH);
    for neighbor in neighbors {
        bytes.extend_from_slice(neighbor.as_slice());
    }
    serializer.serialize_str(&hex::encode(bytes))
}

fn deserialize_neighbors<'de, D: Deserializer<'de>>(
    deserializer: D,
) -> Result<[B256; 4], D::Error> {
    let text = String::deserialize(deserializer)?;
    let bytes = hex::decode(&text).map_err(de::Error::custom)?;
    if bytes.len() != 4 * DIGEST_LENGTH {
        return Err(de::Error::custom(format!(
            "expected {} neighbor bytes, got {}",
            4 * DIGEST_LENGTH,
            bytes.len()
        )));
    }
    Ok(std::array::from_fn(|i| {
        B256::from_slice(&bytes[i * DIGEST_LENGTH..(i + 1) * DIGEST_LENGTH])
    }))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::hash::digest;

    #[test]
    fn branch_step_serializes_neighbors_as_one_hex_run() {
        let step = Step::Branch {
            skip: 3,
            neighbors: std::array::from_fn(|i| digest(&[i as u8])),
        };
        let json = serde_json::to_value(&step).unwrap();
        assert_eq!(json["type"], "branch");
        assert_eq!(json["skip"], 3);
        let neighbors = json["neighbors"].as_str().unwrap();
        assert_eq!(neighbors.len(), 2 * 4 * DIGEST_LENGTH);
        assert!(neighbors.starts_with(&hex::encode(digest(&[0u8]))));

        assert_eq!(serde_json::from_value::<Step>(json).unwrap(), step);
    }

    #[test]
    fn fork_step_keeps_odd_prefixes_intact() {
        let step = Step::Fork {
            skip: 0,
            neighbor: ForkNeighbor {
                nibble: 0xc,
                prefix: Nibbles::new(vec![0x0, 0xa, 0xb]),
                root: digest(b"subtree"),
            },
        };
        let json = serde_json::to_value(&step).unwrap();
        assert_eq!(json["type"], "fork");
        assert_eq!(json["neighbor"]["nibble"], 0xc);
        assert_eq!(json["neighbor"]["prefix"], "0ab");

        assert_eq!(serde_json::from_value::<Step>(json).unwrap(), step);
    }

    #[test]
    fn leaf_step_carries_key_and_value_digests() {
        let step = Step::Leaf {
            skip: 7,
            neighbor: LeafNeighbor {
                key: digest(b"apricot"),
                value: digest(b"B"),
            },
        };
        let json = serde_json::to_value(&step).unwrap();
        assert_eq!(json["type"], "leaf");
        assert_eq!(json["neighbor"]["key"], hex::encode(digest(b"apricot")));
        assert_eq!(json["neighbor"]["value"], hex::encode(digest(b"B")));

        assert_eq!(serde_json::from_value::<Step>(json).unwrap(), step);
    }

    #[test]
    fn malformed_hex_is_rejected() {
        let truncated = serde_json::json!({
            "type": "leaf",
            "skip": 0,
            "neighbor": { "key": "abcd", "value": hex::encode(digest(b"v")) },
        });
        assert!(serde_json::from_value::<Step>(truncated).is_err());

        let bad_neighbors = serde_json::json!({
            "type": "branch",
            "skip": 0,
            "neighbors": "zz",
        });
        assert!(serde_json::from_value::<Step>(bad_neighbors).is_err());
    }
}
