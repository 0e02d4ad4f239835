//! Nibble path utilities.
//!
//! Keys are located in the trie by their *path*: the digest of the key
//! expanded to one nibble (4-bit value) per hexadecimal digit, always
//! [`PATH_LENGTH`] nibbles long. Node prefixes are shorter runs of the same
//! alphabet. [`Nibbles`] owns such a run; the free functions operate on raw
//! nibble slices so hashing code can work on sub-ranges without copying.
use crate::{
    constant::PATH_LENGTH,
    hash::digest,
};
use derive_more::Deref;
use serde::{de, Deserialize, Deserializer, Serialize, Serializer};
use std::{fmt, str::FromStr};
use thiserror::Error;

/// An owned sequence of nibbles. Every element is `< 16`.
///
/// Dereferences to its underlying `Vec<u8>`, so slicing and indexing read
/// like plain byte operations.
#[derive(Clone, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Deref)]
pub struct Nibbles(Vec<u8>);

impl Nibbles {
    /// Wraps a vector of nibble values.
    pub fn new(nibbles: Vec<u8>) -> Self {
        debug_assert!(nibbles.iter().all(|n| *n < 16), "nibble out of range");
        Self(nibbles)
    }

    /// Expands bytes into nibbles, high half first. The inverse of
    /// [`pack`] for even-length runs.
    pub fn unpack(bytes: &[u8]) -> Self {
        let mut nibbles = Vec::with_capacity(2 * bytes.len());
        for byte in bytes {
            nibbles.push(byte >> 4);
            nibbles.push(byte & 0x0f);
        }
        Self(nibbles)
    }

    /// The path locating `key` in a trie: the hex expansion of its digest.
    pub fn key_path(key: &[u8]) -> Self {
        let path = Self::unpack(digest(key).as_slice());
        debug_assert_eq!(path.len(), PATH_LENGTH);
        path
    }

    /// Packs this run; see the free [`pack`].
    pub fn pack(&self) -> Vec<u8> {
        pack(&self.0)
    }

    pub fn push(&mut self, nibble: u8) {
        debug_assert!(nibble < 16, "nibble out of range");
        self.0.push(nibble);
    }

    pub fn extend_from_slice(&mut self, nibbles: &[u8]) {
        debug_assert!(nibbles.iter().all(|n| *n < 16), "nibble out of range");
        self.0.extend_from_slice(nibbles);
    }
}

impl From<&[u8]> for Nibbles {
    fn from(nibbles: &[u8]) -> Self {
        Self::new(nibbles.to_vec())
    }
}

/// Packs a nibble run into bytes.
///
/// An even-length run packs to hex pairs. An odd-length run packs to one
/// byte holding the leading nibble in its low half, followed by the even
/// remainder packed as pairs. Every hash that covers a prefix goes through
/// this one function.
pub fn pack(nibbles: &[u8]) -> Vec<u8> {
    let mut bytes = Vec::with_capacity(nibbles.len() / 2 + 1);
    let rest = if nibbles.len() % 2 == 1 {
        bytes.push(nibbles[0]);
        &nibbles[1..]
    } else {
        nibbles
    };
    for pair in rest.chunks_exact(2) {
        bytes.push((pair[0] << 4) | pair[1]);
    }
    bytes
}

/// Length of the longest common prefix of two nibble runs.
pub fn common_prefix_len(a: &[u8], b: &[u8]) -> usize {
    a.iter().zip(b).take_while(|(x, y)| x == y).count()
}

/// Invalid character encountered while parsing a nibble run from hex text.
#[derive(Debug, Error, PartialEq, Eq)]
#[error("invalid nibble character {0:?}")]
pub struct NibbleParseError(char);

impl FromStr for Nibbles {
    type Err = NibbleParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        s.chars()
            .map(|c| {
                c.to_digit(16)
                    .map(|d| d as u8)
                    .ok_or(NibbleParseError(c))
            })
            .collect::<Result<Vec<_>, _>>()
            .map(Self)
    }
}

impl fmt::Display for Nibbles {
    /// One lowercase hex character per nibble, so odd lengths survive.
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for nibble in &self.0 {
            write!(f, "{nibble:x}")?;
        }
        Ok(())
    }
}

impl fmt::Debug for Nibbles {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Nibbles({self})")
    }
}

impl Serialize for Nibbles {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

impl<'de> Deserialize<'de> for Nibbles {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let text = String::deserialize(deserializer)?;
        text.parse().map_err(de::Error::custom)
    }
}
