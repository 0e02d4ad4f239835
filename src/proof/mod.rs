//! Proof generation results and verification for the forestry.
//!
//! A proof carries the proven key's path, optionally the value, and one
//! [`Step`] of neighbor evidence per branch crossed on the way down. The
//! same proof verifies in two modes: including the element it reproduces the
//! root of the trie that contains it, excluding the element the root of the
//! trie without it. Insertions and deletions are therefore checked with a
//! single proof verified twice.
use thiserror::Error;

#[allow(clippy::module_inception)]
mod proof;
mod step;

pub use proof::Proof;
pub use step::{ForkNeighbor, LeafNeighbor, Step};

/// Error type for proof verification.
///
/// A structurally sound proof for the wrong tree simply verifies to a
/// non-matching root; these errors are for proofs that are not even
/// well-formed against their own path.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum ProofError {
    /// Verification including the element needs the element's value.
    #[error("proof carries no value to verify with")]
    MissingValue,
    /// The accumulated skips walked past the end of the key path.
    #[error("proof steps overrun the key path at nibble {cursor}")]
    PathOverrun { cursor: usize },
    /// A fork neighbor's slot is not a nibble.
    #[error("neighbor slot {nibble:#x} is not a valid nibble")]
    InvalidNibble { nibble: u8 },
    /// A neighbor claims the slot the proven path descends through.
    #[error("neighbor claims our own slot {nibble:#x}")]
    NeighborClash { nibble: u8 },
    /// A leaf neighbor's path diverges from the proven path before the
    /// branch this step describes.
    #[error("leaf neighbor diverges from the proven path before its branch point")]
    DivergentNeighbor,
}
