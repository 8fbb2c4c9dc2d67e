//! MeshNumberingError: Unified error type for mesh-numbering public APIs
//!
//! Every failure in a numbering pass is fatal to that pass. Errors raised on one
//! rank are, where the protocol allows, turned into a matching
//! [`MeshNumberingError::RemoteFailure`] on the other ranks so that no rank is
//! left blocked in a collective.

use thiserror::Error;

/// Boxed error carried by communication failures.
pub type BoxedSource = Box<dyn std::error::Error + Send + Sync + 'static>;

/// Unified error type for mesh-numbering operations.
#[derive(Debug, Error)]
pub enum MeshNumberingError {
    /// Two local entities hash to the same value (audit mode only).
    #[error("entity {index} is duplicated (hash {hash:#018x})")]
    DuplicateEntity { index: usize, hash: u64 },
    /// Another rank failed a phase every rank must pass together.
    #[error("rank {rank} aborted the numbering pass")]
    RemoteFailure { rank: usize },
    /// A collective operation failed.
    #[error("communication error with rank {neighbor}: {source}")]
    CommError {
        neighbor: usize,
        #[source]
        source: BoxedSource,
    },
    /// A collective delivered a payload of unexpected byte length.
    #[error("buffer size mismatch from rank {neighbor}: expected {expected} bytes, got {got}")]
    BufferSizeMismatch {
        neighbor: usize,
        expected: usize,
        got: usize,
    },
    /// The hash and id buffers of one broadcast round disagree in length.
    #[error("part count mismatch from rank {neighbor}: expected {expected}, got {got}")]
    PartCountMismatch {
        neighbor: usize,
        expected: usize,
        got: usize,
    },
    /// An entity finished the pass without a global index or owner.
    #[error("entity {index} has no global index after resolution")]
    UnresolvedEntity { index: usize },
    /// A broadcast hash matched an entity this rank already owns.
    #[error("entity {index} is owned locally but also claimed by rank {owner}")]
    OwnershipConflict { index: usize, owner: usize },
    /// A ghost matched owned entities of two different ranks.
    #[error("ghost {index} is claimed by both rank {first} and rank {second}")]
    GhostClaimedTwice {
        index: usize,
        first: usize,
        second: usize,
    },
    /// A hash match whose coordinates differ from the broadcaster's.
    #[error("entity {index} matched a hash from rank {root} with different coordinates")]
    HashCollision { index: usize, root: usize },
    /// Spatial dimension outside 1..=3.
    #[error("invalid spatial dimension {0} (expected 1, 2 or 3)")]
    InvalidDimension(usize),
    /// A coordinate row of the wrong length was supplied.
    #[error("coordinate row has {found} components, expected {expected}")]
    CoordinateLengthMismatch { expected: usize, found: usize },
    /// An entity index past the end of its collection.
    #[error("entity index {index} out of bounds (len {len})")]
    EntityIndexOutOfBounds { index: usize, len: usize },
    /// Two per-entity arrays that must agree in length do not.
    #[error("{what}: expected length {expected}, found {found}")]
    LengthMismatch {
        what: &'static str,
        expected: usize,
        found: usize,
    },
    /// A cell without any nodes has no centroid.
    #[error("cell {0} has no nodes")]
    EmptyCell(usize),
    /// No transformer is registered under the requested name.
    #[error("unknown mesh transformer `{0}`")]
    UnknownTransformer(String),
}

impl MeshNumberingError {
    /// Wrap an arbitrary failure of a collective with `neighbor`.
    pub fn comm<E>(neighbor: usize, source: E) -> Self
    where
        E: Into<BoxedSource>,
    {
        MeshNumberingError::CommError {
            neighbor,
            source: source.into(),
        }
    }
}
