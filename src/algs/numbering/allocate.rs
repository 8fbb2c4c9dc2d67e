//! Contiguous global-ID ranges per rank.
//!
//! Owned counts are all-gathered, turned into start offsets by an exclusive
//! prefix sum, and each rank hands out its own range to owned entities in
//! local-index order.

use log::debug;

use crate::algs::communicator::{CollectiveExt, Communicator};
use crate::mesh_error::MeshNumberingError;
use crate::topology::ownership::EntityOwnership;

/// Per-rank owned counts and start offsets for one pass.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct IdAllocation {
    rank: usize,
    counts: Vec<u64>,
    offsets: Vec<u64>,
}

impl IdAllocation {
    /// Gather every rank's owned count.
    ///
    /// An inactive communicator skips the collective and uses `owned` as the
    /// only count.
    pub fn gather<C>(owned: usize, comm: &C) -> Result<Self, MeshNumberingError>
    where
        C: Communicator + ?Sized,
    {
        let counts = if comm.is_active() {
            let counts = comm.allgather_u64(owned as u64)?;
            if counts.len() != comm.size() {
                return Err(MeshNumberingError::PartCountMismatch {
                    neighbor: comm.rank(),
                    expected: comm.size(),
                    got: counts.len(),
                });
            }
            counts
        } else {
            vec![owned as u64]
        };
        Ok(Self::from_counts(comm.rank(), counts))
    }

    /// Build from an already gathered count sequence.
    pub fn from_counts(rank: usize, counts: Vec<u64>) -> Self {
        let offsets = exclusive_prefix_sum(&counts);
        Self {
            rank,
            counts,
            offsets,
        }
    }

    pub fn counts(&self) -> &[u64] {
        &self.counts
    }

    pub fn offsets(&self) -> &[u64] {
        &self.offsets
    }

    /// First global index of this rank's range.
    pub fn offset(&self) -> u64 {
        self.offsets.get(self.rank).copied().unwrap_or(0)
    }

    /// Total owned entities over all ranks.
    pub fn total(&self) -> u64 {
        self.counts.iter().sum()
    }
}

/// `out[p] = counts[0] + .. + counts[p-1]`, starting at 0.
pub fn exclusive_prefix_sum(counts: &[u64]) -> Vec<u64> {
    counts
        .iter()
        .scan(0u64, |acc, &c| {
            let start = *acc;
            *acc += c;
            Some(start)
        })
        .collect()
}

/// Number owned entities from `start` upwards; ghosts stay `None`.
pub fn assign_owned(ownership: &EntityOwnership, start: u64) -> Vec<Option<u64>> {
    let mut glb_idx = vec![None; ownership.len()];
    let mut next = start;
    for i in ownership.owned_indices() {
        glb_idx[i] = Some(next);
        next += 1;
    }
    debug!(
        "[{}] assigned global ids {}..{} to owned entities",
        ownership.my_rank(),
        start,
        next
    );
    glb_idx
}
