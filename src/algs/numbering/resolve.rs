//! Round-robin broadcast of owned `(hash, global id)` pairs.
//!
//! Every rank takes one turn as root, in ascending rank order. Receivers look
//! each broadcast hash up among their own entities and adopt the root's id and
//! rank for matching ghosts. Unknown hashes are skipped: a root only
//! broadcasts what it owns.
//!
//! Inconsistencies found during a round are recorded, not returned, so that
//! every rank still completes all rounds; the caller reports them afterwards.

use hashbrown::HashMap;
use log::{debug, warn};

use crate::algs::communicator::{CollectiveExt, Communicator};
use crate::algs::numbering::hash::same_position;
use crate::algs::wire::{decode_f64s, encode_f64s};
use crate::data::coordinates::Coordinates;
use crate::debug_invariants::check_len;
use crate::mesh_error::MeshNumberingError;
use crate::topology::ownership::EntityOwnership;

/// What one rank contributes while it is root.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct OwnedPairs {
    pub hashes: Vec<u64>,
    pub ids: Vec<u64>,
    /// Flat owned coordinates, present only when verification is enabled.
    pub coords: Option<Vec<f64>>,
}

impl OwnedPairs {
    /// Collect owned entities in local-index order.
    pub fn collect(
        ownership: &EntityOwnership,
        hashes: &[u64],
        glb_idx: &[Option<u64>],
        verify_with: Option<&Coordinates>,
    ) -> Result<Self, MeshNumberingError> {
        check_len("hash table", ownership.len(), hashes.len())?;
        check_len("global index array", ownership.len(), glb_idx.len())?;
        if let Some(coords) = verify_with {
            check_len("coordinate rows", ownership.len(), coords.len())?;
        }
        let mut pairs = OwnedPairs {
            hashes: Vec::with_capacity(ownership.owned_count()),
            ids: Vec::with_capacity(ownership.owned_count()),
            coords: verify_with.map(|c| Vec::with_capacity(ownership.owned_count() * c.dimension())),
        };
        for i in ownership.owned_indices() {
            let id = glb_idx[i].ok_or(MeshNumberingError::UnresolvedEntity { index: i })?;
            pairs.hashes.push(hashes[i]);
            pairs.ids.push(id);
            if let (Some(out), Some(coords)) = (pairs.coords.as_mut(), verify_with) {
                out.extend_from_slice(coords.try_row(i)?);
            }
        }
        Ok(pairs)
    }

    pub fn len(&self) -> usize {
        self.hashes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.hashes.is_empty()
    }
}

/// Local state the resolver writes into.
pub struct ResolveTarget<'a> {
    pub hashes: &'a [u64],
    pub ownership: &'a EntityOwnership,
    pub glb_idx: &'a mut [Option<u64>],
    pub ranks: &'a mut [Option<usize>],
    /// Local coordinates for bitwise verification of every match.
    pub verify_with: Option<&'a Coordinates>,
}

/// Result of all broadcast rounds on this rank.
#[derive(Debug, Default)]
pub struct ResolveOutcome {
    /// Ghosts that adopted a remote id.
    pub matched: usize,
    /// First inconsistency seen; every round still ran.
    pub error: Option<MeshNumberingError>,
}

impl ResolveOutcome {
    fn record(&mut self, my_rank: usize, err: MeshNumberingError) {
        warn!("[{my_rank}] ghost resolution: {err}");
        if self.error.is_none() {
            self.error = Some(err);
        }
    }
}

/// Hash to local index; a repeated hash maps to its last index.
fn glb2loc(hashes: &[u64]) -> HashMap<u64, usize> {
    let mut map = HashMap::with_capacity(hashes.len());
    for (loc, &hash) in hashes.iter().enumerate() {
        map.insert(hash, loc);
    }
    map
}

/// Run one broadcast round per rank and fill in ghost ids and owners.
///
/// No-op on an inactive communicator. Communication failures return
/// immediately; they are fatal to the whole run.
pub fn resolve_ghosts<C>(
    comm: &C,
    mine: &OwnedPairs,
    target: ResolveTarget<'_>,
) -> Result<ResolveOutcome, MeshNumberingError>
where
    C: Communicator + ?Sized,
{
    let mut outcome = ResolveOutcome::default();
    if !comm.is_active() {
        return Ok(outcome);
    }
    let ResolveTarget {
        hashes,
        ownership,
        glb_idx,
        ranks,
        verify_with,
    } = target;
    let my_rank = comm.rank();
    let map = glb2loc(hashes);
    let verify = verify_with.is_some();

    for root in 0..comm.size() {
        let is_root = root == my_rank;
        let rcv_hashes = comm.broadcast_u64s(root, if is_root { &mine.hashes[..] } else { &[][..] })?;
        let rcv_ids = comm.broadcast_u64s(root, if is_root { &mine.ids[..] } else { &[][..] })?;
        let rcv_coords = if verify {
            let local = match (&mine.coords, is_root) {
                (Some(c), true) => encode_f64s(c),
                _ => Vec::new(),
            };
            Some(decode_f64s(&comm.broadcast(root, &local)?, root)?)
        } else {
            None
        };

        if is_root {
            continue;
        }
        if rcv_ids.len() != rcv_hashes.len() {
            outcome.record(my_rank, MeshNumberingError::PartCountMismatch {
                neighbor: root,
                expected: rcv_hashes.len(),
                got: rcv_ids.len(),
            });
            continue;
        }

        for (k, (hash, &id)) in rcv_hashes.iter().zip(&rcv_ids).enumerate() {
            let Some(&loc) = map.get(hash) else {
                continue;
            };
            if !ownership.is_ghost(loc) {
                outcome.record(my_rank, MeshNumberingError::OwnershipConflict {
                    index: loc,
                    owner: root,
                });
                continue;
            }
            if let Some(first) = ranks[loc] {
                outcome.record(my_rank, MeshNumberingError::GhostClaimedTwice {
                    index: loc,
                    first,
                    second: root,
                });
                continue;
            }
            if let (Some(local), Some(remote)) = (verify_with, rcv_coords.as_deref()) {
                let dim = local.dimension();
                let row = remote.get(k * dim..(k + 1) * dim);
                if !row.is_some_and(|r| same_position(local.try_row(loc).unwrap_or(&[]), r)) {
                    outcome.record(my_rank, MeshNumberingError::HashCollision { index: loc, root });
                    continue;
                }
            }
            debug!("[{my_rank}] ghost {loc} (hash {hash:#018x}) -> global id {id} from rank {root}");
            glb_idx[loc] = Some(id);
            ranks[loc] = Some(root);
            outcome.matched += 1;
        }
    }
    Ok(outcome)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::algs::communicator::{LocalComm, NoComm};

    #[test]
    fn inactive_communicator_is_a_noop() {
        let own = EntityOwnership::from_flags(&[false, false], 0);
        let mut glb = vec![Some(0), Some(1)];
        let mut ranks = own.ranks().to_vec();
        let mine = OwnedPairs::collect(&own, &[5, 6], &glb, None).unwrap();
        let out = resolve_ghosts(
            &NoComm,
            &mine,
            ResolveTarget {
                hashes: &[5, 6],
                ownership: &own,
                glb_idx: &mut glb,
                ranks: &mut ranks,
                verify_with: None,
            },
        )
        .unwrap();
        assert_eq!(out.matched, 0);
        assert!(out.error.is_none());
        assert_eq!(glb, vec![Some(0), Some(1)]);
    }

    #[test]
    fn collect_keeps_local_order() {
        let own = EntityOwnership::from_flags(&[true, false, false], 0);
        let coords = Coordinates::from_rows(1, [[9.0], [1.0], [2.0]]).unwrap();
        let pairs =
            OwnedPairs::collect(&own, &[30, 10, 20], &[None, Some(4), Some(5)], Some(&coords)).unwrap();
        assert_eq!(pairs.hashes, vec![10, 20]);
        assert_eq!(pairs.ids, vec![4, 5]);
        assert_eq!(pairs.coords, Some(vec![1.0, 2.0]));
    }

    #[test]
    fn ghost_adopts_owner_id_and_conflicts_are_recorded() {
        // rank 0 owns hashes 1,2; rank 1 owns 3 and ghosts 2; rank 1 also
        // claims hash 1 as owned, which conflicts with rank 0.
        let world = LocalComm::world(2);
        let outs = std::thread::scope(|s| {
            let hs: Vec<_> = world
                .iter()
                .map(|comm| {
                    s.spawn(move || {
                        let (hashes, flags, start): (Vec<u64>, Vec<bool>, u64) = if comm.rank() == 0 {
                            (vec![1, 2], vec![false, false], 0)
                        } else {
                            (vec![3, 2, 1], vec![false, true, false], 2)
                        };
                        let own = EntityOwnership::from_flags(&flags, comm.rank());
                        let mut glb = crate::algs::numbering::allocate::assign_owned(&own, start);
                        let mut ranks = own.ranks().to_vec();
                        let mine = OwnedPairs::collect(&own, &hashes, &glb, None).unwrap();
                        let out = resolve_ghosts(
                            comm,
                            &mine,
                            ResolveTarget {
                                hashes: &hashes,
                                ownership: &own,
                                glb_idx: &mut glb,
                                ranks: &mut ranks,
                                verify_with: None,
                            },
                        )
                        .unwrap();
                        (glb, ranks, out)
                    })
                })
                .collect();
            hs.into_iter().map(|h| h.join().unwrap()).collect::<Vec<_>>()
        });
        let (glb1, ranks1, out1) = &outs[1];
        assert_eq!(glb1[1], Some(1));
        assert_eq!(ranks1[1], Some(0));
        assert_eq!(out1.matched, 1);
        assert!(matches!(
            out1.error,
            Some(MeshNumberingError::OwnershipConflict { index: 2, owner: 0 })
        ));
        let (_, _, out0) = &outs[0];
        assert!(matches!(
            out0.error,
            Some(MeshNumberingError::OwnershipConflict { index: 0, owner: 1 })
        ));
    }

    #[test]
    fn verification_rejects_matching_hash_at_other_position() {
        let world = LocalComm::world(2);
        let outs = std::thread::scope(|s| {
            let hs: Vec<_> = world
                .iter()
                .map(|comm| {
                    s.spawn(move || {
                        // both ranks use hash 5, but for different positions
                        let (x, ghost) = if comm.rank() == 0 { (1.0, false) } else { (2.0, true) };
                        let coords = Coordinates::from_rows(1, [[x]]).unwrap();
                        let own = EntityOwnership::from_flags(&[ghost], comm.rank());
                        let mut glb = crate::algs::numbering::allocate::assign_owned(&own, 0);
                        let mut ranks = own.ranks().to_vec();
                        let mine = OwnedPairs::collect(&own, &[5], &glb, Some(&coords)).unwrap();
                        let out = resolve_ghosts(
                            comm,
                            &mine,
                            ResolveTarget {
                                hashes: &[5],
                                ownership: &own,
                                glb_idx: &mut glb,
                                ranks: &mut ranks,
                                verify_with: Some(&coords),
                            },
                        )
                        .unwrap();
                        (glb, out)
                    })
                })
                .collect();
            hs.into_iter().map(|h| h.join().unwrap()).collect::<Vec<_>>()
        });
        assert!(outs[0].1.error.is_none());
        assert_eq!(outs[1].0, vec![None]);
        assert!(matches!(
            outs[1].1.error,
            Some(MeshNumberingError::HashCollision { index: 0, root: 0 })
        ));
    }

    #[test]
    fn collect_rejects_short_tables() {
        let own = EntityOwnership::from_flags(&[false, false, true], 0);
        assert!(matches!(
            OwnedPairs::collect(&own, &[1, 2], &[Some(0), Some(1), None], None),
            Err(MeshNumberingError::LengthMismatch { what: "hash table", expected: 3, found: 2 })
        ));
        assert!(matches!(
            OwnedPairs::collect(&own, &[1, 2, 3], &[Some(0)], None),
            Err(MeshNumberingError::LengthMismatch { expected: 3, found: 1, .. })
        ));
    }

    #[test]
    fn ghost_claimed_by_two_ranks_names_both() {
        // ranks 0 and 1 both own hash 7; rank 2 holds it as a ghost
        let world = LocalComm::world(3);
        let outs = std::thread::scope(|s| {
            let hs: Vec<_> = world
                .iter()
                .map(|comm| {
                    s.spawn(move || {
                        let ghost = comm.rank() == 2;
                        let own = EntityOwnership::from_flags(&[ghost], comm.rank());
                        let start = comm.rank() as u64;
                        let mut glb = crate::algs::numbering::allocate::assign_owned(&own, start);
                        let mut ranks = own.ranks().to_vec();
                        let mine = OwnedPairs::collect(&own, &[7], &glb, None).unwrap();
                        let out = resolve_ghosts(
                            comm,
                            &mine,
                            ResolveTarget {
                                hashes: &[7],
                                ownership: &own,
                                glb_idx: &mut glb,
                                ranks: &mut ranks,
                                verify_with: None,
                            },
                        )
                        .unwrap();
                        (glb, ranks, out)
                    })
                })
                .collect();
            hs.into_iter().map(|h| h.join().unwrap()).collect::<Vec<_>>()
        });
        let (glb2, ranks2, out2) = &outs[2];
        // the first claimant's id stays in place
        assert_eq!(glb2, &vec![Some(0)]);
        assert_eq!(ranks2, &vec![Some(0)]);
        assert!(matches!(
            out2.error,
            Some(MeshNumberingError::GhostClaimedTwice { index: 0, first: 0, second: 1 })
        ));
        assert!(matches!(
            outs[0].2.error,
            Some(MeshNumberingError::OwnershipConflict { index: 0, owner: 1 })
        ));
    }
}
