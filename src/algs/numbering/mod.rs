//! Parallel consistent global numbering of nodes and cells.
//!
//! A pass over one entity collection runs, on every rank in lockstep:
//!
//! 1. [`hash`]: hash each entity's coordinates (cells use their centroid).
//! 2. [`audit`]: in debug mode, fail on duplicate local hashes.
//! 3. [`EntityOwnership`]: split entities into owned and ghost.
//! 4. [`allocate`]: all-gather owned counts and number owned entities from
//!    this rank's prefix-sum offset.
//! 5. [`resolve`]: one broadcast round per rank propagates owned ids to the
//!    matching ghosts elsewhere.
//!
//! Mesh arrays are only written once every entity has an id and an owner.
//! Local failures are agreed on collectively before the next collective, so
//! a failing rank never leaves its peers blocked.

pub mod allocate;
pub mod audit;
pub mod hash;
pub mod resolve;

use log::{debug, info, warn};

use crate::actions::MeshTransformer;
use crate::algs::communicator::{CollectiveExt, Communicator};
use crate::data::coordinates::Coordinates;
use crate::data::entities::{Entities, EntityFields, GLB_CELL_HASH, GLB_NODE_HASH};
use crate::data::mesh::Mesh;
use crate::debug_invariants::DebugInvariants;
use crate::mesh_error::MeshNumberingError;
use crate::topology::ownership::EntityOwnership;

use allocate::{IdAllocation, assign_owned};
use resolve::{OwnedPairs, ResolveTarget, resolve_ghosts};

/// Options of a numbering pass.
#[derive(Clone, Copy, Debug, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
#[serde(default)]
pub struct NumberingConfig {
    /// Audit local hashes, verify cross-rank matches by coordinates, and log
    /// every hash and ghost update.
    pub debug: bool,
    /// Cells continue the node index space instead of restarting at 0.
    pub combined: bool,
}

impl Default for NumberingConfig {
    fn default() -> Self {
        Self {
            debug: false,
            combined: true,
        }
    }
}

/// Counts describing one completed pass on this rank.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub struct PassSummary {
    pub owned: usize,
    pub ghosts: usize,
    /// First global index owned by this rank.
    pub offset: u64,
    /// Owned entities over all ranks.
    pub total: u64,
}

/// Summary of [`GlobalNumbering::execute`].
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub struct NumberingReport {
    pub nodes: PassSummary,
    /// `None` when cells were not numbered.
    pub cells: Option<PassSummary>,
}

/// Complete numbering of one entity collection on this rank.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Numbering {
    pub hashes: Vec<u64>,
    pub glb_idx: Vec<u64>,
    pub rank: Vec<usize>,
    pub summary: PassSummary,
}

/// Turn a local result into a collective one: if any rank failed, every rank
/// returns an error (its own, or [`MeshNumberingError::RemoteFailure`]).
fn agree<T, C>(comm: &C, local: Result<T, MeshNumberingError>) -> Result<T, MeshNumberingError>
where
    C: Communicator + ?Sized,
{
    match comm.agree_on_failure(local.is_err())? {
        None => local,
        Some(rank) => match local {
            Err(err) => Err(err),
            Ok(_) => Err(MeshNumberingError::RemoteFailure { rank }),
        },
    }
}

/// Number entities identified by `coords`, with ghosts flagged in `ghost`.
///
/// Owned ids start at `base` plus this rank's prefix-sum offset. Every rank
/// must call this with the same `base` and `debug`.
pub fn number_entities<C>(
    coords: &Coordinates,
    ghost: &[bool],
    base: u64,
    debug: bool,
    comm: &C,
) -> Result<Numbering, MeshNumberingError>
where
    C: Communicator + ?Sized,
{
    let my_rank = comm.rank();
    let checked = crate::debug_invariants::check_len("ghost flags", coords.len(), ghost.len());
    agree(comm, checked)?;

    let hashes = hash::hash_table(coords);
    if debug {
        for (i, (row, h)) in coords.rows().zip(&hashes).enumerate() {
            debug!("[{my_rank}] hashing entity {i} {row:?} to {h:#018x}");
        }
        let audited = audit::audit_hashes(&hashes);
        if audited.is_err() {
            for (dup, first) in audit::duplicate_pairs(&hashes) {
                warn!("[{my_rank}] entity {dup} duplicates entity {first}");
            }
        }
        agree(comm, audited)?;
    }

    let ownership = EntityOwnership::from_flags(ghost, my_rank);
    debug!(
        "[{my_rank}] owned: {}, ghost: {}",
        ownership.owned_count(),
        ownership.ghost_count()
    );

    let alloc = IdAllocation::gather(ownership.owned_count(), comm)?;
    let offset = base + alloc.offset();
    let mut glb_idx = assign_owned(&ownership, offset);
    let mut ranks = ownership.ranks().to_vec();

    let verify_with = debug.then_some(coords);
    let mine = OwnedPairs::collect(&ownership, &hashes, &glb_idx, verify_with);
    let mine = agree(comm, mine)?;
    let outcome = resolve_ghosts(
        comm,
        &mine,
        ResolveTarget {
            hashes: &hashes,
            ownership: &ownership,
            glb_idx: &mut glb_idx,
            ranks: &mut ranks,
            verify_with,
        },
    )?;
    debug!("[{my_rank}] resolved {} ghosts", outcome.matched);

    let finished = match outcome.error {
        Some(err) => Err(err),
        None => finalize(glb_idx, ranks),
    };
    let (glb_idx, rank) = agree(comm, finished)?;

    let summary = PassSummary {
        owned: ownership.owned_count(),
        ghosts: ownership.ghost_count(),
        offset,
        total: alloc.total(),
    };
    Ok(Numbering {
        hashes,
        glb_idx,
        rank,
        summary,
    })
}

/// Every entity must have both an id and an owner.
fn finalize(
    glb_idx: Vec<Option<u64>>,
    ranks: Vec<Option<usize>>,
) -> Result<(Vec<u64>, Vec<usize>), MeshNumberingError> {
    let mut out_glb = Vec::with_capacity(glb_idx.len());
    let mut out_rank = Vec::with_capacity(ranks.len());
    for (index, (g, r)) in glb_idx.into_iter().zip(ranks).enumerate() {
        match (g, r) {
            (Some(g), Some(r)) => {
                out_glb.push(g);
                out_rank.push(r);
            }
            _ => return Err(MeshNumberingError::UnresolvedEntity { index }),
        }
    }
    Ok((out_glb, out_rank))
}

/// Write a completed numbering and its hash table into `fields`.
fn store(
    fields: &mut EntityFields,
    hash_attribute: &str,
    numbering: Numbering,
) -> Result<PassSummary, MeshNumberingError> {
    let Numbering {
        hashes,
        glb_idx,
        rank,
        summary,
    } = numbering;
    *fields.attribute_or_insert(hash_attribute) = hashes;
    fields.store_numbering(glb_idx, rank)?;
    Ok(summary)
}

fn node_numbering<C>(nodes: &Entities, debug: bool, comm: &C) -> Result<Numbering, MeshNumberingError>
where
    C: Communicator + ?Sized,
{
    number_entities(
        nodes.coordinates(),
        nodes.fields().ghost_flags(),
        0,
        debug,
        comm,
    )
}

fn cell_numbering<C>(
    mesh: &Mesh,
    base: u64,
    debug: bool,
    comm: &C,
) -> Result<Numbering, MeshNumberingError>
where
    C: Communicator + ?Sized,
{
    let centroids = agree(comm, mesh.cells.centroids(mesh.nodes.coordinates()))?;
    number_entities(
        &centroids,
        mesh.cells.fields().ghost_flags(),
        base,
        debug,
        comm,
    )
}

/// Number the mesh nodes from 0 and store hashes, ids and owners.
pub fn number_nodes<C>(
    nodes: &mut Entities,
    debug: bool,
    comm: &C,
) -> Result<PassSummary, MeshNumberingError>
where
    C: Communicator + ?Sized,
{
    let numbering = node_numbering(nodes, debug, comm)?;
    let summary = store(nodes.fields_mut(), GLB_NODE_HASH, numbering)?;
    nodes.debug_assert_invariants();
    Ok(summary)
}

/// Number the mesh cells from `base`, identifying each by its centroid.
pub fn number_cells<C>(
    mesh: &mut Mesh,
    base: u64,
    debug: bool,
    comm: &C,
) -> Result<PassSummary, MeshNumberingError>
where
    C: Communicator + ?Sized,
{
    let numbering = cell_numbering(mesh, base, debug, comm)?;
    let summary = store(mesh.cells.fields_mut(), GLB_CELL_HASH, numbering)?;
    mesh.cells.debug_assert_invariants();
    Ok(summary)
}

/// Global numbering of nodes, and optionally cells, from coordinate hashes.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct GlobalNumbering {
    config: NumberingConfig,
    with_cells: bool,
}

impl GlobalNumbering {
    /// Number nodes and cells.
    pub fn new(config: NumberingConfig) -> Self {
        Self {
            config,
            with_cells: true,
        }
    }

    /// Number nodes only.
    pub fn nodes_only(config: NumberingConfig) -> Self {
        Self {
            config,
            with_cells: false,
        }
    }

    pub fn config(&self) -> &NumberingConfig {
        &self.config
    }

    /// Run the pass on this rank. Every rank must call this collectively.
    pub fn execute<C>(&self, mesh: &mut Mesh, comm: &C) -> Result<NumberingReport, MeshNumberingError>
    where
        C: Communicator + ?Sized,
    {
        agree(comm, mesh.validate_invariants())?;
        if mesh.nodes.is_empty() {
            warn!("[{}] numbering an empty partition", comm.rank());
        }

        // both passes complete before either collection is written
        let nodes = node_numbering(&mesh.nodes, self.config.debug, comm)?;
        let cells = if self.with_cells {
            let base = if self.config.combined {
                nodes.summary.total
            } else {
                0
            };
            Some(cell_numbering(mesh, base, self.config.debug, comm)?)
        } else {
            None
        };

        let nodes = store(mesh.nodes.fields_mut(), GLB_NODE_HASH, nodes)?;
        info!(
            "[{}] nodes: {} owned + {} ghost, ids from {}, {} in total",
            comm.rank(),
            nodes.owned,
            nodes.ghosts,
            nodes.offset,
            nodes.total
        );
        let cells = match cells {
            Some(numbering) => {
                let cells = store(mesh.cells.fields_mut(), GLB_CELL_HASH, numbering)?;
                info!(
                    "[{}] cells: {} owned + {} ghost, ids from {}, {} in total",
                    comm.rank(),
                    cells.owned,
                    cells.ghosts,
                    cells.offset,
                    cells.total
                );
                Some(cells)
            }
            None => None,
        };
        mesh.debug_assert_invariants();
        Ok(NumberingReport { nodes, cells })
    }
}

impl MeshTransformer for GlobalNumbering {
    fn name(&self) -> &'static str {
        if self.with_cells {
            "GlobalNumbering"
        } else {
            "GlobalNumberingNodes"
        }
    }

    fn brief_description(&self) -> &'static str {
        "Construct global node and element numbering based on coordinates hash values"
    }

    fn execute(
        &self,
        mesh: &mut Mesh,
        comm: &dyn Communicator,
    ) -> Result<NumberingReport, MeshNumberingError> {
        GlobalNumbering::execute(self, mesh, comm)
    }
}
