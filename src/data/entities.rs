//! Per-entity storage for nodes and cells.
//!
//! Both collections carry the same numbering state ([`EntityFields`]): ghost
//! flags supplied by the partitioner, the global index and owning rank written
//! by a numbering pass, and named auxiliary `u64` attributes such as the
//! coordinate-hash table.

use std::collections::BTreeMap;

use crate::data::coordinates::Coordinates;
use crate::debug_invariants::{DebugInvariants, check_len};
use crate::mesh_error::MeshNumberingError;

/// Attribute holding the per-node coordinate hash.
pub const GLB_NODE_HASH: &str = "glb_node_hash";
/// Attribute holding the per-cell centroid hash.
pub const GLB_CELL_HASH: &str = "glb_elem_hash";

/// Numbering state shared by every entity collection.
#[derive(Clone, Debug, Default, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct EntityFields {
    ghost: Vec<bool>,
    glb_idx: Vec<u64>,
    rank: Vec<usize>,
    attributes: BTreeMap<String, Vec<u64>>,
}

impl EntityFields {
    fn push(&mut self, is_ghost: bool) {
        self.ghost.push(is_ghost);
        // a new entity invalidates any earlier numbering
        self.glb_idx.clear();
        self.rank.clear();
        for values in self.attributes.values_mut() {
            values.push(0);
        }
    }

    fn len(&self) -> usize {
        self.ghost.len()
    }

    /// Ghost flag of entity `i`; out-of-range indices are not ghosts.
    #[inline]
    pub fn is_ghost(&self, i: usize) -> bool {
        self.ghost.get(i).copied().unwrap_or(false)
    }

    /// All ghost flags in local-index order.
    pub fn ghost_flags(&self) -> &[bool] {
        &self.ghost
    }

    /// Mark entity `i` as ghost (or owned).
    ///
    /// Changing the flag drops any stored numbering; setting it to its
    /// current value keeps it.
    pub fn set_ghost(&mut self, i: usize, is_ghost: bool) -> Result<(), MeshNumberingError> {
        let len = self.len();
        let slot = self
            .ghost
            .get_mut(i)
            .ok_or(MeshNumberingError::EntityIndexOutOfBounds { index: i, len })?;
        if *slot != is_ghost {
            *slot = is_ghost;
            self.glb_idx.clear();
            self.rank.clear();
        }
        Ok(())
    }

    /// Global indices; empty until a numbering pass succeeds.
    pub fn glb_idx(&self) -> &[u64] {
        &self.glb_idx
    }

    /// Owning ranks; empty until a numbering pass succeeds.
    pub fn rank(&self) -> &[usize] {
        &self.rank
    }

    /// Whether a complete numbering is stored.
    pub fn is_numbered(&self) -> bool {
        self.glb_idx.len() == self.len() && self.rank.len() == self.len()
    }

    /// Look up an auxiliary attribute by name.
    pub fn attribute(&self, name: &str) -> Option<&[u64]> {
        self.attributes.get(name).map(Vec::as_slice)
    }

    /// Fetch an auxiliary attribute, creating it zero-filled if absent.
    pub fn attribute_or_insert(&mut self, name: &str) -> &mut Vec<u64> {
        let len = self.len();
        let values = self.attributes.entry(name.to_owned()).or_default();
        values.resize(len, 0);
        values
    }

    /// Replace the numbering wholesale. Both arrays must cover every entity.
    pub(crate) fn store_numbering(
        &mut self,
        glb_idx: Vec<u64>,
        rank: Vec<usize>,
    ) -> Result<(), MeshNumberingError> {
        check_len("global index array", self.len(), glb_idx.len())?;
        check_len("rank array", self.len(), rank.len())?;
        self.glb_idx = glb_idx;
        self.rank = rank;
        Ok(())
    }

    fn validate(&self) -> Result<(), MeshNumberingError> {
        let len = self.len();
        if !self.glb_idx.is_empty() {
            check_len("global index array", len, self.glb_idx.len())?;
        }
        if !self.rank.is_empty() {
            check_len("rank array", len, self.rank.len())?;
        }
        for values in self.attributes.values() {
            check_len("auxiliary attribute", len, values.len())?;
        }
        Ok(())
    }
}

/// Mesh nodes: coordinates plus numbering state.
#[derive(Clone, Debug, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct Entities {
    coordinates: Coordinates,
    fields: EntityFields,
}

impl Entities {
    /// Empty node set of the given spatial dimension.
    pub fn try_new(dimension: usize) -> Result<Self, MeshNumberingError> {
        Ok(Self::from_coordinates(Coordinates::try_new(dimension)?))
    }

    /// Wrap existing coordinates; every node starts out owned.
    pub fn from_coordinates(coordinates: Coordinates) -> Self {
        let mut fields = EntityFields::default();
        for _ in 0..coordinates.len() {
            fields.push(false);
        }
        Self {
            coordinates,
            fields,
        }
    }

    /// Append a node, returning its local index.
    pub fn try_push(&mut self, coords: &[f64], is_ghost: bool) -> Result<usize, MeshNumberingError> {
        let idx = self.coordinates.try_push(coords)?;
        self.fields.push(is_ghost);
        Ok(idx)
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.coordinates.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.coordinates.is_empty()
    }

    #[inline]
    pub fn coordinates(&self) -> &Coordinates {
        &self.coordinates
    }

    #[inline]
    pub fn fields(&self) -> &EntityFields {
        &self.fields
    }

    #[inline]
    pub fn fields_mut(&mut self) -> &mut EntityFields {
        &mut self.fields
    }

    #[inline]
    pub fn is_ghost(&self, i: usize) -> bool {
        self.fields.is_ghost(i)
    }

    pub fn glb_idx(&self) -> &[u64] {
        self.fields.glb_idx()
    }

    pub fn rank(&self) -> &[usize] {
        self.fields.rank()
    }
}

impl DebugInvariants for Entities {
    fn debug_assert_invariants(&self) {
        crate::debug_invariants!(self.validate_invariants(), "Entities");
    }

    fn validate_invariants(&self) -> Result<(), MeshNumberingError> {
        check_len("ghost flags", self.coordinates.len(), self.fields.len())?;
        self.fields.validate()
    }
}

/// Mesh cells: node connectivity (CSR) plus numbering state.
#[derive(Clone, Debug, Default, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct Cells {
    offsets: Vec<usize>,
    connectivity: Vec<usize>,
    fields: EntityFields,
}

impl Cells {
    /// Append a cell given its node indices, returning its local index.
    pub fn push(&mut self, nodes: &[usize], is_ghost: bool) -> usize {
        if self.offsets.is_empty() {
            self.offsets.push(0);
        }
        self.connectivity.extend_from_slice(nodes);
        self.offsets.push(self.connectivity.len());
        self.fields.push(is_ghost);
        self.len() - 1
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.offsets.len().saturating_sub(1)
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Node indices of cell `c`.
    pub fn try_nodes(&self, c: usize) -> Result<&[usize], MeshNumberingError> {
        if c >= self.len() {
            return Err(MeshNumberingError::EntityIndexOutOfBounds {
                index: c,
                len: self.len(),
            });
        }
        Ok(&self.connectivity[self.offsets[c]..self.offsets[c + 1]])
    }

    #[inline]
    pub fn fields(&self) -> &EntityFields {
        &self.fields
    }

    #[inline]
    pub fn fields_mut(&mut self) -> &mut EntityFields {
        &mut self.fields
    }

    #[inline]
    pub fn is_ghost(&self, c: usize) -> bool {
        self.fields.is_ghost(c)
    }

    pub fn glb_idx(&self) -> &[u64] {
        self.fields.glb_idx()
    }

    pub fn rank(&self) -> &[usize] {
        self.fields.rank()
    }

    /// Centroid of every cell, averaging node coordinates in connectivity order.
    ///
    /// Identical connectivity over identical node coordinates yields
    /// bit-identical centroids on every rank.
    pub fn centroids(&self, nodes: &Coordinates) -> Result<Coordinates, MeshNumberingError> {
        let dim = nodes.dimension();
        let mut out = Coordinates::try_new(dim)?;
        let mut acc = vec![0.0f64; dim];
        for c in 0..self.len() {
            let cell_nodes = self.try_nodes(c)?;
            if cell_nodes.is_empty() {
                return Err(MeshNumberingError::EmptyCell(c));
            }
            acc.iter_mut().for_each(|a| *a = 0.0);
            for &n in cell_nodes {
                for (a, x) in acc.iter_mut().zip(nodes.try_row(n)?) {
                    *a += *x;
                }
            }
            let inv = cell_nodes.len() as f64;
            acc.iter_mut().for_each(|a| *a /= inv);
            out.try_push(&acc)?;
        }
        Ok(out)
    }
}

impl DebugInvariants for Cells {
    fn debug_assert_invariants(&self) {
        crate::debug_invariants!(self.validate_invariants(), "Cells");
    }

    fn validate_invariants(&self) -> Result<(), MeshNumberingError> {
        check_len("ghost flags", self.len(), self.fields.len())?;
        if let Some(&last) = self.offsets.last() {
            check_len("connectivity", last, self.connectivity.len())?;
        }
        self.fields.validate()
    }
}
