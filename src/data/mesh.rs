//! A partition of a distributed mesh as seen by one rank.

use crate::data::entities::{Cells, Entities};
use crate::debug_invariants::DebugInvariants;
use crate::mesh_error::MeshNumberingError;

/// Local nodes and cells of one rank, ghosts included.
#[derive(Clone, Debug, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct Mesh {
    pub nodes: Entities,
    pub cells: Cells,
}

impl Mesh {
    /// Mesh without cells.
    pub fn from_nodes(nodes: Entities) -> Self {
        Self {
            nodes,
            cells: Cells::default(),
        }
    }

    pub fn new(nodes: Entities, cells: Cells) -> Self {
        Self { nodes, cells }
    }
}

impl DebugInvariants for Mesh {
    fn debug_assert_invariants(&self) {
        self.nodes.debug_assert_invariants();
        self.cells.debug_assert_invariants();
    }

    fn validate_invariants(&self) -> Result<(), MeshNumberingError> {
        self.nodes.validate_invariants()?;
        self.cells.validate_invariants()?;
        for c in 0..self.cells.len() {
            for &n in self.cells.try_nodes(c)? {
                if n >= self.nodes.len() {
                    return Err(MeshNumberingError::EntityIndexOutOfBounds {
                        index: n,
                        len: self.nodes.len(),
                    });
                }
            }
        }
        Ok(())
    }
}
