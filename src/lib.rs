#![cfg_attr(docsrs, feature(doc_cfg))]
//! # mesh-numbering
//!
//! mesh-numbering assigns globally unique, contiguous-per-owner identifiers to
//! the entities of a mesh that is partitioned across processes. Each rank owns
//! a disjoint subset of nodes and cells and keeps read-only ghost copies of
//! entities owned elsewhere. No global ids exist beforehand: entities are
//! matched across ranks by a deterministic hash of their coordinates.
//!
//! ## Features
//! - Coordinate hashing with an order-sensitive 64-bit `hash_combine`
//! - Owned counts all-gathered into per-rank contiguous id ranges
//! - Round-robin broadcast resolution of ghost ids and owner ranks
//! - Debug mode: duplicate-hash audit and bitwise coordinate verification
//! - Pluggable communication backends (serial, in-process threads, MPI)
//!
//! ## Determinism
//!
//! Hashes depend only on coordinate bit patterns and ids only on the owned
//! counts and local order, so identical input and partitioning always yield
//! identical numbering.
//!
//! ## Usage
//!
//! ```toml
//! [dependencies]
//! mesh-numbering = "0.3"
//! # Optional features:
//! # features = ["mpi-support", "rayon"]
//! ```
//!
//! ```
//! use mesh_numbering::prelude::*;
//!
//! let mut nodes = Entities::try_new(2)?;
//! nodes.try_push(&[0.0, 0.0], false)?;
//! nodes.try_push(&[1.0, 0.0], false)?;
//! let mut mesh = Mesh::from_nodes(nodes);
//! let report = GlobalNumbering::new(NumberingConfig::default()).execute(&mut mesh, &NoComm)?;
//! assert_eq!(report.nodes.total, 2);
//! assert_eq!(mesh.nodes.glb_idx(), &[0, 1]);
//! # Ok::<(), MeshNumberingError>(())
//! ```

pub mod actions;
pub mod algs;
pub mod data;
pub mod debug_invariants;
pub mod mesh_error;
pub mod topology;

pub use debug_invariants::DebugInvariants;

/// A convenient prelude to import the most-used traits & types:
pub mod prelude {
    pub use crate::actions::{MeshTransformer, TransformerRegistry};
    #[cfg(feature = "mpi-support")]
    pub use crate::algs::communicator::MpiComm;
    pub use crate::algs::communicator::{CollectiveExt, Communicator, LocalComm, NoComm};
    pub use crate::algs::numbering::{
        GlobalNumbering, NumberingConfig, NumberingReport, PassSummary, number_cells,
        number_entities, number_nodes,
    };
    pub use crate::data::coordinates::Coordinates;
    pub use crate::data::entities::{Cells, Entities, GLB_CELL_HASH, GLB_NODE_HASH};
    pub use crate::data::mesh::Mesh;
    pub use crate::debug_invariants::DebugInvariants;
    pub use crate::mesh_error::MeshNumberingError;
    pub use crate::topology::ownership::EntityOwnership;
}
