//! Re-export public algorithms.

pub mod communicator;
pub mod numbering;
pub mod wire;

pub use numbering::{GlobalNumbering, number_cells, number_entities, number_nodes};
