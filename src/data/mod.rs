//! Mesh storage: coordinates, per-entity numbering state, and the mesh itself.

pub mod coordinates;
pub mod entities;
pub mod mesh;
