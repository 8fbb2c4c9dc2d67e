//! Partition topology: which local entities this rank owns.

pub mod ownership;
