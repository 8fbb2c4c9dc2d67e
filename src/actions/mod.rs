//! Mesh transformers and a name-keyed registry of them.
//!
//! The registry maps a transformer name to a factory taking a
//! [`NumberingConfig`]. It is built once by the caller; nothing is global.

use std::collections::BTreeMap;

use crate::algs::communicator::Communicator;
use crate::algs::numbering::{GlobalNumbering, NumberingConfig, NumberingReport};
use crate::data::mesh::Mesh;
use crate::mesh_error::MeshNumberingError;

/// An action that rewrites mesh metadata collectively on every rank.
pub trait MeshTransformer {
    fn name(&self) -> &'static str;

    fn brief_description(&self) -> &'static str;

    fn help(&self) -> String {
        format!("  {}\n  Usage: {}", self.brief_description(), self.name())
    }

    /// Run the transformer; every rank of `comm` must call this together.
    fn execute(
        &self,
        mesh: &mut Mesh,
        comm: &dyn Communicator,
    ) -> Result<NumberingReport, MeshNumberingError>;
}

/// Builds a transformer from its configuration.
pub type TransformerFactory = fn(NumberingConfig) -> Box<dyn MeshTransformer>;

/// Name-keyed transformer factories.
#[derive(Clone, Debug, Default)]
pub struct TransformerRegistry {
    builders: BTreeMap<&'static str, TransformerFactory>,
}

impl TransformerRegistry {
    /// Registry with the numbering transformers of this crate.
    pub fn with_builtins() -> Self {
        let mut registry = Self::default();
        registry.register("GlobalNumbering", build_global_numbering);
        registry.register("GlobalNumberingNodes", build_global_numbering_nodes);
        registry
    }

    /// Add or replace a factory; returns the one it replaced.
    pub fn register(
        &mut self,
        name: &'static str,
        factory: TransformerFactory,
    ) -> Option<TransformerFactory> {
        self.builders.insert(name, factory)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.builders.contains_key(name)
    }

    /// Registered names, sorted.
    pub fn names(&self) -> impl Iterator<Item = &'static str> + '_ {
        self.builders.keys().copied()
    }

    /// Build the transformer registered under `name`.
    pub fn build(
        &self,
        name: &str,
        config: NumberingConfig,
    ) -> Result<Box<dyn MeshTransformer>, MeshNumberingError> {
        self.builders
            .get(name)
            .map(|factory| factory(config))
            .ok_or_else(|| MeshNumberingError::UnknownTransformer(name.to_owned()))
    }
}

fn build_global_numbering(config: NumberingConfig) -> Box<dyn MeshTransformer> {
    Box::new(GlobalNumbering::new(config))
}

fn build_global_numbering_nodes(config: NumberingConfig) -> Box<dyn MeshTransformer> {
    Box::new(GlobalNumbering::nodes_only(config))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::algs::communicator::NoComm;
    use crate::data::entities::Entities;

    #[test]
    fn builtins_are_registered() {
        let registry = TransformerRegistry::with_builtins();
        assert_eq!(
            registry.names().collect::<Vec<_>>(),
            vec!["GlobalNumbering", "GlobalNumberingNodes"]
        );
        assert!(matches!(
            registry.build("CBuildArea", NumberingConfig::default()),
            Err(MeshNumberingError::UnknownTransformer(_))
        ));
    }

    #[test]
    fn built_transformer_numbers_a_mesh() {
        let registry = TransformerRegistry::with_builtins();
        let action = registry
            .build("GlobalNumberingNodes", NumberingConfig::default())
            .unwrap();
        assert_eq!(action.name(), "GlobalNumberingNodes");
        assert!(action.help().contains("coordinates hash"));

        let mut nodes = Entities::try_new(3).unwrap();
        nodes.try_push(&[0.0, 0.0, 0.0], false).unwrap();
        nodes.try_push(&[0.0, 0.0, 1.0], false).unwrap();
        let mut mesh = Mesh::from_nodes(nodes);
        let report = action.execute(&mut mesh, &NoComm).unwrap();
        assert_eq!(report.nodes.total, 2);
        assert_eq!(mesh.nodes.glb_idx(), &[0, 1]);
    }
}
