//! Model and encoder loaded once at startup and shared read-only by the
//! decision engine and the explanation generator.

use std::sync::Arc;

use crate::attribution::OutputLayout;
use crate::config::ArtifactPaths;
use crate::encoder::LabelEncoder;
use crate::engine::DecisionEngine;
use crate::error::{Result, TriageError};
use crate::explain::ExplanationGenerator;
use crate::model::TreeEnsemble;
use crate::treeshap::TreeShap;

#[derive(Debug, Clone)]
pub struct TriageArtifacts {
    model: Arc<TreeEnsemble>,
    encoder: Arc<LabelEncoder>,
}

impl TriageArtifacts {
    /// Wrap artifacts built in memory. The model is checked here so a
    /// malformed ensemble never reaches inference.
    pub fn new(model: TreeEnsemble, encoder: LabelEncoder) -> Result<Self> {
        model.check().map_err(TriageError::InvalidArtifact)?;
        Ok(Self::shared(model, encoder))
    }

    /// Load both artifacts. Any failure is fatal; nothing is retried.
    pub fn load(paths: &ArtifactPaths) -> Result<Self> {
        let model = TreeEnsemble::load_model(&paths.model)?;
        let encoder = LabelEncoder::load(&paths.encoder)?;
        Ok(Self::shared(model, encoder))
    }

    fn shared(model: TreeEnsemble, encoder: LabelEncoder) -> Self {
        Self {
            model: Arc::new(model),
            encoder: Arc::new(encoder),
        }
    }

    pub fn model(&self) -> &TreeEnsemble {
        &self.model
    }

    pub fn encoder(&self) -> &LabelEncoder {
        &self.encoder
    }

    pub fn decision_engine(&self) -> DecisionEngine {
        DecisionEngine::new(self.model.clone(), self.encoder.clone())
    }

    pub fn explanation_generator(&self, layout: OutputLayout) -> ExplanationGenerator {
        let attributor = TreeShap::new(self.model.clone()).with_layout(layout);
        ExplanationGenerator::new(
            self.model.clone(),
            self.encoder.clone(),
            Arc::new(attributor),
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::tests::toy_ensemble;

    fn encoder() -> LabelEncoder {
        LabelEncoder::new(["ambulance", "walk_in"]).unwrap()
    }

    #[test]
    fn accepts_a_well_formed_model() {
        let artifacts = TriageArtifacts::new(toy_ensemble(), encoder()).unwrap();
        assert_eq!(artifacts.model().model_name, "toy");
    }

    #[test]
    fn rejects_tree_for_unknown_class() {
        let mut model = toy_ensemble();
        model.trees[0].class = 7;
        let err = TriageArtifacts::new(model, encoder()).unwrap_err();
        assert!(matches!(err, TriageError::InvalidArtifact(_)));
        assert!(!err.is_validation());
    }

    #[test]
    fn rejects_tree_without_nodes() {
        let mut model = toy_ensemble();
        model.trees[1].nodes.clear();
        let err = TriageArtifacts::new(model, encoder()).unwrap_err();
        assert!(err.to_string().contains("has no nodes"));
    }
}
