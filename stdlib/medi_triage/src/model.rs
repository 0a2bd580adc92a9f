//! Triage classifier contract and the gradient-boosted tree ensemble behind it.

use serde::{Deserialize, Serialize};
use std::fs::read_to_string;
use std::path::Path;

use crate::error::{Result, TriageError};
use crate::level::TriageLevel;
use crate::record::FEATURE_NAMES;

/// A classifier that maps an encoded feature vector to a triage level
pub trait TriageModel: Send + Sync {
    fn name(&self) -> &str;

    fn predict(&self, features: &[f64]) -> Result<TriageLevel>;
}

/// A node of a regression tree. Samples with `x[feature] < threshold` go left.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum TreeNode {
    Split {
        feature: usize,
        threshold: f64,
        left: usize,
        right: usize,
        cover: f64,
    },
    Leaf {
        value: f64,
        cover: f64,
    },
}

impl TreeNode {
    /// Training samples that reached this node
    pub fn cover(&self) -> f64 {
        match self {
            TreeNode::Split { cover, .. } | TreeNode::Leaf { cover, .. } => *cover,
        }
    }
}

/// One boosted tree contributing to the margin of `class`. Node 0 is the root.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Tree {
    pub class: usize,
    pub nodes: Vec<TreeNode>,
}

impl Tree {
    pub fn root(&self) -> &TreeNode {
        &self.nodes[0]
    }

    pub fn leaf_value(&self, features: &[f64]) -> f64 {
        let mut node = self.root();
        loop {
            match node {
                TreeNode::Leaf { value, .. } => return *value,
                TreeNode::Split {
                    feature,
                    threshold,
                    left,
                    right,
                    ..
                } => {
                    let next = if features[*feature] < *threshold {
                        *left
                    } else {
                        *right
                    };
                    node = &self.nodes[next];
                }
            }
        }
    }

    /// Cover-weighted mean leaf value
    pub fn expected_value(&self) -> f64 {
        let total = self.root().cover();
        self.nodes
            .iter()
            .filter_map(|n| match n {
                TreeNode::Leaf { value, cover } => Some(value * cover / total),
                TreeNode::Split { .. } => None,
            })
            .sum()
    }

    fn check(&self, index: usize, n_features: usize, n_classes: usize) -> std::result::Result<(), String> {
        if self.class >= n_classes {
            return Err(format!("tree {index} targets class {} of {n_classes}", self.class));
        }
        if self.nodes.is_empty() {
            return Err(format!("tree {index} has no nodes"));
        }
        for (i, node) in self.nodes.iter().enumerate() {
            if !(node.cover() > 0.0) {
                return Err(format!("tree {index} node {i} has non-positive cover"));
            }
            if let TreeNode::Split {
                feature,
                threshold,
                left,
                right,
                ..
            } = node
            {
                if *feature >= n_features {
                    return Err(format!("tree {index} node {i} splits on unknown feature {feature}"));
                }
                if !threshold.is_finite() {
                    return Err(format!("tree {index} node {i} has a non-finite threshold"));
                }
                // Children after their parent rules out cycles.
                for child in [*left, *right] {
                    if child <= i || child >= self.nodes.len() {
                        return Err(format!("tree {index} node {i} has invalid child {child}"));
                    }
                }
            }
        }
        Ok(())
    }
}

/// Multi-class boosted tree ensemble. Each class margin is `base_score` plus the
/// leaf values of that class's trees; the predicted class is the largest margin.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TreeEnsemble {
    pub model_name: String,
    pub feature_names: Vec<String>,
    pub n_classes: usize,
    #[serde(default = "default_base_score")]
    pub base_score: f64,
    pub trees: Vec<Tree>,
}

fn default_base_score() -> f64 {
    0.5
}

impl TreeEnsemble {
    pub fn load_model(path: impl AsRef<Path>) -> Result<TreeEnsemble> {
        let path = path.as_ref();
        let s = read_to_string(path).map_err(|e| TriageError::artifact(path, e))?;
        let model: TreeEnsemble =
            serde_json::from_str(&s).map_err(|e| TriageError::artifact(path, e))?;
        model.check().map_err(|reason| TriageError::artifact(path, reason))?;
        log::info!(
            "loaded model '{}' from {} ({} trees, {} classes)",
            model.model_name,
            path.display(),
            model.trees.len(),
            model.n_classes
        );
        Ok(model)
    }

    /// Structural validation: feature layout, class count and tree shape.
    pub fn check(&self) -> std::result::Result<(), String> {
        if self.feature_names.iter().map(String::as_str).ne(FEATURE_NAMES) {
            return Err(format!(
                "feature columns {:?} do not match the intake layout {:?}",
                self.feature_names, FEATURE_NAMES
            ));
        }
        // Rule decisions explain level 3, so every level needs its own margin.
        if self.n_classes != TriageLevel::COUNT {
            return Err(format!(
                "model has {} classes, expected {}",
                self.n_classes,
                TriageLevel::COUNT
            ));
        }
        for (index, tree) in self.trees.iter().enumerate() {
            tree.check(index, self.feature_names.len(), self.n_classes)?;
        }
        Ok(())
    }

    pub fn n_features(&self) -> usize {
        self.feature_names.len()
    }

    /// Raw per-class scores before the arg-max
    pub fn margins(&self, features: &[f64]) -> Result<Vec<f64>> {
        if features.len() != self.n_features() {
            return Err(TriageError::Inference(format!(
                "expected {} features, got {}",
                self.n_features(),
                features.len()
            )));
        }
        let mut margins = vec![self.base_score; self.n_classes];
        for tree in &self.trees {
            margins[tree.class] += tree.leaf_value(features);
        }
        Ok(margins)
    }
}

impl TriageModel for TreeEnsemble {
    fn name(&self) -> &str {
        &self.model_name
    }

    fn predict(&self, features: &[f64]) -> Result<TriageLevel> {
        let margins = self.margins(features)?;
        // First maximum wins, so ties resolve to the lower level.
        let class = margins
            .iter()
            .enumerate()
            .fold(0, |best, (i, m)| if *m > margins[best] { i } else { best });
        log::debug!("model '{}' margins {:?} -> class {}", self.model_name, margins, class);
        TriageLevel::try_from(class)
    }
}
