//! Exact path-dependent TreeSHAP over a [`TreeEnsemble`].
//!
//! For each tree the recursion walks every root-to-leaf path while tracking,
//! for the features split on so far, the fraction of training cover that flows
//! down the path when the feature is unknown (`zero_fraction`) and whether the
//! sample itself follows the path (`one_fraction`). Path weights are the
//! Shapley permutation weights, so the sum of contributions plus the expected
//! value reproduces the class margin exactly.

use std::sync::Arc;

use crate::attribution::{AttributionOutput, FeatureAttributor, OutputLayout};
use crate::error::{Result, TriageError};
use crate::model::{Tree, TreeEnsemble, TreeNode};

#[derive(Debug, Clone, Copy)]
struct PathElement {
    feature: Option<usize>,
    zero_fraction: f64,
    one_fraction: f64,
    pweight: f64,
}

/// TreeSHAP explainer bound to one model
#[derive(Debug, Clone)]
pub struct TreeShap {
    model: Arc<TreeEnsemble>,
    layout: OutputLayout,
}

impl TreeShap {
    pub fn new(model: Arc<TreeEnsemble>) -> Self {
        Self {
            model,
            layout: OutputLayout::default(),
        }
    }

    pub fn with_layout(mut self, layout: OutputLayout) -> Self {
        self.layout = layout;
        self
    }

    /// Margin each class takes when no feature is known
    pub fn expected_values(&self) -> Vec<f64> {
        let mut base = vec![self.model.base_score; self.model.n_classes];
        for tree in &self.model.trees {
            base[tree.class] += tree.expected_value();
        }
        base
    }

    /// Contributions indexed `[class][feature]`
    pub fn class_contributions(&self, features: &[f64]) -> Result<Vec<Vec<f64>>> {
        let n_features = self.model.n_features();
        if features.len() != n_features {
            return Err(TriageError::Inference(format!(
                "expected {n_features} features, got {}",
                features.len()
            )));
        }
        let mut phi = vec![vec![0.0; n_features]; self.model.n_classes];
        for tree in &self.model.trees {
            tree_shap(tree, features, &mut phi[tree.class]);
        }
        Ok(phi)
    }
}

impl FeatureAttributor for TreeShap {
    fn shap_values(&self, features: &[f64]) -> Result<AttributionOutput> {
        let phi = self.class_contributions(features)?;
        Ok(match self.layout {
            OutputLayout::PerClass => {
                AttributionOutput::PerClass(phi.into_iter().map(|row| vec![row]).collect())
            }
            OutputLayout::Tensor => {
                let sample = (0..features.len())
                    .map(|f| phi.iter().map(|row| row[f]).collect())
                    .collect();
                AttributionOutput::Tensor(vec![sample])
            }
        })
    }
}

fn tree_shap(tree: &Tree, features: &[f64], phi: &mut [f64]) {
    recurse(tree, 0, features, phi, Vec::new(), 1.0, 1.0, None);
}

#[allow(clippy::too_many_arguments)]
fn recurse(
    tree: &Tree,
    node: usize,
    features: &[f64],
    phi: &mut [f64],
    mut path: Vec<PathElement>,
    zero_fraction: f64,
    one_fraction: f64,
    feature: Option<usize>,
) {
    extend_path(&mut path, zero_fraction, one_fraction, feature);

    match &tree.nodes[node] {
        TreeNode::Leaf { value, .. } => {
            for i in 1..path.len() {
                let w = unwound_path_sum(&path, i);
                let el = path[i];
                if let Some(f) = el.feature {
                    phi[f] += w * (el.one_fraction - el.zero_fraction) * value;
                }
            }
        }
        TreeNode::Split {
            feature: split,
            threshold,
            left,
            right,
            cover,
        } => {
            let (hot, cold) = if features[*split] < *threshold {
                (*left, *right)
            } else {
                (*right, *left)
            };
            let hot_zero = tree.nodes[hot].cover() / cover;
            let cold_zero = tree.nodes[cold].cover() / cover;

            // A feature split on twice keeps a single path entry.
            let mut incoming_zero = 1.0;
            let mut incoming_one = 1.0;
            if let Some(k) = (1..path.len()).find(|&k| path[k].feature == Some(*split)) {
                incoming_zero = path[k].zero_fraction;
                incoming_one = path[k].one_fraction;
                unwind_path(&mut path, k);
            }

            recurse(
                tree,
                hot,
                features,
                phi,
                path.clone(),
                hot_zero * incoming_zero,
                incoming_one,
                Some(*split),
            );
            recurse(
                tree,
                cold,
                features,
                phi,
                path,
                cold_zero * incoming_zero,
                0.0,
                Some(*split),
            );
        }
    }
}

fn extend_path(path: &mut Vec<PathElement>, zero_fraction: f64, one_fraction: f64, feature: Option<usize>) {
    let depth = path.len();
    path.push(PathElement {
        feature,
        zero_fraction,
        one_fraction,
        pweight: if depth == 0 { 1.0 } else { 0.0 },
    });
    let d = depth as f64;
    for i in (0..depth).rev() {
        path[i + 1].pweight += one_fraction * path[i].pweight * (i as f64 + 1.0) / (d + 1.0);
        path[i].pweight = zero_fraction * path[i].pweight * (d - i as f64) / (d + 1.0);
    }
}

fn unwind_path(path: &mut Vec<PathElement>, index: usize) {
    let depth = path.len() - 1;
    let d = depth as f64;
    let one_fraction = path[index].one_fraction;
    let zero_fraction = path[index].zero_fraction;
    let mut next_one_portion = path[depth].pweight;

    for i in (0..depth).rev() {
        if one_fraction != 0.0 {
            let tmp = path[i].pweight;
            path[i].pweight = next_one_portion * (d + 1.0) / ((i as f64 + 1.0) * one_fraction);
            next_one_portion = tmp - path[i].pweight * zero_fraction * (d - i as f64) / (d + 1.0);
        } else {
            path[i].pweight = path[i].pweight * (d + 1.0) / (zero_fraction * (d - i as f64));
        }
    }

    for i in index..depth {
        path[i].feature = path[i + 1].feature;
        path[i].zero_fraction = path[i + 1].zero_fraction;
        path[i].one_fraction = path[i + 1].one_fraction;
    }
    path.pop();
}

fn unwound_path_sum(path: &[PathElement], index: usize) -> f64 {
    let depth = path.len() - 1;
    let d = depth as f64;
    let one_fraction = path[index].one_fraction;
    let zero_fraction = path[index].zero_fraction;
    let mut next_one_portion = path[depth].pweight;
    let mut total = 0.0;

    for i in (0..depth).rev() {
        if one_fraction != 0.0 {
            let tmp = next_one_portion * (d + 1.0) / ((i as f64 + 1.0) * one_fraction);
            total += tmp;
            next_one_portion = path[i].pweight - tmp * zero_fraction * ((d - i as f64) / (d + 1.0));
        } else if zero_fraction != 0.0 {
            total += (path[i].pweight / zero_fraction) / ((d - i as f64) / (d + 1.0));
        }
    }
    total
}
