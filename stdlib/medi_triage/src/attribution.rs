//! Feature attribution contract and the two output layouts it may produce.

use serde::{Deserialize, Serialize};

use crate::error::{Result, TriageError};
use crate::level::TriageLevel;

/// Which layout an attributor emits
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OutputLayout {
    #[default]
    PerClass,
    Tensor,
}

/// Raw attribution values for a batch of samples, in one of two conventions.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "layout", content = "values", rename_all = "snake_case")]
pub enum AttributionOutput {
    /// Indexed `[class][sample][feature]`
    PerClass(Vec<Vec<Vec<f64>>>),
    /// Indexed `[sample][feature][class]`
    Tensor(Vec<Vec<Vec<f64>>>),
}

impl AttributionOutput {
    pub fn layout(&self) -> OutputLayout {
        match self {
            AttributionOutput::PerClass(_) => OutputLayout::PerClass,
            AttributionOutput::Tensor(_) => OutputLayout::Tensor,
        }
    }

    /// Normalize to one signed contribution per feature for `sample` and `class`.
    pub fn contributions(&self, sample: usize, class: usize, n_features: usize) -> Result<Vec<f64>> {
        let values = match self {
            AttributionOutput::PerClass(per_class) => {
                let matrix = per_class.get(class).ok_or_else(|| {
                    shape_error(format!(
                        "no entry for class {class} in a list of {} classes",
                        per_class.len()
                    ))
                })?;
                matrix
                    .get(sample)
                    .ok_or_else(|| shape_error(format!("class {class} has no sample {sample}")))?
                    .clone()
            }
            AttributionOutput::Tensor(tensor) => {
                let matrix = tensor.get(sample).ok_or_else(|| {
                    shape_error(format!(
                        "tensor has {} samples, sample {sample} requested",
                        tensor.len()
                    ))
                })?;
                matrix
                    .iter()
                    .enumerate()
                    .map(|(feature, per_class)| {
                        per_class.get(class).copied().ok_or_else(|| {
                            shape_error(format!("feature {feature} has no value for class {class}"))
                        })
                    })
                    .collect::<Result<Vec<_>>>()?
            }
        };
        if values.len() != n_features {
            return Err(shape_error(format!(
                "expected {n_features} feature contributions, got {}",
                values.len()
            )));
        }
        Ok(values)
    }
}

fn shape_error(reason: String) -> TriageError {
    TriageError::AttributionShape(reason)
}

/// Computes per-feature attributions for a single encoded sample
pub trait FeatureAttributor: Send + Sync {
    /// Attributions for every class of the model
    fn shap_values(&self, features: &[f64]) -> Result<AttributionOutput>;

    /// Attributions toward one class, whichever layout the backend produced
    fn attribute(&self, features: &[f64], class: TriageLevel) -> Result<Vec<f64>> {
        self.shap_values(features)?
            .contributions(0, class.index(), features.len())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn both_layouts_normalize_to_the_same_vector() {
        // two classes, three features
        let per_class = AttributionOutput::PerClass(vec![
            vec![vec![0.1, 0.2, 0.3]],
            vec![vec![-0.1, 0.5, 0.0]],
        ]);
        let tensor = AttributionOutput::Tensor(vec![vec![
            vec![0.1, -0.1],
            vec![0.2, 0.5],
            vec![0.3, 0.0],
        ]]);
        for class in 0..2 {
            assert_eq!(
                per_class.contributions(0, class, 3).unwrap(),
                tensor.contributions(0, class, 3).unwrap()
            );
        }
    }

    #[test]
    fn missing_class_is_a_shape_error() {
        let out = AttributionOutput::PerClass(vec![vec![vec![0.1, 0.2]]]);
        let err = out.contributions(0, 3, 2).unwrap_err();
        assert!(matches!(err, TriageError::AttributionShape(_)));

        let out = AttributionOutput::Tensor(vec![vec![vec![0.1], vec![0.2]]]);
        assert!(out.contributions(0, 1, 2).is_err());
    }

    #[test]
    fn feature_count_mismatch_is_a_shape_error() {
        let out = AttributionOutput::Tensor(vec![vec![vec![0.1, 0.2]]]);
        assert!(matches!(
            out.contributions(0, 0, 9),
            Err(TriageError::AttributionShape(_))
        ));
    }

    #[test]
    fn layout_tag_round_trips_through_json() {
        let out = AttributionOutput::Tensor(vec![vec![vec![1.0]]]);
        let json = serde_json::to_value(&out).unwrap();
        assert_eq!(json["layout"], "tensor");
        let back: AttributionOutput = serde_json::from_value(json).unwrap();
        assert_eq!(back.layout(), OutputLayout::Tensor);
    }
}
