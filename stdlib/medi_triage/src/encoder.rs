//! Categorical encoding for the arrival mode column.

use serde::{Deserialize, Serialize};
use std::fs::read_to_string;
use std::path::Path;

use crate::error::{Result, TriageError};
use crate::record::ARRIVAL_MODE;

/// Maps a category label to the integer code the model was trained on
pub trait CategoryEncoder: Send + Sync {
    fn transform(&self, category: &str) -> Result<usize>;

    /// Known labels, in code order
    fn classes(&self) -> &[String];
}

/// Label encoder: classes are kept sorted and a label's code is its index.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "RawLabelEncoder")]
pub struct LabelEncoder {
    classes: Vec<String>,
}

#[derive(Deserialize)]
struct RawLabelEncoder {
    classes: Vec<String>,
}

impl TryFrom<RawLabelEncoder> for LabelEncoder {
    type Error = TriageError;

    fn try_from(raw: RawLabelEncoder) -> Result<Self> {
        LabelEncoder::new(raw.classes)
    }
}

impl LabelEncoder {
    pub fn new<I, S>(classes: I) -> Result<Self>
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let mut classes: Vec<String> = classes.into_iter().map(Into::into).collect();
        classes.sort();
        classes.dedup();
        if classes.is_empty() {
            return Err(TriageError::InvalidArtifact(
                "label encoder has no classes".into(),
            ));
        }
        Ok(Self { classes })
    }

    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let s = read_to_string(path).map_err(|e| TriageError::artifact(path, e))?;
        let encoder: LabelEncoder =
            serde_json::from_str(&s).map_err(|e| TriageError::artifact(path, e))?;
        log::info!(
            "loaded label encoder from {} ({} classes)",
            path.display(),
            encoder.classes.len()
        );
        Ok(encoder)
    }
}

impl CategoryEncoder for LabelEncoder {
    fn transform(&self, category: &str) -> Result<usize> {
        self.classes
            .binary_search_by(|c| c.as_str().cmp(category))
            .map_err(|_| TriageError::UnknownCategory {
                field: ARRIVAL_MODE.to_string(),
                value: category.to_string(),
                expected: self.classes.clone(),
            })
    }

    fn classes(&self) -> &[String] {
        &self.classes
    }
}
