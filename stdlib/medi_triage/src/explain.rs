use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::Arc;

use crate::attribution::FeatureAttributor;
use crate::encoder::CategoryEncoder;
use crate::engine::TriageDecision;
use crate::error::Result;
use crate::level::TriageLevel;
use crate::model::TriageModel;
use crate::record::{PatientRecord, FEATURE_NAMES};

/// Number of features listed in a report
pub const TOP_FACTORS: usize = 3;

/// Which level an explanation is computed for
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ExplanationTarget {
    /// The level shown to the user, including safety-rule overrides
    #[default]
    Decision,
    /// The model's own prediction
    Model,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Polarity {
    #[serde(rename = "Critical factor")]
    Critical,
    #[serde(rename = "Protective factor")]
    Protective,
}

impl Polarity {
    pub fn of(contribution: f64) -> Polarity {
        if contribution > 0.0 {
            Polarity::Critical
        } else {
            Polarity::Protective
        }
    }
}

impl fmt::Display for Polarity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Polarity::Critical => "Critical factor",
            Polarity::Protective => "Protective factor",
        })
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RankedFactor {
    pub feature: String,
    pub polarity: Polarity,
    pub contribution: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExplanationReport {
    /// Level the factors were attributed toward
    pub explained_level: TriageLevel,
    /// Level the model predicted on its own
    pub model_level: TriageLevel,
    pub factors: Vec<RankedFactor>,
}

impl ExplanationReport {
    /// Header line followed by one `- feature: polarity` line per factor
    pub fn render(&self) -> String {
        let mut out = format!("Triage Level {} Decision Logic:\n", self.explained_level);
        for factor in &self.factors {
            out.push_str(&format!("- {}: {}\n", factor.feature, factor.polarity));
        }
        out
    }

    pub fn overrides_model(&self) -> bool {
        self.explained_level != self.model_level
    }
}

impl fmt::Display for ExplanationReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.render())
    }
}

/// Order features by absolute contribution, largest first. The sort is stable,
/// so equal magnitudes keep their column order.
pub fn rank_factors(contributions: &[f64], top: usize) -> Vec<RankedFactor> {
    let mut order: Vec<usize> = (0..contributions.len()).collect();
    order.sort_by(|&a, &b| contributions[b].abs().total_cmp(&contributions[a].abs()));
    order
        .into_iter()
        .take(top)
        .map(|i| RankedFactor {
            feature: FEATURE_NAMES.get(i).map_or_else(|| format!("feature_{i}"), |n| n.to_string()),
            polarity: Polarity::of(contributions[i]),
            contribution: contributions[i],
        })
        .collect()
}

/// Runs its own inference and attribution for a record
#[derive(Clone)]
pub struct ExplanationGenerator {
    model: Arc<dyn TriageModel>,
    encoder: Arc<dyn CategoryEncoder>,
    attributor: Arc<dyn FeatureAttributor>,
}

impl ExplanationGenerator {
    pub fn new(
        model: Arc<dyn TriageModel>,
        encoder: Arc<dyn CategoryEncoder>,
        attributor: Arc<dyn FeatureAttributor>,
    ) -> Self {
        Self {
            model,
            encoder,
            attributor,
        }
    }

    /// Explain the model's own prediction for `record`.
    pub fn explain(&self, record: &PatientRecord) -> Result<ExplanationReport> {
        self.explain_level(record, None)
    }

    /// Explain the level that was actually decided, which differs from the
    /// model's prediction when a safety rule fired.
    pub fn explain_decision(
        &self,
        record: &PatientRecord,
        decision: &TriageDecision,
    ) -> Result<ExplanationReport> {
        self.explain_level(record, Some(decision.triage_level))
    }

    pub fn explain_for(
        &self,
        record: &PatientRecord,
        decision: &TriageDecision,
        target: ExplanationTarget,
    ) -> Result<ExplanationReport> {
        match target {
            ExplanationTarget::Decision => self.explain_decision(record, decision),
            ExplanationTarget::Model => self.explain(record),
        }
    }

    fn explain_level(
        &self,
        record: &PatientRecord,
        level: Option<TriageLevel>,
    ) -> Result<ExplanationReport> {
        record.validate()?;
        let features = record.feature_vector(self.encoder.transform(&record.arrival_mode)?);
        let model_level = self.model.predict(&features)?;
        let explained_level = level.unwrap_or(model_level);
        if explained_level != model_level {
            log::debug!("explaining decided level {explained_level} instead of model level {model_level}");
        }

        let contributions = self.attributor.attribute(&features, explained_level)?;
        Ok(ExplanationReport {
            explained_level,
            model_level,
            factors: rank_factors(&contributions, TOP_FACTORS),
        })
    }
}
