//! Decision engine: hard safety rules first, the model otherwise, and an
//! independent department routing over raw vitals.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::Arc;

use crate::encoder::CategoryEncoder;
use crate::error::Result;
use crate::level::TriageLevel;
use crate::model::TriageModel;
use crate::record::PatientRecord;

/// Hard thresholds that override the model
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum SafetyRule {
    LowOxygenSaturation,
    SevereHypertension,
}

impl SafetyRule {
    pub const SPO2_CRITICAL_BELOW: f64 = 90.0;
    pub const SBP_CRITICAL_ABOVE: f64 = 190.0;

    /// First matching rule, in priority order
    pub fn evaluate(record: &PatientRecord) -> Option<SafetyRule> {
        if record.oxygen_saturation < Self::SPO2_CRITICAL_BELOW {
            Some(SafetyRule::LowOxygenSaturation)
        } else if record.systolic_blood_pressure > Self::SBP_CRITICAL_ABOVE {
            Some(SafetyRule::SevereHypertension)
        } else {
            None
        }
    }

    pub fn level(self) -> TriageLevel {
        TriageLevel::CRITICAL
    }

    pub fn reason(self) -> &'static str {
        match self {
            SafetyRule::LowOxygenSaturation => "CRITICAL: Low Oxygen Saturation",
            SafetyRule::SevereHypertension => "CRITICAL: Severe Hypertension",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Department {
    #[serde(rename = "Pulmonology / Respiratory")]
    Pulmonology,
    #[serde(rename = "Cardiology")]
    Cardiology,
    #[serde(rename = "Emergency / Trauma")]
    EmergencyTrauma,
    #[serde(rename = "General Medicine")]
    GeneralMedicine,
}

impl Department {
    /// Route on vitals alone, regardless of the triage level.
    pub fn route(record: &PatientRecord) -> Department {
        if record.oxygen_saturation < 92.0 {
            Department::Pulmonology
        } else if record.heart_rate > 120.0 || record.systolic_blood_pressure > 160.0 {
            Department::Cardiology
        } else if record.pain_level >= 8 {
            Department::EmergencyTrauma
        } else {
            Department::GeneralMedicine
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Department::Pulmonology => "Pulmonology / Respiratory",
            Department::Cardiology => "Cardiology",
            Department::EmergencyTrauma => "Emergency / Trauma",
            Department::GeneralMedicine => "General Medicine",
        }
    }
}

impl fmt::Display for Department {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum DecisionSource {
    #[serde(rename = "Safety Rule")]
    SafetyRule,
    #[serde(rename = "ML Model")]
    Model,
}

impl fmt::Display for DecisionSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            DecisionSource::SafetyRule => "Safety Rule",
            DecisionSource::Model => "ML Model",
        })
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TriageDecision {
    pub triage_level: TriageLevel,
    pub department: Department,
    pub source: DecisionSource,
    pub reason: Option<String>,
}

/// Classifies one record at a time against shared, read-only artifacts
#[derive(Clone)]
pub struct DecisionEngine {
    model: Arc<dyn TriageModel>,
    encoder: Arc<dyn CategoryEncoder>,
}

impl DecisionEngine {
    pub fn new(model: Arc<dyn TriageModel>, encoder: Arc<dyn CategoryEncoder>) -> Self {
        Self { model, encoder }
    }

    pub fn process(&self, record: &PatientRecord) -> Result<TriageDecision> {
        record.validate()?;
        // Encoding runs even when a rule fires so unseen categories always fail.
        let arrival_code = self.encoder.transform(&record.arrival_mode)?;
        let department = Department::route(record);

        let decision = match SafetyRule::evaluate(record) {
            Some(rule) => {
                log::debug!("safety rule {rule:?} fired, model not consulted");
                TriageDecision {
                    triage_level: rule.level(),
                    department,
                    source: DecisionSource::SafetyRule,
                    reason: Some(rule.reason().to_string()),
                }
            }
            None => {
                let features = record.feature_vector(arrival_code);
                let level = self.model.predict(&features)?;
                log::debug!("model '{}' predicted level {level}", self.model.name());
                TriageDecision {
                    triage_level: level,
                    department,
                    source: DecisionSource::Model,
                    reason: None,
                }
            }
        };
        Ok(decision)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::encoder::LabelEncoder;
    use crate::error::TriageError;
    use std::sync::atomic::{AtomicUsize, Ordering};

    /// Always predicts the same level and counts its calls
    struct FixedModel {
        level: u8,
        calls: AtomicUsize,
    }

    impl TriageModel for FixedModel {
        fn name(&self) -> &str {
            "fixed"
        }

        fn predict(&self, _features: &[f64]) -> Result<TriageLevel> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            TriageLevel::try_from(self.level)
        }
    }

    fn engine(level: u8) -> (DecisionEngine, Arc<FixedModel>) {
        let model = Arc::new(FixedModel {
            level,
            calls: AtomicUsize::new(0),
        });
        let encoder = Arc::new(LabelEncoder::new(["ambulance", "walk_in", "wheelchair"]).unwrap());
        (DecisionEngine::new(model.clone(), encoder), model)
    }

    fn nominal() -> PatientRecord {
        PatientRecord {
            age: 45.0,
            heart_rate: 80.0,
            systolic_blood_pressure: 120.0,
            oxygen_saturation: 98.0,
            body_temperature: 37.0,
            pain_level: 5,
            chronic_disease_count: 0,
            previous_er_visits: 0,
            arrival_mode: "walk_in".into(),
        }
    }

    #[test]
    fn low_oxygen_overrides_model() {
        let (engine, model) = engine(0);
        let record = PatientRecord {
            oxygen_saturation: 88.0,
            ..nominal()
        };
        let decision = engine.process(&record).unwrap();
        assert_eq!(decision.triage_level, TriageLevel::CRITICAL);
        assert_eq!(decision.source, DecisionSource::SafetyRule);
        assert!(decision.reason.unwrap().contains("Low Oxygen Saturation"));
        assert_eq!(decision.department, Department::Pulmonology);
        assert_eq!(model.calls.load(Ordering::SeqCst), 0);
    }

    #[test]
    fn oxygen_rule_takes_priority_over_hypertension() {
        let (engine, _) = engine(1);
        let record = PatientRecord {
            oxygen_saturation: 85.0,
            systolic_blood_pressure: 210.0,
            ..nominal()
        };
        let decision = engine.process(&record).unwrap();
        assert_eq!(
            decision.reason.as_deref(),
            Some("CRITICAL: Low Oxygen Saturation")
        );
    }

    #[test]
    fn severe_hypertension_routes_to_cardiology() {
        let (engine, _) = engine(1);
        let record = PatientRecord {
            systolic_blood_pressure: 200.0,
            oxygen_saturation: 95.0,
            ..nominal()
        };
        let decision = engine.process(&record).unwrap();
        assert_eq!(decision.triage_level.value(), 3);
        assert_eq!(decision.reason.as_deref(), Some("CRITICAL: Severe Hypertension"));
        assert_eq!(decision.department, Department::Cardiology);
    }

    #[test]
    fn thresholds_are_strict() {
        let (engine, _) = engine(1);
        let record = PatientRecord {
            oxygen_saturation: 90.0,
            systolic_blood_pressure: 190.0,
            ..nominal()
        };
        let decision = engine.process(&record).unwrap();
        assert_eq!(decision.source, DecisionSource::Model);
        assert_eq!(decision.reason, None);
        assert_eq!(decision.triage_level.value(), 1);
    }

    #[test]
    fn model_level_passes_through_unchanged() {
        for level in 0..4u8 {
            let (engine, model) = engine(level);
            let decision = engine.process(&nominal()).unwrap();
            assert_eq!(decision.triage_level.value(), level);
            assert_eq!(decision.source, DecisionSource::Model);
            assert_eq!(model.calls.load(Ordering::SeqCst), 1);
        }
    }

    #[test]
    fn department_routing_order() {
        let cases = [
            (PatientRecord { oxygen_saturation: 91.0, heart_rate: 150.0, ..nominal() }, Department::Pulmonology),
            (PatientRecord { heart_rate: 121.0, pain_level: 9, ..nominal() }, Department::Cardiology),
            (PatientRecord { systolic_blood_pressure: 161.0, ..nominal() }, Department::Cardiology),
            (PatientRecord { pain_level: 8, ..nominal() }, Department::EmergencyTrauma),
            (PatientRecord { heart_rate: 120.0, systolic_blood_pressure: 160.0, pain_level: 7, ..nominal() }, Department::GeneralMedicine),
        ];
        for (record, expected) in cases {
            assert_eq!(Department::route(&record), expected, "{record:?}");
        }
    }

    #[test]
    fn unseen_arrival_mode_fails_even_when_a_rule_fires() {
        let (engine, _) = engine(0);
        let record = PatientRecord {
            oxygen_saturation: 80.0,
            arrival_mode: "helicopter".into(),
            ..nominal()
        };
        let err = engine.process(&record).unwrap_err();
        assert!(matches!(err, TriageError::UnknownCategory { .. }));
    }

    #[test]
    fn decision_serializes_with_display_labels() {
        let (engine, _) = engine(2);
        let json = serde_json::to_value(engine.process(&nominal()).unwrap()).unwrap();
        assert_eq!(json["source"], "ML Model");
        assert_eq!(json["department"], "General Medicine");
        assert_eq!(json["triage_level"], 2);
        assert!(json["reason"].is_null());
    }
}
