use medi_triage::{LabelEncoder, PatientRecord, TreeEnsemble, TriageArtifacts};
use serde_json::json;

#[allow(dead_code)]
pub const MODEL_JSON: &str = include_str!("../../../../models/risk_model.json");
#[allow(dead_code)]
pub const ENCODER_JSON: &str = include_str!("../../../../models/label_encoder.json");

/// The model and encoder shipped in `models/`
#[allow(dead_code)]
pub fn bundled_artifacts() -> TriageArtifacts {
    let model: TreeEnsemble = serde_json::from_str(MODEL_JSON).expect("model fixture parses");
    let encoder: LabelEncoder = serde_json::from_str(ENCODER_JSON).expect("encoder fixture parses");
    TriageArtifacts::new(model, encoder).expect("bundled artifacts are well formed")
}

/// Intake form defaults
#[allow(dead_code)]
pub fn nominal() -> PatientRecord {
    PatientRecord::from_json(&json!({
        "age": 45.0, "heart_rate": 80.0, "systolic_blood_pressure": 120.0,
        "oxygen_saturation": 98.0, "body_temperature": 37.0, "pain_level": 5,
        "chronic_disease_count": 0, "previous_er_visits": 0, "arrival_mode": "walk_in"
    }))
    .expect("nominal record")
}

/// Elderly ambulance arrival with borderline vitals
#[allow(dead_code)]
pub fn elderly_ambulance() -> PatientRecord {
    PatientRecord::from_json(&json!({
        "age": 75.0, "heart_rate": 110.0, "systolic_blood_pressure": 150.0,
        "oxygen_saturation": 93.0, "body_temperature": 38.5, "pain_level": 7,
        "chronic_disease_count": 3, "previous_er_visits": 2, "arrival_mode": "ambulance"
    }))
    .expect("elderly record")
}
