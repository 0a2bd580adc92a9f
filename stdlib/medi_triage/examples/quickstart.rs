use medi_triage::{OutputLayout, PatientRecord, TriageArtifacts, TriageConfig};
use serde_json::json;

fn main() -> Result<(), Box<dyn std::error::Error>> {
    env_logger::init();

    // Run from the workspace root so the default model paths resolve.
    let config = TriageConfig::load(None)?;
    let artifacts = TriageArtifacts::load(&config.artifacts)?;

    let record = PatientRecord::from_json(&json!({
        "age": 75.0, "heart_rate": 110.0, "systolic_blood_pressure": 150.0,
        "oxygen_saturation": 93.0, "body_temperature": 38.5, "pain_level": 7,
        "chronic_disease_count": 3, "previous_er_visits": 2, "arrival_mode": "ambulance"
    }))?;

    let decision = artifacts.decision_engine().process(&record)?;
    println!(
        "level={} department={} source={}",
        decision.triage_level, decision.department, decision.source
    );

    let report = artifacts
        .explanation_generator(OutputLayout::PerClass)
        .explain_decision(&record, &decision)?;
    print!("{report}");
    Ok(())
}
