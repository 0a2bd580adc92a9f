//! Patient intake record and its model feature layout.

use serde::Serialize;
use serde_json::{Map, Value as JsonValue};

use crate::error::{Result, TriageError};

pub const N_FEATURES: usize = 9;

/// Model input columns, in order. The categorical column is last.
pub const FEATURE_NAMES: [&str; N_FEATURES] = [
    "age",
    "heart_rate",
    "systolic_blood_pressure",
    "oxygen_saturation",
    "body_temperature",
    "pain_level",
    "chronic_disease_count",
    "previous_er_visits",
    "arrival_mode",
];

pub const ARRIVAL_MODE: &str = "arrival_mode";
pub const ARRIVAL_MODE_INDEX: usize = 8;

/// One patient's intake values. Every field is required.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PatientRecord {
    pub age: f64,
    pub heart_rate: f64,
    pub systolic_blood_pressure: f64,
    pub oxygen_saturation: f64,
    pub body_temperature: f64,
    pub pain_level: u8,
    pub chronic_disease_count: u32,
    pub previous_er_visits: u32,
    pub arrival_mode: String,
}

impl PatientRecord {
    /// Build a record from a JSON object, rejecting missing, unknown or mistyped keys.
    pub fn from_json(value: &JsonValue) -> Result<Self> {
        let obj = value
            .as_object()
            .ok_or_else(|| TriageError::invalid("record", "expected a JSON object"))?;

        if let Some(name) = FEATURE_NAMES.iter().find(|name| !obj.contains_key(**name)) {
            return Err(TriageError::MissingField(name.to_string()));
        }
        if let Some(extra) = obj.keys().find(|k| !FEATURE_NAMES.contains(&k.as_str())) {
            return Err(TriageError::invalid(extra.as_str(), "unknown field"));
        }

        let record = PatientRecord {
            age: number(obj, "age")?,
            heart_rate: number(obj, "heart_rate")?,
            systolic_blood_pressure: number(obj, "systolic_blood_pressure")?,
            oxygen_saturation: number(obj, "oxygen_saturation")?,
            body_temperature: number(obj, "body_temperature")?,
            pain_level: u8::try_from(count(obj, "pain_level")?)
                .map_err(|_| TriageError::invalid("pain_level", "must be between 1 and 10"))?,
            chronic_disease_count: u32::try_from(count(obj, "chronic_disease_count")?)
                .map_err(|_| TriageError::invalid("chronic_disease_count", "out of range"))?,
            previous_er_visits: u32::try_from(count(obj, "previous_er_visits")?)
                .map_err(|_| TriageError::invalid("previous_er_visits", "out of range"))?,
            arrival_mode: obj[ARRIVAL_MODE]
                .as_str()
                .ok_or_else(|| TriageError::invalid(ARRIVAL_MODE, "expected a string"))?
                .to_string(),
        };
        record.validate()?;
        Ok(record)
    }

    pub fn from_json_str(text: &str) -> Result<Self> {
        let value: JsonValue = serde_json::from_str(text)
            .map_err(|e| TriageError::invalid("record", format!("malformed JSON: {e}")))?;
        Self::from_json(&value)
    }

    /// Check the value domains of every field.
    pub fn validate(&self) -> Result<()> {
        let measurements = [
            ("age", self.age),
            ("heart_rate", self.heart_rate),
            ("systolic_blood_pressure", self.systolic_blood_pressure),
            ("oxygen_saturation", self.oxygen_saturation),
            ("body_temperature", self.body_temperature),
        ];
        for (field, value) in measurements {
            if !value.is_finite() {
                return Err(TriageError::invalid(field, "must be a finite number"));
            }
        }
        if self.age < 0.0 {
            return Err(TriageError::invalid("age", "must not be negative"));
        }
        if !(0.0..=100.0).contains(&self.oxygen_saturation) {
            return Err(TriageError::invalid(
                "oxygen_saturation",
                "must be a percentage between 0 and 100",
            ));
        }
        if !(1..=10).contains(&self.pain_level) {
            return Err(TriageError::invalid("pain_level", "must be between 1 and 10"));
        }
        if self.arrival_mode.trim().is_empty() {
            return Err(TriageError::MissingField(ARRIVAL_MODE.to_string()));
        }
        Ok(())
    }

    /// Feature vector in [`FEATURE_NAMES`] order with the arrival mode already encoded.
    pub fn feature_vector(&self, arrival_code: usize) -> [f64; N_FEATURES] {
        [
            self.age,
            self.heart_rate,
            self.systolic_blood_pressure,
            self.oxygen_saturation,
            self.body_temperature,
            f64::from(self.pain_level),
            f64::from(self.chronic_disease_count),
            f64::from(self.previous_er_visits),
            arrival_code as f64,
        ]
    }
}

fn number(obj: &Map<String, JsonValue>, field: &str) -> Result<f64> {
    obj[field]
        .as_f64()
        .ok_or_else(|| TriageError::invalid(field, "expected a number"))
}

fn count(obj: &Map<String, JsonValue>, field: &str) -> Result<u64> {
    obj[field]
        .as_u64()
        .ok_or_else(|| TriageError::invalid(field, "expected a non-negative integer"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn sample() -> JsonValue {
        json!({
            "age": 75.0, "heart_rate": 110.0, "systolic_blood_pressure": 150.0,
            "oxygen_saturation": 93.0, "body_temperature": 38.5, "pain_level": 7,
            "chronic_disease_count": 3, "previous_er_visits": 2, "arrival_mode": "ambulance"
        })
    }

    #[test]
    fn parses_complete_record() {
        let record = PatientRecord::from_json(&sample()).unwrap();
        assert_eq!(record.pain_level, 7);
        assert_eq!(record.arrival_mode, "ambulance");
        let features = record.feature_vector(0);
        assert_eq!(features[FEATURE_NAMES.iter().position(|n| *n == "age").unwrap()], 75.0);
        assert_eq!(features[ARRIVAL_MODE_INDEX], 0.0);
    }

    #[test]
    fn missing_key_is_named() {
        let mut value = sample();
        value.as_object_mut().unwrap().remove("oxygen_saturation");
        let err = PatientRecord::from_json(&value).unwrap_err();
        assert!(matches!(err, TriageError::MissingField(ref f) if f == "oxygen_saturation"));
    }

    #[test]
    fn unknown_key_is_rejected() {
        let mut value = sample();
        value["respiratory_rate"] = json!(18);
        let err = PatientRecord::from_json(&value).unwrap_err();
        assert!(matches!(err, TriageError::InvalidField { ref field, .. } if field == "respiratory_rate"));
    }

    #[test]
    fn pain_level_outside_scale_is_rejected() {
        let mut value = sample();
        value["pain_level"] = json!(11);
        assert!(PatientRecord::from_json(&value).unwrap_err().is_validation());
        value["pain_level"] = json!(0);
        assert!(PatientRecord::from_json(&value).is_err());
    }

    #[test]
    fn negative_counts_are_rejected() {
        let mut value = sample();
        value["previous_er_visits"] = json!(-1);
        let err = PatientRecord::from_json(&value).unwrap_err();
        assert!(err.to_string().contains("previous_er_visits"));
    }

    #[test]
    fn non_finite_measurement_fails_validation() {
        let mut record = PatientRecord::from_json(&sample()).unwrap();
        record.heart_rate = f64::NAN;
        assert!(record.validate().is_err());
    }

    #[test]
    fn malformed_text_is_a_validation_error() {
        let err = PatientRecord::from_json_str("{ not json").unwrap_err();
        assert!(err.is_validation());
    }
}
