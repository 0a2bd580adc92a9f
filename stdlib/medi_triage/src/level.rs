use serde::{Deserialize, Serialize};
use std::fmt;

use crate::error::TriageError;

/// Severity class, 0 (lowest) to 3 (critical)
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "u8", into = "u8")]
pub struct TriageLevel(u8);

impl TriageLevel {
    pub const COUNT: usize = 4;
    pub const CRITICAL: TriageLevel = TriageLevel(3);

    pub fn new(level: u8) -> Option<Self> {
        (usize::from(level) < Self::COUNT).then_some(TriageLevel(level))
    }

    pub fn value(self) -> u8 {
        self.0
    }

    pub fn index(self) -> usize {
        usize::from(self.0)
    }

    /// Dashboard colour for this level
    pub fn color(self) -> &'static str {
        match self.0 {
            0 => "green",
            1 => "blue",
            2 => "orange",
            _ => "red",
        }
    }
}

impl TryFrom<u8> for TriageLevel {
    type Error = TriageError;

    fn try_from(level: u8) -> Result<Self, Self::Error> {
        TriageLevel::new(level)
            .ok_or_else(|| TriageError::Inference(format!("triage level {level} is outside 0-3")))
    }
}

impl TryFrom<usize> for TriageLevel {
    type Error = TriageError;

    fn try_from(class: usize) -> Result<Self, Self::Error> {
        u8::try_from(class)
            .ok()
            .and_then(TriageLevel::new)
            .ok_or_else(|| TriageError::Inference(format!("model class {class} is outside 0-3")))
    }
}

impl From<TriageLevel> for u8 {
    fn from(level: TriageLevel) -> u8 {
        level.0
    }
}

impl fmt::Display for TriageLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}
