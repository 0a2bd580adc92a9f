//! Emergency triage decision support.
//!
//! Hard safety rules override a boosted tree classifier, department routing
//! runs on raw vitals, and TreeSHAP attributions explain the level shown.

pub mod artifacts;
pub mod attribution;
pub mod config;
pub mod encoder;
pub mod engine;
pub mod error;
pub mod explain;
pub mod level;
pub mod model;
pub mod record;
pub mod treeshap;

pub use artifacts::TriageArtifacts;
pub use attribution::{AttributionOutput, FeatureAttributor, OutputLayout};
pub use config::{ArtifactPaths, ExplanationConfig, TriageConfig};
pub use encoder::{CategoryEncoder, LabelEncoder};
pub use engine::{DecisionEngine, DecisionSource, Department, SafetyRule, TriageDecision};
pub use error::{Result, TriageError};
pub use explain::{
    rank_factors, ExplanationGenerator, ExplanationReport, ExplanationTarget, Polarity,
    RankedFactor, TOP_FACTORS,
};
pub use level::TriageLevel;
pub use model::{Tree, TreeEnsemble, TreeNode, TriageModel};
pub use record::{PatientRecord, FEATURE_NAMES, N_FEATURES};
pub use treeshap::TreeShap;
