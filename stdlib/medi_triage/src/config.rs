//! Runtime configuration: built-in defaults, then an optional TOML file, then
//! environment overrides.
//!
//! ```toml
//! [artifacts]
//! model = "models/risk_model.json"
//! encoder = "models/label_encoder.json"
//!
//! [explanation]
//! layout = "tensor"
//! target = "model"
//! ```

use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

use crate::attribution::OutputLayout;
use crate::error::{Result, TriageError};
use crate::explain::ExplanationTarget;

pub const CONFIG_ENV: &str = "MEDI_TRIAGE_CONFIG";
pub const MODEL_ENV: &str = "MEDI_TRIAGE_MODEL";
pub const ENCODER_ENV: &str = "MEDI_TRIAGE_ENCODER";

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ArtifactPaths {
    pub model: PathBuf,
    pub encoder: PathBuf,
}

impl Default for ArtifactPaths {
    fn default() -> Self {
        Self {
            model: PathBuf::from("models/risk_model.json"),
            encoder: PathBuf::from("models/label_encoder.json"),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ExplanationConfig {
    pub layout: OutputLayout,
    pub target: ExplanationTarget,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct TriageConfig {
    pub artifacts: ArtifactPaths,
    pub explanation: ExplanationConfig,
}

impl TriageConfig {
    pub fn parse(text: &str) -> Result<Self> {
        toml::from_str(text).map_err(|e| TriageError::Config(e.to_string()))
    }

    pub fn to_toml(&self) -> Result<String> {
        toml::to_string_pretty(self).map_err(|e| TriageError::Config(e.to_string()))
    }

    /// Resolve configuration for a run. An explicit path must exist; otherwise
    /// `MEDI_TRIAGE_CONFIG` is consulted, and without either the defaults apply.
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let env_path = std::env::var_os(CONFIG_ENV).map(PathBuf::from);
        let mut config = match path.map(Path::to_path_buf).or(env_path) {
            Some(p) => {
                let text = fs::read_to_string(&p)
                    .map_err(|e| TriageError::Config(format!("cannot read {}: {e}", p.display())))?;
                log::debug!("using configuration {}", p.display());
                Self::parse(&text)?
            }
            None => Self::default(),
        };
        config.apply_env(|key| std::env::var_os(key).map(PathBuf::from));
        Ok(config)
    }

    fn apply_env(&mut self, lookup: impl Fn(&str) -> Option<PathBuf>) {
        if let Some(model) = lookup(MODEL_ENV) {
            self.artifacts.model = model;
        }
        if let Some(encoder) = lookup(ENCODER_ENV) {
            self.artifacts.encoder = encoder;
        }
    }
}
