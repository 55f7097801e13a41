use serde::{Deserialize, Serialize};
use std::path::Path;

use crate::error::{ChaosError, ChaosResult};
use crate::experiment::ExperimentConfig;

/// Top-level experiment config file structure, loaded by `chaos-cli` before
/// it POSTs the config to `chaos-api`. Accepts either YAML or JSON based on
/// file extension, since the original tooling this was distilled from reads
/// YAML experiment definitions.
#[derive(Debug, Serialize, Deserialize)]
pub struct ChaosConfig {
    pub experiments: Vec<ExperimentConfig>,
}

impl ChaosConfig {
    pub fn from_file(path: &Path) -> ChaosResult<Self> {
        let content = std::fs::read_to_string(path)
            .map_err(|e| ChaosError::InvalidConfig(format!("cannot read {}: {e}", path.display())))?;
        if path.extension().and_then(|e| e.to_str()) == Some("json") {
            serde_json::from_str(&content)
                .map_err(|e| ChaosError::InvalidConfig(format!("invalid JSON: {e}")))
        } else {
            serde_yaml::from_str(&content)
                .map_err(|e| ChaosError::InvalidConfig(format!("invalid YAML: {e}")))
        }
    }
}
