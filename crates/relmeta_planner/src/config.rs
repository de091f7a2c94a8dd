use relmeta_error::{Result, ResultExt};
use serde::{Deserialize, Serialize};

use crate::cost::CostModel;

/// Session scoped configuration for metadata queries.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct MetadataConfig {
    /// Parameters used when computing costs.
    pub cost_model: CostModel,
    /// Memoize query results per (query, node, arguments) for the lifetime of
    /// a `MetadataQuery`.
    pub enable_cache: bool,
}

impl Default for MetadataConfig {
    fn default() -> Self {
        MetadataConfig {
            cost_model: CostModel::default(),
            enable_cache: true,
        }
    }
}

impl MetadataConfig {
    /// Load a config from JSON. Missing fields take their defaults.
    pub fn from_json(json: &str) -> Result<Self> {
        let config: MetadataConfig =
            serde_json::from_str(json).context("failed to deserialize metadata config")?;
        config.cost_model.validate()?;
        Ok(config)
    }
}
