//! Generator registry for configuration-driven construction.

use crate::{SignalPipeline, StructureConfig, StructureSignal, TrendConfig, TrendSignal};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use sync_core::{error::SignalError, traits::SignalGenerator, types::SignalVariant};

/// Information about a registered generator.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SignalInfo {
    /// Variant served by the generator
    pub variant: SignalVariant,
    /// Display name
    pub name: String,
    /// Generator description
    pub description: String,
    /// Default configuration as JSON
    pub default_config: serde_json::Value,
}

/// Registry of the built-in generators, keyed by variant name.
pub struct SignalRegistry {
    generators: BTreeMap<String, SignalInfo>,
}

impl SignalRegistry {
    /// Create a registry with all built-in generators.
    pub fn new() -> Self {
        let mut generators = BTreeMap::new();

        generators.insert(
            SignalVariant::Standard.as_str().to_string(),
            SignalInfo {
                variant: SignalVariant::Standard,
                name: "Trend".to_string(),
                description: "EMA crossover trend with RSI momentum confirmation".to_string(),
                default_config: serde_json::to_value(TrendConfig::default()).unwrap_or_default(),
            },
        );

        generators.insert(
            SignalVariant::SmartMoney.as_str().to_string(),
            SignalInfo {
                variant: SignalVariant::SmartMoney,
                name: "Structure".to_string(),
                description: "Swing-range breaks of structure with volume confirmation"
                    .to_string(),
                default_config: serde_json::to_value(StructureConfig::default())
                    .unwrap_or_default(),
            },
        );

        Self { generators }
    }

    /// List all generators, ordered by variant name.
    pub fn list(&self) -> Vec<&SignalInfo> {
        self.generators.values().collect()
    }

    /// Get generator info by variant name.
    pub fn get(&self, name: &str) -> Option<&SignalInfo> {
        self.generators.get(name)
    }

    /// Create a generator from a JSON configuration.
    pub fn create(
        &self,
        name: &str,
        config: serde_json::Value,
    ) -> Result<Box<dyn SignalGenerator>, SignalError> {
        let variant: SignalVariant = name
            .parse()
            .map_err(|_| SignalError::NotFound(name.to_string()))?;
        match variant {
            SignalVariant::Standard => {
                let config: TrendConfig = serde_json::from_value(config)
                    .map_err(|e| SignalError::InvalidConfig(e.to_string()))?;
                config.validate()?;
                Ok(Box::new(TrendSignal::new(config)))
            }
            SignalVariant::SmartMoney => {
                let config: StructureConfig = serde_json::from_value(config)
                    .map_err(|e| SignalError::InvalidConfig(e.to_string()))?;
                config.validate()?;
                Ok(Box::new(StructureSignal::new(config)))
            }
        }
    }

    /// Create a generator with its default configuration.
    pub fn create_default(&self, name: &str) -> Result<Box<dyn SignalGenerator>, SignalError> {
        let info = self
            .get(name)
            .ok_or_else(|| SignalError::NotFound(name.to_string()))?;
        self.create(name, info.default_config.clone())
    }

    /// Build a pipeline from optional per-variant JSON overrides.
    pub fn pipeline(
        &self,
        standard: Option<serde_json::Value>,
        smart_money: Option<serde_json::Value>,
    ) -> Result<SignalPipeline, SignalError> {
        let build = |variant: SignalVariant, config: Option<serde_json::Value>| match config {
            Some(config) => self.create(variant.as_str(), config),
            None => self.create_default(variant.as_str()),
        };
        Ok(SignalPipeline::new(
            build(SignalVariant::Standard, standard)?,
            build(SignalVariant::SmartMoney, smart_money)?,
        ))
    }
}

impl Default for SignalRegistry {
    fn default() -> Self {
        Self::new()
    }
}
