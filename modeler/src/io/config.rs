//! Orchestration budgets stored as TOML.

use std::fs;
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::create::CreationConfig;
use crate::edit::EditConfig;
use crate::error::ConfigError;

/// Retry budgets for the orchestrators (TOML).
///
/// This file is intended to be edited by humans and must remain stable and
/// automatable. Missing fields default to the documented caps.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct ModelerConfig {
    /// Whole-tree generation attempts for the creation loop.
    pub create_max_retries: u32,

    /// Attempts to obtain a grammar-valid proposal per request.
    pub proposal_max_retries: u32,

    /// Attempts to structurally apply one accepted proposal.
    pub apply_max_retries: u32,

    /// Intermediate edit rounds before the editor gives up.
    pub max_edit_rounds: u32,
}

impl Default for ModelerConfig {
    fn default() -> Self {
        Self {
            create_max_retries: 3,
            proposal_max_retries: 3,
            apply_max_retries: 3,
            max_edit_rounds: 7,
        }
    }
}

impl ModelerConfig {
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.create_max_retries == 0 {
            return Err(ConfigError::Invalid(
                "create_max_retries must be > 0".to_string(),
            ));
        }
        if self.proposal_max_retries == 0 {
            return Err(ConfigError::Invalid(
                "proposal_max_retries must be > 0".to_string(),
            ));
        }
        if self.apply_max_retries == 0 {
            return Err(ConfigError::Invalid(
                "apply_max_retries must be > 0".to_string(),
            ));
        }
        if self.max_edit_rounds == 0 {
            return Err(ConfigError::Invalid(
                "max_edit_rounds must be > 0".to_string(),
            ));
        }
        Ok(())
    }

    /// Budgets for the creation loop.
    pub fn creation(&self) -> CreationConfig {
        CreationConfig {
            max_retries: self.create_max_retries,
        }
    }

    /// Budgets for the edit loop.
    pub fn edit(&self) -> EditConfig {
        EditConfig {
            proposal_max_retries: self.proposal_max_retries,
            apply_max_retries: self.apply_max_retries,
            max_rounds: self.max_edit_rounds,
        }
    }
}

/// Load config from a TOML file.
///
/// If the file is missing, returns `ModelerConfig::default()`.
pub fn load_config(path: &Path) -> Result<ModelerConfig, ConfigError> {
    if !path.exists() {
        let cfg = ModelerConfig::default();
        cfg.validate()?;
        return Ok(cfg);
    }
    let contents = fs::read_to_string(path).map_err(|source| ConfigError::Read {
        path: path.display().to_string(),
        source,
    })?;
    let cfg: ModelerConfig = toml::from_str(&contents).map_err(|source| ConfigError::Parse {
        path: path.display().to_string(),
        source,
    })?;
    cfg.validate()?;
    Ok(cfg)
}
