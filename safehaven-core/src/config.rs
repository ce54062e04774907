// Engine configuration

use crate::classifier::SafetyThresholds;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use thiserror::Error;

pub const DEFAULT_LIST_PATH: &str = "~/.config/safehaven/SafeHavenList.txt";

#[derive(Error, Debug)]
pub enum EngineError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Invalid configuration: {0}")]
    Json(#[from] serde_json::Error),
}

pub type Result<T> = std::result::Result<T, EngineError>;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    pub thresholds: SafetyThresholds,
    pub list_path: String,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            thresholds: SafetyThresholds::default(),
            list_path: DEFAULT_LIST_PATH.to_string(),
        }
    }
}

impl EngineConfig {
    /// Read a JSON config; fields it leaves out keep their defaults
    pub fn load(path: &Path) -> Result<Self> {
        let content = fs::read_to_string(path)?;
        Self::from_json(&content)
    }

    pub fn from_json(content: &str) -> Result<Self> {
        Ok(serde_json::from_str(content)?)
    }

    /// The list path with `~` expanded
    pub fn list_path(&self) -> PathBuf {
        PathBuf::from(shellexpand::tilde(&self.list_path).as_ref())
    }
}
