//! Translation settings
//!
//! Loaded from a TOML file such as:
//!
//! ```toml
//! [translate]
//! concurrency = 4
//! skip_patterns = ["^https?://", "^\\d+$"]
//!
//! [glossary]
//! "Quarterly report" = "Quartalsbericht"
//! ```

use std::collections::BTreeMap;
use std::path::Path;

use regex::Regex;
use serde::{Deserialize, Serialize};

use crate::error::Result;

/// Top-level settings structure
#[derive(Debug, Clone, Serialize, Deserialize, Default, PartialEq)]
#[serde(default)]
pub struct TranslateSettings {
    /// Orchestration settings
    pub translate: OrchestrationSettings,
    /// Term replacements for the glossary transform
    pub glossary: BTreeMap<String, String>,
}

impl TranslateSettings {
    /// Parse settings from a TOML string
    pub fn from_toml_str(toml_str: &str) -> Result<Self> {
        Ok(toml::from_str(toml_str)?)
    }

    /// Read settings from a TOML file
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let content = std::fs::read_to_string(path)?;
        Self::from_toml_str(&content)
    }
}

/// How transforms are scheduled and which runs they see
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct OrchestrationSettings {
    /// Maximum transform calls in flight; 1 means strictly sequential
    pub concurrency: usize,
    /// Runs whose text matches any of these regexes are left untouched
    pub skip_patterns: Vec<String>,
}

impl Default for OrchestrationSettings {
    fn default() -> Self {
        Self {
            concurrency: 1,
            skip_patterns: Vec::new(),
        }
    }
}

impl OrchestrationSettings {
    /// Compile the skip patterns
    pub fn skip_rules(&self) -> Result<Vec<Regex>> {
        self.skip_patterns
            .iter()
            .map(|p| Regex::new(p).map_err(Into::into))
            .collect()
    }
}
