//! Rewriter configuration, loaded from TOML.

use crate::parser::Activation;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

fn default_separator() -> String {
    "\t".to_string()
}

/// Settings shared by every rewrite call of one session.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct RewriteConfig {
    /// What a leading `#` means on a directive line.
    #[serde(default)]
    pub activation: Activation,

    /// Placed between value and key when a key's line is rewritten.
    #[serde(default = "default_separator")]
    pub separator: String,

    /// Marker policy for requests built from run lists.
    #[serde(default)]
    pub use_marker: bool,

    /// Auxiliary solver file that receives the entries named in `aux_params`.
    #[serde(default)]
    pub aux_file: Option<PathBuf>,

    #[serde(default)]
    pub aux_params: Vec<String>,
}

impl Default for RewriteConfig {
    fn default() -> Self {
        Self {
            activation: Activation::default(),
            separator: default_separator(),
            use_marker: false,
            aux_file: None,
            aux_params: Vec::new(),
        }
    }
}

impl RewriteConfig {
    /// Load from a TOML file. A missing file yields the defaults.
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        match std::fs::read_to_string(path) {
            Ok(text) => Self::from_toml(&text),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                tracing::debug!(path = %path.display(), "no config file, using defaults");
                Ok(Self::default())
            }
            Err(e) => Err(ConfigError::Io(e)),
        }
    }

    pub fn from_toml(text: &str) -> Result<Self, ConfigError> {
        Ok(toml::from_str(text)?)
    }
}

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("config I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("config parse error: {0}")]
    Parse(#[from] toml::de::Error),
}
