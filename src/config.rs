use serde::{Deserialize, Serialize};
use std::path::Path;

use crate::error::{ReqtreeError, Result};

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
#[serde(default)]
pub struct Config {
    /// Graph extraction settings
    pub analysis: AnalysisConfig,

    /// Output settings
    pub output: OutputConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct AnalysisConfig {
    /// Identifier of the module-loading call to look for
    pub loader: String,

    /// Maximum recursion depth before subtrees are left unexpanded
    pub depth_limit: u32,

    /// Attempt speculative resolution of non-literal loader arguments
    pub resolve_dynamic: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct OutputConfig {
    /// Use ANSI colors in tree output
    pub color: bool,
}

impl Default for AnalysisConfig {
    fn default() -> Self {
        Self {
            loader: "require".to_string(),
            depth_limit: 10,
            resolve_dynamic: false,
        }
    }
}

impl Default for OutputConfig {
    fn default() -> Self {
        Self { color: true }
    }
}

impl Config {
    /// Load configuration from file
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = std::fs::read_to_string(&path).map_err(|e| ReqtreeError::Read {
            path: path.as_ref().to_path_buf(),
            source: e,
        })?;
        let config: Config =
            toml::from_str(&content).map_err(|e| ReqtreeError::Config(e.to_string()))?;
        Ok(config)
    }

    /// Load configuration with fallback to default
    pub fn load_or_default<P: AsRef<Path>>(path: Option<P>) -> Result<Self> {
        match path {
            Some(p) => Self::load(p),
            None => {
                // Try common config file locations
                let candidates = ["reqtree.toml", ".reqtree.toml"];

                for candidate in &candidates {
                    if Path::new(candidate).exists() {
                        return Self::load(candidate);
                    }
                }

                Ok(Self::default())
            }
        }
    }
}
