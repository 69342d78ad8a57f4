//! Controller configuration.
//!
//! # Configuration Sources (in priority order, highest to lowest)
//!
//! 1. Environment variables (`OLM_*`)
//! 2. A TOML configuration file
//! 3. Built-in defaults
//!
//! ```toml
//! [features]
//! extension-api = true
//!
//! [resolution]
//! mode = "global"
//! max-solver-iterations = 50000
//! upgrade-constraints = "legacy"
//!
//! [unpack]
//! cache = true
//!
//! [install]
//! label-prefix = "olm.operatorframework.io"
//! ```

use std::fs;
use std::path::{Path, PathBuf};

use indexmap::IndexMap;
use serde::Deserialize;

use crate::error::{ControllerError, Result};

/// Which resolver the controller uses
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ResolutionMode {
    /// Resolve each extension on its own
    #[default]
    Single,
    /// Solve every extension and installed bundle together
    Global,
}

impl ResolutionMode {
    pub fn parse(s: &str) -> Option<Self> {
        match s.to_lowercase().as_str() {
            "single" => Some(ResolutionMode::Single),
            "global" => Some(ResolutionMode::Global),
            _ => None,
        }
    }
}

/// What makes a bundle an acceptable upgrade from the installed one
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum UpgradeEdges {
    /// Same major line, at or above the installed version
    #[default]
    Semver,
    /// The installed version itself, or a channel entry replacing or
    /// skipping the installed bundle
    Legacy,
}

impl UpgradeEdges {
    pub fn parse(s: &str) -> Option<Self> {
        match s.to_lowercase().as_str() {
            "semver" => Some(UpgradeEdges::Semver),
            "legacy" => Some(UpgradeEdges::Legacy),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default, rename_all = "kebab-case")]
pub struct FeatureConfig {
    /// Off puts every extension in the gated state
    pub extension_api: bool,
}

impl Default for FeatureConfig {
    fn default() -> Self {
        Self { extension_api: true }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default, rename_all = "kebab-case")]
pub struct ResolutionConfig {
    pub mode: ResolutionMode,
    pub max_solver_iterations: usize,
    pub upgrade_constraints: UpgradeEdges,
}

impl Default for ResolutionConfig {
    fn default() -> Self {
        Self {
            mode: ResolutionMode::Single,
            max_solver_iterations: 100_000,
            upgrade_constraints: UpgradeEdges::Semver,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default, rename_all = "kebab-case")]
pub struct UnpackConfig {
    pub cache: bool,
}

impl Default for UnpackConfig {
    fn default() -> Self {
        Self { cache: true }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default, rename_all = "kebab-case")]
pub struct InstallConfig {
    /// Prefix of the identity labels stamped on deployed objects
    pub label_prefix: String,
}

impl Default for InstallConfig {
    fn default() -> Self {
        Self {
            label_prefix: "olm.operatorframework.io".to_string(),
        }
    }
}

/// Where a configuration value came from
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConfigSource {
    Default,
    File(PathBuf),
    Environment(String),
}

#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(default)]
pub struct ControllerConfig {
    pub features: FeatureConfig,
    pub resolution: ResolutionConfig,
    pub unpack: UnpackConfig,
    pub install: InstallConfig,

    /// Source of each value not taken from the defaults
    #[serde(skip)]
    sources: IndexMap<String, ConfigSource>,
}

/// Configuration keys and the environment variables overriding them
const KEYS: [(&str, &str); 6] = [
    ("features.extension-api", "OLM_FEATURE_EXTENSION_API"),
    ("resolution.mode", "OLM_RESOLUTION_MODE"),
    ("resolution.max-solver-iterations", "OLM_MAX_SOLVER_ITERATIONS"),
    ("resolution.upgrade-constraints", "OLM_UPGRADE_CONSTRAINTS"),
    ("unpack.cache", "OLM_UNPACK_CACHE"),
    ("install.label-prefix", "OLM_LABEL_PREFIX"),
];

fn parse_bool(var: &str, value: &str) -> Result<bool> {
    match value.to_lowercase().as_str() {
        "true" | "1" | "yes" | "on" => Ok(true),
        "false" | "0" | "no" | "off" => Ok(false),
        _ => Err(invalid_env(var, value)),
    }
}

fn invalid_env(var: &str, value: &str) -> ControllerError {
    ControllerError::Config(format!("invalid value {:?} for {}", value, var))
}

impl ControllerConfig {
    pub fn from_toml_str(contents: &str) -> Result<Self> {
        toml::from_str(contents).map_err(|e| ControllerError::Config(e.to_string()))
    }

    /// Load a TOML file; a missing file yields the defaults
    pub fn load(path: &Path) -> Result<Self> {
        if !path.exists() {
            return Ok(Self::default());
        }
        let contents = fs::read_to_string(path)
            .map_err(|e| ControllerError::Config(format!("Failed to read {}: {}", path.display(), e)))?;
        let mut config: Self = toml::from_str(&contents)
            .map_err(|e| ControllerError::Config(format!("Failed to parse {}: {}", path.display(), e)))?;

        let table: toml::Table = contents.parse().unwrap_or_default();
        for (key, _) in KEYS {
            let mut parts = key.split('.');
            let present = match (parts.next(), parts.next()) {
                (Some(section), Some(name)) => table
                    .get(section)
                    .and_then(|s| s.as_table())
                    .is_some_and(|s| s.contains_key(name)),
                _ => false,
            };
            if present {
                config.sources.insert(key.to_string(), ConfigSource::File(path.to_path_buf()));
            }
        }
        Ok(config)
    }

    /// Apply `OLM_*` overrides read through `lookup`
    pub fn apply_env_from(&mut self, lookup: impl Fn(&str) -> Option<String>) -> Result<()> {
        for (key, var) in KEYS {
            let value = match lookup(var).filter(|v| !v.is_empty()) {
                Some(v) => v,
                None => continue,
            };
            match key {
                "features.extension-api" => self.features.extension_api = parse_bool(var, &value)?,
                "resolution.mode" => {
                    self.resolution.mode = ResolutionMode::parse(&value).ok_or_else(|| invalid_env(var, &value))?
                }
                "resolution.max-solver-iterations" => {
                    self.resolution.max_solver_iterations = value.parse().map_err(|_| invalid_env(var, &value))?
                }
                "resolution.upgrade-constraints" => {
                    self.resolution.upgrade_constraints =
                        UpgradeEdges::parse(&value).ok_or_else(|| invalid_env(var, &value))?
                }
                "unpack.cache" => self.unpack.cache = parse_bool(var, &value)?,
                "install.label-prefix" => self.install.label_prefix = value,
                _ => continue,
            }
            log::debug!("config {} overridden by {}", key, var);
            self.sources
                .insert(key.to_string(), ConfigSource::Environment(var.to_string()));
        }
        Ok(())
    }

    /// Defaults, then the optional file, then the process environment
    pub fn build(path: Option<&Path>) -> Result<Self> {
        let mut config = match path {
            Some(path) => Self::load(path)?,
            None => Self::default(),
        };
        config.apply_env_from(|var| std::env::var(var).ok())?;
        Ok(config)
    }

    pub fn source(&self, key: &str) -> ConfigSource {
        self.sources.get(key).cloned().unwrap_or(ConfigSource::Default)
    }
}
