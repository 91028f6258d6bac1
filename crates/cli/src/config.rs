//! `procmap.toml` configuration.
//!
//! Every key is optional; missing sections fall back to the engine
//! defaults and command-line flags override whatever the file says.
//!
//! # Example
//!
//! ```toml
//! [resolver]
//! auto_accept_threshold = 0.9
//! min_corpus_files = 2
//!
//! [tree]
//! root = "order.bpmn"
//! max_depth = 64
//! ```

use std::path::{Path, PathBuf};

use procmap_core::{ResolverConfig, DEFAULT_MAX_DEPTH};
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Config file picked up from the working directory when `--config` is not given.
pub(crate) const DEFAULT_CONFIG_FILE: &str = "procmap.toml";

#[derive(Debug, Error)]
pub(crate) enum ConfigError {
    #[error("could not read '{}': {source}", path.display())]
    Read {
        path: PathBuf,
        source: std::io::Error,
    },
    #[error("could not parse '{}': {source}", path.display())]
    Parse {
        path: PathBuf,
        source: toml::de::Error,
    },
    #[error("invalid configuration: {0}")]
    Invalid(String),
}

// ── Types ─────────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub(crate) struct Config {
    pub resolver: ResolverSection,
    pub tree: TreeSection,
}

/// `[resolver]` section.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub(crate) struct ResolverSection {
    pub auto_accept_threshold: f64,
    pub min_corpus_files: usize,
}

impl Default for ResolverSection {
    fn default() -> Self {
        let defaults = ResolverConfig::default();
        ResolverSection {
            auto_accept_threshold: defaults.auto_accept_threshold,
            min_corpus_files: defaults.min_corpus_files,
        }
    }
}

/// `[tree]` section.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub(crate) struct TreeSection {
    /// Root process (file name, process id, or process node id).
    pub root: Option<String>,
    pub max_depth: usize,
}

impl Default for TreeSection {
    fn default() -> Self {
        TreeSection {
            root: None,
            max_depth: DEFAULT_MAX_DEPTH,
        }
    }
}

impl Config {
    pub fn resolver_config(&self) -> ResolverConfig {
        ResolverConfig {
            auto_accept_threshold: self.resolver.auto_accept_threshold,
            min_corpus_files: self.resolver.min_corpus_files,
        }
    }

    fn validate(&self) -> Result<(), ConfigError> {
        let threshold = self.resolver.auto_accept_threshold;
        if !(0.0..=1.0).contains(&threshold) {
            return Err(ConfigError::Invalid(format!(
                "resolver.auto_accept_threshold must be between 0 and 1, got {}",
                threshold
            )));
        }
        if self.tree.max_depth == 0 {
            return Err(ConfigError::Invalid(
                "tree.max_depth must be at least 1".to_string(),
            ));
        }
        Ok(())
    }
}

// ── Loading ───────────────────────────────────────────────────────────────────

/// Parse and validate config text. `path` is only used in error messages.
pub(crate) fn parse_config(content: &str, path: &Path) -> Result<Config, ConfigError> {
    let config: Config = toml::from_str(content).map_err(|source| ConfigError::Parse {
        path: path.to_path_buf(),
        source,
    })?;
    config.validate()?;
    Ok(config)
}

/// Load the configuration.
///
/// An explicit path must exist. Without one, `procmap.toml` in the working
/// directory is used if present, otherwise the defaults.
pub(crate) fn load_config(path: Option<&Path>) -> Result<Config, ConfigError> {
    let path = match path {
        Some(p) => p.to_path_buf(),
        None => {
            let candidate = PathBuf::from(DEFAULT_CONFIG_FILE);
            if !candidate.is_file() {
                tracing::debug!("no {} found, using defaults", DEFAULT_CONFIG_FILE);
                return Ok(Config::default());
            }
            candidate
        }
    };

    let content = std::fs::read_to_string(&path).map_err(|source| ConfigError::Read {
        path: path.clone(),
        source,
    })?;
    let config = parse_config(&content, &path)?;
    tracing::debug!(path = %path.display(), "configuration loaded");
    Ok(config)
}
