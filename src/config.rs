//! Engine configuration
//!
//! Configuration can be built in code with the `with_*` methods or loaded
//! from TOML:
//!
//! ```toml
//! [engine]
//! max_depth = 16
//! default_namespace = "components"
//! loop_fallback_limit = 5
//!
//! [aliases]
//! ui = "vendor.ui"
//! ```

use std::collections::HashMap;
use std::path::Path;

use serde::Deserialize;
use thiserror::Error;

/// Errors that can occur when loading configuration
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Failed to read config file: {0}")]
    IoError(#[from] std::io::Error),
    #[error("Failed to parse config TOML: {0}")]
    ParseError(#[from] toml::de::Error),
}

/// Rendering limits and naming conventions
#[derive(Debug, Clone, PartialEq)]
pub struct EngineConfig {
    /// Maximum nesting of extends, include and component renders
    pub max_depth: usize,
    /// Namespace tried when a component name does not resolve as given
    pub default_namespace: String,
    /// Iteration limit for `@for` loops whose bound does not resolve;
    /// `None` renders such loops as empty
    pub loop_fallback_limit: Option<usize>,
    /// Hard cap on iterations of a single `@for` loop
    pub max_loop_iterations: usize,
    /// Resolve `@extends` in parent layouts as well as in the page itself
    pub nested_extends: bool,
    /// Namespace aliases: `ui::button` resolves to `<aliases["ui"]>.button`
    pub aliases: HashMap<String, String>,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            max_depth: 32,
            default_namespace: "components".to_string(),
            loop_fallback_limit: Some(5),
            max_loop_iterations: 10_000,
            nested_extends: true,
            aliases: HashMap::new(),
        }
    }
}

#[derive(Deserialize, Default)]
#[serde(deny_unknown_fields)]
struct TomlConfig {
    #[serde(default)]
    engine: TomlEngine,
    #[serde(default)]
    aliases: HashMap<String, String>,
}

#[derive(Deserialize, Default)]
#[serde(deny_unknown_fields)]
struct TomlEngine {
    max_depth: Option<usize>,
    default_namespace: Option<String>,
    loop_fallback_limit: Option<usize>,
    /// `false` disables the fallback entirely
    loop_fallback: Option<bool>,
    max_loop_iterations: Option<usize>,
    nested_extends: Option<bool>,
}

impl EngineConfig {
    pub fn new() -> Self {
        Self::default()
    }

    /// Load configuration from a TOML file
    pub fn from_file(path: &Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path)?;
        Self::from_str(&content)
    }

    /// Load configuration from a TOML string; absent keys keep their defaults
    pub fn from_str(content: &str) -> Result<Self, ConfigError> {
        let parsed: TomlConfig = toml::from_str(content)?;
        let mut config = Self::default();
        let engine = parsed.engine;

        if let Some(depth) = engine.max_depth {
            config.max_depth = depth;
        }
        if let Some(namespace) = engine.default_namespace {
            config.default_namespace = namespace;
        }
        if let Some(limit) = engine.loop_fallback_limit {
            config.loop_fallback_limit = Some(limit);
        }
        if engine.loop_fallback == Some(false) {
            config.loop_fallback_limit = None;
        }
        if let Some(cap) = engine.max_loop_iterations {
            config.max_loop_iterations = cap;
        }
        if let Some(nested) = engine.nested_extends {
            config.nested_extends = nested;
        }
        config.aliases = parsed.aliases;

        Ok(config)
    }

    /// Set the maximum render nesting depth
    pub fn with_max_depth(mut self, depth: usize) -> Self {
        self.max_depth = depth;
        self
    }

    /// Set the namespace tried for unresolved component names
    pub fn with_default_namespace(mut self, namespace: impl Into<String>) -> Self {
        self.default_namespace = namespace.into();
        self
    }

    /// Set the iteration limit used when a `@for` bound does not resolve
    pub fn with_loop_fallback_limit(mut self, limit: Option<usize>) -> Self {
        self.loop_fallback_limit = limit;
        self
    }

    pub fn with_max_loop_iterations(mut self, cap: usize) -> Self {
        self.max_loop_iterations = cap;
        self
    }

    /// Enable or disable multi-level `@extends` resolution
    pub fn with_nested_extends(mut self, nested: bool) -> Self {
        self.nested_extends = nested;
        self
    }

    /// Map `alias::name` references onto `prefix.name`
    pub fn with_alias(mut self, alias: impl Into<String>, prefix: impl Into<String>) -> Self {
        self.aliases.insert(alias.into(), prefix.into());
        self
    }

    /// Expand `alias::name` into a qualified template name
    ///
    /// Returns `Ok(None)` for references without an alias and `Err(alias)`
    /// when the alias is not registered.
    pub fn expand_alias<'r>(&self, reference: &'r str) -> Result<Option<String>, &'r str> {
        let Some((alias, name)) = reference.split_once("::") else {
            return Ok(None);
        };
        let is_word = |c: char| c.is_ascii_alphanumeric() || c == '_' || c == '-';
        if alias.is_empty() || !alias.chars().all(is_word) {
            return Ok(None);
        }
        match self.aliases.get(alias) {
            Some(prefix) if prefix.is_empty() => Ok(Some(name.to_string())),
            Some(prefix) => Ok(Some(format!("{}.{}", prefix, name))),
            None => Err(alias),
        }
    }
}
