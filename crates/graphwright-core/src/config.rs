//! Layered TOML configuration.
//!
//! Configuration is assembled from, in increasing precedence:
//! 1. Built-in defaults
//! 2. Global config (`~/.graphwright/config.toml`)
//! 3. Local config (`./.graphwrightrc`)
//! 4. An explicit file passed by the caller
//! 5. `GRAPHWRIGHT_*` environment variables
//!
//! Files are merged key by key, so a later layer only needs to name the keys
//! it changes. Command-line flags are applied on top by the binary.

use crate::docs::{DEFAULT_DOCS_URL, DEFAULT_MAX_DEPTH};
use crate::workflow::TerminationMode;
use graphwright_abstraction::ModelParameters;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use thiserror::Error;
use toml::{Table, Value};
use tracing::debug;

/// Environment variable overriding `model.engine`.
pub const ENV_ENGINE: &str = "GRAPHWRIGHT_ENGINE";
/// Environment variable overriding `model.model`.
pub const ENV_MODEL: &str = "GRAPHWRIGHT_MODEL";
/// Environment variable overriding `model.base_url`.
pub const ENV_BASE_URL: &str = "GRAPHWRIGHT_BASE_URL";
/// Environment variable overriding `docs.path`.
pub const ENV_DOCS_PATH: &str = "GRAPHWRIGHT_DOCS_PATH";
/// Environment variable overriding `workflow.max_tries`.
pub const ENV_MAX_TRIES: &str = "GRAPHWRIGHT_MAX_TRIES";

/// Errors that can occur during configuration loading.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// Configuration file not found.
    #[error("Configuration file not found: {0}")]
    NotFound(String),

    /// Failed to read configuration file.
    #[error("Failed to read configuration file: {0}")]
    ReadError(String),

    /// Failed to parse configuration file.
    #[error("Failed to parse configuration file: {0}")]
    ParseError(String),

    /// Invalid configuration value.
    #[error("Invalid configuration value: {0}")]
    InvalidValue(String),
}

/// Result type for configuration operations.
pub type ConfigResult<T> = std::result::Result<T, ConfigError>;

/// Model selection and generation settings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ModelSettings {
    /// Provider engine (`openai`, `universal`, `mock`).
    pub engine: String,
    /// Model used for code generation.
    pub model: String,
    /// Model used to interpret diagrams; falls back to `model`.
    pub vision_model: Option<String>,
    /// Base URL of an OpenAI-compatible endpoint.
    pub base_url: Option<String>,
    /// API key; falls back to the provider's environment variable.
    pub api_key: Option<String>,
    /// Sampling temperature; zero when unset.
    pub temperature: Option<f32>,
    /// Completion token limit.
    pub max_tokens: Option<u32>,
}

impl Default for ModelSettings {
    fn default() -> Self {
        Self {
            engine: "openai".to_string(),
            model: "gpt-4o".to_string(),
            vision_model: None,
            base_url: None,
            api_key: None,
            temperature: None,
            max_tokens: None,
        }
    }
}

/// Code-generation workflow settings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct WorkflowSettings {
    /// Reviewer messages after which the lint/fix loop stops.
    pub max_tries: usize,
    /// How the loop decides to stop.
    pub termination: TerminationMode,
    /// Node executions allowed per run; never fewer than the retry cap needs.
    pub max_steps: usize,
}

impl Default for WorkflowSettings {
    fn default() -> Self {
        Self { max_tries: 3, termination: TerminationMode::default(), max_steps: 25 }
    }
}

/// External linter invocation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct LintSettings {
    /// Program to run.
    pub command: String,
    /// Arguments placed before the file path.
    pub args: Vec<String>,
}

impl Default for LintSettings {
    fn default() -> Self {
        Self { command: "ruff".to_string(), args: vec!["check".to_string()] }
    }
}

/// Reference documentation settings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct DocsSettings {
    /// Root URL crawled by `ingest`.
    pub url: String,
    /// Cache file; defaults to the platform data directory.
    pub path: Option<PathBuf>,
    /// Link depth followed from the root page.
    pub max_depth: usize,
}

impl Default for DocsSettings {
    fn default() -> Self {
        Self { url: DEFAULT_DOCS_URL.to_string(), path: None, max_depth: DEFAULT_MAX_DEPTH }
    }
}

/// Graph prediction settings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct PredictSettings {
    /// Structured-output attempts per input.
    pub attempts: usize,
    /// Inputs predicted at the same time.
    pub concurrency: usize,
}

impl Default for PredictSettings {
    fn default() -> Self {
        Self { attempts: 3, concurrency: 4 }
    }
}

/// Complete configuration.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct GraphwrightConfig {
    /// Log level
    pub log_level: Option<String>,
    /// Model settings.
    pub model: ModelSettings,
    /// Workflow settings.
    pub workflow: WorkflowSettings,
    /// Linter settings.
    pub lint: LintSettings,
    /// Documentation settings.
    pub docs: DocsSettings,
    /// Prediction settings.
    pub predict: PredictSettings,
}

impl GraphwrightConfig {
    /// Load configuration from a single TOML file over the defaults.
    pub fn load_from_file(path: &Path) -> ConfigResult<Self> {
        let table = read_layer(path)?;
        from_table(table, path)
    }

    /// Save configuration to a TOML file.
    pub fn save_to_file(&self, path: &Path) -> ConfigResult<()> {
        let content = toml::to_string_pretty(self)
            .map_err(|e| ConfigError::ParseError(format!("Failed to serialize: {}", e)))?;

        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)
                .map_err(|e| ConfigError::ReadError(format!("Failed to create directory: {}", e)))?;
        }

        std::fs::write(path, content).map_err(|e| ConfigError::ReadError(format!("Failed to write file: {}", e)))
    }

    /// Get default global configuration file path.
    pub fn default_global_path() -> Option<PathBuf> {
        dirs::home_dir().map(|home| home.join(".graphwright").join("config.toml"))
    }

    /// Get default local configuration file path.
    pub fn default_local_path() -> PathBuf {
        PathBuf::from(".graphwrightrc")
    }

    /// Discover and load every configuration layer.
    ///
    /// Missing global and local files are skipped; a missing `explicit` file
    /// is an error.
    pub fn load(explicit: Option<&Path>) -> ConfigResult<Self> {
        let mut layers: Vec<(PathBuf, bool)> = Vec::new();
        if let Some(global) = Self::default_global_path() {
            layers.push((global, false));
        }
        layers.push((Self::default_local_path(), false));
        if let Some(path) = explicit {
            layers.push((path.to_path_buf(), true));
        }

        let mut config = Self::load_layers(&layers)?;
        config.apply_env_overrides(|key| std::env::var(key).ok())?;
        config.validate()?;
        Ok(config)
    }

    /// Merges the given files in order. Each entry says whether the file must
    /// exist.
    pub fn load_layers(layers: &[(PathBuf, bool)]) -> ConfigResult<Self> {
        let mut merged = Table::new();
        let mut last = PathBuf::new();

        for (path, required) in layers {
            if !path.exists() {
                if *required {
                    return Err(ConfigError::NotFound(path.display().to_string()));
                }
                continue;
            }
            debug!(path = %path.display(), "Loading configuration layer");
            merge_tables(&mut merged, read_layer(path)?);
            last.clone_from(path);
        }

        from_table(merged, &last)
    }

    /// Applies `GRAPHWRIGHT_*` overrides using `lookup` to read variables.
    pub fn apply_env_overrides<F>(&mut self, lookup: F) -> ConfigResult<()>
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(engine) = lookup(ENV_ENGINE) {
            self.model.engine = engine;
        }
        if let Some(model) = lookup(ENV_MODEL) {
            self.model.model = model;
        }
        if let Some(base_url) = lookup(ENV_BASE_URL) {
            self.model.base_url = Some(base_url);
        }
        if let Some(path) = lookup(ENV_DOCS_PATH) {
            self.docs.path = Some(PathBuf::from(path));
        }
        if let Some(raw) = lookup(ENV_MAX_TRIES) {
            self.workflow.max_tries = raw
                .trim()
                .parse()
                .map_err(|_| ConfigError::InvalidValue(format!("{}={}", ENV_MAX_TRIES, raw)))?;
        }
        Ok(())
    }

    /// Rejects settings no run can use.
    pub fn validate(&self) -> ConfigResult<()> {
        if self.workflow.max_steps == 0 {
            return Err(ConfigError::InvalidValue("workflow.max_steps must be at least 1".to_string()));
        }
        if self.predict.concurrency == 0 {
            return Err(ConfigError::InvalidValue("predict.concurrency must be at least 1".to_string()));
        }
        if self.lint.command.trim().is_empty() {
            return Err(ConfigError::InvalidValue("lint.command must not be empty".to_string()));
        }
        Ok(())
    }

    /// Location of the reference documentation cache.
    pub fn docs_path(&self) -> PathBuf {
        self.docs.path.clone().unwrap_or_else(|| {
            dirs::data_dir().unwrap_or_else(|| PathBuf::from(".")).join("graphwright").join("docs.json")
        })
    }

    /// Model used to interpret diagrams.
    pub fn vision_model(&self) -> &str {
        self.model.vision_model.as_deref().unwrap_or(&self.model.model)
    }

    /// Generation parameters derived from the model settings.
    pub fn model_parameters(&self) -> ModelParameters {
        ModelParameters {
            temperature: Some(self.model.temperature.unwrap_or(0.0)),
            max_tokens: self.model.max_tokens,
            ..ModelParameters::default()
        }
    }
}

fn read_layer(path: &Path) -> ConfigResult<Table> {
    if !path.exists() {
        return Err(ConfigError::NotFound(path.display().to_string()));
    }

    let content = std::fs::read_to_string(path)
        .map_err(|e| ConfigError::ReadError(format!("{}: {}", path.display(), e)))?;

    content.parse::<Table>().map_err(|e| ConfigError::ParseError(format!("{}: {}", path.display(), e)))
}

fn from_table(table: Table, origin: &Path) -> ConfigResult<GraphwrightConfig> {
    Value::Table(table)
        .try_into::<GraphwrightConfig>()
        .map_err(|e| ConfigError::ParseError(format!("{}: {}", origin.display(), e)))
}

/// Recursively merges `overlay` into `base`; overlay values win.
fn merge_tables(base: &mut Table, overlay: Table) {
    for (key, value) in overlay {
        match (base.get_mut(&key), value) {
            (Some(Value::Table(existing)), Value::Table(incoming)) => merge_tables(existing, incoming),
            (_, value) => {
                base.insert(key, value);
            }
        }
    }
}
