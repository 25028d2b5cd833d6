//! CLI configuration loading and model construction.

use anyhow::{Context, Result};
use graphwright_abstraction::Model;
use graphwright_core::GraphwrightConfig;
use graphwright_core::docs::{DocsCache, DocsIngestor};
use graphwright_models::{ModelConfig, ModelFactory};
use std::path::Path;
use std::sync::Arc;

/// Load and merge CLI configuration.
///
/// Configuration precedence:
/// 1. CLI arguments (applied by each command)
/// 2. Environment variables (`GRAPHWRIGHT_*`)
/// 3. Explicit `--config` file
/// 4. Local config file (./.graphwrightrc)
/// 5. Global config file (~/.graphwright/config.toml)
/// 6. Defaults
pub fn load_config(explicit: Option<&Path>) -> Result<GraphwrightConfig> {
    GraphwrightConfig::load(explicit).context("Failed to load configuration")
}

/// Builds a model of the configured engine.
pub fn create_model(config: &GraphwrightConfig, model_id: &str) -> Result<Arc<dyn Model>> {
    let model_type = ModelFactory::parse_type(&config.model.engine)?;

    let mut model_config = ModelConfig::new(model_type, model_id.to_string());
    if let Some(ref api_key) = config.model.api_key {
        model_config = model_config.with_api_key(api_key.clone());
    }
    if let Some(ref base_url) = config.model.base_url {
        model_config = model_config.with_base_url(base_url.clone());
    }

    let model: Arc<dyn Model> = ModelFactory::create(model_config)
        .with_context(|| format!("Failed to create {} model '{}'", config.model.engine, model_id))?;
    Ok(model)
}

/// Docs cache that crawls the configured URL when the cache file is missing.
pub fn docs_cache(config: &GraphwrightConfig) -> Result<DocsCache> {
    let ingestor = docs_ingestor(config)?;
    Ok(DocsCache::new(config.docs_path(), ingestor))
}

/// Crawler for the configured documentation site.
pub fn docs_ingestor(config: &GraphwrightConfig) -> Result<DocsIngestor> {
    DocsIngestor::new(&config.docs.url, config.docs.max_depth).context("Invalid docs configuration")
}
