pub mod history;
pub mod init;
pub mod progress;
pub mod score;
pub mod train;
pub mod validate;

use std::path::PathBuf;

use anyhow::{Context, Result};

use arvtrain_core::curriculum::Catalog;
use arvtrain_core::engine::{Trainer, TrainerConfig};
use arvtrain_core::parser;
use arvtrain_store::config::{create_sink, create_source, create_store, load_config_from};
use arvtrain_store::ArvtrainConfig;

pub fn load_config(path: Option<&PathBuf>) -> Result<ArvtrainConfig> {
    load_config_from(path.map(PathBuf::as_path))
}

/// The configured catalog, or the built-in one. Validation problems are
/// logged, not fatal.
pub fn load_catalog(config: &ArvtrainConfig) -> Result<Catalog> {
    let catalog = match &config.curricula {
        Some(path) => parser::load_catalog(path)
            .with_context(|| format!("failed to load curricula from {}", path.display()))?,
        None => parser::default_catalog()?,
    };
    for w in parser::validate_catalog(&catalog) {
        tracing::warn!(curriculum = ?w.curriculum, unit = ?w.unit, "{}", w.message);
    }
    Ok(catalog)
}

pub fn build_trainer(config: &ArvtrainConfig) -> Result<Trainer> {
    let trainer_config = TrainerConfig {
        policy: config.grading_policy()?,
        ..TrainerConfig::default()
    };
    Ok(Trainer::new(
        create_source(&config.data_source)?,
        create_store(config),
        create_sink(&config.sink)?,
        load_catalog(config)?,
        trainer_config,
    ))
}

pub fn resolve_trainee(config: &ArvtrainConfig, trainee: Option<String>) -> Result<String> {
    trainee
        .or_else(|| config.default_trainee.clone())
        .filter(|t| !t.trim().is_empty())
        .context("no trainee given; pass --trainee or set default_trainee in arvtrain.toml")
}
