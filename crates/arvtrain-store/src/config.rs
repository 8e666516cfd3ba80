//! Trainer configuration and collaborator factory.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};

use arvtrain_core::aggregate::CompositeWeights;
use arvtrain_core::distractor::DistractorConfig;
use arvtrain_core::grade::{Grade, GradeScale, DEFAULT_THRESHOLDS};
use arvtrain_core::session::GradingPolicy;
use arvtrain_core::traits::{ProgressStore, PropertySource, ResultSink};

use crate::file::JsonFileStore;
use crate::sink::{JsonlSink, NullSink, WebhookSink};
use crate::source::{HttpSource, JsonFileSource};

/// Where ground-truth properties come from.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum DataSourceConfig {
    File {
        path: PathBuf,
    },
    Http {
        url: String,
        #[serde(default)]
        timeout_secs: Option<u64>,
    },
}

impl Default for DataSourceConfig {
    fn default() -> Self {
        DataSourceConfig::File {
            path: PathBuf::from("properties.json"),
        }
    }
}

/// Where completed unit summaries are sent.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum SinkConfig {
    Webhook { url: String },
    Jsonl { path: PathBuf },
    None,
}

impl Default for SinkConfig {
    fn default() -> Self {
        SinkConfig::Jsonl {
            path: PathBuf::from("./arvtrain-progress/results.jsonl"),
        }
    }
}

/// Grade thresholds and composite weights.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GradingConfig {
    /// `(grade, max deviation %)` pairs in ascending order; `F` catches the rest.
    #[serde(default = "default_thresholds")]
    pub thresholds: Vec<(Grade, f64)>,
    #[serde(default = "default_arv_weight")]
    pub arv_weight: f64,
    #[serde(default = "default_reno_weight")]
    pub reno_weight: f64,
}

fn default_thresholds() -> Vec<(Grade, f64)> {
    DEFAULT_THRESHOLDS.to_vec()
}
fn default_arv_weight() -> f64 {
    0.6
}
fn default_reno_weight() -> f64 {
    0.4
}

impl Default for GradingConfig {
    fn default() -> Self {
        Self {
            thresholds: default_thresholds(),
            arv_weight: default_arv_weight(),
            reno_weight: default_reno_weight(),
        }
    }
}

/// Top-level arvtrain configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ArvtrainConfig {
    #[serde(default)]
    pub data_source: DataSourceConfig,
    /// Directory holding one progress file per trainee.
    #[serde(default = "default_progress_dir")]
    pub progress_dir: PathBuf,
    #[serde(default = "default_history_path")]
    pub history_path: PathBuf,
    /// Curriculum TOML file or directory. The built-in catalog when unset.
    #[serde(default)]
    pub curricula: Option<PathBuf>,
    #[serde(default)]
    pub default_trainee: Option<String>,
    #[serde(default)]
    pub sink: SinkConfig,
    #[serde(default)]
    pub grading: GradingConfig,
    #[serde(default)]
    pub distractors: DistractorConfig,
}

fn default_progress_dir() -> PathBuf {
    PathBuf::from("./arvtrain-progress")
}
fn default_history_path() -> PathBuf {
    PathBuf::from("./arvtrain-progress/history.json")
}

impl Default for ArvtrainConfig {
    fn default() -> Self {
        Self {
            data_source: DataSourceConfig::default(),
            progress_dir: default_progress_dir(),
            history_path: default_history_path(),
            curricula: None,
            default_trainee: None,
            sink: SinkConfig::default(),
            grading: GradingConfig::default(),
            distractors: DistractorConfig::default(),
        }
    }
}

impl ArvtrainConfig {
    /// Grading policy built from the `[grading]` and `[distractors]` tables.
    pub fn grading_policy(&self) -> Result<GradingPolicy> {
        let scale = GradeScale::from_pairs(&self.grading.thresholds)
            .context("invalid [grading] thresholds")?;
        let weights = CompositeWeights {
            arv: self.grading.arv_weight,
            reno: self.grading.reno_weight,
        };
        if !(weights.arv >= 0.0 && weights.reno >= 0.0 && weights.arv + weights.reno > 0.0) {
            anyhow::bail!(
                "invalid [grading] weights: arv_weight={} reno_weight={}",
                weights.arv,
                weights.reno
            );
        }
        // Rejects offsets without exactly one 1.0 before any session starts.
        arvtrain_core::distractor::candidate_values(100_000.0, &self.distractors)
            .context("invalid [distractors] table")?;
        Ok(GradingPolicy {
            scale,
            weights,
            distractors: self.distractors.clone(),
            ..GradingPolicy::default()
        })
    }
}

/// Resolve environment variable references like `${VAR_NAME}` in a string.
///
/// Substituted values are copied as-is and never rescanned.
fn resolve_env_vars(s: &str) -> String {
    let mut result = String::with_capacity(s.len());
    let mut rest = s;
    while let Some(start) = rest.find("${") {
        let Some(end) = rest[start..].find('}') else {
            break;
        };
        result.push_str(&rest[..start]);
        let var_name = &rest[start + 2..start + end];
        result.push_str(&std::env::var(var_name).unwrap_or_default());
        rest = &rest[start + end + 1..];
    }
    result.push_str(rest);
    result
}

fn resolve_path(path: &Path) -> PathBuf {
    PathBuf::from(resolve_env_vars(&path.to_string_lossy()))
}

/// Resolve `${VAR}` references and apply the sink URL override.
fn finalize(mut config: ArvtrainConfig, sink_url: Option<String>) -> ArvtrainConfig {
    if let Some(url) = sink_url.filter(|u| !u.trim().is_empty()) {
        config.sink = SinkConfig::Webhook { url };
    }

    config.data_source = match config.data_source {
        DataSourceConfig::File { path } => DataSourceConfig::File {
            path: resolve_path(&path),
        },
        DataSourceConfig::Http { url, timeout_secs } => DataSourceConfig::Http {
            url: resolve_env_vars(&url),
            timeout_secs,
        },
    };
    config.sink = match config.sink {
        SinkConfig::Webhook { url } => SinkConfig::Webhook {
            url: resolve_env_vars(&url),
        },
        SinkConfig::Jsonl { path } => SinkConfig::Jsonl {
            path: resolve_path(&path),
        },
        SinkConfig::None => SinkConfig::None,
    };
    config.progress_dir = resolve_path(&config.progress_dir);
    config.history_path = resolve_path(&config.history_path);
    config.curricula = config.curricula.as_deref().map(resolve_path);
    config
}

/// Load configuration from well-known paths.
///
/// Search order:
/// 1. `arvtrain.toml` in the current directory
/// 2. `~/.config/arvtrain/config.toml`
///
/// `ARVTRAIN_SINK_URL` replaces the configured sink with a webhook.
pub fn load_config() -> Result<ArvtrainConfig> {
    load_config_from(None)
}

/// Load config from an explicit path, or search the default locations.
pub fn load_config_from(path: Option<&Path>) -> Result<ArvtrainConfig> {
    let config_path = if let Some(p) = path {
        if p.exists() {
            Some(p.to_path_buf())
        } else {
            anyhow::bail!("config file not found: {}", p.display());
        }
    } else {
        let local = PathBuf::from("arvtrain.toml");
        if local.exists() {
            Some(local)
        } else {
            dirs_path()
                .map(|home| home.join("config.toml"))
                .filter(|global| global.exists())
        }
    };

    let config = match config_path {
        Some(path) => {
            let content = std::fs::read_to_string(&path)
                .with_context(|| format!("failed to read config: {}", path.display()))?;
            let config = toml::from_str::<ArvtrainConfig>(&content)
                .with_context(|| format!("failed to parse config: {}", path.display()))?;
            tracing::debug!(path = %path.display(), "loaded config");
            config
        }
        None => ArvtrainConfig::default(),
    };

    Ok(finalize(config, std::env::var("ARVTRAIN_SINK_URL").ok()))
}

fn dirs_path() -> Option<PathBuf> {
    std::env::var("HOME")
        .ok()
        .map(|h| PathBuf::from(h).join(".config").join("arvtrain"))
}

/// Create the property source described by `config`.
pub fn create_source(config: &DataSourceConfig) -> Result<Arc<dyn PropertySource>> {
    match config {
        DataSourceConfig::File { path } => Ok(Arc::new(JsonFileSource::new(path))),
        DataSourceConfig::Http { url, timeout_secs } => {
            if url.trim().is_empty() {
                anyhow::bail!("http data source needs a url");
            }
            Ok(Arc::new(HttpSource::new(url, *timeout_secs)?))
        }
    }
}

/// Create the result sink described by `config`.
pub fn create_sink(config: &SinkConfig) -> Result<Arc<dyn ResultSink>> {
    match config {
        SinkConfig::Webhook { url } if url.trim().is_empty() => {
            tracing::warn!("webhook sink has no url; results will not be sent");
            Ok(Arc::new(NullSink))
        }
        SinkConfig::Webhook { url } => Ok(Arc::new(WebhookSink::new(url)?)),
        SinkConfig::Jsonl { path } => Ok(Arc::new(JsonlSink::new(path))),
        SinkConfig::None => Ok(Arc::new(NullSink)),
    }
}

/// Create the JSON-file progress store rooted at `progress_dir`.
pub fn create_store(config: &ArvtrainConfig) -> Arc<dyn ProgressStore> {
    Arc::new(JsonFileStore::new(&config.progress_dir))
}
