//! `sapwood.toml` loading
//!
//! Every field has a default, so a missing file means default settings.
//! CLI flags are applied on top by the commands.

use anyhow::{Context, Result, bail};
use sapwood_ai::{OrchestratorConfig, PromptLimits, ProviderConfig, RetryPolicy};
use sapwood_core::CacheOptions;
use sapwood_core::cache::persist;
use sapwood_indexer::IndexOptions;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;

pub const CONFIG_FILE: &str = "sapwood.toml";

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SapwoodConfig {
    pub cache: CacheSection,
    pub inference: InferenceSection,
    pub aggregation: AggregationSection,
    pub index: IndexOptions,
    pub output: OutputSection,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CacheSection {
    pub enabled: bool,
    /// Defaults to `.sapwood/cache` under the repository root.
    pub dir: Option<PathBuf>,
    /// Entries older than this are regenerated. Unset means never.
    pub ttl_hours: Option<u64>,
}

impl Default for CacheSection {
    fn default() -> Self {
        CacheSection {
            enabled: true,
            dir: None,
            ttl_hours: None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct InferenceSection {
    pub provider: String,
    pub model: Option<String>,
    pub api_key_env: Option<String>,
    pub base_url: Option<String>,
    pub temperature: f32,
    pub max_tokens: u32,
    pub max_concurrent_calls: usize,
    pub timeout_secs: u64,
    pub max_attempts: u32,
    pub backoff_ms: u64,
    /// Total tokens a run may spend. Unset means unlimited.
    pub token_budget: Option<u64>,
}

impl Default for InferenceSection {
    fn default() -> Self {
        InferenceSection {
            provider: "local".to_string(),
            model: None,
            api_key_env: None,
            base_url: None,
            temperature: 0.2,
            max_tokens: 600,
            max_concurrent_calls: 8,
            timeout_secs: 60,
            max_attempts: 3,
            backoff_ms: 500,
            token_budget: None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AggregationSection {
    pub min_module_entities: usize,
    pub architecture: bool,
}

impl Default for AggregationSection {
    fn default() -> Self {
        AggregationSection {
            min_module_entities: 2,
            architecture: true,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct OutputSection {
    /// Relative paths are taken from the repository root.
    pub dir: PathBuf,
}

impl Default for OutputSection {
    fn default() -> Self {
        OutputSection {
            dir: PathBuf::from(persist::WORK_DIR).join("output"),
        }
    }
}

impl SapwoodConfig {
    /// Load `explicit`, or `sapwood.toml` under `root` when present.
    /// Returns the config and the file it came from.
    pub fn load(root: &Path, explicit: Option<&Path>) -> Result<(Self, Option<PathBuf>)> {
        let path = match explicit {
            Some(path) => path.to_path_buf(),
            None => {
                let default = root.join(CONFIG_FILE);
                if !default.exists() {
                    tracing::debug!("No {} found, using defaults", CONFIG_FILE);
                    return Ok((Self::default(), None));
                }
                default
            }
        };
        let contents =
            std::fs::read_to_string(&path).with_context(|| format!("Failed to read config at {}", path.display()))?;
        let config = Self::parse(&contents).with_context(|| format!("Invalid config at {}", path.display()))?;
        Ok((config, Some(path)))
    }

    /// Parse configuration from TOML string
    pub fn parse(contents: &str) -> Result<Self> {
        let config: SapwoodConfig = toml::from_str(contents).context("Failed to parse config")?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<()> {
        if self.inference.max_concurrent_calls == 0 {
            bail!("inference.max_concurrent_calls must be at least 1");
        }
        if self.inference.max_attempts == 0 {
            bail!("inference.max_attempts must be at least 1");
        }
        if self.inference.timeout_secs == 0 {
            bail!("inference.timeout_secs must be at least 1");
        }
        Ok(())
    }

    pub fn cache_dir(&self, root: &Path) -> PathBuf {
        match &self.cache.dir {
            Some(dir) if dir.is_absolute() => dir.clone(),
            Some(dir) => root.join(dir),
            None => persist::cache_dir(root),
        }
    }

    pub fn output_dir(&self, root: &Path) -> PathBuf {
        if self.output.dir.is_absolute() {
            self.output.dir.clone()
        } else {
            root.join(&self.output.dir)
        }
    }

    /// Cache options bound to the model that will produce new entries.
    pub fn cache_options(&self, model_identity: Option<String>) -> CacheOptions {
        CacheOptions {
            ttl: self
                .cache
                .ttl_hours
                .and_then(|h| i64::try_from(h).ok())
                .and_then(chrono::Duration::try_hours),
            model_identity,
        }
    }

    pub fn provider_config(&self) -> ProviderConfig {
        let inference = &self.inference;
        ProviderConfig {
            provider: inference.provider.clone(),
            model: inference.model.clone(),
            api_key: None,
            api_key_env: inference.api_key_env.clone(),
            base_url: inference.base_url.clone(),
            temperature: inference.temperature,
            max_tokens: inference.max_tokens,
            request_timeout: Duration::from_secs(inference.timeout_secs.saturating_mul(2)),
        }
    }

    pub fn orchestrator_config(&self) -> OrchestratorConfig {
        let inference = &self.inference;
        let initial_backoff = Duration::from_millis(inference.backoff_ms);
        OrchestratorConfig {
            max_concurrent_calls: inference.max_concurrent_calls,
            retry: RetryPolicy {
                max_attempts: inference.max_attempts,
                initial_backoff,
                max_backoff: initial_backoff.saturating_mul(16),
                call_timeout: Duration::from_secs(inference.timeout_secs),
            },
            limits: PromptLimits::default(),
            min_module_entities: self.aggregation.min_module_entities,
            architecture: self.aggregation.architecture,
        }
    }
}

/// Load `.env` from the repository root, then the working directory.
pub fn load_dotenv(root: &Path) {
    let candidates = [root.join(".env"), PathBuf::from(".env")];
    for path in candidates.iter().filter(|p| p.exists()) {
        match dotenvy::from_path(path) {
            Ok(()) => tracing::debug!("Loaded {}", path.display()),
            Err(e) => tracing::warn!("Failed to load {}: {}", path.display(), e),
        }
    }
}
