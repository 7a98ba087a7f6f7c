// Enrichment configuration
//
// Resolved once at startup and passed into client constructors. A missing or half-filled
// service section disables that service; it never stops the form from running.

use config::{Config, Environment, File};
use log::{info, warn};
use serde::Deserialize;
use std::path::{Path, PathBuf};
use std::time::Duration;
use url::Url;

use crate::utils::logging::mask_secret;

pub const ENV_PREFIX: &str = "CASE_INTAKE";
pub const CONFIG_PATH_ENV: &str = "CASE_INTAKE_CONFIG";
pub const DEFAULT_CONFIG_FILE: &str = "case-intake.toml";
pub const DEFAULT_OPENAI_API_VERSION: &str = "2024-02-15-preview";
pub const DEFAULT_QUIET_PERIOD_MS: u64 = 1000;
pub const DEFAULT_MIN_DESCRIPTION_CHARS: usize = 50;

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("failed to read configuration: {0}")]
    Source(#[from] config::ConfigError),
}

#[derive(Debug, Clone, Default, Deserialize)]
struct RawSettings {
    openai_endpoint: Option<String>,
    openai_key: Option<String>,
    openai_deployment: Option<String>,
    openai_api_version: Option<String>,
    translator_endpoint: Option<String>,
    translator_key: Option<String>,
    translator_region: Option<String>,
    quiet_period_ms: Option<u64>,
    min_description_chars: Option<usize>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OpenAiSettings {
    pub endpoint: Url,
    pub api_key: String,
    pub deployment: String,
    pub api_version: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TranslatorSettings {
    pub endpoint: Url,
    pub api_key: String,
    pub region: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EnrichmentConfig {
    pub openai: Option<OpenAiSettings>,
    pub translator: Option<TranslatorSettings>,
    pub quiet_period: Duration,
    pub min_description_chars: usize,
}

impl Default for EnrichmentConfig {
    fn default() -> Self {
        Self {
            openai: None,
            translator: None,
            quiet_period: Duration::from_millis(DEFAULT_QUIET_PERIOD_MS),
            min_description_chars: DEFAULT_MIN_DESCRIPTION_CHARS,
        }
    }
}

impl EnrichmentConfig {
    /// Optional `case-intake.toml` (or `$CASE_INTAKE_CONFIG`), then `CASE_INTAKE_*` variables.
    pub fn load() -> Result<Self, ConfigError> {
        let explicit = std::env::var_os(CONFIG_PATH_ENV).map(PathBuf::from);
        let cfg = Self::load_from(explicit.as_deref(), Environment::with_prefix(ENV_PREFIX))?;
        cfg.log_summary();
        Ok(cfg)
    }

    /// An explicitly named file must exist; the default file is optional.
    pub fn load_from(file: Option<&Path>, env: Environment) -> Result<Self, ConfigError> {
        let file_source = match file {
            Some(p) => File::from(p).required(true),
            None => File::with_name(DEFAULT_CONFIG_FILE).required(false),
        };

        let raw: RawSettings = Config::builder()
            .add_source(file_source)
            .add_source(env)
            .build()?
            .try_deserialize()?;

        Ok(Self::from_raw(raw))
    }

    fn from_raw(raw: RawSettings) -> Self {
        let openai = match (
            non_blank(raw.openai_endpoint),
            non_blank(raw.openai_key),
            non_blank(raw.openai_deployment),
        ) {
            (Some(endpoint), Some(api_key), Some(deployment)) => {
                parse_endpoint("openai_endpoint", &endpoint).map(|endpoint| OpenAiSettings {
                    endpoint,
                    api_key,
                    deployment,
                    api_version: non_blank(raw.openai_api_version)
                        .unwrap_or_else(|| DEFAULT_OPENAI_API_VERSION.to_string()),
                })
            }
            (None, None, None) => None,
            _ => {
                warn!(
                    "[PHASE: configuration] [STEP: openai] Incomplete guidance settings (endpoint, key and deployment are all required); guidance disabled"
                );
                None
            }
        };

        let translator = match (
            non_blank(raw.translator_endpoint),
            non_blank(raw.translator_key),
        ) {
            (Some(endpoint), Some(api_key)) => {
                parse_endpoint("translator_endpoint", &endpoint).map(|endpoint| {
                    TranslatorSettings {
                        endpoint,
                        api_key,
                        region: non_blank(raw.translator_region),
                    }
                })
            }
            (None, None) => None,
            _ => {
                warn!(
                    "[PHASE: configuration] [STEP: translator] Incomplete translator settings (endpoint and key are required); translation disabled"
                );
                None
            }
        };

        let quiet_period_ms = raw
            .quiet_period_ms
            .filter(|ms| *ms > 0)
            .unwrap_or(DEFAULT_QUIET_PERIOD_MS);

        Self {
            openai,
            translator,
            quiet_period: Duration::from_millis(quiet_period_ms),
            min_description_chars: raw
                .min_description_chars
                .unwrap_or(DEFAULT_MIN_DESCRIPTION_CHARS),
        }
    }

    fn log_summary(&self) {
        match &self.openai {
            Some(o) => info!(
                "[PHASE: configuration] [STEP: openai] Guidance enabled (endpoint={}, deployment={}, key={})",
                o.endpoint.host_str().unwrap_or("?"),
                o.deployment,
                mask_secret(&o.api_key)
            ),
            None => info!("[PHASE: configuration] [STEP: openai] Guidance not configured"),
        }
        match &self.translator {
            Some(t) => info!(
                "[PHASE: configuration] [STEP: translator] Translation enabled (endpoint={}, region={}, key={})",
                t.endpoint.host_str().unwrap_or("?"),
                t.region.as_deref().unwrap_or("-"),
                mask_secret(&t.api_key)
            ),
            None => info!("[PHASE: configuration] [STEP: translator] Translation not configured"),
        }
    }
}

fn non_blank(value: Option<String>) -> Option<String> {
    value
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

fn parse_endpoint(key: &str, raw: &str) -> Option<Url> {
    match Url::parse(raw) {
        Ok(u) if matches!(u.scheme(), "http" | "https") => Some(u),
        Ok(u) => {
            warn!(
                "[PHASE: configuration] [STEP: {}] Unsupported endpoint scheme '{}'; service disabled",
                key,
                u.scheme()
            );
            None
        }
        Err(e) => {
            warn!(
                "[PHASE: configuration] [STEP: {}] Invalid endpoint URL: {}; service disabled",
                key, e
            );
            None
        }
    }
}
