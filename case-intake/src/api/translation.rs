// Translation collaborator
// Azure Translator-compatible REST client. Callers treat every error as "unavailable".

use async_trait::async_trait;
use log::{debug, warn};
use std::time::Duration;
use tokio_retry::strategy::{jitter, ExponentialBackoff};
use tokio_retry::RetryIf;
use url::Url;

use crate::config::{EnrichmentConfig, TranslatorSettings};
use crate::models::requests::TranslatorRequestItem;
use crate::models::responses::{TranslationResult, TranslatorResponseItem};
use crate::utils::logging::{preview, redact_url};

const TRANSLATOR_API_VERSION: &str = "3.0";
const REQUEST_TIMEOUT: Duration = Duration::from_secs(12);

#[derive(Debug, thiserror::Error)]
pub enum TranslationError {
    #[error("translation service is not configured")]
    NotConfigured,
    #[error("translation request failed: {0}")]
    Transport(#[from] reqwest::Error),
    #[error("translation service returned HTTP {0}")]
    Status(u16),
    #[error("translation service returned no text")]
    EmptyResponse,
    #[error("invalid translation endpoint: {0}")]
    Endpoint(#[from] url::ParseError),
}

impl TranslationError {
    fn is_transient(&self) -> bool {
        match self {
            TranslationError::Transport(e) => e.is_timeout() || e.is_connect(),
            TranslationError::Status(code) => *code == 429 || *code >= 500,
            _ => false,
        }
    }
}

#[async_trait]
pub trait Translator: Send + Sync {
    /// `source` and `target` are translation codes such as `hi` and `en`.
    async fn translate(
        &self,
        text: &str,
        source: &str,
        target: &str,
    ) -> Result<TranslationResult, TranslationError>;
}

pub struct AzureTranslator {
    http: reqwest::Client,
    settings: Option<TranslatorSettings>,
}

impl AzureTranslator {
    pub fn new(settings: Option<TranslatorSettings>) -> anyhow::Result<Self> {
        let http = reqwest::Client::builder().timeout(REQUEST_TIMEOUT).build()?;
        Ok(Self { http, settings })
    }

    pub fn from_config(cfg: &EnrichmentConfig) -> anyhow::Result<Self> {
        Self::new(cfg.translator.clone())
    }

    pub fn is_configured(&self) -> bool {
        self.settings.is_some()
    }

    async fn attempt(
        &self,
        settings: &TranslatorSettings,
        url: &Url,
        text: &str,
    ) -> Result<String, TranslationError> {
        let mut req = self
            .http
            .post(url.clone())
            .header("Ocp-Apim-Subscription-Key", &settings.api_key)
            .json(&[TranslatorRequestItem { text }]);
        if let Some(region) = &settings.region {
            req = req.header("Ocp-Apim-Subscription-Region", region);
        }

        let resp = req.send().await?;
        if !resp.status().is_success() {
            return Err(TranslationError::Status(resp.status().as_u16()));
        }

        let items: Vec<TranslatorResponseItem> = resp.json().await?;
        first_translation(items)
    }
}

#[async_trait]
impl Translator for AzureTranslator {
    async fn translate(
        &self,
        text: &str,
        source: &str,
        target: &str,
    ) -> Result<TranslationResult, TranslationError> {
        if text.trim().is_empty() || source.eq_ignore_ascii_case(target) {
            return Ok(TranslationResult {
                translated_text: text.to_string(),
                source_language: source.to_string(),
                target_language: target.to_string(),
            });
        }

        let Some(settings) = self.settings.as_ref() else {
            return Err(TranslationError::NotConfigured);
        };

        let url = translate_url(&settings.endpoint, source, target)?;
        debug!(
            "[PHASE: enrichment] [STEP: translate] {} -> {} via {} ({})",
            source,
            target,
            redact_url(url.as_str()),
            preview(text, 40)
        );

        let strategy = ExponentialBackoff::from_millis(150)
            .factor(2)
            .max_delay(Duration::from_secs(2))
            .take(3)
            .map(jitter);

        let translated = RetryIf::start(
            strategy,
            || self.attempt(settings, &url, text),
            |e: &TranslationError| e.is_transient(),
        )
        .await
        .map_err(|e| {
            warn!(
                "[PHASE: enrichment] [STEP: translate] Translation {} -> {} failed: {}",
                source, target, e
            );
            e
        })?;

        Ok(TranslationResult {
            translated_text: translated,
            source_language: source.to_string(),
            target_language: target.to_string(),
        })
    }
}

fn translate_url(endpoint: &Url, source: &str, target: &str) -> Result<Url, TranslationError> {
    let mut base = endpoint.clone();
    if !base.path().ends_with('/') {
        let path = format!("{}/", base.path());
        base.set_path(&path);
    }
    let mut url = base.join("translate")?;
    url.query_pairs_mut()
        .append_pair("api-version", TRANSLATOR_API_VERSION)
        .append_pair("from", source)
        .append_pair("to", target);
    Ok(url)
}

fn first_translation(items: Vec<TranslatorResponseItem>) -> Result<String, TranslationError> {
    items
        .into_iter()
        .flat_map(|i| i.translations)
        .map(|t| t.text)
        .find(|t| !t.trim().is_empty())
        .ok_or(TranslationError::EmptyResponse)
}
