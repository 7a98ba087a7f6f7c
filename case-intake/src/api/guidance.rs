// Guidance and document-validation collaborator
// Azure OpenAI-compatible chat completions. Both operations are advisory: an unconfigured
// service yields an explicit "unavailable" payload and any failure yields a safe fallback,
// so callers never see an error from this path.

use anyhow::{anyhow, Context, Result};
use async_trait::async_trait;
use log::{debug, info, warn};
use serde::de::DeserializeOwned;
use std::time::Duration;
use tokio_retry::strategy::{jitter, ExponentialBackoff};
use tokio_retry::RetryIf;
use url::Url;

use crate::config::{EnrichmentConfig, OpenAiSettings};
use crate::models::requests::ChatCompletionRequest;
use crate::models::responses::{ChatCompletionResponse, DocumentValidation, GuidanceResult};
use crate::utils::logging::{preview, redact_url};

const REQUEST_TIMEOUT: Duration = Duration::from_secs(30);
const MAX_LIST_ITEMS: usize = 8;
const MAX_DOCUMENT_CHARS: usize = 12_000;

const GUIDANCE_PROMPT: &str = "You help people in India prepare legal case filings. \
Read the case description and reply with a JSON object with exactly these keys: \
\"explanation\" (a short plain-language summary of the legal situation), \
\"requirements\" (array of documents or facts the person will likely need), \
\"suggestions\" (array of ways to improve the description). \
Do not give a verdict. Keep every item under 25 words.";

const DOCUMENT_PROMPT: &str = "You review documents attached to legal case filings. \
Reply with a JSON object with exactly these keys: \
\"isValid\" (boolean, false only if the document is clearly unusable for a filing), \
\"issues\" (array of concrete problems found), \
\"suggestions\" (array of fixes). Keep every item under 25 words.";

#[async_trait]
pub trait GuidanceClient: Send + Sync {
    async fn analyze_case_description(&self, text: &str) -> Result<GuidanceResult>;

    async fn validate_document(&self, document_text: &str) -> Result<DocumentValidation>;
}

pub struct AzureOpenAiClient {
    http: reqwest::Client,
    settings: Option<OpenAiSettings>,
}

impl AzureOpenAiClient {
    pub fn new(settings: Option<OpenAiSettings>) -> Result<Self> {
        let http = reqwest::Client::builder().timeout(REQUEST_TIMEOUT).build()?;
        Ok(Self { http, settings })
    }

    pub fn from_config(cfg: &EnrichmentConfig) -> Result<Self> {
        Self::new(cfg.openai.clone())
    }

    pub fn is_configured(&self) -> bool {
        self.settings.is_some()
    }

    async fn chat_json<T: DeserializeOwned + Send>(
        &self,
        settings: &OpenAiSettings,
        system: &str,
        user: &str,
    ) -> Result<T> {
        let url = completions_url(settings)?;
        let body = ChatCompletionRequest::json(system, user);
        debug!(
            "[PHASE: enrichment] [STEP: chat] POST {}",
            redact_url(url.as_str())
        );

        let attempt = || async {
            let resp = self
                .http
                .post(url.clone())
                .header("api-key", &settings.api_key)
                .json(&body)
                .send()
                .await?;
            if !resp.status().is_success() {
                return Err(anyhow!("HTTP {}", resp.status()));
            }
            let parsed: ChatCompletionResponse = resp.json().await?;
            let content = parsed
                .first_content()
                .ok_or_else(|| anyhow!("completion contained no message content"))?;
            parse_model_json::<T>(content)
        };

        let strategy = ExponentialBackoff::from_millis(200)
            .factor(2)
            .max_delay(Duration::from_secs(3))
            .take(2)
            .map(jitter);

        RetryIf::start(strategy, attempt, |e: &anyhow::Error| {
            let msg = e.to_string().to_ascii_lowercase();
            msg.contains("timed out")
                || msg.contains("timeout")
                || msg.contains("connection")
                || msg.contains("http 429")
                || msg.contains("http 5")
        })
        .await
    }
}

#[async_trait]
impl GuidanceClient for AzureOpenAiClient {
    async fn analyze_case_description(&self, text: &str) -> Result<GuidanceResult> {
        let Some(settings) = self.settings.as_ref() else {
            return Ok(GuidanceResult::unavailable());
        };

        info!(
            "[PHASE: enrichment] [STEP: guidance] Analyzing description ({} chars): {}",
            text.chars().count(),
            preview(text, 60)
        );

        match self
            .chat_json::<GuidanceResult>(settings, GUIDANCE_PROMPT, text)
            .await
        {
            Ok(g) => {
                let g = normalize_guidance(g);
                if g.is_empty() {
                    warn!("[PHASE: enrichment] [STEP: guidance] Model returned empty guidance; using fallback");
                    return Ok(GuidanceResult::fallback());
                }
                Ok(g)
            }
            Err(e) => {
                warn!(
                    "[PHASE: enrichment] [STEP: guidance] Guidance request failed: {:#}",
                    e
                );
                Ok(GuidanceResult::fallback())
            }
        }
    }

    async fn validate_document(&self, document_text: &str) -> Result<DocumentValidation> {
        let Some(settings) = self.settings.as_ref() else {
            return Ok(DocumentValidation::unavailable());
        };

        let excerpt: String = document_text.chars().take(MAX_DOCUMENT_CHARS).collect();
        match self
            .chat_json::<DocumentValidation>(settings, DOCUMENT_PROMPT, &excerpt)
            .await
        {
            Ok(mut d) => {
                d.issues = clean_list(d.issues);
                d.suggestions = clean_list(d.suggestions);
                Ok(d)
            }
            Err(e) => {
                warn!(
                    "[PHASE: enrichment] [STEP: document] Document validation failed: {:#}",
                    e
                );
                Ok(DocumentValidation::fallback())
            }
        }
    }
}

fn completions_url(settings: &OpenAiSettings) -> Result<Url> {
    let mut base = settings.endpoint.clone();
    if !base.path().ends_with('/') {
        let path = format!("{}/", base.path());
        base.set_path(&path);
    }
    let mut url = base
        .join(&format!(
            "openai/deployments/{}/chat/completions",
            settings.deployment
        ))
        .context("invalid guidance endpoint")?;
    url.query_pairs_mut()
        .append_pair("api-version", &settings.api_version);
    Ok(url)
}

/// Models sometimes wrap JSON in a markdown fence or add prose around it.
pub(crate) fn parse_model_json<T: DeserializeOwned>(content: &str) -> Result<T> {
    let trimmed = content.trim();
    if let Ok(v) = serde_json::from_str::<T>(trimmed) {
        return Ok(v);
    }

    let start = trimmed
        .find('{')
        .ok_or_else(|| anyhow!("model reply contained no JSON object"))?;
    let end = trimmed
        .rfind('}')
        .filter(|e| *e > start)
        .ok_or_else(|| anyhow!("model reply contained an unterminated JSON object"))?;
    serde_json::from_str::<T>(&trimmed[start..=end]).context("model reply was not valid JSON")
}

fn normalize_guidance(g: GuidanceResult) -> GuidanceResult {
    GuidanceResult {
        explanation: g.explanation.trim().to_string(),
        requirements: clean_list(g.requirements),
        suggestions: clean_list(g.suggestions),
    }
}

fn clean_list(items: Vec<String>) -> Vec<String> {
    items
        .into_iter()
        .map(|s| s.trim().to_string())
        .filter(|s| !s.is_empty())
        .take(MAX_LIST_ITEMS)
        .collect()
}
