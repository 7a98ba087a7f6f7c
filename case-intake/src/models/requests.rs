// Enrichment request models (vendor wire shapes)

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize)]
pub struct TranslatorRequestItem<'a> {
    #[serde(rename = "Text")]
    pub text: &'a str,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChatMessage {
    pub role: String,
    #[serde(default)]
    pub content: String,
}

impl ChatMessage {
    pub fn system(content: impl Into<String>) -> Self {
        Self {
            role: "system".to_string(),
            content: content.into(),
        }
    }

    pub fn user(content: impl Into<String>) -> Self {
        Self {
            role: "user".to_string(),
            content: content.into(),
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct ResponseFormat {
    #[serde(rename = "type")]
    pub kind: &'static str,
}

#[derive(Debug, Clone, Serialize)]
pub struct ChatCompletionRequest {
    pub messages: Vec<ChatMessage>,
    pub temperature: f32,
    pub max_tokens: u32,
    pub response_format: ResponseFormat,
}

impl ChatCompletionRequest {
    /// Low-temperature request that asks the model for a single JSON object.
    pub fn json(system: &str, user: &str) -> Self {
        Self {
            messages: vec![ChatMessage::system(system), ChatMessage::user(user)],
            temperature: 0.2,
            max_tokens: 800,
            response_format: ResponseFormat {
                kind: "json_object",
            },
        }
    }
}
