// Enrichment response models
// Advisory payloads surfaced to the wizard plus the vendor wire shapes they are parsed from.

use serde::{Deserialize, Serialize};

use super::requests::ChatMessage;

// =========================
// Advisory results
// =========================

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GuidanceResult {
    pub explanation: String,
    #[serde(default)]
    pub requirements: Vec<String>,
    #[serde(default)]
    pub suggestions: Vec<String>,
}

impl GuidanceResult {
    /// Returned when no guidance service is configured. Never blocks the form.
    pub fn unavailable() -> Self {
        Self {
            explanation: "AI guidance is not available right now. You can continue filling in the form."
                .to_string(),
            requirements: Vec::new(),
            suggestions: Vec::new(),
        }
    }

    /// Returned when the guidance service is configured but the call failed.
    pub fn fallback() -> Self {
        Self {
            explanation:
                "We could not analyze your description at the moment. Your application is not affected."
                    .to_string(),
            requirements: vec![
                "Keep copies of every document related to your case".to_string(),
                "Note the dates and places of the events you describe".to_string(),
            ],
            suggestions: vec![
                "Describe what happened in the order it happened".to_string(),
                "Mention any people or organisations involved".to_string(),
            ],
        }
    }

    pub fn is_empty(&self) -> bool {
        self.explanation.trim().is_empty()
            && self.requirements.is_empty()
            && self.suggestions.is_empty()
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DocumentValidation {
    pub is_valid: bool,
    #[serde(default)]
    pub issues: Vec<String>,
    #[serde(default)]
    pub suggestions: Vec<String>,
}

impl DocumentValidation {
    pub fn unavailable() -> Self {
        Self {
            is_valid: true,
            issues: Vec::new(),
            suggestions: vec!["Document checks are not available right now.".to_string()],
        }
    }

    pub fn fallback() -> Self {
        Self {
            is_valid: true,
            issues: Vec::new(),
            suggestions: vec![
                "We could not check this document automatically. It will be reviewed manually."
                    .to_string(),
            ],
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TranslationResult {
    pub translated_text: String,
    pub source_language: String,
    pub target_language: String,
}

// =========================
// Translator wire format
// =========================

#[derive(Debug, Clone, Deserialize)]
pub struct TranslatorResponseItem {
    #[serde(default)]
    pub translations: Vec<TranslatorTranslation>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct TranslatorTranslation {
    pub text: String,
    #[serde(default)]
    pub to: String,
}

// =========================
// Chat completions wire format
// =========================

#[derive(Debug, Clone, Deserialize)]
pub struct ChatCompletionResponse {
    #[serde(default)]
    pub choices: Vec<ChatChoice>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ChatChoice {
    pub message: ChatMessage,
}

impl ChatCompletionResponse {
    pub fn first_content(&self) -> Option<&str> {
        self.choices
            .first()
            .map(|c| c.message.content.as_str())
            .filter(|s| !s.trim().is_empty())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn guidance_parses_camel_case_with_missing_lists() {
        let g: GuidanceResult =
            serde_json::from_str(r#"{"explanation":"Tenancy dispute"}"#).unwrap();
        assert_eq!(g.explanation, "Tenancy dispute");
        assert!(g.requirements.is_empty());
        assert!(g.suggestions.is_empty());
    }

    #[test]
    fn document_validation_uses_is_valid_key() {
        let d: DocumentValidation =
            serde_json::from_str(r#"{"isValid":false,"issues":["Unsigned"]}"#).unwrap();
        assert!(!d.is_valid);
        assert_eq!(d.issues, vec!["Unsigned".to_string()]);
    }

    #[test]
    fn placeholders_are_never_empty() {
        assert!(!GuidanceResult::unavailable().is_empty());
        assert!(!GuidanceResult::fallback().is_empty());
        assert!(DocumentValidation::fallback().is_valid);
    }

    #[test]
    fn chat_response_ignores_blank_content() {
        let r: ChatCompletionResponse = serde_json::from_str(
            r#"{"choices":[{"message":{"role":"assistant","content":"  "}}]}"#,
        )
        .unwrap();
        assert!(r.first_content().is_none());
    }
}
