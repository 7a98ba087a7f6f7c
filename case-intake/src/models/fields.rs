// Static form catalog
//
// Every step, field, spoken language, and extraction keyword the wizard knows about is
// declared here. Nothing in this file is mutated at runtime.

use serde::Serialize;

pub const PERSONAL_STEP: usize = 0;
pub const CASE_STEP: usize = 1;
pub const REVIEW_STEP: usize = 2;
pub const STATUS_STEP: usize = 3;

/// Field id of the free-text description that feeds the guidance analyzer.
pub const DESCRIPTION_FIELD: &str = "description";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum InputKind {
    ShortText,
    LongText,
    SingleSelect,
    Date,
    File,
}

impl InputKind {
    pub fn accepts_text(&self) -> bool {
        !matches!(self, InputKind::File)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ValidationRule {
    pub pattern: &'static str,
    pub message: &'static str,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FieldSpec {
    pub id: &'static str,
    pub label: &'static str,
    pub kind: InputKind,
    /// Only populated for `InputKind::SingleSelect`.
    pub options: &'static [&'static str],
    pub required: bool,
    pub rule: Option<ValidationRule>,
    pub help: &'static str,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StepSpec {
    pub title: &'static str,
    pub fields: &'static [FieldSpec],
}

impl StepSpec {
    pub fn is_data_entry(&self) -> bool {
        !self.fields.is_empty()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SpokenLanguage {
    pub name: &'static str,
    /// BCP-47 tag handed to the recognizer (e.g. `hi-IN`).
    pub recognition_code: &'static str,
    /// Language code understood by the translation service (e.g. `hi`).
    pub translation_code: &'static str,
}

pub const PROCESSING_LANGUAGE: &str = "en";

pub static LANGUAGES: [SpokenLanguage; 6] = [
    SpokenLanguage {
        name: "English",
        recognition_code: "en-IN",
        translation_code: "en",
    },
    SpokenLanguage {
        name: "Hindi",
        recognition_code: "hi-IN",
        translation_code: "hi",
    },
    SpokenLanguage {
        name: "Tamil",
        recognition_code: "ta-IN",
        translation_code: "ta",
    },
    SpokenLanguage {
        name: "Telugu",
        recognition_code: "te-IN",
        translation_code: "te",
    },
    SpokenLanguage {
        name: "Bengali",
        recognition_code: "bn-IN",
        translation_code: "bn",
    },
    SpokenLanguage {
        name: "Marathi",
        recognition_code: "mr-IN",
        translation_code: "mr",
    },
];

const LANGUAGE_OPTIONS: &[&str] = &["English", "Hindi", "Tamil", "Telugu", "Bengali", "Marathi"];

const CASE_TYPE_OPTIONS: &[&str] = &[
    "Civil", "Criminal", "Family", "Property", "Consumer", "Labour",
];

const PERSONAL_FIELDS: &[FieldSpec] = &[
    FieldSpec {
        id: "full_name",
        label: "Full Name",
        kind: InputKind::ShortText,
        options: &[],
        required: true,
        rule: None,
        help: "As it appears on your identity document",
    },
    FieldSpec {
        id: "phone",
        label: "Mobile Number",
        kind: InputKind::ShortText,
        options: &[],
        required: true,
        rule: Some(ValidationRule {
            pattern: r"^[6-9][0-9]{9}$",
            message: "Enter a valid 10-digit mobile number",
        }),
        help: "We will send case updates to this number",
    },
    FieldSpec {
        id: "email",
        label: "Email Address",
        kind: InputKind::ShortText,
        options: &[],
        required: false,
        rule: Some(ValidationRule {
            pattern: r"^[^@\s]+@[^@\s]+\.[^@\s]+$",
            message: "Enter a valid email address",
        }),
        help: "Optional",
    },
    FieldSpec {
        id: "address",
        label: "Address",
        kind: InputKind::ShortText,
        options: &[],
        required: true,
        rule: None,
        help: "Current residential address",
    },
    FieldSpec {
        id: "preferred_language",
        label: "Preferred Language",
        kind: InputKind::SingleSelect,
        options: LANGUAGE_OPTIONS,
        required: true,
        rule: None,
        help: "Language for correspondence",
    },
    FieldSpec {
        id: "id_proof",
        label: "Identity Proof",
        kind: InputKind::File,
        options: &[],
        required: false,
        rule: None,
        help: "Aadhaar, PAN, voter ID or passport (optional)",
    },
];

const CASE_FIELDS: &[FieldSpec] = &[
    FieldSpec {
        id: "case_type",
        label: "Case Type",
        kind: InputKind::SingleSelect,
        options: CASE_TYPE_OPTIONS,
        required: true,
        rule: None,
        help: "Pick the closest match",
    },
    FieldSpec {
        id: "incident_date",
        label: "Date of Incident",
        kind: InputKind::Date,
        options: &[],
        required: true,
        rule: Some(ValidationRule {
            pattern: r"^\d{4}-\d{2}-\d{2}$",
            message: "Use the format YYYY-MM-DD",
        }),
        help: "YYYY-MM-DD",
    },
    FieldSpec {
        id: "opposing_party",
        label: "Opposing Party",
        kind: InputKind::ShortText,
        options: &[],
        required: false,
        rule: None,
        help: "Person or organisation the case is against",
    },
    FieldSpec {
        id: DESCRIPTION_FIELD,
        label: "Case Description",
        kind: InputKind::LongText,
        options: &[],
        required: true,
        rule: None,
        help: "Describe what happened; guidance appears once you pause typing",
    },
    FieldSpec {
        id: "supporting_document",
        label: "Supporting Document",
        kind: InputKind::File,
        options: &[],
        required: false,
        rule: None,
        help: "FIR, notice, contract or any related paper (optional)",
    },
];

pub static STEPS: [StepSpec; 4] = [
    StepSpec {
        title: "Personal Information",
        fields: PERSONAL_FIELDS,
    },
    StepSpec {
        title: "Case Details",
        fields: CASE_FIELDS,
    },
    StepSpec {
        title: "Review",
        fields: &[],
    },
    StepSpec {
        title: "Application Status",
        fields: &[],
    },
];

/// Trigger keywords per field, including transliterations and Devanagari spellings.
pub static FIELD_KEYWORDS: &[(&str, &[&str])] = &[
    ("full_name", &["name", "naam", "नाम"]),
    ("address", &["address", "pata", "पता"]),
    ("phone", &["phone", "mobile", "फोन", "मोबाइल"]),
    ("email", &["email", "ईमेल"]),
    ("opposing_party", &["against", "khilaf", "खिलाफ"]),
];

pub fn step_count() -> usize {
    STEPS.len()
}

pub fn find_field(id: &str) -> Option<&'static FieldSpec> {
    STEPS
        .iter()
        .flat_map(|s| s.fields.iter())
        .find(|f| f.id == id)
}

pub fn step_of_field(id: &str) -> Option<usize> {
    STEPS
        .iter()
        .position(|s| s.fields.iter().any(|f| f.id == id))
}

pub fn find_language(code: &str) -> Option<&'static SpokenLanguage> {
    let code = code.trim();
    LANGUAGES.iter().find(|l| {
        l.recognition_code.eq_ignore_ascii_case(code) || l.translation_code.eq_ignore_ascii_case(code)
    })
}

pub fn default_language() -> &'static SpokenLanguage {
    &LANGUAGES[0]
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn catalog_has_two_data_steps_then_review_and_status() {
        assert_eq!(step_count(), 4);
        assert!(STEPS[PERSONAL_STEP].is_data_entry());
        assert!(STEPS[CASE_STEP].is_data_entry());
        assert!(!STEPS[REVIEW_STEP].is_data_entry());
        assert!(!STEPS[STATUS_STEP].is_data_entry());
    }

    #[test]
    fn field_ids_are_unique() {
        let mut ids: Vec<&str> = STEPS
            .iter()
            .flat_map(|s| s.fields.iter().map(|f| f.id))
            .collect();
        let before = ids.len();
        ids.sort_unstable();
        ids.dedup();
        assert_eq!(before, ids.len(), "duplicate field id in catalog");
    }

    #[test]
    fn keyword_targets_exist_in_catalog() {
        for (field, keywords) in FIELD_KEYWORDS {
            assert!(find_field(field).is_some(), "unknown keyword target {}", field);
            assert!(!keywords.is_empty());
        }
    }

    #[test]
    fn select_fields_carry_options() {
        for f in STEPS.iter().flat_map(|s| s.fields.iter()) {
            assert_eq!(
                f.kind == InputKind::SingleSelect,
                !f.options.is_empty(),
                "options mismatch on {}",
                f.id
            );
        }
    }

    #[test]
    fn languages_resolve_by_either_code() {
        assert_eq!(find_language("hi-IN").map(|l| l.name), Some("Hindi"));
        assert_eq!(find_language("ta").map(|l| l.name), Some("Tamil"));
        assert!(find_language("xx").is_none());
        assert_eq!(step_of_field(DESCRIPTION_FIELD), Some(CASE_STEP));
    }
}
