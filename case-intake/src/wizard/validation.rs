// Step validation
//
// Only the fields of the step being validated are inspected. Each field produces at most one
// message per pass: a presence error suppresses every shape check for that field.

use chrono::NaiveDate;
use log::error;
use regex::Regex;

use crate::models::fields::{FieldSpec, InputKind, StepSpec};
use crate::models::state::{FieldValue, FormValues, ValidationErrors};

pub const SELECT_OPTION_MESSAGE: &str = "Select one of the available options";

pub fn required_message(field: &FieldSpec) -> String {
    format!("{} is required", field.label)
}

/// Full replacement set of errors for `step`; empty when the step passes.
pub fn validate_step(step: &StepSpec, values: &FormValues) -> ValidationErrors {
    let mut errors = ValidationErrors::default();
    for field in step.fields {
        if let Some(message) = validate_field(field, values.get(field.id)) {
            errors.insert(field.id, message);
        }
    }
    errors
}

pub fn validate_field(field: &FieldSpec, value: Option<&FieldValue>) -> Option<String> {
    let value = match value {
        Some(v) if !v.is_blank() => v,
        _ => {
            return field.required.then(|| required_message(field));
        }
    };

    // Attachments only carry a presence requirement.
    let text = value.as_text()?.trim();

    if field.kind == InputKind::SingleSelect && !field.options.iter().any(|o| *o == text) {
        return Some(SELECT_OPTION_MESSAGE.to_string());
    }

    if let Some(rule) = field.rule {
        let re = match Regex::new(rule.pattern) {
            Ok(re) => re,
            Err(e) => {
                error!(
                    "[PHASE: validation] [STEP: {}] Invalid pattern {:?}: {}",
                    field.id, rule.pattern, e
                );
                return None;
            }
        };
        if !re.is_match(text) {
            return Some(rule.message.to_string());
        }
        if field.kind == InputKind::Date && NaiveDate::parse_from_str(text, "%Y-%m-%d").is_err() {
            return Some(rule.message.to_string());
        }
    }

    None
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::fields::{find_field, CASE_STEP, PERSONAL_STEP, REVIEW_STEP, STEPS};
    use crate::models::state::AttachmentHandle;

    fn values(pairs: &[(&str, &str)]) -> FormValues {
        let mut v = FormValues::default();
        for (k, val) in pairs {
            v.upsert(k, FieldValue::text(*val));
        }
        v
    }

    fn valid_personal() -> FormValues {
        values(&[
            ("full_name", "Sita Devi"),
            ("phone", "9876543210"),
            ("address", "12 MG Road, Pune"),
            ("preferred_language", "Hindi"),
        ])
    }

    #[test]
    fn valid_personal_step_passes() {
        let errors = validate_step(&STEPS[PERSONAL_STEP], &valid_personal());
        assert!(errors.is_empty(), "unexpected errors: {:?}", errors);
    }

    #[test]
    fn empty_step_reports_every_required_field_only() {
        let errors = validate_step(&STEPS[PERSONAL_STEP], &FormValues::default());
        let ids: Vec<&str> = errors.field_ids().collect();
        assert_eq!(ids, vec!["address", "full_name", "phone", "preferred_language"]);
        assert_eq!(errors.get("full_name"), Some("Full Name is required"));
    }

    #[test]
    fn whitespace_counts_as_missing() {
        let mut v = valid_personal();
        v.upsert("full_name", FieldValue::text("   "));
        let errors = validate_step(&STEPS[PERSONAL_STEP], &v);
        assert_eq!(errors.len(), 1);
        assert!(errors.get("full_name").unwrap().contains("required"));
    }

    #[test]
    fn pattern_mismatch_uses_rule_message() {
        let mut v = valid_personal();
        v.upsert("phone", FieldValue::text("12345"));
        let errors = validate_step(&STEPS[PERSONAL_STEP], &v);
        assert_eq!(
            errors.get("phone"),
            Some("Enter a valid 10-digit mobile number")
        );
        assert_eq!(errors.len(), 1);
    }

    #[test]
    fn optional_field_is_pattern_checked_only_when_filled() {
        let mut v = valid_personal();
        v.upsert("email", FieldValue::text(""));
        assert!(validate_step(&STEPS[PERSONAL_STEP], &v).is_empty());

        v.upsert("email", FieldValue::text("not-an-email"));
        let errors = validate_step(&STEPS[PERSONAL_STEP], &v);
        assert_eq!(errors.get("email"), Some("Enter a valid email address"));
    }

    #[test]
    fn required_message_takes_precedence_over_pattern() {
        let phone = find_field("phone").unwrap();
        let msg = validate_field(phone, Some(&FieldValue::text(" "))).unwrap();
        assert_eq!(msg, "Mobile Number is required");
    }

    #[test]
    fn select_value_must_be_an_option() {
        let mut v = valid_personal();
        v.upsert("preferred_language", FieldValue::text("Klingon"));
        let errors = validate_step(&STEPS[PERSONAL_STEP], &v);
        assert_eq!(errors.get("preferred_language"), Some(SELECT_OPTION_MESSAGE));
    }

    #[test]
    fn impossible_calendar_date_is_rejected() {
        let date = find_field("incident_date").unwrap();
        assert!(validate_field(date, Some(&FieldValue::text("2024-02-30"))).is_some());
        assert!(validate_field(date, Some(&FieldValue::text("30/01/2024"))).is_some());
        assert!(validate_field(date, Some(&FieldValue::text("2024-02-29"))).is_none());
    }

    #[test]
    fn attachment_satisfies_presence() {
        let doc = find_field("supporting_document").unwrap();
        let handle = FieldValue::from(AttachmentHandle::new("fir.pdf", 2048));
        assert!(validate_field(doc, Some(&handle)).is_none());
    }

    #[test]
    fn case_step_ignores_personal_fields() {
        let v = values(&[
            ("case_type", "Property"),
            ("incident_date", "2024-05-01"),
            ("description", "Boundary wall built on my land"),
        ]);
        assert!(validate_step(&STEPS[CASE_STEP], &v).is_empty());
    }

    #[test]
    fn review_step_always_passes() {
        assert!(validate_step(&STEPS[REVIEW_STEP], &FormValues::default()).is_empty());
    }
}
