// Wizard state (in-memory)
//
// NOTE: This is NOT persisted; a session's values live only as long as the controller that
// owns them. Views receive `&WizardState` and never mutate it.

use chrono::{DateTime, Utc};
use serde::Serialize;
use std::collections::{BTreeMap, HashMap};
use uuid::Uuid;

use super::responses::GuidanceResult;

/// Opaque handle to an uploaded file. The bytes themselves are never held by the form.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AttachmentHandle {
    pub id: Uuid,
    pub file_name: String,
    pub size_bytes: u64,
}

impl AttachmentHandle {
    pub fn new(file_name: impl Into<String>, size_bytes: u64) -> Self {
        Self {
            id: Uuid::new_v4(),
            file_name: file_name.into(),
            size_bytes,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "type", content = "value", rename_all = "snake_case")]
pub enum FieldValue {
    Text(String),
    Attachment(AttachmentHandle),
}

impl FieldValue {
    pub fn text(value: impl Into<String>) -> Self {
        FieldValue::Text(value.into())
    }

    pub fn as_text(&self) -> Option<&str> {
        match self {
            FieldValue::Text(s) => Some(s.as_str()),
            FieldValue::Attachment(_) => None,
        }
    }

    /// Whitespace-only text counts as missing.
    pub fn is_blank(&self) -> bool {
        match self {
            FieldValue::Text(s) => s.trim().is_empty(),
            FieldValue::Attachment(a) => a.file_name.trim().is_empty(),
        }
    }

    pub fn display(&self) -> String {
        match self {
            FieldValue::Text(s) => s.clone(),
            FieldValue::Attachment(a) => format!("{} ({} bytes)", a.file_name, a.size_bytes),
        }
    }
}

impl From<&str> for FieldValue {
    fn from(value: &str) -> Self {
        FieldValue::Text(value.to_string())
    }
}

impl From<String> for FieldValue {
    fn from(value: String) -> Self {
        FieldValue::Text(value)
    }
}

impl From<AttachmentHandle> for FieldValue {
    fn from(value: AttachmentHandle) -> Self {
        FieldValue::Attachment(value)
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct FormValues {
    inner: HashMap<String, FieldValue>,
}

impl FormValues {
    pub fn get(&self, id: &str) -> Option<&FieldValue> {
        self.inner.get(id)
    }

    pub fn text(&self, id: &str) -> Option<&str> {
        self.get(id).and_then(FieldValue::as_text)
    }

    pub(crate) fn upsert(&mut self, id: &str, value: FieldValue) {
        self.inner.insert(id.to_string(), value);
    }

    pub fn len(&self) -> usize {
        self.inner.len()
    }

    pub fn is_empty(&self) -> bool {
        self.inner.is_empty()
    }
}

/// Field id -> message. Ordered so rendering and assertions are stable.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ValidationErrors {
    inner: BTreeMap<String, String>,
}

impl ValidationErrors {
    pub fn get(&self, id: &str) -> Option<&str> {
        self.inner.get(id).map(String::as_str)
    }

    pub fn contains(&self, id: &str) -> bool {
        self.inner.contains_key(id)
    }

    pub fn insert(&mut self, id: &str, message: impl Into<String>) {
        self.inner.insert(id.to_string(), message.into());
    }

    pub fn remove(&mut self, id: &str) -> Option<String> {
        self.inner.remove(id)
    }

    pub fn clear(&mut self) {
        self.inner.clear();
    }

    pub fn len(&self) -> usize {
        self.inner.len()
    }

    pub fn is_empty(&self) -> bool {
        self.inner.is_empty()
    }

    pub fn field_ids(&self) -> impl Iterator<Item = &str> {
        self.inner.keys().map(String::as_str)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.inner.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum StatusKind {
    Pending,
    Reviewing,
    Approved,
    Rejected,
}

impl StatusKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            StatusKind::Pending => "Pending",
            StatusKind::Reviewing => "Under Review",
            StatusKind::Approved => "Approved",
            StatusKind::Rejected => "Rejected",
        }
    }

    fn rank(&self) -> u8 {
        match self {
            StatusKind::Pending => 0,
            StatusKind::Reviewing => 1,
            StatusKind::Approved | StatusKind::Rejected => 2,
        }
    }

    /// Status never regresses; approved and rejected are both terminal.
    pub fn can_advance_to(&self, next: StatusKind) -> bool {
        next.rank() == self.rank() + 1
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ApplicationStatus {
    pub id: String,
    pub status: StatusKind,
    pub last_updated: DateTime<Utc>,
    pub comment: Option<String>,
}

impl ApplicationStatus {
    pub fn new_pending() -> Self {
        let raw = Uuid::new_v4().simple().to_string();
        Self {
            id: format!("CASE-{}", raw[..8].to_ascii_uppercase()),
            status: StatusKind::Pending,
            last_updated: Utc::now(),
            comment: None,
        }
    }

    /// Returns false (and changes nothing) for any backwards or skipping transition.
    pub fn advance(&mut self, next: StatusKind, comment: impl Into<String>) -> bool {
        if !self.status.can_advance_to(next) {
            return false;
        }
        self.status = next;
        self.last_updated = Utc::now();
        self.comment = Some(comment.into());
        true
    }
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct WizardState {
    pub step: usize,
    pub values: FormValues,
    pub errors: ValidationErrors,
    pub status: ApplicationStatus,
    pub guidance: Option<GuidanceResult>,
    pub is_analyzing: bool,
    pub is_translating: bool,
    pub is_listening: bool,
}

impl Default for WizardState {
    fn default() -> Self {
        Self {
            step: 0,
            values: FormValues::default(),
            errors: ValidationErrors::default(),
            status: ApplicationStatus::new_pending(),
            guidance: None,
            is_analyzing: false,
            is_translating: false,
            is_listening: false,
        }
    }
}
