//! Wizard controller: the only writer of [`WizardState`].
//!
//! Navigation is synchronous. Enrichment work (guidance, transcript translation) is handed
//! out as tickets/jobs that the caller executes and reports back; results from external
//! collaborators can never block navigation or submission.

use log::{debug, info};
use std::time::Instant;

use super::analyzer::{AnalysisTicket, Completion, DebouncedAnalyzer};
use super::extraction::extract_fields;
use super::speech::{CaptureError, RecognitionEvent, SpeechCapability, SpeechCapture, TranslationJob};
use super::validation::validate_step;
use crate::api::translation::TranslationError;
use crate::models::fields::{
    find_field, step_count, StepSpec, DESCRIPTION_FIELD, FIELD_KEYWORDS, STATUS_STEP, STEPS,
};
use crate::models::responses::{GuidanceResult, TranslationResult};
use crate::models::state::{FieldValue, StatusKind, WizardState};

pub const SUBMITTED_COMMENT: &str = "Your application has been submitted and is under review.";

#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum FormError {
    #[error("unknown field '{0}'")]
    UnknownField(String),
    #[error("field '{0}' does not accept text")]
    TextNotAccepted(String),
}

pub struct WizardController {
    state: WizardState,
    analyzer: DebouncedAnalyzer,
    speech: SpeechCapture,
}

impl WizardController {
    pub fn new(analyzer: DebouncedAnalyzer, speech: SpeechCapability) -> Self {
        let state = WizardState::default();
        info!(
            "[PHASE: wizard] [STEP: init] New application {}",
            state.status.id
        );
        let mut controller = Self {
            state,
            analyzer,
            speech: SpeechCapture::new(speech),
        };
        controller.sync_flags();
        controller
    }

    pub fn state(&self) -> &WizardState {
        &self.state
    }

    pub fn active_step(&self) -> &'static StepSpec {
        &STEPS[self.state.step]
    }

    pub fn value(&self, id: &str) -> Option<&FieldValue> {
        self.state.values.get(id)
    }

    pub fn speech(&self) -> &SpeechCapture {
        &self.speech
    }

    pub fn analyzer(&self) -> &DebouncedAnalyzer {
        &self.analyzer
    }

    pub fn set_field(&mut self, id: &str, value: FieldValue) -> Result<(), FormError> {
        self.set_field_at(id, value, Instant::now())
    }

    /// Upsert a value and clear that field's error only. Description edits re-arm the
    /// analyzer's quiet-period timer.
    pub fn set_field_at(
        &mut self,
        id: &str,
        value: FieldValue,
        now: Instant,
    ) -> Result<(), FormError> {
        let field = find_field(id).ok_or_else(|| FormError::UnknownField(id.to_string()))?;
        if matches!(value, FieldValue::Text(_)) && !field.kind.accepts_text() {
            return Err(FormError::TextNotAccepted(id.to_string()));
        }

        if field.id == DESCRIPTION_FIELD {
            self.analyzer.on_edit(value.as_text().unwrap_or_default(), now);
        }
        self.state.values.upsert(field.id, value);
        self.state.errors.remove(field.id);
        Ok(())
    }

    /// Replace the error set with the active step's failures. Returns true on pass.
    pub fn validate_active_step(&mut self) -> bool {
        self.state.errors = validate_step(self.active_step(), &self.state.values);
        let passed = self.state.errors.is_empty();
        if !passed {
            debug!(
                "[PHASE: wizard] [STEP: validate] Step {} failed on {:?}",
                self.state.step,
                self.state.errors.field_ids().collect::<Vec<_>>()
            );
        }
        passed
    }

    pub fn advance(&mut self) -> bool {
        if !self.validate_active_step() {
            return false;
        }
        let from = self.state.step;
        self.state.step = (from + 1).min(step_count() - 1);
        self.state.errors.clear();
        info!(
            "[PHASE: wizard] [STEP: advance] {} -> {}",
            STEPS[from].title, STEPS[self.state.step].title
        );
        true
    }

    /// Going back never validates and always clears errors.
    pub fn retreat(&mut self) {
        let from = self.state.step;
        self.state.step = from.saturating_sub(1);
        self.state.errors.clear();
        debug!(
            "[PHASE: wizard] [STEP: retreat] {} -> {}",
            STEPS[from].title, STEPS[self.state.step].title
        );
    }

    /// Validate the active step and then every data-entry step, then move status
    /// pending -> reviewing and jump to the status step. A data-entry step that fails
    /// becomes the active step with its errors. A repeated submit keeps the status as it is.
    pub fn submit(&mut self) -> bool {
        if !self.validate_active_step() {
            return false;
        }

        let failing = STEPS
            .iter()
            .enumerate()
            .filter(|(_, s)| s.is_data_entry())
            .map(|(i, s)| (i, validate_step(s, &self.state.values)))
            .find(|(_, errors)| !errors.is_empty());
        if let Some((index, errors)) = failing {
            debug!(
                "[PHASE: wizard] [STEP: submit] Refused; {} has {} invalid field(s)",
                STEPS[index].title,
                errors.len()
            );
            self.state.step = index;
            self.state.errors = errors;
            return false;
        }

        if self.state.status.advance(StatusKind::Reviewing, SUBMITTED_COMMENT) {
            info!(
                "[PHASE: wizard] [STEP: submit] Application {} submitted ({} fields)",
                self.state.status.id,
                self.state.values.len()
            );
        } else {
            debug!(
                "[PHASE: wizard] [STEP: submit] Application {} already {}",
                self.state.status.id,
                self.state.status.status.as_str()
            );
        }
        self.state.step = STATUS_STEP;
        true
    }

    // -------------------------------------------------------------------------
    // Guidance
    // -------------------------------------------------------------------------

    /// Drive the debounce timer. Returns a ticket when a guidance request should start.
    pub fn tick(&mut self, now: Instant) -> Option<AnalysisTicket> {
        let current = self.description().to_string();
        let ticket = self.analyzer.poll(&current, now);
        self.sync_flags();
        ticket
    }

    /// Report a settled guidance request. Returns whether the result was applied.
    pub fn complete_analysis(&mut self, ticket: &AnalysisTicket, result: GuidanceResult) -> bool {
        let current = self.description().to_string();
        let outcome = self.analyzer.complete(ticket, &current);
        self.sync_flags();
        match outcome {
            Completion::Apply => {
                self.state.guidance = Some(result);
                true
            }
            Completion::Stale => false,
        }
    }

    /// Drop any pending debounce timer (e.g. when the front-end shuts down).
    pub fn cancel_pending_analysis(&mut self) {
        self.analyzer.cancel();
    }

    fn description(&self) -> &str {
        self.state
            .values
            .text(DESCRIPTION_FIELD)
            .unwrap_or_default()
    }

    // -------------------------------------------------------------------------
    // Speech and transcripts
    // -------------------------------------------------------------------------

    /// Map a transcript onto fields through `set_field`. Returns the ids that were updated.
    pub fn apply_transcript(&mut self, transcript: &str) -> Vec<&'static str> {
        let now = Instant::now();
        let mut updated = Vec::new();
        for found in extract_fields(transcript, FIELD_KEYWORDS) {
            if self
                .set_field_at(found.field_id, FieldValue::Text(found.value), now)
                .is_ok()
            {
                updated.push(found.field_id);
            }
        }
        if !updated.is_empty() {
            info!(
                "[PHASE: wizard] [STEP: transcript] Filled {:?} from speech",
                updated
            );
        }
        updated
    }

    pub fn toggle_listening(&mut self) -> bool {
        let listening = self.speech.toggle();
        self.sync_flags();
        listening
    }

    pub fn select_language(&mut self, code: &str) -> Result<(), CaptureError> {
        let result = self.speech.set_language(code);
        self.sync_flags();
        result
    }

    pub fn begin_transcript(&mut self, event: &RecognitionEvent) -> Option<TranslationJob> {
        let job = self.speech.begin_translation(event);
        self.sync_flags();
        job
    }

    /// Settle a transcript translation and apply the forwarded text.
    pub fn finish_transcript(
        &mut self,
        job: &TranslationJob,
        result: Result<TranslationResult, TranslationError>,
    ) -> Vec<&'static str> {
        let text = self.speech.finish_translation(job, result);
        self.sync_flags();
        match text {
            Some(text) => self.apply_transcript(&text),
            None => Vec::new(),
        }
    }

    fn sync_flags(&mut self) {
        self.state.is_analyzing = self.analyzer.is_analyzing();
        self.state.is_listening = self.speech.is_listening();
        self.state.is_translating = self.speech.is_translating();
    }
}

impl Default for WizardController {
    fn default() -> Self {
        Self::new(
            DebouncedAnalyzer::default(),
            SpeechCapability::unavailable("no speech backend configured"),
        )
    }
}
