//! Speech capture state machine.
//!
//! Recognition itself is behind the [`Recognizer`] trait; environments without a microphone
//! backend construct [`SpeechCapability::Unavailable`] and every listen request becomes a
//! no-op. Each recognition event is translated into the processing language before it is
//! forwarded; when translation fails the untranslated transcript is forwarded instead.
//! Jobs carry a sequence number and only the newest job's result is forwarded.

use log::{debug, info, warn};

use crate::api::translation::{TranslationError, Translator};
use crate::models::fields::{default_language, find_language, SpokenLanguage, PROCESSING_LANGUAGE};
use crate::models::responses::TranslationResult;
use crate::utils::logging::preview;

#[derive(Debug, thiserror::Error)]
pub enum CaptureError {
    #[error("microphone access was denied")]
    PermissionDenied,
    #[error("speech recognition failed to start: {0}")]
    Backend(String),
    #[error("unsupported spoken language: {0}")]
    UnknownLanguage(String),
}

/// A continuous recognition backend.
pub trait Recognizer: Send {
    fn start(&mut self, language: &SpokenLanguage) -> Result<(), CaptureError>;
    fn stop(&mut self);
}

/// Recognizer for transcripts that arrive as text (command line, scripted sessions).
/// Starting and stopping have no side effects.
#[derive(Debug, Default)]
pub struct TextRecognizer;

impl Recognizer for TextRecognizer {
    fn start(&mut self, _language: &SpokenLanguage) -> Result<(), CaptureError> {
        Ok(())
    }

    fn stop(&mut self) {}
}

pub enum SpeechCapability {
    Available(Box<dyn Recognizer>),
    Unavailable { reason: String },
}

impl SpeechCapability {
    pub fn unavailable(reason: impl Into<String>) -> Self {
        SpeechCapability::Unavailable {
            reason: reason.into(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum CaptureState {
    #[default]
    Idle,
    Listening,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RecognitionSegment {
    pub text: String,
    pub is_final: bool,
}

/// One recognizer callback: every segment (interim and final) observed so far this session.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct RecognitionEvent {
    pub results: Vec<RecognitionSegment>,
}

impl RecognitionEvent {
    pub fn transcript(&self) -> String {
        self.results
            .iter()
            .map(|s| s.text.trim())
            .filter(|s| !s.is_empty())
            .collect::<Vec<_>>()
            .join(" ")
    }
}

/// Translation work handed out for one recognition event.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TranslationJob {
    pub sequence: u64,
    pub transcript: String,
    pub source: &'static str,
    pub target: &'static str,
}

pub struct SpeechCapture {
    capability: SpeechCapability,
    state: CaptureState,
    language: &'static SpokenLanguage,
    sequence: u64,
    outstanding: Option<u64>,
}

impl SpeechCapture {
    pub fn new(capability: SpeechCapability) -> Self {
        Self {
            capability,
            state: CaptureState::Idle,
            language: default_language(),
            sequence: 0,
            outstanding: None,
        }
    }

    pub fn is_available(&self) -> bool {
        matches!(self.capability, SpeechCapability::Available(_))
    }

    pub fn unavailable_reason(&self) -> Option<&str> {
        match &self.capability {
            SpeechCapability::Unavailable { reason } => Some(reason.as_str()),
            SpeechCapability::Available(_) => None,
        }
    }

    pub fn state(&self) -> CaptureState {
        self.state
    }

    pub fn is_listening(&self) -> bool {
        self.state == CaptureState::Listening
    }

    pub fn is_translating(&self) -> bool {
        self.outstanding.is_some()
    }

    pub fn language(&self) -> &'static SpokenLanguage {
        self.language
    }

    /// idle -> listening. Returns whether capture is now listening.
    pub fn start(&mut self) -> bool {
        if self.state == CaptureState::Listening {
            return true;
        }
        if self.is_translating() {
            debug!("[PHASE: speech] [STEP: start] Ignored while a translation is pending");
            return false;
        }

        let language = self.language;
        match &mut self.capability {
            SpeechCapability::Unavailable { reason } => {
                debug!(
                    "[PHASE: speech] [STEP: start] Speech capture unavailable: {}",
                    reason
                );
                false
            }
            SpeechCapability::Available(recognizer) => match recognizer.start(language) {
                Ok(()) => {
                    self.state = CaptureState::Listening;
                    info!(
                        "[PHASE: speech] [STEP: start] Listening in {}",
                        language.recognition_code
                    );
                    true
                }
                Err(e) => {
                    warn!("[PHASE: speech] [STEP: start] {}", e);
                    false
                }
            },
        }
    }

    /// listening -> idle.
    pub fn stop(&mut self) {
        if self.state != CaptureState::Listening {
            return;
        }
        if let SpeechCapability::Available(recognizer) = &mut self.capability {
            recognizer.stop();
        }
        self.state = CaptureState::Idle;
        info!("[PHASE: speech] [STEP: stop] Stopped listening");
    }

    pub fn toggle(&mut self) -> bool {
        if self.is_listening() {
            self.stop();
            false
        } else {
            self.start()
        }
    }

    /// Changing language while listening stops capture; the new language applies on the
    /// next start.
    pub fn set_language(&mut self, code: &str) -> Result<(), CaptureError> {
        let language =
            find_language(code).ok_or_else(|| CaptureError::UnknownLanguage(code.to_string()))?;
        if language == self.language {
            return Ok(());
        }
        self.stop();
        self.language = language;
        Ok(())
    }

    /// Accept a recognition event. Returns the translation to run, or `None` when the event
    /// arrives outside a session or carries no text.
    pub fn begin_translation(&mut self, event: &RecognitionEvent) -> Option<TranslationJob> {
        if !self.is_listening() {
            return None;
        }
        let transcript = event.transcript();
        if transcript.is_empty() {
            return None;
        }
        self.sequence += 1;
        self.outstanding = Some(self.sequence);
        Some(TranslationJob {
            sequence: self.sequence,
            transcript,
            source: self.language.translation_code,
            target: PROCESSING_LANGUAGE,
        })
    }

    /// Settle a translation and return the text to forward to the transcript consumer.
    /// Returns `None` for a job superseded by a newer event; its result is dropped and the
    /// newer job stays outstanding.
    pub fn finish_translation(
        &mut self,
        job: &TranslationJob,
        result: Result<TranslationResult, TranslationError>,
    ) -> Option<String> {
        if job.sequence != self.sequence {
            debug!(
                "[PHASE: speech] [STEP: translate] Dropping stale translation #{} (latest #{})",
                job.sequence, self.sequence
            );
            return None;
        }
        self.outstanding = None;
        let text = match result {
            Ok(r) if !r.translated_text.trim().is_empty() => r.translated_text,
            Ok(_) => job.transcript.clone(),
            Err(e) => {
                warn!(
                    "[PHASE: speech] [STEP: translate] Forwarding untranslated transcript ({}): {}",
                    e,
                    preview(&job.transcript, 40)
                );
                job.transcript.clone()
            }
        };
        Some(text)
    }

    /// Convenience wrapper running one event end to end.
    pub async fn process_event(
        &mut self,
        event: &RecognitionEvent,
        translator: &dyn Translator,
    ) -> Option<String> {
        let job = self.begin_translation(event)?;
        let result = translator
            .translate(&job.transcript, job.source, job.target)
            .await;
        self.finish_translation(&job, result)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use std::sync::{Arc, Mutex};

    #[derive(Clone, Default)]
    struct FakeRecognizer {
        calls: Arc<Mutex<Vec<String>>>,
        deny: bool,
    }

    impl Recognizer for FakeRecognizer {
        fn start(&mut self, language: &SpokenLanguage) -> Result<(), CaptureError> {
            if self.deny {
                return Err(CaptureError::PermissionDenied);
            }
            self.calls
                .lock()
                .unwrap()
                .push(format!("start:{}", language.recognition_code));
            Ok(())
        }

        fn stop(&mut self) {
            self.calls.lock().unwrap().push("stop".to_string());
        }
    }

    struct UpperTranslator;

    #[async_trait]
    impl Translator for UpperTranslator {
        async fn translate(
            &self,
            text: &str,
            source: &str,
            target: &str,
        ) -> Result<TranslationResult, TranslationError> {
            Ok(TranslationResult {
                translated_text: text.to_uppercase(),
                source_language: source.to_string(),
                target_language: target.to_string(),
            })
        }
    }

    struct DownTranslator;

    #[async_trait]
    impl Translator for DownTranslator {
        async fn translate(
            &self,
            _text: &str,
            _source: &str,
            _target: &str,
        ) -> Result<TranslationResult, TranslationError> {
            Err(TranslationError::NotConfigured)
        }
    }

    fn event(parts: &[(&str, bool)]) -> RecognitionEvent {
        RecognitionEvent {
            results: parts
                .iter()
                .map(|(t, f)| RecognitionSegment {
                    text: t.to_string(),
                    is_final: *f,
                })
                .collect(),
        }
    }

    #[test]
    fn unavailable_capability_makes_start_a_no_op() {
        let mut s = SpeechCapture::new(SpeechCapability::unavailable("no microphone"));
        assert!(!s.start());
        assert!(!s.toggle());
        assert_eq!(s.state(), CaptureState::Idle);
        assert_eq!(s.unavailable_reason(), Some("no microphone"));
    }

    #[test]
    fn denied_microphone_stays_idle() {
        let rec = FakeRecognizer {
            deny: true,
            ..Default::default()
        };
        let mut s = SpeechCapture::new(SpeechCapability::Available(Box::new(rec)));
        assert!(!s.start());
        assert!(!s.is_listening());
    }

    #[test]
    fn language_change_while_listening_forces_stop() {
        let rec = FakeRecognizer::default();
        let calls = Arc::clone(&rec.calls);
        let mut s = SpeechCapture::new(SpeechCapability::Available(Box::new(rec)));

        assert!(s.start());
        s.set_language("hi-IN").unwrap();
        assert!(!s.is_listening());
        assert!(s.start());

        let calls = calls.lock().unwrap().clone();
        assert_eq!(calls, vec!["start:en-IN", "stop", "start:hi-IN"]);
    }

    #[test]
    fn unknown_language_is_rejected_without_stopping() {
        let mut s = SpeechCapture::new(SpeechCapability::Available(Box::new(
            FakeRecognizer::default(),
        )));
        s.start();
        assert!(matches!(
            s.set_language("fr-FR"),
            Err(CaptureError::UnknownLanguage(_))
        ));
        assert!(s.is_listening());
    }

    #[test]
    fn transcript_accumulates_interim_and_final_segments() {
        let e = event(&[("mera naam", true), (" sunita ", false)]);
        assert_eq!(e.transcript(), "mera naam sunita");
    }

    #[test]
    fn translating_flag_blocks_restart() {
        let mut s = SpeechCapture::new(SpeechCapability::Available(Box::new(
            FakeRecognizer::default(),
        )));
        s.start();
        s.set_language("hi").unwrap();
        assert!(s.start());
        let job = s.begin_translation(&event(&[("नमस्ते", true)])).unwrap();
        s.stop();
        assert!(s.is_translating());
        assert!(!s.start(), "must not re-engage mid-translation");

        s.finish_translation(&job, Err(TranslationError::NotConfigured));
        assert!(s.start());
    }

    #[test]
    fn older_translation_settling_first_is_dropped() {
        let mut s = SpeechCapture::new(SpeechCapability::Available(Box::new(
            FakeRecognizer::default(),
        )));
        s.set_language("hi-IN").unwrap();
        assert!(s.start());
        let first = s.begin_translation(&event(&[("mera", false)])).unwrap();
        let second = s
            .begin_translation(&event(&[("mera naam sunita", true)]))
            .unwrap();
        assert!(second.sequence > first.sequence);
        s.stop();

        let stale = s.finish_translation(&first, Err(TranslationError::NotConfigured));
        assert_eq!(stale, None);
        assert!(s.is_translating(), "newer job is still outstanding");
        assert!(!s.start(), "must not re-engage mid-translation");

        let ok = TranslationResult {
            translated_text: "my name is sunita".to_string(),
            source_language: "hi".to_string(),
            target_language: "en".to_string(),
        };
        let out = s.finish_translation(&second, Ok(ok));
        assert_eq!(out.as_deref(), Some("my name is sunita"));
        assert!(!s.is_translating());
        assert!(s.start());
    }

    #[test]
    fn newer_translation_settling_first_wins() {
        let mut s = SpeechCapture::new(SpeechCapability::Available(Box::new(
            FakeRecognizer::default(),
        )));
        s.start();
        let first = s.begin_translation(&event(&[("name ravi", true)])).unwrap();
        let second = s
            .begin_translation(&event(&[("name ravi kumar", true)]))
            .unwrap();

        let out = s.finish_translation(&second, Err(TranslationError::NotConfigured));
        assert_eq!(out.as_deref(), Some("name ravi kumar"));
        assert!(!s.is_translating());
        assert_eq!(
            s.finish_translation(&first, Err(TranslationError::NotConfigured)),
            None
        );
        assert!(!s.is_translating());
    }

    #[test]
    fn events_outside_a_session_are_ignored() {
        let mut s = SpeechCapture::new(SpeechCapability::Available(Box::new(
            FakeRecognizer::default(),
        )));
        assert!(s.begin_translation(&event(&[("hello", true)])).is_none());
    }

    #[tokio::test]
    async fn successful_translation_is_forwarded() {
        let mut s = SpeechCapture::new(SpeechCapability::Available(Box::new(
            FakeRecognizer::default(),
        )));
        s.set_language("hi-IN").unwrap();
        s.start();
        let out = s
            .process_event(&event(&[("my name is ravi", true)]), &UpperTranslator)
            .await;
        assert_eq!(out.as_deref(), Some("MY NAME IS RAVI"));
        assert!(!s.is_translating());
    }

    #[tokio::test]
    async fn failed_translation_forwards_original_transcript() {
        let mut s = SpeechCapture::new(SpeechCapability::Available(Box::new(
            FakeRecognizer::default(),
        )));
        s.set_language("hi-IN").unwrap();
        s.start();
        let out = s
            .process_event(&event(&[("mera naam ravi", true)]), &DownTranslator)
            .await;
        assert_eq!(out.as_deref(), Some("mera naam ravi"));
        assert!(!s.is_translating());
    }
}
