//! Debounced guidance analysis for the case description.
//!
//! The analyzer is a plain state machine driven by two kinds of events: edits to the
//! description and clock ticks. It never performs I/O itself; when a quiet period elapses
//! on an eligible description it hands out an [`AnalysisTicket`], the caller runs the
//! request (see [`run_analysis`]) and reports back through [`DebouncedAnalyzer::complete`].
//!
//! Every fired ticket carries a generation number. Only the newest generation may clear
//! the busy flag, and only a result whose generation and text both still match may be
//! applied to the form.

use log::{debug, info, warn};
use std::time::{Duration, Instant};

use crate::api::guidance::GuidanceClient;
use crate::config::EnrichmentConfig;
use crate::models::responses::GuidanceResult;
use crate::utils::logging::preview;

/// Upper bound on a single guidance round trip before the fallback is shown.
pub const ANALYSIS_TIMEOUT: Duration = Duration::from_secs(45);

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AnalysisTicket {
    pub generation: u64,
    pub text: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
enum Phase {
    Idle,
    Armed { deadline: Instant, text: String },
    InFlight { generation: u64, text: String },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Completion {
    /// Result belongs to the newest request and the description is unchanged.
    Apply,
    /// Result is outdated; discard it.
    Stale,
}

#[derive(Debug, Clone)]
pub struct DebouncedAnalyzer {
    quiet_period: Duration,
    min_chars: usize,
    phase: Phase,
    generation: u64,
    outstanding: Option<u64>,
}

impl DebouncedAnalyzer {
    pub fn new(quiet_period: Duration, min_chars: usize) -> Self {
        Self {
            quiet_period,
            min_chars,
            phase: Phase::Idle,
            generation: 0,
            outstanding: None,
        }
    }

    pub fn from_config(cfg: &EnrichmentConfig) -> Self {
        Self::new(cfg.quiet_period, cfg.min_description_chars)
    }

    pub fn quiet_period(&self) -> Duration {
        self.quiet_period
    }

    pub fn is_eligible(&self, text: &str) -> bool {
        text.trim().chars().count() >= self.min_chars
    }

    /// (Re)arm the quiet-period timer. Any pending timer is superseded.
    pub fn on_edit(&mut self, text: &str, now: Instant) {
        self.phase = Phase::Armed {
            deadline: now + self.quiet_period,
            text: text.to_string(),
        };
    }

    /// Fire the pending timer if its deadline has passed. `current_text` is the description
    /// as it is in the form right now.
    pub fn poll(&mut self, current_text: &str, now: Instant) -> Option<AnalysisTicket> {
        let Phase::Armed { deadline, text } = &self.phase else {
            return None;
        };
        if now < *deadline {
            return None;
        }

        if text != current_text || !self.is_eligible(text) {
            debug!(
                "[PHASE: analyzer] [STEP: poll] Quiet period elapsed on ineligible text ({} chars); not requesting",
                text.trim().chars().count()
            );
            self.phase = Phase::Idle;
            return None;
        }

        self.generation += 1;
        let ticket = AnalysisTicket {
            generation: self.generation,
            text: text.clone(),
        };
        self.outstanding = Some(ticket.generation);
        self.phase = Phase::InFlight {
            generation: ticket.generation,
            text: ticket.text.clone(),
        };
        info!(
            "[PHASE: analyzer] [STEP: fire] Requesting guidance generation={} ({})",
            ticket.generation,
            preview(&ticket.text, 40)
        );
        Some(ticket)
    }

    /// Record that a ticket's request settled. Clears the busy flag when the ticket is the
    /// newest one issued, whatever the outcome.
    pub fn complete(&mut self, ticket: &AnalysisTicket, current_text: &str) -> Completion {
        if self.outstanding == Some(ticket.generation) {
            self.outstanding = None;
        }
        if matches!(&self.phase, Phase::InFlight { generation, .. } if *generation == ticket.generation)
        {
            self.phase = Phase::Idle;
        }

        if ticket.generation == self.generation && ticket.text == current_text {
            Completion::Apply
        } else {
            debug!(
                "[PHASE: analyzer] [STEP: complete] Discarding stale guidance generation={} (latest={})",
                ticket.generation, self.generation
            );
            Completion::Stale
        }
    }

    /// Drop a pending timer (form torn down). In-flight requests are left to settle.
    pub fn cancel(&mut self) {
        if matches!(self.phase, Phase::Armed { .. }) {
            self.phase = Phase::Idle;
        }
    }

    pub fn is_analyzing(&self) -> bool {
        self.outstanding.is_some()
    }

    pub fn is_armed(&self) -> bool {
        matches!(self.phase, Phase::Armed { .. })
    }

    pub fn deadline(&self) -> Option<Instant> {
        match &self.phase {
            Phase::Armed { deadline, .. } => Some(*deadline),
            _ => None,
        }
    }

    pub fn in_flight_text(&self) -> Option<&str> {
        match &self.phase {
            Phase::InFlight { text, .. } => Some(text.as_str()),
            _ => None,
        }
    }
}

impl Default for DebouncedAnalyzer {
    fn default() -> Self {
        Self::from_config(&EnrichmentConfig::default())
    }
}

/// Perform the guidance request for a ticket. Never fails: errors and timeouts become the
/// fallback guidance.
pub async fn run_analysis(client: &dyn GuidanceClient, ticket: &AnalysisTicket) -> GuidanceResult {
    match tokio::time::timeout(
        ANALYSIS_TIMEOUT,
        client.analyze_case_description(&ticket.text),
    )
    .await
    {
        Ok(Ok(result)) => result,
        Ok(Err(e)) => {
            warn!(
                "[PHASE: analyzer] [STEP: request] Guidance client error for generation={}: {:#}",
                ticket.generation, e
            );
            GuidanceResult::fallback()
        }
        Err(_) => {
            warn!(
                "[PHASE: analyzer] [STEP: request] Guidance request timed out for generation={}",
                ticket.generation
            );
            GuidanceResult::fallback()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::responses::DocumentValidation;
    use async_trait::async_trait;

    const LONG: &str = "My landlord has refused to return my security deposit of forty thousand rupees.";
    const LONGER: &str = "My landlord has refused to return my security deposit of forty thousand rupees after I vacated.";

    fn analyzer() -> DebouncedAnalyzer {
        DebouncedAnalyzer::new(Duration::from_millis(1000), 50)
    }

    #[test]
    fn short_description_never_fires() {
        let mut a = analyzer();
        let t0 = Instant::now();
        a.on_edit("Too short", t0);
        assert!(a.poll("Too short", t0 + Duration::from_secs(5)).is_none());
        assert!(!a.is_analyzing());
        assert!(!a.is_armed());
    }

    #[test]
    fn does_not_fire_before_quiet_period() {
        let mut a = analyzer();
        let t0 = Instant::now();
        a.on_edit(LONG, t0);
        assert!(a.poll(LONG, t0 + Duration::from_millis(999)).is_none());
        assert!(a.is_armed());
        assert!(a.poll(LONG, t0 + Duration::from_millis(1000)).is_some());
    }

    #[test]
    fn rapid_edits_fire_exactly_once_with_final_text() {
        let mut a = analyzer();
        let t0 = Instant::now();
        let mut fired = Vec::new();

        let edits = [
            (0, "My landlord"),
            (200, LONG),
            (400, LONGER),
        ];
        for (ms, text) in edits {
            let now = t0 + Duration::from_millis(ms);
            if let Some(t) = a.poll(text, now) {
                fired.push(t);
            }
            a.on_edit(text, now);
        }
        for ms in (500..3000).step_by(100) {
            if let Some(t) = a.poll(LONGER, t0 + Duration::from_millis(ms)) {
                fired.push(t);
            }
        }

        assert_eq!(fired.len(), 1, "expected one request, got {:?}", fired);
        assert_eq!(fired[0].text, LONGER);
        assert!(a.is_analyzing());
    }

    #[test]
    fn changed_text_at_deadline_does_not_fire() {
        let mut a = analyzer();
        let t0 = Instant::now();
        a.on_edit(LONG, t0);
        assert!(a.poll(LONGER, t0 + Duration::from_secs(2)).is_none());
    }

    #[test]
    fn completion_clears_busy_and_applies_when_current() {
        let mut a = analyzer();
        let t0 = Instant::now();
        a.on_edit(LONG, t0);
        let ticket = a.poll(LONG, t0 + Duration::from_secs(1)).unwrap();
        assert!(a.is_analyzing());
        assert_eq!(a.complete(&ticket, LONG), Completion::Apply);
        assert!(!a.is_analyzing());
    }

    #[test]
    fn result_for_edited_text_is_stale_but_clears_busy() {
        let mut a = analyzer();
        let t0 = Instant::now();
        a.on_edit(LONG, t0);
        let ticket = a.poll(LONG, t0 + Duration::from_secs(1)).unwrap();
        a.on_edit(LONGER, t0 + Duration::from_millis(1200));
        assert_eq!(a.complete(&ticket, LONGER), Completion::Stale);
        assert!(!a.is_analyzing());
        assert!(a.is_armed(), "the newer edit's timer must survive");
    }

    #[test]
    fn older_generation_cannot_clear_newer_busy_flag() {
        let mut a = analyzer();
        let t0 = Instant::now();
        a.on_edit(LONG, t0);
        let first = a.poll(LONG, t0 + Duration::from_secs(1)).unwrap();
        a.on_edit(LONGER, t0 + Duration::from_secs(2));
        let second = a.poll(LONGER, t0 + Duration::from_secs(3)).unwrap();
        assert!(second.generation > first.generation);

        // Responses arrive out of order.
        assert_eq!(a.complete(&first, LONGER), Completion::Stale);
        assert!(a.is_analyzing(), "newer request still outstanding");
        assert_eq!(a.complete(&second, LONGER), Completion::Apply);
        assert!(!a.is_analyzing());
    }

    #[test]
    fn cancel_drops_pending_timer() {
        let mut a = analyzer();
        let t0 = Instant::now();
        a.on_edit(LONG, t0);
        a.cancel();
        assert!(a.poll(LONG, t0 + Duration::from_secs(5)).is_none());
        assert!(a.deadline().is_none());
    }

    struct FailingClient;

    #[async_trait]
    impl GuidanceClient for FailingClient {
        async fn analyze_case_description(&self, _text: &str) -> anyhow::Result<GuidanceResult> {
            Err(anyhow::anyhow!("HTTP 500"))
        }

        async fn validate_document(&self, _text: &str) -> anyhow::Result<DocumentValidation> {
            Err(anyhow::anyhow!("HTTP 500"))
        }
    }

    #[tokio::test]
    async fn client_error_yields_fallback_and_clears_busy() {
        let mut a = analyzer();
        let t0 = Instant::now();
        a.on_edit(LONG, t0);
        let ticket = a.poll(LONG, t0 + Duration::from_secs(1)).unwrap();

        let result = run_analysis(&FailingClient, &ticket).await;
        assert_eq!(result, GuidanceResult::fallback());
        a.complete(&ticket, LONG);
        assert!(!a.is_analyzing());
    }
}
