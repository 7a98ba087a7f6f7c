// Case Intake Wizard
// Main library entry point

pub mod api;
pub mod config;
pub mod models;
pub mod tui;
pub mod utils;
pub mod wizard;

use log::{error, info, warn};
use std::collections::BTreeMap;
use std::future::Future;
use std::path::Path;

use api::guidance::{AzureOpenAiClient, GuidanceClient};
use api::translation::{AzureTranslator, Translator};
use config::EnrichmentConfig;
use wizard::analyzer::{run_analysis, AnalysisTicket, DebouncedAnalyzer};
use wizard::controller::WizardController;
use wizard::speech::{RecognitionEvent, RecognitionSegment, SpeechCapability, TextRecognizer};

/// Initialize logging system with dual format (JSON + human-readable)
fn init_logging(with_stdout: bool) -> Result<(), Box<dyn std::error::Error>> {
    let log_dir = utils::path_resolver::resolve_log_folder()?;
    std::fs::create_dir_all(&log_dir)?;

    let timestamp = chrono::Utc::now().format("%Y-%m-%d-%H%M%S");
    let json_log_file = log_dir.join(format!("case-intake-{}.log", timestamp));
    let txt_log_file = log_dir.join(format!("case-intake-{}.txt", timestamp));

    // stdout stays off for the TUI and for commands that print JSON results.
    let mut dispatch = fern::Dispatch::new()
        .level(log::LevelFilter::Debug)
        .level_for("reqwest", log::LevelFilter::Info)
        .level_for("hyper_util", log::LevelFilter::Info);

    if with_stdout {
        dispatch = dispatch.chain(
            fern::Dispatch::new()
                .format(|out, message, record| {
                    out.finish(format_args!("{}", human_line(message, record)));
                })
                .chain(std::io::stdout()),
        );
    }

    dispatch = dispatch
        .chain(
            fern::Dispatch::new()
                .format(|out, message, record| {
                    let timestamp_utc = chrono::Utc::now().to_rfc3339();
                    let message_str = format!("{}", message);
                    let (phase, step, cleaned) = utils::logging::split_log_tags(&message_str);
                    let json_line = utils::logging::format_json_log(
                        &timestamp_utc,
                        record.level(),
                        record.target(),
                        &cleaned,
                        phase.as_deref(),
                        step.as_deref(),
                    );
                    out.finish(format_args!("{}\n", json_line));
                })
                .chain(fern::log_file(json_log_file)?),
        )
        .chain(
            fern::Dispatch::new()
                .format(|out, message, record| {
                    out.finish(format_args!("{}\n", human_line(message, record)));
                })
                .chain(fern::log_file(txt_log_file)?),
        );

    dispatch.apply()?;

    info!(
        "[PHASE: initialization] Logging initialized, log directory: {:?}",
        log_dir
    );
    Ok(())
}

fn human_line(message: &std::fmt::Arguments<'_>, record: &log::Record<'_>) -> String {
    let timestamp_local = chrono::Local::now().format("%Y-%m-%d %H:%M:%S%.3f");
    let message_str = format!("{}", message);
    let (phase, step, cleaned) = utils::logging::split_log_tags(&message_str);
    utils::logging::format_human_readable_log(
        &timestamp_local.to_string(),
        record.level(),
        record.target(),
        &cleaned,
        phase.as_deref(),
        step.as_deref(),
    )
}

fn start_session(label: &str) {
    if let Err(e) = init_logging(false) {
        eprintln!("Failed to initialize logging: {}", e);
    }
    info!(
        "[PHASE: initialization] {} starting at {} (executable folder {:?})",
        label,
        chrono::Utc::now(),
        utils::path_resolver::resolve_executable_folder()
    );
}

/// Configuration problems never stop the form; enrichment is simply disabled.
fn load_config() -> EnrichmentConfig {
    match EnrichmentConfig::load() {
        Ok(cfg) => cfg,
        Err(e) => {
            warn!(
                "[PHASE: initialization] [STEP: config] {}; enrichment disabled",
                e
            );
            EnrichmentConfig::default()
        }
    }
}

fn block_on<F: Future>(fut: F) -> anyhow::Result<F::Output> {
    let rt = tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()?;
    Ok(rt.block_on(fut))
}

fn print_json<T: serde::Serialize>(value: &T) -> anyhow::Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

fn exit_on_error(phase: &str, result: anyhow::Result<()>) {
    if let Err(e) = result {
        error!("[PHASE: {}] [STEP: fatal] {:#}", phase, e);
        eprintln!("Case intake error: {:#}", e);
        std::process::exit(1);
    }
}

/// Interactive terminal wizard.
pub fn run_tui() {
    start_session("Case intake TUI");
    let cfg = load_config();
    if let Err(e) = tui::run(&cfg) {
        error!("[PHASE: tui] [STEP: fatal] TUI exited with error: {:?}", e);
        eprintln!("Case intake error: {}", e);
    }
}

/// Non-interactive TUI smoke mode (for automated checks).
/// Renders a single frame to an in-memory backend and exits.
pub fn run_tui_smoke(target: Option<String>) {
    start_session("Headless TUI smoke");
    let target = target.as_deref().unwrap_or("personal");
    exit_on_error("tui", tui::smoke(target));
}

/// Request guidance for a description once and print it as JSON.
pub fn run_analyze(text: &str) {
    start_session("Guidance analysis");
    exit_on_error("analyze", analyze(&load_config(), text));
}

fn analyze(cfg: &EnrichmentConfig, text: &str) -> anyhow::Result<()> {
    let analyzer = DebouncedAnalyzer::from_config(cfg);
    if !analyzer.is_eligible(text) {
        anyhow::bail!(
            "description must be at least {} characters to analyze",
            cfg.min_description_chars
        );
    }

    let client = AzureOpenAiClient::from_config(cfg)?;
    let ticket = AnalysisTicket {
        generation: 1,
        text: text.to_string(),
    };
    let guidance = block_on(run_analysis(&client, &ticket))?;
    print_json(&guidance)
}

/// Push a text transcript through translation and keyword extraction; print the fields it sets.
pub fn run_transcript(text: &str, language: Option<&str>) {
    start_session("Transcript extraction");
    exit_on_error("transcript", transcript(&load_config(), text, language));
}

fn transcript(cfg: &EnrichmentConfig, text: &str, language: Option<&str>) -> anyhow::Result<()> {
    let translator = AzureTranslator::from_config(cfg)?;
    let mut controller = WizardController::new(
        DebouncedAnalyzer::from_config(cfg),
        SpeechCapability::Available(Box::new(TextRecognizer)),
    );
    if let Some(code) = language {
        controller.select_language(code)?;
    }
    controller.toggle_listening();

    let event = RecognitionEvent {
        results: vec![RecognitionSegment {
            text: text.to_string(),
            is_final: true,
        }],
    };
    let Some(job) = controller.begin_transcript(&event) else {
        anyhow::bail!("transcript is empty");
    };
    let result = block_on(translator.translate(&job.transcript, job.source, job.target))?;
    let updated = controller.finish_transcript(&job, result);

    let fields: BTreeMap<&str, String> = updated
        .into_iter()
        .filter_map(|id| controller.value(id).map(|v| (id, v.display())))
        .collect();
    print_json(&fields)
}

/// Run document validation on a plain-text file and print the verdict as JSON.
pub fn run_check_document(path: &Path) {
    start_session("Document check");
    exit_on_error("document", check_document(&load_config(), path));
}

fn check_document(cfg: &EnrichmentConfig, path: &Path) -> anyhow::Result<()> {
    let text = std::fs::read_to_string(path)
        .map_err(|e| anyhow::anyhow!("Failed to read {:?}: {}", path, e))?;
    let client = AzureOpenAiClient::from_config(cfg)?;
    let verdict = block_on(client.validate_document(&text))??;
    print_json(&verdict)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn short_description_is_refused_before_any_request() {
        let err = analyze(&EnrichmentConfig::default(), "too short").unwrap_err();
        assert!(err.to_string().contains("at least 50 characters"));
    }

    #[test]
    fn transcript_without_translator_still_extracts() {
        transcript(
            &EnrichmentConfig::default(),
            "mera naam Sunita Sharma",
            Some("hi-IN"),
        )
        .unwrap();
    }

    #[test]
    fn transcript_rejects_unknown_language() {
        assert!(transcript(&EnrichmentConfig::default(), "name Ravi", Some("xx")).is_err());
    }

    #[test]
    fn document_check_without_service_reports_unavailable() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "First Information Report No. 112/2024").unwrap();
        check_document(&EnrichmentConfig::default(), file.path()).unwrap();
    }

    #[test]
    fn missing_document_is_an_error() {
        let missing = Path::new("/definitely/not/here.txt");
        assert!(check_document(&EnrichmentConfig::default(), missing).is_err());
    }
}
