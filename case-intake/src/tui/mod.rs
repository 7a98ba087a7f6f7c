//! Terminal UI (TUI) front-end for the case intake wizard.
//!
//! Layout:
//! - Centered window frame titled "Case Intake"
//! - Left panel with the step list and speech status
//! - Main content panel for the active step (fields, review, or status)
//! - Guidance panel under the case fields while a description is being written
//! - Bottom button row: [ Back ] [ Next ] [ Cancel ]
//!
//! Note: Logging is file-only in TUI mode (stdout logging is disabled) to avoid corrupting the terminal UI.

use anyhow::{bail, Result};
use crossterm::event::{self, Event, KeyCode, KeyEventKind};
use crossterm::terminal::{
    disable_raw_mode, enable_raw_mode, EnterAlternateScreen, LeaveAlternateScreen,
};
use crossterm::ExecutableCommand;
use log::{debug, info, warn};
use ratatui::backend::{CrosstermBackend, TestBackend};
use ratatui::layout::{Alignment, Constraint, Direction, Layout, Rect};
use ratatui::style::{Color, Modifier, Style};
use ratatui::text::{Line, Span, Text};
use ratatui::widgets::{Block, Borders, Clear, Paragraph, Wrap};
use ratatui::Terminal;
use std::collections::HashMap;
use std::io::{self, Stdout};
use std::path::Path;
use std::sync::mpsc;
use std::sync::Arc;
use std::thread;
use std::time::{Duration, Instant};

use crate::api::guidance::{AzureOpenAiClient, GuidanceClient};
use crate::config::EnrichmentConfig;
use crate::models::fields::{
    FieldSpec, InputKind, SpokenLanguage, CASE_STEP, LANGUAGES, PERSONAL_STEP, REVIEW_STEP,
    STATUS_STEP, STEPS,
};
use crate::models::responses::GuidanceResult;
use crate::models::state::{AttachmentHandle, FieldValue};
use crate::wizard::analyzer::{run_analysis, AnalysisTicket, DebouncedAnalyzer};
use crate::wizard::controller::WizardController;
use crate::wizard::speech::SpeechCapability;

const NO_SPEECH_BACKEND: &str = "no microphone backend is available in the terminal";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum ButtonFocus {
    Back,
    Next,
    Cancel,
}

const BUTTONS: [ButtonFocus; 3] = [ButtonFocus::Back, ButtonFocus::Next, ButtonFocus::Cancel];

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum FocusTarget {
    Field(usize),
    Button(ButtonFocus),
}

#[derive(Debug, Clone, PartialEq, Eq)]
enum Modal {
    ConfirmCancel,
    Message { title: String, body: String },
}

/// Single-line editor. The cursor is a char index so multi-byte input never splits.
#[derive(Debug, Clone, Default)]
struct TextInput {
    value: String,
    cursor: usize,
}

impl TextInput {
    fn set(&mut self, value: impl Into<String>) {
        self.value = value.into();
        self.cursor = self.value.chars().count();
    }

    fn byte_offset(&self, char_index: usize) -> usize {
        self.value
            .char_indices()
            .nth(char_index)
            .map(|(b, _)| b)
            .unwrap_or(self.value.len())
    }

    /// Returns true when the key was consumed.
    fn handle_key(&mut self, code: KeyCode) -> bool {
        let len = self.value.chars().count();
        match code {
            KeyCode::Char(c) => {
                let at = self.byte_offset(self.cursor);
                self.value.insert(at, c);
                self.cursor += 1;
                true
            }
            KeyCode::Backspace => {
                if self.cursor > 0 {
                    self.cursor -= 1;
                    let at = self.byte_offset(self.cursor);
                    self.value.remove(at);
                }
                true
            }
            KeyCode::Delete => {
                if self.cursor < len {
                    let at = self.byte_offset(self.cursor);
                    self.value.remove(at);
                }
                true
            }
            KeyCode::Left => {
                self.cursor = self.cursor.saturating_sub(1);
                true
            }
            KeyCode::Right => {
                self.cursor = (self.cursor + 1).min(len);
                true
            }
            KeyCode::Home => {
                self.cursor = 0;
                true
            }
            KeyCode::End => {
                self.cursor = len;
                true
            }
            _ => false,
        }
    }

    /// Value with a cursor marker, for the focused field.
    fn display_with_cursor(&self) -> String {
        let at = self.byte_offset(self.cursor);
        format!("{}|{}", &self.value[..at], &self.value[at..])
    }
}

#[derive(Debug)]
enum UiMsg {
    GuidanceComplete {
        ticket: AnalysisTicket,
        result: GuidanceResult,
    },
}

struct TuiState {
    controller: WizardController,
    inputs: HashMap<&'static str, TextInput>,
    focus: FocusTarget,
    modal: Option<Modal>,
    confirm_yes: bool,
    notice: Option<String>,
    quit: bool,
}

impl TuiState {
    fn new(controller: WizardController) -> Self {
        let inputs = STEPS
            .iter()
            .flat_map(|s| s.fields.iter())
            .filter(|f| f.kind != InputKind::SingleSelect)
            .map(|f| (f.id, TextInput::default()))
            .collect();
        let mut state = Self {
            controller,
            inputs,
            focus: FocusTarget::Field(0),
            modal: None,
            confirm_yes: false,
            notice: None,
            quit: false,
        };
        state.reset_focus();
        state
    }

    fn step(&self) -> usize {
        self.controller.state().step
    }

    fn field_count(&self) -> usize {
        self.controller.active_step().fields.len()
    }

    fn reset_focus(&mut self) {
        self.focus = if self.field_count() > 0 {
            FocusTarget::Field(0)
        } else {
            FocusTarget::Button(ButtonFocus::Next)
        };
    }

    /// Copy controller text values into the editors (after values were set programmatically).
    fn sync_inputs(&mut self) {
        for (id, input) in self.inputs.iter_mut() {
            if let Some(text) = self.controller.state().values.text(id) {
                input.set(text);
            }
        }
    }

    fn focus_order(&self) -> Vec<FocusTarget> {
        (0..self.field_count())
            .map(FocusTarget::Field)
            .chain(BUTTONS.iter().copied().map(FocusTarget::Button))
            .collect()
    }

    fn move_focus(&mut self, delta: isize) {
        let order = self.focus_order();
        let current = order.iter().position(|f| *f == self.focus).unwrap_or(0) as isize;
        let len = order.len() as isize;
        let next = (current + delta).rem_euclid(len) as usize;
        self.focus = order[next];
    }

    fn focus_first_error(&mut self) {
        let errors = &self.controller.state().errors;
        if let Some(i) = self
            .controller
            .active_step()
            .fields
            .iter()
            .position(|f| errors.contains(f.id))
        {
            self.focus = FocusTarget::Field(i);
        }
    }

    fn set_value(&mut self, field: &FieldSpec, value: FieldValue) {
        if let Err(e) = self.controller.set_field(field.id, value) {
            warn!("[PHASE: tui] [STEP: input] {}", e);
            self.notice = Some(e.to_string());
        }
    }
}

pub fn run(cfg: &EnrichmentConfig) -> Result<()> {
    info!("[PHASE: tui] [STEP: start] Starting case intake TUI");

    let guidance: Arc<dyn GuidanceClient> = Arc::new(AzureOpenAiClient::from_config(cfg)?);
    let controller = WizardController::new(
        DebouncedAnalyzer::from_config(cfg),
        SpeechCapability::unavailable(NO_SPEECH_BACKEND),
    );

    let mut terminal = setup_terminal()?;
    let result = run_loop(&mut terminal, TuiState::new(controller), guidance);
    restore_terminal(&mut terminal)?;

    result
}

fn new_smoke_state(target: &str) -> Result<TuiState> {
    let mut c = WizardController::new(
        DebouncedAnalyzer::default(),
        SpeechCapability::unavailable(NO_SPEECH_BACKEND),
    );

    if target == "personal" {
        return Ok(TuiState::new(c));
    }

    c.set_field("full_name", "Sita Devi".into())?;
    c.set_field("phone", "9876543210".into())?;
    c.set_field("address", "12 MG Road, Pune".into())?;
    c.set_field("preferred_language", "Hindi".into())?;
    c.advance();

    c.set_field("case_type", "Labour".into())?;
    c.set_field("incident_date", "2024-03-15".into())?;
    c.set_field(
        "description",
        "My employer has not paid my salary for the last three months.".into(),
    )?;

    match target {
        "case" => {}
        "review" => {
            c.advance();
        }
        "status" => {
            c.advance();
            c.submit();
        }
        other => bail!("unknown smoke target '{}'", other),
    }

    let mut state = TuiState::new(c);
    state.sync_inputs();
    Ok(state)
}

pub fn smoke(target: &str) -> Result<()> {
    info!(
        "[PHASE: tui] [STEP: smoke] Rendering single-frame TUI smoke target={}",
        target
    );

    let t = target.trim().to_ascii_lowercase();
    let state = new_smoke_state(t.as_str())?;

    // In-memory backend: no raw mode or alternate screen.
    let backend = TestBackend::new(100, 30);
    let mut terminal = Terminal::new(backend)?;
    terminal.draw(|f| draw(f.size(), f, &state))?;

    Ok(())
}

fn setup_terminal() -> Result<Terminal<CrosstermBackend<Stdout>>> {
    enable_raw_mode()?;
    let mut stdout = io::stdout();
    stdout.execute(EnterAlternateScreen)?;
    let backend = CrosstermBackend::new(stdout);
    let terminal = Terminal::new(backend)?;
    Ok(terminal)
}

fn restore_terminal(terminal: &mut Terminal<CrosstermBackend<Stdout>>) -> Result<()> {
    disable_raw_mode()?;
    terminal.backend_mut().execute(LeaveAlternateScreen)?;
    terminal.show_cursor()?;
    Ok(())
}

fn run_loop(
    terminal: &mut Terminal<CrosstermBackend<Stdout>>,
    mut state: TuiState,
    guidance: Arc<dyn GuidanceClient>,
) -> Result<()> {
    let tick_rate = Duration::from_millis(100);
    let mut last_tick = Instant::now();
    let (tx, rx) = mpsc::channel::<UiMsg>();

    while !state.quit {
        drain_messages(&mut state, &rx);
        if let Some(ticket) = state.controller.tick(Instant::now()) {
            start_analysis(ticket, Arc::clone(&guidance), &tx);
        }
        terminal.draw(|f| draw(f.size(), f, &state))?;

        let timeout = tick_rate
            .checked_sub(last_tick.elapsed())
            .unwrap_or_else(|| Duration::from_millis(0));

        if event::poll(timeout)? {
            if let Event::Key(key) = event::read()? {
                if key.kind == KeyEventKind::Press {
                    handle_key(&mut state, key.code);
                }
            }
        }

        if last_tick.elapsed() >= tick_rate {
            last_tick = Instant::now();
        }
    }

    state.controller.cancel_pending_analysis();
    info!(
        "[PHASE: tui] [STEP: exit] Leaving wizard on step {} ({})",
        state.step(),
        state.controller.state().status.status.as_str()
    );
    Ok(())
}

fn start_analysis(ticket: AnalysisTicket, client: Arc<dyn GuidanceClient>, tx: &mpsc::Sender<UiMsg>) {
    let tx = tx.clone();
    thread::spawn(move || {
        let rt = tokio::runtime::Builder::new_current_thread()
            .enable_all()
            .build();
        let result = match rt {
            Ok(rt) => rt.block_on(run_analysis(client.as_ref(), &ticket)),
            Err(e) => {
                warn!(
                    "[PHASE: tui] [STEP: analysis] Internal error starting guidance request: {}",
                    e
                );
                GuidanceResult::fallback()
            }
        };
        let _ = tx.send(UiMsg::GuidanceComplete { ticket, result });
    });
}

fn drain_messages(state: &mut TuiState, rx: &mpsc::Receiver<UiMsg>) {
    while let Ok(msg) = rx.try_recv() {
        match msg {
            UiMsg::GuidanceComplete { ticket, result } => {
                if !state.controller.complete_analysis(&ticket, result) {
                    debug!(
                        "[PHASE: tui] [STEP: analysis] Dropped stale guidance generation={}",
                        ticket.generation
                    );
                }
            }
        }
    }
}

fn handle_key(state: &mut TuiState, code: KeyCode) {
    if let Some(modal) = state.modal.clone() {
        match modal {
            Modal::ConfirmCancel => match code {
                KeyCode::Left | KeyCode::Right | KeyCode::Tab => {
                    state.confirm_yes = !state.confirm_yes;
                }
                KeyCode::Enter => {
                    state.modal = None;
                    if state.confirm_yes {
                        info!("[PHASE: tui] [STEP: cancel] User cancelled the application");
                        state.quit = true;
                    }
                }
                KeyCode::Esc => state.modal = None,
                _ => {}
            },
            Modal::Message { .. } => {
                if matches!(code, KeyCode::Enter | KeyCode::Esc) {
                    state.modal = None;
                }
            }
        }
        return;
    }

    match code {
        KeyCode::Esc => open_cancel(state),
        KeyCode::F(2) => toggle_listening(state),
        KeyCode::F(3) => cycle_language(state),
        KeyCode::Tab | KeyCode::Down => state.move_focus(1),
        KeyCode::BackTab | KeyCode::Up => state.move_focus(-1),
        _ => match state.focus {
            FocusTarget::Button(b) => handle_button_key(state, b, code),
            FocusTarget::Field(i) => handle_field_key(state, i, code),
        },
    }
}

fn open_cancel(state: &mut TuiState) {
    state.confirm_yes = false;
    state.modal = Some(Modal::ConfirmCancel);
}

fn toggle_listening(state: &mut TuiState) {
    let listening = state.controller.toggle_listening();
    let speech = state.controller.speech();
    state.notice = Some(match speech.unavailable_reason() {
        Some(reason) => format!("Speech input unavailable: {}", reason),
        None if listening => format!("Listening ({})", speech.language().name),
        None => "Stopped listening".to_string(),
    });
}

fn next_language(current: &SpokenLanguage) -> &'static SpokenLanguage {
    let idx = LANGUAGES.iter().position(|l| l == current).unwrap_or(0);
    &LANGUAGES[(idx + 1) % LANGUAGES.len()]
}

fn cycle_language(state: &mut TuiState) {
    let next = next_language(state.controller.speech().language());
    state.notice = Some(match state.controller.select_language(next.recognition_code) {
        Ok(()) => format!("Speech language: {}", next.name),
        Err(e) => e.to_string(),
    });
}

fn handle_button_key(state: &mut TuiState, focused: ButtonFocus, code: KeyCode) {
    let idx = BUTTONS.iter().position(|b| *b == focused).unwrap_or(1);
    match code {
        KeyCode::Left => {
            state.focus = FocusTarget::Button(BUTTONS[idx.saturating_sub(1)]);
        }
        KeyCode::Right => {
            state.focus = FocusTarget::Button(BUTTONS[(idx + 1).min(BUTTONS.len() - 1)]);
        }
        KeyCode::Enter | KeyCode::Char(' ') => activate(state, focused),
        _ => {}
    }
}

fn activate(state: &mut TuiState, button: ButtonFocus) {
    match button {
        ButtonFocus::Back => {
            if can_go_back(state.step()) {
                state.controller.retreat();
                state.notice = None;
                state.reset_focus();
            }
        }
        ButtonFocus::Next => go_next(state),
        ButtonFocus::Cancel => open_cancel(state),
    }
}

fn go_next(state: &mut TuiState) {
    let moved = match state.step() {
        REVIEW_STEP => state.controller.submit(),
        STATUS_STEP => {
            state.quit = true;
            return;
        }
        _ => state.controller.advance(),
    };

    if moved {
        state.notice = None;
        state.reset_focus();
    } else {
        state.notice = Some("Please fix the highlighted fields.".to_string());
        state.focus_first_error();
    }
}

fn handle_field_key(state: &mut TuiState, index: usize, code: KeyCode) {
    let Some(field) = state.controller.active_step().fields.get(index) else {
        return;
    };

    match field.kind {
        InputKind::SingleSelect => match code {
            KeyCode::Left | KeyCode::Right | KeyCode::Char(' ') => {
                let current = state.controller.state().values.text(field.id);
                let next = cycle_option(field, current, code != KeyCode::Left);
                state.set_value(field, FieldValue::text(next));
            }
            KeyCode::Enter => state.move_focus(1),
            _ => {}
        },
        InputKind::File => match code {
            KeyCode::Enter => attach(state, field),
            other => {
                if let Some(input) = state.inputs.get_mut(field.id) {
                    input.handle_key(other);
                }
            }
        },
        InputKind::ShortText | InputKind::LongText | InputKind::Date => match code {
            KeyCode::Enter => state.move_focus(1),
            other => {
                let Some(input) = state.inputs.get_mut(field.id) else {
                    return;
                };
                let before = input.value.clone();
                input.handle_key(other);
                if input.value != before {
                    let value = FieldValue::text(input.value.clone());
                    state.set_value(field, value);
                }
            }
        },
    }
}

fn cycle_option(field: &FieldSpec, current: Option<&str>, forward: bool) -> &'static str {
    let options = field.options;
    let len = options.len();
    let pos = current.and_then(|c| options.iter().position(|o| *o == c));
    let next = match (pos, forward) {
        (None, true) => 0,
        (None, false) => len.saturating_sub(1),
        (Some(i), true) => (i + 1) % len,
        (Some(i), false) => (i + len - 1) % len,
    };
    options.get(next).copied().unwrap_or_default()
}

fn attach(state: &mut TuiState, field: &FieldSpec) {
    let path = state
        .inputs
        .get(field.id)
        .map(|i| i.value.trim().to_string())
        .unwrap_or_default();
    if path.is_empty() {
        state.notice = Some("Type the path of a file and press Enter to attach it.".to_string());
        return;
    }

    match attach_file(Path::new(&path)) {
        Ok(handle) => {
            info!(
                "[PHASE: tui] [STEP: attach] {} -> {} ({} bytes)",
                field.id, handle.file_name, handle.size_bytes
            );
            state.notice = Some(format!("Attached {}", handle.file_name));
            state.set_value(field, FieldValue::Attachment(handle));
        }
        Err(e) => {
            state.modal = Some(Modal::Message {
                title: "Attachment failed".to_string(),
                body: format!("{:#}", e),
            });
        }
    }
}

fn attach_file(path: &Path) -> Result<AttachmentHandle> {
    let meta = std::fs::metadata(path)
        .map_err(|e| anyhow::anyhow!("Cannot read {}: {}", path.display(), e))?;
    if !meta.is_file() {
        bail!("{} is not a file", path.display());
    }
    let name = path
        .file_name()
        .map(|n| n.to_string_lossy().to_string())
        .unwrap_or_else(|| path.display().to_string());
    Ok(AttachmentHandle::new(name, meta.len()))
}

fn can_go_back(step: usize) -> bool {
    step > PERSONAL_STEP
}

fn next_label(step: usize) -> &'static str {
    match step {
        REVIEW_STEP => "Submit",
        STATUS_STEP => "Finish",
        _ => "Next",
    }
}

// ---------------------------------------------------------------------------
// Drawing
// ---------------------------------------------------------------------------

fn draw(area: Rect, f: &mut ratatui::Frame<'_>, state: &TuiState) {
    let (window_area, _) = centered_window(area, 100, 30);

    let outer_block = Block::default()
        .borders(Borders::ALL)
        .title(format!("Case Intake  {}", state.controller.state().status.id));
    f.render_widget(outer_block, window_area);

    let inner = window_area.inner(&ratatui::layout::Margin {
        vertical: 1,
        horizontal: 1,
    });
    let rows = Layout::default()
        .direction(Direction::Vertical)
        .constraints([Constraint::Min(0), Constraint::Length(1), Constraint::Length(1)].as_ref())
        .split(inner);

    let cols = Layout::default()
        .direction(Direction::Horizontal)
        .constraints([Constraint::Length(28), Constraint::Min(0)].as_ref())
        .split(rows[0]);

    draw_sidebar(f, cols[0], state);

    let step = state.step();
    let content_block = Block::default()
        .borders(Borders::ALL)
        .title(STEPS[step].title);
    let content_area = content_block.inner(cols[1]);
    f.render_widget(content_block, cols[1]);

    match step {
        CASE_STEP => {
            let parts = Layout::default()
                .direction(Direction::Vertical)
                .constraints([Constraint::Min(0), Constraint::Length(9)].as_ref())
                .split(content_area);
            draw_fields(f, parts[0], state);
            draw_guidance(f, parts[1], state);
        }
        REVIEW_STEP => draw_review(f, content_area, state),
        STATUS_STEP => draw_status(f, content_area, state),
        _ => draw_fields(f, content_area, state),
    }

    let notice = Paragraph::new(state.notice.clone().unwrap_or_default())
        .style(Style::default().fg(Color::Yellow));
    f.render_widget(notice, rows[1]);

    draw_buttons(f, rows[2], state);

    match &state.modal {
        Some(Modal::ConfirmCancel) => draw_cancel_modal(f, window_area, state),
        Some(Modal::Message { title, body }) => draw_message_modal(f, window_area, title, body),
        None => {}
    }
}

fn centered_window(area: Rect, width: u16, height: u16) -> (Rect, Rect) {
    let w = width.min(area.width.saturating_sub(2)).max(60).min(area.width);
    let h = height.min(area.height.saturating_sub(2)).max(20).min(area.height);
    let x = area.x + (area.width.saturating_sub(w)) / 2;
    let y = area.y + (area.height.saturating_sub(h)) / 2;
    let rect = Rect {
        x,
        y,
        width: w,
        height: h,
    };
    (rect, rect)
}

fn draw_sidebar(f: &mut ratatui::Frame<'_>, area: Rect, state: &TuiState) {
    let current = state.step();
    let mut lines: Vec<Line> = Vec::new();
    for (i, s) in STEPS.iter().enumerate() {
        let (marker, style) = if i == current {
            (">", Style::default().add_modifier(Modifier::BOLD))
        } else if i < current {
            ("*", Style::default().fg(Color::Green))
        } else {
            (" ", Style::default().fg(Color::DarkGray))
        };
        lines.push(Line::from(Span::styled(
            format!("{} {}. {}", marker, i + 1, s.title),
            style,
        )));
    }

    let speech = state.controller.speech();
    let wizard = state.controller.state();
    lines.push(Line::from(""));
    lines.push(Line::from(format!("Speech: {}", speech.language().name)));
    lines.push(Line::from(if wizard.is_listening {
        "Listening..."
    } else if speech.is_available() {
        "Idle"
    } else {
        "Not available"
    }));
    lines.push(Line::from(""));
    lines.push(Line::from(Span::styled(
        "Tab/Up/Down move",
        Style::default().fg(Color::DarkGray),
    )));
    lines.push(Line::from(Span::styled(
        "F2 listen  F3 language",
        Style::default().fg(Color::DarkGray),
    )));
    lines.push(Line::from(Span::styled(
        "Esc cancel",
        Style::default().fg(Color::DarkGray),
    )));

    let p = Paragraph::new(Text::from(lines))
        .block(Block::default().borders(Borders::ALL).title("Steps"))
        .wrap(Wrap { trim: true });
    f.render_widget(p, area);
}

fn field_value_text(state: &TuiState, field: &FieldSpec, focused: bool) -> String {
    let stored = state.controller.value(field.id);
    match field.kind {
        InputKind::SingleSelect => {
            let v = stored.map(FieldValue::display).unwrap_or_default();
            if focused {
                format!("< {} >", if v.is_empty() { "choose" } else { v.as_str() })
            } else {
                v
            }
        }
        InputKind::File => match (stored, state.inputs.get(field.id)) {
            (Some(FieldValue::Attachment(a)), Some(input)) if focused && !input.value.is_empty() => {
                format!("{} ({} bytes)  path: {}", a.file_name, a.size_bytes, input.display_with_cursor())
            }
            (Some(v), _) => v.display(),
            (None, Some(input)) if focused => format!("path: {}", input.display_with_cursor()),
            _ => String::new(),
        },
        _ => match state.inputs.get(field.id) {
            Some(input) if focused => input.display_with_cursor(),
            _ => stored.map(FieldValue::display).unwrap_or_default(),
        },
    }
}

fn draw_fields(f: &mut ratatui::Frame<'_>, area: Rect, state: &TuiState) {
    let errors = &state.controller.state().errors;
    let mut lines: Vec<Line> = Vec::new();

    for (i, field) in state.controller.active_step().fields.iter().enumerate() {
        let focused = state.focus == FocusTarget::Field(i) && state.modal.is_none();
        let label = if field.required {
            format!("{} *", field.label)
        } else {
            field.label.to_string()
        };
        let value_style = if focused {
            Style::default().add_modifier(Modifier::REVERSED)
        } else {
            Style::default()
        };
        lines.push(Line::from(vec![
            Span::styled(format!("{:<22}", label), Style::default().add_modifier(Modifier::BOLD)),
            Span::styled(field_value_text(state, field, focused), value_style),
        ]));

        if let Some(message) = errors.get(field.id) {
            lines.push(Line::from(Span::styled(
                format!("{:<22}! {}", "", message),
                Style::default().fg(Color::Red),
            )));
        } else if focused {
            lines.push(Line::from(Span::styled(
                format!("{:<22}{}", "", field.help),
                Style::default().fg(Color::DarkGray),
            )));
        }
    }

    let p = Paragraph::new(Text::from(lines)).wrap(Wrap { trim: false });
    f.render_widget(p, area);
}

fn draw_guidance(f: &mut ratatui::Frame<'_>, area: Rect, state: &TuiState) {
    let wizard = state.controller.state();
    let mut lines: Vec<Line> = Vec::new();

    if wizard.is_analyzing {
        lines.push(Line::from(Span::styled(
            "Analyzing your description...",
            Style::default().fg(Color::Cyan),
        )));
    }

    match &wizard.guidance {
        Some(g) => {
            if !g.explanation.trim().is_empty() {
                lines.push(Line::from(g.explanation.clone()));
            }
            if !g.requirements.is_empty() {
                lines.push(Line::from(Span::styled(
                    "You will need:",
                    Style::default().add_modifier(Modifier::BOLD),
                )));
                lines.extend(g.requirements.iter().map(|r| Line::from(format!("  - {}", r))));
            }
            if !g.suggestions.is_empty() {
                lines.push(Line::from(Span::styled(
                    "Suggestions:",
                    Style::default().add_modifier(Modifier::BOLD),
                )));
                lines.extend(g.suggestions.iter().map(|s| Line::from(format!("  - {}", s))));
            }
        }
        None if !wizard.is_analyzing => {
            lines.push(Line::from(Span::styled(
                "Guidance appears here once the description is long enough and you pause typing.",
                Style::default().fg(Color::DarkGray),
            )));
        }
        None => {}
    }

    let p = Paragraph::new(Text::from(lines))
        .block(Block::default().borders(Borders::TOP).title("Guidance"))
        .wrap(Wrap { trim: true });
    f.render_widget(p, area);
}

fn draw_review(f: &mut ratatui::Frame<'_>, area: Rect, state: &TuiState) {
    let mut lines: Vec<Line> = Vec::new();
    for step in STEPS.iter().filter(|s| s.is_data_entry()) {
        lines.push(Line::from(Span::styled(
            step.title,
            Style::default().add_modifier(Modifier::BOLD | Modifier::UNDERLINED),
        )));
        for field in step.fields {
            let value = state
                .controller
                .value(field.id)
                .map(FieldValue::display)
                .filter(|v| !v.trim().is_empty())
                .unwrap_or_else(|| "(not provided)".to_string());
            lines.push(Line::from(format!("  {:<22}{}", field.label, value)));
        }
        lines.push(Line::from(""));
    }
    lines.push(Line::from("Press Submit to send your application for review."));

    let p = Paragraph::new(Text::from(lines)).wrap(Wrap { trim: false });
    f.render_widget(p, area);
}

fn draw_status(f: &mut ratatui::Frame<'_>, area: Rect, state: &TuiState) {
    let status = &state.controller.state().status;
    let mut lines = vec![
        Line::from(format!("Application ID:  {}", status.id)),
        Line::from(format!("Status:          {}", status.status.as_str())),
        Line::from(format!(
            "Last updated:    {}",
            status.last_updated.format("%Y-%m-%d %H:%M UTC")
        )),
        Line::from(""),
    ];
    if let Some(comment) = &status.comment {
        lines.push(Line::from(comment.clone()));
    }

    let p = Paragraph::new(Text::from(lines)).wrap(Wrap { trim: false });
    f.render_widget(p, area);
}

fn draw_buttons(f: &mut ratatui::Frame<'_>, area: Rect, state: &TuiState) {
    let step = state.step();
    let focused = |b: ButtonFocus| state.focus == FocusTarget::Button(b);

    let line = Line::from(vec![
        button_text("Back", focused(ButtonFocus::Back), can_go_back(step)),
        Span::raw(" "),
        button_text(next_label(step), focused(ButtonFocus::Next), true),
        Span::raw(" "),
        button_text("Cancel", focused(ButtonFocus::Cancel), true),
    ]);

    let p = Paragraph::new(Text::from(line)).alignment(Alignment::Right);
    f.render_widget(p, area);
}

fn button_text(label: &str, focused: bool, enabled: bool) -> Span<'static> {
    let mut style = Style::default();
    if !enabled {
        style = style.fg(Color::DarkGray);
    }
    if focused && enabled {
        style = style.add_modifier(Modifier::REVERSED);
    }
    Span::styled(format!("[ {} ]", label), style)
}

fn modal_area(window_area: Rect, width: u16, height: u16) -> Rect {
    let w = width.min(window_area.width.saturating_sub(4)).max(30);
    let x = window_area.x + (window_area.width.saturating_sub(w)) / 2;
    let y = window_area.y + (window_area.height.saturating_sub(height)) / 2;
    Rect {
        x,
        y,
        width: w,
        height,
    }
}

fn draw_cancel_modal(f: &mut ratatui::Frame<'_>, window_area: Rect, state: &TuiState) {
    let area = modal_area(window_area, 56, 7);
    f.render_widget(Clear, area);

    let block = Block::default()
        .borders(Borders::ALL)
        .title("Cancel application?");
    let body = Paragraph::new(Text::from(vec![
        Line::from("Nothing you entered is saved if you leave now."),
        Line::from(""),
        Line::from(""),
    ]))
    .block(block)
    .wrap(Wrap { trim: false });
    f.render_widget(body, area);

    let buttons_area = Rect {
        x: area.x + 1,
        y: area.y + area.height - 2,
        width: area.width - 2,
        height: 1,
    };
    let style = |on: bool| {
        if on {
            Style::default().add_modifier(Modifier::REVERSED)
        } else {
            Style::default()
        }
    };
    let line = Line::from(vec![
        Span::styled("[ Yes, cancel ]", style(state.confirm_yes)),
        Span::raw(" "),
        Span::styled("[ No ]", style(!state.confirm_yes)),
    ]);
    let p = Paragraph::new(Text::from(line)).alignment(Alignment::Right);
    f.render_widget(p, buttons_area);
}

fn draw_message_modal(f: &mut ratatui::Frame<'_>, window_area: Rect, title: &str, body: &str) {
    let area = modal_area(window_area, 60, 8);
    f.render_widget(Clear, area);

    let p = Paragraph::new(Text::from(vec![
        Line::from(body.to_string()),
        Line::from(""),
        Line::from(Span::styled(
            "Press Enter to continue.",
            Style::default().fg(Color::DarkGray),
        )),
    ]))
    .block(Block::default().borders(Borders::ALL).title(title.to_string()))
    .wrap(Wrap { trim: true });
    f.render_widget(p, area);
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::fields::DESCRIPTION_FIELD;
    use crate::models::state::StatusKind;
    use std::io::Write;

    fn fresh() -> TuiState {
        TuiState::new(WizardController::default())
    }

    fn render(state: &TuiState) -> String {
        let mut terminal = Terminal::new(TestBackend::new(100, 30)).unwrap();
        terminal.draw(|f| draw(f.size(), f, state)).unwrap();
        let buffer = terminal.backend().buffer().clone();
        buffer
            .content
            .chunks(buffer.area.width as usize)
            .map(|row| row.iter().map(|c| c.symbol()).collect::<String>())
            .collect::<Vec<_>>()
            .join("\n")
    }

    fn type_text(state: &mut TuiState, text: &str) {
        for c in text.chars() {
            handle_key(state, KeyCode::Char(c));
        }
    }

    #[test]
    fn smoke_renders_every_target() {
        for target in ["personal", "case", "review", "status", " Review "] {
            smoke(target).unwrap();
        }
        assert!(smoke("license").is_err());
    }

    #[test]
    fn first_frame_shows_personal_step_and_buttons() {
        let screen = render(&fresh());
        assert!(screen.contains("Personal Information"));
        assert!(screen.contains("Full Name *"));
        assert!(screen.contains("[ Next ]"));
        assert!(screen.contains("Not available"));
    }

    #[test]
    fn typing_updates_the_controller() {
        let mut s = fresh();
        type_text(&mut s, "Ravi");
        handle_key(&mut s, KeyCode::Backspace);
        assert_eq!(s.controller.value("full_name"), Some(&FieldValue::text("Rav")));
    }

    #[test]
    fn text_input_handles_multibyte_characters() {
        let mut input = TextInput::default();
        for c in "नाम".chars() {
            input.handle_key(KeyCode::Char(c));
        }
        input.handle_key(KeyCode::Left);
        input.handle_key(KeyCode::Backspace);
        assert_eq!(input.value.chars().count(), 2);
        input.handle_key(KeyCode::End);
        input.handle_key(KeyCode::Char('!'));
        assert!(input.value.ends_with('!'));
    }

    #[test]
    fn next_on_empty_step_focuses_first_error() {
        let mut s = fresh();
        s.focus = FocusTarget::Button(ButtonFocus::Next);
        handle_key(&mut s, KeyCode::Enter);
        assert_eq!(s.step(), PERSONAL_STEP);
        assert_eq!(s.focus, FocusTarget::Field(0));
        assert!(render(&s).contains("Full Name is required"));
    }

    #[test]
    fn select_fields_cycle_through_options() {
        let mut s = fresh();
        s.focus = FocusTarget::Field(4);
        handle_key(&mut s, KeyCode::Right);
        assert_eq!(
            s.controller.value("preferred_language"),
            Some(&FieldValue::text("English"))
        );
        handle_key(&mut s, KeyCode::Left);
        handle_key(&mut s, KeyCode::Left);
        assert_eq!(
            s.controller.value("preferred_language"),
            Some(&FieldValue::text("Bengali"))
        );
    }

    #[test]
    fn listen_key_reports_unavailable_speech() {
        let mut s = fresh();
        handle_key(&mut s, KeyCode::F(2));
        assert!(!s.controller.state().is_listening);
        assert!(s.notice.as_deref().unwrap_or_default().contains("unavailable"));
    }

    #[test]
    fn language_key_cycles_spoken_language() {
        let mut s = fresh();
        handle_key(&mut s, KeyCode::F(3));
        assert_eq!(s.controller.speech().language().name, "Hindi");
    }

    #[test]
    fn cancel_requires_confirmation() {
        let mut s = fresh();
        handle_key(&mut s, KeyCode::Esc);
        assert_eq!(s.modal, Some(Modal::ConfirmCancel));
        handle_key(&mut s, KeyCode::Enter);
        assert!(!s.quit, "default choice is No");

        handle_key(&mut s, KeyCode::Esc);
        handle_key(&mut s, KeyCode::Left);
        handle_key(&mut s, KeyCode::Enter);
        assert!(s.quit);
    }

    #[test]
    fn full_walkthrough_submits_application() {
        let mut s = new_smoke_state("review").unwrap();
        s.focus = FocusTarget::Button(ButtonFocus::Next);
        handle_key(&mut s, KeyCode::Enter);
        assert_eq!(s.step(), STATUS_STEP);
        assert_eq!(s.controller.state().status.status, StatusKind::Reviewing);
        assert!(render(&s).contains("Under Review"));

        handle_key(&mut s, KeyCode::Enter);
        assert!(s.quit);
    }

    #[test]
    fn guidance_message_is_applied_and_rendered() {
        let mut s = new_smoke_state("case").unwrap();
        let text = s.controller.state().values.text(DESCRIPTION_FIELD).unwrap().to_string();
        let t0 = Instant::now();
        s.controller
            .set_field_at(DESCRIPTION_FIELD, text.into(), t0)
            .unwrap();
        let ticket = s.controller.tick(t0 + Duration::from_secs(2)).unwrap();
        assert!(render(&s).contains("Analyzing your description"));

        let (tx, rx) = mpsc::channel();
        tx.send(UiMsg::GuidanceComplete {
            ticket,
            result: GuidanceResult {
                explanation: "Unpaid wages can be claimed before the Labour Commissioner."
                    .to_string(),
                requirements: vec!["Salary slips".to_string()],
                suggestions: vec![],
            },
        })
        .unwrap();
        drain_messages(&mut s, &rx);

        assert!(!s.controller.state().is_analyzing);
        let screen = render(&s);
        assert!(screen.contains("Labour Commissioner"));
        assert!(screen.contains("Salary slips"));
    }

    #[test]
    fn file_field_attaches_by_path() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        file.write_all(b"notice").unwrap();

        let mut s = fresh();
        s.focus = FocusTarget::Field(5);
        type_text(&mut s, &file.path().display().to_string());
        handle_key(&mut s, KeyCode::Enter);
        match s.controller.value("id_proof") {
            Some(FieldValue::Attachment(a)) => assert_eq!(a.size_bytes, 6),
            other => panic!("expected attachment, got {:?}", other),
        }
    }

    #[test]
    fn missing_file_opens_message_modal() {
        let mut s = fresh();
        s.focus = FocusTarget::Field(5);
        type_text(&mut s, "/no/such/file.pdf");
        handle_key(&mut s, KeyCode::Enter);
        assert!(matches!(s.modal, Some(Modal::Message { .. })));
        assert!(s.controller.value("id_proof").is_none());
    }
}
