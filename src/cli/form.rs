use std::io::{self, IsTerminal, Write};
use std::path::Path;
use std::sync::Arc;

use colored::{control, Colorize};
use crossterm::{
    cursor,
    event::{self, Event, KeyCode, KeyEvent, KeyEventKind, KeyModifiers},
    style::{Attribute, Print, SetAttribute},
    terminal::{self, ClearType},
    ExecutableCommand, QueueableCommand,
};
use image::DynamicImage;

use crate::core::acquire;
use crate::core::error::MeterError;
use crate::core::formatter::{format_input, format_price, format_reading};
use crate::core::models::billing::{BillingInput, CURRENCY};
use crate::core::pipeline::{self, ImageSource};
use crate::core::vision::VisionClient;

const STEP: f64 = 0.1;

/// RAII guard that restores terminal state on drop (even on panic).
struct RawModeGuard;

impl RawModeGuard {
    fn enable() -> io::Result<Self> {
        terminal::enable_raw_mode()?;
        io::stdout().execute(cursor::Hide)?;
        Ok(Self)
    }
}

impl Drop for RawModeGuard {
    fn drop(&mut self) {
        let _ = io::stdout().execute(cursor::Show);
        let _ = terminal::disable_raw_mode();
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Field {
    Image,
    Previous,
    UnitCost,
    Submit,
}

impl Field {
    const ALL: [Field; 4] = [Field::Image, Field::Previous, Field::UnitCost, Field::Submit];

    fn label(&self) -> String {
        match self {
            Field::Image => "Upload current meter reading photo (jpg, jpeg, png)".to_string(),
            Field::Previous => "Enter previous meter reading".to_string(),
            Field::UnitCost => format!("Enter cost per unit (e.g., 10 {} per unit)", CURRENCY),
            Field::Submit => "Submit".to_string(),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum Message {
    Success(String),
    Info(String),
    Error(String),
}

#[derive(Debug, PartialEq)]
enum Action {
    Redraw,
    Submit,
    Quit,
}

/// Everything the form shows. Kept free of terminal I/O so it can be tested.
pub struct FormState {
    image_path: String,
    previous: String,
    unit_cost: String,
    focus: usize,
    /// The focused numeric field still shows its prefilled value, so the
    /// next typed character replaces it instead of appending.
    replace_on_type: bool,
    messages: Vec<Message>,
}

impl Default for FormState {
    fn default() -> Self {
        Self {
            image_path: String::new(),
            previous: format_input(0.0),
            unit_cost: format_input(0.0),
            focus: 0,
            replace_on_type: true,
            messages: Vec::new(),
        }
    }
}

impl FormState {
    fn focused(&self) -> Field {
        Field::ALL[self.focus]
    }

    fn move_focus(&mut self, focus: usize) {
        self.focus = focus;
        self.replace_on_type = true;
    }

    fn numeric_buffer(&mut self) -> Option<&mut String> {
        match self.focused() {
            Field::Previous => Some(&mut self.previous),
            Field::UnitCost => Some(&mut self.unit_cost),
            _ => None,
        }
    }

    /// Step the focused numeric field by `delta`, never below zero.
    fn step(&mut self, delta: f64) {
        self.replace_on_type = false;
        if let Some(buf) = self.numeric_buffer() {
            let current = parse_field(buf).unwrap_or(0.0);
            *buf = format_input((current + delta).max(0.0));
        }
    }

    fn handle_key(&mut self, key: KeyEvent) -> Action {
        let KeyEvent { code, modifiers, .. } = key;
        match (code, modifiers) {
            (KeyCode::Char('c'), KeyModifiers::CONTROL) | (KeyCode::Esc, _) => Action::Quit,
            (KeyCode::Up, _) | (KeyCode::BackTab, _) => {
                self.move_focus((self.focus + Field::ALL.len() - 1) % Field::ALL.len());
                Action::Redraw
            }
            (KeyCode::Down, _) | (KeyCode::Tab, _) => {
                self.move_focus((self.focus + 1) % Field::ALL.len());
                Action::Redraw
            }
            (KeyCode::Enter, _) => match self.focused() {
                Field::Submit => Action::Submit,
                _ => {
                    self.move_focus(self.focus + 1);
                    Action::Redraw
                }
            },
            (KeyCode::Left, _) => {
                self.step(-STEP);
                Action::Redraw
            }
            (KeyCode::Right, _) => {
                self.step(STEP);
                Action::Redraw
            }
            (KeyCode::Backspace, _) => {
                self.replace_on_type = false;
                match self.focused() {
                    Field::Image => {
                        self.image_path.pop();
                    }
                    _ => {
                        if let Some(buf) = self.numeric_buffer() {
                            buf.pop();
                        }
                    }
                }
                Action::Redraw
            }
            (KeyCode::Char(c), KeyModifiers::NONE | KeyModifiers::SHIFT) => {
                match self.focused() {
                    Field::Image => self.image_path.push(c),
                    _ => {
                        if c.is_ascii_digit() || c == '.' {
                            let replace = std::mem::take(&mut self.replace_on_type);
                            if let Some(buf) = self.numeric_buffer() {
                                if replace {
                                    buf.clear();
                                }
                                buf.push(c);
                            }
                        }
                    }
                }
                Action::Redraw
            }
            _ => Action::Redraw,
        }
    }

    /// Validate the inputs that do not need the model.
    fn billing_input(&self) -> Result<BillingInput, String> {
        let previous = parse_field(&self.previous)
            .ok_or_else(|| format!("Error in previous meter reading input: {:?}", self.previous))?;
        let unit_cost = parse_field(&self.unit_cost)
            .ok_or_else(|| format!("Error in unit cost input: {:?}", self.unit_cost))?;
        Ok(BillingInput::new(previous, unit_cost))
    }

    /// Run the whole extract-and-bill flow and replace the messages with the outcome.
    pub async fn submit(&mut self, http: &reqwest::Client, vision: &dyn VisionClient) {
        self.messages.clear();

        let path = self.image_path.trim().to_string();
        if path.is_empty() {
            self.messages
                .push(Message::Error("Please upload a current meter reading image.".to_string()));
            return;
        }
        if !acquire::is_supported_upload(&path) {
            self.messages.push(Message::Error(format!(
                "Unsupported file type: {} (expected one of: {})",
                path,
                acquire::UPLOAD_EXTENSIONS.join(", ")
            )));
            return;
        }

        let input = match self.billing_input() {
            Ok(i) => i,
            Err(msg) => {
                self.messages.push(Message::Error(msg));
                return;
            }
        };

        let image = match load_upload(&path) {
            Ok(img) => img,
            Err(reason) => {
                self.messages
                    .push(Message::Error(format!("Error opening the uploaded image: {}", reason)));
                return;
            }
        };

        let name = Path::new(&path)
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| path.clone());
        self.messages.push(Message::Info(format!(
            "Uploaded Meter Reading: {} ({}x{})",
            name,
            image.width(),
            image.height()
        )));

        match pipeline::extract_and_bill(http, vision, ImageSource::Decoded(image), input).await {
            Ok(bill) => {
                let r = bill.result;
                self.messages.push(Message::Success(format!(
                    "Current Meter Reading: {}",
                    format_reading(r.current_reading)
                )));
                self.messages.push(Message::Info(format!(
                    "Previous Meter Reading: {}",
                    format_reading(r.previous_reading)
                )));
                self.messages.push(Message::Success(format!(
                    "Consumption (Units): {}",
                    format_reading(r.consumption)
                )));
                self.messages.push(Message::Success(format!(
                    "Total Price: {}",
                    format_price(r.total_price)
                )));
            }
            Err(e) => self.messages.push(Message::Error(error_message(&e))),
        }
    }

    fn lines(&self, use_color: bool) -> Vec<(String, bool)> {
        control::set_override(use_color);
        let mut lines: Vec<(String, bool)> = vec![
            (format!("Meter Reading Price Calculator (in {})", CURRENCY).bold().to_string(), false),
            (String::new(), false),
            ("  Use arrow keys/tab to move, type to edit, left/right to step, enter to submit, esc to quit".to_string(), false),
            (String::new(), false),
        ];

        for (i, field) in Field::ALL.iter().enumerate() {
            let selected = i == self.focus;
            let marker = if selected { "> " } else { "  " };
            let text = match field {
                Field::Image => format!("{marker}{}: {}", field.label(), self.image_path),
                Field::Previous => format!("{marker}{}: {}", field.label(), self.previous),
                Field::UnitCost => format!("{marker}{}: {}", field.label(), self.unit_cost),
                Field::Submit => format!("{marker}[ {} ]", field.label()),
            };
            lines.push((text, selected));
        }

        if !self.messages.is_empty() {
            lines.push((String::new(), false));
        }
        for message in &self.messages {
            let text = match message {
                Message::Success(m) => format!("  {}", m.green()),
                Message::Info(m) => format!("  {}", m.cyan()),
                Message::Error(m) => format!("  {}", m.red()),
            };
            lines.push((text, false));
        }
        lines
    }
}

fn load_upload(path: &str) -> Result<DynamicImage, String> {
    let bytes = std::fs::read(path).map_err(|e| e.to_string())?;
    acquire::decode_upload(&bytes).map_err(|e| match e {
        MeterError::DecodeFailed(reason) => reason,
        other => other.to_string(),
    })
}

fn parse_field(buf: &str) -> Option<f64> {
    let trimmed = buf.trim();
    if trimmed.is_empty() {
        return Some(0.0);
    }
    trimmed.parse::<f64>().ok().filter(|v| v.is_finite() && *v >= 0.0)
}

fn error_message(err: &MeterError) -> String {
    match err {
        MeterError::EmptyModelResponse | MeterError::UnparseableReading(_) => format!(
            "Could not extract a meter reading from the image. Please try again with a clearer photo. ({})",
            err
        ),
        MeterError::NegativeConsumption { .. } => {
            "The current meter reading is less than the previous reading. Please verify the inputs."
                .to_string()
        }
        MeterError::DecodeFailed(_) | MeterError::DownloadFailed(_) | MeterError::InvalidInput(_) => {
            err.to_string()
        }
        MeterError::Internal(e) => format!("Error during meter reading analysis: {:#}", e),
    }
}

pub fn is_interactive() -> bool {
    io::stdin().is_terminal()
}

/// Returns `Ok(false)` without building the vision client when `interactive`
/// is false, `Ok(true)` after the user quits.
pub async fn run<F>(
    http: &reqwest::Client,
    interactive: bool,
    make_vision: F,
    use_color: bool,
) -> anyhow::Result<bool>
where
    F: FnOnce() -> anyhow::Result<Arc<dyn VisionClient>>,
{
    if !interactive {
        return Ok(false);
    }
    let vision = make_vision()?;

    let _guard = RawModeGuard::enable()?;
    let mut state = FormState::default();
    let mut drawn = draw(&state, use_color, 0)?;

    loop {
        let ev = tokio::task::block_in_place(event::read)?;
        let Event::Key(key) = ev else { continue };
        if key.kind != KeyEventKind::Press {
            continue;
        }
        match state.handle_key(key) {
            Action::Quit => {
                clear(drawn)?;
                return Ok(true);
            }
            Action::Redraw => {}
            Action::Submit => {
                state.messages = vec![Message::Info("Extracting current meter reading...".to_string())];
                drawn = draw(&state, use_color, drawn)?;
                state.submit(http, vision.as_ref()).await;
            }
        }
        drawn = draw(&state, use_color, drawn)?;
    }
}

/// Redraw in place. Returns how many lines were printed.
fn draw(state: &FormState, use_color: bool, previous_lines: usize) -> io::Result<usize> {
    let mut stdout = io::stdout();
    if previous_lines > 0 {
        stdout.queue(cursor::MoveUp(previous_lines as u16))?;
    }
    stdout
        .queue(cursor::MoveToColumn(0))?
        .queue(terminal::Clear(ClearType::FromCursorDown))?;

    let lines = state.lines(use_color);
    for (text, selected) in &lines {
        if *selected {
            stdout.queue(SetAttribute(Attribute::Reverse))?;
        }
        stdout.queue(Print(text))?;
        if *selected {
            stdout.queue(SetAttribute(Attribute::Reset))?;
        }
        stdout.queue(Print("\r\n"))?;
    }
    stdout.flush()?;
    Ok(lines.len())
}

fn clear(previous_lines: usize) -> io::Result<()> {
    let mut stdout = io::stdout();
    if previous_lines > 0 {
        stdout.queue(cursor::MoveUp(previous_lines as u16))?;
    }
    stdout
        .queue(cursor::MoveToColumn(0))?
        .queue(terminal::Clear(ClearType::FromCursorDown))?;
    stdout.flush()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::vision::testing::{png_bytes, CannedVision};

    fn key(code: KeyCode) -> KeyEvent {
        KeyEvent::new(code, KeyModifiers::NONE)
    }

    fn type_str(state: &mut FormState, s: &str) {
        for c in s.chars() {
            state.handle_key(key(KeyCode::Char(c)));
        }
    }

    fn temp_png(tag: &str) -> std::path::PathBuf {
        let path = std::env::temp_dir().join(format!("meterbill-form-{}-{}.png", tag, std::process::id()));
        std::fs::write(&path, png_bytes()).unwrap();
        path
    }

    #[test]
    fn navigation_wraps() {
        let mut state = FormState::default();
        assert_eq!(state.focused(), Field::Image);
        state.handle_key(key(KeyCode::Up));
        assert_eq!(state.focused(), Field::Submit);
        state.handle_key(key(KeyCode::Down));
        assert_eq!(state.focused(), Field::Image);
    }

    #[test]
    fn enter_on_submit_submits() {
        let mut state = FormState::default();
        state.focus = 3;
        assert_eq!(state.handle_key(key(KeyCode::Enter)), Action::Submit);
    }

    #[test]
    fn escape_quits() {
        let mut state = FormState::default();
        assert_eq!(state.handle_key(key(KeyCode::Esc)), Action::Quit);
        let ctrl_c = KeyEvent::new(KeyCode::Char('c'), KeyModifiers::CONTROL);
        assert_eq!(state.handle_key(ctrl_c), Action::Quit);
    }

    #[test]
    fn step_never_goes_below_zero() {
        let mut state = FormState::default();
        state.focus = 1;
        state.handle_key(key(KeyCode::Left));
        assert_eq!(state.previous, "0.00");
        state.handle_key(key(KeyCode::Right));
        state.handle_key(key(KeyCode::Right));
        assert_eq!(state.previous, "0.20");
    }

    #[test]
    fn typing_replaces_prefilled_value_after_focus() {
        let mut state = FormState::default();
        state.handle_key(key(KeyCode::Down));
        type_str(&mut state, "5");
        assert_eq!(state.previous, "5");
        type_str(&mut state, "0.5");
        assert_eq!(state.previous, "50.5");

        state.handle_key(key(KeyCode::Tab));
        state.handle_key(key(KeyCode::BackTab));
        type_str(&mut state, "7");
        assert_eq!(state.previous, "7");
    }

    #[test]
    fn stepping_keeps_value_for_further_typing() {
        let mut state = FormState::default();
        state.handle_key(key(KeyCode::Down));
        state.handle_key(key(KeyCode::Right));
        type_str(&mut state, "5");
        assert_eq!(state.previous, "0.105");
    }

    #[tokio::test]
    async fn non_interactive_run_skips_vision_setup() {
        let shown = run(
            &reqwest::Client::new(),
            false,
            || anyhow::bail!("GEMINI_API_KEY is not set"),
            false,
        )
        .await
        .unwrap();
        assert!(!shown);
    }

    #[test]
    fn numeric_fields_ignore_letters() {
        let mut state = FormState::default();
        state.focus = 2;
        state.unit_cost.clear();
        type_str(&mut state, "2a.5");
        assert_eq!(state.unit_cost, "2.5");
        state.handle_key(key(KeyCode::Backspace));
        assert_eq!(state.unit_cost, "2.");
    }

    #[test]
    fn billing_input_rejects_malformed_numbers() {
        let mut state = FormState::default();
        state.previous = "1.2.3".to_string();
        assert!(state.billing_input().is_err());
        state.previous = String::new();
        assert_eq!(state.billing_input().unwrap().previous_reading, 0.0);
    }

    #[tokio::test]
    async fn submit_without_image_asks_for_one() {
        let mut state = FormState::default();
        let vision = CannedVision::text("1");
        state.submit(&reqwest::Client::new(), &vision).await;
        assert_eq!(
            state.messages,
            vec![Message::Error("Please upload a current meter reading image.".to_string())]
        );
        assert_eq!(vision.calls(), 0);
    }

    #[tokio::test]
    async fn submit_rejects_unsupported_extension() {
        let mut state = FormState::default();
        state.image_path = "meter.gif".to_string();
        let vision = CannedVision::text("1");
        state.submit(&reqwest::Client::new(), &vision).await;
        assert!(matches!(&state.messages[0], Message::Error(m) if m.contains("Unsupported")));
    }

    #[tokio::test]
    async fn submit_shows_four_results() {
        let path = temp_png("ok");
        let mut state = FormState::default();
        state.image_path = path.to_string_lossy().into_owned();
        state.previous = "100".to_string();
        state.unit_cost = "2.5".to_string();

        let vision = CannedVision::text("120");
        state.submit(&reqwest::Client::new(), &vision).await;
        std::fs::remove_file(&path).unwrap();

        assert_eq!(state.messages.len(), 5);
        assert!(matches!(&state.messages[0], Message::Info(m) if m.contains("4x3")));
        assert_eq!(state.messages[1], Message::Success("Current Meter Reading: 120.0".to_string()));
        assert_eq!(state.messages[2], Message::Info("Previous Meter Reading: 100.0".to_string()));
        assert_eq!(state.messages[3], Message::Success("Consumption (Units): 20.0".to_string()));
        assert_eq!(state.messages[4], Message::Success("Total Price: AED 50.00".to_string()));
    }

    #[tokio::test]
    async fn submit_reports_backwards_meter_inline() {
        let path = temp_png("neg");
        let mut state = FormState::default();
        state.image_path = path.to_string_lossy().into_owned();
        state.previous = "100".to_string();

        let vision = CannedVision::text("99");
        state.submit(&reqwest::Client::new(), &vision).await;
        std::fs::remove_file(&path).unwrap();

        let last = state.messages.last().unwrap();
        assert!(matches!(last, Message::Error(m) if m.contains("less than the previous")));
    }

    #[tokio::test]
    async fn submit_reports_unreadable_meter_inline() {
        let path = temp_png("blank");
        let mut state = FormState::default();
        state.image_path = path.to_string_lossy().into_owned();

        let vision = CannedVision::text("I cannot see a meter");
        state.submit(&reqwest::Client::new(), &vision).await;
        std::fs::remove_file(&path).unwrap();

        let last = state.messages.last().unwrap();
        assert!(matches!(last, Message::Error(m) if m.contains("clearer photo")));
    }

    #[tokio::test]
    async fn submit_reports_missing_file_inline() {
        let mut state = FormState::default();
        state.image_path = "/definitely/not/here.png".to_string();
        let vision = CannedVision::text("1");
        state.submit(&reqwest::Client::new(), &vision).await;
        assert!(matches!(&state.messages[0], Message::Error(m) if m.contains("Error opening the uploaded image")));
        assert_eq!(vision.calls(), 0);
    }

    #[test]
    fn lines_show_fields_and_messages_without_ansi() {
        let mut state = FormState::default();
        state.messages.push(Message::Error("boom".to_string()));
        let lines = state.lines(false);
        let text: Vec<&str> = lines.iter().map(|(t, _)| t.as_str()).collect();
        assert!(text.iter().any(|l| l.contains("previous meter reading: 0.00")));
        assert!(text.iter().any(|l| l.contains("[ Submit ]")));
        assert!(text.iter().any(|l| *l == "  boom"));
        assert!(lines.iter().filter(|(_, selected)| *selected).count() == 1);
    }
}
