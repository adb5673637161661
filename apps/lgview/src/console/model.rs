use crossterm::event::{KeyCode, KeyEvent, KeyModifiers};
use lgview_model::{DiagnosticMethod, NetworkInfo};

/// Editable form state of the console. Everything about the run itself
/// lives in the execution controller.
#[derive(Debug, Clone)]
pub struct ConsoleState {
    pub method: DiagnosticMethod,
    pub target: String,
    pub info: InfoView,
    pub status: Option<String>,
}

#[derive(Debug, Clone, PartialEq)]
pub enum InfoView {
    Loading,
    Loaded(NetworkInfo),
    Unavailable(String),
}

impl ConsoleState {
    pub fn new(method: DiagnosticMethod, target: String) -> Self {
        Self {
            method,
            target,
            info: InfoView::Loading,
            status: None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConsoleAction {
    /// Execute, or cancel when a run is in flight.
    Toggle,
    NextMethod,
    NextLocation,
    PreviousLocation,
    Type(char),
    Erase,
    Quit,
    Ignore,
}

/// Maps a key press to an action. Method and target are frozen while a
/// run is in flight; location switching is not, since it only affects the
/// next run.
pub fn key_action(key: KeyEvent, running: bool) -> ConsoleAction {
    if key.modifiers.contains(KeyModifiers::CONTROL) {
        return match key.code {
            KeyCode::Char('c') | KeyCode::Char('d') => ConsoleAction::Quit,
            _ => ConsoleAction::Ignore,
        };
    }

    match key.code {
        KeyCode::Enter => ConsoleAction::Toggle,
        KeyCode::Esc => ConsoleAction::Quit,
        KeyCode::Right => ConsoleAction::NextLocation,
        KeyCode::Left => ConsoleAction::PreviousLocation,
        KeyCode::Tab if !running => ConsoleAction::NextMethod,
        KeyCode::Backspace if !running => ConsoleAction::Erase,
        KeyCode::Char(c) if !running && !c.is_control() => ConsoleAction::Type(c),
        _ => ConsoleAction::Ignore,
    }
}
