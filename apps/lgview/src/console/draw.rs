use super::model::{ConsoleState, InfoView};
use lgview_model::Location;
use lgview_stream::ExecutionPhase;

pub struct Screen<'a> {
    pub state: &'a ConsoleState,
    pub location: Option<&'a Location>,
    pub phase: ExecutionPhase,
    pub output: &'a str,
}

const HEADER_LINES: usize = 8;

/// Renders the whole console as `\r\n`-separated lines for a raw-mode
/// terminal of the given size.
pub fn render_screen(screen: &Screen<'_>, term_w: u16, term_h: u16) -> String {
    let width = term_w as usize;
    let mut lines = Vec::new();

    lines.push(center_line("LOOKING GLASS", width));

    match screen.location {
        Some(location) => lines.push(format!(
            "Location: {} ({})  <- ->",
            location.name, location.url
        )),
        None => lines.push("Location: (none)".to_string()),
    }
    lines.push(info_line(&screen.state.info));

    let cursor = if screen.phase.is_running() { "" } else { "_" };
    lines.push(format!(
        "Method: [{}]  Tab   Target: {}{}",
        screen.state.method, screen.state.target, cursor
    ));

    let action = if screen.phase.is_running() {
        "Enter=cancel"
    } else {
        "Enter=execute"
    };
    lines.push(format!("{action}  Esc=quit   [{}]", phase_label(screen.phase)));
    lines.push(screen.state.status.clone().unwrap_or_default());
    lines.push("-".repeat(width.max(1)));

    let room = (term_h as usize).saturating_sub(HEADER_LINES).max(1);
    if screen.output.is_empty() {
        lines.push("Waiting for command...".to_string());
    } else {
        lines.extend(tail_lines(screen.output, room).into_iter().map(str::to_string));
    }

    lines
        .into_iter()
        .map(|line| clip(&line, width))
        .collect::<Vec<_>>()
        .join("\r\n")
}

fn info_line(info: &InfoView) -> String {
    match info {
        InfoView::Loading => "Network: loading...".to_string(),
        InfoView::Loaded(info) => format!(
            "Network: {} {}  v4 {}  v6 {}  you {}",
            info.facility,
            info.location,
            info.looking_glass_ipv4,
            info.looking_glass_ipv6,
            info.your_ip
        ),
        InfoView::Unavailable(reason) => format!("Network: unavailable ({reason})"),
    }
}

fn phase_label(phase: ExecutionPhase) -> &'static str {
    match phase {
        ExecutionPhase::Idle => "idle",
        ExecutionPhase::Running => "RUNNING",
        ExecutionPhase::Completed => "done",
        ExecutionPhase::Failed => "failed",
        ExecutionPhase::Cancelled => "cancelled",
    }
}

fn tail_lines(output: &str, room: usize) -> Vec<&str> {
    let lines: Vec<&str> = output.lines().collect();
    let start = lines.len().saturating_sub(room);
    lines[start..].to_vec()
}

fn clip(line: &str, width: usize) -> String {
    line.chars().take(width.max(1)).collect()
}

fn center_line(text: &str, width: usize) -> String {
    if text.len() >= width {
        return text.to_string();
    }
    let pad = (width - text.len()) / 2;
    format!("{}{}", " ".repeat(pad), text)
}
