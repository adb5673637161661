pub mod draw;
pub mod model;

pub use draw::{render_screen, Screen};
pub use model::{key_action, ConsoleAction, ConsoleState, InfoView};

use anyhow::{Context, Result};
use crossterm::cursor::{Hide, MoveTo, Show};
use crossterm::event::{self, Event, KeyEvent, KeyEventKind};
use crossterm::terminal::{
    self, Clear, ClearType, EnterAlternateScreen, LeaveAlternateScreen,
};
use crossterm::{execute, queue};
use lgview_model::NetworkInfo;
use lgview_stream::{ExecutionController, HttpTransport, LocationContext, TransportError};
use std::io::{self, Write};
use std::sync::Arc;
use std::thread;
use tokio::sync::mpsc;

enum Input {
    Key(KeyEvent),
    Resize,
}

struct InfoResult {
    location_id: String,
    result: Result<NetworkInfo, TransportError>,
}

pub async fn run(
    locations: LocationContext,
    transport: Arc<HttpTransport>,
    state: ConsoleState,
) -> Result<()> {
    terminal::enable_raw_mode().context("failed to enable raw mode")?;
    let mut stdout = io::stdout();
    if let Err(err) = execute!(stdout, EnterAlternateScreen, Hide) {
        let _ = terminal::disable_raw_mode();
        return Err(err).context("failed to enter alternate screen");
    }

    let result = event_loop(locations, transport, state).await;

    let _ = execute!(stdout, Show, LeaveAlternateScreen);
    let _ = terminal::disable_raw_mode();
    result
}

async fn event_loop(
    mut locations: LocationContext,
    transport: Arc<HttpTransport>,
    mut state: ConsoleState,
) -> Result<()> {
    let (input_tx, mut input_rx) = mpsc::unbounded_channel();
    thread::spawn(move || read_input(input_tx));

    let (info_tx, mut info_rx) = mpsc::unbounded_channel();
    fetch_info(&locations, &transport, &info_tx);

    let mut controller = ExecutionController::new(Arc::clone(&transport));
    draw(&state, &locations, &controller)?;

    loop {
        tokio::select! {
            event = controller.next_event() => {
                let Some(event) = event else { break };
                controller.apply(event);
            }
            input = input_rx.recv() => {
                let key = match input {
                    Some(Input::Key(key)) => key,
                    Some(Input::Resize) => {
                        draw(&state, &locations, &controller)?;
                        continue;
                    }
                    None => break,
                };

                match key_action(key, controller.is_running()) {
                    ConsoleAction::Quit => {
                        controller.cancel();
                        break;
                    }
                    ConsoleAction::Toggle => {
                        state.status = controller
                            .start(state.method, &state.target, locations.current())
                            .err()
                            .map(|err| format!("Error: {err}"));
                    }
                    ConsoleAction::NextMethod => state.method = state.method.next(),
                    ConsoleAction::NextLocation => {
                        locations.select_next();
                        state.info = InfoView::Loading;
                        fetch_info(&locations, &transport, &info_tx);
                    }
                    ConsoleAction::PreviousLocation => {
                        locations.select_previous();
                        state.info = InfoView::Loading;
                        fetch_info(&locations, &transport, &info_tx);
                    }
                    ConsoleAction::Type(c) => state.target.push(c),
                    ConsoleAction::Erase => {
                        state.target.pop();
                    }
                    ConsoleAction::Ignore => continue,
                }
            }
            Some(info) = info_rx.recv() => {
                // Answers for a location that is no longer selected are stale.
                if locations.current().map(|location| location.id.as_str())
                    == Some(info.location_id.as_str())
                {
                    state.info = match info.result {
                        Ok(info) => InfoView::Loaded(info),
                        Err(err) => {
                            tracing::warn!(error = %err, "failed to fetch network info");
                            InfoView::Unavailable(err.to_string())
                        }
                    };
                }
            }
        }

        draw(&state, &locations, &controller)?;
    }

    Ok(())
}

fn fetch_info(
    locations: &LocationContext,
    transport: &Arc<HttpTransport>,
    results: &mpsc::UnboundedSender<InfoResult>,
) {
    let Some(location) = locations.current().cloned() else {
        return;
    };
    let transport = Arc::clone(transport);
    let results = results.clone();
    tokio::spawn(async move {
        let result = transport.network_info(&location.url).await;
        let _ = results.send(InfoResult {
            location_id: location.id,
            result,
        });
    });
}

fn draw(
    state: &ConsoleState,
    locations: &LocationContext,
    controller: &ExecutionController<HttpTransport>,
) -> Result<()> {
    let (width, height) = terminal::size().unwrap_or((80, 24));
    let screen = Screen {
        state,
        location: locations.current(),
        phase: controller.phase(),
        output: controller.output(),
    };
    let text = render_screen(&screen, width, height);

    let mut stdout = io::stdout();
    queue!(stdout, MoveTo(0, 0), Clear(ClearType::All))?;
    stdout.write_all(text.as_bytes())?;
    stdout.flush()?;
    Ok(())
}

fn read_input(tx: mpsc::UnboundedSender<Input>) {
    loop {
        let input = match event::read() {
            Ok(Event::Key(key)) if key.kind == KeyEventKind::Press => Input::Key(key),
            Ok(Event::Resize(_, _)) => Input::Resize,
            Ok(_) => continue,
            Err(err) => {
                tracing::error!(error = %err, "terminal input failed");
                break;
            }
        };
        if tx.send(input).is_err() {
            break;
        }
    }
}
