//! Single-command execution lifecycle.
//!
//! The controller owns the [`ExecutionState`] of the current run. Transport
//! work happens on a spawned task that only talks back through a channel of
//! [`RunEvent`]s tagged with the run id; the owner pulls them with
//! [`ExecutionController::next_event`] and feeds them to
//! [`ExecutionController::apply`], so all state changes happen on one
//! logical thread.

use crate::error::ConfigError;
use crate::registry::{resolve, Invocation};
use crate::transport::{StreamOutcome, Transport};
use lgview_model::{DiagnosticMethod, Location};
use std::sync::Arc;
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;

pub const CANCELLED_NOTE: &str = "\n\n--- Cancelled by user ---";
pub const ERROR_PREFIX: &str = "\n\nError: ";

pub type RunId = u64;

/// Identity plus cancellation handle of one run.
#[derive(Debug, Clone)]
pub struct RunToken {
    id: RunId,
    cancel: CancellationToken,
}

impl RunToken {
    fn new(id: RunId) -> Self {
        Self {
            id,
            cancel: CancellationToken::new(),
        }
    }

    pub fn id(&self) -> RunId {
        self.id
    }

    pub fn is_cancelled(&self) -> bool {
        self.cancel.is_cancelled()
    }
}

/// `Completed`, `Failed` and `Cancelled` are idle phases that remember how
/// the last run ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExecutionPhase {
    Idle,
    Running,
    Completed,
    Failed,
    Cancelled,
}

impl ExecutionPhase {
    pub fn is_running(self) -> bool {
        self == ExecutionPhase::Running
    }
}

#[derive(Debug, Clone)]
pub struct ExecutionState {
    method: DiagnosticMethod,
    target: String,
    location: Location,
    output: String,
    phase: ExecutionPhase,
    token: Option<RunToken>,
}

impl ExecutionState {
    pub fn method(&self) -> DiagnosticMethod {
        self.method
    }

    pub fn target(&self) -> &str {
        &self.target
    }

    /// Location copied when the run was dispatched.
    pub fn location(&self) -> &Location {
        &self.location
    }

    pub fn output(&self) -> &str {
        &self.output
    }

    pub fn phase(&self) -> ExecutionPhase {
        self.phase
    }

    pub fn token(&self) -> Option<&RunToken> {
        self.token.as_ref()
    }

    fn holds(&self, run: RunId) -> bool {
        matches!(&self.token, Some(token) if token.id == run && !token.is_cancelled())
    }

    fn finish(&mut self, phase: ExecutionPhase) {
        self.phase = phase;
        self.token = None;
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RunEventKind {
    Chunk(String),
    Finished(StreamOutcome),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RunEvent {
    pub run: RunId,
    pub kind: RunEventKind,
}

impl RunEvent {
    pub fn chunk(run: RunId, text: impl Into<String>) -> Self {
        Self {
            run,
            kind: RunEventKind::Chunk(text.into()),
        }
    }

    pub fn finished(run: RunId, outcome: StreamOutcome) -> Self {
        Self {
            run,
            kind: RunEventKind::Finished(outcome),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StartOutcome {
    Started(RunId),
    /// A run was already in flight; it was cancelled and nothing new started.
    CancelledRunning(RunId),
}

pub struct ExecutionController<T: ?Sized> {
    transport: Arc<T>,
    state: Option<ExecutionState>,
    last_run: RunId,
    events_tx: mpsc::UnboundedSender<RunEvent>,
    events_rx: mpsc::UnboundedReceiver<RunEvent>,
}

impl<T> ExecutionController<T>
where
    T: Transport + ?Sized + 'static,
{
    pub fn new(transport: Arc<T>) -> Self {
        let (events_tx, events_rx) = mpsc::unbounded_channel();
        Self {
            transport,
            state: None,
            last_run: 0,
            events_tx,
            events_rx,
        }
    }

    /// Execute/cancel toggle.
    ///
    /// While a run is in flight this cancels it and starts nothing. Otherwise
    /// it clears the previous output and dispatches `method` against a copy
    /// of `location`; a missing location fails before any request is made
    /// and leaves the previous run untouched.
    ///
    /// Must be called from within a tokio runtime.
    pub fn start(
        &mut self,
        method: DiagnosticMethod,
        target: &str,
        location: Option<&Location>,
    ) -> Result<StartOutcome, ConfigError> {
        if let Some(run) = self.running_id() {
            self.cancel();
            return Ok(StartOutcome::CancelledRunning(run));
        }

        let location = location.ok_or(ConfigError::NoLocation)?.clone();

        self.last_run += 1;
        let token = RunToken::new(self.last_run);
        let invocation = resolve(method).bind(&location.url, target);
        tracing::info!(
            run = token.id,
            %method,
            url = %invocation.url,
            location = %location.id,
            "starting diagnostic run"
        );

        self.dispatch(token.id, invocation, token.cancel.clone());
        self.state = Some(ExecutionState {
            method,
            target: target.to_string(),
            location,
            output: String::new(),
            phase: ExecutionPhase::Running,
            token: Some(token.clone()),
        });

        Ok(StartOutcome::Started(token.id))
    }

    fn dispatch(&self, run: RunId, invocation: Invocation, cancel: CancellationToken) {
        let transport = Arc::clone(&self.transport);
        let events = self.events_tx.clone();

        tokio::spawn(async move {
            let chunks = events.clone();
            let outcome = invocation
                .run(transport.as_ref(), &cancel, |text| {
                    let _ = chunks.send(RunEvent::chunk(run, text));
                })
                .await;
            let _ = events.send(RunEvent::finished(run, outcome));
        });
    }

    /// Cancels the in-flight run. Returns `false` (and changes nothing) when
    /// no run is in flight, so repeated calls annotate the output once.
    pub fn cancel(&mut self) -> bool {
        let Some(state) = self.state.as_mut() else {
            return false;
        };
        if !state.phase.is_running() {
            return false;
        }

        if let Some(token) = &state.token {
            token.cancel.cancel();
            tracing::info!(run = token.id, "diagnostic run cancelled by user");
        }
        state.output.push_str(CANCELLED_NOTE);
        state.finish(ExecutionPhase::Cancelled);
        true
    }

    /// Waits for the next event from any run, current or stale.
    pub async fn next_event(&mut self) -> Option<RunEvent> {
        self.events_rx.recv().await
    }

    /// Applies one event. Returns the phase afterwards, or `None` if the
    /// event does not belong to the live run and was dropped.
    pub fn apply(&mut self, event: RunEvent) -> Option<ExecutionPhase> {
        let state = self.state.as_mut()?;
        if !state.holds(event.run) {
            tracing::debug!(run = event.run, "dropping event from stale run");
            return None;
        }

        match event.kind {
            RunEventKind::Chunk(text) => state.output.push_str(&text),
            RunEventKind::Finished(StreamOutcome::Completed) => {
                tracing::info!(run = event.run, bytes = state.output.len(), "diagnostic run completed");
                state.finish(ExecutionPhase::Completed);
            }
            RunEventKind::Finished(StreamOutcome::Failed(err)) => {
                tracing::warn!(run = event.run, error = %err, kind = ?err.kind(), "diagnostic run failed");
                state.output.push_str(ERROR_PREFIX);
                state.output.push_str(&err.to_string());
                state.finish(ExecutionPhase::Failed);
            }
            RunEventKind::Finished(StreamOutcome::Cancelled) => {
                state.output.push_str(CANCELLED_NOTE);
                state.finish(ExecutionPhase::Cancelled);
            }
        }

        Some(state.phase)
    }

    /// Waits for one event and applies it.
    pub async fn step(&mut self) -> Option<ExecutionPhase> {
        let event = self.next_event().await?;
        self.apply(event)
    }

    /// Drives events until the current run leaves `Running`.
    pub async fn wait_idle(&mut self) -> ExecutionPhase {
        while self.is_running() {
            let Some(event) = self.next_event().await else {
                break;
            };
            self.apply(event);
        }
        self.phase()
    }

    pub fn state(&self) -> Option<&ExecutionState> {
        self.state.as_ref()
    }

    pub fn output(&self) -> &str {
        self.state.as_ref().map(|state| state.output()).unwrap_or("")
    }

    pub fn phase(&self) -> ExecutionPhase {
        self.state
            .as_ref()
            .map(|state| state.phase)
            .unwrap_or(ExecutionPhase::Idle)
    }

    pub fn is_running(&self) -> bool {
        self.phase().is_running()
    }

    fn running_id(&self) -> Option<RunId> {
        self.state
            .as_ref()
            .filter(|state| state.phase.is_running())
            .and_then(|state| state.token.as_ref())
            .map(RunToken::id)
    }
}

impl<T: ?Sized> Drop for ExecutionController<T> {
    fn drop(&mut self) {
        if let Some(token) = self.state.as_ref().and_then(|state| state.token.as_ref()) {
            token.cancel.cancel();
        }
    }
}
