use serde::Serialize;
use tokio::sync::mpsc;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum RunState {
    Idle,
    LoadingIdentifiers,
    FetchingManifests,
    ScanningLocal,
    Diffing,
    Reporting,
    Executing,
    Finished,
}

impl RunState {
    pub fn label(self) -> &'static str {
        match self {
            RunState::Idle => "idle",
            RunState::LoadingIdentifiers => "loading-identifiers",
            RunState::FetchingManifests => "fetching-manifests",
            RunState::ScanningLocal => "scanning-local",
            RunState::Diffing => "diffing",
            RunState::Reporting => "reporting",
            RunState::Executing => "executing",
            RunState::Finished => "finished",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Level {
    Info,
    Success,
    Warning,
    Error,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RunEvent {
    State(RunState),
    Log {
        stage: RunState,
        level: Level,
        message: String,
    },
    /// Percent of total work, 0..=100.
    Progress(u8),
}

/// Receives everything a run reports. Implementations must not block for long:
/// events are emitted from the run task itself.
pub trait EventSink: Send + Sync {
    fn emit(&self, event: RunEvent);
}

#[derive(Debug, Default, Clone, Copy)]
pub struct TracingSink;

impl EventSink for TracingSink {
    fn emit(&self, event: RunEvent) {
        match event {
            RunEvent::State(state) => tracing::debug!(stage = state.label(), "stage entered"),
            RunEvent::Log {
                stage,
                level,
                message,
            } => {
                let stage = stage.label();
                match level {
                    Level::Info | Level::Success => tracing::info!(stage, "{message}"),
                    Level::Warning => tracing::warn!(stage, "{message}"),
                    Level::Error => tracing::error!(stage, "{message}"),
                }
            }
            RunEvent::Progress(percent) => tracing::debug!(percent, "progress"),
        }
    }
}

/// Forwards events to a presentation layer over an unbounded channel.
#[derive(Debug, Clone)]
pub struct ChannelSink {
    tx: mpsc::UnboundedSender<RunEvent>,
}

impl ChannelSink {
    pub fn new() -> (Self, mpsc::UnboundedReceiver<RunEvent>) {
        let (tx, rx) = mpsc::unbounded_channel();
        (Self { tx }, rx)
    }
}

impl EventSink for ChannelSink {
    fn emit(&self, event: RunEvent) {
        let _ = self.tx.send(event);
    }
}
