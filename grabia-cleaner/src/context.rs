use std::sync::atomic::{AtomicU8, Ordering};
use std::sync::{Arc, Mutex};

use tokio_util::sync::{CancellationToken, WaitForCancellationFuture};

use crate::events::{EventSink, Level, RunEvent, RunState};

/// Per-run worker state handed to every stage: the cancellation flag, the
/// event sink, and the bookkeeping that keeps progress monotonic.
#[derive(Clone)]
pub struct RunContext {
    inner: Arc<Inner>,
}

struct Inner {
    cancel: CancellationToken,
    sink: Arc<dyn EventSink>,
    stage: Mutex<RunState>,
    progress: AtomicU8,
}

impl RunContext {
    pub fn new(sink: Arc<dyn EventSink>) -> Self {
        Self::with_cancel(sink, CancellationToken::new())
    }

    pub fn with_cancel(sink: Arc<dyn EventSink>, cancel: CancellationToken) -> Self {
        Self {
            inner: Arc::new(Inner {
                cancel,
                sink,
                stage: Mutex::new(RunState::Idle),
                progress: AtomicU8::new(0),
            }),
        }
    }

    pub fn cancel_token(&self) -> CancellationToken {
        self.inner.cancel.clone()
    }

    pub fn cancel(&self) {
        self.inner.cancel.cancel();
    }

    pub fn is_cancelled(&self) -> bool {
        self.inner.cancel.is_cancelled()
    }

    pub fn cancelled(&self) -> WaitForCancellationFuture<'_> {
        self.inner.cancel.cancelled()
    }

    pub fn stage(&self) -> RunState {
        *self
            .inner
            .stage
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    pub fn enter(&self, state: RunState) {
        *self
            .inner
            .stage
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner()) = state;
        self.inner.sink.emit(RunEvent::State(state));
    }

    /// Emits `percent` only when it moves progress forward.
    pub fn progress(&self, percent: u8) {
        let percent = percent.min(100);
        let previous = self.inner.progress.fetch_max(percent, Ordering::SeqCst);
        if percent > previous {
            self.inner.sink.emit(RunEvent::Progress(percent));
        }
    }

    pub fn log(&self, level: Level, message: impl Into<String>) {
        self.inner.sink.emit(RunEvent::Log {
            stage: self.stage(),
            level,
            message: message.into(),
        });
    }

    pub fn info(&self, message: impl Into<String>) {
        self.log(Level::Info, message);
    }

    pub fn success(&self, message: impl Into<String>) {
        self.log(Level::Success, message);
    }

    pub fn warn(&self, message: impl Into<String>) {
        self.log(Level::Warning, message);
    }

    pub fn error(&self, message: impl Into<String>) {
        self.log(Level::Error, message);
    }
}
