use std::fmt;
use std::sync::Arc;

use tracing::{error, info, warn};

/// Notification emitted while a solve runs.
#[derive(Debug, Clone, PartialEq)]
pub enum SolverEvent {
    Info(String),
    Warning(String),
    Error(String),
    /// Completion estimate, 0 to 100, never decreasing within one solve.
    Percentage(u8),
    CalculationDone,
    CalculationAborted,
    /// The sweep ceiling was reached; the partial field was still published.
    CalculationNonConvergent,
}

impl SolverEvent {
    /// Returns `true` for the events that end a solve.
    #[must_use]
    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            Self::CalculationDone | Self::CalculationAborted | Self::CalculationNonConvergent
        )
    }
}

/// Receiver of [`SolverEvent`]s.
///
/// Called from the solve thread; implementations must not block for long.
pub trait EventSink: Send + Sync {
    fn emit(&self, event: SolverEvent);
}

impl<F> EventSink for F
where
    F: Fn(SolverEvent) + Send + Sync,
{
    fn emit(&self, event: SolverEvent) {
        self(event);
    }
}

/// Sink that drops every event.
#[derive(Debug, Clone, Copy, Default)]
pub struct NullSink;

impl EventSink for NullSink {
    fn emit(&self, _event: SolverEvent) {}
}

/// How a solve ended.
#[derive(Debug, Clone, PartialEq)]
pub enum Outcome {
    Converged { iterations: u64 },
    Aborted { iterations: u64 },
    NonConvergent { iterations: u64, residual: f64 },
    Failed(String),
}

/// Logs every event through `tracing` before forwarding it to the sink.
#[derive(Clone)]
pub(crate) struct Emitter {
    sink: Arc<dyn EventSink>,
}

impl Emitter {
    pub(crate) fn new(sink: Arc<dyn EventSink>) -> Self {
        Self { sink }
    }

    pub(crate) fn info(&self, message: impl Into<String>) {
        let message = message.into();
        info!("{message}");
        self.sink.emit(SolverEvent::Info(message));
    }

    pub(crate) fn warning(&self, message: impl Into<String>) {
        let message = message.into();
        warn!("{message}");
        self.sink.emit(SolverEvent::Warning(message));
    }

    pub(crate) fn error(&self, message: impl Into<String>) {
        let message = message.into();
        error!("{message}");
        self.sink.emit(SolverEvent::Error(message));
    }

    pub(crate) fn emit(&self, event: SolverEvent) {
        self.sink.emit(event);
    }
}

impl fmt::Debug for Emitter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Emitter").finish_non_exhaustive()
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use std::sync::Mutex;

    #[test]
    fn closures_are_sinks() {
        let seen = Arc::new(Mutex::new(Vec::new()));
        let store = Arc::clone(&seen);
        let emitter = Emitter::new(Arc::new(move |e: SolverEvent| store.lock().unwrap().push(e)));

        emitter.info("lattice ready");
        emitter.warning("slow");
        emitter.emit(SolverEvent::Percentage(40));

        let seen = seen.lock().unwrap();
        assert_eq!(
            *seen,
            vec![
                SolverEvent::Info("lattice ready".into()),
                SolverEvent::Warning("slow".into()),
                SolverEvent::Percentage(40),
            ]
        );
    }

    #[test]
    fn terminal_events() {
        assert!(SolverEvent::CalculationDone.is_terminal());
        assert!(SolverEvent::CalculationAborted.is_terminal());
        assert!(SolverEvent::CalculationNonConvergent.is_terminal());
        assert!(!SolverEvent::Percentage(100).is_terminal());
    }
}
