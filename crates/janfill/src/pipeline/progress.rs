use std::fmt;
use std::sync::{Arc, Mutex};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tokio::sync::broadcast;

use super::runner::RunOutcome;

/// Why a provider did not produce a usable record for a key.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum MissReason {
    NotFound,
    TransportError { error: String },
    IdentityMismatch { returned: Option<String> },
}

impl fmt::Display for MissReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            MissReason::NotFound => write!(f, "not found"),
            MissReason::TransportError { error } => write!(f, "error: {}", error),
            MissReason::IdentityMismatch { returned: Some(code) } => {
                write!(f, "returned code {} does not match", code)
            }
            MissReason::IdentityMismatch { returned: None } => {
                write!(f, "no code returned to verify")
            }
        }
    }
}

/// Events emitted while a run walks the sheet. One per window, per
/// candidate attempt and per outcome.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "event", rename_all = "snake_case")]
pub enum ProgressEvent {
    RunStarted {
        run_id: String,
        sheet: String,
        start_row: u32,
        batch_size: u32,
    },
    HeaderChecked {
        installed: bool,
    },
    WindowScanned {
        start_row: u32,
        end_row: u32,
        candidates: usize,
    },
    EmptyWindow {
        start_row: u32,
        end_row: u32,
        consecutive: u32,
        threshold: u32,
    },
    ProviderAttempt {
        row: u32,
        key: String,
        provider: String,
    },
    ProviderMiss {
        row: u32,
        key: String,
        provider: String,
        reason: MissReason,
    },
    KeyResolved {
        row: u32,
        key: String,
        provider: String,
        name: String,
    },
    KeyUnresolved {
        row: u32,
        key: String,
    },
    BatchWritten {
        start_row: u32,
        rows: usize,
        cells_updated: u64,
    },
    BatchWriteFailed {
        start_row: u32,
        rows: usize,
        error: String,
    },
    Waiting {
        duration_ms: u64,
    },
    Finished {
        outcome: RunOutcome,
        rows_enriched: u64,
        windows_scanned: u64,
        error: Option<String>,
    },
}

impl fmt::Display for ProgressEvent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ProgressEvent::RunStarted {
                run_id,
                sheet,
                start_row,
                batch_size,
            } => write!(
                f,
                "Run {} started on '{}' at row {} ({} rows per window)",
                run_id, sheet, start_row, batch_size
            ),
            ProgressEvent::HeaderChecked { installed: true } => {
                write!(f, "Header row written")
            }
            ProgressEvent::HeaderChecked { installed: false } => {
                write!(f, "Header row already in place")
            }
            ProgressEvent::WindowScanned {
                start_row,
                end_row,
                candidates,
            } => write!(
                f,
                "Rows {}-{}: {} to enrich",
                start_row, end_row, candidates
            ),
            ProgressEvent::EmptyWindow {
                start_row,
                end_row,
                consecutive,
                threshold,
            } => write!(
                f,
                "Rows {}-{}: nothing to enrich ({}/{})",
                start_row, end_row, consecutive, threshold
            ),
            ProgressEvent::ProviderAttempt { row, key, provider } => {
                write!(f, "Row {}: looking up {} via {}", row, key, provider)
            }
            ProgressEvent::ProviderMiss {
                row,
                key,
                provider,
                reason,
            } => write!(f, "Row {}: {} via {}: {}", row, key, provider, reason),
            ProgressEvent::KeyResolved {
                row,
                key,
                provider,
                name,
            } => write!(f, "Row {}: {} found via {}: {}", row, key, provider, name),
            ProgressEvent::KeyUnresolved { row, key } => {
                write!(f, "Row {}: {} not found by any provider", row, key)
            }
            ProgressEvent::BatchWritten {
                start_row,
                rows,
                cells_updated,
            } => write!(
                f,
                "Wrote {} rows from window at row {} ({} cells)",
                rows, start_row, cells_updated
            ),
            ProgressEvent::BatchWriteFailed {
                start_row,
                rows,
                error,
            } => write!(
                f,
                "Failed to write {} rows from window at row {}: {}",
                rows, start_row, error
            ),
            ProgressEvent::Waiting { duration_ms } => {
                write!(f, "Waiting {:.1}s before next window", *duration_ms as f64 / 1000.0)
            }
            ProgressEvent::Finished {
                outcome,
                rows_enriched,
                windows_scanned,
                error,
            } => {
                write!(
                    f,
                    "Run {}: {} rows enriched across {} windows",
                    outcome, rows_enriched, windows_scanned
                )?;
                if let Some(error) = error {
                    write!(f, " ({})", error)?;
                }
                Ok(())
            }
        }
    }
}

pub trait ProgressReporter: Send + Sync {
    fn report(&self, event: ProgressEvent);
}

/// No-op reporter.
pub struct NoopProgress;

impl ProgressReporter for NoopProgress {
    fn report(&self, _event: ProgressEvent) {}
}

/// Emits every event as a log line.
pub struct LogProgress;

impl ProgressReporter for LogProgress {
    fn report(&self, event: ProgressEvent) {
        match &event {
            ProgressEvent::ProviderAttempt { .. } => tracing::debug!("{}", event),
            ProgressEvent::ProviderMiss {
                reason: MissReason::TransportError { .. },
                ..
            }
            | ProgressEvent::BatchWriteFailed { .. } => tracing::warn!("{}", event),
            ProgressEvent::Finished {
                outcome: RunOutcome::Fatal,
                ..
            } => tracing::error!("{}", event),
            _ => tracing::info!("{}", event),
        }
    }
}

/// Keeps every event in memory, in order.
#[derive(Default)]
pub struct RecordingProgress {
    events: Mutex<Vec<ProgressEvent>>,
}

impl RecordingProgress {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn events(&self) -> Vec<ProgressEvent> {
        self.events
            .lock()
            .map(|events| events.clone())
            .unwrap_or_default()
    }

    pub fn lines(&self) -> Vec<String> {
        self.events().iter().map(|e| e.to_string()).collect()
    }
}

impl ProgressReporter for RecordingProgress {
    fn report(&self, event: ProgressEvent) {
        if let Ok(mut events) = self.events.lock() {
            events.push(event);
        }
    }
}

/// Timestamped event as delivered to broadcast subscribers.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProgressMessage {
    pub timestamp: DateTime<Utc>,
    /// Human-readable rendering of `event`.
    pub message: String,
    pub event: ProgressEvent,
}

/// Forwards events to a broadcast channel for hosts that stream progress.
pub struct BroadcastProgress {
    sender: Arc<broadcast::Sender<ProgressMessage>>,
}

impl BroadcastProgress {
    pub fn new(sender: Arc<broadcast::Sender<ProgressMessage>>) -> Self {
        Self { sender }
    }

    /// Creates a channel of the given capacity and returns the reporter with
    /// a first subscriber.
    pub fn channel(capacity: usize) -> (Self, broadcast::Receiver<ProgressMessage>) {
        let (sender, receiver) = broadcast::channel(capacity);
        (Self::new(Arc::new(sender)), receiver)
    }

    pub fn subscribe(&self) -> broadcast::Receiver<ProgressMessage> {
        self.sender.subscribe()
    }
}

impl ProgressReporter for BroadcastProgress {
    fn report(&self, event: ProgressEvent) {
        let message = ProgressMessage {
            timestamp: Utc::now(),
            message: event.to_string(),
            event,
        };
        // No subscribers is not an error.
        let _ = self.sender.send(message);
    }
}
