use std::fmt;
use std::sync::Arc;

use serde::{Deserialize, Serialize};
use tracing::{info, info_span, warn, Instrument};

use crate::config::Config;
use crate::error::ConfigError;
use crate::provider::registry::build_providers;
use crate::store::{SheetsStore, TabularStore};

use super::chain::ProviderChain;
use super::config::PipelineConfig;
use super::error::{PipelineError, PipelineWarning};
use super::header::{ensure_header, HeaderStatus};
use super::progress::{ProgressEvent, ProgressReporter};
use super::scanner::{BatchWindow, Row, RowScanner};
use super::writer::BatchWriter;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RunOutcome {
    /// Walked past the last usable row.
    Done,
    /// Stopped on an error the run cannot work around.
    Fatal,
}

impl fmt::Display for RunOutcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RunOutcome::Done => write!(f, "done"),
            RunOutcome::Fatal => write!(f, "fatal"),
        }
    }
}

#[derive(Debug)]
pub struct RunResult {
    pub run_id: String,
    pub outcome: RunOutcome,
    /// Rows whose records reached the store.
    pub rows_enriched: u64,
    pub windows_scanned: u64,
    /// Set when `outcome` is `Fatal`.
    pub error: Option<PipelineError>,
    pub warnings: Vec<PipelineWarning>,
    /// Last row of the last window read, if any window was read.
    pub final_row: Option<u32>,
}

impl RunResult {
    pub fn is_done(&self) -> bool {
        self.outcome == RunOutcome::Done
    }

    pub fn error_message(&self) -> Option<String> {
        self.error.as_ref().map(|e| e.to_string())
    }
}

enum State {
    Provisioning,
    Scanning,
    Resolving(Vec<Row>),
    Writing,
    Advancing,
    Terminated(Option<PipelineError>),
}

enum Scan {
    Candidates(Vec<Row>),
    Empty,
    Exhausted,
}

/// Cursor and counters for one run. Owned by the driver loop.
struct RunState {
    window: BatchWindow,
    empty_windows: u32,
    rows_enriched: u64,
    windows_scanned: u64,
    final_row: Option<u32>,
    warnings: Vec<PipelineWarning>,
    writer: BatchWriter,
}

pub struct Pipeline {
    config: Arc<PipelineConfig>,
    store: Arc<dyn TabularStore>,
    chain: ProviderChain,
    scanner: RowScanner,
}

impl Pipeline {
    /// Fails when the settings are inconsistent or the chain writes a
    /// different layout than the one configured.
    pub fn new(
        config: PipelineConfig,
        store: Arc<dyn TabularStore>,
        chain: ProviderChain,
    ) -> Result<Self, ConfigError> {
        config.validate()?;
        if chain.family() != config.family {
            return Err(ConfigError::InvalidChain {
                reason: format!(
                    "Providers return {} records but the sheet is laid out for {} records",
                    chain.family(),
                    config.family
                ),
            });
        }

        let scanner = RowScanner::new(
            config.sheet.clone(),
            config.key_column,
            config.output_start_column,
        );
        Ok(Self {
            config: Arc::new(config),
            store,
            chain,
            scanner,
        })
    }

    /// Builds the Sheets-backed store and the configured provider chain.
    pub fn from_config(config: &Config) -> Result<Self, ConfigError> {
        let pipeline_config = PipelineConfig::from_config(config)?;
        let store = SheetsStore::from_config(&config.sheet)?;
        let chain = ProviderChain::new(build_providers(config)?, pipeline_config.inter_call_delay)?;
        Self::new(pipeline_config, Arc::new(store), chain)
    }

    pub fn config(&self) -> &PipelineConfig {
        &self.config
    }

    pub fn chain(&self) -> &ProviderChain {
        &self.chain
    }

    /// Walks the sheet from the configured start row until the empty-window
    /// threshold is reached or a fatal error occurs.
    pub async fn run(&self, progress: &dyn ProgressReporter) -> RunResult {
        let run_id = uuid::Uuid::new_v4().to_string();
        let span = info_span!("pipeline", run_id = %run_id, sheet = %self.config.sheet);
        self.run_inner(run_id, progress).instrument(span).await
    }

    async fn run_inner(&self, run_id: String, progress: &dyn ProgressReporter) -> RunResult {
        progress.report(ProgressEvent::RunStarted {
            run_id: run_id.clone(),
            sheet: self.config.sheet.clone(),
            start_row: self.config.start_row,
            batch_size: self.config.batch_size,
        });

        let mut run = RunState {
            window: BatchWindow::new(self.config.start_row, self.config.batch_size),
            empty_windows: 0,
            rows_enriched: 0,
            windows_scanned: 0,
            final_row: None,
            warnings: Vec::new(),
            writer: BatchWriter::new(
                self.config.sheet.clone(),
                self.config.output_start_column,
                self.config.write_mode,
            ),
        };

        let mut state = State::Provisioning;
        let error = loop {
            state = match state {
                State::Provisioning => match self.step_provision(progress).await {
                    Ok(()) => State::Scanning,
                    Err(e) => State::Terminated(Some(e)),
                },
                State::Scanning => {
                    let window_span = info_span!("window", start_row = run.window.start_row);
                    match self.step_scan(&mut run, progress).instrument(window_span).await {
                        Ok(Scan::Candidates(rows)) => State::Resolving(rows),
                        Ok(Scan::Empty) => State::Scanning,
                        Ok(Scan::Exhausted) => State::Terminated(None),
                        Err(e) => State::Terminated(Some(e)),
                    }
                }
                State::Resolving(rows) => {
                    let window_span = info_span!("window", start_row = run.window.start_row);
                    self.step_resolve(&mut run, rows, progress)
                        .instrument(window_span)
                        .await;
                    State::Writing
                }
                State::Writing => {
                    self.step_write(&mut run, progress).await;
                    State::Advancing
                }
                State::Advancing => {
                    self.step_advance(&mut run, progress).await;
                    State::Scanning
                }
                State::Terminated(error) => break error,
            };
        };

        let outcome = if error.is_some() {
            RunOutcome::Fatal
        } else {
            RunOutcome::Done
        };
        progress.report(ProgressEvent::Finished {
            outcome,
            rows_enriched: run.rows_enriched,
            windows_scanned: run.windows_scanned,
            error: error.as_ref().map(|e| e.to_string()),
        });
        info!(
            outcome = %outcome,
            rows_enriched = run.rows_enriched,
            windows_scanned = run.windows_scanned,
            "run finished"
        );

        RunResult {
            run_id,
            outcome,
            rows_enriched: run.rows_enriched,
            windows_scanned: run.windows_scanned,
            error,
            warnings: run.warnings,
            final_row: run.final_row,
        }
    }

    async fn step_provision(&self, progress: &dyn ProgressReporter) -> Result<(), PipelineError> {
        let schema = self.config.header_schema();
        let status = ensure_header(self.store.as_ref(), &self.config.sheet, &schema)
            .await
            .map_err(PipelineError::Provisioning)?;
        progress.report(ProgressEvent::HeaderChecked {
            installed: status == HeaderStatus::Installed,
        });
        Ok(())
    }

    async fn step_scan(
        &self,
        run: &mut RunState,
        progress: &dyn ProgressReporter,
    ) -> Result<Scan, PipelineError> {
        let window = run.window;
        let rows = self
            .scanner
            .fetch_candidates(self.store.as_ref(), &window)
            .await
            .map_err(|source| PipelineError::StoreRead {
                start_row: window.start_row,
                source,
            })?;
        run.windows_scanned += 1;
        run.final_row = Some(window.end_row());

        if !rows.is_empty() {
            run.empty_windows = 0;
            progress.report(ProgressEvent::WindowScanned {
                start_row: window.start_row,
                end_row: window.end_row(),
                candidates: rows.len(),
            });
            return Ok(Scan::Candidates(rows));
        }

        run.empty_windows += 1;
        progress.report(ProgressEvent::EmptyWindow {
            start_row: window.start_row,
            end_row: window.end_row(),
            consecutive: run.empty_windows,
            threshold: self.config.empty_window_threshold,
        });
        if run.empty_windows >= self.config.empty_window_threshold {
            return Ok(Scan::Exhausted);
        }
        // No lookups happened, so there is nothing to pace.
        run.window = window.next();
        Ok(Scan::Empty)
    }

    async fn step_resolve(
        &self,
        run: &mut RunState,
        rows: Vec<Row>,
        progress: &dyn ProgressReporter,
    ) {
        for row in &rows {
            if let Some(resolution) = self.chain.resolve(row, progress).await {
                run.writer.add(row, &resolution.record);
            }
        }
    }

    async fn step_write(&self, run: &mut RunState, progress: &dyn ProgressReporter) {
        let start_row = run.window.start_row;
        let rows = run.writer.staged_rows();

        match run.writer.flush(self.store.as_ref()).await {
            Ok(Some(summary)) => {
                run.rows_enriched += summary.rows.len() as u64;
                progress.report(ProgressEvent::BatchWritten {
                    start_row,
                    rows: summary.rows.len(),
                    cells_updated: summary.cells_updated,
                });
            }
            Ok(None) => {}
            Err(e) => {
                warn!(start_row, error = %e, "batch write failed");
                progress.report(ProgressEvent::BatchWriteFailed {
                    start_row,
                    rows: rows.len(),
                    error: e.to_string(),
                });
                run.warnings.push(PipelineWarning::BatchWriteFailed {
                    start_row,
                    rows,
                    error: e.to_string(),
                });
            }
        }
    }

    async fn step_advance(&self, run: &mut RunState, progress: &dyn ProgressReporter) {
        run.window = run.window.next();
        let delay = self.config.inter_window_delay;
        if !delay.is_zero() {
            progress.report(ProgressEvent::Waiting {
                duration_ms: delay.as_millis() as u64,
            });
            tokio::time::sleep(delay).await;
        }
    }
}
