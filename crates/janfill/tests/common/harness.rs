//! Test harness for running the pipeline against an in-memory sheet.
//!
//! Delays default to zero so tests never wait on wall-clock pacing; tests
//! that check pacing set them explicitly and run on a paused clock.

#![allow(dead_code)]

use std::sync::Arc;
use std::time::Duration;

use janfill::pipeline::{
    Pipeline, PipelineConfig, ProgressEvent, ProviderChain, RecordingProgress, RunResult,
};
use janfill::provider::{LookupProvider, RecordFamily, RegisteredProvider};
use janfill::store::MemoryStore;

pub const SHEET: &str = "Sheet1";

pub struct TestHarness {
    pub store: Arc<MemoryStore>,
    pub config: PipelineConfig,
    pub progress: RecordingProgress,
    providers: Vec<RegisteredProvider>,
}

impl TestHarness {
    /// Empty sheet, market layout, keys in A, output from B, data from row 2.
    pub fn new() -> Self {
        Self::with_family(RecordFamily::Market)
    }

    pub fn with_family(family: RecordFamily) -> Self {
        let mut config = PipelineConfig::new(SHEET, family);
        config.inter_call_delay = Duration::ZERO;
        config.inter_window_delay = Duration::ZERO;

        Self {
            store: Arc::new(MemoryStore::new()),
            config,
            progress: RecordingProgress::new(),
            providers: Vec::new(),
        }
    }

    pub fn batch_size(mut self, size: u32) -> Self {
        self.config.batch_size = size;
        self
    }

    pub fn start_row(mut self, row: u32) -> Self {
        self.config.start_row = row;
        self
    }

    pub fn threshold(mut self, threshold: u32) -> Self {
        self.config.empty_window_threshold = threshold;
        self
    }

    pub fn delays(mut self, call: Duration, window: Duration) -> Self {
        self.config.inter_call_delay = call;
        self.config.inter_window_delay = window;
        self
    }

    pub fn provider(mut self, ordinal: u32, provider: impl LookupProvider + 'static) -> Self {
        self.providers
            .push(RegisteredProvider::new(ordinal, Arc::new(provider)));
        self
    }

    /// Puts a key in column A of `row`.
    pub fn key(self, row: u32, key: &str) -> Self {
        self.store.set_cell(SHEET, row, 1, key);
        self
    }

    /// Marks `row` as already enriched.
    pub fn done(self, row: u32) -> Self {
        self.store.set_cell(SHEET, row, 2, "already here");
        self
    }

    pub fn pipeline(&self) -> Pipeline {
        let chain = ProviderChain::new(self.providers.clone(), self.config.inter_call_delay)
            .expect("valid provider chain");
        Pipeline::new(self.config.clone(), self.store.clone(), chain).expect("valid pipeline")
    }

    pub async fn run(&self) -> RunResult {
        self.pipeline().run(&self.progress).await
    }

    /// Output cells of `row`, without trailing blanks.
    pub fn output(&self, row: u32) -> Vec<String> {
        self.store
            .row(SHEET, row)
            .into_iter()
            .skip(1)
            .collect()
    }

    pub fn events(&self) -> Vec<ProgressEvent> {
        self.progress.events()
    }

    /// Start rows of every window that was read, empty or not.
    pub fn scanned_windows(&self) -> Vec<u32> {
        self.events()
            .iter()
            .filter_map(|e| match e {
                ProgressEvent::WindowScanned { start_row, .. }
                | ProgressEvent::EmptyWindow { start_row, .. } => Some(*start_row),
                _ => None,
            })
            .collect()
    }
}

impl Default for TestHarness {
    fn default() -> Self {
        Self::new()
    }
}
