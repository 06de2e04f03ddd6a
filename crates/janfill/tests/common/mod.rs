//! Shared test utilities for janfill integration tests.
//!
//! This module provides:
//! - `TestHarness` wiring an in-memory sheet, a provider chain and a recorder
//! - Builders for configs, records and scripted providers

pub mod builders;
pub mod harness;

pub use builders::*;
pub use harness::TestHarness;
