//! Shared utilities for kbingest integration tests.
//!
//! This module provides:
//! - `TestHarness` with a mock backend server and an isolated record cache
//! - Builders for backend JSON payloads and file records

pub mod builders;
pub mod harness;

pub use builders::*;
pub use harness::TestHarness;
