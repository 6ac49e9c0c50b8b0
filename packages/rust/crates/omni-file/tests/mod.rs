//! Tests for omni-file crate.
//!
//! Integration tests for checked file operations.

pub mod test_csv;
pub mod test_failures;
