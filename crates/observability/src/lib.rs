//! Tracing/logging setup shared by binaries and tests.

pub mod tracing;

pub use crate::tracing::{LogFormat, ParseLogFormatError, init};
