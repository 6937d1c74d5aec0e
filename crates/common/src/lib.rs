//! Common utilities for usb-probe
//!
//! This crate provides functionality shared across the workspace: the
//! application error type, tracing setup, and descriptor builders for tests.

pub mod error;
pub mod logging;
pub mod test_utils;

pub use error::{Error, Result};
pub use logging::setup_logging;
