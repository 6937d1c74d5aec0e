//! usb-probe library
//!
//! Finds the first USB device matching a vendor/product pair, reports its
//! descriptor tree and takes exclusive ownership of one of its interfaces,
//! restoring the kernel driver on every exit path.

pub mod app;
pub mod config;
pub mod usb;

pub use app::{RunOptions, RunOutcome, list_devices, run};
pub use config::{OutputFormat, ProbeConfig};
