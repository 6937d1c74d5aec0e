//! Probe error taxonomy
//!
//! Scan errors are local to one candidate device and are swallowed by the
//! enumerator. Acquisition errors unwind the claim lifecycle through teardown
//! and are then reported.

use crate::usb::claim::TeardownReport;
use descriptor::DeviceFilter;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ProbeError {
    /// Host access layer unusable; fatal
    #[error("USB access layer unavailable: {0}")]
    Init(#[source] rusb::Error),

    /// No devices attached; not fatal
    #[error("Oops, no devices found")]
    EnumerationEmpty,

    /// Device descriptor of one candidate could not be read
    #[error("Failed to get device descriptor: {0}")]
    DescriptorRead(#[source] rusb::Error),

    /// Configuration descriptor could not be read
    #[error("No configuration descriptor found: {0}")]
    ConfigurationRead(#[source] rusb::Error),

    #[error("Cannot open device {filter}: {source}")]
    Open {
        filter: DeviceFilter,
        source: rusb::Error,
    },

    /// Kernel driver ownership of the interface is unknown
    #[error("Failed to query kernel driver on interface {interface}: {source}")]
    DriverQuery { interface: u8, source: rusb::Error },

    #[error("Failed to detach kernel driver from interface {interface}: {source}")]
    Detach { interface: u8, source: rusb::Error },

    #[error("Failed to claim interface {interface}: {source}")]
    Claim { interface: u8, source: rusb::Error },
}

/// A failed acquisition together with the teardown it triggered
#[derive(Debug, Error)]
#[error("{error} ({} step(s) rolled back)", .teardown.actions.len())]
pub struct AcquireError {
    pub error: ProbeError,
    pub teardown: TeardownReport,
}
