//! USB subsystem
//!
//! Device enumeration, descriptor reading and the claim lifecycle.
//!
//! This module implements the USB side of the probe, handling:
//! - The host access boundary ([`UsbHost`]) and its libusb backend
//! - Device enumeration and first-match selection
//! - Descriptor tree reading for the matched device
//! - Kernel driver detach, interface claim and symmetric teardown
//!
//! All calls are blocking and run on the caller's thread.

pub mod claim;
pub mod enumerate;
pub mod error;
pub mod host;
pub mod reader;
pub mod rusb_host;
pub mod sim;

// Re-export public types
pub use claim::{
    ClaimPhase, ClaimSession, ClaimState, ClaimTarget, Step, TeardownAction, TeardownReport,
};
pub use enumerate::{DeviceSummary, enumerate, find_first_match, summarize};
pub use error::{AcquireError, ProbeError};
pub use host::{DeviceLocation, UsbHost};
pub use reader::{
    ConfigScope, read_active_configuration, read_configuration, read_device_descriptor,
    read_matching,
};
pub use rusb_host::RusbHost;
