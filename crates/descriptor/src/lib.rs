//! Descriptor model for usb-probe
//!
//! This crate defines the read-only USB descriptor tree, the vendor/product
//! matcher used to select a target device, and the text/JSON presenter for
//! the tree.
//!
//! # Example
//!
//! ```
//! use descriptor::{DeviceDescriptor, DeviceFilter, render_device};
//!
//! let device = DeviceDescriptor {
//!     vendor_id: 0x0483,
//!     product_id: 0x572b,
//!     class: 0,
//!     num_configurations: 1,
//! };
//!
//! let filter: DeviceFilter = "0x0483:0x572b".parse().unwrap();
//! assert!(filter.matches(&device));
//! assert!(render_device(&device).contains("ProductID: 572b"));
//! ```

pub mod error;
pub mod matcher;
pub mod render;
pub mod types;

pub use error::{FilterParseError, Result};
pub use matcher::{DeviceFilter, matches, parse_hex_id};
pub use render::{
    hex_dump, render_configuration, render_device, render_endpoint, render_json, render_report,
};
pub use types::{
    AlternateSetting, ConfigurationDescriptor, DeviceDescriptor, DeviceReport, Direction,
    EndpointDescriptor, InterfaceGroup, SyncType, TransferType,
};
