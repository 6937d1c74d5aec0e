//! Descriptor tree reader
//!
//! Device descriptors are cheap to read and are used to filter candidates;
//! configuration trees are only read once a device has matched.

use crate::usb::error::ProbeError;
use crate::usb::host::UsbHost;
use descriptor::{ConfigurationDescriptor, DeviceDescriptor, DeviceFilter, DeviceReport};
use tracing::{debug, warn};

/// Which configurations to read for a matched device
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum ConfigScope {
    /// Only the active configuration
    #[default]
    Active,
    /// Every configuration the device descriptor announces
    All,
}

pub fn read_device_descriptor<H: UsbHost>(
    host: &H,
    device: &H::Device,
) -> Result<DeviceDescriptor, ProbeError> {
    host.device_descriptor(device)
        .map_err(ProbeError::DescriptorRead)
}

pub fn read_active_configuration<H: UsbHost>(
    host: &H,
    device: &H::Device,
) -> Result<ConfigurationDescriptor, ProbeError> {
    host.active_config_descriptor(device)
        .map_err(ProbeError::ConfigurationRead)
}

pub fn read_configuration<H: UsbHost>(
    host: &H,
    device: &H::Device,
    index: u8,
) -> Result<ConfigurationDescriptor, ProbeError> {
    host.config_descriptor(device, index)
        .map_err(ProbeError::ConfigurationRead)
}

/// Read the descriptor tree of `device` if it matches `filter`
///
/// Returns `Ok(None)` without touching the configuration when the device
/// descriptor does not match.
pub fn read_matching<H: UsbHost>(
    host: &H,
    device: &H::Device,
    filter: &DeviceFilter,
    scope: ConfigScope,
) -> Result<Option<DeviceReport>, ProbeError> {
    let descriptor = read_device_descriptor(host, device)?;
    if !filter.matches(&descriptor) {
        return Ok(None);
    }

    let configurations = match scope {
        ConfigScope::Active => vec![read_active_configuration(host, device)?],
        ConfigScope::All => read_all_configurations(host, device, &descriptor)?,
    };

    debug!(
        "Read {} configuration(s) from {}",
        configurations.len(),
        filter
    );

    Ok(Some(DeviceReport {
        device: descriptor,
        configurations,
    }))
}

fn read_all_configurations<H: UsbHost>(
    host: &H,
    device: &H::Device,
    descriptor: &DeviceDescriptor,
) -> Result<Vec<ConfigurationDescriptor>, ProbeError> {
    let mut configurations = Vec::with_capacity(usize::from(descriptor.num_configurations));
    for index in 0..descriptor.num_configurations {
        match read_configuration(host, device, index) {
            Ok(config) => configurations.push(config),
            Err(e) => warn!("Configuration {} unreadable: {}", index, e),
        }
    }

    if configurations.is_empty() {
        // Nothing readable by index; the active one is still worth a try
        configurations.push(read_active_configuration(host, device)?);
    }
    Ok(configurations)
}
