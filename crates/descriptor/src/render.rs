//! Descriptor tree rendering
//!
//! Produces the human-readable dump of a device and its configuration tree,
//! plus a JSON form for tooling. Rendering never mutates the descriptors.
//!
//! Sync type, refresh and synch address are reserved fields for anything but
//! isochronous endpoints, so they are omitted rather than printed as noise.

use crate::types::{
    AlternateSetting, ConfigurationDescriptor, DeviceDescriptor, DeviceReport, EndpointDescriptor,
    InterfaceGroup,
};
use std::fmt;

/// Render the device descriptor summary line
pub fn render_device(device: &DeviceDescriptor) -> String {
    DeviceDisplay(device).to_string()
}

/// Render a configuration descriptor tree
pub fn render_configuration(config: &ConfigurationDescriptor) -> String {
    ConfigurationDisplay(config).to_string()
}

/// Render a single endpoint line
pub fn render_endpoint(endpoint: &EndpointDescriptor) -> String {
    EndpointDisplay(endpoint).to_string()
}

/// Render a device followed by each of its configurations
pub fn render_report(report: &DeviceReport) -> String {
    let mut out = render_device(&report.device);
    out.push('\n');
    for config in &report.configurations {
        out.push_str(&render_configuration(config));
    }
    out
}

/// Render a report as pretty-printed JSON
pub fn render_json(report: &DeviceReport) -> serde_json::Result<String> {
    serde_json::to_string_pretty(report)
}

/// Lowercase space-separated hex dump
pub fn hex_dump(bytes: &[u8]) -> String {
    bytes
        .iter()
        .map(|b| format!("{:02x}", b))
        .collect::<Vec<_>>()
        .join(" ")
}

/// `Display` adapter for a device descriptor
pub struct DeviceDisplay<'a>(pub &'a DeviceDescriptor);

impl fmt::Display for DeviceDisplay<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let device = self.0;
        write!(
            f,
            "Num configs: {}   Device Class: {}   VendorID: {:04x}   ProductID: {:04x}",
            device.num_configurations, device.class, device.vendor_id, device.product_id
        )
    }
}

/// `Display` adapter for a configuration tree
pub struct ConfigurationDisplay<'a>(pub &'a ConfigurationDescriptor);

impl fmt::Display for ConfigurationDisplay<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let config = self.0;
        writeln!(
            f,
            "Configuration {} | Max power: {}mA | Interfaces: {}",
            config.number,
            config.max_power_ma,
            config.num_interfaces()
        )?;
        for group in &config.interfaces {
            write_interface_group(f, group)?;
        }
        Ok(())
    }
}

fn write_interface_group(f: &mut fmt::Formatter<'_>, group: &InterfaceGroup) -> fmt::Result {
    writeln!(
        f,
        "  Interface {} | Alt settings: {}",
        group.number,
        group.alt_settings.len()
    )?;
    for setting in &group.alt_settings {
        write_alt_setting(f, setting)?;
    }
    Ok(())
}

fn write_alt_setting(f: &mut fmt::Formatter<'_>, setting: &AlternateSetting) -> fmt::Result {
    writeln!(
        f,
        "    Interface#: {} | Alt: {} | Class: {:#04x} | #Endpoints: {}",
        setting.interface_number, setting.setting_number, setting.class, setting.num_endpoints
    )?;
    if !setting.extra.is_empty() {
        writeln!(f, "      Extra: {}", hex_dump(&setting.extra))?;
    }
    for endpoint in &setting.endpoints {
        writeln!(f, "      {}", EndpointDisplay(endpoint))?;
        if !endpoint.extra.is_empty() {
            writeln!(f, "        Extra: {}", hex_dump(&endpoint.extra))?;
        }
    }
    Ok(())
}

/// `Display` adapter for one endpoint, without its extra bytes
pub struct EndpointDisplay<'a>(pub &'a EndpointDescriptor);

impl fmt::Display for EndpointDisplay<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let endpoint = self.0;
        write!(
            f,
            "Endpoint Addr: {:#04x} | Dir: {} | Type: {}",
            endpoint.address, endpoint.direction, endpoint.transfer_type
        )?;
        if let Some(sync) = endpoint.isochronous_sync() {
            write!(f, " | Sync: {}", sync)?;
        }
        write!(
            f,
            " | MaxPacket: {} | Interval: {}",
            endpoint.max_packet_size, endpoint.interval
        )?;
        if endpoint.isochronous_sync().is_some() {
            write!(
                f,
                " | Refresh: {} | SynchAddr: {:#04x}",
                endpoint.refresh, endpoint.synch_address
            )?;
        }
        Ok(())
    }
}
