//! Device enumeration
//!
//! Lists attached devices once and scans them in host order. A device whose
//! descriptor cannot be read is logged and skipped; it never aborts the scan.

use crate::usb::error::ProbeError;
use crate::usb::host::{DeviceLocation, UsbHost};
use crate::usb::reader::read_device_descriptor;
use descriptor::{DeviceDescriptor, matches};
use tracing::{debug, warn};

/// List all currently attached devices
///
/// An empty list is not an error.
pub fn enumerate<H: UsbHost>(host: &H) -> Result<Vec<H::Device>, ProbeError> {
    let devices = host.list_devices().map_err(ProbeError::Init)?;
    debug!("Enumerated {} devices", devices.len());
    Ok(devices)
}

/// Index of the first device whose identifiers match, in listing order
pub fn find_first_match<H: UsbHost>(
    host: &H,
    devices: &[H::Device],
    vendor_id: u16,
    product_id: u16,
) -> Option<usize> {
    devices
        .iter()
        .enumerate()
        .find_map(|(index, device)| match read_device_descriptor(host, device) {
            Ok(desc) if matches(&desc, vendor_id, product_id) => {
                debug!(
                    "Device {} matches {:04x}:{:04x}",
                    index, vendor_id, product_id
                );
                Some(index)
            }
            Ok(_) => None,
            Err(e) => {
                warn!("Skipping device {}: {}", index, e);
                None
            }
        })
}

/// One line of the device listing
#[derive(Debug, Clone)]
pub struct DeviceSummary {
    pub index: usize,
    pub location: DeviceLocation,
    pub descriptor: Result<DeviceDescriptor, rusb::Error>,
}

/// Location and descriptor of every listed device
pub fn summarize<H: UsbHost>(host: &H, devices: &[H::Device]) -> Vec<DeviceSummary> {
    devices
        .iter()
        .enumerate()
        .map(|(index, device)| DeviceSummary {
            index,
            location: host.location(device),
            descriptor: host.device_descriptor(device),
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::usb::sim::{Failures, SimDevice, SimulatedHost};
    use common::test_utils::{create_mock_device_descriptor, create_mock_device_list};

    fn host_with(descriptors: Vec<SimDevice>) -> SimulatedHost {
        SimulatedHost::new(descriptors)
    }

    fn plain(count: u16) -> Vec<SimDevice> {
        create_mock_device_list(count)
            .into_iter()
            .map(SimDevice::new)
            .collect()
    }

    #[test]
    fn test_empty_listing_is_not_an_error() {
        let host = host_with(Vec::new());
        let devices = enumerate(&host).unwrap();
        assert!(devices.is_empty());
        assert_eq!(find_first_match(&host, &devices, 0x0483, 0x572b), None);
    }

    #[test]
    fn test_listing_failure_is_init_error() {
        let host = host_with(Vec::new()).with_failures(Failures {
            list: Some(rusb::Error::Other),
            ..Failures::default()
        });
        assert!(matches!(
            enumerate(&host),
            Err(ProbeError::Init(rusb::Error::Other))
        ));
    }

    #[test]
    fn test_no_match() {
        let host = host_with(plain(4));
        let devices = enumerate(&host).unwrap();
        assert_eq!(find_first_match(&host, &devices, 0x0483, 0x572b), None);
    }

    #[test]
    fn test_single_match_at_index() {
        let mut sims = plain(4);
        sims[3] = SimDevice::new(create_mock_device_descriptor(0x0483, 0x572b));
        let host = host_with(sims);
        let devices = enumerate(&host).unwrap();
        assert_eq!(find_first_match(&host, &devices, 0x0483, 0x572b), Some(3));
    }

    #[test]
    fn test_first_match_wins() {
        let mut sims = plain(7);
        sims[2] = SimDevice::new(create_mock_device_descriptor(0x0483, 0x572b));
        sims[5] = SimDevice::new(create_mock_device_descriptor(0x0483, 0x572b));
        let host = host_with(sims);
        let devices = enumerate(&host).unwrap();
        assert_eq!(find_first_match(&host, &devices, 0x0483, 0x572b), Some(2));
    }

    #[test]
    fn test_unreadable_device_is_skipped() {
        let host = host_with(vec![
            SimDevice::unreadable(),
            SimDevice::new(create_mock_device_descriptor(0x0483, 0x572b)),
        ]);
        let devices = enumerate(&host).unwrap();
        assert_eq!(find_first_match(&host, &devices, 0x0483, 0x572b), Some(1));
    }

    #[test]
    fn test_summarize_keeps_read_errors() {
        let mut sims = plain(2);
        sims.insert(1, SimDevice::unreadable());
        let host = host_with(sims);
        let devices = enumerate(&host).unwrap();

        let summaries = summarize(&host, &devices);
        assert_eq!(summaries.len(), 3);
        assert!(summaries[0].descriptor.is_ok());
        assert_eq!(summaries[1].descriptor, Err(rusb::Error::Io));
        assert_eq!(summaries[2].index, 2);
    }
}
