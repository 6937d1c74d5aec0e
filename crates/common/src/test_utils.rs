//! Test utilities for usb-probe
//!
//! Provides descriptor builders shared by the unit and integration tests of
//! every crate in the workspace.
//!
//! # Example
//!
//! ```
//! use common::test_utils::{create_mock_device_descriptor, create_mock_hid_config};
//!
//! # fn main() {
//! let device = create_mock_device_descriptor(0x0483, 0x572b);
//! assert_eq!(device.vendor_id, 0x0483);
//!
//! let config = create_mock_hid_config();
//! assert_eq!(config.num_interfaces(), 1);
//! # }
//! ```

use descriptor::{
    AlternateSetting, ConfigurationDescriptor, DeviceDescriptor, Direction, EndpointDescriptor,
    InterfaceGroup, SyncType, TransferType,
};

/// Create a mock DeviceDescriptor for testing
///
/// # Arguments
/// * `vendor_id` - USB Vendor ID
/// * `product_id` - USB Product ID
pub fn create_mock_device_descriptor(vendor_id: u16, product_id: u16) -> DeviceDescriptor {
    create_mock_device_descriptor_with_class(vendor_id, product_id, 0x00)
}

/// Create a mock DeviceDescriptor with a specific USB class
pub fn create_mock_device_descriptor_with_class(
    vendor_id: u16,
    product_id: u16,
    class: u8,
) -> DeviceDescriptor {
    DeviceDescriptor {
        vendor_id,
        product_id,
        class,
        num_configurations: 1,
    }
}

/// Create a list of distinct mock device descriptors
///
/// None of the generated identifiers collide with `0x0483:0x572b`.
///
/// # Example
/// ```
/// use common::test_utils::create_mock_device_list;
///
/// let devices = create_mock_device_list(5);
/// assert_eq!(devices.len(), 5);
/// ```
pub fn create_mock_device_list(count: u16) -> Vec<DeviceDescriptor> {
    (1..=count)
        .map(|i| create_mock_device_descriptor(0x1000 + i, 0x2000 + i))
        .collect()
}

/// Create a mock non-isochronous endpoint
pub fn create_mock_endpoint(address: u8, transfer_type: TransferType) -> EndpointDescriptor {
    EndpointDescriptor {
        address,
        direction: Direction::from_address(address),
        transfer_type,
        sync_type: SyncType::None,
        max_packet_size: 64,
        interval: if transfer_type == TransferType::Interrupt {
            1
        } else {
            0
        },
        refresh: 0,
        synch_address: 0,
        extra: Vec::new(),
    }
}

/// Create a mock isochronous endpoint with the given sync type
pub fn create_mock_iso_endpoint(address: u8, sync_type: SyncType) -> EndpointDescriptor {
    EndpointDescriptor {
        address,
        direction: Direction::from_address(address),
        transfer_type: TransferType::Isochronous,
        sync_type,
        max_packet_size: 192,
        interval: 1,
        refresh: 0,
        synch_address: 0,
        extra: Vec::new(),
    }
}

/// Create a mock alternate setting holding the given endpoints
pub fn create_mock_alt_setting(
    interface_number: u8,
    setting_number: u8,
    class: u8,
    endpoints: Vec<EndpointDescriptor>,
) -> AlternateSetting {
    AlternateSetting {
        interface_number,
        setting_number,
        class,
        num_endpoints: endpoints.len() as u8,
        endpoints,
        extra: Vec::new(),
    }
}

/// Create a mock configuration from alternate settings
///
/// Settings are grouped by interface number, keeping first-seen order.
pub fn create_mock_config(settings: Vec<AlternateSetting>) -> ConfigurationDescriptor {
    let mut interfaces: Vec<InterfaceGroup> = Vec::new();
    for setting in settings {
        match interfaces
            .iter_mut()
            .find(|group| group.number == setting.interface_number)
        {
            Some(group) => group.alt_settings.push(setting),
            None => interfaces.push(InterfaceGroup {
                number: setting.interface_number,
                alt_settings: vec![setting],
            }),
        }
    }

    ConfigurationDescriptor {
        number: 1,
        max_power_ma: 100,
        interfaces,
    }
}

/// Create a mock HID configuration: one interface, interrupt IN/OUT pair
pub fn create_mock_hid_config() -> ConfigurationDescriptor {
    let mut setting = create_mock_alt_setting(
        0,
        0,
        0x03,
        vec![
            create_mock_endpoint(0x81, TransferType::Interrupt),
            create_mock_endpoint(0x01, TransferType::Interrupt),
        ],
    );
    // HID class descriptor
    setting.extra = vec![0x09, 0x21, 0x11, 0x01, 0x00, 0x01, 0x22, 0x22, 0x00];
    create_mock_config(vec![setting])
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_create_mock_device_list() {
        let devices = create_mock_device_list(10);

        assert_eq!(devices.len(), 10);
        assert!(
            devices
                .iter()
                .all(|d| !(d.vendor_id == 0x0483 && d.product_id == 0x572b))
        );
    }

    #[test]
    fn test_create_mock_config_groups_by_interface() {
        let config = create_mock_config(vec![
            create_mock_alt_setting(0, 0, 0x01, Vec::new()),
            create_mock_alt_setting(1, 0, 0x01, Vec::new()),
            create_mock_alt_setting(1, 1, 0x01, Vec::new()),
        ]);

        assert_eq!(config.num_interfaces(), 2);
        assert_eq!(config.interfaces[1].alt_settings.len(), 2);
        assert_eq!(config.interfaces[1].alt_settings[1].setting_number, 1);
    }

    #[test]
    fn test_create_mock_hid_config() {
        let config = create_mock_hid_config();
        let setting = &config.interfaces[0].alt_settings[0];

        assert_eq!(setting.class, 0x03);
        assert_eq!(setting.num_endpoints, 2);
        assert_eq!(setting.endpoints[0].direction, Direction::In);
        assert_eq!(setting.endpoints[1].direction, Direction::Out);
        assert_eq!(setting.extra[1], 0x21);
    }

    #[test]
    fn test_create_mock_endpoint_interval() {
        assert_eq!(
            create_mock_endpoint(0x81, TransferType::Interrupt).interval,
            1
        );
        assert_eq!(create_mock_endpoint(0x02, TransferType::Bulk).interval, 0);
    }
}
