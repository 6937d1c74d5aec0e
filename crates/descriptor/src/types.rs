//! USB descriptor type definitions
//!
//! This module defines the read-only descriptor tree reported by a device:
//! device descriptor, configuration, interface groups, alternate settings and
//! endpoints. Values are snapshots taken from the host access layer and are
//! never mutated after retrieval.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Bit 7 of `bEndpointAddress` selects the IN direction
pub const ENDPOINT_DIRECTION_MASK: u8 = 0x80;

/// Low nibble of `bEndpointAddress` is the endpoint number
pub const ENDPOINT_NUMBER_MASK: u8 = 0x0f;

/// Device descriptor snapshot
///
/// Only the fields needed to select a device and describe it are kept.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct DeviceDescriptor {
    /// USB Vendor ID (idVendor)
    pub vendor_id: u16,
    /// USB Product ID (idProduct)
    pub product_id: u16,
    /// USB device class (bDeviceClass)
    pub class: u8,
    /// Number of configurations (bNumConfigurations)
    pub num_configurations: u8,
}

/// Configuration descriptor with its full interface tree
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConfigurationDescriptor {
    /// Configuration value (bConfigurationValue)
    pub number: u8,
    /// Maximum power draw in milliamps
    pub max_power_ma: u16,
    /// Interfaces, in the order the device reports them
    pub interfaces: Vec<InterfaceGroup>,
}

impl ConfigurationDescriptor {
    /// Number of interfaces (bNumInterfaces)
    pub fn num_interfaces(&self) -> usize {
        self.interfaces.len()
    }

    /// Find the interface group with the given interface number
    pub fn interface(&self, number: u8) -> Option<&InterfaceGroup> {
        self.interfaces.iter().find(|group| group.number == number)
    }

    /// Iterate every endpoint of every alternate setting, in reported order
    pub fn endpoints(&self) -> impl Iterator<Item = &EndpointDescriptor> {
        self.interfaces
            .iter()
            .flat_map(|group| group.alt_settings.iter())
            .flat_map(|setting| setting.endpoints.iter())
    }
}

/// All alternate settings sharing one interface number
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct InterfaceGroup {
    /// Interface number shared by every alternate setting
    pub number: u8,
    /// Alternate settings, in the order the device reports them
    pub alt_settings: Vec<AlternateSetting>,
}

/// One alternate setting of an interface
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AlternateSetting {
    /// Interface number (bInterfaceNumber)
    pub interface_number: u8,
    /// Alternate setting number (bAlternateSetting)
    pub setting_number: u8,
    /// Interface class (bInterfaceClass)
    pub class: u8,
    /// Endpoint count as reported (bNumEndpoints)
    pub num_endpoints: u8,
    /// Endpoints, in the order the device reports them
    pub endpoints: Vec<EndpointDescriptor>,
    /// Class- or vendor-specific bytes following the interface descriptor
    #[serde(with = "serde_bytes")]
    pub extra: Vec<u8>,
}

/// Endpoint descriptor
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EndpointDescriptor {
    /// Endpoint address including the direction bit (bEndpointAddress)
    pub address: u8,
    /// Transfer direction
    pub direction: Direction,
    /// Transfer type (bmAttributes bits 0..1)
    pub transfer_type: TransferType,
    /// Synchronisation type (bmAttributes bits 2..3), isochronous only
    pub sync_type: SyncType,
    /// Maximum packet size (wMaxPacketSize)
    pub max_packet_size: u16,
    /// Polling interval (bInterval)
    pub interval: u8,
    /// Feedback refresh rate (bRefresh), isochronous audio only
    pub refresh: u8,
    /// Synchronisation endpoint address (bSynchAddress), isochronous audio only
    pub synch_address: u8,
    /// Class- or vendor-specific bytes following the endpoint descriptor
    #[serde(with = "serde_bytes")]
    pub extra: Vec<u8>,
}

impl EndpointDescriptor {
    /// Endpoint number without the direction bit
    pub fn number(&self) -> u8 {
        self.address & ENDPOINT_NUMBER_MASK
    }

    /// Synchronisation type, present only for isochronous endpoints
    ///
    /// The sync bits are reserved for every other transfer type.
    pub fn isochronous_sync(&self) -> Option<SyncType> {
        match self.transfer_type {
            TransferType::Isochronous => Some(self.sync_type),
            _ => None,
        }
    }
}

/// Endpoint transfer direction
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Direction {
    /// Device to host
    In,
    /// Host to device
    Out,
}

impl Direction {
    /// Derive the direction from an endpoint address
    pub fn from_address(address: u8) -> Self {
        if address & ENDPOINT_DIRECTION_MASK != 0 {
            Direction::In
        } else {
            Direction::Out
        }
    }
}

impl fmt::Display for Direction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Direction::In => f.write_str("IN"),
            Direction::Out => f.write_str("OUT"),
        }
    }
}

/// Endpoint transfer type
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum TransferType {
    Control,
    Isochronous,
    Bulk,
    Interrupt,
}

impl fmt::Display for TransferType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            TransferType::Control => "Control",
            TransferType::Isochronous => "Isochronous",
            TransferType::Bulk => "Bulk",
            TransferType::Interrupt => "Interrupt",
        };
        f.write_str(name)
    }
}

/// Isochronous endpoint synchronisation type
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum SyncType {
    None,
    Async,
    Adaptive,
    Sync,
}

impl fmt::Display for SyncType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            SyncType::None => "None",
            SyncType::Async => "Async",
            SyncType::Adaptive => "Adaptive",
            SyncType::Sync => "Sync",
        };
        f.write_str(name)
    }
}

/// A device descriptor together with the configurations read from it
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DeviceReport {
    pub device: DeviceDescriptor,
    pub configurations: Vec<ConfigurationDescriptor>,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn endpoint(address: u8, transfer_type: TransferType) -> EndpointDescriptor {
        EndpointDescriptor {
            address,
            direction: Direction::from_address(address),
            transfer_type,
            sync_type: SyncType::Adaptive,
            max_packet_size: 64,
            interval: 1,
            refresh: 0,
            synch_address: 0,
            extra: Vec::new(),
        }
    }

    #[test]
    fn test_direction_from_address() {
        assert_eq!(Direction::from_address(0x81), Direction::In);
        assert_eq!(Direction::from_address(0x01), Direction::Out);
        assert_eq!(Direction::from_address(0x00), Direction::Out);
    }

    #[test]
    fn test_endpoint_number_strips_direction() {
        assert_eq!(endpoint(0x83, TransferType::Bulk).number(), 3);
        assert_eq!(endpoint(0x0f, TransferType::Bulk).number(), 15);
    }

    #[test]
    fn test_sync_type_only_for_isochronous() {
        assert_eq!(endpoint(0x81, TransferType::Bulk).isochronous_sync(), None);
        assert_eq!(
            endpoint(0x81, TransferType::Interrupt).isochronous_sync(),
            None
        );
        assert_eq!(
            endpoint(0x81, TransferType::Isochronous).isochronous_sync(),
            Some(SyncType::Adaptive)
        );
    }

    #[test]
    fn test_configuration_endpoints_keep_order() {
        let config = ConfigurationDescriptor {
            number: 1,
            max_power_ma: 100,
            interfaces: vec![InterfaceGroup {
                number: 0,
                alt_settings: vec![AlternateSetting {
                    interface_number: 0,
                    setting_number: 0,
                    class: 0xff,
                    num_endpoints: 3,
                    endpoints: vec![
                        endpoint(0x81, TransferType::Bulk),
                        endpoint(0x01, TransferType::Bulk),
                        endpoint(0x81, TransferType::Bulk),
                    ],
                    extra: Vec::new(),
                }],
            }],
        };

        let addresses: Vec<u8> = config.endpoints().map(|ep| ep.address).collect();
        assert_eq!(addresses, vec![0x81, 0x01, 0x81]);
        assert!(config.interface(0).is_some());
        assert!(config.interface(1).is_none());
    }

    #[test]
    fn test_display_names() {
        assert_eq!(TransferType::Isochronous.to_string(), "Isochronous");
        assert_eq!(SyncType::Async.to_string(), "Async");
        assert_eq!(Direction::In.to_string(), "IN");
    }
}
