//! libusb-backed host access layer
//!
//! Wraps a `rusb::Context` and converts libusb descriptors into the
//! `descriptor` crate's owned tree, so nothing borrowed from libusb outlives
//! the call that read it.

use crate::usb::host::{DeviceLocation, UsbHost};
use descriptor::{
    AlternateSetting, ConfigurationDescriptor, DeviceDescriptor, Direction, EndpointDescriptor,
    InterfaceGroup, SyncType, TransferType,
};
use rusb::{Context, Device, DeviceHandle, UsbContext};
use tracing::{debug, warn};

/// Host access layer over libusb
pub struct RusbHost {
    context: Context,
}

impl RusbHost {
    /// Initialize libusb
    ///
    /// Fails when the access layer cannot be initialized at all.
    pub fn new(log_level: rusb::LogLevel) -> rusb::Result<Self> {
        let mut context = Context::new()?;
        context.set_log_level(log_level);
        debug!("libusb context initialized");
        Ok(Self { context })
    }
}

impl UsbHost for RusbHost {
    type Device = Device<Context>;
    type Handle = DeviceHandle<Context>;

    fn list_devices(&self) -> rusb::Result<Vec<Self::Device>> {
        Ok(self.context.devices()?.iter().collect())
    }

    fn location(&self, device: &Self::Device) -> DeviceLocation {
        DeviceLocation {
            bus: device.bus_number(),
            address: device.address(),
        }
    }

    fn device_descriptor(&self, device: &Self::Device) -> rusb::Result<DeviceDescriptor> {
        let desc = device.device_descriptor()?;
        Ok(DeviceDescriptor {
            vendor_id: desc.vendor_id(),
            product_id: desc.product_id(),
            class: desc.class_code(),
            num_configurations: desc.num_configurations(),
        })
    }

    fn active_config_descriptor(
        &self,
        device: &Self::Device,
    ) -> rusb::Result<ConfigurationDescriptor> {
        let config = device.active_config_descriptor()?;
        Ok(convert_config(&config))
    }

    fn config_descriptor(
        &self,
        device: &Self::Device,
        index: u8,
    ) -> rusb::Result<ConfigurationDescriptor> {
        let config = device.config_descriptor(index)?;
        Ok(convert_config(&config))
    }

    fn open_by_ids(&self, vendor_id: u16, product_id: u16) -> rusb::Result<Self::Handle> {
        // Same search libusb_open_device_with_vid_pid does, but keeps the
        // real open error (Access vs NotFound) instead of a null handle.
        for device in self.context.devices()?.iter() {
            let desc = match device.device_descriptor() {
                Ok(desc) => desc,
                Err(e) => {
                    debug!(
                        "Skipping bus={} addr={} while opening: {}",
                        device.bus_number(),
                        device.address(),
                        e
                    );
                    continue;
                }
            };

            if desc.vendor_id() == vendor_id && desc.product_id() == product_id {
                return device.open().inspect_err(|e| {
                    warn!(
                        "Failed to open device {:04x}:{:04x}: {}",
                        vendor_id, product_id, e
                    );
                });
            }
        }

        Err(rusb::Error::NotFound)
    }

    fn kernel_driver_active(&self, handle: &Self::Handle, interface: u8) -> rusb::Result<bool> {
        handle.kernel_driver_active(interface)
    }

    fn detach_kernel_driver(&self, handle: &mut Self::Handle, interface: u8) -> rusb::Result<()> {
        handle.detach_kernel_driver(interface)
    }

    fn attach_kernel_driver(&self, handle: &mut Self::Handle, interface: u8) -> rusb::Result<()> {
        handle.attach_kernel_driver(interface)
    }

    fn claim_interface(&self, handle: &mut Self::Handle, interface: u8) -> rusb::Result<()> {
        handle.claim_interface(interface)
    }

    fn release_interface(&self, handle: &mut Self::Handle, interface: u8) -> rusb::Result<()> {
        handle.release_interface(interface)
    }

    fn close(&self, handle: Self::Handle) {
        // libusb_close runs in DeviceHandle's Drop
        drop(handle);
    }
}

/// libusb reports absent extra bytes as `None` for some descriptor kinds and
/// as an empty slice for others
trait ExtraBytes {
    fn to_extra_bytes(self) -> Vec<u8>;
}

impl ExtraBytes for &[u8] {
    fn to_extra_bytes(self) -> Vec<u8> {
        self.to_vec()
    }
}

impl ExtraBytes for Option<&[u8]> {
    fn to_extra_bytes(self) -> Vec<u8> {
        self.map(<[u8]>::to_vec).unwrap_or_default()
    }
}

fn convert_config(config: &rusb::ConfigDescriptor) -> ConfigurationDescriptor {
    ConfigurationDescriptor {
        number: config.number(),
        max_power_ma: config.max_power(),
        interfaces: config
            .interfaces()
            .map(|interface| InterfaceGroup {
                number: interface.number(),
                alt_settings: interface
                    .descriptors()
                    .map(|setting| convert_alt_setting(&setting))
                    .collect(),
            })
            .collect(),
    }
}

fn convert_alt_setting(setting: &rusb::InterfaceDescriptor<'_>) -> AlternateSetting {
    AlternateSetting {
        interface_number: setting.interface_number(),
        setting_number: setting.setting_number(),
        class: setting.class_code(),
        num_endpoints: setting.num_endpoints(),
        endpoints: setting
            .endpoint_descriptors()
            .map(|endpoint| convert_endpoint(&endpoint))
            .collect(),
        extra: setting.extra().to_extra_bytes(),
    }
}

fn convert_endpoint(endpoint: &rusb::EndpointDescriptor<'_>) -> EndpointDescriptor {
    EndpointDescriptor {
        address: endpoint.address(),
        direction: map_direction(endpoint.direction()),
        transfer_type: map_transfer_type(endpoint.transfer_type()),
        sync_type: map_sync_type(endpoint.sync_type()),
        max_packet_size: endpoint.max_packet_size(),
        interval: endpoint.interval(),
        refresh: endpoint.refresh(),
        synch_address: endpoint.synch_address(),
        extra: endpoint.extra().to_extra_bytes(),
    }
}

fn map_direction(direction: rusb::Direction) -> Direction {
    match direction {
        rusb::Direction::In => Direction::In,
        rusb::Direction::Out => Direction::Out,
    }
}

fn map_transfer_type(transfer_type: rusb::TransferType) -> TransferType {
    match transfer_type {
        rusb::TransferType::Control => TransferType::Control,
        rusb::TransferType::Isochronous => TransferType::Isochronous,
        rusb::TransferType::Bulk => TransferType::Bulk,
        rusb::TransferType::Interrupt => TransferType::Interrupt,
    }
}

fn map_sync_type(sync_type: rusb::SyncType) -> SyncType {
    match sync_type {
        rusb::SyncType::NoSync => SyncType::None,
        rusb::SyncType::Asynchronous => SyncType::Async,
        rusb::SyncType::Adaptive => SyncType::Adaptive,
        rusb::SyncType::Synchronous => SyncType::Sync,
    }
}
