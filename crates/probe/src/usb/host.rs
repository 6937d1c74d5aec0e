//! Host access layer boundary
//!
//! Everything the probe needs from the USB stack goes through [`UsbHost`],
//! so the lifecycle can run against libusb or a simulated host.

use descriptor::{ConfigurationDescriptor, DeviceDescriptor};
use std::fmt;

/// Bus position of a listed device
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct DeviceLocation {
    pub bus: u8,
    pub address: u8,
}

impl fmt::Display for DeviceLocation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Bus {:03} Device {:03}", self.bus, self.address)
    }
}

/// Narrow interface onto the USB host access layer
///
/// `Device` is an opaque reference from a device listing. `Handle` is an
/// opened device; it is consumed by [`UsbHost::close`].
pub trait UsbHost {
    type Device;
    type Handle;

    /// List every attached device, in host order
    fn list_devices(&self) -> rusb::Result<Vec<Self::Device>>;

    fn location(&self, device: &Self::Device) -> DeviceLocation;

    fn device_descriptor(&self, device: &Self::Device) -> rusb::Result<DeviceDescriptor>;

    fn active_config_descriptor(
        &self,
        device: &Self::Device,
    ) -> rusb::Result<ConfigurationDescriptor>;

    fn config_descriptor(
        &self,
        device: &Self::Device,
        index: u8,
    ) -> rusb::Result<ConfigurationDescriptor>;

    /// Open the first device with the given identifiers
    fn open_by_ids(&self, vendor_id: u16, product_id: u16) -> rusb::Result<Self::Handle>;

    fn kernel_driver_active(&self, handle: &Self::Handle, interface: u8) -> rusb::Result<bool>;

    fn detach_kernel_driver(&self, handle: &mut Self::Handle, interface: u8) -> rusb::Result<()>;

    fn attach_kernel_driver(&self, handle: &mut Self::Handle, interface: u8) -> rusb::Result<()>;

    fn claim_interface(&self, handle: &mut Self::Handle, interface: u8) -> rusb::Result<()>;

    fn release_interface(&self, handle: &mut Self::Handle, interface: u8) -> rusb::Result<()>;

    /// Close an opened device; never fails
    fn close(&self, handle: Self::Handle);
}
