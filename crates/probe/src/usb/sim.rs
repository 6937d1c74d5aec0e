//! Simulated host access layer
//!
//! A scriptable [`UsbHost`] that records every call made against it. Used by
//! the lifecycle tests to check the exact order of acquisition and teardown
//! steps, and by anything else that wants to exercise the probe without
//! hardware.
//!
//! # Example
//!
//! ```
//! use probe::usb::sim::{HostCall, SimDevice, SimulatedHost};
//! use probe::usb::UsbHost;
//! use common::test_utils::create_mock_device_descriptor;
//!
//! let host = SimulatedHost::new(vec![SimDevice::new(create_mock_device_descriptor(0x0483, 0x572b))]);
//! let handle = host.open_by_ids(0x0483, 0x572b).unwrap();
//! host.close(handle);
//! assert_eq!(host.count(|c| matches!(c, HostCall::Close { .. })), 1);
//! ```

use crate::usb::host::{DeviceLocation, UsbHost};
use descriptor::{ConfigurationDescriptor, DeviceDescriptor};
use std::cell::{Cell, RefCell};

/// One simulated device
#[derive(Debug, Clone)]
pub struct SimDevice {
    /// `None` makes every descriptor read fail with `rusb::Error::Io`
    pub descriptor: Option<DeviceDescriptor>,
    /// Configurations by index; the first is the active one
    pub configurations: Vec<ConfigurationDescriptor>,
    /// Interfaces currently bound to a kernel driver
    pub kernel_drivers: Vec<u8>,
}

impl SimDevice {
    pub fn new(descriptor: DeviceDescriptor) -> Self {
        Self {
            descriptor: Some(descriptor),
            configurations: Vec::new(),
            kernel_drivers: Vec::new(),
        }
    }

    /// A device whose descriptor cannot be read
    pub fn unreadable() -> Self {
        Self {
            descriptor: None,
            configurations: Vec::new(),
            kernel_drivers: Vec::new(),
        }
    }

    pub fn with_configuration(mut self, config: ConfigurationDescriptor) -> Self {
        self.configurations.push(config);
        self
    }

    pub fn with_kernel_driver(mut self, interface: u8) -> Self {
        self.kernel_drivers.push(interface);
        self
    }
}

/// Record of a call made against the simulated host
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HostCall {
    ListDevices,
    DeviceDescriptor { device: usize },
    ActiveConfig { device: usize },
    ConfigDescriptor { device: usize, index: u8 },
    Open { vendor_id: u16, product_id: u16 },
    KernelDriverActive { interface: u8 },
    DetachKernelDriver { interface: u8 },
    AttachKernelDriver { interface: u8 },
    ClaimInterface { interface: u8 },
    ReleaseInterface { interface: u8 },
    Close { device: usize },
}

/// Injected failures, one per host operation
#[derive(Debug, Clone, Copy, Default)]
pub struct Failures {
    pub list: Option<rusb::Error>,
    pub open: Option<rusb::Error>,
    pub driver_query: Option<rusb::Error>,
    pub detach: Option<rusb::Error>,
    pub attach: Option<rusb::Error>,
    pub claim: Option<rusb::Error>,
    pub release: Option<rusb::Error>,
}

/// Handle to an opened simulated device
#[derive(Debug)]
pub struct SimHandle {
    device: usize,
}

impl SimHandle {
    pub fn device(&self) -> usize {
        self.device
    }
}

/// Scriptable in-memory host
#[derive(Debug, Default)]
pub struct SimulatedHost {
    devices: RefCell<Vec<SimDevice>>,
    failures: Failures,
    calls: RefCell<Vec<HostCall>>,
    open_handles: Cell<usize>,
}

impl SimulatedHost {
    pub fn new(devices: Vec<SimDevice>) -> Self {
        Self {
            devices: RefCell::new(devices),
            ..Self::default()
        }
    }

    pub fn with_failures(mut self, failures: Failures) -> Self {
        self.failures = failures;
        self
    }

    /// Every call made so far, in order
    pub fn calls(&self) -> Vec<HostCall> {
        self.calls.borrow().clone()
    }

    /// Number of recorded calls satisfying `predicate`
    pub fn count(&self, predicate: impl Fn(&HostCall) -> bool) -> usize {
        self.calls.borrow().iter().filter(|c| predicate(c)).count()
    }

    /// Ownership-path calls: everything except listing and descriptor reads
    pub fn lifecycle_calls(&self) -> Vec<HostCall> {
        self.calls
            .borrow()
            .iter()
            .copied()
            .filter(|c| {
                !matches!(
                    c,
                    HostCall::ListDevices
                        | HostCall::DeviceDescriptor { .. }
                        | HostCall::ActiveConfig { .. }
                        | HostCall::ConfigDescriptor { .. }
                )
            })
            .collect()
    }

    /// Handles opened and not yet closed
    pub fn open_handles(&self) -> usize {
        self.open_handles.get()
    }

    /// Whether a kernel driver is currently bound to `interface` of `device`
    pub fn kernel_driver_bound(&self, device: usize, interface: u8) -> bool {
        self.devices
            .borrow()
            .get(device)
            .is_some_and(|d| d.kernel_drivers.contains(&interface))
    }

    fn record(&self, call: HostCall) {
        self.calls.borrow_mut().push(call);
    }

    fn with_device<T>(
        &self,
        device: usize,
        f: impl FnOnce(&SimDevice) -> rusb::Result<T>,
    ) -> rusb::Result<T> {
        let devices = self.devices.borrow();
        let sim = devices.get(device).ok_or(rusb::Error::NoDevice)?;
        f(sim)
    }

    fn fail_or(failure: Option<rusb::Error>) -> rusb::Result<()> {
        match failure {
            Some(err) => Err(err),
            None => Ok(()),
        }
    }
}

impl UsbHost for SimulatedHost {
    type Device = usize;
    type Handle = SimHandle;

    fn list_devices(&self) -> rusb::Result<Vec<usize>> {
        self.record(HostCall::ListDevices);
        Self::fail_or(self.failures.list)?;
        Ok((0..self.devices.borrow().len()).collect())
    }

    fn location(&self, device: &usize) -> DeviceLocation {
        DeviceLocation {
            bus: 1,
            address: u8::try_from(*device)
                .ok()
                .and_then(|index| index.checked_add(1))
                .unwrap_or(u8::MAX),
        }
    }

    fn device_descriptor(&self, device: &usize) -> rusb::Result<DeviceDescriptor> {
        self.record(HostCall::DeviceDescriptor { device: *device });
        self.with_device(*device, |sim| sim.descriptor.ok_or(rusb::Error::Io))
    }

    fn active_config_descriptor(&self, device: &usize) -> rusb::Result<ConfigurationDescriptor> {
        self.record(HostCall::ActiveConfig { device: *device });
        self.with_device(*device, |sim| {
            sim.configurations
                .first()
                .cloned()
                .ok_or(rusb::Error::NotFound)
        })
    }

    fn config_descriptor(
        &self,
        device: &usize,
        index: u8,
    ) -> rusb::Result<ConfigurationDescriptor> {
        self.record(HostCall::ConfigDescriptor {
            device: *device,
            index,
        });
        self.with_device(*device, |sim| {
            sim.configurations
                .get(usize::from(index))
                .cloned()
                .ok_or(rusb::Error::NotFound)
        })
    }

    fn open_by_ids(&self, vendor_id: u16, product_id: u16) -> rusb::Result<SimHandle> {
        self.record(HostCall::Open {
            vendor_id,
            product_id,
        });
        Self::fail_or(self.failures.open)?;

        let device = self
            .devices
            .borrow()
            .iter()
            .position(|sim| {
                sim.descriptor
                    .is_some_and(|d| d.vendor_id == vendor_id && d.product_id == product_id)
            })
            .ok_or(rusb::Error::NotFound)?;

        self.open_handles.set(self.open_handles.get() + 1);
        Ok(SimHandle { device })
    }

    fn kernel_driver_active(&self, handle: &SimHandle, interface: u8) -> rusb::Result<bool> {
        self.record(HostCall::KernelDriverActive { interface });
        Self::fail_or(self.failures.driver_query)?;
        Ok(self.kernel_driver_bound(handle.device, interface))
    }

    fn detach_kernel_driver(&self, handle: &mut SimHandle, interface: u8) -> rusb::Result<()> {
        self.record(HostCall::DetachKernelDriver { interface });
        Self::fail_or(self.failures.detach)?;

        let mut devices = self.devices.borrow_mut();
        let sim = devices.get_mut(handle.device).ok_or(rusb::Error::NoDevice)?;
        let before = sim.kernel_drivers.len();
        sim.kernel_drivers.retain(|&i| i != interface);
        if sim.kernel_drivers.len() == before {
            return Err(rusb::Error::NotFound);
        }
        Ok(())
    }

    fn attach_kernel_driver(&self, handle: &mut SimHandle, interface: u8) -> rusb::Result<()> {
        self.record(HostCall::AttachKernelDriver { interface });
        Self::fail_or(self.failures.attach)?;

        let mut devices = self.devices.borrow_mut();
        let sim = devices.get_mut(handle.device).ok_or(rusb::Error::NoDevice)?;
        if sim.kernel_drivers.contains(&interface) {
            return Err(rusb::Error::Busy);
        }
        sim.kernel_drivers.push(interface);
        Ok(())
    }

    fn claim_interface(&self, _handle: &mut SimHandle, interface: u8) -> rusb::Result<()> {
        self.record(HostCall::ClaimInterface { interface });
        Self::fail_or(self.failures.claim)
    }

    fn release_interface(&self, _handle: &mut SimHandle, interface: u8) -> rusb::Result<()> {
        self.record(HostCall::ReleaseInterface { interface });
        Self::fail_or(self.failures.release)
    }

    fn close(&self, handle: SimHandle) {
        self.record(HostCall::Close {
            device: handle.device,
        });
        self.open_handles
            .set(self.open_handles.get().saturating_sub(1));
    }
}
