//! Claim lifecycle
//!
//! Takes exclusive ownership of one interface of the target device:
//!
//! 1. open the device by vendor/product id
//! 2. detach the kernel driver from the interface, if one is bound
//! 3. claim the interface
//!
//! Each completed step pushes its compensating action onto [`ClaimState`].
//! Teardown pops that stack, so it undoes exactly the completed steps in
//! reverse order: release the interface, reattach the kernel driver, close
//! the device. Every compensating action is attempted even when an earlier
//! one fails.
//!
//! [`ClaimSession`] runs teardown when an acquisition step fails, when
//! [`ClaimSession::release`] is called, and when it is dropped. Teardown is
//! idempotent.

use crate::usb::error::{AcquireError, ProbeError};
use crate::usb::host::UsbHost;
use descriptor::DeviceFilter;
use std::fmt;
use tracing::{debug, info, warn};

/// Acquisition step that owes a compensating action once completed
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Step {
    /// Device opened; owes a close
    Opened,
    /// Kernel driver detached; owes a reattach
    KernelDriverDetached,
    /// Interface claimed; owes a release
    InterfaceClaimed,
}

impl fmt::Display for Step {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Step::Opened => f.write_str("close device"),
            Step::KernelDriverDetached => f.write_str("reattach kernel driver"),
            Step::InterfaceClaimed => f.write_str("release interface"),
        }
    }
}

/// Lifecycle phase of a [`ClaimSession`]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ClaimPhase {
    Idle,
    Opened,
    DriverChecked,
    InterfaceClaimed,
    Released,
}

/// Completed acquisition steps, in completion order
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ClaimState {
    completed: Vec<Step>,
}

impl ClaimState {
    fn record(&mut self, step: Step) {
        debug_assert!(!self.contains(step), "{:?} recorded twice", step);
        self.completed.push(step);
    }

    fn pop(&mut self) -> Option<Step> {
        self.completed.pop()
    }

    pub fn contains(&self, step: Step) -> bool {
        self.completed.contains(&step)
    }

    /// True only if a kernel driver was successfully detached
    pub fn had_kernel_driver(&self) -> bool {
        self.contains(Step::KernelDriverDetached)
    }

    pub fn is_empty(&self) -> bool {
        self.completed.is_empty()
    }

    pub fn steps(&self) -> &[Step] {
        &self.completed
    }
}

/// Outcome of one compensating action
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TeardownAction {
    pub step: Step,
    pub result: Result<(), rusb::Error>,
}

/// Compensating actions performed by one teardown, in execution order
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TeardownReport {
    pub actions: Vec<TeardownAction>,
}

impl TeardownReport {
    pub fn is_empty(&self) -> bool {
        self.actions.is_empty()
    }

    /// True when every compensating action succeeded
    pub fn is_clean(&self) -> bool {
        self.actions.iter().all(|a| a.result.is_ok())
    }

    pub fn steps(&self) -> Vec<Step> {
        self.actions.iter().map(|a| a.step).collect()
    }
}

/// Device and interface to take ownership of
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ClaimTarget {
    pub filter: DeviceFilter,
    pub interface: u8,
}

/// Scoped ownership of one claimed interface
///
/// Holds the device handle exclusively. Dropping the session tears down
/// whatever is still owed.
pub struct ClaimSession<'h, H: UsbHost> {
    host: &'h H,
    target: ClaimTarget,
    handle: Option<H::Handle>,
    state: ClaimState,
    phase: ClaimPhase,
}

impl<'h, H: UsbHost> ClaimSession<'h, H> {
    /// Run the acquisition sequence
    ///
    /// On failure, the steps already completed are torn down before
    /// returning; the report of that teardown is part of the error.
    pub fn acquire(host: &'h H, target: ClaimTarget) -> Result<Self, AcquireError> {
        let mut session = Self {
            host,
            target,
            handle: None,
            state: ClaimState::default(),
            phase: ClaimPhase::Idle,
        };

        match session.run_acquisition() {
            Ok(()) => Ok(session),
            Err(error) => {
                warn!("Acquisition of {} aborted: {}", target.filter, error);
                let teardown = session.release();
                Err(AcquireError { error, teardown })
            }
        }
    }

    fn run_acquisition(&mut self) -> Result<(), ProbeError> {
        let ClaimTarget { filter, interface } = self.target;

        // Idle -> Opened
        let handle = self
            .host
            .open_by_ids(filter.vendor_id, filter.product_id)
            .map_err(|source| ProbeError::Open { filter, source })?;
        let handle = self.handle.insert(handle);
        self.state.record(Step::Opened);
        self.phase = ClaimPhase::Opened;
        info!("Device {} opened", filter);

        // Opened -> DriverChecked
        match self.host.kernel_driver_active(handle, interface) {
            Ok(true) => {
                self.host
                    .detach_kernel_driver(handle, interface)
                    .map_err(|source| ProbeError::Detach { interface, source })?;
                self.state.record(Step::KernelDriverDetached);
                info!("Kernel driver detached from interface {}", interface);
            }
            Ok(false) => {
                debug!("No kernel driver active on interface {}", interface);
            }
            Err(rusb::Error::NotSupported) => {
                debug!(
                    "Kernel driver query unsupported for interface {}",
                    interface
                );
            }
            Err(source) => return Err(ProbeError::DriverQuery { interface, source }),
        }
        self.phase = ClaimPhase::DriverChecked;

        // DriverChecked -> InterfaceClaimed
        self.host
            .claim_interface(handle, interface)
            .map_err(|source| ProbeError::Claim { interface, source })?;
        self.state.record(Step::InterfaceClaimed);
        self.phase = ClaimPhase::InterfaceClaimed;
        info!("Claimed interface {} on {}", interface, filter);

        Ok(())
    }

    /// Undo every completed step, most recent first
    ///
    /// Calling this again after a teardown is a no-op returning an empty
    /// report.
    pub fn release(&mut self) -> TeardownReport {
        let mut report = TeardownReport::default();

        while let Some(step) = self.state.pop() {
            let result = self.compensate(step);
            match &result {
                Ok(()) => debug!("Teardown: {} done", step),
                Err(e) => warn!("Teardown: {} failed: {}", step, e),
            }
            report.actions.push(TeardownAction { step, result });
        }

        if !report.is_empty() {
            self.phase = ClaimPhase::Released;
        }
        report
    }

    fn compensate(&mut self, step: Step) -> Result<(), rusb::Error> {
        let interface = self.target.interface;
        match step {
            Step::InterfaceClaimed => {
                let handle = self.handle.as_mut().ok_or(rusb::Error::InvalidParam)?;
                self.host.release_interface(handle, interface)
            }
            Step::KernelDriverDetached => {
                let handle = self.handle.as_mut().ok_or(rusb::Error::InvalidParam)?;
                self.host.attach_kernel_driver(handle, interface)
            }
            Step::Opened => {
                let handle = self.handle.take().ok_or(rusb::Error::InvalidParam)?;
                self.host.close(handle);
                Ok(())
            }
        }
    }

    pub fn phase(&self) -> ClaimPhase {
        self.phase
    }

    pub fn state(&self) -> &ClaimState {
        &self.state
    }

    pub fn target(&self) -> ClaimTarget {
        self.target
    }

    pub fn is_claimed(&self) -> bool {
        self.phase == ClaimPhase::InterfaceClaimed
    }

    /// Opened device handle, if the session still owns one
    pub fn handle(&self) -> Option<&H::Handle> {
        self.handle.as_ref()
    }
}

impl<H: UsbHost> Drop for ClaimSession<'_, H> {
    fn drop(&mut self) {
        if !self.state.is_empty() {
            let report = self.release();
            debug!(
                "Claim session dropped, {} step(s) torn down",
                report.actions.len()
            );
        }
    }
}
