//! Probe run sequence
//!
//! Scan, report and claim, generic over the host access layer so the same
//! sequence runs against libusb and the simulated host.

use crate::config::OutputFormat;
use crate::usb::{
    ClaimSession, ClaimTarget, ConfigScope, ProbeError, TeardownReport, UsbHost, enumerate,
    find_first_match, read_matching, summarize,
};
use anyhow::{Context, Result};
use descriptor::{DeviceFilter, DeviceReport, render_json, render_report};
use std::io::Write;
use tracing::{error, info, warn};

/// Options for one probe run
#[derive(Debug, Clone, Copy)]
pub struct RunOptions {
    pub filter: DeviceFilter,
    pub interface: u8,
    pub format: OutputFormat,
    pub scope: ConfigScope,
    /// Run the claim lifecycle after reporting
    pub claim: bool,
}

/// What a run observed
#[derive(Debug, Default)]
pub struct RunOutcome {
    pub device_count: usize,
    pub matched_index: Option<usize>,
    pub report: Option<DeviceReport>,
    /// Teardown performed after a successful claim
    pub teardown: Option<TeardownReport>,
}

/// Scan for the target, print its descriptor tree, then claim and release it
///
/// `while_claimed` runs while the interface is held; the claim is released
/// afterwards whether it succeeds or not.
pub fn run<H, W, F>(
    host: &H,
    options: &RunOptions,
    out: &mut W,
    while_claimed: F,
) -> Result<RunOutcome>
where
    H: UsbHost,
    W: Write,
    F: FnOnce(&ClaimSession<'_, H>) -> Result<()>,
{
    let mut outcome = RunOutcome::default();

    let devices = enumerate(host).context("Failed to list USB devices")?;
    outcome.device_count = devices.len();
    if devices.is_empty() {
        warn!("{}", ProbeError::EnumerationEmpty);
        if options.format == OutputFormat::Text {
            writeln!(out, "{}", ProbeError::EnumerationEmpty)?;
        }
        return Ok(outcome);
    }

    info!("There are {} devices", devices.len());
    if options.format == OutputFormat::Text {
        writeln!(out, "There are {} devices.", devices.len())?;
    }

    let filter = options.filter;
    outcome.matched_index = find_first_match(host, &devices, filter.vendor_id, filter.product_id);

    match outcome.matched_index {
        Some(index) => match read_matching(host, &devices[index], &filter, options.scope) {
            Ok(Some(report)) => {
                write_report(out, &report, options.format)?;
                outcome.report = Some(report);
            }
            Ok(None) => warn!("Device {} no longer matches {}", index, filter),
            Err(e) => warn!("Cannot report device {}: {}", index, e),
        },
        None => {
            info!("No device matching {}", filter);
            if options.format == OutputFormat::Text {
                writeln!(out, "No device matching {}", filter)?;
            }
        }
    }

    if !options.claim {
        return Ok(outcome);
    }

    let target = ClaimTarget {
        filter,
        interface: options.interface,
    };
    let mut session = ClaimSession::acquire(host, target).map_err(|e| {
        error!("{}", e);
        for action in &e.teardown.actions {
            if let Err(err) = &action.result {
                error!("Rollback step '{}' failed: {}", action.step, err);
            }
        }
        e
    })?;

    if options.format == OutputFormat::Text {
        writeln!(
            out,
            "Interface {} of {} claimed{}",
            options.interface,
            filter,
            if session.state().had_kernel_driver() {
                " (kernel driver detached)"
            } else {
                ""
            }
        )?;
    }

    // Early return drops the session, which still tears down
    while_claimed(&session)?;

    let teardown = session.release();
    if teardown.is_clean() {
        info!(
            "Released {} ({} step(s) undone)",
            filter,
            teardown.actions.len()
        );
    } else {
        warn!("Released {} with failed teardown steps", filter);
    }
    outcome.teardown = Some(teardown);

    Ok(outcome)
}

fn write_report<W: Write>(
    out: &mut W,
    report: &DeviceReport,
    format: OutputFormat,
) -> Result<()> {
    match format {
        OutputFormat::Text => write!(out, "{}", render_report(report))?,
        OutputFormat::Json => {
            let json = render_json(report).context("Failed to serialize descriptor report")?;
            writeln!(out, "{}", json)?;
        }
    }
    Ok(())
}

/// Print every attached device, one line each
pub fn list_devices<H: UsbHost, W: Write>(host: &H, out: &mut W) -> Result<usize> {
    let devices = enumerate(host).context("Failed to list USB devices")?;

    if devices.is_empty() {
        writeln!(out, "No USB devices found.")?;
        return Ok(0);
    }

    writeln!(out, "Found {} USB device(s):\n", devices.len())?;
    for summary in summarize(host, &devices) {
        match summary.descriptor {
            Ok(desc) => writeln!(
                out,
                "  [{}] {} ID {:04x}:{:04x} Class: {:#04x} Configurations: {}",
                summary.index,
                summary.location,
                desc.vendor_id,
                desc.product_id,
                desc.class,
                desc.num_configurations
            )?,
            Err(e) => writeln!(
                out,
                "  [{}] {} <descriptor unavailable: {}>",
                summary.index, summary.location, e
            )?,
        }
    }

    Ok(devices.len())
}
