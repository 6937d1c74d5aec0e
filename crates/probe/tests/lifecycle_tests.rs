//! End-to-end probe runs against the simulated host

use anyhow::anyhow;
use common::test_utils::{create_mock_device_descriptor, create_mock_hid_config};
use descriptor::DeviceFilter;
use probe::config::OutputFormat;
use probe::usb::sim::{Failures, HostCall, SimDevice, SimulatedHost};
use probe::usb::{ClaimPhase, ConfigScope, Step};
use probe::{RunOptions, list_devices, run};

fn options(format: OutputFormat, claim: bool) -> RunOptions {
    RunOptions {
        filter: DeviceFilter::new(0x0483, 0x572b),
        interface: 0,
        format,
        scope: ConfigScope::Active,
        claim,
    }
}

/// Three devices, the target at index 1 with a kernel driver on interface 0
fn three_device_host() -> SimulatedHost {
    SimulatedHost::new(vec![
        SimDevice::new(create_mock_device_descriptor(0x1d6b, 0x0002)),
        SimDevice::new(create_mock_device_descriptor(0x0483, 0x572b))
            .with_configuration(create_mock_hid_config())
            .with_kernel_driver(0),
        SimDevice::new(create_mock_device_descriptor(0x046d, 0xc52b)),
    ])
}

fn output(buf: Vec<u8>) -> String {
    String::from_utf8(buf).unwrap()
}

#[test]
fn test_full_run_claims_and_restores() {
    let host = three_device_host();
    let mut out = Vec::new();

    let outcome = run(&host, &options(OutputFormat::Text, true), &mut out, |session| {
        assert!(session.is_claimed());
        assert_eq!(session.phase(), ClaimPhase::InterfaceClaimed);
        assert!(session.state().had_kernel_driver());
        assert!(!host.kernel_driver_bound(1, 0));
        Ok(())
    })
    .unwrap();

    assert_eq!(outcome.device_count, 3);
    assert_eq!(outcome.matched_index, Some(1));
    assert!(outcome.report.is_some());

    let teardown = outcome.teardown.unwrap();
    assert!(teardown.is_clean());
    assert_eq!(
        teardown.steps(),
        vec![
            Step::InterfaceClaimed,
            Step::KernelDriverDetached,
            Step::Opened
        ]
    );

    assert_eq!(
        host.lifecycle_calls(),
        vec![
            HostCall::Open {
                vendor_id: 0x0483,
                product_id: 0x572b
            },
            HostCall::KernelDriverActive { interface: 0 },
            HostCall::DetachKernelDriver { interface: 0 },
            HostCall::ClaimInterface { interface: 0 },
            HostCall::ReleaseInterface { interface: 0 },
            HostCall::AttachKernelDriver { interface: 0 },
            HostCall::Close { device: 1 },
        ]
    );
    assert!(host.kernel_driver_bound(1, 0));
    assert_eq!(host.open_handles(), 0);

    let text = output(out);
    assert!(text.starts_with("There are 3 devices.\n"));
    assert!(text.contains("VendorID: 0483"));
    assert!(text.contains("ProductID: 572b"));
    assert!(text.contains("Endpoint Addr: 0x81"));
    assert!(text.contains("Interface 0 of 0483:572b claimed (kernel driver detached)"));
}

#[test]
fn test_failure_while_claimed_still_tears_down() {
    let host = three_device_host();
    let mut out = Vec::new();

    let result = run(&host, &options(OutputFormat::Text, true), &mut out, |_| {
        Err(anyhow!("interrupted"))
    });

    assert_eq!(result.unwrap_err().to_string(), "interrupted");
    assert_eq!(
        host.count(|c| matches!(c, HostCall::ReleaseInterface { .. })),
        1
    );
    assert!(host.kernel_driver_bound(1, 0));
    assert_eq!(host.open_handles(), 0);
}

#[test]
fn test_no_claim_reports_only() {
    let host = three_device_host();
    let mut out = Vec::new();

    let outcome = run(&host, &options(OutputFormat::Text, false), &mut out, |_| {
        panic!("claim callback must not run");
    })
    .unwrap();

    assert!(outcome.report.is_some());
    assert!(outcome.teardown.is_none());
    assert!(host.lifecycle_calls().is_empty());
    assert!(host.kernel_driver_bound(1, 0));
}

#[test]
fn test_json_output() {
    let host = three_device_host();
    let mut out = Vec::new();

    run(&host, &options(OutputFormat::Json, false), &mut out, |_| Ok(())).unwrap();

    let value: serde_json::Value = serde_json::from_slice(&out).unwrap();
    assert_eq!(value["device"]["vendor_id"], 0x0483);
    assert_eq!(value["device"]["product_id"], 0x572b);
    assert_eq!(
        value["configurations"][0]["interfaces"][0]["alt_settings"][0]["endpoints"]
            .as_array()
            .unwrap()
            .len(),
        2
    );
}

#[test]
fn test_no_matching_device() {
    let host = SimulatedHost::new(vec![SimDevice::new(create_mock_device_descriptor(
        0x1d6b, 0x0002,
    ))]);
    let mut out = Vec::new();

    let result = run(&host, &options(OutputFormat::Text, true), &mut out, |_| Ok(()));

    // Open is attempted and fails; nothing was acquired so nothing is undone
    assert!(result.is_err());
    assert_eq!(
        host.lifecycle_calls(),
        vec![HostCall::Open {
            vendor_id: 0x0483,
            product_id: 0x572b
        }]
    );
    assert_eq!(host.open_handles(), 0);
    assert!(output(out).contains("No device matching 0483:572b"));
}

#[test]
fn test_empty_host_is_not_an_error() {
    let host = SimulatedHost::new(Vec::new());
    let mut out = Vec::new();

    let outcome = run(&host, &options(OutputFormat::Text, true), &mut out, |_| Ok(())).unwrap();

    assert_eq!(outcome.device_count, 0);
    assert!(outcome.matched_index.is_none());
    assert_eq!(output(out), "Oops, no devices found\n");
    assert!(host.lifecycle_calls().is_empty());
}

#[test]
fn test_enumeration_failure_is_fatal() {
    let host = three_device_host().with_failures(Failures {
        list: Some(rusb::Error::Access),
        ..Failures::default()
    });
    let mut out = Vec::new();

    assert!(run(&host, &options(OutputFormat::Text, true), &mut out, |_| Ok(())).is_err());
    assert!(out.is_empty());
}

#[test]
fn test_claim_failure_rolls_back() {
    let host = three_device_host().with_failures(Failures {
        claim: Some(rusb::Error::Busy),
        ..Failures::default()
    });
    let mut out = Vec::new();

    let result = run(&host, &options(OutputFormat::Text, true), &mut out, |_| Ok(()));

    assert!(result.is_err());
    assert_eq!(
        host.count(|c| matches!(c, HostCall::ReleaseInterface { .. })),
        0
    );
    assert!(host.kernel_driver_bound(1, 0));
    assert_eq!(host.open_handles(), 0);
}

#[test]
fn test_list_devices() {
    let host = SimulatedHost::new(vec![
        SimDevice::new(create_mock_device_descriptor(0x0483, 0x572b)),
        SimDevice::unreadable(),
    ]);
    let mut out = Vec::new();

    assert_eq!(list_devices(&host, &mut out).unwrap(), 2);

    let text = output(out);
    assert!(text.contains("Found 2 USB device(s)"));
    assert!(text.contains("[0] Bus 001 Device 001 ID 0483:572b"));
    assert!(text.contains("[1] Bus 001 Device 002 <descriptor unavailable"));
}
