//! Integration tests for descriptor rendering
//!
//! Covers:
//! - Full tree layout (interfaces, alternate settings, endpoints)
//! - Isochronous-only field suppression
//! - Extra bytes preserved in text and JSON output

use descriptor::{
    AlternateSetting, ConfigurationDescriptor, DeviceDescriptor, DeviceReport, Direction,
    EndpointDescriptor, InterfaceGroup, SyncType, TransferType, render_configuration,
    render_json, render_report,
};

fn endpoint(address: u8, transfer_type: TransferType, sync_type: SyncType) -> EndpointDescriptor {
    EndpointDescriptor {
        address,
        direction: Direction::from_address(address),
        transfer_type,
        sync_type,
        max_packet_size: 64,
        interval: 1,
        refresh: 0,
        synch_address: 0,
        extra: Vec::new(),
    }
}

fn sample_config() -> ConfigurationDescriptor {
    let mut iso_in = endpoint(0x82, TransferType::Isochronous, SyncType::Adaptive);
    iso_in.extra = vec![0x07, 0x25, 0x01, 0x00, 0x00, 0x00, 0x00];

    ConfigurationDescriptor {
        number: 1,
        max_power_ma: 100,
        interfaces: vec![
            InterfaceGroup {
                number: 0,
                alt_settings: vec![AlternateSetting {
                    interface_number: 0,
                    setting_number: 0,
                    class: 0x03,
                    num_endpoints: 2,
                    endpoints: vec![
                        endpoint(0x81, TransferType::Interrupt, SyncType::None),
                        endpoint(0x01, TransferType::Interrupt, SyncType::None),
                    ],
                    extra: vec![0x09, 0x21, 0x11, 0x01],
                }],
            },
            InterfaceGroup {
                number: 1,
                alt_settings: vec![
                    AlternateSetting {
                        interface_number: 1,
                        setting_number: 0,
                        class: 0x01,
                        num_endpoints: 0,
                        endpoints: Vec::new(),
                        extra: Vec::new(),
                    },
                    AlternateSetting {
                        interface_number: 1,
                        setting_number: 1,
                        class: 0x01,
                        num_endpoints: 2,
                        endpoints: vec![
                            iso_in,
                            endpoint(0x02, TransferType::Bulk, SyncType::Async),
                        ],
                        extra: Vec::new(),
                    },
                ],
            },
        ],
    }
}

mod text_output {
    use super::*;

    #[test]
    fn test_configuration_header() {
        let text = render_configuration(&sample_config());
        assert!(text.starts_with("Configuration 1 | Max power: 100mA | Interfaces: 2"));
        assert!(text.contains("Interface 1 | Alt settings: 2"));
    }

    #[test]
    fn test_endpoints_rendered_in_reported_order() {
        let text = render_configuration(&sample_config());
        let first = text.find("Endpoint Addr: 0x81").unwrap();
        let second = text.find("Endpoint Addr: 0x01").unwrap();
        let third = text.find("Endpoint Addr: 0x82").unwrap();
        let fourth = text.find("Endpoint Addr: 0x02").unwrap();
        assert!(first < second && second < third && third < fourth);
    }

    #[test]
    fn test_sync_only_on_isochronous_lines() {
        let text = render_configuration(&sample_config());
        for line in text.lines().filter(|l| l.contains("Endpoint Addr")) {
            if line.contains("Type: Isochronous") {
                assert!(line.contains("Sync: Adaptive"), "{}", line);
            } else {
                assert!(!line.contains("Sync:"), "{}", line);
            }
        }
    }

    #[test]
    fn test_extra_bytes_dumped() {
        let text = render_configuration(&sample_config());
        assert!(text.contains("Extra: 09 21 11 01"));
        assert!(text.contains("Extra: 07 25 01 00 00 00 00"));
    }

    #[test]
    fn test_report_starts_with_device_line() {
        let report = DeviceReport {
            device: DeviceDescriptor {
                vendor_id: 0x0483,
                product_id: 0x572b,
                class: 0,
                num_configurations: 1,
            },
            configurations: vec![sample_config()],
        };
        let text = render_report(&report);
        let first_line = text.lines().next().unwrap();
        assert!(first_line.contains("VendorID: 0483"));
        assert!(text.contains("Configuration 1"));
    }
}

mod json_output {
    use super::*;

    #[test]
    fn test_json_preserves_extra_bytes() {
        let report = DeviceReport {
            device: DeviceDescriptor {
                vendor_id: 0x0483,
                product_id: 0x572b,
                class: 0,
                num_configurations: 1,
            },
            configurations: vec![sample_config()],
        };

        let json = render_json(&report).unwrap();
        let parsed: DeviceReport = serde_json::from_str(&json).unwrap();
        assert_eq!(parsed, report);
        assert_eq!(
            parsed.configurations[0].interfaces[0].alt_settings[0].extra,
            vec![0x09, 0x21, 0x11, 0x01]
        );
    }
}
