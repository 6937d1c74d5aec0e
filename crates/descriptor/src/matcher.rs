//! Device matching by vendor/product identifiers

use crate::error::{FilterParseError, Result};
use crate::types::DeviceDescriptor;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Returns true iff both the vendor and product identifiers match exactly
pub fn matches(descriptor: &DeviceDescriptor, vendor_id: u16, product_id: u16) -> bool {
    descriptor.vendor_id == vendor_id && descriptor.product_id == product_id
}

/// Exact vendor/product pair selecting the target device
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct DeviceFilter {
    pub vendor_id: u16,
    pub product_id: u16,
}

impl DeviceFilter {
    pub const fn new(vendor_id: u16, product_id: u16) -> Self {
        Self {
            vendor_id,
            product_id,
        }
    }

    /// Check a device descriptor against this filter
    pub fn matches(&self, descriptor: &DeviceDescriptor) -> bool {
        matches(descriptor, self.vendor_id, self.product_id)
    }
}

impl fmt::Display for DeviceFilter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:04x}:{:04x}", self.vendor_id, self.product_id)
    }
}

impl FromStr for DeviceFilter {
    type Err = FilterParseError;

    /// Parse `VID:PID`, each side hex with an optional `0x` prefix
    fn from_str(s: &str) -> Result<Self> {
        let (vid, pid) = s
            .split_once(':')
            .ok_or_else(|| FilterParseError::Format(s.to_string()))?;
        if pid.contains(':') {
            return Err(FilterParseError::Format(s.to_string()));
        }

        Ok(Self {
            vendor_id: parse_hex_id(vid, "VID")?,
            product_id: parse_hex_id(pid, "PID")?,
        })
    }
}

/// Parse a 16-bit hex identifier, with or without a `0x` prefix
pub fn parse_hex_id(id: &str, field: &'static str) -> Result<u16> {
    let trimmed = id.trim();
    let hex_part = trimmed
        .strip_prefix("0x")
        .or_else(|| trimmed.strip_prefix("0X"))
        .unwrap_or(trimmed);

    let invalid = || FilterParseError::HexId {
        field,
        value: id.to_string(),
    };

    // from_str_radix alone would accept a leading '+'
    if hex_part.is_empty()
        || hex_part.len() > 4
        || !hex_part.bytes().all(|b| b.is_ascii_hexdigit())
    {
        return Err(invalid());
    }

    u16::from_str_radix(hex_part, 16).map_err(|_| invalid())
}
