//! Probe configuration management
//!
//! The target device defaults to compile-time constants. A TOML file can
//! override them, and command-line flags override the file.

use anyhow::{Context, Result, anyhow};
use descriptor::{DeviceFilter, parse_hex_id};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

/// Default target vendor ID (STMicroelectronics)
pub const DEFAULT_VENDOR_ID: u16 = 0x0483;
/// Default target product ID
pub const DEFAULT_PRODUCT_ID: u16 = 0x572b;
/// Default interface to claim
pub const DEFAULT_INTERFACE: u8 = 0;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProbeConfig {
    pub probe: ProbeSettings,
    pub target: TargetSettings,
    /// Report output configuration
    #[serde(default)]
    pub output: OutputSettings,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProbeSettings {
    pub log_level: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TargetSettings {
    /// Vendor ID, `0x`-prefixed hex (e.g. "0x0483")
    pub vendor_id: String,
    /// Product ID, `0x`-prefixed hex (e.g. "0x572b")
    pub product_id: String,
    /// Interface to detach and claim
    #[serde(default)]
    pub interface: u8,
    /// Run the claim lifecycle after the descriptor report
    #[serde(default = "TargetSettings::default_claim")]
    pub claim: bool,
}

impl TargetSettings {
    fn default_claim() -> bool {
        true
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct OutputSettings {
    #[serde(default)]
    pub format: OutputFormat,
    /// Read every configuration instead of only the active one
    #[serde(default)]
    pub all_configurations: bool,
}

/// Descriptor report format
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OutputFormat {
    #[default]
    Text,
    Json,
}

impl Default for ProbeConfig {
    fn default() -> Self {
        Self {
            probe: ProbeSettings {
                log_level: "info".to_string(),
            },
            target: TargetSettings {
                vendor_id: format!("{:#06x}", DEFAULT_VENDOR_ID),
                product_id: format!("{:#06x}", DEFAULT_PRODUCT_ID),
                interface: DEFAULT_INTERFACE,
                claim: true,
            },
            output: OutputSettings::default(),
        }
    }
}

impl ProbeConfig {
    /// Load configuration from the specified path
    pub fn load(path: Option<PathBuf>) -> Result<Self> {
        let config_path = if let Some(p) = path {
            p
        } else {
            // Try standard locations in order
            let candidates = vec![
                Self::default_path(),
                PathBuf::from("/etc/usb-probe/probe.toml"),
            ];

            candidates
                .into_iter()
                .find(|p| p.exists())
                .ok_or_else(|| anyhow!("No configuration file found, using defaults"))?
        };

        let content = fs::read_to_string(&config_path)
            .with_context(|| format!("Failed to read config file: {}", config_path.display()))?;

        let config: ProbeConfig = toml::from_str(&content)
            .with_context(|| format!("Failed to parse config file: {}", config_path.display()))?;

        config.validate()?;

        tracing::info!("Loaded configuration from: {}", config_path.display());
        Ok(config)
    }

    /// Load configuration or return defaults if not found
    pub fn load_or_default() -> Self {
        match Self::load(None) {
            Ok(config) => config,
            Err(e) => {
                tracing::debug!("Failed to load config: {}, using defaults", e);
                Self::default()
            }
        }
    }

    /// Save configuration to the specified path
    pub fn save(&self, path: &Path) -> Result<()> {
        let content = toml::to_string_pretty(self).context("Failed to serialize configuration")?;

        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).with_context(|| {
                format!("Failed to create config directory: {}", parent.display())
            })?;
        }

        fs::write(path, content)
            .with_context(|| format!("Failed to write config file: {}", path.display()))?;

        tracing::info!("Saved configuration to: {}", path.display());
        Ok(())
    }

    /// Get the default configuration file path
    pub fn default_path() -> PathBuf {
        if let Some(config_dir) = dirs::config_dir() {
            config_dir.join("usb-probe").join("probe.toml")
        } else {
            PathBuf::from(".config/usb-probe/probe.toml")
        }
    }

    /// Target device filter built from the configured ids
    pub fn filter(&self) -> Result<DeviceFilter> {
        Ok(DeviceFilter::new(
            Self::validate_hex_id(&self.target.vendor_id, "vendor_id")?,
            Self::validate_hex_id(&self.target.product_id, "product_id")?,
        ))
    }

    /// Validate configuration values
    pub fn validate(&self) -> Result<()> {
        let valid_levels = ["trace", "debug", "info", "warn", "error"];
        if !valid_levels.contains(&self.probe.log_level.as_str()) {
            return Err(anyhow!(
                "Invalid log level '{}', must be one of: {}",
                self.probe.log_level,
                valid_levels.join(", ")
            ));
        }

        self.filter()?;
        Ok(())
    }

    /// Validate a hex ID (VID or PID) and return its value
    fn validate_hex_id(id: &str, name: &'static str) -> Result<u16> {
        if !id.starts_with("0x") && !id.starts_with("0X") {
            return Err(anyhow!(
                "Invalid {} '{}', must start with '0x' (e.g., '0x0483')",
                name,
                id
            ));
        }

        Ok(parse_hex_id(id, name)?)
    }
}

/// Expand a leading `~` in a user-supplied path
pub fn expand_path(path: &str) -> PathBuf {
    PathBuf::from(shellexpand::tilde(path).as_ref())
}

/// libusb's own log verbosity for a tracing level name
pub fn libusb_log_level(level: &str) -> rusb::LogLevel {
    match level {
        "trace" | "debug" => rusb::LogLevel::Debug,
        "info" => rusb::LogLevel::Info,
        "warn" => rusb::LogLevel::Warning,
        _ => rusb::LogLevel::Error,
    }
}
