//! usb-probe
//!
//! Diagnostic and acquisition tool: finds the configured USB device, prints
//! its descriptor tree, detaches the kernel driver from the target interface,
//! claims it, and hands it back on exit.

use anyhow::{Context, Result};
use clap::Parser;
use common::setup_logging;
use descriptor::parse_hex_id;
use probe::config::{self, OutputFormat, ProbeConfig};
use probe::usb::{ConfigScope, ProbeError, RusbHost};
use probe::{RunOptions, list_devices, run};
use tokio::signal;
use tracing::info;

#[derive(Parser, Debug)]
#[command(name = "usb-probe")]
#[command(
    author,
    version,
    about = "USB probe - inspect a device and claim one of its interfaces"
)]
#[command(long_about = "
Finds the first attached USB device matching a vendor/product pair, prints
its descriptor tree (interfaces, alternate settings, endpoints), then detaches
any kernel driver from the target interface and claims it. The kernel driver
is reattached and the device closed before exit.

EXAMPLES:
    # Probe the default device (0483:572b), interface 0
    usb-probe

    # Probe another device and dump descriptors as JSON without claiming
    usb-probe --vid 0x046d --pid 0xc52b --json --no-claim

    # Keep the interface claimed until Ctrl+C or SIGTERM
    usb-probe --hold

    # List every attached device
    usb-probe --list-devices

CONFIGURATION:
    The probe looks for configuration files in the following order:
    1. Path specified with --config
    2. ~/.config/usb-probe/probe.toml
    3. /etc/usb-probe/probe.toml
    4. Built-in defaults
")]
struct Args {
    /// Path to configuration file
    #[arg(short, long, value_name = "PATH")]
    config: Option<String>,

    /// Save default configuration to default location and exit
    #[arg(long)]
    save_config: bool,

    /// List USB devices and exit
    #[arg(long)]
    list_devices: bool,

    /// Target vendor ID (hex, e.g. 0x0483)
    #[arg(long, value_name = "HEX", value_parser = parse_id)]
    vid: Option<u16>,

    /// Target product ID (hex, e.g. 0x572b)
    #[arg(long, value_name = "HEX", value_parser = parse_id)]
    pid: Option<u16>,

    /// Interface to detach and claim
    #[arg(short, long, value_name = "NUMBER")]
    interface: Option<u8>,

    /// Print the descriptor report as JSON
    #[arg(long)]
    json: bool,

    /// Read every configuration, not only the active one
    #[arg(long)]
    all_configs: bool,

    /// Only report descriptors; do not claim the interface
    #[arg(long, conflicts_with = "hold")]
    no_claim: bool,

    /// Hold the claimed interface until Ctrl+C (or SIGTERM)
    #[arg(long)]
    hold: bool,

    /// Log level (trace, debug, info, warn, error)
    #[arg(short, long, value_name = "LEVEL")]
    log_level: Option<String>,
}

fn parse_id(s: &str) -> std::result::Result<u16, String> {
    parse_hex_id(s, "ID").map_err(|e| e.to_string())
}

fn main() -> Result<()> {
    let args = Args::parse();

    // Handle --save-config flag early (before loading config)
    if args.save_config {
        let config = ProbeConfig::default();
        let path = ProbeConfig::default_path();
        config.save(&path).context("Failed to save configuration")?;
        println!("Configuration saved to: {}", path.display());
        return Ok(());
    }

    let config = if let Some(ref path) = args.config {
        ProbeConfig::load(Some(config::expand_path(path)))
            .context("Failed to load configuration")?
    } else {
        ProbeConfig::load_or_default()
    };

    // Use CLI log level if specified, otherwise use config value
    let log_level = args.log_level.as_deref().unwrap_or(&config.probe.log_level);
    setup_logging(log_level).context("Failed to setup logging")?;

    info!("usb-probe v{}", env!("CARGO_PKG_VERSION"));

    let host = RusbHost::new(config::libusb_log_level(log_level))
        .map_err(ProbeError::Init)
        .context("Failed to initialize USB access layer")?;

    let mut stdout = std::io::stdout().lock();

    if args.list_devices {
        list_devices(&host, &mut stdout)?;
        return Ok(());
    }

    let mut filter = config.filter()?;
    if let Some(vid) = args.vid {
        filter.vendor_id = vid;
    }
    if let Some(pid) = args.pid {
        filter.product_id = pid;
    }

    let options = RunOptions {
        filter,
        interface: args.interface.unwrap_or(config.target.interface),
        format: if args.json {
            OutputFormat::Json
        } else {
            config.output.format
        },
        scope: if args.all_configs || config.output.all_configurations {
            ConfigScope::All
        } else {
            ConfigScope::Active
        },
        claim: config.target.claim && !args.no_claim,
    };

    let hold = args.hold;
    run(&host, &options, &mut stdout, |_session| {
        if hold {
            wait_for_shutdown()?;
        }
        Ok(())
    })?;

    Ok(())
}

/// Block until Ctrl+C or, on Unix, SIGTERM
///
/// A current-thread runtime keeps the probe single-threaded; the claim is
/// released by the caller once this returns.
fn wait_for_shutdown() -> Result<()> {
    let runtime = tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()
        .context("Failed to start signal runtime")?;

    info!("Holding claim, press Ctrl+C to release");
    let received = runtime.block_on(shutdown_signal())?;
    info!("Received {}, releasing device...", received);
    Ok(())
}

#[cfg(unix)]
async fn shutdown_signal() -> Result<&'static str> {
    use tokio::signal::unix::SignalKind;

    let mut terminate = signal::unix::signal(SignalKind::terminate())
        .context("Failed to install SIGTERM handler")?;

    tokio::select! {
        result = signal::ctrl_c() => {
            result.context("Error waiting for Ctrl+C")?;
            Ok("Ctrl+C")
        }
        _ = terminate.recv() => Ok("SIGTERM"),
    }
}

#[cfg(not(unix))]
async fn shutdown_signal() -> Result<&'static str> {
    signal::ctrl_c().await.context("Error waiting for Ctrl+C")?;
    Ok("Ctrl+C")
}
