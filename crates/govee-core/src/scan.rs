//! Light discovery.
//!
//! Govee lights advertise names of the form `Govee_H6199_1A2B`; the middle
//! part is the model, which also names the scene catalog file.

use std::time::Duration;

use btleplug::api::{Central, Manager as _, Peripheral as _, ScanFilter};
use btleplug::platform::{Adapter, Manager, Peripheral, PeripheralId};
use tokio::time::sleep;
use tracing::{debug, info, warn};

use govee_types::model_from_name;

use crate::error::{Error, Result};
use crate::util::{UNSET_ADDRESS, create_identifier, format_peripheral_id, same_address};

/// A light seen during a scan.
#[derive(Debug, Clone)]
pub struct DiscoveredLight {
    /// Advertised name.
    pub name: Option<String>,
    pub id: PeripheralId,
    /// BLE address; all zeros on macOS, use `identifier` instead.
    pub address: String,
    /// What to pass to [`find_device`] to connect to this light.
    pub identifier: String,
    pub rssi: Option<i16>,
    /// Model parsed from the name, e.g. `H6199`.
    pub model: Option<String>,
}

/// Options for scanning.
#[derive(Debug, Clone)]
pub struct ScanOptions {
    /// How long to scan.
    pub duration: Duration,
    /// Only report peripherals with a Govee light name.
    pub govee_only: bool,
}

impl Default for ScanOptions {
    fn default() -> Self {
        Self {
            duration: Duration::from_secs(5),
            govee_only: true,
        }
    }
}

impl ScanOptions {
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the scan duration.
    #[must_use]
    pub fn duration(mut self, duration: Duration) -> Self {
        self.duration = duration;
        self
    }

    /// Set scan duration in seconds.
    #[must_use]
    pub fn duration_secs(mut self, secs: u64) -> Self {
        self.duration = Duration::from_secs(secs);
        self
    }

    /// Report every peripheral, not just Govee lights.
    #[must_use]
    pub fn all_devices(mut self) -> Self {
        self.govee_only = false;
        self
    }
}

/// Get the first available Bluetooth adapter.
pub async fn get_adapter() -> Result<Adapter> {
    let manager = Manager::new().await?;
    let adapters = manager.adapters().await?;

    adapters
        .into_iter()
        .next()
        .ok_or_else(|| Error::device_not_found("no Bluetooth adapter available"))
}

/// Scan for Govee lights in range with default options.
///
/// An empty list means nothing was found, not an error.
pub async fn scan_for_lights() -> Result<Vec<DiscoveredLight>> {
    scan_with_options(ScanOptions::default()).await
}

/// Scan with custom options.
pub async fn scan_with_options(options: ScanOptions) -> Result<Vec<DiscoveredLight>> {
    let adapter = get_adapter().await?;
    scan_with_adapter(&adapter, options).await
}

/// Scan using a specific adapter.
pub async fn scan_with_adapter(
    adapter: &Adapter,
    options: ScanOptions,
) -> Result<Vec<DiscoveredLight>> {
    info!(
        "Starting BLE scan for {} seconds...",
        options.duration.as_secs()
    );

    adapter.start_scan(ScanFilter::default()).await?;
    sleep(options.duration).await;
    adapter.stop_scan().await?;

    let mut discovered = Vec::new();
    for peripheral in adapter.peripherals().await? {
        match process_peripheral(&peripheral, options.govee_only).await {
            Ok(Some(light)) => {
                info!("Found light: {:?}", light.name);
                discovered.push(light);
            }
            Ok(None) => {}
            Err(e) => debug!("Error processing peripheral: {}", e),
        }
    }

    info!("Scan complete. Found {} light(s)", discovered.len());
    Ok(discovered)
}

async fn process_peripheral(
    peripheral: &Peripheral,
    govee_only: bool,
) -> Result<Option<DiscoveredLight>> {
    let Some(properties) = peripheral.properties().await? else {
        return Ok(None);
    };

    let name = properties.local_name.clone();
    let model = name.as_deref().and_then(model_from_name);
    if govee_only && model.is_none() {
        return Ok(None);
    }

    let id = peripheral.id();
    let address = properties.address.to_string();
    let identifier = create_identifier(&address, &id);

    Ok(Some(DiscoveredLight {
        name,
        id,
        address,
        identifier,
        rssi: properties.rssi,
        model,
    }))
}

/// Find a light by address, peripheral ID, or (partial) name.
pub async fn find_device(identifier: &str) -> Result<(Adapter, Peripheral)> {
    find_device_with_options(identifier, ScanOptions::default()).await
}

/// Find a light with custom scan options.
///
/// Peripherals the adapter already knows are checked first; otherwise up to
/// three scans of increasing length are made, since advertisements are easy
/// to miss.
pub async fn find_device_with_options(
    identifier: &str,
    options: ScanOptions,
) -> Result<(Adapter, Peripheral)> {
    let adapter = get_adapter().await?;
    let identifier_lower = identifier.to_lowercase();

    info!("Looking for device: {}", identifier);

    if let Some(peripheral) = find_peripheral_by_identifier(&adapter, &identifier_lower).await? {
        info!("Found device in cache (no scan needed)");
        return Ok((adapter, peripheral));
    }

    let max_attempts: u32 = 3;
    let base_duration = (options.duration / 2).max(Duration::from_secs(2));

    for attempt in 1..=max_attempts {
        let scan_duration = base_duration * attempt;
        info!(
            "Scan attempt {}/{} ({}s)...",
            attempt,
            max_attempts,
            scan_duration.as_secs()
        );

        adapter.start_scan(ScanFilter::default()).await?;
        sleep(scan_duration).await;
        adapter.stop_scan().await?;

        if let Some(peripheral) =
            find_peripheral_by_identifier(&adapter, &identifier_lower).await?
        {
            info!("Found device on attempt {}", attempt);
            return Ok((adapter, peripheral));
        }

        if attempt < max_attempts {
            warn!("Device not found, retrying...");
        }
    }

    warn!(
        "Device not found after {} attempts: {}",
        max_attempts, identifier
    );
    Err(Error::device_not_found(identifier))
}

async fn find_peripheral_by_identifier(
    adapter: &Adapter,
    identifier_lower: &str,
) -> Result<Option<Peripheral>> {
    for peripheral in adapter.peripherals().await? {
        let Ok(Some(props)) = peripheral.properties().await else {
            continue;
        };
        let address = props.address.to_string();
        let peripheral_id = format_peripheral_id(&peripheral.id()).to_lowercase();

        if peripheral_id.contains(identifier_lower) {
            debug!("Matched by peripheral ID: {}", peripheral_id);
            return Ok(Some(peripheral));
        }

        if address != UNSET_ADDRESS && same_address(&address, identifier_lower) {
            debug!("Matched by address: {}", address);
            return Ok(Some(peripheral));
        }

        if let Some(name) = &props.local_name
            && name.to_lowercase().contains(identifier_lower)
        {
            debug!("Matched by name: {}", name);
            return Ok(Some(peripheral));
        }
    }

    Ok(None)
}
