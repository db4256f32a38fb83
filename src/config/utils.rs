// Copyright (c) 2025 Ronan LE MEILLAT, SCTG Development
// This file is part of the rust-modbus-sim project and is licensed under the
// SCTG Development Non-Commercial License v1.0 (see LICENSE.md for details).

//! Configuration utilities
//!
//! This module provides utility functions for working with configuration
//! settings, including validation and schema management.

use std::collections::BTreeSet;

use anyhow::{Context, Result};
use log::{debug, warn};

use super::{Config, CONFIG_SCHEMA};
use crate::register::MAX_BANK_SIZE;

/// Output the embedded JSON schema to the console.
///
/// This function is called when the `--show-config-schema` flag is provided
/// on the command line.
///
/// # Example
///
/// ```bash
/// ./rust_modbus_sim --show-config-schema > config_schema.json
/// ```
pub fn output_config_schema() -> Result<()> {
    let schema: serde_json::Value =
        serde_json::from_str(CONFIG_SCHEMA).context("Failed to parse JSON schema")?;
    let formatted_schema =
        serde_json::to_string_pretty(&schema).context("Failed to format JSON schema")?;
    println!("{}", formatted_schema);
    Ok(())
}

/// Check if a string is a valid IP address
///
/// Validates that a string represents a valid IPv4 or IPv6 address,
/// or is one of the special values like "localhost" or "0.0.0.0".
pub fn is_valid_ip_address(addr: &str) -> bool {
    if addr.parse::<std::net::IpAddr>().is_ok() {
        return true;
    }

    // Special cases
    matches!(addr, "localhost" | "::" | "::0" | "0.0.0.0")
}

/// Validates the configuration against additional rules that aren't covered by the JSON schema.
///
/// # Validation Rules
///
/// - **IP Address Format**: the Modbus bind address must be an IP address or "localhost"
/// - **Unit ids**: device unit ids are in 1..=255 and unique
/// - **Banks**: sizes are in 1..=65536 and carry no more initial values than cells
/// - **Initial unit**: in 1..=255; a unit without device only logs a warning
pub fn validate_specific_rules(config: &Config) -> Result<()> {
    debug!("Performing additional validation checks");

    if !is_valid_ip_address(&config.modbus.address) {
        anyhow::bail!("Invalid Modbus address: {}", config.modbus.address);
    }

    if config.simulation.initial_unit_id == 0 {
        anyhow::bail!("Initial unit id must be between 1 and 255");
    }

    if config.simulation.heartbeat_interval == 0 {
        anyhow::bail!("Heartbeat interval must be at least one second");
    }

    let mut unit_ids = BTreeSet::new();
    for device in &config.devices {
        if device.unit_id == 0 {
            anyhow::bail!("Device unit id 0 is reserved for broadcast");
        }
        if !unit_ids.insert(device.unit_id) {
            anyhow::bail!("Duplicate device unit id {}", device.unit_id);
        }
        for (category, bank) in device.banks() {
            if bank.count == 0 || bank.count > MAX_BANK_SIZE {
                anyhow::bail!(
                    "Device {}: {} bank size {} not in 1..={}",
                    device.unit_id,
                    category.label(),
                    bank.count,
                    MAX_BANK_SIZE
                );
            }
            if bank.values.len() > bank.count {
                anyhow::bail!(
                    "Device {}: {} initial {} values for a bank of {}",
                    device.unit_id,
                    bank.values.len(),
                    category.label(),
                    bank.count
                );
            }
        }
    }

    if !config.devices.is_empty() && !unit_ids.contains(&config.simulation.initial_unit_id) {
        warn!(
            "Initial unit {} has no device, nothing is live until a configured unit is addressed",
            config.simulation.initial_unit_id
        );
    }

    Ok(())
}
