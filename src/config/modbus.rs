// Copyright (c) 2025 Ronan LE MEILLAT, SCTG Development
// This file is part of the rust-modbus-sim project and is licensed under the
// SCTG Development Non-Commercial License v1.0 (see LICENSE.md for details).

//! Modbus TCP server configuration

use serde::{Deserialize, Serialize};

/// Configuration for the Modbus TCP server component.
///
/// # Example
///
/// ```
/// use rust_modbus_sim::config::ModbusConfig;
///
/// let modbus_config = ModbusConfig {
///     enabled: true,
///     port: 5020,
///     address: "0.0.0.0".to_string(),
///     reject_unknown_units: false,
/// };
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ModbusConfig {
    /// Enable or disable the Modbus TCP server.
    ///
    /// When set to `false`, the simulator only loads and validates its devices.
    /// Default is `true`.
    pub enabled: bool,

    /// The TCP port the Modbus server will listen on.
    ///
    /// Default value is 502, the standard Modbus TCP port. Port 0 lets the
    /// operating system pick a free port.
    pub port: u16,

    /// The network address the Modbus server will bind to.
    ///
    /// Can be an IPv4/IPv6 address or "localhost". Default is "127.0.0.1".
    /// Use "0.0.0.0" to bind to all IPv4 interfaces.
    pub address: String,

    /// Answer requests for unit ids without a device with a gateway target
    /// exception. When `false`, such requests are served from the current
    /// store and writes reach no device. Default is `true`.
    pub reject_unknown_units: bool,
}

impl Default for ModbusConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            port: 502,
            address: "127.0.0.1".to_string(),
            reject_unknown_units: true,
        }
    }
}
