// Copyright (c) 2025 Ronan LE MEILLAT, SCTG Development
// This file is part of the rust-modbus-sim project and is licensed under the
// SCTG Development Non-Commercial License v1.0 (see LICENSE.md for details).

use serde::{Deserialize, Serialize};

use crate::device::DEFAULT_UNIT_ID;

/// Simulation-wide settings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SimulationConfig {
    /// Unit id whose device is live when the simulator starts.
    pub initial_unit_id: u8,

    /// Seconds between two statistics lines of the daemon heartbeat.
    pub heartbeat_interval: u64,
}

impl Default for SimulationConfig {
    fn default() -> Self {
        Self {
            initial_unit_id: DEFAULT_UNIT_ID,
            heartbeat_interval: 60,
        }
    }
}
