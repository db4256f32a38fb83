// Copyright (c) 2025 Ronan LE MEILLAT, SCTG Development
// This file is part of the rust-modbus-sim project and is licensed under the
// SCTG Development Non-Commercial License v1.0 (see LICENSE.md for details).

//! Device definitions
//!
//! Each entry of the `devices` list describes one simulated device and the
//! banks it exposes:
//!
//! ```yaml
//! devices:
//!   - unit_id: 1
//!     name: Pump controller
//!     coils: { count: 8 }
//!     holding_registers: { count: 10, values: [100, 200] }
//! ```
//!
//! `values` fills the first cells of a bank; the remaining cells start at 0.

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};

use crate::device::Device;
use crate::register::RegisterCategory;

/// One register bank of a configured device.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BankConfig {
    /// Number of cells, 1 to 65536.
    pub count: usize,

    /// Initial values of the first cells. Values outside the category domain
    /// are clamped.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub values: Vec<i64>,
}

impl BankConfig {
    pub fn new(count: usize) -> Self {
        Self {
            count,
            values: Vec::new(),
        }
    }

    pub fn with_values(count: usize, values: Vec<i64>) -> Self {
        Self { count, values }
    }
}

/// A configured device.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DeviceConfig {
    /// Modbus unit id, 1 to 255.
    pub unit_id: u8,

    /// Display name, `Device <unit_id>` when omitted.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub coils: Option<BankConfig>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub discrete_inputs: Option<BankConfig>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub holding_registers: Option<BankConfig>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub input_registers: Option<BankConfig>,
}

impl DeviceConfig {
    /// A device with no bank.
    pub fn new(unit_id: u8) -> Self {
        Self {
            unit_id,
            name: None,
            coils: None,
            discrete_inputs: None,
            holding_registers: None,
            input_registers: None,
        }
    }

    pub fn bank(&self, category: RegisterCategory) -> Option<&BankConfig> {
        match category {
            RegisterCategory::Coil => self.coils.as_ref(),
            RegisterCategory::DiscreteInput => self.discrete_inputs.as_ref(),
            RegisterCategory::HoldingRegister => self.holding_registers.as_ref(),
            RegisterCategory::InputRegister => self.input_registers.as_ref(),
        }
    }

    /// Configured banks in function code order.
    pub fn banks(&self) -> impl Iterator<Item = (RegisterCategory, &BankConfig)> + '_ {
        RegisterCategory::ALL
            .into_iter()
            .filter_map(|category| self.bank(category).map(|bank| (category, bank)))
    }

    /// Build the device with its banks and initial values.
    pub fn build(&self) -> Result<Device> {
        let mut device = match &self.name {
            Some(name) => Device::with_name(self.unit_id, name.clone()),
            None => Device::new(self.unit_id),
        }?;
        for (category, bank_config) in self.banks() {
            if bank_config.values.len() > bank_config.count {
                anyhow::bail!(
                    "Device {}: {} initial {} values for a bank of {}",
                    self.unit_id,
                    bank_config.values.len(),
                    category.label(),
                    bank_config.count
                );
            }
            let bank = device
                .initialize_bank(category, bank_config.count)
                .with_context(|| format!("Device {}: invalid {} bank", self.unit_id, category.label()))?;
            for (index, value) in bank_config.values.iter().enumerate() {
                if let Some(cell) = bank.get_mut(index) {
                    cell.set_value(*value);
                }
            }
        }
        Ok(device)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::device::DeviceError;

    #[test]
    fn test_build_applies_values() {
        let config = DeviceConfig {
            name: Some("Pump".to_string()),
            holding_registers: Some(BankConfig::with_values(4, vec![100, -3, 70_000])),
            coils: Some(BankConfig::with_values(2, vec![0, 9])),
            ..DeviceConfig::new(3)
        };
        let device = config.build().unwrap();
        assert_eq!(device.name(), "Pump");
        let values: Vec<u16> = device
            .bank(RegisterCategory::HoldingRegister)
            .unwrap()
            .values()
            .collect();
        assert_eq!(values, vec![100, 0, 65535, 0]);
        assert_eq!(device.cell(RegisterCategory::Coil, 1).unwrap().value(), 1);
        assert!(device.bank(RegisterCategory::InputRegister).is_none());
    }

    #[test]
    fn test_build_rejects_bad_definitions() {
        let too_many = DeviceConfig {
            input_registers: Some(BankConfig::with_values(1, vec![1, 2])),
            ..DeviceConfig::new(1)
        };
        assert!(too_many.build().is_err());

        let empty_bank = DeviceConfig {
            coils: Some(BankConfig::new(0)),
            ..DeviceConfig::new(1)
        };
        let err = empty_bank.build().unwrap_err();
        assert_eq!(
            err.downcast_ref::<DeviceError>(),
            Some(&DeviceError::InvalidBankSize {
                category: RegisterCategory::Coil,
                count: 0
            })
        );

        assert!(DeviceConfig::new(0).build().is_err());
    }
}
