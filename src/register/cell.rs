// Copyright (c) 2025 Ronan LE MEILLAT, SCTG Development
// This file is part of the rust-modbus-sim project and is licensed under the
// SCTG Development Non-Commercial License v1.0 (see LICENSE.md for details).

use serde::Serialize;

use super::RegisterCategory;

/// Old and new value of a cell whose value actually changed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ValueChange {
    pub old_value: u16,
    pub new_value: u16,
}

/// A single addressable value slot of a device.
///
/// The operator address (e.g. `40001`) and the protocol index (e.g. `0`) are
/// fixed when the owning bank is created. Only the value can change, and it
/// always stays inside the value domain of its category.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RegisterCell {
    category: RegisterCategory,
    operator_address: u32,
    protocol_index: u16,
    value: u16,
}

impl RegisterCell {
    /// Create the cell at position `index` of a bank of `category`.
    pub fn new(category: RegisterCategory, index: u16) -> Self {
        Self {
            category,
            operator_address: category.numbering_base() + u32::from(index),
            protocol_index: index,
            value: 0,
        }
    }

    pub fn category(&self) -> RegisterCategory {
        self.category
    }

    /// Register number shown to a human (`base + index`).
    pub fn operator_address(&self) -> u32 {
        self.operator_address
    }

    /// 0-based index used on the wire.
    pub fn protocol_index(&self) -> u16 {
        self.protocol_index
    }

    pub fn value(&self) -> u16 {
        self.value
    }

    /// Logical state of a bit cell; for word cells, whether the value is nonzero.
    pub fn as_bool(&self) -> bool {
        self.value != 0
    }

    /// Set a new value, clamped into the category's value domain.
    ///
    /// Returns the change when the stored value differs afterwards, `None`
    /// for a no-op write. Out-of-range inputs are clamped, never rejected.
    pub fn set_value(&mut self, new_value: i64) -> Option<ValueChange> {
        let new_value = self.category.clamp(new_value);
        if new_value == self.value {
            return None;
        }
        let old_value = std::mem::replace(&mut self.value, new_value);
        Some(ValueChange {
            old_value,
            new_value,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_addresses_fixed_at_creation() {
        let cell = RegisterCell::new(RegisterCategory::InputRegister, 7);
        assert_eq!(cell.operator_address(), 30008);
        assert_eq!(cell.protocol_index(), 7);
        assert_eq!(cell.value(), 0);
    }

    #[test]
    fn test_set_value_reports_change_once() {
        let mut cell = RegisterCell::new(RegisterCategory::HoldingRegister, 0);
        assert_eq!(
            cell.set_value(500),
            Some(ValueChange {
                old_value: 0,
                new_value: 500
            })
        );
        assert_eq!(cell.set_value(500), None);
        assert_eq!(cell.value(), 500);
    }

    #[test]
    fn test_clamped_noop_is_silent() {
        let mut cell = RegisterCell::new(RegisterCategory::HoldingRegister, 0);
        cell.set_value(65535);
        // 70000 clamps to the current value, nothing to report
        assert_eq!(cell.set_value(70000), None);
    }

    #[test]
    fn test_coil_nonzero_is_true() {
        let mut cell = RegisterCell::new(RegisterCategory::Coil, 3);
        assert!(cell.set_value(-8).is_some());
        assert_eq!(cell.value(), 1);
        assert!(cell.as_bool());
        // Another nonzero value is the same logical state
        assert_eq!(cell.set_value(9), None);
    }
}
