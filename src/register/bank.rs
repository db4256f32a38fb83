// Copyright (c) 2025 Ronan LE MEILLAT, SCTG Development
// This file is part of the rust-modbus-sim project and is licensed under the
// SCTG Development Non-Commercial License v1.0 (see LICENSE.md for details).

use super::{RegisterCategory, RegisterCell};

/// Largest bank a device can expose: the whole 16-bit protocol address space.
pub const MAX_BANK_SIZE: usize = 1 << 16;

/// Fixed-size, index-addressed sequence of cells of one category.
///
/// Cell `i` has protocol index `i` and operator address `base + i`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RegisterBank {
    category: RegisterCategory,
    cells: Vec<RegisterCell>,
}

impl RegisterBank {
    /// Build a bank of `count` zeroed cells.
    ///
    /// Returns `None` when `count` is zero or exceeds [`MAX_BANK_SIZE`].
    pub fn new(category: RegisterCategory, count: usize) -> Option<Self> {
        if count == 0 || count > MAX_BANK_SIZE {
            return None;
        }
        let cells = (0..count)
            .map(|i| RegisterCell::new(category, i as u16))
            .collect();
        Some(Self { category, cells })
    }

    pub fn category(&self) -> RegisterCategory {
        self.category
    }

    pub fn len(&self) -> usize {
        self.cells.len()
    }

    pub fn is_empty(&self) -> bool {
        self.cells.is_empty()
    }

    pub fn get(&self, index: usize) -> Option<&RegisterCell> {
        self.cells.get(index)
    }

    pub fn get_mut(&mut self, index: usize) -> Option<&mut RegisterCell> {
        self.cells.get_mut(index)
    }

    pub fn iter(&self) -> impl Iterator<Item = &RegisterCell> {
        self.cells.iter()
    }

    /// Current cell values, in index order.
    pub fn values(&self) -> impl Iterator<Item = u16> + '_ {
        self.cells.iter().map(RegisterCell::value)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_address_mapping_of_ten_holding_registers() {
        let bank = RegisterBank::new(RegisterCategory::HoldingRegister, 10).unwrap();
        assert_eq!(bank.len(), 10);
        assert_eq!(bank.get(0).unwrap().operator_address(), 40001);
        assert_eq!(bank.get(9).unwrap().operator_address(), 40010);
        assert_eq!(bank.get(9).unwrap().protocol_index(), 9);
        assert!(bank.get(10).is_none());
    }

    #[test]
    fn test_invalid_sizes_rejected() {
        assert!(RegisterBank::new(RegisterCategory::Coil, 0).is_none());
        assert!(RegisterBank::new(RegisterCategory::Coil, MAX_BANK_SIZE + 1).is_none());
        let full = RegisterBank::new(RegisterCategory::Coil, MAX_BANK_SIZE).unwrap();
        assert_eq!(full.get(MAX_BANK_SIZE - 1).unwrap().protocol_index(), u16::MAX);
    }

    #[test]
    fn test_values_in_index_order() {
        let mut bank = RegisterBank::new(RegisterCategory::InputRegister, 3).unwrap();
        bank.get_mut(1).unwrap().set_value(11);
        bank.get_mut(2).unwrap().set_value(22);
        assert_eq!(bank.values().collect::<Vec<_>>(), vec![0, 11, 22]);
    }
}
