// Copyright (c) 2025 Ronan LE MEILLAT, SCTG Development
// This file is part of the rust-modbus-sim project and is licensed under the
// SCTG Development Non-Commercial License v1.0 (see LICENSE.md for details).

//! Register categories
//!
//! Modbus exposes four independent data tables. Each table has its own
//! operator-facing numbering base (the "5 digit" addresses shown on HMI
//! screens and in device manuals) and its own value domain.

use std::fmt;

use serde::{Deserialize, Serialize};

/// One of the four Modbus data tables.
///
/// | Category | Numbering base | Value domain |
/// |----------|----------------|--------------|
/// | Coil | 1 | boolean |
/// | Discrete Input | 10001 | boolean |
/// | Holding Register | 40001 | 0-65535 |
/// | Input Register | 30001 | 0-65535 |
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RegisterCategory {
    Coil,
    DiscreteInput,
    HoldingRegister,
    InputRegister,
}

impl RegisterCategory {
    /// All categories, in Modbus function code order (0x01..=0x04).
    pub const ALL: [RegisterCategory; 4] = [
        RegisterCategory::Coil,
        RegisterCategory::DiscreteInput,
        RegisterCategory::HoldingRegister,
        RegisterCategory::InputRegister,
    ];

    /// Largest value a word register can hold.
    pub const MAX_WORD: u16 = u16::MAX;

    /// Operator-facing address of the first cell of a bank of this category.
    pub fn numbering_base(self) -> u32 {
        match self {
            RegisterCategory::Coil => 1,
            RegisterCategory::DiscreteInput => 10001,
            RegisterCategory::HoldingRegister => 40001,
            RegisterCategory::InputRegister => 30001,
        }
    }

    /// `true` for single-bit tables (coils and discrete inputs).
    pub fn is_binary(self) -> bool {
        matches!(
            self,
            RegisterCategory::Coil | RegisterCategory::DiscreteInput
        )
    }

    /// Position of the category in [`RegisterCategory::ALL`].
    pub fn index(self) -> usize {
        match self {
            RegisterCategory::Coil => 0,
            RegisterCategory::DiscreteInput => 1,
            RegisterCategory::HoldingRegister => 2,
            RegisterCategory::InputRegister => 3,
        }
    }

    /// Bring an arbitrary integer into the value domain of the category.
    ///
    /// Word registers saturate into `[0, 65535]`. Bit tables map any nonzero
    /// value to `1` and zero to `0`.
    pub fn clamp(self, value: i64) -> u16 {
        if self.is_binary() {
            u16::from(value != 0)
        } else {
            value.clamp(0, i64::from(Self::MAX_WORD)) as u16
        }
    }

    /// Human readable name, as used in logs and mapping reports.
    pub fn label(self) -> &'static str {
        match self {
            RegisterCategory::Coil => "Coil",
            RegisterCategory::DiscreteInput => "Discrete Input",
            RegisterCategory::HoldingRegister => "Holding Register",
            RegisterCategory::InputRegister => "Input Register",
        }
    }
}

impl fmt::Display for RegisterCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} [{:05}+]", self.label(), self.numbering_base())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_numbering_bases() {
        assert_eq!(RegisterCategory::Coil.numbering_base(), 1);
        assert_eq!(RegisterCategory::DiscreteInput.numbering_base(), 10001);
        assert_eq!(RegisterCategory::HoldingRegister.numbering_base(), 40001);
        assert_eq!(RegisterCategory::InputRegister.numbering_base(), 30001);
    }

    #[test]
    fn test_word_clamping() {
        let hr = RegisterCategory::HoldingRegister;
        assert_eq!(hr.clamp(-5), 0);
        assert_eq!(hr.clamp(70000), 65535);
        assert_eq!(hr.clamp(1234), 1234);
    }

    #[test]
    fn test_bit_normalization() {
        let coil = RegisterCategory::Coil;
        assert_eq!(coil.clamp(0), 0);
        assert_eq!(coil.clamp(1), 1);
        assert_eq!(coil.clamp(-3), 1);
        assert_eq!(coil.clamp(42), 1);
    }

    #[test]
    fn test_index_matches_all_order() {
        for (i, category) in RegisterCategory::ALL.iter().enumerate() {
            assert_eq!(category.index(), i);
        }
    }

    #[test]
    fn test_display() {
        assert_eq!(
            RegisterCategory::Coil.to_string(),
            "Coil [00001+]"
        );
        assert_eq!(
            RegisterCategory::HoldingRegister.to_string(),
            "Holding Register [40001+]"
        );
    }
}
