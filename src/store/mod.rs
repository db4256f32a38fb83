// Copyright (c) 2025 Ronan LE MEILLAT, SCTG Development
// This file is part of the rust-modbus-sim project and is licensed under the
// SCTG Development Non-Commercial License v1.0 (see LICENSE.md for details).

//! Protocol-facing data store
//!
//! Four flat, contiguous, 0-based arrays: the view a Modbus client sees.
//! Their indices are the wire addresses of whichever device is currently
//! active. The arrays are sized by the last full load and never grow on a
//! remote write; writing past the end is an addressing error.
//!
//! Every successful write returns a [`WriteNotification`] describing the
//! range that changed, so the caller can forward it to the sync engine.

use thiserror::Error;

use crate::register::RegisterCategory;

/// Errors raised by direct store access
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum StoreError {
    #[error("{count} {category} entries at {start} exceed store size {len}")]
    OutOfRange {
        category: RegisterCategory,
        start: u16,
        count: usize,
        len: usize,
    },
    #[error("{0} is a bit table, word access is not possible")]
    NotWords(RegisterCategory),
    #[error("{0} is a word table, bit access is not possible")]
    NotBits(RegisterCategory),
}

/// Range touched by a successful write.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct WriteNotification {
    pub category: RegisterCategory,
    pub start: u16,
    /// Number of entries written; a full 65536-entry table does not fit a `u16`
    pub length: usize,
}

impl WriteNotification {
    /// Indices covered by the notification.
    pub fn indices(&self) -> std::ops::Range<usize> {
        let start = usize::from(self.start);
        start..start + self.length
    }
}

/// The four Modbus tables of the live device.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ProtocolStore {
    coils: Vec<bool>,
    discrete_inputs: Vec<bool>,
    holding_registers: Vec<u16>,
    input_registers: Vec<u16>,
}

impl ProtocolStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn bits(&self, category: RegisterCategory) -> Result<&Vec<bool>, StoreError> {
        match category {
            RegisterCategory::Coil => Ok(&self.coils),
            RegisterCategory::DiscreteInput => Ok(&self.discrete_inputs),
            _ => Err(StoreError::NotBits(category)),
        }
    }

    fn bits_mut(&mut self, category: RegisterCategory) -> Result<&mut Vec<bool>, StoreError> {
        match category {
            RegisterCategory::Coil => Ok(&mut self.coils),
            RegisterCategory::DiscreteInput => Ok(&mut self.discrete_inputs),
            _ => Err(StoreError::NotBits(category)),
        }
    }

    fn words(&self, category: RegisterCategory) -> Result<&Vec<u16>, StoreError> {
        match category {
            RegisterCategory::HoldingRegister => Ok(&self.holding_registers),
            RegisterCategory::InputRegister => Ok(&self.input_registers),
            _ => Err(StoreError::NotWords(category)),
        }
    }

    fn words_mut(&mut self, category: RegisterCategory) -> Result<&mut Vec<u16>, StoreError> {
        match category {
            RegisterCategory::HoldingRegister => Ok(&mut self.holding_registers),
            RegisterCategory::InputRegister => Ok(&mut self.input_registers),
            _ => Err(StoreError::NotWords(category)),
        }
    }

    /// Number of addressable entries of a table.
    pub fn len(&self, category: RegisterCategory) -> usize {
        match category {
            RegisterCategory::Coil => self.coils.len(),
            RegisterCategory::DiscreteInput => self.discrete_inputs.len(),
            RegisterCategory::HoldingRegister => self.holding_registers.len(),
            RegisterCategory::InputRegister => self.input_registers.len(),
        }
    }

    pub fn is_empty(&self, category: RegisterCategory) -> bool {
        self.len(category) == 0
    }

    /// Empty a table.
    pub fn clear(&mut self, category: RegisterCategory) {
        match category {
            RegisterCategory::Coil => self.coils.clear(),
            RegisterCategory::DiscreteInput => self.discrete_inputs.clear(),
            RegisterCategory::HoldingRegister => self.holding_registers.clear(),
            RegisterCategory::InputRegister => self.input_registers.clear(),
        }
    }

    /// Append a value at the end of a table, in the table's own domain
    /// (nonzero means `true` for bit tables).
    pub fn push(&mut self, category: RegisterCategory, value: u16) {
        match category {
            RegisterCategory::Coil => self.coils.push(value != 0),
            RegisterCategory::DiscreteInput => self.discrete_inputs.push(value != 0),
            RegisterCategory::HoldingRegister => self.holding_registers.push(value),
            RegisterCategory::InputRegister => self.input_registers.push(value),
        }
    }

    /// Uniform read of one entry; bits read as `0`/`1`.
    pub fn get(&self, category: RegisterCategory, index: usize) -> Option<u16> {
        match category {
            RegisterCategory::Coil => self.coils.get(index).map(|b| u16::from(*b)),
            RegisterCategory::DiscreteInput => {
                self.discrete_inputs.get(index).map(|b| u16::from(*b))
            }
            RegisterCategory::HoldingRegister => self.holding_registers.get(index).copied(),
            RegisterCategory::InputRegister => self.input_registers.get(index).copied(),
        }
    }

    /// Uniform write of one entry without notification.
    ///
    /// Returns `false` and leaves the store untouched when `index` is out of
    /// range.
    pub fn set(&mut self, category: RegisterCategory, index: usize, value: u16) -> bool {
        let slot_found = match category {
            RegisterCategory::Coil => self.coils.get_mut(index).map(|b| *b = value != 0),
            RegisterCategory::DiscreteInput => {
                self.discrete_inputs.get_mut(index).map(|b| *b = value != 0)
            }
            RegisterCategory::HoldingRegister => {
                self.holding_registers.get_mut(index).map(|w| *w = value)
            }
            RegisterCategory::InputRegister => {
                self.input_registers.get_mut(index).map(|w| *w = value)
            }
        };
        slot_found.is_some()
    }

    /// Read `count` bits starting at `start` (function codes 0x01/0x02).
    pub fn read_bits(
        &self,
        category: RegisterCategory,
        start: u16,
        count: u16,
    ) -> Result<Vec<bool>, StoreError> {
        let bits = self.bits(category)?;
        let range = checked_range(category, start, usize::from(count), bits.len())?;
        Ok(bits[range].to_vec())
    }

    /// Read `count` words starting at `start` (function codes 0x03/0x04).
    pub fn read_words(
        &self,
        category: RegisterCategory,
        start: u16,
        count: u16,
    ) -> Result<Vec<u16>, StoreError> {
        let words = self.words(category)?;
        let range = checked_range(category, start, usize::from(count), words.len())?;
        Ok(words[range].to_vec())
    }

    /// Write a run of bits. Either the whole run is written or nothing is.
    pub fn write_bits(
        &mut self,
        category: RegisterCategory,
        start: u16,
        values: &[bool],
    ) -> Result<WriteNotification, StoreError> {
        let bits = self.bits_mut(category)?;
        let range = checked_range(category, start, values.len(), bits.len())?;
        bits[range].copy_from_slice(values);
        Ok(WriteNotification {
            category,
            start,
            length: values.len(),
        })
    }

    /// Write a run of words. Either the whole run is written or nothing is.
    pub fn write_words(
        &mut self,
        category: RegisterCategory,
        start: u16,
        values: &[u16],
    ) -> Result<WriteNotification, StoreError> {
        let words = self.words_mut(category)?;
        let range = checked_range(category, start, values.len(), words.len())?;
        words[range].copy_from_slice(values);
        Ok(WriteNotification {
            category,
            start,
            length: values.len(),
        })
    }
}

fn checked_range(
    category: RegisterCategory,
    start: u16,
    count: usize,
    len: usize,
) -> Result<std::ops::Range<usize>, StoreError> {
    let first = usize::from(start);
    let end = first + count;
    if end > len {
        return Err(StoreError::OutOfRange {
            category,
            start,
            count,
            len,
        });
    }
    Ok(first..end)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn store_with_words(values: &[u16]) -> ProtocolStore {
        let mut store = ProtocolStore::new();
        for value in values {
            store.push(RegisterCategory::HoldingRegister, *value);
        }
        store
    }

    #[test]
    fn test_write_words_returns_notification() {
        let mut store = store_with_words(&[0; 5]);
        let notification = store
            .write_words(RegisterCategory::HoldingRegister, 1, &[7, 8])
            .unwrap();
        assert_eq!(
            notification,
            WriteNotification {
                category: RegisterCategory::HoldingRegister,
                start: 1,
                length: 2
            }
        );
        assert_eq!(notification.indices(), 1..3);
        assert_eq!(
            store
                .read_words(RegisterCategory::HoldingRegister, 0, 5)
                .unwrap(),
            vec![0, 7, 8, 0, 0]
        );
    }

    #[test]
    fn test_write_past_end_rejected_without_partial_write() {
        let mut store = store_with_words(&[1, 2, 3]);
        let err = store
            .write_words(RegisterCategory::HoldingRegister, 2, &[9, 9])
            .unwrap_err();
        assert!(matches!(err, StoreError::OutOfRange { len: 3, .. }));
        assert_eq!(store.get(RegisterCategory::HoldingRegister, 2), Some(3));
    }

    #[test]
    fn test_read_past_end_rejected() {
        let store = store_with_words(&[1, 2, 3]);
        assert!(store
            .read_words(RegisterCategory::HoldingRegister, 3, 1)
            .is_err());
        assert_eq!(
            store
                .read_words(RegisterCategory::HoldingRegister, 3, 0)
                .unwrap(),
            Vec::<u16>::new()
        );
    }

    #[test]
    fn test_bits_and_words_are_not_interchangeable() {
        let mut store = ProtocolStore::new();
        assert_eq!(
            store.write_words(RegisterCategory::Coil, 0, &[1]),
            Err(StoreError::NotWords(RegisterCategory::Coil))
        );
        assert_eq!(
            store.read_bits(RegisterCategory::InputRegister, 0, 1),
            Err(StoreError::NotBits(RegisterCategory::InputRegister))
        );
    }

    #[test]
    fn test_uniform_get_set_on_bits() {
        let mut store = ProtocolStore::new();
        store.push(RegisterCategory::Coil, 0);
        store.push(RegisterCategory::Coil, 5);
        assert_eq!(store.get(RegisterCategory::Coil, 1), Some(1));
        assert!(store.set(RegisterCategory::Coil, 0, 1));
        assert!(!store.set(RegisterCategory::Coil, 2, 1));
        assert_eq!(
            store.read_bits(RegisterCategory::Coil, 0, 2).unwrap(),
            vec![true, true]
        );
    }

    #[test]
    fn test_clear() {
        let mut store = store_with_words(&[1, 2]);
        store.clear(RegisterCategory::HoldingRegister);
        assert!(store.is_empty(RegisterCategory::HoldingRegister));
    }
}
