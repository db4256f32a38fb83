// Copyright (c) 2025 Ronan LE MEILLAT, SCTG Development
// This file is part of the rust-modbus-sim project and is licensed under the
// SCTG Development Non-Commercial License v1.0 (see LICENSE.md for details).

//! Simulated field devices
//!
//! A [`Device`] is a named set of up to four register banks, addressed on the
//! bus by its Modbus unit id. The [`DeviceRegistry`] owns every configured
//! device and remembers which one is currently live in the protocol store.

pub mod registry;

use thiserror::Error;

use crate::register::{RegisterBank, RegisterCategory, RegisterCell, MAX_BANK_SIZE};

pub use registry::{Activation, DeviceRegistry, DEFAULT_UNIT_ID};

/// Errors raised while configuring or addressing devices
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum DeviceError {
    #[error("Invalid unit id {0}: must be between 1 and 255")]
    InvalidUnitId(u8),
    #[error("Device with unit id {0} already exists")]
    DuplicateUnitId(u8),
    #[error("No device with unit id {0}")]
    UnknownDevice(u8),
    #[error("Invalid {category} bank size {count}: must be between 1 and {max}", max = MAX_BANK_SIZE)]
    InvalidBankSize {
        category: RegisterCategory,
        count: usize,
    },
    #[error("Device {unit_id} already has a {category} bank")]
    BankAlreadyInitialized {
        unit_id: u8,
        category: RegisterCategory,
    },
    #[error("Device {unit_id} has no {category} bank")]
    MissingBank {
        unit_id: u8,
        category: RegisterCategory,
    },
    #[error("Index {index} out of range for {category} bank of {len} cells")]
    IndexOutOfRange {
        category: RegisterCategory,
        index: usize,
        len: usize,
    },
}

/// A simulated Modbus device.
#[derive(Debug, Clone)]
pub struct Device {
    unit_id: u8,
    name: String,
    banks: [Option<RegisterBank>; 4],
}

impl Device {
    /// Create a device without any bank.
    ///
    /// Unit id 0 is the Modbus broadcast address and cannot be simulated.
    pub fn new(unit_id: u8) -> Result<Self, DeviceError> {
        Self::with_name(unit_id, format!("Device {}", unit_id))
    }

    pub fn with_name(unit_id: u8, name: impl Into<String>) -> Result<Self, DeviceError> {
        if unit_id == 0 {
            return Err(DeviceError::InvalidUnitId(unit_id));
        }
        Ok(Self {
            unit_id,
            name: name.into(),
            banks: Default::default(),
        })
    }

    pub fn unit_id(&self) -> u8 {
        self.unit_id
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// Create the bank of `category` with `count` zeroed cells.
    ///
    /// Banks are fixed once created, so initializing the same category twice
    /// is rejected.
    pub fn initialize_bank(
        &mut self,
        category: RegisterCategory,
        count: usize,
    ) -> Result<&mut RegisterBank, DeviceError> {
        let slot = &mut self.banks[category.index()];
        if slot.is_some() {
            return Err(DeviceError::BankAlreadyInitialized {
                unit_id: self.unit_id,
                category,
            });
        }
        let bank = RegisterBank::new(category, count)
            .ok_or(DeviceError::InvalidBankSize { category, count })?;
        Ok(slot.insert(bank))
    }

    /// Builder-style variant of [`Device::initialize_bank`].
    pub fn with_bank(mut self, category: RegisterCategory, count: usize) -> Result<Self, DeviceError> {
        self.initialize_bank(category, count)?;
        Ok(self)
    }

    pub fn bank(&self, category: RegisterCategory) -> Option<&RegisterBank> {
        self.banks[category.index()].as_ref()
    }

    pub fn bank_mut(&mut self, category: RegisterCategory) -> Option<&mut RegisterBank> {
        self.banks[category.index()].as_mut()
    }

    /// Categories this device exposes, in function code order.
    pub fn categories(&self) -> impl Iterator<Item = RegisterCategory> + '_ {
        RegisterCategory::ALL
            .into_iter()
            .filter(|category| self.bank(*category).is_some())
    }

    pub fn cell(&self, category: RegisterCategory, index: usize) -> Result<&RegisterCell, DeviceError> {
        let bank = self.bank(category).ok_or(DeviceError::MissingBank {
            unit_id: self.unit_id,
            category,
        })?;
        let len = bank.len();
        bank.get(index)
            .ok_or(DeviceError::IndexOutOfRange { category, index, len })
    }

    pub fn cell_mut(
        &mut self,
        category: RegisterCategory,
        index: usize,
    ) -> Result<&mut RegisterCell, DeviceError> {
        let unit_id = self.unit_id;
        let bank = self
            .bank_mut(category)
            .ok_or(DeviceError::MissingBank { unit_id, category })?;
        let len = bank.len();
        bank.get_mut(index)
            .ok_or(DeviceError::IndexOutOfRange { category, index, len })
    }
}
