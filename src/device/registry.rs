// Copyright (c) 2025 Ronan LE MEILLAT, SCTG Development
// This file is part of the rust-modbus-sim project and is licensed under the
// SCTG Development Non-Commercial License v1.0 (see LICENSE.md for details).

//! Registry of configured devices and of the active unit id.

use std::collections::BTreeMap;

use log::{debug, warn};

use super::{Device, DeviceError};

/// Unit id considered active before anything else is selected.
pub const DEFAULT_UNIT_ID: u8 = 1;

/// Result of [`DeviceRegistry::set_active`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Activation {
    /// The unit was already active; nothing to do.
    Unchanged,
    /// A different, existing device became active and must be loaded.
    Loaded,
    /// The switch was recorded but no device answers to that unit id.
    MissingDevice,
}

/// Owns every simulated device, keyed by unit id.
///
/// Exactly one unit id is active at a time. The active id may point at a
/// unit with no device (for example after the active device was removed).
#[derive(Debug, Clone)]
pub struct DeviceRegistry {
    devices: BTreeMap<u8, Device>,
    active_unit_id: u8,
}

impl Default for DeviceRegistry {
    fn default() -> Self {
        Self::new()
    }
}

impl DeviceRegistry {
    pub fn new() -> Self {
        Self::with_active_unit(DEFAULT_UNIT_ID)
    }

    pub fn with_active_unit(active_unit_id: u8) -> Self {
        Self {
            devices: BTreeMap::new(),
            active_unit_id,
        }
    }

    /// Register a device. Fails if its unit id is already taken.
    pub fn add(&mut self, device: Device) -> Result<(), DeviceError> {
        let unit_id = device.unit_id();
        if self.devices.contains_key(&unit_id) {
            return Err(DeviceError::DuplicateUnitId(unit_id));
        }
        debug!("Registering device {} ({})", unit_id, device.name());
        self.devices.insert(unit_id, device);
        Ok(())
    }

    /// Remove a device and hand it back.
    ///
    /// Removing the active device leaves the active id dangling until
    /// another unit is activated or a device with the same id is added.
    pub fn remove(&mut self, unit_id: u8) -> Result<Device, DeviceError> {
        let device = self
            .devices
            .remove(&unit_id)
            .ok_or(DeviceError::UnknownDevice(unit_id))?;
        if unit_id == self.active_unit_id {
            warn!("Active device {} removed, no device is live", unit_id);
        }
        Ok(device)
    }

    /// Record `unit_id` as active.
    ///
    /// Reselecting the active unit is a no-op so that repeated requests to
    /// the same unit never reload the store.
    pub fn set_active(&mut self, unit_id: u8) -> Activation {
        if self.active_unit_id == unit_id {
            return Activation::Unchanged;
        }
        let previous = std::mem::replace(&mut self.active_unit_id, unit_id);
        if self.devices.contains_key(&unit_id) {
            debug!("Active unit switched from {} to {}", previous, unit_id);
            Activation::Loaded
        } else {
            warn!(
                "Active unit switched from {} to {}, but no such device is configured",
                previous, unit_id
            );
            Activation::MissingDevice
        }
    }

    pub fn active_unit_id(&self) -> u8 {
        self.active_unit_id
    }

    pub fn active_device(&self) -> Option<&Device> {
        self.devices.get(&self.active_unit_id)
    }

    pub fn active_device_mut(&mut self) -> Option<&mut Device> {
        self.devices.get_mut(&self.active_unit_id)
    }

    pub fn get(&self, unit_id: u8) -> Option<&Device> {
        self.devices.get(&unit_id)
    }

    pub fn get_mut(&mut self, unit_id: u8) -> Option<&mut Device> {
        self.devices.get_mut(&unit_id)
    }

    pub fn contains(&self, unit_id: u8) -> bool {
        self.devices.contains_key(&unit_id)
    }

    /// Devices in ascending unit id order.
    pub fn devices(&self) -> impl Iterator<Item = &Device> {
        self.devices.values()
    }

    pub fn unit_ids(&self) -> Vec<u8> {
        self.devices.keys().copied().collect()
    }

    pub fn len(&self) -> usize {
        self.devices.len()
    }

    pub fn is_empty(&self) -> bool {
        self.devices.is_empty()
    }
}
