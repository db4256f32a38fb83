// Copyright (c) 2025 Ronan LE MEILLAT, SCTG Development
// This file is part of the rust-modbus-sim project and is licensed under the
// SCTG Development Non-Commercial License v1.0 (see LICENSE.md for details).

//! Bidirectional register synchronization engine
//!
//! The engine reconciles the editable per-device register model with the
//! single protocol-facing store a Modbus client reads and writes.
//!
//! ## Index convention
//!
//! Device cell `i` always corresponds to store index `i`, with no reserved
//! pad entry: in full loads, in incremental updates from remote writes and
//! in propagation of local edits. Operator addresses never take part in
//! store addressing; they are `base + i` for display only.
//!
//! ## Paths
//!
//! ```text
//!            set_cell_value                     remote_write_*
//!   user ─────────────────> cell ──┐   ┌── store <──────────── Modbus client
//!                                  │   │     │
//!                     observers <──┤   │     │ WriteNotification
//!                                  │   │     v
//!          propagate_cell_change <─┘   └─ apply_remote_write (guard held)
//!                 │                                │
//!                 └──> store (skipped while guard) └──> cells ──> observers
//! ```

use std::sync::{
    atomic::{AtomicBool, Ordering},
    Arc, Mutex,
};

use log::{debug, info, warn};
use serde::Serialize;

use crate::device::{Activation, Device, DeviceError, DeviceRegistry};
use crate::register::RegisterCategory;
use crate::store::{ProtocolStore, StoreError, WriteNotification};

use super::guard::{RemoteUpdateGuard, RemoteUpdateStatus};
use super::observer::{CellChange, CellObserver, ChangeOrigin};
use super::SharedSyncEngine;

/// Counters describing what the engine has done since it was created
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct SyncStats {
    /// Store reloads from a device (activation or explicit reload)
    pub full_loads: u64,
    /// Write notifications processed
    pub remote_writes: u64,
    /// Device cells changed by remote writes
    pub cells_updated_from_remote: u64,
    /// Local edits written into the store
    pub propagated_edits: u64,
    /// Changes not pushed back because they came from a remote write
    pub suppressed_echoes: u64,
    /// Indices ignored because they were beyond the bank or the store
    pub skipped_out_of_range: u64,
}

/// One row of the address mapping diagnostic.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct AddressMapping {
    /// Protocol index, identical for the cell and the store entry
    pub index: usize,
    pub operator_address: u32,
    pub cell_value: u16,
    /// `None` when the device is not live or the store is shorter
    pub store_value: Option<u16>,
}

/// Synchronization engine between device cells and the protocol store.
///
/// All operations take `&mut self`; share the engine between the Modbus
/// listener and the control side as a [`SharedSyncEngine`] so that each
/// operation runs as one critical section.
pub struct SyncEngine {
    registry: DeviceRegistry,
    store: ProtocolStore,
    remote_update: Arc<AtomicBool>,
    observers: Vec<Arc<dyn CellObserver>>,
    stats: SyncStats,
}

impl SyncEngine {
    /// Create an engine over `registry` and load the active device, if any.
    pub fn new(registry: DeviceRegistry) -> Self {
        let mut engine = Self {
            registry,
            store: ProtocolStore::new(),
            remote_update: Arc::new(AtomicBool::new(false)),
            observers: Vec::new(),
            stats: SyncStats::default(),
        };
        engine.full_load();
        engine
    }

    /// Wrap the engine for sharing between tasks.
    pub fn into_shared(self) -> SharedSyncEngine {
        Arc::new(Mutex::new(self))
    }

    /// Register an observer for every cell change.
    pub fn subscribe(&mut self, observer: Arc<dyn CellObserver>) {
        self.observers.push(observer);
    }

    pub fn registry(&self) -> &DeviceRegistry {
        &self.registry
    }

    /// Read access to the protocol-facing tables.
    pub fn store(&self) -> &ProtocolStore {
        &self.store
    }

    /// Direct access to the protocol-facing tables, as the protocol engine
    /// has it. Writes made here do not notify the engine; follow them with
    /// [`SyncEngine::apply_remote_write`] to reflect them in the cells.
    pub fn store_mut(&mut self) -> &mut ProtocolStore {
        &mut self.store
    }

    pub fn current_unit_id(&self) -> u8 {
        self.registry.active_unit_id()
    }

    pub fn is_updating_from_remote(&self) -> bool {
        self.remote_update.load(Ordering::Acquire)
    }

    /// Lock-free handle on the remote update guard.
    pub fn remote_update_status(&self) -> RemoteUpdateStatus {
        RemoteUpdateStatus::new(Arc::clone(&self.remote_update))
    }

    pub fn stats(&self) -> SyncStats {
        self.stats
    }

    /// Add a device. If its unit id is the active one, it goes live at once.
    pub fn add_device(&mut self, device: Device) -> Result<(), DeviceError> {
        let unit_id = device.unit_id();
        self.registry.add(device)?;
        info!("Device {} added", unit_id);
        if unit_id == self.registry.active_unit_id() {
            self.full_load();
        }
        Ok(())
    }

    /// Remove a device. The store keeps its last contents.
    pub fn remove_device(&mut self, unit_id: u8) -> Result<Device, DeviceError> {
        let device = self.registry.remove(unit_id)?;
        info!("Device {} removed", unit_id);
        Ok(device)
    }

    /// Make `unit_id` the live device.
    ///
    /// Selecting the unit that is already active does nothing at all. A
    /// different, existing device replaces the whole store contents.
    pub fn set_active(&mut self, unit_id: u8) -> Activation {
        let activation = self.registry.set_active(unit_id);
        if activation == Activation::Loaded {
            self.full_load();
        }
        activation
    }

    /// Reload the store from the active device.
    pub fn reload(&mut self) -> Result<(), DeviceError> {
        let unit_id = self.registry.active_unit_id();
        if !self.registry.contains(unit_id) {
            return Err(DeviceError::UnknownDevice(unit_id));
        }
        self.full_load();
        Ok(())
    }

    /// Replace every store table by the active device's cell values.
    ///
    /// Tables of categories the device does not have are left empty, so the
    /// store never mixes data of two devices.
    fn full_load(&mut self) {
        let Some(device) = self.registry.active_device() else {
            return;
        };
        for category in RegisterCategory::ALL {
            self.store.clear(category);
            if let Some(bank) = device.bank(category) {
                for value in bank.values() {
                    self.store.push(category, category.clamp(i64::from(value)));
                }
            }
        }
        self.stats.full_loads += 1;
        info!(
            "Device {} ({}) loaded: {} coils, {} discrete inputs, {} holding registers, {} input registers",
            device.unit_id(),
            device.name(),
            self.store.len(RegisterCategory::Coil),
            self.store.len(RegisterCategory::DiscreteInput),
            self.store.len(RegisterCategory::HoldingRegister),
            self.store.len(RegisterCategory::InputRegister),
        );
    }

    /// Local edit of a device cell.
    ///
    /// The value is clamped into the category's domain. When it changes, the
    /// change is sent to every observer and then propagated into the store if
    /// the device is live. Returns the change, or `None` for a no-op.
    pub fn set_cell_value(
        &mut self,
        unit_id: u8,
        category: RegisterCategory,
        index: usize,
        value: i64,
    ) -> Result<Option<CellChange>, DeviceError> {
        let cell = self
            .registry
            .get_mut(unit_id)
            .ok_or(DeviceError::UnknownDevice(unit_id))?
            .cell_mut(category, index)?;
        let Some(value_change) = cell.set_value(value) else {
            return Ok(None);
        };
        let change = CellChange {
            unit_id,
            category,
            index,
            operator_address: cell.operator_address(),
            old_value: value_change.old_value,
            new_value: value_change.new_value,
            origin: ChangeOrigin::User,
        };
        self.dispatch(&change);
        Ok(Some(change))
    }

    /// Push a cell change into the store.
    ///
    /// Runs for every change the engine dispatches. Skipped while a remote
    /// update is in flight, for devices that are not live, and for indices
    /// beyond the store. Returns `true` when the store was written.
    pub fn propagate_cell_change(&mut self, change: &CellChange) -> bool {
        if self.is_updating_from_remote() {
            self.stats.suppressed_echoes += 1;
            debug!(
                "Remote update in progress, not echoing {:05} back to the store",
                change.operator_address
            );
            return false;
        }
        if change.unit_id != self.registry.active_unit_id() {
            debug!(
                "Device {} is not live, {:05} kept in its cells only",
                change.unit_id, change.operator_address
            );
            return false;
        }
        let value = change.category.clamp(i64::from(change.new_value));
        if self.store.set(change.category, change.index, value) {
            self.stats.propagated_edits += 1;
            true
        } else {
            self.stats.skipped_out_of_range += 1;
            debug!(
                "{} index {} beyond store size {}, edit not propagated",
                change.category.label(),
                change.index,
                self.store.len(change.category)
            );
            false
        }
    }

    /// Reflect a remote write into the active device's cells.
    ///
    /// The remote update guard is held for the whole operation, including
    /// observer callbacks, so the resulting cell changes are not echoed back.
    /// Indices outside the bank or the store are skipped. Returns the number
    /// of cells that changed.
    pub fn apply_remote_write(&mut self, notification: WriteNotification) -> usize {
        let Some(_guard) = RemoteUpdateGuard::acquire(&self.remote_update) else {
            warn!(
                "Remote update already in progress, notification {:?} dropped",
                notification
            );
            return 0;
        };
        self.stats.remote_writes += 1;

        let unit_id = self.registry.active_unit_id();
        let category = notification.category;
        let Some(bank) = self
            .registry
            .active_device_mut()
            .and_then(|device| device.bank_mut(category))
        else {
            debug!(
                "Remote {} write on unit {} has no matching device bank",
                category.label(),
                unit_id
            );
            return 0;
        };

        let store_len = self.store.len(category);
        let mut skipped = 0;
        let mut changes = Vec::new();
        for index in notification.indices() {
            let (Some(remote_value), Some(cell)) =
                (self.store.get(category, index), bank.get_mut(index))
            else {
                skipped += 1;
                continue;
            };
            if let Some(value_change) = cell.set_value(i64::from(remote_value)) {
                changes.push(CellChange {
                    unit_id,
                    category,
                    index,
                    operator_address: cell.operator_address(),
                    old_value: value_change.old_value,
                    new_value: value_change.new_value,
                    origin: ChangeOrigin::Remote,
                });
            }
        }
        if skipped > 0 {
            debug!(
                "{} of {} remote {} indices out of range on unit {}",
                skipped,
                notification.length,
                category.label(),
                unit_id
            );
        }
        self.stats.skipped_out_of_range += skipped;
        self.stats.cells_updated_from_remote += changes.len() as u64;

        for change in &changes {
            self.dispatch(change);
        }
        changes.len()
    }

    /// Remote write of bits followed by its notification.
    pub fn remote_write_bits(
        &mut self,
        category: RegisterCategory,
        start: u16,
        values: &[bool],
    ) -> Result<WriteNotification, StoreError> {
        let notification = self.store.write_bits(category, start, values)?;
        self.apply_remote_write(notification);
        Ok(notification)
    }

    /// Remote write of words followed by its notification.
    pub fn remote_write_words(
        &mut self,
        category: RegisterCategory,
        start: u16,
        values: &[u16],
    ) -> Result<WriteNotification, StoreError> {
        let notification = self.store.write_words(category, start, values)?;
        self.apply_remote_write(notification);
        Ok(notification)
    }

    /// Side-by-side view of the first `limit` cells of a bank and the store
    /// entries they map to.
    pub fn address_mapping(
        &self,
        unit_id: u8,
        category: RegisterCategory,
        limit: usize,
    ) -> Result<Vec<AddressMapping>, DeviceError> {
        let device = self
            .registry
            .get(unit_id)
            .ok_or(DeviceError::UnknownDevice(unit_id))?;
        let bank = device
            .bank(category)
            .ok_or(DeviceError::MissingBank { unit_id, category })?;
        let live = unit_id == self.registry.active_unit_id();
        Ok(bank
            .iter()
            .take(limit)
            .enumerate()
            .map(|(index, cell)| AddressMapping {
                index,
                operator_address: cell.operator_address(),
                cell_value: cell.value(),
                store_value: live.then(|| self.store.get(category, index)).flatten(),
            })
            .collect())
    }

    /// Propagate, then notify: observers see the store already updated.
    fn dispatch(&mut self, change: &CellChange) {
        self.propagate_cell_change(change);
        for observer in &self.observers {
            observer.on_cell_changed(change);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Mutex;

    use crate::register::RegisterCategory::{Coil, HoldingRegister};
    use crate::register::MAX_BANK_SIZE;

    fn device(unit_id: u8, holding: &[u16]) -> Device {
        let mut device = Device::new(unit_id)
            .unwrap()
            .with_bank(HoldingRegister, holding.len())
            .unwrap();
        for (index, value) in holding.iter().enumerate() {
            device
                .cell_mut(HoldingRegister, index)
                .unwrap()
                .set_value(i64::from(*value));
        }
        device
    }

    fn engine_with(devices: Vec<Device>) -> SyncEngine {
        let mut registry = DeviceRegistry::new();
        for device in devices {
            registry.add(device).unwrap();
        }
        SyncEngine::new(registry)
    }

    fn holding(engine: &SyncEngine) -> Vec<u16> {
        let len = engine.store().len(HoldingRegister) as u16;
        engine.store().read_words(HoldingRegister, 0, len).unwrap()
    }

    #[derive(Default)]
    struct RecordingObserver {
        changes: Mutex<Vec<CellChange>>,
        remote_flags: Mutex<Vec<bool>>,
        status: Mutex<Option<RemoteUpdateStatus>>,
    }

    impl CellObserver for RecordingObserver {
        fn on_cell_changed(&self, change: &CellChange) {
            self.changes.lock().unwrap().push(*change);
            if let Some(status) = self.status.lock().unwrap().as_ref() {
                self.remote_flags
                    .lock()
                    .unwrap()
                    .push(status.is_updating_from_remote());
            }
        }
    }

    fn recording(engine: &mut SyncEngine) -> Arc<RecordingObserver> {
        let observer = Arc::new(RecordingObserver::default());
        *observer.status.lock().unwrap() = Some(engine.remote_update_status());
        engine.subscribe(observer.clone());
        observer
    }

    #[test]
    fn test_new_loads_active_device() {
        let engine = engine_with(vec![device(1, &[10, 20, 30])]);
        assert_eq!(engine.current_unit_id(), 1);
        assert_eq!(holding(&engine), vec![10, 20, 30]);
        assert!(engine.store().is_empty(Coil));
        assert_eq!(engine.stats().full_loads, 1);
    }

    #[test]
    fn test_reselecting_active_unit_does_not_reload() {
        let mut engine = engine_with(vec![device(1, &[10, 20, 30])]);
        assert!(engine.store_mut().set(HoldingRegister, 0, 99));

        assert_eq!(engine.set_active(1), Activation::Unchanged);
        assert_eq!(holding(&engine), vec![99, 20, 30]);
        assert_eq!(engine.stats().full_loads, 1);
    }

    #[test]
    fn test_remote_write_reaches_cell_without_echo() {
        let mut engine = engine_with(vec![device(1, &[0; 10])]);
        let observer = recording(&mut engine);

        let notification = engine
            .remote_write_words(HoldingRegister, 2, &[500])
            .unwrap();
        assert_eq!(notification.indices(), 2..3);

        let cell = engine.registry().get(1).unwrap().cell(HoldingRegister, 2).unwrap();
        assert_eq!(cell.value(), 500);
        assert_eq!(holding(&engine)[2], 500);

        let changes = observer.changes.lock().unwrap();
        assert_eq!(changes.len(), 1);
        assert_eq!(changes[0].origin, ChangeOrigin::Remote);
        assert_eq!(changes[0].operator_address, 40003);
        assert_eq!(changes[0].new_value, 500);
        assert_eq!(*observer.remote_flags.lock().unwrap(), vec![true]);

        let stats = engine.stats();
        assert_eq!(stats.remote_writes, 1);
        assert_eq!(stats.cells_updated_from_remote, 1);
        assert_eq!(stats.suppressed_echoes, 1);
        assert_eq!(stats.propagated_edits, 0);
        assert!(!engine.is_updating_from_remote());
    }

    #[test]
    fn test_remote_write_with_same_value_is_silent() {
        let mut engine = engine_with(vec![device(1, &[7, 7])]);
        let observer = recording(&mut engine);
        engine.remote_write_words(HoldingRegister, 0, &[7, 7]).unwrap();
        assert!(observer.changes.lock().unwrap().is_empty());
        assert_eq!(engine.stats().cells_updated_from_remote, 0);
    }

    #[test]
    fn test_user_edit_propagates_to_store() {
        let mut engine = engine_with(vec![device(1, &[0; 10])]);
        let observer = recording(&mut engine);

        let change = engine
            .set_cell_value(1, HoldingRegister, 0, 123)
            .unwrap()
            .unwrap();
        assert_eq!(change.origin, ChangeOrigin::User);
        assert_eq!(change.operator_address, 40001);
        assert_eq!(holding(&engine)[0], 123);
        assert_eq!(*observer.remote_flags.lock().unwrap(), vec![false]);
        assert_eq!(engine.stats().propagated_edits, 1);

        // Same value again: no change, no notification
        assert_eq!(engine.set_cell_value(1, HoldingRegister, 0, 123), Ok(None));
        assert_eq!(observer.changes.lock().unwrap().len(), 1);
    }

    #[test]
    fn test_edits_are_clamped() {
        let mut engine = engine_with(vec![device(1, &[1, 1]).with_bank(Coil, 1).unwrap()]);

        engine.set_cell_value(1, HoldingRegister, 0, -5).unwrap();
        engine.set_cell_value(1, HoldingRegister, 1, 70_000).unwrap();
        assert_eq!(holding(&engine), vec![0, 65535]);

        engine.set_cell_value(1, Coil, 0, 7).unwrap();
        let cell = engine.registry().get(1).unwrap().cell(Coil, 0).unwrap();
        assert_eq!(cell.value(), 1);
        assert_eq!(engine.store().read_bits(Coil, 0, 1).unwrap(), vec![true]);
    }

    #[test]
    fn test_edit_errors() {
        let mut engine = engine_with(vec![device(1, &[0; 2])]);
        assert_eq!(
            engine.set_cell_value(5, HoldingRegister, 0, 1),
            Err(DeviceError::UnknownDevice(5))
        );
        assert!(matches!(
            engine.set_cell_value(1, HoldingRegister, 2, 1),
            Err(DeviceError::IndexOutOfRange { index: 2, len: 2, .. })
        ));
        assert!(matches!(
            engine.set_cell_value(1, Coil, 0, 1),
            Err(DeviceError::MissingBank { unit_id: 1, .. })
        ));
    }

    #[test]
    fn test_address_mapping_uses_operator_numbering() {
        let engine = engine_with(vec![device(1, &[5; 10])]);
        let mapping = engine.address_mapping(1, HoldingRegister, 100).unwrap();
        assert_eq!(mapping.len(), 10);
        assert_eq!(mapping[0].operator_address, 40001);
        assert_eq!(mapping[9].operator_address, 40010);
        assert_eq!(mapping[9].index, 9);
        assert_eq!(mapping[9].store_value, Some(5));

        let first = engine.address_mapping(1, HoldingRegister, 3).unwrap();
        assert_eq!(first.len(), 3);
    }

    #[test]
    fn test_full_load_never_blends_devices() {
        let a = device(1, &[1; 10]).with_bank(Coil, 5).unwrap();
        let b = device(2, &[2, 2, 2]);
        let mut engine = engine_with(vec![a, b]);
        assert_eq!(engine.store().len(Coil), 5);

        assert_eq!(engine.set_active(2), Activation::Loaded);
        assert_eq!(holding(&engine), vec![2, 2, 2]);
        assert!(engine.store().is_empty(Coil));

        assert_eq!(engine.set_active(1), Activation::Loaded);
        assert_eq!(holding(&engine), vec![1; 10]);
        assert_eq!(engine.store().len(Coil), 5);
        assert_eq!(engine.stats().full_loads, 3);
    }

    #[test]
    fn test_switch_to_missing_device_keeps_store() {
        let mut engine = engine_with(vec![device(1, &[4, 4])]);
        assert_eq!(engine.set_active(9), Activation::MissingDevice);
        assert_eq!(engine.current_unit_id(), 9);
        assert_eq!(holding(&engine), vec![4, 4]);
        assert_eq!(engine.reload(), Err(DeviceError::UnknownDevice(9)));

        // Remote writes with no live device touch the store only
        engine.remote_write_words(HoldingRegister, 0, &[8]).unwrap();
        assert_eq!(holding(&engine), vec![8, 4]);
        let cell = engine.registry().get(1).unwrap().cell(HoldingRegister, 0).unwrap();
        assert_eq!(cell.value(), 4);
    }

    #[test]
    fn test_remote_write_beyond_bank_is_skipped() {
        let mut engine = engine_with(vec![device(1, &[0; 10])]);
        engine.store_mut().push(HoldingRegister, 0);
        engine.store_mut().push(HoldingRegister, 0);

        let changed = {
            let notification = engine
                .store_mut()
                .write_words(HoldingRegister, 8, &[1, 2, 3, 4])
                .unwrap();
            engine.apply_remote_write(notification)
        };
        assert_eq!(changed, 2);
        let device = engine.registry().get(1).unwrap();
        assert_eq!(device.cell(HoldingRegister, 8).unwrap().value(), 1);
        assert_eq!(device.cell(HoldingRegister, 9).unwrap().value(), 2);
        assert_eq!(engine.stats().skipped_out_of_range, 2);

        // Notification past the store end as well
        let changed = engine.apply_remote_write(WriteNotification {
            category: HoldingRegister,
            start: 11,
            length: 40,
        });
        assert_eq!(changed, 0);
    }

    #[test]
    fn test_edit_of_inactive_device_stays_in_cells() {
        let mut engine = engine_with(vec![device(1, &[0; 3]), device(2, &[0; 3])]);

        engine.set_cell_value(2, HoldingRegister, 1, 77).unwrap();
        assert_eq!(holding(&engine), vec![0, 0, 0]);
        assert_eq!(engine.current_unit_id(), 1);

        engine.set_active(2);
        assert_eq!(holding(&engine), vec![0, 77, 0]);
    }

    #[test]
    fn test_add_device_for_active_unit_loads_it() {
        let mut engine = SyncEngine::new(DeviceRegistry::with_active_unit(3));
        assert_eq!(engine.stats().full_loads, 0);

        engine.add_device(device(4, &[4])).unwrap();
        assert!(engine.store().is_empty(HoldingRegister));

        engine.add_device(device(3, &[3, 3])).unwrap();
        assert_eq!(holding(&engine), vec![3, 3]);
        assert_eq!(
            engine.add_device(device(3, &[0])),
            Err(DeviceError::DuplicateUnitId(3))
        );
    }

    #[test]
    fn test_remove_active_device_keeps_store() {
        let mut engine = engine_with(vec![device(1, &[6, 6])]);
        engine.remove_device(1).unwrap();
        assert_eq!(engine.current_unit_id(), 1);
        assert_eq!(holding(&engine), vec![6, 6]);
        assert_eq!(engine.reload(), Err(DeviceError::UnknownDevice(1)));
    }

    struct PanickingObserver;

    impl CellObserver for PanickingObserver {
        fn on_cell_changed(&self, change: &CellChange) {
            if change.origin == ChangeOrigin::Remote {
                panic!("display failure");
            }
        }
    }

    #[test]
    fn test_panicking_observer_releases_guard() {
        let mut engine = engine_with(vec![device(1, &[0; 4])]);
        engine.subscribe(Arc::new(PanickingObserver));

        let result = std::panic::catch_unwind(std::panic::AssertUnwindSafe(|| {
            engine.remote_write_words(HoldingRegister, 0, &[9]).unwrap();
        }));
        assert!(result.is_err());
        assert!(!engine.is_updating_from_remote());

        // Local edits still reach the store afterwards
        engine.set_cell_value(1, HoldingRegister, 1, 42).unwrap();
        assert_eq!(holding(&engine)[1], 42);
    }

    #[test]
    fn test_propagation_is_suppressed_while_remote_update_runs() {
        let mut engine = engine_with(vec![device(1, &[0; 2])]);
        let change = CellChange {
            unit_id: 1,
            category: HoldingRegister,
            index: 0,
            operator_address: 40001,
            old_value: 0,
            new_value: 11,
            origin: ChangeOrigin::User,
        };

        let guard = RemoteUpdateGuard::acquire(&engine.remote_update).unwrap();
        assert!(!engine.propagate_cell_change(&change));
        assert_eq!(
            engine.apply_remote_write(WriteNotification {
                category: HoldingRegister,
                start: 0,
                length: 1
            }),
            0
        );
        drop(guard);

        assert!(engine.propagate_cell_change(&change));
        assert_eq!(holding(&engine)[0], 11);
    }

    #[test]
    fn test_remote_write_over_full_address_space() {
        let mut engine = engine_with(vec![device(1, &[0; MAX_BANK_SIZE])]);

        let notification = engine
            .remote_write_words(HoldingRegister, 0, &vec![7; MAX_BANK_SIZE])
            .unwrap();
        assert_eq!(notification.length, MAX_BANK_SIZE);
        assert_eq!(notification.indices(), 0..MAX_BANK_SIZE);

        let device = engine.registry().get(1).unwrap();
        assert_eq!(device.cell(HoldingRegister, 0).unwrap().value(), 7);
        assert_eq!(device.cell(HoldingRegister, MAX_BANK_SIZE - 1).unwrap().value(), 7);
        assert_eq!(engine.stats().cells_updated_from_remote, MAX_BANK_SIZE as u64);
    }

    #[test]
    fn test_full_load_restores_edits_and_remote_writes() {
        let mut engine = engine_with(vec![device(1, &[0; 4]), device(2, &[5; 2])]);

        engine.set_cell_value(1, HoldingRegister, 0, 111).unwrap();
        engine.set_cell_value(1, HoldingRegister, 1, 222).unwrap();
        engine.set_cell_value(1, HoldingRegister, 2, 333).unwrap();
        engine.remote_write_words(HoldingRegister, 3, &[13]).unwrap();
        assert_eq!(holding(&engine), vec![111, 222, 333, 13]);

        assert_eq!(engine.set_active(2), Activation::Loaded);
        assert_eq!(holding(&engine), vec![5, 5]);

        assert_eq!(engine.set_active(1), Activation::Loaded);
        assert_eq!(holding(&engine), vec![111, 222, 333, 13]);
    }

    struct FailingUserObserver;

    impl CellObserver for FailingUserObserver {
        fn on_cell_changed(&self, change: &CellChange) {
            if change.origin == ChangeOrigin::User {
                panic!("display failure");
            }
        }
    }

    #[test]
    fn test_user_edit_reaches_store_before_observers() {
        let mut engine = engine_with(vec![device(1, &[0; 3])]);
        engine.subscribe(Arc::new(FailingUserObserver));

        let result = std::panic::catch_unwind(std::panic::AssertUnwindSafe(|| {
            engine.set_cell_value(1, HoldingRegister, 2, 64).unwrap();
        }));
        assert!(result.is_err());

        let cell = engine.registry().get(1).unwrap().cell(HoldingRegister, 2).unwrap();
        assert_eq!(cell.value(), 64);
        assert_eq!(holding(&engine), vec![0, 0, 64]);
        assert_eq!(engine.stats().propagated_edits, 1);
    }
}
