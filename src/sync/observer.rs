// Copyright (c) 2025 Ronan LE MEILLAT, SCTG Development
// This file is part of the rust-modbus-sim project and is licensed under the
// SCTG Development Non-Commercial License v1.0 (see LICENSE.md for details).

//! Cell change notifications
//!
//! Whatever displays or records device data (a UI adapter, a test harness,
//! the log) implements [`CellObserver`] and subscribes to the engine.

use log::info;

use crate::register::RegisterCategory;

/// Where a cell change came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChangeOrigin {
    /// Edited locally through the engine API.
    User,
    /// Written by the Modbus client.
    Remote,
}

/// A cell value that actually changed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CellChange {
    pub unit_id: u8,
    pub category: RegisterCategory,
    pub index: usize,
    pub operator_address: u32,
    pub old_value: u16,
    pub new_value: u16,
    pub origin: ChangeOrigin,
}

/// Receives every cell change of every device.
///
/// Observers run while the engine is locked: they must not lock the shared
/// engine themselves. Use a
/// [`RemoteUpdateStatus`](super::RemoteUpdateStatus) handle to find out
/// whether a remote batch is in flight.
pub trait CellObserver: Send + Sync {
    fn on_cell_changed(&self, change: &CellChange);
}

/// Writes each change to the log, the way an operator console would.
#[derive(Debug, Default, Clone, Copy)]
pub struct LoggingObserver;

impl CellObserver for LoggingObserver {
    fn on_cell_changed(&self, change: &CellChange) {
        let source = match change.origin {
            ChangeOrigin::User => "edited",
            ChangeOrigin::Remote => "written by master",
        };
        info!(
            "Device {}: register {:05} {} {} -> {}",
            change.unit_id, change.operator_address, source, change.old_value, change.new_value
        );
    }
}
