// Copyright (c) 2025 Ronan LE MEILLAT, SCTG Development
// This file is part of the rust-modbus-sim project and is licensed under the
// SCTG Development Non-Commercial License v1.0 (see LICENSE.md for details).

//! Device/store synchronization
//!
//! - [`engine`]: the [`SyncEngine`] keeping device cells and the protocol
//!   store consistent in both directions
//! - [`guard`]: the scoped remote update token preventing feedback loops
//! - [`observer`]: cell change notifications

pub mod engine;
pub mod guard;
pub mod observer;

use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

pub use engine::{AddressMapping, SyncEngine, SyncStats};
pub use guard::{RemoteUpdateGuard, RemoteUpdateStatus};
pub use observer::{CellChange, CellObserver, ChangeOrigin, LoggingObserver};

/// Engine shared between the Modbus service and the control side.
pub type SharedSyncEngine = Arc<Mutex<SyncEngine>>;

/// Lock the shared engine.
///
/// A panicking observer poisons the mutex; the poison is ignored and the
/// engine stays usable.
pub fn lock_engine(engine: &SharedSyncEngine) -> MutexGuard<'_, SyncEngine> {
    engine.lock().unwrap_or_else(PoisonError::into_inner)
}
