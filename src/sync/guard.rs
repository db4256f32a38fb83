// Copyright (c) 2025 Ronan LE MEILLAT, SCTG Development
// This file is part of the rust-modbus-sim project and is licensed under the
// SCTG Development Non-Commercial License v1.0 (see LICENSE.md for details).

//! Remote update guard
//!
//! While a remote write is being applied to device cells, the guard is held.
//! Cell changes observed during that window came from the Modbus client and
//! must not be pushed back into the protocol store.
//!
//! The guard is a scoped token: it is taken with [`RemoteUpdateGuard::acquire`]
//! and released when dropped, which also happens while unwinding from a
//! panicking observer.

use std::sync::{
    atomic::{AtomicBool, Ordering},
    Arc,
};

/// Scoped token marking a remote-originated update in progress.
#[derive(Debug)]
pub struct RemoteUpdateGuard {
    flag: Arc<AtomicBool>,
}

impl RemoteUpdateGuard {
    /// Take the token. Returns `None` if it is already held.
    pub fn acquire(flag: &Arc<AtomicBool>) -> Option<Self> {
        flag.compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .ok()
            .map(|_| Self {
                flag: Arc::clone(flag),
            })
    }
}

impl Drop for RemoteUpdateGuard {
    fn drop(&mut self) {
        self.flag.store(false, Ordering::Release);
    }
}

/// Read-only view of the guard, safe to poll from any thread without
/// locking the engine.
#[derive(Debug, Clone)]
pub struct RemoteUpdateStatus {
    flag: Arc<AtomicBool>,
}

impl RemoteUpdateStatus {
    pub(crate) fn new(flag: Arc<AtomicBool>) -> Self {
        Self { flag }
    }

    /// `true` while a remote write is being applied to device cells.
    pub fn is_updating_from_remote(&self) -> bool {
        self.flag.load(Ordering::Acquire)
    }
}
