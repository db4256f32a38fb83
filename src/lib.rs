// Copyright (c) 2025 Ronan LE MEILLAT, SCTG Development
// This file is part of the rust-modbus-sim project and is licensed under the
// SCTG Development Non-Commercial License v1.0 (see LICENSE.md for details).

//! Rust Modbus device simulator library
//!
//! Simulates several Modbus slave devices behind one TCP endpoint. Each device
//! owns editable register banks; the one addressed by the last request is
//! live in a shared protocol store, and a sync engine keeps cells and store
//! consistent in both directions.
//!
//! - [`register`]: register categories, cells and banks
//! - [`device`]: devices and the device registry
//! - [`store`]: the protocol-facing tables
//! - [`sync`]: the synchronization engine
//! - [`modbus`]: the `tokio-modbus` service
//! - [`config`]: YAML configuration
//! - [`daemon`]: background tasks

pub mod config;
pub mod daemon;
pub mod device;
pub mod modbus;
pub mod register;
pub mod store;
pub mod sync;
