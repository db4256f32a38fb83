// Copyright (c) 2025 Ronan LE MEILLAT, SCTG Development
// This file is part of the rust-modbus-sim project and is licensed under the
// SCTG Development Non-Commercial License v1.0 (see LICENSE.md for details).

//! Modbus communication module
//!
//! This module provides the Modbus TCP server side of the simulator. Every
//! configured device answers on its own unit id; the addressed device is made
//! live in the shared sync engine before the request is served.
//!
//! ## Key Components
//!
//! - `SimulatorModbusServer`: the `tokio_modbus` service reading and writing the
//!   protocol store and forwarding writes to the device cells.
//!
//! ## Usage
//!
//! The Modbus server is normally started by the daemon:
//!
//! ```no_run
//! use rust_modbus_sim::config::Config;
//! use rust_modbus_sim::daemon::launch_daemon::Daemon;
//!
//! # async fn run() -> anyhow::Result<()> {
//! let config = Config::default();
//! let engine = config.build_engine()?.into_shared();
//! let mut daemon = Daemon::new();
//! daemon.launch(&config, engine).await?;
//! # Ok(())
//! # }
//! ```
//!
//! ## Supported function codes
//!
//! - 0x01 Read Coils, 0x02 Read Discrete Inputs
//! - 0x03 Read Holding Registers, 0x04 Read Input Registers
//! - 0x05 Write Single Coil, 0x0F Write Multiple Coils
//! - 0x06 Write Single Register, 0x10 Write Multiple Registers
//! - 0x16 Mask Write Register, 0x17 Read/Write Multiple Registers
//!
//! Addresses on the wire are 0-based store indices. Any other function code is
//! answered with an illegal function exception.

pub mod modbus_server;
pub use modbus_server::SimulatorModbusServer;
