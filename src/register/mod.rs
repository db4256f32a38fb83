// Copyright (c) 2025 Ronan LE MEILLAT, SCTG Development
// This file is part of the rust-modbus-sim project and is licensed under the
// SCTG Development Non-Commercial License v1.0 (see LICENSE.md for details).

//! Register data model
//!
//! The editable, operator-facing side of a simulated device:
//!
//! - [`RegisterCategory`]: the four Modbus tables with their numbering bases
//! - [`RegisterCell`]: one value slot with fixed operator address and protocol index
//! - [`RegisterBank`]: a fixed-size run of cells of one category
//!
//! ## Addressing
//!
//! ```text
//! protocol index    0      1      2    ...
//! holding register  40001  40002  40003
//! input register    30001  30002  30003
//! discrete input    10001  10002  10003
//! coil              00001  00002  00003
//! ```

pub mod bank;
pub mod category;
pub mod cell;

pub use bank::{RegisterBank, MAX_BANK_SIZE};
pub use category::RegisterCategory;
pub use cell::{RegisterCell, ValueChange};
