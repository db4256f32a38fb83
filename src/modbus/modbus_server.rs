// Copyright (c) 2025 Ronan LE MEILLAT, SCTG Development
// This file is part of the rust-modbus-sim project and is licensed under the
// SCTG Development Non-Commercial License v1.0 (see LICENSE.md for details).

//! Modbus server implementation for the device simulator
//!
//! For avoiding confusion with the Modbus master/slave terminology, this module uses
//! the terms "server" and "client" instead. The server is the simulator answering
//! requests, the client is the master polling it.
//!
//! Each request carries a unit id. Before the request is served, that unit becomes
//! the live device of the [`SyncEngine`](crate::sync::SyncEngine), which reloads the
//! protocol store only when the unit actually changes.

use std::future;

use log::{debug, error, warn};
use tokio_modbus::prelude::*;

use crate::register::RegisterCategory;
use crate::store::StoreError;
use crate::sync::{lock_engine, SharedSyncEngine, SyncEngine};

/// Largest bit count a single read may ask for (0x01/0x02).
pub const MAX_READ_BITS: u16 = 2000;
/// Largest register count a single read may ask for (0x03/0x04/0x17).
pub const MAX_READ_WORDS: u16 = 125;
/// Largest coil count a single write may carry (0x0F).
pub const MAX_WRITE_BITS: usize = 1968;
/// Largest register count a single write may carry (0x10).
pub const MAX_WRITE_WORDS: usize = 123;
/// Largest register count the write half of a read/write may carry (0x17).
pub const MAX_READ_WRITE_WORDS: usize = 121;

/// Modbus service serving the live device of a shared sync engine.
#[derive(Clone)]
pub struct SimulatorModbusServer {
    engine: SharedSyncEngine,
    reject_unknown_units: bool,
}

impl tokio_modbus::server::Service for SimulatorModbusServer {
    type Request = SlaveRequest<'static>;
    type Response = Response;
    type Exception = ExceptionCode;
    type Future = future::Ready<Result<Self::Response, Self::Exception>>;

    fn call(&self, req: Self::Request) -> Self::Future {
        future::ready(self.handle(req))
    }
}

impl SimulatorModbusServer {
    /// Create a service over `engine`.
    ///
    /// With `reject_unknown_units`, requests addressed to a unit id with no
    /// configured device are answered with a gateway target exception instead
    /// of being served from the current store.
    pub fn new(engine: SharedSyncEngine, reject_unknown_units: bool) -> Self {
        Self {
            engine,
            reject_unknown_units,
        }
    }

    pub fn engine(&self) -> &SharedSyncEngine {
        &self.engine
    }

    /// Serve one request. The engine stays locked for the whole request.
    pub fn handle(&self, req: SlaveRequest<'_>) -> Result<Response, ExceptionCode> {
        let SlaveRequest { slave, request } = req;
        let mut engine = lock_engine(&self.engine);
        self.select_unit(&mut engine, slave)?;
        debug!(
            "SERVER: unit {} {}",
            engine.current_unit_id(),
            function_name(&request)
        );

        match request {
            Request::ReadCoils(addr, cnt) => {
                read_bits(&engine, RegisterCategory::Coil, addr, cnt).map(Response::ReadCoils)
            }
            Request::ReadDiscreteInputs(addr, cnt) => {
                read_bits(&engine, RegisterCategory::DiscreteInput, addr, cnt)
                    .map(Response::ReadDiscreteInputs)
            }
            Request::ReadHoldingRegisters(addr, cnt) => {
                read_words(&engine, RegisterCategory::HoldingRegister, addr, cnt)
                    .map(Response::ReadHoldingRegisters)
            }
            Request::ReadInputRegisters(addr, cnt) => {
                read_words(&engine, RegisterCategory::InputRegister, addr, cnt)
                    .map(Response::ReadInputRegisters)
            }
            Request::WriteSingleCoil(addr, value) => engine
                .remote_write_bits(RegisterCategory::Coil, addr, std::slice::from_ref(&value))
                .map(|_| Response::WriteSingleCoil(addr, value))
                .map_err(store_exception),
            Request::WriteMultipleCoils(addr, values) => {
                check_quantity(values.len(), MAX_WRITE_BITS)?;
                engine
                    .remote_write_bits(RegisterCategory::Coil, addr, &values)
                    .map(|_| Response::WriteMultipleCoils(addr, values.len() as u16))
                    .map_err(store_exception)
            }
            Request::WriteSingleRegister(addr, value) => engine
                .remote_write_words(
                    RegisterCategory::HoldingRegister,
                    addr,
                    std::slice::from_ref(&value),
                )
                .map(|_| Response::WriteSingleRegister(addr, value))
                .map_err(store_exception),
            Request::WriteMultipleRegisters(addr, values) => {
                check_quantity(values.len(), MAX_WRITE_WORDS)?;
                engine
                    .remote_write_words(RegisterCategory::HoldingRegister, addr, &values)
                    .map(|_| Response::WriteMultipleRegisters(addr, values.len() as u16))
                    .map_err(store_exception)
            }
            Request::ReadWriteMultipleRegisters(read_addr, read_cnt, write_addr, values) => {
                check_quantity(values.len(), MAX_READ_WRITE_WORDS)?;
                // Both ranges are checked before anything is written
                read_words(&engine, RegisterCategory::HoldingRegister, read_addr, read_cnt)?;
                engine
                    .remote_write_words(RegisterCategory::HoldingRegister, write_addr, &values)
                    .map_err(store_exception)?;
                read_words(&engine, RegisterCategory::HoldingRegister, read_addr, read_cnt)
                    .map(Response::ReadWriteMultipleRegisters)
            }
            Request::MaskWriteRegister(addr, and_mask, or_mask) => {
                let current = engine
                    .store()
                    .get(RegisterCategory::HoldingRegister, usize::from(addr))
                    .ok_or_else(|| {
                        error!("SERVER: Exception::IllegalDataAddress - mask write at {addr}");
                        ExceptionCode::IllegalDataAddress
                    })?;
                let value = mask_write(current, and_mask, or_mask);
                engine
                    .remote_write_words(RegisterCategory::HoldingRegister, addr, &[value])
                    .map(|_| Response::MaskWriteRegister(addr, and_mask, or_mask))
                    .map_err(store_exception)
            }
            request => {
                error!("SERVER: Exception::IllegalFunction - Unimplemented function code in request: {request:?}");
                Err(ExceptionCode::IllegalFunction)
            }
        }
    }

    /// Make the addressed unit live. Unit 0 (broadcast) keeps the current one.
    fn select_unit(&self, engine: &mut SyncEngine, unit_id: u8) -> Result<(), ExceptionCode> {
        if unit_id != 0 && unit_id != engine.current_unit_id() {
            if self.reject_unknown_units && !engine.registry().contains(unit_id) {
                warn!("SERVER: Exception::GatewayTargetDevice - no device with unit id {unit_id}");
                return Err(ExceptionCode::GatewayTargetDevice);
            }
            engine.set_active(unit_id);
        }
        if self.reject_unknown_units && engine.registry().active_device().is_none() {
            warn!(
                "SERVER: Exception::GatewayTargetDevice - unit {} has no device",
                engine.current_unit_id()
            );
            return Err(ExceptionCode::GatewayTargetDevice);
        }
        Ok(())
    }
}

/// Result of a mask write register (0x16) on `current`.
pub fn mask_write(current: u16, and_mask: u16, or_mask: u16) -> u16 {
    (current & and_mask) | (or_mask & !and_mask)
}

/// Short human name of a request's function, for logs.
pub fn function_name(request: &Request<'_>) -> &'static str {
    match request {
        Request::ReadCoils(..) => "Read Coils (0x01)",
        Request::ReadDiscreteInputs(..) => "Read Discrete Inputs (0x02)",
        Request::ReadHoldingRegisters(..) => "Read Holding Registers (0x03)",
        Request::ReadInputRegisters(..) => "Read Input Registers (0x04)",
        Request::WriteSingleCoil(..) => "Write Single Coil (0x05)",
        Request::WriteSingleRegister(..) => "Write Single Register (0x06)",
        Request::WriteMultipleCoils(..) => "Write Multiple Coils (0x0F)",
        Request::WriteMultipleRegisters(..) => "Write Multiple Registers (0x10)",
        Request::MaskWriteRegister(..) => "Mask Write Register (0x16)",
        Request::ReadWriteMultipleRegisters(..) => "Read/Write Multiple Registers (0x17)",
        _ => "Unsupported function",
    }
}

fn check_quantity(count: usize, max: usize) -> Result<(), ExceptionCode> {
    if count == 0 || count > max {
        error!("SERVER: Exception::IllegalDataValue - quantity {count} not in 1..={max}");
        return Err(ExceptionCode::IllegalDataValue);
    }
    Ok(())
}

/// Helper function reading bits from the live store.
fn read_bits(
    engine: &SyncEngine,
    category: RegisterCategory,
    addr: u16,
    cnt: u16,
) -> Result<Vec<bool>, ExceptionCode> {
    check_quantity(usize::from(cnt), usize::from(MAX_READ_BITS))?;
    engine
        .store()
        .read_bits(category, addr, cnt)
        .map_err(store_exception)
}

/// Helper function reading registers from the live store.
fn read_words(
    engine: &SyncEngine,
    category: RegisterCategory,
    addr: u16,
    cnt: u16,
) -> Result<Vec<u16>, ExceptionCode> {
    check_quantity(usize::from(cnt), usize::from(MAX_READ_WORDS))?;
    engine
        .store()
        .read_words(category, addr, cnt)
        .map_err(store_exception)
}

fn store_exception(err: StoreError) -> ExceptionCode {
    match err {
        StoreError::OutOfRange { .. } => {
            error!("SERVER: Exception::IllegalDataAddress - {err}");
            ExceptionCode::IllegalDataAddress
        }
        StoreError::NotBits(_) | StoreError::NotWords(_) => {
            error!("SERVER: Exception::ServerDeviceFailure - {err}");
            ExceptionCode::ServerDeviceFailure
        }
    }
}
