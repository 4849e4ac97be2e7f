// SPDX-FileCopyrightText: Copyright (c) 2017-2024 slowtec GmbH <post@slowtec.de>
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Caller-facing data model.

use crate::error::{Error, UsageError};

/// A Modbus register address as used by the caller.
///
/// Caller addressing is 0-based; the WiNet-S protocol is 1-based.
/// The translation happens when the request is issued.
pub type Address = u16;

/// The number of registers to read.
pub type Quantity = u16;

/// A register value.
pub type Word = u16;

/// A Modbus slave (unit) identifier.
///
/// The WiNet-S protocol addresses devices through the identity discovered
/// on the control channel, so this is accepted for signature compatibility
/// with Modbus pollers and otherwise ignored.
pub type SlaveId = u8;

/// The numeric success/failure indicator carried in every WiNet-S
/// response envelope. Zero (or absent) means failure.
pub type ResultCode = u64;

/// The register class selected by a read request.
///
/// The two classes differ only in the `param_type` code sent to the device.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum RegisterClass {
    /// Input registers (`param_type=0`), the read-only telemetry bank.
    Input,
    /// Holding registers (`param_type=1`).
    Holding,
}

impl RegisterClass {
    /// Gets the `param_type` wire code of this register class.
    #[must_use]
    pub const fn type_code(self) -> u8 {
        match self {
            Self::Input => 0,
            Self::Holding => 1,
        }
    }
}

/// The outcome of a single register read, shaped after a Modbus response.
///
/// Either the device signalled failure through a falsy result code, or it
/// returned exactly the requested number of register words. There is no
/// partial-success state.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ModbusResponse {
    /// The device rejected the read; the envelope's result code is kept
    /// for diagnostics.
    Error(ResultCode),

    /// One word per requested register, in request order.
    Registers(Vec<Word>),
}

impl ModbusResponse {
    /// Returns `true` if the device rejected the read.
    #[must_use]
    pub const fn is_error(&self) -> bool {
        matches!(self, Self::Error(_))
    }

    /// Borrows the register words of a successful read.
    ///
    /// # Errors
    ///
    /// Fails with [`UsageError::ErrorResponse`] if the response is an
    /// error. An error response never yields register data.
    pub fn registers(&self) -> Result<&[Word], Error> {
        match self {
            Self::Registers(words) => Ok(words),
            Self::Error(_) => Err(UsageError::ErrorResponse.into()),
        }
    }

    /// Consumes the response and returns the register words.
    ///
    /// # Errors
    ///
    /// Fails with [`UsageError::ErrorResponse`] if the response is an
    /// error.
    pub fn into_registers(self) -> Result<Vec<Word>, Error> {
        match self {
            Self::Registers(words) => Ok(words),
            Self::Error(_) => Err(UsageError::ErrorResponse.into()),
        }
    }
}
