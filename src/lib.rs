// SPDX-FileCopyrightText: Copyright (c) 2017-2024 slowtec GmbH <post@slowtec.de>
// SPDX-License-Identifier: MIT OR Apache-2.0

//! A [Tokio](https://tokio.rs)-based client for the websocket+HTTP control
//! protocol of Sungrow WiNet-S communication dongles, presented through the
//! caller surface of a [Modbus](https://en.wikipedia.org/wiki/Modbus) client.
//!
//! WiNet-S dongles do not speak Modbus on their LAN port. They expose a
//! proprietary, stateful protocol instead: a persistent websocket control
//! channel for authentication and device discovery, plus an HTTP endpoint
//! for reading register ranges. This crate hides that session lifecycle
//! behind the two idempotent read operations a register-oriented poller
//! expects, so an existing Modbus data collector can treat the dongle like
//! any other register server.
//!
//! ## Installation
//!
//! Add this to your `Cargo.toml`:
//!
//! ```toml
//! [dependencies]
//! tokio-winets = "*"
//! ```
//!
//! ## Example
//!
//! ```no_run
//! use tokio_winets::prelude::*;
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let mut session = Session::new("192.168.1.12", 8082);
//!
//!     // The first read connects, authenticates and discovers the device.
//!     let response = session.read_input_registers(5000, 10, 0).await?;
//!     println!("registers: {:?}", response.registers()?);
//!
//!     session.close().await;
//!     Ok(())
//! }
//! ```

pub mod client;

mod codec;

mod device;

mod error;

mod frame;

pub mod prelude;

mod service;

pub use crate::{
    client::{Reader, Session},
    device::DeviceIdentity,
    error::{ConnectError, Error, ProtocolError, TransportError, UsageError},
    frame::{Address, ModbusResponse, Quantity, RegisterClass, ResultCode, SlaveId, Word},
};

/// Specialized [`Result`](std::result::Result) type for this crate.
pub type Result<T> = std::result::Result<T, Error>;
