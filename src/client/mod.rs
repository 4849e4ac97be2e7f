// SPDX-FileCopyrightText: Copyright (c) 2017-2024 slowtec GmbH <post@slowtec.de>
// SPDX-License-Identifier: MIT OR Apache-2.0

//! WiNet-S session client

use std::fmt;

use async_trait::async_trait;

use crate::{
    frame::{Address, ModbusResponse, Quantity, RegisterClass, SlaveId},
    service,
    Result,
};

/// Asynchronous register reader, the caller surface of a Modbus client.
///
/// The `slave` parameter exists so register-oriented pollers written
/// against Modbus clients can call these methods unchanged. WiNet-S
/// addresses its device through the identity discovered on the control
/// channel, so the value is ignored.
#[async_trait]
pub trait Reader {
    /// Read multiple input registers (the Modbus 0x04 equivalent,
    /// `param_type=0`).
    async fn read_input_registers(
        &mut self,
        start: Address,
        cnt: Quantity,
        slave: SlaveId,
    ) -> Result<ModbusResponse>;

    /// Read multiple holding registers (the Modbus 0x03 equivalent,
    /// `param_type=1`).
    async fn read_holding_registers(
        &mut self,
        start: Address,
        cnt: Quantity,
        slave: SlaveId,
    ) -> Result<ModbusResponse>;
}

/// A lazily connected session with one WiNet-S dongle.
///
/// Constructing a session performs no I/O. The first read opens the
/// control channel, authenticates, and binds the device identity; every
/// further read reuses that state until [`close`](Self::close) tears it
/// down. A closed session reconnects on the next read.
///
/// All operations take `&mut self`: a session is single-owner and must be
/// wrapped in external synchronization to be shared, as the lazy connect
/// is not atomic across concurrent callers.
pub struct Session {
    service: service::winets::Client,
}

impl Session {
    /// Creates an unconnected session for the dongle at `host`, with the
    /// websocket control channel on `ws_port`.
    #[must_use]
    pub fn new(host: impl Into<String>, ws_port: u16) -> Self {
        Self {
            service: service::winets::Client::new(host.into(), ws_port),
        }
    }

    /// Creates an unconnected session whose HTTP endpoint is served on a
    /// non-standard port.
    ///
    /// The dongle itself always serves HTTP on port 80; this exists for
    /// setups that place a proxy (or a test stand-in) in front of it.
    #[must_use]
    pub fn with_http_port(host: impl Into<String>, ws_port: u16, http_port: u16) -> Self {
        let mut service = service::winets::Client::new(host.into(), ws_port);
        service.set_http_port(http_port);
        Self { service }
    }

    /// The host this session talks to.
    #[must_use]
    pub fn host(&self) -> &str {
        self.service.host()
    }

    /// The control channel port.
    #[must_use]
    pub const fn ws_port(&self) -> u16 {
        self.service.ws_port()
    }

    /// Whether the session currently holds a token and device identity.
    #[must_use]
    pub const fn is_connected(&self) -> bool {
        self.service.is_connected()
    }

    /// Releases the control channel and the HTTP transport.
    ///
    /// Idempotent: closing an unconnected session is a no-op. The session
    /// remains usable, the next read runs a fresh connect sequence.
    pub async fn close(&mut self) {
        self.service.disconnect().await;
    }
}

#[async_trait]
impl Reader for Session {
    async fn read_input_registers(
        &mut self,
        start: Address,
        cnt: Quantity,
        _slave: SlaveId,
    ) -> Result<ModbusResponse> {
        self.service
            .read_registers(RegisterClass::Input, start, cnt)
            .await
    }

    async fn read_holding_registers(
        &mut self,
        start: Address,
        cnt: Quantity,
        _slave: SlaveId,
    ) -> Result<ModbusResponse> {
        self.service
            .read_registers(RegisterClass::Holding, start, cnt)
            .await
    }
}

impl fmt::Debug for Session {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Session")
            .field("host", &self.host())
            .field("ws_port", &self.ws_port())
            .field("connected", &self.is_connected())
            .finish()
    }
}
