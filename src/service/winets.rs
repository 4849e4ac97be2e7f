// SPDX-FileCopyrightText: Copyright (c) 2017-2024 slowtec GmbH <post@slowtec.de>
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Transport-level WiNet-S client.
//!
//! Speaks the two halves of the dongle protocol: the persistent websocket
//! control channel (authentication, device discovery) and the HTTP
//! `getParam` endpoint (register reads).

use std::{
    fmt,
    time::{SystemTime, UNIX_EPOCH},
};

use futures_util::{SinkExt as _, StreamExt as _};
use serde_json::{Map, Value};
use tokio::net::TcpStream;
use tokio_tungstenite::{connect_async, tungstenite::Message, MaybeTlsStream, WebSocketStream};

use crate::{
    codec::{self, ConnectData, DeviceListData, Envelope, SUCCESS_RESULT_CODE},
    device::DeviceIdentity,
    error::{ConnectError, ProtocolError, TransportError},
    frame::{Address, ModbusResponse, Quantity, RegisterClass},
    Result,
};

/// Language tag sent with every request.
const LANG: &str = "en_us";

/// `type` code selecting "read" mode on the `getParam` endpoint.
const PARAM_READ_TYPE: &str = "3";

/// Persistent full-duplex control channel.
///
/// One JSON text frame per request, one per response, strictly in turn.
struct ControlChannel {
    ws: WebSocketStream<MaybeTlsStream<TcpStream>>,
}

impl ControlChannel {
    async fn open(host: &str, port: u16) -> std::result::Result<Self, ConnectError> {
        let url = format!("ws://{host}:{port}/ws/home/overview");
        log::debug!("Opening control channel {url}");
        let (ws, _) = connect_async(url).await?;
        Ok(Self { ws })
    }

    /// Performs one request/response exchange for `service`.
    ///
    /// Fails if the channel breaks or the device answers with anything but
    /// the success result code.
    async fn call(
        &mut self,
        token: &str,
        service: &'static str,
        params: &[(&str, &str)],
    ) -> std::result::Result<Value, ConnectError> {
        let mut request = Map::new();
        request.insert("lang".to_owned(), LANG.into());
        request.insert("token".to_owned(), token.into());
        request.insert("service".to_owned(), service.into());
        for (key, value) in params {
            request.insert((*key).to_owned(), Value::from(*value));
        }
        let request = Value::Object(request).to_string();
        log::debug!("Control channel request: {request}");
        self.ws.send(Message::Text(request)).await?;

        let response = loop {
            match self.ws.next().await {
                Some(Ok(Message::Text(text))) => break text,
                // Pings are answered by tungstenite itself; anything else
                // non-text is irrelevant to the exchange.
                Some(Ok(_)) => continue,
                Some(Err(err)) => return Err(err.into()),
                None => return Err(ConnectError::ChannelClosed { service }),
            }
        };
        log::debug!("Control channel response: {response}");

        let envelope: Envelope = serde_json::from_str(&response)
            .map_err(|source| ConnectError::Malformed { service, source })?;
        if envelope.result_code != SUCCESS_RESULT_CODE {
            return Err(ConnectError::Rejected {
                service,
                result_code: envelope.result_code,
            });
        }
        Ok(envelope.result_data)
    }

    /// Sends a close frame, best effort. A failure only means the peer is
    /// already gone.
    async fn close(mut self) {
        if let Err(err) = self.ws.close(None).await {
            log::debug!("Closing control channel failed: {err}");
        }
    }
}

/// The connected half of a session.
///
/// All fields are populated together by one successful connect sequence
/// and torn down together, so no partial token/identity state exists.
struct Connection {
    channel: ControlChannel,
    http: reqwest::Client,
    token: String,
    device: DeviceIdentity,
}

impl Connection {
    /// Issues one `getParam` read and returns the raw response envelope.
    async fn read_params(
        &self,
        host: &str,
        http_port: u16,
        class: RegisterClass,
        start: Address,
        count: Quantity,
    ) -> Result<Envelope> {
        // Caller addressing is 0-based, the protocol is 1-based. Widen
        // before the increment so the last address cannot wrap.
        let param_addr = u32::from(start) + 1;
        let url = format!("http://{host}:{http_port}/device/getParam");
        log::debug!(
            "GET {url} param_addr={param_addr} param_num={count} param_type={}",
            class.type_code()
        );
        let response = self
            .http
            .get(&url)
            .query(&[
                ("dev_id", self.device.dev_id.to_string()),
                ("dev_type", self.device.dev_type.to_string()),
                ("dev_code", self.device.dev_code.to_string()),
                ("type", PARAM_READ_TYPE.to_owned()),
                ("param_addr", param_addr.to_string()),
                ("param_num", count.to_string()),
                ("param_type", class.type_code().to_string()),
                ("token", self.token.clone()),
                ("lang", LANG.to_owned()),
                ("time123456", unix_seconds().to_string()),
            ])
            .send()
            .await
            .map_err(TransportError::Http)?;
        let status = response.status();
        let body = response.text().await.map_err(TransportError::Http)?;
        if status != reqwest::StatusCode::OK {
            return Err(TransportError::UnexpectedStatus { status, body }.into());
        }
        let envelope = serde_json::from_str(&body).map_err(ProtocolError::Envelope)?;
        Ok(envelope)
    }
}

/// WiNet-S client with a lazily established session.
///
/// Unconnected until the first read; one connect sequence per connected
/// lifetime. Not safe for concurrent use, which the `&mut self` receivers
/// enforce at compile time.
pub(crate) struct Client {
    host: String,
    ws_port: u16,
    http_port: u16,
    connection: Option<Connection>,
}

/// The port the dongle serves `getParam` on.
const DEFAULT_HTTP_PORT: u16 = 80;

impl Client {
    pub(crate) fn new(host: String, ws_port: u16) -> Self {
        Self {
            host,
            ws_port,
            http_port: DEFAULT_HTTP_PORT,
            connection: None,
        }
    }

    pub(crate) fn set_http_port(&mut self, http_port: u16) {
        self.http_port = http_port;
    }

    pub(crate) fn host(&self) -> &str {
        &self.host
    }

    pub(crate) const fn ws_port(&self) -> u16 {
        self.ws_port
    }

    pub(crate) const fn is_connected(&self) -> bool {
        self.connection.is_some()
    }

    /// Runs the connect sequence: open the channel, authenticate, bind the
    /// first listed device, build the HTTP client.
    ///
    /// The `Connection` is assembled in full before the caller stores it.
    /// Any failure drops the half-open channel, leaving nothing behind.
    async fn connect(host: &str, ws_port: u16) -> Result<Connection> {
        let mut channel = ControlChannel::open(host, ws_port).await?;

        let auth = channel.call("", "connect", &[]).await?;
        let ConnectData { token } =
            serde_json::from_value(auth).map_err(|source| ConnectError::Malformed {
                service: "connect",
                source,
            })?;

        let devices = channel
            .call(&token, "devicelist", &[("type", "0"), ("is_check_token", "0")])
            .await?;
        let DeviceListData { list } =
            serde_json::from_value(devices).map_err(|source| ConnectError::Malformed {
                service: "devicelist",
                source,
            })?;
        let Some(device) = list.first().copied() else {
            return Err(ConnectError::NoDevices.into());
        };

        let http = reqwest::Client::new();
        log::debug!("Session established with device {device}");
        Ok(Connection {
            channel,
            http,
            token,
            device,
        })
    }

    /// Reads `count` registers of `class` starting at the 0-based `start`
    /// address, connecting first if necessary.
    pub(crate) async fn read_registers(
        &mut self,
        class: RegisterClass,
        start: Address,
        count: Quantity,
    ) -> Result<ModbusResponse> {
        let connection = match &mut self.connection {
            Some(connection) => connection,
            None => {
                // Committed in a single assignment: a failed connect
                // leaves the client observably unconnected.
                let connection = Self::connect(&self.host, self.ws_port).await?;
                self.connection.insert(connection)
            }
        };
        let envelope = connection
            .read_params(&self.host, self.http_port, class, start, count)
            .await?;
        Ok(codec::decode_read_response(envelope, count)?)
    }

    /// Releases the control channel and the HTTP transport and returns to
    /// the unconnected state. A no-op when already disconnected.
    pub(crate) async fn disconnect(&mut self) {
        if let Some(connection) = self.connection.take() {
            log::debug!("Closing session to {}", self.host);
            connection.channel.close().await;
            // The HTTP connection pool is released when `connection` drops.
        }
    }
}

impl fmt::Debug for Client {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Client")
            .field("host", &self.host)
            .field("ws_port", &self.ws_port)
            .field("connected", &self.is_connected())
            .finish()
    }
}

/// Cache-busting timestamp: a pure function of "now", never stored.
fn unix_seconds() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|elapsed| elapsed.as_secs())
        .unwrap_or_default()
}
