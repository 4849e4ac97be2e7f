// SPDX-FileCopyrightText: Copyright (c) 2017-2024 slowtec GmbH <post@slowtec.de>
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Error types.

use thiserror::Error;

use crate::frame::ResultCode;

/// Error type for WiNet-S requests.
///
/// The variants mirror the recovery options available to the caller: after
/// a [`Connect`](Self::Connect) error the session is unconnected and the
/// next read retries the whole connect sequence, after a
/// [`Transport`](Self::Transport) error the session stays connected and the
/// read may simply be retried.
#[derive(Debug, Error)]
pub enum Error {
    /// The connect sequence failed; no token or device identity was
    /// retained.
    #[error("connect: {0}")]
    Connect(#[from] ConnectError),

    /// The HTTP exchange of a read failed below the protocol layer.
    #[error("transport: {0}")]
    Transport(#[from] TransportError),

    /// The device answered, but the payload violates the protocol.
    #[error("protocol: {0}")]
    Protocol(#[from] ProtocolError),

    /// The client API was misused.
    #[error("usage: {0}")]
    Usage(#[from] UsageError),
}

/// A failure while establishing the control-channel session.
#[derive(Debug, Error)]
pub enum ConnectError {
    /// The websocket control channel could not be opened, or it failed
    /// while an exchange was in flight.
    #[error("control channel: {0}")]
    Channel(#[from] tokio_tungstenite::tungstenite::Error),

    /// The control channel was closed by the device before a response
    /// arrived.
    #[error("control channel closed during {service:?} exchange")]
    ChannelClosed {
        /// The service whose response was outstanding.
        service: &'static str,
    },

    /// The device answered an exchange with a non-success result code.
    #[error("{service:?} rejected with result code {result_code}")]
    Rejected {
        /// The requested service.
        service: &'static str,
        /// The result code returned instead of the success sentinel.
        result_code: ResultCode,
    },

    /// The response payload of an exchange could not be interpreted.
    #[error("malformed {service:?} response: {source}")]
    Malformed {
        /// The requested service.
        service: &'static str,
        /// The underlying decoding error.
        source: serde_json::Error,
    },

    /// The device list was empty, so no device identity could be bound.
    #[error("device list is empty")]
    NoDevices,
}

/// A network-level failure during a read.
///
/// The session stays connected; the caller may retry the read without
/// reconnecting.
#[derive(Debug, Error)]
pub enum TransportError {
    /// The HTTP request could not be completed.
    #[error("http: {0}")]
    Http(#[from] reqwest::Error),

    /// The device answered with an unexpected HTTP status.
    #[error("unexpected http status {status}: {body:?}")]
    UnexpectedStatus {
        /// The HTTP status code of the response.
        status: reqwest::StatusCode,
        /// The response body, for diagnostics.
        body: String,
    },
}

/// The device answered a read, but the payload violates the protocol.
///
/// Never degraded to partial or zeroed register data.
#[derive(Debug, Error)]
pub enum ProtocolError {
    /// The response body is not a valid envelope.
    #[error("malformed response body: {0}")]
    Envelope(#[from] serde_json::Error),

    /// A successful envelope carried no `param_value` field.
    #[error("missing register data in response")]
    MissingRegisterData,

    /// A token in the register data is not a 2-digit hex byte.
    #[error("invalid register data token {token:?}")]
    InvalidRegisterData {
        /// The offending token.
        token: String,
    },

    /// The register data does not decode into whole 16-bit words.
    #[error("register data has an odd number of bytes ({0})")]
    TruncatedRegisterData(usize),

    /// The decoded register count does not match the requested count.
    #[error("register count mismatch: requested {requested}, decoded {decoded}")]
    RegisterCountMismatch {
        /// The number of registers requested.
        requested: u16,
        /// The number of registers actually decoded.
        decoded: usize,
    },
}

/// A misuse of the client API.
#[derive(Debug, Error)]
pub enum UsageError {
    /// Register data was requested from an error response.
    #[error("response is an error and carries no register data")]
    ErrorResponse,
}
