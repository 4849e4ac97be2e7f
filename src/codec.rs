// SPDX-FileCopyrightText: Copyright (c) 2017-2024 slowtec GmbH <post@slowtec.de>
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Decoding of WiNet-S response payloads.

use serde::Deserialize;
use serde_json::Value;

use crate::{
    device::DeviceIdentity,
    error::ProtocolError,
    frame::{ModbusResponse, Quantity, ResultCode, Word},
};

/// The result code the control channel returns for a successful exchange.
pub(crate) const SUCCESS_RESULT_CODE: ResultCode = 1;

/// The envelope every WiNet-S response is wrapped in, both on the control
/// channel and on the HTTP endpoint.
///
/// An absent result code deserializes to 0 and is treated as failure.
#[derive(Debug, Deserialize)]
pub(crate) struct Envelope {
    #[serde(default)]
    pub(crate) result_code: ResultCode,
    #[serde(default)]
    pub(crate) result_data: Value,
}

/// `result_data` of a `connect` exchange.
#[derive(Debug, Deserialize)]
pub(crate) struct ConnectData {
    pub(crate) token: String,
}

/// `result_data` of a `devicelist` exchange.
#[derive(Debug, Deserialize)]
pub(crate) struct DeviceListData {
    #[serde(default)]
    pub(crate) list: Vec<DeviceIdentity>,
}

/// `result_data` of a `getParam` read.
#[derive(Debug, Deserialize)]
struct ParamData {
    param_value: Option<String>,
}

/// Translates a read-response envelope into a [`ModbusResponse`].
///
/// A falsy result code classifies the response as an error without looking
/// at anything else. Otherwise the register data must decode into exactly
/// `requested` words.
pub(crate) fn decode_read_response(
    envelope: Envelope,
    requested: Quantity,
) -> Result<ModbusResponse, ProtocolError> {
    if envelope.result_code == 0 {
        return Ok(ModbusResponse::Error(envelope.result_code));
    }
    let data: ParamData = serde_json::from_value(envelope.result_data)?;
    let param_value = data.param_value.ok_or(ProtocolError::MissingRegisterData)?;
    let words = decode_param_value(&param_value)?;
    if words.len() != usize::from(requested) {
        return Err(ProtocolError::RegisterCountMismatch {
            requested,
            decoded: words.len(),
        });
    }
    Ok(ModbusResponse::Registers(words))
}

/// Decodes a `param_value` string of space-separated hex byte tokens into
/// big-endian words, pairing byte `2i` with byte `2i + 1`.
fn decode_param_value(param_value: &str) -> Result<Vec<Word>, ProtocolError> {
    let mut bytes = Vec::new();
    for token in param_value.split_whitespace() {
        if token.len() != 2 {
            return Err(ProtocolError::InvalidRegisterData {
                token: token.to_owned(),
            });
        }
        let byte =
            u8::from_str_radix(token, 16).map_err(|_| ProtocolError::InvalidRegisterData {
                token: token.to_owned(),
            })?;
        bytes.push(byte);
    }
    if bytes.len() % 2 != 0 {
        return Err(ProtocolError::TruncatedRegisterData(bytes.len()));
    }
    let words = bytes
        .chunks_exact(2)
        .map(|pair| Word::from(pair[0]) << 8 | Word::from(pair[1]))
        .collect();
    Ok(words)
}
