// SPDX-FileCopyrightText: Copyright (c) 2017-2024 slowtec GmbH <post@slowtec.de>
// SPDX-License-Identifier: MIT OR Apache-2.0

use std::fmt;

use serde::Deserialize;

/// The identity of a logical device behind a WiNet-S dongle.
///
/// Obtained once per connected session from the first entry of the
/// `devicelist` response and sent along with every register read. It plays
/// the role the unit identifier plays in Modbus: selecting which device on
/// the gateway a request refers to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
pub struct DeviceIdentity {
    /// The device slot on the dongle.
    pub dev_id: u32,
    /// The device model class.
    pub dev_type: u32,
    /// The device model code.
    pub dev_code: u32,
}

impl fmt::Display for DeviceIdentity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}/{}", self.dev_id, self.dev_type, self.dev_code)
    }
}
