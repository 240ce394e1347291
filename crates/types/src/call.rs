// This file is part of Delegator.
//
// Delegator is free software: you can redistribute it and/or modify it under the
// terms of the GNU Lesser General Public License as published by the Free Software
// Foundation, either version 3 of the License, or (at your option) any later version.
//
// Delegator is distributed in the hope that it will be useful, but WITHOUT ANY WARRANTY;
// without even the implied warranty of MERCHANTABILITY or FITNESS FOR A PARTICULAR PURPOSE.
// See the GNU General Public License for more details.
//
// You should have received a copy of the GNU General Public License along with Delegator.
// If not, see https://www.gnu.org/licenses/.

//! Pending calls of a batch and parsing of their user supplied fields.

use std::str::FromStr;

use alloy_primitives::{utils::parse_ether, Address, Bytes, U256};
use serde::{Deserialize, Serialize};

use crate::{constants::NATIVE_DECIMALS, InputError};

/// Session unique identifier of a pending call.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, parse_display::Display)]
#[display("#{0}")]
pub struct CallId(pub u64);

/// A single call to be executed by the delegated account.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PendingCall {
    /// Call target
    pub target: Address,
    /// Value in wei
    pub value: U256,
    /// Call data, empty for a plain value transfer
    pub data: Bytes,
}

impl PendingCall {
    /// Create a new pending call from already validated parts
    pub fn new(target: Address, value: U256, data: Bytes) -> Self {
        Self {
            target,
            value,
            data,
        }
    }

    /// Validate raw user input and build a pending call.
    ///
    /// `value` is a decimal amount in ether, `data` a hex string where `0x`
    /// (or the empty string) means no calldata.
    pub fn parse(target: &str, value: &str, data: &str) -> Result<Self, InputError> {
        Ok(Self {
            target: parse_address(target)?,
            value: parse_amount(value)?,
            data: parse_calldata(data)?,
        })
    }

    /// Replace one field of this call with a newly validated value.
    pub fn set_field(&mut self, field: CallField, raw: &str) -> Result<(), InputError> {
        match field {
            CallField::Target => self.target = parse_address(raw)?,
            CallField::Value => self.value = parse_amount(raw)?,
            CallField::Data => self.data = parse_calldata(raw)?,
        }
        Ok(())
    }
}

/// The editable fields of a [`PendingCall`].
#[derive(Clone, Copy, Debug, PartialEq, Eq, parse_display::Display, parse_display::FromStr)]
#[display(style = "lowercase")]
pub enum CallField {
    /// `target`
    Target,
    /// `value`
    Value,
    /// `data`
    Data,
}

/// Parse an account address.
///
/// Mixed case input must carry a valid EIP-55 checksum. The zero address is
/// accepted.
pub fn parse_address(raw: &str) -> Result<Address, InputError> {
    let trimmed = raw.trim();
    let hex = trimmed.strip_prefix("0x").unwrap_or(trimmed);
    let mixed_case =
        hex.chars().any(|c| c.is_ascii_lowercase()) && hex.chars().any(|c| c.is_ascii_uppercase());

    let parsed = if mixed_case {
        Address::parse_checksummed(trimmed, None).ok()
    } else {
        Address::from_str(trimmed).ok()
    };
    parsed.ok_or_else(|| InputError::InvalidAddress(raw.to_string()))
}

/// Parse a non-negative decimal ether amount into wei.
///
/// Amounts with more fractional digits than wei can represent are rejected
/// rather than rounded.
pub fn parse_amount(raw: &str) -> Result<U256, InputError> {
    let invalid = || InputError::InvalidAmount(raw.to_string());
    let trimmed = raw.trim();

    let (whole, fraction) = match trimmed.split_once('.') {
        Some((whole, fraction)) => (whole, fraction),
        None => (trimmed, ""),
    };
    if whole.is_empty() && fraction.is_empty() {
        return Err(invalid());
    }
    if !whole.chars().chain(fraction.chars()).all(|c| c.is_ascii_digit()) {
        return Err(invalid());
    }
    if fraction.len() > NATIVE_DECIMALS {
        return Err(invalid());
    }

    let whole = if whole.is_empty() { "0" } else { whole };
    let normalized = if fraction.is_empty() {
        whole.to_string()
    } else {
        format!("{whole}.{fraction}")
    };
    parse_ether(&normalized).map_err(|_| invalid())
}

/// Parse hex encoded calldata. `0x` and the empty string both yield no data.
pub fn parse_calldata(raw: &str) -> Result<Bytes, InputError> {
    const_hex::decode(raw.trim())
        .map(Bytes::from)
        .map_err(|_| InputError::MalformedCalldata(raw.to_string()))
}
