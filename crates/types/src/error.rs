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

/// Rejection reasons for user supplied input.
///
/// These are all detected locally, before any wallet interaction.
#[derive(Clone, Debug, PartialEq, Eq, thiserror::Error)]
pub enum InputError {
    /// Not a well-formed 20 byte address
    #[error("invalid address {0:?}")]
    InvalidAddress(String),
    /// Not a non-negative decimal amount representable in wei
    #[error("invalid amount {0:?}")]
    InvalidAmount(String),
    /// Not a hex encoded byte string
    #[error("malformed calldata {0:?}")]
    MalformedCalldata(String),
}
