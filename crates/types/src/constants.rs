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

//! Various constants that have no other home

use alloy_primitives::Address;

/// Leading bytes of the code the protocol installs on a delegated account.
///
/// The full designator is `0xef0100 || delegate_address`.
pub const EIP7702_DELEGATION_DESIGNATOR: [u8; 3] = [0xef, 0x01, 0x00];

/// Total length of a delegation designator in bytes.
pub const EIP7702_DELEGATION_CODE_LENGTH: usize = 23;

/// Delegate address that clears an existing delegation when authorized.
pub const REVOKE_DELEGATE: Address = Address::ZERO;

/// Number of decimals of the chain's native currency.
pub const NATIVE_DECIMALS: usize = 18;
