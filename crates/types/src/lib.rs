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

#![warn(missing_docs, unreachable_pub)]
#![deny(unused_must_use, rust_2018_idioms)]
#![doc(test(
    no_crate_inject,
    attr(deny(warnings, rust_2018_idioms), allow(dead_code, unused_variables))
))]

//! Delegator common types

pub mod authorization;
pub use authorization::Eip7702Auth;

mod call;
pub use call::{parse_address, parse_amount, parse_calldata, CallField, CallId, PendingCall};

pub mod constants;

mod delegation;
#[cfg(any(test, feature = "test-utils"))]
pub use delegation::delegation_designator_code;
pub use delegation::DelegationStatus;

mod error;
pub use error::InputError;

mod transaction;
pub use transaction::TransactionDescriptor;
