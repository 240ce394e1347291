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

//! EIP-7702 delegation session.
//!
//! A [`DelegationSession`] binds one account from a [`delegator_signer::Wallet`],
//! tracks its delegation status and mediates the operations that change it:
//! creating a delegation, executing a batch of calls (with or without an
//! existing delegation, or through a sponsor) and revoking the delegation.

mod assembler;
pub use assembler::BatchCallAssembler;

mod authorization;
pub use authorization::{AuthorizationBuilder, DelegateTarget, SignedDelegation};

mod binder;
pub use binder::{active_account, WalletBinder};

mod controller;
pub use controller::{DelegationSession, SessionPhase, SessionSettings, SubmissionOutcome};

mod emit;
pub use emit::{Operation, SessionEvent};

mod error;
pub use error::{SessionError, SessionResult};

mod metrics;

mod resolver;
pub use resolver::DelegationStatusResolver;
