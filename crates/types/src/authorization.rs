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

//! 7702 authorization tuples.

use alloy_eips::eip7702::{Authorization, SignedAuthorization};
use alloy_primitives::{Address, PrimitiveSignature, B256, U256};
use serde::{Deserialize, Serialize};

use crate::constants::REVOKE_DELEGATE;

/// Signed authorization tuple for 7702 txn support
#[derive(Clone, Debug, Eq, PartialEq, Serialize, Deserialize, Default)]
#[serde(rename_all = "camelCase")]
pub struct Eip7702Auth {
    /// The chain ID of the authorization.
    pub chain_id: u64,
    /// The delegate contract the authority's code will point to.
    pub address: Address,
    /// The nonce for the authorization.
    pub nonce: u64,
    /// signature recovery id
    pub y_parity: u8,
    /// signature r
    pub r: U256,
    /// signature s
    pub s: U256,
}

impl From<Eip7702Auth> for SignedAuthorization {
    fn from(value: Eip7702Auth) -> Self {
        let authorization = unsigned(value.chain_id, value.address, value.nonce);
        SignedAuthorization::new_unchecked(authorization, value.y_parity, value.r, value.s)
    }
}

/// Hash an authority signs to authorize `address` at `nonce` on `chain_id`.
///
/// This is `keccak256(0x05 || rlp([chain_id, address, nonce]))`.
pub fn authorization_signing_hash(chain_id: u64, address: Address, nonce: u64) -> B256 {
    unsigned(chain_id, address, nonce).signature_hash()
}

fn unsigned(chain_id: u64, address: Address, nonce: u64) -> Authorization {
    Authorization {
        chain_id: U256::from(chain_id),
        address,
        nonce,
    }
}

impl Eip7702Auth {
    /// Assemble an authorization from its tuple and the authority's signature.
    pub fn new(chain_id: u64, address: Address, nonce: u64, signature: &PrimitiveSignature) -> Self {
        Self {
            chain_id,
            address,
            nonce,
            y_parity: signature.v() as u8,
            r: signature.r(),
            s: signature.s(),
        }
    }

    /// Hash that was signed to produce this authorization
    pub fn signing_hash(&self) -> B256 {
        authorization_signing_hash(self.chain_id, self.address, self.nonce)
    }

    /// True if this authorization clears the authority's delegation
    pub fn is_revocation(&self) -> bool {
        self.address == REVOKE_DELEGATE
    }

    /// Recover the account that signed this authorization.
    ///
    /// Returns `None` for malformed signatures.
    pub fn recover_authority(&self) -> Option<Address> {
        SignedAuthorization::from(self.clone())
            .recover_authority()
            .ok()
    }
}
