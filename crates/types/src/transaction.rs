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

use alloy_network::{TransactionBuilder, TransactionBuilder7702};
use alloy_primitives::{Address, Bytes, U256};
use alloy_rpc_types_eth::TransactionRequest;

use crate::Eip7702Auth;

/// EIP-1559 transaction type
pub const EIP1559_TX_TYPE: u8 = 2;
/// EIP-7702 set code transaction type
pub const EIP7702_TX_TYPE: u8 = 4;

/// A transaction as handed to the wallet for signing and broadcast.
///
/// Gas limit and fees are left to the wallet.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct TransactionDescriptor {
    /// Sending account
    pub from: Address,
    /// Destination
    pub to: Address,
    /// Value in wei
    pub value: U256,
    /// Call data
    pub data: Bytes,
    /// Pinned transaction nonce. `None` lets the wallet pick.
    pub nonce: Option<u64>,
    /// Authorizations to apply before execution
    pub authorization_list: Vec<Eip7702Auth>,
}

impl TransactionDescriptor {
    /// Typed transaction envelope this descriptor produces
    pub fn tx_type(&self) -> u8 {
        if self.authorization_list.is_empty() {
            EIP1559_TX_TYPE
        } else {
            EIP7702_TX_TYPE
        }
    }

    /// Convert into an RPC transaction request for `chain_id`
    pub fn into_request(self, chain_id: u64) -> TransactionRequest {
        let tx_type = self.tx_type();
        let mut request = TransactionRequest::default()
            .with_from(self.from)
            .with_to(self.to)
            .with_value(self.value)
            .with_input(self.data)
            .with_chain_id(chain_id);
        if let Some(nonce) = self.nonce {
            request.set_nonce(nonce);
        }
        if !self.authorization_list.is_empty() {
            request.set_authorization_list(
                self.authorization_list.into_iter().map(Into::into).collect(),
            );
        }
        request.transaction_type = Some(tx_type);
        request
    }
}
