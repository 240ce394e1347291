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

use alloy_primitives::{Address, PrimitiveSignature, TxHash, B256};
use delegator_types::TransactionDescriptor;
#[cfg(feature = "test-utils")]
use mockall::automock;
use tokio::sync::broadcast;

use crate::WalletResult;

/// The external wallet a session acquires its account and signing
/// capability from.
///
/// Signing is only offered over structured payloads: an EIP-7702
/// authorization tuple or an EIP-712 digest. There is no free-form message
/// signing.
#[cfg_attr(feature = "test-utils", automock)]
#[async_trait::async_trait]
#[auto_impl::auto_impl(&, Arc, Box)]
pub trait Wallet: Send + Sync {
    /// Ask the wallet to expose its accounts. The first entry is the active
    /// account.
    async fn request_accounts(&self) -> WalletResult<Vec<Address>>;

    /// Chain the wallet signs and submits for
    async fn chain_id(&self) -> WalletResult<u64>;

    /// Sign the EIP-7702 authorization `(chain_id, delegate, nonce)` with
    /// `account`'s key.
    async fn sign_authorization(
        &self,
        account: Address,
        chain_id: u64,
        delegate: Address,
        nonce: u64,
    ) -> WalletResult<PrimitiveSignature>;

    /// Sign an EIP-712 signing hash with `account`'s key
    async fn sign_typed_hash(
        &self,
        account: Address,
        signing_hash: B256,
    ) -> WalletResult<PrimitiveSignature>;

    /// Fill gas and fees, sign and broadcast a transaction. Returns once the
    /// node accepted it.
    async fn send_transaction(&self, tx: TransactionDescriptor) -> WalletResult<TxHash>;

    /// Receive the new account list each time the wallet's exposed accounts
    /// change. An empty list means the wallet disconnected.
    fn subscribe_accounts(&self) -> broadcast::Receiver<Vec<Address>>;
}
