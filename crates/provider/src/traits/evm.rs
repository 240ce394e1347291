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

//! Trait for interacting with chain data.

use alloy_primitives::{Address, Bytes, TxHash, U256};
use alloy_rpc_types_eth::{BlockId, TransactionRequest};
#[cfg(feature = "test-utils")]
use mockall::automock;

use super::error::ProviderResult;

/// Inclusion result of a transaction
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct MinedTransaction {
    /// Transaction hash
    pub tx_hash: TxHash,
    /// Block the transaction was included in
    pub block_number: Option<u64>,
    /// Whether execution succeeded
    pub success: bool,
    /// Gas used by the transaction
    pub gas_used: u64,
}

/// Trait for interacting with chain data.
#[cfg_attr(feature = "test-utils", automock)]
#[async_trait::async_trait]
#[auto_impl::auto_impl(&, Arc, Box)]
pub trait EvmProvider: Send + Sync {
    /// Get the chain id reported by the node
    async fn get_chain_id(&self) -> ProviderResult<u64>;

    /// Get the code at an address
    async fn get_code(&self, address: Address, block: Option<BlockId>) -> ProviderResult<Bytes>;

    /// Get the balance of an address
    async fn get_balance(&self, address: Address, block: Option<BlockId>) -> ProviderResult<U256>;

    /// Get the nonce/transaction count of an address
    async fn get_transaction_count(&self, address: Address) -> ProviderResult<u64>;

    /// Simulate a transaction via an eth_call
    async fn call(&self, tx: &TransactionRequest, block: Option<BlockId>)
        -> ProviderResult<Bytes>;

    /// Estimate the gas limit of a transaction
    async fn estimate_gas(&self, tx: &TransactionRequest) -> ProviderResult<u64>;

    /// Get the legacy gas price reported by the node
    async fn get_gas_price(&self) -> ProviderResult<u128>;

    /// Get the max priority fee per gas as reported by the node's RPC
    async fn get_max_priority_fee(&self) -> ProviderResult<u128>;

    /// Broadcast a signed, 2718 encoded transaction
    async fn send_raw_transaction(&self, tx: Bytes) -> ProviderResult<TxHash>;

    /// Get the inclusion result of a transaction, `None` while pending
    async fn get_transaction_receipt(
        &self,
        tx_hash: TxHash,
    ) -> ProviderResult<Option<MinedTransaction>>;
}
