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

use alloy_eips::eip2718::Encodable2718;
use alloy_network::{EthereumWallet, TransactionBuilder};
use alloy_primitives::{Address, PrimitiveSignature, TxHash, B256};
use alloy_signer::Signer;
use alloy_signer_local::{coins_bip39::English, MnemonicBuilder, PrivateKeySigner};
use anyhow::Context;
use delegator_provider::EvmProvider;
use delegator_types::{authorization::authorization_signing_hash, TransactionDescriptor};
use delegator_utils::math;
use parking_lot::RwLock;
use secrecy::{ExposeSecret, SecretString};
use tokio::sync::broadcast;

use crate::{Wallet, WalletError, WalletResult};

const ACCOUNT_CHANNEL_CAPACITY: usize = 16;

/// Fee and gas padding applied when the wallet fills a transaction
#[derive(Clone, Copy, Debug)]
pub struct FeeSettings {
    /// Percentage added on top of the node's gas estimate
    pub gas_limit_buffer_percent: u64,
    /// Max fee per gas as a multiple of the current gas price
    pub max_fee_multiplier: u128,
}

impl Default for FeeSettings {
    fn default() -> Self {
        Self {
            gas_limit_buffer_percent: 20,
            max_fee_multiplier: 2,
        }
    }
}

/// A wallet holding local private keys.
///
/// Accounts are only exposed after [`Wallet::request_accounts`]. The active
/// account can be switched or the wallet disconnected, both of which notify
/// subscribers.
pub struct LocalWallet<P> {
    provider: P,
    chain_id: u64,
    signers: Vec<PrivateKeySigner>,
    active: RwLock<Option<usize>>,
    fees: FeeSettings,
    accounts_tx: broadcast::Sender<Vec<Address>>,
}

impl<P> LocalWallet<P> {
    /// Create a wallet over already constructed signers
    pub fn new(provider: P, chain_id: u64, signers: Vec<PrivateKeySigner>) -> Self {
        let (accounts_tx, _) = broadcast::channel(ACCOUNT_CHANNEL_CAPACITY);
        let signers = signers
            .into_iter()
            .map(|signer| signer.with_chain_id(Some(chain_id)))
            .collect();
        Self {
            provider,
            chain_id,
            signers,
            active: RwLock::new(None),
            fees: FeeSettings::default(),
            accounts_tx,
        }
    }

    /// Create a wallet from hex encoded private keys
    pub fn from_private_keys(
        provider: P,
        chain_id: u64,
        private_keys: &[SecretString],
    ) -> WalletResult<Self> {
        let signers = private_keys
            .iter()
            .map(|key| {
                key.expose_secret()
                    .parse::<PrivateKeySigner>()
                    .context("failed to parse private key signer")
            })
            .collect::<anyhow::Result<Vec<_>>>()?;
        Ok(Self::new(provider, chain_id, signers))
    }

    /// Create a wallet deriving `count` accounts from a mnemonic
    pub fn from_mnemonic(
        provider: P,
        chain_id: u64,
        mnemonic: &SecretString,
        count: usize,
    ) -> WalletResult<Self> {
        let builder = MnemonicBuilder::<English>::default().phrase(mnemonic.expose_secret());
        let mut signers = Vec::with_capacity(count);
        for i in 0..count {
            let index = u32::try_from(i).context("mnemonic account index out of range")?;
            signers.push(builder.clone().index(index)?.build()?);
        }
        Ok(Self::new(provider, chain_id, signers))
    }

    /// Override the fee settings
    pub fn with_fee_settings(mut self, fees: FeeSettings) -> Self {
        self.fees = fees;
        self
    }

    /// All addresses this wallet holds keys for
    pub fn addresses(&self) -> Vec<Address> {
        self.signers.iter().map(|s| s.address()).collect()
    }

    /// Make the account at `index` active and notify subscribers
    pub fn switch_account(&self, index: usize) -> WalletResult<Address> {
        let address = self
            .signers
            .get(index)
            .map(|s| s.address())
            .ok_or_else(|| WalletError::Unavailable(format!("no account at index {index}")))?;
        *self.active.write() = Some(index);
        tracing::info!("wallet switched to account {address}");
        self.notify();
        Ok(address)
    }

    /// Stop exposing accounts and notify subscribers with an empty list
    pub fn disconnect(&self) {
        *self.active.write() = None;
        tracing::info!("wallet disconnected");
        self.notify();
    }

    fn exposed_accounts(&self) -> Vec<Address> {
        let Some(active) = *self.active.read() else {
            return vec![];
        };
        let mut accounts = vec![self.signers[active].address()];
        accounts.extend(
            self.signers
                .iter()
                .enumerate()
                .filter(|(i, _)| *i != active)
                .map(|(_, s)| s.address()),
        );
        accounts
    }

    fn notify(&self) {
        // no receivers is fine
        let _ = self.accounts_tx.send(self.exposed_accounts());
    }

    /// Only the active account signs
    fn signer(&self, account: Address) -> WalletResult<&PrivateKeySigner> {
        let Some(active) = *self.active.read() else {
            return Err(WalletError::Unavailable("wallet is disconnected".to_string()));
        };
        self.signers
            .get(active)
            .filter(|s| s.address() == account)
            .ok_or(WalletError::UnknownAccount(account))
    }
}

#[async_trait::async_trait]
impl<P: EvmProvider> Wallet for LocalWallet<P> {
    async fn request_accounts(&self) -> WalletResult<Vec<Address>> {
        if self.signers.is_empty() {
            return Err(WalletError::Unavailable("no keys configured".to_string()));
        }
        let newly_connected = {
            let mut active = self.active.write();
            let newly_connected = active.is_none();
            if newly_connected {
                *active = Some(0);
            }
            newly_connected
        };
        if newly_connected {
            self.notify();
        }
        Ok(self.exposed_accounts())
    }

    async fn chain_id(&self) -> WalletResult<u64> {
        Ok(self.chain_id)
    }

    async fn sign_authorization(
        &self,
        account: Address,
        chain_id: u64,
        delegate: Address,
        nonce: u64,
    ) -> WalletResult<PrimitiveSignature> {
        if chain_id != self.chain_id {
            return Err(WalletError::SigningRejected(format!(
                "authorization for chain {chain_id} but wallet is on chain {}",
                self.chain_id
            )));
        }
        let signer = self.signer(account)?;
        let hash = authorization_signing_hash(chain_id, delegate, nonce);
        Ok(signer.sign_hash(&hash).await?)
    }

    async fn sign_typed_hash(
        &self,
        account: Address,
        signing_hash: B256,
    ) -> WalletResult<PrimitiveSignature> {
        let signer = self.signer(account)?;
        Ok(signer.sign_hash(&signing_hash).await?)
    }

    async fn send_transaction(&self, tx: TransactionDescriptor) -> WalletResult<TxHash> {
        let signer = self.signer(tx.from)?.clone();
        let from = tx.from;
        let mut request = tx.into_request(self.chain_id);

        if TransactionBuilder::nonce(&request).is_none() {
            let nonce = self.provider.get_transaction_count(from).await?;
            request.set_nonce(nonce);
        }

        let estimate = self.provider.estimate_gas(&request).await?;
        let gas_limit = math::increase_by_percent(estimate, self.fees.gas_limit_buffer_percent);
        let priority_fee = self.provider.get_max_priority_fee().await?;
        let gas_price = self.provider.get_gas_price().await?;
        let max_fee = gas_price
            .saturating_mul(self.fees.max_fee_multiplier)
            .max(priority_fee);

        let envelope = request
            .with_gas_limit(gas_limit)
            .with_max_priority_fee_per_gas(priority_fee)
            .with_max_fee_per_gas(max_fee)
            .build(&EthereumWallet::new(signer))
            .await
            .map_err(|e| WalletError::InvalidTransaction(e.to_string()))?;

        let mut raw_tx = vec![];
        envelope.encode_2718(&mut raw_tx);
        let tx_hash = self.provider.send_raw_transaction(raw_tx.into()).await?;
        tracing::info!("sent transaction {tx_hash} from {from}");
        Ok(tx_hash)
    }

    fn subscribe_accounts(&self) -> broadcast::Receiver<Vec<Address>> {
        self.accounts_tx.subscribe()
    }
}
