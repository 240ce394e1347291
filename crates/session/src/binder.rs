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

use alloy_primitives::Address;
use delegator_signer::Wallet;
use tokio::sync::broadcast;

use crate::{SessionError, SessionResult};

/// Acquires the account identity and signing capability from a wallet.
#[derive(Debug)]
pub struct WalletBinder<W> {
    wallet: W,
}

impl<W: Wallet> WalletBinder<W> {
    /// Create a binder over `wallet`
    pub fn new(wallet: W) -> Self {
        Self { wallet }
    }

    /// Ask the wallet for its accounts and bind the active one
    pub async fn connect(&self) -> SessionResult<Address> {
        let accounts = self.wallet.request_accounts().await?;
        let account = active_account(&accounts).ok_or_else(|| {
            SessionError::WalletUnavailable("wallet exposed no accounts".to_string())
        })?;
        tracing::info!("bound account {account}");
        Ok(account)
    }

    /// Chain the wallet signs for
    pub async fn chain_id(&self) -> SessionResult<u64> {
        Ok(self.wallet.chain_id().await?)
    }

    /// Subscribe to account change notifications
    pub fn subscribe(&self) -> broadcast::Receiver<Vec<Address>> {
        self.wallet.subscribe_accounts()
    }
}

/// The account a wallet's account list makes active, `None` when the wallet
/// disconnected.
pub fn active_account(accounts: &[Address]) -> Option<Address> {
    accounts.first().copied()
}
