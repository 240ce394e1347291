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

use anyhow::{bail, Context};
use clap::Args;
use delegator_provider::EvmProvider;
use delegator_signer::LocalWallet;
use secrecy::SecretString;

#[derive(Args, Debug)]
#[command(next_help_heading = "SIGNER")]
pub struct SignerArgs {
    /// Private keys of the accounts to manage. The first one is bound.
    #[arg(
        long = "signer.private_keys",
        name = "signer.private_keys",
        env = "SIGNER_PRIVATE_KEYS",
        value_delimiter = ','
    )]
    pub private_keys: Vec<String>,

    /// Mnemonic to derive the account from
    #[arg(
        long = "signer.mnemonic",
        name = "signer.mnemonic",
        env = "SIGNER_MNEMONIC"
    )]
    pub mnemonic: Option<String>,

    /// Derivation index of the account to bind when using a mnemonic
    #[arg(
        long = "signer.mnemonic_index",
        name = "signer.mnemonic_index",
        env = "SIGNER_MNEMONIC_INDEX",
        default_value = "0"
    )]
    pub mnemonic_index: usize,

    /// Private key of the wallet paying for sponsored executions
    #[arg(
        long = "sponsor.private_key",
        name = "sponsor.private_key",
        env = "SPONSOR_PRIVATE_KEY"
    )]
    pub sponsor_private_key: Option<String>,
}

impl SignerArgs {
    /// Build the wallet holding the session account
    pub fn wallet<P: EvmProvider>(&self, provider: P, chain_id: u64) -> anyhow::Result<LocalWallet<P>> {
        match (&self.mnemonic, self.private_keys.is_empty()) {
            (Some(_), false) => bail!("signer.private_keys and signer.mnemonic are exclusive"),
            (Some(mnemonic), true) => {
                let mnemonic = SecretString::from(mnemonic.clone());
                let wallet = LocalWallet::from_mnemonic(
                    provider,
                    chain_id,
                    &mnemonic,
                    self.mnemonic_index + 1,
                )
                .context("should derive accounts from mnemonic")?;
                wallet.switch_account(self.mnemonic_index)?;
                Ok(wallet)
            }
            (None, false) => {
                let keys = self
                    .private_keys
                    .iter()
                    .map(|key| SecretString::from(key.clone()))
                    .collect::<Vec<_>>();
                LocalWallet::from_private_keys(provider, chain_id, &keys)
                    .context("should parse private keys")
            }
            (None, true) => bail!("one of signer.private_keys or signer.mnemonic is required"),
        }
    }

    /// Build the sponsor wallet, if configured
    pub fn sponsor<P: EvmProvider>(
        &self,
        provider: P,
        chain_id: u64,
    ) -> anyhow::Result<Option<LocalWallet<P>>> {
        let Some(key) = &self.sponsor_private_key else {
            return Ok(None);
        };
        let key = SecretString::from(key.clone());
        let wallet = LocalWallet::from_private_keys(provider, chain_id, &[key])
            .context("should parse sponsor private key")?;
        Ok(Some(wallet))
    }
}
