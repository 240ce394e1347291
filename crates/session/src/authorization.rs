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
use delegator_provider::EvmProvider;
use delegator_signer::Wallet;
use delegator_types::{constants::REVOKE_DELEGATE, parse_address, Eip7702Auth};

use crate::{SessionError, SessionResult};

/// What an authorization points the account's code at
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum DelegateTarget {
    /// Delegate to a contract
    Contract(Address),
    /// Clear the delegation
    Revoke,
}

impl DelegateTarget {
    /// Validate a user supplied delegate address.
    ///
    /// The zero address is the revoke sentinel and is only reachable through
    /// [`DelegateTarget::Revoke`].
    pub fn parse(raw: &str) -> SessionResult<Self> {
        let address = parse_address(raw)
            .map_err(|e| SessionError::InvalidDelegateAddress(e.to_string()))?;
        Self::contract(address)
    }

    /// Delegate to `address`, rejecting the revoke sentinel
    pub fn contract(address: Address) -> SessionResult<Self> {
        if address == REVOKE_DELEGATE {
            return Err(SessionError::InvalidDelegateAddress(
                "zero address is reserved for revocation".to_string(),
            ));
        }
        Ok(Self::Contract(address))
    }

    /// Address placed in the authorization tuple
    pub fn address(&self) -> Address {
        match self {
            Self::Contract(address) => *address,
            Self::Revoke => REVOKE_DELEGATE,
        }
    }
}

/// A signed authorization together with the transaction nonce it reserves
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct SignedDelegation {
    /// The signed authorization tuple, nonce = `tx_nonce + 1`
    pub authorization: Eip7702Auth,
    /// Nonce the carrying transaction must use
    pub tx_nonce: u64,
}

/// Builds and signs EIP-7702 authorizations.
///
/// The sender of the carrying transaction is the authority itself, so its
/// nonce is consumed by the transaction before the authorization is
/// processed. The authorization therefore commits to `tx_count + 1`.
#[derive(Debug, Clone)]
pub struct AuthorizationBuilder<P, W> {
    provider: P,
    wallet: W,
}

impl<P, W> AuthorizationBuilder<P, W>
where
    P: EvmProvider,
    W: Wallet,
{
    /// Create a builder reading nonces through `provider` and signing with `wallet`
    pub fn new(provider: P, wallet: W) -> Self {
        Self { provider, wallet }
    }

    /// Read the account's transaction count and sign an authorization for
    /// `target` bound to the next slot.
    pub async fn build(
        &self,
        account: Address,
        target: DelegateTarget,
        chain_id: u64,
    ) -> SessionResult<SignedDelegation> {
        let tx_nonce = self.transaction_count(account).await?;
        let auth_nonce = tx_nonce + 1;
        let delegate = target.address();

        let signature = self
            .wallet
            .sign_authorization(account, chain_id, delegate, auth_nonce)
            .await?;
        let authorization = Eip7702Auth::new(chain_id, delegate, auth_nonce, &signature);

        match authorization.recover_authority() {
            Some(authority) if authority == account => {}
            Some(authority) => {
                return Err(SessionError::SigningRejected(format!(
                    "authorization signed by {authority}, expected {account}"
                )))
            }
            None => {
                return Err(SessionError::SigningRejected(
                    "authorization signature does not recover".to_string(),
                ))
            }
        }

        tracing::info!(
            "signed authorization for {account}: delegate {delegate} chain {chain_id} nonce {auth_nonce}"
        );
        Ok(SignedDelegation {
            authorization,
            tx_nonce,
        })
    }

    /// Fail with `StaleNonce` if the account's transaction count moved since
    /// `signed` was built.
    pub async fn ensure_current(
        &self,
        account: Address,
        signed: &SignedDelegation,
    ) -> SessionResult<()> {
        let current = self.transaction_count(account).await?;
        if current != signed.tx_nonce {
            return Err(SessionError::StaleNonce(format!(
                "account nonce moved from {} to {current} after signing",
                signed.tx_nonce
            )));
        }
        Ok(())
    }

    async fn transaction_count(&self, account: Address) -> SessionResult<u64> {
        self.provider
            .get_transaction_count(account)
            .await
            .map_err(SessionError::from_read)
    }
}
