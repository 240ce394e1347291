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

use alloy_primitives::{Address, U256};
use delegator_provider::EvmProvider;
use delegator_types::DelegationStatus;

use crate::{SessionError, SessionResult};

/// Reads account code and classifies its delegation status.
///
/// Holds no state, so concurrent and repeated resolution of the same address
/// is safe.
#[derive(Debug, Clone)]
pub struct DelegationStatusResolver<P> {
    provider: P,
}

impl<P: EvmProvider> DelegationStatusResolver<P> {
    /// Create a resolver reading through `provider`
    pub fn new(provider: P) -> Self {
        Self { provider }
    }

    /// Resolve the current delegation status of `address` at the latest block
    pub async fn resolve(&self, address: Address) -> SessionResult<DelegationStatus> {
        let code = self
            .provider
            .get_code(address, None)
            .await
            .map_err(SessionError::from_read)?;
        let status = DelegationStatus::from_code(&code);
        tracing::debug!("{address} has {} code bytes: {status}", code.len());
        Ok(status)
    }

    /// Native balance of `address` at the latest block
    pub async fn balance(&self, address: Address) -> SessionResult<U256> {
        self.provider
            .get_balance(address, None)
            .await
            .map_err(SessionError::from_read)
    }
}
