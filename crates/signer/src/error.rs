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
use alloy_signer_local::LocalSignerError;
use delegator_provider::ProviderError;

/// Error type for the signer crate
#[derive(Debug, thiserror::Error)]
pub enum WalletError {
    /// No wallet or no accounts to expose
    #[error("wallet unavailable: {0}")]
    Unavailable(String),
    /// The user declined to expose accounts
    #[error("connection rejected: {0}")]
    ConnectionRejected(String),
    /// The requested account is not managed by this wallet
    #[error("unknown account {0}")]
    UnknownAccount(Address),
    /// The user or the key backend refused to sign
    #[error("signing rejected: {0}")]
    SigningRejected(String),
    /// Invalid transaction
    #[error("invalid transaction: {0}")]
    InvalidTransaction(String),
    /// Provider error
    #[error("provider error: {0}")]
    ProviderError(ProviderError),
    /// Other error
    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

/// Result type for the signer crate
pub type WalletResult<T> = std::result::Result<T, WalletError>;

impl From<alloy_signer::Error> for WalletError {
    fn from(value: alloy_signer::Error) -> Self {
        WalletError::SigningRejected(value.to_string())
    }
}

impl From<LocalSignerError> for WalletError {
    fn from(value: LocalSignerError) -> Self {
        WalletError::Unavailable(value.to_string())
    }
}

impl From<ProviderError> for WalletError {
    fn from(value: ProviderError) -> Self {
        WalletError::ProviderError(value)
    }
}
