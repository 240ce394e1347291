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

use alloy_primitives::{Address, TxHash};
use delegator_provider::ProviderError;
use delegator_signer::WalletError;
use delegator_types::{CallId, DelegationStatus, InputError};

/// Session result type
pub type SessionResult<T> = std::result::Result<T, SessionError>;

/// Errors surfaced by session operations
#[derive(Debug, thiserror::Error)]
pub enum SessionError {
    /// No wallet, or the wallet exposed no accounts
    #[error("wallet unavailable: {0}")]
    WalletUnavailable(String),
    /// The user declined to connect
    #[error("connection rejected: {0}")]
    ConnectionRejected(String),
    /// The user or the key backend refused to sign, or the signature did not
    /// recover to the bound account
    #[error("signing rejected: {0}")]
    SigningRejected(String),
    /// The delegate address is missing or malformed
    #[error("invalid delegate address: {0}")]
    InvalidDelegateAddress(String),
    /// A call target is not a valid address
    #[error("invalid call target: {0}")]
    InvalidTarget(String),
    /// A call value is not a non-negative decimal amount
    #[error("invalid amount: {0}")]
    InvalidAmount(String),
    /// Calldata is not a hex byte string
    #[error("malformed calldata: {0}")]
    MalformedCalldata(String),
    /// The account nonce moved between authorization and submission, or the
    /// node rejected the transaction nonce
    #[error("stale nonce: {0}")]
    StaleNonce(String),
    /// The transaction was mined but execution reverted
    #[error("transaction {0} reverted")]
    SubmissionReverted(TxHash),
    /// The node refused the transaction for a reason other than its nonce
    #[error("submission rejected: {0}")]
    SubmissionRejected(String),
    /// The node could not be reached or did not answer in time
    #[error("network unreachable: {0}")]
    NetworkUnreachable(String),
    /// The transaction was not mined within the polling bound
    #[error("transaction {0} not mined in time")]
    ReceiptTimeout(TxHash),
    /// Another state changing operation is in flight
    #[error("another operation is in progress")]
    Busy,
    /// No account is bound to the session
    #[error("session is not connected")]
    NotConnected,
    /// The operation is not allowed for the current delegation status
    #[error("cannot {operation} while account is {status}")]
    InvalidState {
        /// Requested operation
        operation: &'static str,
        /// Current delegation status
        status: DelegationStatus,
    },
    /// A batch was requested with no pending calls
    #[error("no pending calls")]
    EmptyBatch,
    /// A sponsored execution was requested without a sponsor wallet
    #[error("no sponsor wallet configured")]
    SponsorUnavailable,
    /// The call id is not in the pending list
    #[error("unknown call {0}")]
    UnknownCall(CallId),
    /// Some other error occurred
    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

impl SessionError {
    /// Classify a provider error raised by a read.
    ///
    /// Unlike the submission classification, node error responses are not
    /// treated as rejections.
    pub(crate) fn from_read(error: ProviderError) -> Self {
        match error {
            ProviderError::Transport(msg) => SessionError::NetworkUnreachable(msg),
            other => SessionError::Other(other.into()),
        }
    }

    /// True if the on-chain state may differ from what the session assumed
    /// and the delegation status must be read again
    pub(crate) fn requires_status_refresh(&self) -> bool {
        matches!(
            self,
            SessionError::StaleNonce(_)
                | SessionError::SubmissionReverted(_)
                | SessionError::SubmissionRejected(_)
                | SessionError::ReceiptTimeout(_)
        )
    }
}

impl From<ProviderError> for SessionError {
    fn from(error: ProviderError) -> Self {
        if error.is_nonce_error() {
            return SessionError::StaleNonce(error.to_string());
        }
        match error {
            ProviderError::Transport(msg) => SessionError::NetworkUnreachable(msg),
            ProviderError::Rpc { .. } | ProviderError::ContractError(_) => {
                SessionError::SubmissionRejected(error.to_string())
            }
            ProviderError::Other(e) => SessionError::Other(e),
        }
    }
}

impl From<WalletError> for SessionError {
    fn from(error: WalletError) -> Self {
        match error {
            WalletError::Unavailable(msg) => SessionError::WalletUnavailable(msg),
            WalletError::ConnectionRejected(msg) => SessionError::ConnectionRejected(msg),
            WalletError::UnknownAccount(account) => unknown_account(account),
            WalletError::SigningRejected(msg) => SessionError::SigningRejected(msg),
            WalletError::InvalidTransaction(msg) => SessionError::SubmissionRejected(msg),
            WalletError::ProviderError(e) => e.into(),
            WalletError::Other(e) => SessionError::Other(e),
        }
    }
}

impl From<InputError> for SessionError {
    fn from(error: InputError) -> Self {
        match error {
            InputError::InvalidAddress(msg) => SessionError::InvalidTarget(msg),
            InputError::InvalidAmount(msg) => SessionError::InvalidAmount(msg),
            InputError::MalformedCalldata(msg) => SessionError::MalformedCalldata(msg),
        }
    }
}

fn unknown_account(account: Address) -> SessionError {
    SessionError::WalletUnavailable(format!("wallet does not manage account {account}"))
}
