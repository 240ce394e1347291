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

use alloy_json_rpc::RpcError;
use alloy_transport::{TransportError, TransportErrorKind};

/// Error enumeration for the Provider trait
#[derive(Debug, thiserror::Error)]
pub enum ProviderError {
    /// The node answered with a JSON-RPC error
    #[error("RPC error {code}: {message}")]
    Rpc {
        /// JSON-RPC error code
        code: i64,
        /// Error message returned by the node
        message: String,
    },
    /// The node could not be reached or did not answer in time
    #[error("Transport error: {0}")]
    Transport(String),
    /// Contract Error
    #[error("Contract error: {0}")]
    ContractError(String),
    /// Internal errors
    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

/// Result of a provider method call
pub type ProviderResult<T> = Result<T, ProviderError>;

impl ProviderError {
    /// True if the node rejected a transaction because its nonce does not
    /// match the sender's current account nonce.
    pub fn is_nonce_error(&self) -> bool {
        match self {
            ProviderError::Rpc { message, .. } => {
                let message = message.to_lowercase();
                message.contains("nonce too low")
                    || message.contains("nonce too high")
                    || message.contains("invalid nonce")
                    || message.contains("already known")
            }
            _ => false,
        }
    }

    /// True if the failure happened before the node produced an answer
    pub fn is_transport_error(&self) -> bool {
        matches!(self, ProviderError::Transport(_))
    }
}

impl From<TransportError> for ProviderError {
    fn from(value: TransportError) -> Self {
        match value {
            RpcError::ErrorResp(payload) => ProviderError::Rpc {
                code: payload.code,
                message: payload.message.to_string(),
            },
            RpcError::Transport(kind) => match kind {
                TransportErrorKind::Custom(_)
                | TransportErrorKind::BackendGone
                | TransportErrorKind::HttpError(_) => ProviderError::Transport(kind.to_string()),
                _ => ProviderError::Other(anyhow::anyhow!(kind.to_string())),
            },
            RpcError::LocalUsageError(e) => ProviderError::Transport(e.to_string()),
            other => ProviderError::Other(anyhow::anyhow!(other.to_string())),
        }
    }
}
